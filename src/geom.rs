//! Triangle meshes and axis-aligned bounding boxes.
//!
//! Meshes are read from Wavefront `.obj` files with `tobj`. The placement code
//! never needs a true enclosed volume: every size computation works on the
//! axis-aligned bounding box of the vertex set, see [`Mesh::bounding_box_volume`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nalgebra::{Point3, Rotation3, Vector3};

use crate::error::{Result, SceneError};


/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Aabb::new(*first, *first);
        for p in points {
            aabb.min = aabb.min.inf(p);
            aabb.max = aabb.max.sup(p);
        }
        Some(aabb)
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn volume(&self) -> f32 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    pub fn translated(&self, offset: &Vector3<f32>) -> Self {
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Shrinks the box by `margin` on every side.
    pub fn inset(&self, margin: f32) -> Self {
        let m = Vector3::repeat(margin);
        Aabb::new(self.min + m, self.max - m)
    }

    /// Component-wise overlap of two boxes. The result may be inverted
    /// (min > max) on axes where the boxes do not overlap.
    pub fn intersection(&self, other: &Aabb) -> Self {
        Aabb::new(self.min.sup(&other.min), self.max.inf(&other.max))
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }
}

/// A triangle mesh in its own model frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub path: PathBuf,
    pub vertices: Vec<Point3<f32>>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(path: impl Into<PathBuf>, vertices: Vec<Point3<f32>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            path: path.into(),
            vertices,
            triangles,
        }
    }

    /// Loads every model of an OBJ file into a single triangulated mesh.
    pub fn from_file(path: &Path) -> Result<Mesh> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _) = tobj::load_obj(path, &options).map_err(|e| SceneError::MeshLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let offset = vertices.len() as u32;
            vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Point3::new(p[0], p[1], p[2])),
            );
            triangles.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
            );
        }

        if vertices.is_empty() {
            return Err(SceneError::MeshLoad {
                path: path.to_path_buf(),
                reason: "no vertices".to_string(),
            });
        }

        Ok(Mesh::new(path, vertices, triangles))
    }

    /// Bounds of the vertex set, seeded from vertex 0 on all three axes.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Bounds of the vertex set after a rotation about the model origin.
    pub fn bounds_rotated(&self, rotation: &Rotation3<f32>) -> Option<Aabb> {
        let rotated: Vec<Point3<f32>> = self.vertices.iter().map(|v| rotation * v).collect();
        Aabb::from_points(&rotated)
    }

    /// Volume of the axis-aligned bounding box of the vertices.
    ///
    /// This is deliberately not the enclosed volume of the mesh: the volume
    /// ranges in the object libraries are calibrated against this box.
    pub fn bounding_box_volume(&self) -> f32 {
        self.bounds().map_or(0.0, |b| b.volume())
    }

    /// Returns a copy uniformly scaled about the model origin.
    pub fn scaled(&self, scale: f32) -> Mesh {
        Mesh {
            path: self.path.clone(),
            vertices: self.vertices.iter().map(|v| v * scale).collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Merges vertices closer than `tolerance` and drops triangles that
    /// collapse as a result. Returns the number of vertices removed.
    ///
    /// Vertices are bucketed on a grid of cell size `tolerance`, so two points
    /// straddling a cell boundary are kept apart.
    pub fn weld_vertices(&mut self, tolerance: f32) -> usize {
        let mut cells: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut welded = Vec::new();

        for v in &self.vertices {
            let key = (
                (v.x / tolerance).round() as i64,
                (v.y / tolerance).round() as i64,
                (v.z / tolerance).round() as i64,
            );
            let index = *cells.entry(key).or_insert_with(|| {
                welded.push(*v);
                (welded.len() - 1) as u32
            });
            remap.push(index);
        }

        let removed = self.vertices.len() - welded.len();
        self.vertices = welded;
        self.triangles = self
            .triangles
            .iter()
            .map(|t| [remap[t[0] as usize], remap[t[1] as usize], remap[t[2] as usize]])
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
            .collect();
        removed
    }
}

/// Meshes already read from disk, keyed by path.
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<PathBuf, Arc<Mesh>>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached mesh for `path`, reading it on first use.
    /// Failed loads are not cached.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Mesh>> {
        if let Some(mesh) = self.meshes.get(path) {
            return Ok(Arc::clone(mesh));
        }
        let mesh = Arc::new(Mesh::from_file(path)?);
        self.meshes.insert(path.to_path_buf(), Arc::clone(&mesh));
        Ok(mesh)
    }
}
