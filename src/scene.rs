//! The scene under construction.
//!
//! A scene is built in layers:
//! - a static layout shell (the room) that fixes the scene bounds,
//! - an optional ground box under it,
//! - large objects dropped inside the bounds,
//! - small objects dropped on top of the large ones.
//!
//! Every object inserted here also becomes a body in the [`PhysicsWorld`].
//! The scene only grows; the remediation loop is the one place that removes
//! objects again.

use std::f32::consts::PI;
use std::sync::Arc;

use nalgebra::{Point3, Rotation3, Vector3};
use rand::Rng;

use crate::config::{
    GROUND_FRICTION, GROUND_SIZE, LARGE_OBJECT_FRICTION, LARGE_OBJECT_MARGIN, LARGE_OBJECT_MASS, LAYOUT_FRICTION,
    MIN_OBJECTS_PER_PASS, SMALL_OBJECT_DROP_MARGIN, SMALL_OBJECT_FRICTION, SMALL_OBJECT_MARGIN, SMALL_OBJECT_MASS,
    VERTEX_MERGE_DISTANCE,
};
use crate::error::{Result, SceneError};
use crate::geom::{Aabb, MeshCache};
use crate::library::Library;
use crate::object::ObjectDescriptor;
use crate::physics::{BodyDesc, BodyId, BodyKind, PhysicsWorld, Shape};
use crate::placement::{compute_scale, correct_position, random_point_in};


/// One object dropped into the scene.
#[derive(Debug, Clone)]
pub struct PlacedObject {
    pub base: Arc<ObjectDescriptor>,
    /// Uniform scale applied to the base mesh.
    pub scale: f32,
    pub body: BodyId,
}

/// The room layout plus everything placed in it so far.
#[derive(Debug)]
pub struct Scene {
    /// Extent of the layout mesh. Fixed once the layout is chosen.
    pub bounds: Aabb,
    /// World bounds of every large object at insertion time.
    pub large_object_footprints: Vec<Aabb>,
    pub layout: Arc<ObjectDescriptor>,
    /// Objects in insertion order.
    pub moving_objects: Vec<PlacedObject>,
    pub layout_body: Option<BodyId>,
    pending_layout: Option<BodyDesc>,
    meshes: MeshCache,
}

impl Scene {
    /// An empty scene with no layout body.
    pub fn new(layout: Arc<ObjectDescriptor>, bounds: Aabb) -> Scene {
        Scene {
            bounds,
            large_object_footprints: Vec::new(),
            layout,
            moving_objects: Vec::new(),
            layout_body: None,
            pending_layout: None,
            meshes: MeshCache::new(),
        }
    }

    /// Picks a layout from `library` and builds an empty scene around it.
    ///
    /// The layout is used at scale 1 at the origin and never moves. With
    /// `add_immediately` false its body is held back until [`Scene::insert_layout`],
    /// so objects can settle without the room walls in the way.
    pub fn add_layout<R: Rng + ?Sized>(
        library: &Library,
        rng: &mut R,
        add_immediately: bool,
        world: &mut dyn PhysicsWorld,
    ) -> Result<Scene> {
        let layout = library.draw_random(rng, true)?;
        let mut meshes = MeshCache::new();
        let mesh = meshes.load(&layout.mesh_path)?;
        let bounds = mesh.bounds().ok_or_else(|| SceneError::DegenerateMesh {
            path: layout.mesh_path.clone(),
            volume: 0.0,
        })?;
        log::info!(
            "layout {} ({}): bounds {:?} to {:?}",
            layout.name,
            layout.mesh_path.display(),
            bounds.min.coords.as_slice(),
            bounds.max.coords.as_slice()
        );

        let desc = BodyDesc {
            shape: Shape::Mesh(mesh.as_ref().clone()),
            kind: BodyKind::Fixed,
            position: Point3::origin(),
            yaw: 0.0,
            mass: 0.0,
            friction: LAYOUT_FRICTION,
        };

        let mut scene = Scene::new(layout, bounds);
        scene.pending_layout = Some(desc);
        scene.meshes = meshes;
        if add_immediately {
            scene.insert_layout(world)?;
        }
        Ok(scene)
    }

    /// Whether the layout body is still held back.
    pub fn layout_pending(&self) -> bool {
        self.pending_layout.is_some()
    }

    /// Inserts the held-back layout body. Returns `None` if it was already in.
    pub fn insert_layout(&mut self, world: &mut dyn PhysicsWorld) -> Result<Option<BodyId>> {
        let Some(desc) = self.pending_layout.take() else {
            return Ok(None);
        };
        let id = world.add_body(desc)?;
        log::debug!("layout body {}", id);
        self.layout_body = Some(id);
        Ok(Some(id))
    }

    /// Adds a large fixed box whose top face is the scene floor.
    pub fn add_ground(&self, world: &mut dyn PhysicsWorld) -> Result<BodyId> {
        let half = Vector3::from(GROUND_SIZE) / 2.0;
        let center = self.bounds.center();
        world.add_body(BodyDesc {
            shape: Shape::Cuboid(half),
            kind: BodyKind::Fixed,
            position: Point3::new(center.x, self.bounds.min.y - half.y, center.z),
            yaw: 0.0,
            mass: 0.0,
            friction: GROUND_FRICTION,
        })
    }

    /// Horizontal area of the scene, used to size object counts.
    pub fn scene_area(&self) -> f32 {
        let e = self.bounds.extents();
        e.x * e.z
    }

    /// Drops between `min(5, max_count)` and `max_count` large objects
    /// anywhere inside the scene. Returns how many were placed.
    pub fn add_large_objects<R: Rng + ?Sized>(
        &mut self,
        library: &Library,
        rng: &mut R,
        max_count: usize,
        world: &mut dyn PhysicsWorld,
    ) -> Result<usize> {
        let count = draw_count(rng, max_count);
        let region = self.bounds.inset(LARGE_OBJECT_MARGIN);
        let mut placed = 0;
        for _ in 0..count {
            if let Some(id) = self.place_object(library, rng, true, &region, world)? {
                if let Some(footprint) = world.body_aabb(id) {
                    self.large_object_footprints.push(footprint);
                }
                placed += 1;
            }
        }
        log::info!("placed {} of {} large objects", placed, count);
        Ok(placed)
    }

    /// Drops between `min(5, max_count)` and `max_count` small objects.
    ///
    /// With `place_on_large`, object `i` starts above footprint
    /// `i % footprints.len()`. Returns how many were placed.
    pub fn add_small_objects<R: Rng + ?Sized>(
        &mut self,
        library: &Library,
        rng: &mut R,
        max_count: usize,
        place_on_large: bool,
        world: &mut dyn PhysicsWorld,
    ) -> Result<usize> {
        let count = draw_count(rng, max_count);
        let mut region = self.bounds.inset(SMALL_OBJECT_MARGIN);
        region.min.y = self.bounds.min.y + SMALL_OBJECT_DROP_MARGIN;

        let on_large = place_on_large && !self.large_object_footprints.is_empty();
        if place_on_large && !on_large {
            log::warn!("no large objects to place small objects on, using the whole scene");
        }

        let mut placed = 0;
        for i in 0..count {
            let region = if on_large {
                let footprints = &self.large_object_footprints;
                region.intersection(&footprints[i % footprints.len()])
            } else {
                region
            };
            if self.place_object(library, rng, false, &region, world)?.is_some() {
                placed += 1;
            }
        }
        log::info!("placed {} of {} small objects", placed, count);
        Ok(placed)
    }

    /// Draws and inserts one object. `Ok(None)` means the object was skipped.
    fn place_object<R: Rng + ?Sized>(
        &mut self,
        library: &Library,
        rng: &mut R,
        large: bool,
        region: &Aabb,
        world: &mut dyn PhysicsWorld,
    ) -> Result<Option<BodyId>> {
        let descriptor = library.draw_random(rng, large)?;
        match self.try_place(&descriptor, rng, region, world) {
            Ok(placed) => {
                let id = placed.body;
                self.moving_objects.push(placed);
                Ok(Some(id))
            }
            Err(err @ (SceneError::MeshLoad { .. } | SceneError::DegenerateMesh { .. })) => {
                log::warn!("skipping {}: {}", descriptor.mesh_path.display(), err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn try_place<R: Rng + ?Sized>(
        &mut self,
        descriptor: &Arc<ObjectDescriptor>,
        rng: &mut R,
        region: &Aabb,
        world: &mut dyn PhysicsWorld,
    ) -> Result<PlacedObject> {
        let mesh = self.meshes.load(&descriptor.mesh_path)?;
        let scale = compute_scale(descriptor, &mesh, rng)?;
        let position = random_point_in(rng, region);
        let yaw = rng.random_range(-PI..=PI);

        let mut scaled = mesh.scaled(scale);
        scaled.weld_vertices(VERTEX_MERGE_DISTANCE);
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw);
        let local_bounds = scaled.bounds_rotated(&rotation).ok_or_else(|| SceneError::DegenerateMesh {
            path: descriptor.mesh_path.clone(),
            volume: 0.0,
        })?;
        let position = correct_position(position, &local_bounds, &self.bounds);

        let (mass, friction) = if descriptor.is_large {
            (LARGE_OBJECT_MASS, LARGE_OBJECT_FRICTION)
        } else {
            (SMALL_OBJECT_MASS, SMALL_OBJECT_FRICTION)
        };
        let body = world.add_body(BodyDesc {
            shape: Shape::Mesh(scaled),
            kind: BodyKind::Dynamic,
            position,
            yaw,
            mass,
            friction,
        })?;
        log::debug!(
            "{} {} at ({:.3}, {:.3}, {:.3}), scale {:.4}, yaw {:.3}",
            descriptor.category(),
            body,
            position.x,
            position.y,
            position.z,
            scale,
            yaw
        );

        Ok(PlacedObject {
            base: Arc::clone(descriptor),
            scale,
            body,
        })
    }
}

/// Number of objects for one pass: uniform in `[min(5, max_count), max_count]`.
fn draw_count<R: Rng + ?Sized>(rng: &mut R, max_count: usize) -> usize {
    let low = MIN_OBJECTS_PER_PASS.min(max_count);
    if low >= max_count {
        return max_count;
    }
    rng.random_range(low..=max_count)
}
