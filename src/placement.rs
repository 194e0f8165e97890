//! Scale and position solving for a single placement.
//!
//! An object is scaled uniformly so that its bounding box volume hits a target
//! drawn from the descriptor's volume range, then its position is pushed back
//! inside the scene bounds if a face would poke out.

use nalgebra::Point3;
use rand::Rng;

use crate::config::PLACEMENT_EPSILON;
use crate::error::{Result, SceneError};
use crate::geom::{Aabb, Mesh};
use crate::object::ObjectDescriptor;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn descriptor(min_volume: f32, max_volume: f32) -> ObjectDescriptor {
        ObjectDescriptor {
            name: "crate".to_string(),
            mesh_path: PathBuf::from("crate.obj"),
            tag: "0".to_string(),
            min_volume,
            max_volume,
            is_large: true,
        }
    }

    fn box_mesh(x: f32, y: f32, z: f32) -> Mesh {
        Mesh::new(
            "box.obj",
            vec![Point3::new(-x / 2.0, 0.0, -z / 2.0), Point3::new(x / 2.0, y, z / 2.0)],
            vec![],
        )
    }

    #[test]
    fn target_volume_in_range() {
        let d = descriptor(0.5, 0.75);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let v = target_volume(&d, &mut rng);
            assert!((0.5..=0.75).contains(&v), "volume: {}", v);
        }
    }

    #[test]
    fn scaled_volume_hits_target() {
        let mesh = box_mesh(2.0, 0.5, 3.0);
        let d = descriptor(0.2, 4.0);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let mut replay = rng.clone();
            let scale = compute_scale(&d, &mesh, &mut rng).unwrap();
            let target = target_volume(&d, &mut replay);
            let achieved = mesh.bounding_box_volume() * scale.powi(3);
            assert!((achieved - target).abs() / target < 1e-4, "{} vs {}", achieved, target);
            assert!(achieved >= d.min_volume * 0.9999 && achieved <= d.max_volume * 1.0001);
        }
    }

    #[test]
    fn degenerate_mesh_has_no_scale() {
        let flat = Mesh::new(
            "flat.obj",
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 1.0)],
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let err = compute_scale(&descriptor(1.0, 2.0), &flat, &mut rng).unwrap_err();
        assert!(matches!(err, SceneError::DegenerateMesh { .. }));
    }

    #[test]
    fn correction_keeps_faces_inside() {
        let scene = Aabb::new(Point3::new(-5.0, 0.0, -5.0), Point3::new(5.0, 3.0, 5.0));
        let mesh = Aabb::new(Point3::new(-1.0, -0.5, -1.0), Point3::new(1.0, 0.5, 1.0));
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let p = Point3::new(
                rng.random_range(-8.0..8.0),
                rng.random_range(-2.0..6.0),
                rng.random_range(-8.0..8.0),
            );
            let c = correct_position(p, &mesh, &scene);
            for axis in [0, 2] {
                assert!(c[axis] + mesh.min[axis] >= scene.min[axis], "{:?} -> {:?}", p, c);
                assert!(c[axis] + mesh.max[axis] <= scene.max[axis], "{:?} -> {:?}", p, c);
            }
            assert!(c.y + mesh.min.y >= scene.min.y);
        }
    }

    #[test]
    fn correction_lands_on_bound_plus_epsilon() {
        let scene = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        let mesh = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));

        let c = correct_position(Point3::new(0.5, 0.2, 9.8), &mesh, &scene);
        assert!((c.x - (1.0 + PLACEMENT_EPSILON)).abs() < 1e-6);
        assert!((c.y - (1.0 + PLACEMENT_EPSILON)).abs() < 1e-6);
        assert!((c.z - (9.0 - PLACEMENT_EPSILON)).abs() < 1e-6);
    }

    #[test]
    fn vertical_axis_may_start_above_the_scene() {
        let scene = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 3.0, 10.0));
        let mesh = Aabb::new(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 2.0, 1.0));
        let c = correct_position(Point3::new(5.0, 8.0, 5.0), &mesh, &scene);
        assert_eq!(c, Point3::new(5.0, 8.0, 5.0));
    }

    #[test]
    fn oversized_object_prefers_lower_bound() {
        let scene = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let mesh = Aabb::new(Point3::new(-2.0, 0.0, -0.1), Point3::new(2.0, 0.1, 0.1));
        let c = correct_position(Point3::new(0.5, 0.5, 0.5), &mesh, &scene);
        assert!((c.x - (2.0 + PLACEMENT_EPSILON)).abs() < 1e-6);
    }
}

/// Index of the vertical axis. Gravity points along -y.
pub const VERTICAL_AXIS: usize = 1;

/// Draws a target volume uniformly in the descriptor's range.
pub fn target_volume<R: Rng + ?Sized>(descriptor: &ObjectDescriptor, rng: &mut R) -> f32 {
    if descriptor.min_volume >= descriptor.max_volume {
        return descriptor.min_volume;
    }
    rng.random_range(descriptor.min_volume..=descriptor.max_volume)
}

/// Size of a mesh as far as placement is concerned: its bounding box volume.
pub fn mesh_volume(mesh: &Mesh) -> f32 {
    mesh.bounding_box_volume()
}

/// Uniform scale that brings the mesh's bounding box volume to a random
/// target volume of the descriptor.
pub fn compute_scale<R: Rng + ?Sized>(descriptor: &ObjectDescriptor, mesh: &Mesh, rng: &mut R) -> Result<f32> {
    let wanted = target_volume(descriptor, rng);
    let current = mesh_volume(mesh);
    if current <= 0.0 || !current.is_finite() {
        return Err(SceneError::DegenerateMesh {
            path: mesh.path.clone(),
            volume: current,
        });
    }
    log::debug!("target volume {:.4}, mesh volume {:.4}", wanted, current);
    Ok((wanted / current).cbrt())
}

/// Moves `position` so the object's faces (given in its local frame by
/// `mesh_bounds`) stay inside `scene_bounds`.
///
/// The near face is checked first on every axis. The far face is only
/// checked on the horizontal axes: objects are allowed to start above the
/// scene and fall into it.
pub fn correct_position(position: Point3<f32>, mesh_bounds: &Aabb, scene_bounds: &Aabb) -> Point3<f32> {
    let mut corrected = position;
    for axis in 0..3 {
        if corrected[axis] + mesh_bounds.min[axis] < scene_bounds.min[axis] {
            corrected[axis] = scene_bounds.min[axis] - mesh_bounds.min[axis] + PLACEMENT_EPSILON;
        } else if axis != VERTICAL_AXIS && corrected[axis] + mesh_bounds.max[axis] > scene_bounds.max[axis] {
            corrected[axis] = scene_bounds.max[axis] - mesh_bounds.max[axis] - PLACEMENT_EPSILON;
        }
    }
    corrected
}

/// Uniform draw in `[low, high]`. An empty or inverted range collapses to `low`.
pub fn uniform_in<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if low < high {
        rng.random_range(low..=high)
    } else {
        low
    }
}

/// Uniform point inside a box, drawn x then y then z.
pub fn random_point_in<R: Rng + ?Sized>(rng: &mut R, region: &Aabb) -> Point3<f32> {
    let x = uniform_in(rng, region.min.x, region.max.x);
    let y = uniform_in(rng, region.min.y, region.max.y);
    let z = uniform_in(rng, region.min.z, region.max.z);
    Point3::new(x, y, z)
}
