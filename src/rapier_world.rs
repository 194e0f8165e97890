//! [`PhysicsWorld`] backed by the rapier engine.
//!
//! Dynamic objects collide as the convex hull of their mesh. The fixed
//! layout keeps its full triangle mesh, so objects can sit inside the room.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use rapier3d::prelude as rapier;

use crate::error::{Result, SceneError};
use crate::geom::Aabb;
use crate::physics::{BodyDesc, BodyId, BodyKind, BodyState, ContactEvent, PhysicsWorld, Shape};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONTACT_DEPTH_THRESHOLD;
    use crate::geom::Mesh;

    fn cuboid(kind: BodyKind, position: Point3<f32>, half: Vector3<f32>) -> BodyDesc {
        BodyDesc {
            shape: Shape::Cuboid(half),
            kind,
            position,
            yaw: 0.0,
            mass: 1.0,
            friction: 0.5,
        }
    }

    #[test]
    fn body_falls_onto_ground() {
        let mut world = RapierWorld::new();
        world
            .add_body(cuboid(BodyKind::Fixed, Point3::new(0.0, -2.0, 0.0), Vector3::new(10.0, 2.0, 10.0)))
            .unwrap();
        let cube = world
            .add_body(cuboid(BodyKind::Dynamic, Point3::new(0.0, 2.0, 0.0), Vector3::new(0.5, 0.5, 0.5)))
            .unwrap();
        for _ in 0..200 {
            world.step(0.02);
        }
        let state = world.body_state(cube).unwrap();
        assert!((state.position.y - 0.5).abs() < 0.05, "{:?}", state.position);
        assert!(state.linear_velocity.norm() < 0.1);
    }

    #[test]
    fn overlapping_bodies_report_penetration() {
        let mut world = RapierWorld::new();
        world.gravity = Vector3::zeros();
        let a = world
            .add_body(cuboid(BodyKind::Fixed, Point3::origin(), Vector3::new(0.5, 0.5, 0.5)))
            .unwrap();
        let b = world
            .add_body(cuboid(BodyKind::Dynamic, Point3::new(0.6, 0.0, 0.0), Vector3::new(0.5, 0.5, 0.5)))
            .unwrap();
        world.step(0.02);
        let contacts = world.contacts();
        assert!(!contacts.is_empty());
        let deepest = contacts.iter().map(|c| c.distance).fold(f32::INFINITY, f32::min);
        assert!(deepest < -CONTACT_DEPTH_THRESHOLD, "{}", deepest);
        assert!(contacts.iter().all(|c| (c.body_a == a && c.body_b == b) || (c.body_a == b && c.body_b == a)));
        let relation = crate::contact::ContactRelation::validate(&contacts);
        assert!(relation.is_bad(a) && relation.is_bad(b));
    }

    #[test]
    fn removed_bodies_stop_resolving() {
        let mut world = RapierWorld::new();
        let a = world
            .add_body(cuboid(BodyKind::Dynamic, Point3::origin(), Vector3::new(0.5, 0.5, 0.5)))
            .unwrap();
        world.remove_body(a);
        assert!(world.body_state(a).is_none());
        assert!(world.body_aabb(a).is_none());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn mesh_body_bounds_follow_pose() {
        let mut world = RapierWorld::new();
        let mesh = Mesh::new(
            "box.obj",
            vec![
                Point3::new(-1.0, 0.0, -0.5),
                Point3::new(1.0, 0.0, -0.5),
                Point3::new(1.0, 0.5, -0.5),
                Point3::new(-1.0, 0.5, -0.5),
                Point3::new(-1.0, 0.0, 0.5),
                Point3::new(1.0, 0.0, 0.5),
                Point3::new(1.0, 0.5, 0.5),
                Point3::new(-1.0, 0.5, 0.5),
            ],
            vec![],
        );
        let id = world
            .add_body(BodyDesc {
                shape: Shape::Mesh(mesh),
                kind: BodyKind::Dynamic,
                position: Point3::new(0.0, 1.0, 0.0),
                yaw: std::f32::consts::FRAC_PI_2,
                mass: 10.0,
                friction: 0.8,
            })
            .unwrap();
        let aabb = world.body_aabb(id).unwrap();
        assert!((aabb.extents().x - 1.0).abs() < 1e-3, "{:?}", aabb);
        assert!((aabb.extents().z - 2.0).abs() < 1e-3, "{:?}", aabb);
        assert!((aabb.min.y - 1.0).abs() < 1e-3, "{:?}", aabb);
    }
}

/// Rapier pipeline and body sets.
pub struct RapierWorld {
    pub gravity: Vector3<f32>,
    pub integration_parameters: rapier::IntegrationParameters,
    pub physics_pipeline: rapier::PhysicsPipeline,
    pub island_manager: rapier::IslandManager,
    pub broad_phase: rapier::DefaultBroadPhase,
    pub narrow_phase: rapier::NarrowPhase,
    pub rigid_body_set: rapier::RigidBodySet,
    pub collider_set: rapier::ColliderSet,
    pub impulse_joint_set: rapier::ImpulseJointSet,
    pub multibody_joint_set: rapier::MultibodyJointSet,
    pub ccd_solver: rapier::CCDSolver,
    handles: HashMap<BodyId, rapier::RigidBodyHandle>,
    ids: HashMap<rapier::RigidBodyHandle, BodyId>,
    next_id: u64,
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            integration_parameters: rapier::IntegrationParameters::default(),
            physics_pipeline: rapier::PhysicsPipeline::new(),
            island_manager: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            rigid_body_set: rapier::RigidBodySet::new(),
            collider_set: rapier::ColliderSet::new(),
            impulse_joint_set: rapier::ImpulseJointSet::new(),
            multibody_joint_set: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            handles: HashMap::new(),
            ids: HashMap::new(),
            next_id: 0,
        }
    }

    fn body(&self, id: BodyId) -> Option<&rapier::RigidBody> {
        self.handles.get(&id).and_then(|h| self.rigid_body_set.get(*h))
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut rapier::RigidBody> {
        let handle = *self.handles.get(&id)?;
        self.rigid_body_set.get_mut(handle)
    }

    fn body_of_collider(&self, collider: rapier::ColliderHandle) -> Option<BodyId> {
        let parent = self.collider_set.get(collider)?.parent()?;
        self.ids.get(&parent).copied()
    }

    fn collider(desc: &BodyDesc) -> Result<rapier::ColliderBuilder> {
        let builder = match (&desc.shape, desc.kind) {
            (Shape::Cuboid(half), _) => rapier::ColliderBuilder::cuboid(half.x, half.y, half.z),
            (Shape::Mesh(mesh), BodyKind::Fixed) => {
                rapier::ColliderBuilder::trimesh(mesh.vertices.clone(), mesh.triangles.clone())
                    .map_err(|e| SceneError::Physics(format!("{}: {:?}", mesh.path.display(), e)))?
            }
            (Shape::Mesh(mesh), BodyKind::Dynamic) => rapier::ColliderBuilder::convex_hull(&mesh.vertices)
                .ok_or_else(|| SceneError::DegenerateMesh {
                    path: mesh.path.clone(),
                    volume: mesh.bounding_box_volume(),
                })?,
        };
        let builder = builder.friction(desc.friction);
        Ok(match desc.kind {
            BodyKind::Dynamic => builder.mass(desc.mass),
            BodyKind::Fixed => builder,
        })
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId> {
        let collider = Self::collider(&desc)?;
        let builder = match desc.kind {
            BodyKind::Fixed => rapier::RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => rapier::RigidBodyBuilder::dynamic(),
        };
        let body = builder
            .translation(desc.position.coords)
            .rotation(Vector3::y() * desc.yaw)
            .can_sleep(true);

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.handles.insert(id, handle);
        self.ids.insert(handle, id);
        Ok(id)
    }

    fn remove_body(&mut self, id: BodyId) {
        let Some(handle) = self.handles.remove(&id) else {
            return;
        };
        self.ids.remove(&handle);
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    fn contacts(&self) -> Vec<ContactEvent> {
        let mut events = Vec::new();
        for pair in self.narrow_phase.contact_pairs() {
            let (Some(body_a), Some(body_b)) = (
                self.body_of_collider(pair.collider1),
                self.body_of_collider(pair.collider2),
            ) else {
                continue;
            };
            let (Some(c1), Some(c2)) = (self.collider_set.get(pair.collider1), self.collider_set.get(pair.collider2))
            else {
                continue;
            };
            for manifold in &pair.manifolds {
                for point in &manifold.points {
                    events.push(ContactEvent {
                        point_a: c1.position() * point.local_p1,
                        point_b: c2.position() * point.local_p2,
                        normal: manifold.data.normal,
                        distance: point.dist,
                        impulse: point.data.impulse,
                        body_a,
                        body_b,
                    });
                }
            }
        }
        events
    }

    fn body_state(&self, id: BodyId) -> Option<BodyState> {
        let body = self.body(id)?;
        Some(BodyState {
            position: Point3::from(*body.translation()),
            rotation: body.rotation().to_rotation_matrix().into_inner(),
            linear_velocity: *body.linvel(),
            angular_velocity: *body.angvel(),
        })
    }

    fn body_aabb(&self, id: BodyId) -> Option<Aabb> {
        let body = self.body(id)?;
        body.colliders()
            .iter()
            .filter_map(|h| self.collider_set.get(*h))
            .map(|c| {
                let aabb = c.compute_aabb();
                Aabb::new(aabb.mins, aabb.maxs)
            })
            .reduce(|a, b| a.union(&b))
    }

    fn set_position(&mut self, id: BodyId, position: Point3<f32>) {
        if let Some(body) = self.body_mut(id) {
            body.set_translation(position.coords, true);
        }
    }

    fn clear_forces(&mut self, id: BodyId) {
        if let Some(body) = self.body_mut(id) {
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}
