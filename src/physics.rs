//! Contract between the scene core and a rigid-body physics engine.
//!
//! The core never integrates anything itself. It inserts bodies, advances the
//! simulation, reads back contacts and kinematics, and pushes small position
//! corrections. Any engine that implements [`PhysicsWorld`] can drive it.

use std::fmt;

use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

use crate::error::Result;
use crate::geom::{Aabb, Mesh};

/// Stable identity of a body inserted into a [`PhysicsWorld`].
///
/// Ids are never reused within one world, so a stale id held across a
/// removal simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves (layout shell, ground).
    Fixed,
    /// Moved by gravity and contacts.
    Dynamic,
}

/// Collision geometry of a body, in the body frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// An already scaled triangle mesh.
    Mesh(Mesh),
    /// A box given by its half extents.
    Cuboid(Vector3<f32>),
}

impl Shape {
    /// Local bounds of the shape under a rotation.
    pub fn bounds_rotated(&self, rotation: &Rotation3<f32>) -> Option<Aabb> {
        match self {
            Shape::Mesh(mesh) => mesh.bounds_rotated(rotation),
            Shape::Cuboid(half) => {
                let mut corners = Vec::with_capacity(8);
                for sx in [-1.0, 1.0] {
                    for sy in [-1.0, 1.0] {
                        for sz in [-1.0, 1.0] {
                            corners.push(rotation * Point3::new(sx * half.x, sy * half.y, sz * half.z));
                        }
                    }
                }
                Aabb::from_points(&corners)
            }
        }
    }
}

/// Everything an engine needs to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    pub kind: BodyKind,
    pub position: Point3<f32>,
    /// Rotation about the vertical axis, radians.
    pub yaw: f32,
    pub mass: f32,
    pub friction: f32,
}

impl BodyDesc {
    pub fn rotation(&self) -> Rotation3<f32> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), self.yaw)
    }

    /// World-space bounds of the body at its initial pose.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.shape
            .bounds_rotated(&self.rotation())
            .map(|b| b.translated(&self.position.coords))
    }
}

/// Kinematic state of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Point3<f32>,
    pub rotation: Matrix3<f32>,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
}

impl BodyState {
    pub fn at_rest(position: Point3<f32>) -> Self {
        Self {
            position,
            rotation: Matrix3::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

/// One contact point reported by the engine.
///
/// `distance` is signed: negative values mean the bodies interpenetrate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub point_a: Point3<f32>,
    pub point_b: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
    pub impulse: f32,
    pub body_a: BodyId,
    pub body_b: BodyId,
}

/// A rigid-body simulation the scene can be validated against.
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId>;

    /// Removes a body. Unknown ids are ignored.
    fn remove_body(&mut self, id: BodyId);

    /// Advances the simulation by one step of `dt` seconds.
    fn step(&mut self, dt: f32);

    /// All contact points currently known to the engine.
    fn contacts(&self) -> Vec<ContactEvent>;

    fn body_state(&self, id: BodyId) -> Option<BodyState>;

    /// World-space bounds of a body's colliders.
    fn body_aabb(&self, id: BodyId) -> Option<Aabb>;

    fn set_position(&mut self, id: BodyId, position: Point3<f32>);

    /// Drops accumulated forces and torques on a body.
    fn clear_forces(&mut self, id: BodyId);

    fn body_count(&self) -> usize;
}
