//! A deterministic, engine-free [`PhysicsWorld`].
//!
//! `ScriptedWorld` keeps bodies exactly where they were put. Nothing falls and
//! nothing collides unless the caller says so: contacts and velocities are set
//! by hand. It backs the unit and integration tests, and dry runs of the
//! generator when no physics engine is compiled in.

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::geom::Aabb;
use crate::physics::{BodyDesc, BodyId, BodyState, ContactEvent, PhysicsWorld};


#[derive(Debug, Clone)]
pub struct ScriptedBody {
    pub desc: BodyDesc,
    pub state: BodyState,
    /// Number of times `clear_forces` was called on this body.
    pub force_clears: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedWorld {
    bodies: BTreeMap<BodyId, ScriptedBody>,
    contacts: Vec<ContactEvent>,
    next_id: u64,
    pub steps: usize,
}

impl ScriptedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self, id: BodyId) -> Option<&ScriptedBody> {
        self.bodies.get(&id)
    }

    /// Reports a contact between two bodies, with contact points at their positions.
    pub fn add_contact(&mut self, a: BodyId, b: BodyId, distance: f32) {
        let pa = self.bodies.get(&a).map_or(Point3::origin(), |body| body.state.position);
        let pb = self.bodies.get(&b).map_or(Point3::origin(), |body| body.state.position);
        let normal = (pb - pa).try_normalize(1e-6).unwrap_or_else(Vector3::y);
        self.contacts.push(ContactEvent {
            point_a: pa,
            point_b: pb,
            normal,
            distance,
            impulse: 0.0,
            body_a: a,
            body_b: b,
        });
    }

    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }

    pub fn set_velocity(&mut self, id: BodyId, linear: Vector3<f32>, angular: Vector3<f32>) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.state.linear_velocity = linear;
            body.state.angular_velocity = angular;
        }
    }
}

impl PhysicsWorld for ScriptedWorld {
    fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId> {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        let mut state = BodyState::at_rest(desc.position);
        state.rotation = desc.rotation().into_inner();
        self.bodies.insert(
            id,
            ScriptedBody {
                desc,
                state,
                force_clears: 0,
            },
        );
        Ok(id)
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
        self.contacts.retain(|c| c.body_a != id && c.body_b != id);
    }

    fn step(&mut self, _dt: f32) {
        self.steps += 1;
    }

    fn contacts(&self) -> Vec<ContactEvent> {
        self.contacts.clone()
    }

    fn body_state(&self, id: BodyId) -> Option<BodyState> {
        self.bodies.get(&id).map(|b| b.state)
    }

    fn body_aabb(&self, id: BodyId) -> Option<Aabb> {
        let body = self.bodies.get(&id)?;
        let local = body.desc.shape.bounds_rotated(&body.desc.rotation())?;
        Some(local.translated(&body.state.position.coords))
    }

    fn set_position(&mut self, id: BodyId, position: Point3<f32>) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.state.position = position;
        }
    }

    fn clear_forces(&mut self, id: BodyId) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.force_clears += 1;
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
