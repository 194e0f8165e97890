//! Post-simulation cleanup of the scene.
//!
//! After every simulation burst each placed object gets a [`Verdict`]:
//! - **BadContact**: it sinks into another body. One side of the pair is
//!   removed, the other is lifted slightly and kept.
//! - **BelowFloor**: it fell through the floor and is removed.
//! - **Translating** / **Rotating**: still moving, kept for the next burst.
//! - **Settled**: at rest, kept and eligible for export.

use std::collections::HashSet;

use nalgebra::Vector3;

use crate::config::{FLOOR_THRESHOLD, MAX_SETTLED_SPEED, MAX_SETTLED_SPIN, NUDGE_HEIGHT};
use crate::contact::ContactRelation;
use crate::physics::{BodyId, BodyState, PhysicsWorld};
use crate::scene::Scene;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Aabb;
    use crate::object::ObjectDescriptor;
    use crate::physics::{BodyDesc, BodyKind, Shape};
    use crate::scene::PlacedObject;
    use crate::scripted::ScriptedWorld;
    use nalgebra::Point3;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn descriptor() -> Arc<ObjectDescriptor> {
        Arc::new(ObjectDescriptor {
            name: "crate".to_string(),
            mesh_path: PathBuf::from("crate.obj"),
            tag: "0".to_string(),
            min_volume: 1.0,
            max_volume: 1.0,
            is_large: true,
        })
    }

    fn empty_scene() -> Scene {
        let bounds = Aabb::new(Point3::new(-5.0, 0.0, -5.0), Point3::new(5.0, 3.0, 5.0));
        Scene::new(descriptor(), bounds)
    }

    fn drop_box(scene: &mut Scene, world: &mut ScriptedWorld, position: Point3<f32>) -> BodyId {
        let body = world
            .add_body(BodyDesc {
                shape: Shape::Cuboid(Vector3::new(0.5, 0.5, 0.5)),
                kind: BodyKind::Dynamic,
                position,
                yaw: 0.0,
                mass: 1.0,
                friction: 0.5,
            })
            .unwrap();
        scene.moving_objects.push(PlacedObject {
            base: descriptor(),
            scale: 1.0,
            body,
        });
        body
    }

    #[test]
    fn clean_scene_is_untouched() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        for i in 0..4 {
            drop_box(&mut scene, &mut world, Point3::new(i as f32 * 2.0 - 3.0, 0.5, 0.0));
        }
        for _ in 0..3 {
            let report = remediate(&mut scene, &mut world);
            assert_eq!(report.removed, 0);
            assert_eq!(report.nudged, 0);
            assert_eq!(report.kept, 4);
        }
        assert_eq!(scene.moving_objects.len(), 4);
        assert_eq!(world.body_count(), 4);
    }

    #[test]
    fn later_body_of_a_bad_pair_is_removed() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let a = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
        let b = drop_box(&mut scene, &mut world, Point3::new(0.2, 0.5, 0.0));
        world.add_contact(a, b, -0.3);

        let report = remediate(&mut scene, &mut world);
        assert_eq!(report.removed, 1);
        assert_eq!(report.nudged, 1);
        assert!(world.body_state(b).is_none());
        let kept = world.body(a).unwrap();
        assert!((kept.state.position.y - (0.5 + NUDGE_HEIGHT)).abs() < 1e-6);
        assert_eq!(kept.force_clears, 1);
        assert_eq!(scene.moving_objects.len(), 1);
        assert_eq!(scene.moving_objects[0].body, a);
    }

    #[test]
    fn tie_break_does_not_depend_on_report_order() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let a = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
        let b = drop_box(&mut scene, &mut world, Point3::new(0.2, 0.5, 0.0));
        world.add_contact(b, a, -0.3);

        remediate(&mut scene, &mut world);
        assert!(world.body_state(a).is_some());
        assert!(world.body_state(b).is_none());
    }

    #[test]
    fn first_visited_is_removed_in_either_order() {
        for swap in [false, true] {
            let mut scene = empty_scene();
            let mut world = ScriptedWorld::new();
            let first = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
            let second = drop_box(&mut scene, &mut world, Point3::new(0.3, 0.5, 0.0));
            if swap {
                scene.moving_objects.swap(0, 1);
            }
            world.add_contact(first, second, -0.2);
            // newest entry is visited first
            let visited_first = scene.moving_objects[1].body;
            let visited_second = scene.moving_objects[0].body;

            remediate(&mut scene, &mut world);
            assert!(world.body_state(visited_first).is_none(), "swap: {}", swap);
            let survivor = world.body(visited_second).unwrap();
            assert_eq!(survivor.force_clears, 1);
            assert!((survivor.state.position.y - 0.6).abs() < 1e-6);
        }
    }

    #[test]
    fn contact_with_fixed_body_removes_object() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let wall = world
            .add_body(BodyDesc {
                shape: Shape::Cuboid(Vector3::new(0.1, 2.0, 5.0)),
                kind: BodyKind::Fixed,
                position: Point3::new(5.0, 1.5, 0.0),
                yaw: 0.0,
                mass: 0.0,
                friction: 0.4,
            })
            .unwrap();
        let a = drop_box(&mut scene, &mut world, Point3::new(4.6, 0.5, 0.0));
        world.add_contact(wall, a, -0.4);

        let report = remediate(&mut scene, &mut world);
        assert_eq!(report.removed, 1);
        assert!(scene.moving_objects.is_empty());
        assert!(world.body_state(wall).is_some());
    }

    #[test]
    fn shallow_contacts_are_kept() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let a = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
        let b = drop_box(&mut scene, &mut world, Point3::new(0.99, 0.5, 0.0));
        world.add_contact(a, b, -0.01);
        let report = remediate(&mut scene, &mut world);
        assert_eq!(report.removed, 0);
        assert_eq!(report.kept, 2);
    }

    #[test]
    fn fallen_objects_are_removed() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let a = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
        let b = drop_box(&mut scene, &mut world, Point3::new(0.0, -8.0, 0.0));
        let report = remediate(&mut scene, &mut world);
        assert_eq!(report.removed, 1);
        assert!(world.body_state(a).is_some());
        assert!(world.body_state(b).is_none());
    }

    #[test]
    fn moving_objects_stay_unsettled() {
        let mut scene = empty_scene();
        let mut world = ScriptedWorld::new();
        let a = drop_box(&mut scene, &mut world, Point3::new(0.0, 0.5, 0.0));
        let b = drop_box(&mut scene, &mut world, Point3::new(2.0, 0.5, 0.0));
        world.set_velocity(a, Vector3::new(0.0, -1.5, 0.0), Vector3::zeros());
        world.set_velocity(b, Vector3::zeros(), Vector3::new(0.0, 2.5, 0.0));

        let report = remediate(&mut scene, &mut world);
        assert_eq!(report.unsettled, 2);
        assert_eq!(report.kept, 0);
        assert_eq!(scene.moving_objects.len(), 2);
    }

    #[test]
    fn classify_orders_checks() {
        let relation = ContactRelation::default();
        let mut state = BodyState::at_rest(Point3::new(0.0, -7.5, 0.0));
        state.linear_velocity = Vector3::new(5.0, 0.0, 0.0);
        assert_eq!(classify(&relation, BodyId(0), &state), Verdict::BelowFloor);

        state.position.y = 0.0;
        state.angular_velocity = Vector3::new(3.0, 0.0, 0.0);
        assert_eq!(classify(&relation, BodyId(0), &state), Verdict::Translating);

        state.linear_velocity = Vector3::zeros();
        assert_eq!(classify(&relation, BodyId(0), &state), Verdict::Rotating);

        state.angular_velocity = Vector3::new(2.0, 0.0, 0.0);
        assert_eq!(classify(&relation, BodyId(0), &state), Verdict::Settled);
    }
}

/// What remediation makes of a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    BadContact,
    BelowFloor,
    Translating,
    Rotating,
    Settled,
}

/// Classifies one body. The checks are ordered: a fallen body that is also
/// still moving is `BelowFloor`, a bad contact wins over everything.
pub fn classify(relation: &ContactRelation, id: BodyId, state: &BodyState) -> Verdict {
    if relation.is_bad(id) {
        Verdict::BadContact
    } else if state.position.y < FLOOR_THRESHOLD {
        Verdict::BelowFloor
    } else if state.linear_velocity.norm() > MAX_SETTLED_SPEED {
        Verdict::Translating
    } else if state.angular_velocity.norm() > MAX_SETTLED_SPIN {
        Verdict::Rotating
    } else {
        Verdict::Settled
    }
}

/// Outcome of one remediation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemediationReport {
    pub removed: usize,
    pub nudged: usize,
    pub unsettled: usize,
    /// Objects found at rest.
    pub kept: usize,
}

/// Removes or nudges objects in bad contact and drops fallen ones.
///
/// Objects are visited newest first. When a body is removed for a bad
/// contact its partner goes into a pending set; reaching that partner later
/// in the same pass lifts it by [`NUDGE_HEIGHT`] instead of removing it, so
/// only one side of each overlapping pair is lost.
pub fn remediate(scene: &mut Scene, world: &mut dyn PhysicsWorld) -> RemediationReport {
    let relation = ContactRelation::validate(&world.contacts());
    let mut pending: HashSet<BodyId> = HashSet::new();
    let mut report = RemediationReport::default();

    for index in (0..scene.moving_objects.len()).rev() {
        let id = scene.moving_objects[index].body;
        let Some(state) = world.body_state(id) else {
            log::warn!("body {} of {} is gone from the world", id, scene.moving_objects[index].base.name);
            scene.moving_objects.remove(index);
            report.removed += 1;
            continue;
        };

        match classify(&relation, id, &state) {
            Verdict::BadContact if pending.contains(&id) => {
                world.clear_forces(id);
                world.set_position(id, state.position + Vector3::y() * NUDGE_HEIGHT);
                report.nudged += 1;
            }
            verdict @ (Verdict::BadContact | Verdict::BelowFloor) => {
                if let Some(partner) = relation.partner(id) {
                    pending.insert(partner);
                }
                let object = scene.moving_objects.remove(index);
                world.remove_body(id);
                log::debug!("removed {} {} ({:?})", object.base.name, id, verdict);
                report.removed += 1;
            }
            Verdict::Translating | Verdict::Rotating => report.unsettled += 1,
            Verdict::Settled => report.kept += 1,
        }
    }

    log::info!(
        "remediation: {} bad contacts, removed {}, nudged {}, moving {}, settled {}",
        relation.bad_count(),
        report.removed,
        report.nudged,
        report.unsettled,
        report.kept
    );
    report
}
