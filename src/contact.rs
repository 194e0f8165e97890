//! Bad-contact detection from engine contact reports.
//!
//! A contact is bad when the two bodies interpenetrate deeper than
//! [`CONTACT_DEPTH_THRESHOLD`]. The relation is symmetric and only lives for
//! one remediation pass; it is rebuilt from scratch each time.

use std::collections::HashMap;

use crate::config::CONTACT_DEPTH_THRESHOLD;
use crate::physics::{BodyId, ContactEvent};

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn event(a: u64, b: u64, distance: f32) -> ContactEvent {
        ContactEvent {
            point_a: Point3::origin(),
            point_b: Point3::origin(),
            normal: Vector3::y(),
            distance,
            impulse: 0.0,
            body_a: BodyId(a),
            body_b: BodyId(b),
        }
    }

    #[test]
    fn deep_contacts_are_bad_both_ways() {
        let relation = ContactRelation::validate(&[event(1, 2, -0.2)]);
        assert!(relation.is_bad(BodyId(1)));
        assert!(relation.is_bad(BodyId(2)));
        assert_eq!(relation.partner(BodyId(1)), Some(BodyId(2)));
        assert_eq!(relation.partner(BodyId(2)), Some(BodyId(1)));
    }

    #[test]
    fn shallow_and_separating_contacts_are_ignored() {
        let relation = ContactRelation::validate(&[event(1, 2, -0.05), event(3, 4, -0.01), event(5, 6, 0.3)]);
        assert!(relation.is_empty());
        for id in 1..=6 {
            assert!(!relation.is_bad(BodyId(id)));
            assert_eq!(relation.partner(BodyId(id)), None);
        }
    }

    #[test]
    fn last_contact_wins_the_link() {
        let relation = ContactRelation::validate(&[event(1, 2, -0.1), event(1, 3, -0.1)]);
        assert_eq!(relation.partner(BodyId(1)), Some(BodyId(3)));
        assert_eq!(relation.partner(BodyId(2)), Some(BodyId(1)));
        assert_eq!(relation.bad_count(), 3);
    }
}

/// Which bodies are in bad contact, and with whom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRelation {
    bad: HashMap<BodyId, bool>,
    linked: HashMap<BodyId, BodyId>,
}

impl ContactRelation {
    /// Builds the relation from one contact report.
    ///
    /// Distances are signed, negative meaning penetration. Anything at or
    /// above `-CONTACT_DEPTH_THRESHOLD` is shallow or separating and ignored.
    /// When a body is in several bad contacts, the last one reported is the
    /// one it stays linked to.
    pub fn validate(events: &[ContactEvent]) -> Self {
        let mut relation = ContactRelation::default();
        for event in events.iter().filter(|e| e.distance < -CONTACT_DEPTH_THRESHOLD) {
            relation.bad.insert(event.body_a, true);
            relation.bad.insert(event.body_b, true);
            relation.linked.insert(event.body_a, event.body_b);
            relation.linked.insert(event.body_b, event.body_a);
        }
        relation
    }

    pub fn is_bad(&self, id: BodyId) -> bool {
        self.bad.get(&id).copied().unwrap_or(false)
    }

    /// The body `id` was last seen in bad contact with.
    pub fn partner(&self, id: BodyId) -> Option<BodyId> {
        self.linked.get(&id).copied()
    }

    pub fn bad_count(&self) -> usize {
        self.bad.values().filter(|&&bad| bad).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bad.is_empty()
    }
}
