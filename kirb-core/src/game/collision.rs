//! Contact Detection
//!
//! Frame-to-frame AABB overlap tracking. Every tick the set of
//! overlapping pairs is recomputed and diffed against the previous
//! tick: new pairs become contact-begin, vanished pairs contact-end.
//!
//! Hosts with their own physics can skip this and feed contacts
//! straight into the router.

use std::collections::{BTreeMap, BTreeSet};

use crate::game::entity::{BodyKind, Entity, EntityId, Rect, Tag};
use crate::game::router::Contact;

/// Strict AABB overlap (touching edges do not count).
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.overlaps(b)
}

/// Whether two tags can produce contacts at all.
///
/// Enemies ignore other enemies, static level colliders ignore each
/// other, and the inhale zone only reacts to enemies.
pub fn should_collide(a: Tag, b: Tag) -> bool {
    match (a, b) {
        (Tag::Enemy, Tag::Enemy) => false,
        (Tag::Platform | Tag::Exit, Tag::Platform | Tag::Exit) => false,
        (Tag::InhaleZone, Tag::Enemy) | (Tag::Enemy, Tag::InhaleZone) => true,
        (Tag::InhaleZone, _) | (_, Tag::InhaleZone) => false,
        _ => true,
    }
}

/// Overlapping pairs from the previous tick.
#[derive(Clone, Debug, Default)]
pub struct ContactTracker {
    active: BTreeSet<(EntityId, EntityId)>,
}

impl ContactTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute overlaps and return the contacts that changed.
    ///
    /// Ends are reported before begins; each group is in pair order.
    pub fn update(&mut self, entities: &BTreeMap<EntityId, Entity>) -> Vec<Contact> {
        let colliders: Vec<(EntityId, Tag, Rect, bool)> = entities
            .values()
            .map(|e| (e.id, e.tag(), e.bounds(), e.body == BodyKind::Static))
            .collect();

        let mut current = BTreeSet::new();
        for i in 0..colliders.len() {
            let (id_a, tag_a, rect_a, static_a) = colliders[i];
            for &(id_b, tag_b, rect_b, static_b) in &colliders[i + 1..] {
                if static_a && static_b {
                    continue;
                }
                if !should_collide(tag_a, tag_b) {
                    continue;
                }
                if overlaps(&rect_a, &rect_b) {
                    current.insert((id_a, id_b));
                }
            }
        }

        let mut contacts: Vec<Contact> = self
            .active
            .difference(&current)
            .map(|&(a, b)| Contact::end(a, b))
            .collect();
        contacts.extend(
            current
                .difference(&self.active)
                .map(|&(a, b)| Contact::begin(a, b)),
        );

        self.active = current;
        contacts
    }

    /// Drop every pair involving `id` without reporting an end.
    pub fn forget(&mut self, id: EntityId) {
        self.active.retain(|&(a, b)| a != id && b != id);
    }

    /// Whether two entities overlapped at the last update.
    pub fn is_touching(&self, a: EntityId, b: EntityId) -> bool {
        let pair = if a < b { (a, b) } else { (b, a) };
        self.active.contains(&pair)
    }

    /// Number of overlapping pairs.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// No overlapping pairs.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::FixedVec2;
    use crate::game::enemy::{EnemyState, EnemyVariant};
    use crate::game::entity::{Aabb, Animation, EntityKind};
    use crate::game::router::ContactPhase;

    fn boxed(id: u32, kind: EntityKind, x: i32, body: BodyKind) -> Entity {
        Entity::new(
            EntityId(id),
            kind,
            FixedVec2::from_ints(x, 0),
            Aabb::new(FixedVec2::ZERO, FixedVec2::from_ints(10, 10)),
            body,
            Animation::None,
        )
    }

    fn enemy(id: u32, x: i32) -> Entity {
        boxed(id, EntityKind::Enemy(EnemyState::new(EnemyVariant::Flame)), x, BodyKind::Dynamic)
    }

    fn world_of(entities: Vec<Entity>) -> BTreeMap<EntityId, Entity> {
        entities.into_iter().map(|e| (e.id, e)).collect()
    }

    #[test]
    fn test_collision_ignore_rules() {
        assert!(!should_collide(Tag::Enemy, Tag::Enemy));
        assert!(!should_collide(Tag::Platform, Tag::Exit));
        assert!(!should_collide(Tag::InhaleZone, Tag::Player));
        assert!(!should_collide(Tag::Platform, Tag::InhaleZone));
        assert!(should_collide(Tag::Enemy, Tag::InhaleZone));
        assert!(should_collide(Tag::Player, Tag::Enemy));
        assert!(should_collide(Tag::ShootingStar, Tag::Platform));
    }

    #[test]
    fn test_begin_then_end() {
        let mut tracker = ContactTracker::new();
        let mut entities = world_of(vec![
            enemy(1, 0),
            boxed(2, EntityKind::ShootingStar { direction: Default::default() }, 5, BodyKind::Kinematic),
        ]);

        let contacts = tracker.update(&entities);
        assert_eq!(contacts, vec![Contact::begin(EntityId(1), EntityId(2))]);

        // Still overlapping: nothing new
        assert!(tracker.update(&entities).is_empty());
        assert!(tracker.is_touching(EntityId(2), EntityId(1)));

        entities.get_mut(&EntityId(2)).unwrap().position = FixedVec2::from_ints(50, 0);
        let contacts = tracker.update(&entities);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].phase, ContactPhase::End);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_enemies_never_touch() {
        let mut tracker = ContactTracker::new();
        let entities = world_of(vec![enemy(1, 0), enemy(2, 2)]);
        assert!(tracker.update(&entities).is_empty());
    }

    #[test]
    fn test_static_pairs_skipped() {
        let mut tracker = ContactTracker::new();
        let entities = world_of(vec![
            boxed(1, EntityKind::Platform, 0, BodyKind::Static),
            boxed(2, EntityKind::Platform, 5, BodyKind::Static),
        ]);
        assert!(tracker.update(&entities).is_empty());
    }

    #[test]
    fn test_forget_suppresses_end() {
        let mut tracker = ContactTracker::new();
        let mut entities = world_of(vec![
            enemy(1, 0),
            boxed(2, EntityKind::Exit, 5, BodyKind::Trigger),
        ]);
        assert_eq!(tracker.update(&entities).len(), 1);

        entities.remove(&EntityId(1));
        tracker.forget(EntityId(1));
        assert!(tracker.update(&entities).is_empty());
    }
}
