//! Collision Event Router
//!
//! Entities register typed [`Reaction`]s keyed by (owner, tag of the
//! other participant, phase). A contact between A and B is delivered to
//! A's handlers for B's tag and to B's handlers for A's tag.
//!
//! ## Delivery Rules
//!
//! - The handler set for a contact is captured before any handler for
//!   that contact runs, so handlers registered mid-dispatch never fire
//!   retroactively.
//! - A delivery is dropped if either participant has been destroyed,
//!   including by an earlier handler in the same tick.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, trace};

use crate::game::enemy;
use crate::game::entity::{EntityId, Tag};
use crate::game::player;
use crate::game::world::World;

/// Contact phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContactPhase {
    /// Colliders started overlapping
    Begin,
    /// Colliders stopped overlapping
    End,
}

/// A contact notification between two entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Contact {
    /// Begin or end
    pub phase: ContactPhase,
    /// First participant
    pub a: EntityId,
    /// Second participant
    pub b: EntityId,
}

impl Contact {
    /// Contact-begin between `a` and `b`.
    pub fn begin(a: EntityId, b: EntityId) -> Self {
        Self { phase: ContactPhase::Begin, a, b }
    }

    /// Contact-end between `a` and `b`.
    pub fn end(a: EntityId, b: EntityId) -> Self {
        Self { phase: ContactPhase::End, a, b }
    }
}

/// Handler behavior, run with (owner, counterpart).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    /// Player touched an enemy: capture or take damage
    PlayerHitByEnemy,
    /// Player touched the exit: advance to the next scene
    PlayerReachedExit,
    /// Enemy entered the inhale zone: becomes inhalable
    EnemyEnteredInhaleZone,
    /// Enemy left the inhale zone: no longer inhalable
    EnemyLeftInhaleZone,
    /// Enemy hit by a shooting star: both destroyed
    EnemyHitByStar,
    /// Shooting star hit a platform: star destroyed
    StarHitPlatform,
}

type HandlerKey = (EntityId, Tag, ContactPhase);

/// Registered contact handlers.
#[derive(Clone, Debug, Default)]
pub struct CollisionEventRouter {
    handlers: BTreeMap<HandlerKey, Vec<Reaction>>,
}

impl CollisionEventRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reaction` on `owner` for contacts with entities tagged `other`.
    pub fn register(&mut self, owner: EntityId, other: Tag, phase: ContactPhase, reaction: Reaction) {
        self.handlers
            .entry((owner, other, phase))
            .or_default()
            .push(reaction);
    }

    /// Remove every handler owned by `owner`. Returns how many were removed.
    pub fn unregister_entity(&mut self, owner: EntityId) -> usize {
        let mut removed = 0;
        self.handlers.retain(|(id, _, _), reactions| {
            if *id == owner {
                removed += reactions.len();
                false
            } else {
                true
            }
        });
        removed
    }

    /// Handlers `owner` has for contacts with `other` in `phase`.
    pub fn handlers_for(&self, owner: EntityId, other: Tag, phase: ContactPhase) -> &[Reaction] {
        self.handlers
            .get(&(owner, other, phase))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `owner` has any handler registered.
    pub fn is_registered(&self, owner: EntityId) -> bool {
        self.handlers.keys().any(|(id, _, _)| *id == owner)
    }

    /// Total registered reactions.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

/// Deliver a batch of contacts. Returns the number of reactions run.
pub fn dispatch(world: &mut World, contacts: &[Contact]) -> usize {
    dispatch_with(world, contacts, apply)
}

/// [`dispatch`] with a caller-supplied reaction runner, called as
/// `(world, reaction, owner, other)`.
pub fn dispatch_with<F>(world: &mut World, contacts: &[Contact], mut run: F) -> usize
where
    F: FnMut(&mut World, Reaction, EntityId, EntityId),
{
    let mut delivered = 0;

    for contact in contacts {
        let (Some(tag_a), Some(tag_b)) = (world.tag_of(contact.a), world.tag_of(contact.b)) else {
            trace!("Dropping {:?}: participant already destroyed", contact);
            continue;
        };

        let deliveries: Vec<(EntityId, EntityId, Reaction)> = world
            .router
            .handlers_for(contact.a, tag_b, contact.phase)
            .iter()
            .map(|r| (contact.a, contact.b, *r))
            .chain(
                world
                    .router
                    .handlers_for(contact.b, tag_a, contact.phase)
                    .iter()
                    .map(|r| (contact.b, contact.a, *r)),
            )
            .collect();

        for (owner, other, reaction) in deliveries {
            if !world.contains(owner) || !world.contains(other) {
                debug!("Skipping {:?} on {:?}: destroyed earlier this tick", reaction, owner);
                continue;
            }
            run(world, reaction, owner, other);
            delivered += 1;
        }
    }

    delivered
}

fn apply(world: &mut World, reaction: Reaction, owner: EntityId, other: EntityId) {
    match reaction {
        Reaction::PlayerHitByEnemy => player::on_enemy_contact(world, owner, other),
        Reaction::PlayerReachedExit => player::on_exit_contact(world, owner),
        Reaction::EnemyEnteredInhaleZone => enemy::set_inhalable(world, owner, true),
        Reaction::EnemyLeftInhaleZone => enemy::set_inhalable(world, owner, false),
        Reaction::EnemyHitByStar => enemy::on_star_contact(world, owner, other),
        Reaction::StarHitPlatform => player::on_star_hit_platform(world, owner),
    }
}
