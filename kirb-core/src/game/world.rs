//! World State
//!
//! The active scene: exclusive owner of every entity plus the
//! collision router, timer queue and contact tracker that act on them.
//! A fresh `World` is built for every scene entry.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::collision::ContactTracker;
use crate::game::commands::Command;
use crate::game::entity::{Aabb, Animation, BodyKind, Entity, EntityId, EntityKind, Rect, Tag};
use crate::game::events::GameEvent;
use crate::game::player::PlayerState;
use crate::game::router::CollisionEventRouter;
use crate::game::scheduler::Scheduler;

/// Which scene a transition request points at.
///
/// Resolved against the scene state by the scene director, so the
/// world never needs to know scene names beyond its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneTarget {
    /// Restart the active scene
    Current,
    /// Advance to the successor scene
    Next,
}

/// What triggered a transition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Health reached zero
    PlayerDied,
    /// Player dropped below the world bound
    FellOutOfWorld,
    /// Player touched the exit
    ReachedExit,
}

/// Pending scene transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRequest {
    /// Requested scene
    pub target: SceneTarget,
    /// What triggered it
    pub reason: TransitionReason,
}

/// Complete state of the active scene.
#[derive(Clone, Debug)]
pub struct World {
    /// Scene this world was built for
    pub scene: String,
    /// Current tick (0 before the first tick runs)
    pub tick: u32,
    /// Seed the RNG was created from
    pub rng_seed: u64,
    /// Deterministic RNG
    pub rng: DeterministicRng,
    /// Gameplay constants
    pub config: GameConfig,
    /// Live entities (BTreeMap for deterministic iteration)
    pub entities: BTreeMap<EntityId, Entity>,
    /// The player, while alive
    pub player_id: Option<EntityId>,
    /// The player's inhale zone, while alive
    pub inhale_zone_id: Option<EntityId>,
    /// Contact handlers
    pub router: CollisionEventRouter,
    /// Deferred actions
    pub scheduler: Scheduler,
    /// Overlap pairs from the last tick
    pub contacts: ContactTracker,
    /// Area outside of which flyers and projectiles are culled
    pub playfield: Option<Rect>,
    /// Camera follows the player while the player is left of this x
    pub camera_limit: Option<Fixed>,

    next_entity_id: u32,
    scene_request: Option<SceneRequest>,
    pending_events: Vec<GameEvent>,
    pending_commands: Vec<Command>,
}

impl World {
    /// Create an empty world for `scene`.
    pub fn new(scene: impl Into<String>, config: GameConfig) -> Self {
        let rng_seed = config.rng_seed;
        Self {
            scene: scene.into(),
            tick: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            config,
            entities: BTreeMap::new(),
            player_id: None,
            inhale_zone_id: None,
            router: CollisionEventRouter::new(),
            scheduler: Scheduler::new(),
            contacts: ContactTracker::new(),
            playfield: None,
            camera_limit: None,
            next_entity_id: 1,
            scene_request: None,
            pending_events: Vec::new(),
            pending_commands: Vec::new(),
        }
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Add an entity and issue its create command.
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        position: FixedVec2,
        collider: Aabb,
        body: BodyKind,
        animation: Animation,
    ) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;

        let entity = Entity::new(id, kind, position, collider, body, animation);
        self.pending_commands.push(Command::Create {
            id,
            tag: entity.tag(),
            shape: entity.bounds(),
            body,
        });
        if animation != Animation::None {
            self.pending_commands.push(Command::SetAnimation { id, animation });
        }

        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, its timers, its handlers and its contacts.
    ///
    /// Idempotent: returns false if the entity was already gone.
    /// Destroying the player also removes its inhale zone.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };

        let timers = self.scheduler.cancel_owner(id);
        let handlers = self.router.unregister_entity(id);
        self.contacts.forget(id);
        self.pending_commands.push(Command::Destroy { id });

        debug!(
            "Destroyed {} {:?} (cancelled {} timers, {} handlers)",
            entity.tag().as_str(),
            id,
            timers,
            handlers
        );

        if self.player_id == Some(id) {
            self.player_id = None;
            if let Some(zone) = self.inhale_zone_id.take() {
                self.destroy(zone);
            }
        }
        if self.inhale_zone_id == Some(id) {
            self.inhale_zone_id = None;
        }

        true
    }

    /// Entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Whether an entity is alive.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Tag of a live entity.
    pub fn tag_of(&self, id: EntityId) -> Option<Tag> {
        self.entities.get(&id).map(Entity::tag)
    }

    /// The player entity, while alive.
    pub fn player(&self) -> Option<&Entity> {
        self.player_id.and_then(|id| self.entities.get(&id))
    }

    /// The player's state, while alive.
    pub fn player_state(&self) -> Option<&PlayerState> {
        self.player().and_then(Entity::as_player)
    }

    /// Ids of every live entity carrying `tag`, in id order.
    pub fn ids_with_tag(&self, tag: Tag) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.tag() == tag)
            .map(|e| e.id)
            .collect()
    }

    /// Number of live enemies.
    pub fn enemy_count(&self) -> usize {
        self.entities.values().filter(|e| e.tag() == Tag::Enemy).count()
    }

    // =========================================================================
    // OUTPUT QUEUES
    // =========================================================================

    /// Request a scene transition. The first request in a tick wins.
    pub fn request_scene(&mut self, target: SceneTarget, reason: TransitionReason) -> bool {
        if let Some(existing) = self.scene_request {
            debug!(
                "Ignoring {:?} request ({:?}); {:?} already pending",
                target, reason, existing.target
            );
            return false;
        }

        info!("Scene {}: requesting {:?} scene ({:?})", self.scene, target, reason);
        self.scene_request = Some(SceneRequest { target, reason });
        self.push_event(GameEvent::scene_requested(self.tick, target, reason));
        true
    }

    /// Pending transition request.
    pub fn scene_request(&self) -> Option<SceneRequest> {
        self.scene_request
    }

    /// Take the pending transition request.
    pub fn take_scene_request(&mut self) -> Option<SceneRequest> {
        self.scene_request.take()
    }

    /// Queue a command for the host.
    pub fn push_command(&mut self, command: Command) {
        self.pending_commands.push(command);
    }

    /// Commands queued so far this tick.
    pub fn pending_commands(&self) -> &[Command] {
        &self.pending_commands
    }

    /// Take queued commands in issue order.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Record a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Events recorded so far this tick.
    pub fn pending_events(&self) -> &[GameEvent] {
        &self.pending_events
    }

    /// Take recorded events in priority order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.pending_events);
        events.sort();
        events
    }

    // =========================================================================
    // VERIFICATION
    // =========================================================================

    /// Hash of everything that affects future simulation.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_str(&self.scene);
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);

            hasher.update_u32(self.entities.len() as u32);
            for entity in self.entities.values() {
                hasher.update_u32(entity.id.0);
                hasher.update_u8(entity.tag() as u8);
                hasher.update_vec2(entity.position);
                hasher.update_vec2(entity.velocity);
                hasher.update_bool(entity.grounded);
                hasher.update_bool(entity.flip_x);
                hasher.update_u8(entity.animation as u8);
                hasher.update_fixed(entity.opacity);

                match &entity.kind {
                    EntityKind::Player(player) => player.hash_into(hasher),
                    EntityKind::Enemy(enemy) => enemy.hash_into(hasher),
                    EntityKind::ShootingStar { direction } => hasher.update_u8(*direction as u8),
                    EntityKind::InhaleZone { owner } => hasher.update_u32(owner.0),
                    EntityKind::Platform | EntityKind::Exit => {}
                }
            }

            hasher.update_u32(self.scheduler.len() as u32);
            hasher.update_bool(self.scene_request.is_some());
        })
    }
}
