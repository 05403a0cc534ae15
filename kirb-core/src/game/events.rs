//! Game Events
//!
//! Tick-stamped record of everything notable that happened during
//! simulation. Returned from every tick for logging and replay checks.

use serde::{Serialize, Deserialize};
use crate::game::enemy::EnemyStateLabel;
use crate::game::entity::{Direction, EntityId};
use crate::game::world::{SceneTarget, TransitionReason};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Scene changes first
    SceneTransition = 0,
    /// Then player deaths
    PlayerDeath = 1,
    /// Then damage
    Damage = 2,
    /// Then captures
    Capture = 3,
    /// Then projectiles and kills
    Combat = 4,
    /// Lowest priority
    Other = 255,
}

/// Why an enemy was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Hit by a shooting star
    Projectile,
    /// Left the playfield
    OutOfBounds,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Player took a hit
    PlayerDamaged {
        /// Player entity
        player: EntityId,
        /// Enemy entity
        enemy: EntityId,
        /// Health after the hit
        health_left: u32,
    },

    /// Player health reached zero
    PlayerDied {
        /// Player entity
        player: EntityId,
    },

    /// Player swallowed an enemy
    EnemyCaptured {
        /// Player entity
        player: EntityId,
        /// Enemy entity
        enemy: EntityId,
    },

    /// Player spat a shooting star
    ProjectileFired {
        /// Player entity
        player: EntityId,
        /// Projectile entity
        projectile: EntityId,
        /// Direction of travel
        direction: Direction,
    },

    /// Shooting star hit level geometry
    ProjectileExpired {
        /// Projectile entity
        projectile: EntityId,
    },

    /// Enemy removed from the world
    EnemyDestroyed {
        /// Enemy entity
        enemy: EntityId,
        /// Why it was removed
        cause: DestroyCause,
    },

    /// Enemy entered a new behavior state
    EnemyStateChanged {
        /// Enemy entity
        enemy: EntityId,
        /// New state
        state: EnemyStateLabel,
    },

    /// Flyer spawned from a spawn point
    FlyerSpawned {
        /// Enemy entity
        enemy: EntityId,
        /// Horizontal speed (whole units per second)
        speed: i32,
    },

    /// Player dropped below the world bound
    FellOutOfWorld {
        /// Player entity
        player: EntityId,
    },

    /// A scene transition was requested
    SceneRequested {
        /// Requested scene
        target: SceneTarget,
        /// What triggered it
        reason: TransitionReason,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Entity involved (for tie-breaking)
    pub entity: Option<EntityId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let entity = match &data {
            GameEventData::PlayerDamaged { player, .. } => Some(*player),
            GameEventData::PlayerDied { player } => Some(*player),
            GameEventData::EnemyCaptured { enemy, .. } => Some(*enemy),
            GameEventData::ProjectileFired { projectile, .. } => Some(*projectile),
            GameEventData::ProjectileExpired { projectile } => Some(*projectile),
            GameEventData::EnemyDestroyed { enemy, .. } => Some(*enemy),
            GameEventData::EnemyStateChanged { enemy, .. } => Some(*enemy),
            GameEventData::FlyerSpawned { enemy, .. } => Some(*enemy),
            GameEventData::FellOutOfWorld { player } => Some(*player),
            GameEventData::SceneRequested { .. } => None,
        };

        Self {
            tick,
            priority,
            entity,
            data,
        }
    }

    /// Create player damaged event.
    pub fn player_damaged(tick: u32, player: EntityId, enemy: EntityId, health_left: u32) -> Self {
        Self::new(
            tick,
            EventPriority::Damage,
            GameEventData::PlayerDamaged { player, enemy, health_left },
        )
    }

    /// Create player died event.
    pub fn player_died(tick: u32, player: EntityId) -> Self {
        Self::new(tick, EventPriority::PlayerDeath, GameEventData::PlayerDied { player })
    }

    /// Create enemy captured event.
    pub fn enemy_captured(tick: u32, player: EntityId, enemy: EntityId) -> Self {
        Self::new(
            tick,
            EventPriority::Capture,
            GameEventData::EnemyCaptured { player, enemy },
        )
    }

    /// Create projectile fired event.
    pub fn projectile_fired(
        tick: u32,
        player: EntityId,
        projectile: EntityId,
        direction: Direction,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::Combat,
            GameEventData::ProjectileFired { player, projectile, direction },
        )
    }

    /// Create enemy destroyed event.
    pub fn enemy_destroyed(tick: u32, enemy: EntityId, cause: DestroyCause) -> Self {
        Self::new(
            tick,
            EventPriority::Combat,
            GameEventData::EnemyDestroyed { enemy, cause },
        )
    }

    /// Create scene requested event.
    pub fn scene_requested(tick: u32, target: SceneTarget, reason: TransitionReason) -> Self {
        Self::new(
            tick,
            EventPriority::SceneTransition,
            GameEventData::SceneRequested { target, reason },
        )
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.entity == other.entity
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then entity
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.entity.cmp(&other.entity))
    }
}
