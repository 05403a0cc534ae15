//! Enemy Behavior
//!
//! Each enemy variant runs a small state chart declared as static data:
//! every state names an entry action, a per-tick motion and one
//! transition, either timed or triggered by landing.
//!
//! ## Charts
//!
//! ```text
//! flame:   idle ──1s──► jump ──grounded──► idle ...
//! patrol:  idle ──1s──► left ──2s──► right ──2s──► left ...
//! flyer:   cruise (no transitions; culled off the playfield)
//! ```
//!
//! Timed transitions go through the world scheduler, so destroying an
//! enemy cancels them.
//!
//! The inhale pull overrides chart motion for any enemy that is inside
//! the inhale zone while the player is inhaling.

use serde::{Serialize, Deserialize};
use tracing::{debug, trace};

use crate::config::ticks_for_millis;
use crate::core::fixed::from_int;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::commands::Command;
use crate::game::entity::{Direction, Entity, EntityId, EntityKind};
use crate::game::events::{DestroyCause, EventPriority, GameEvent, GameEventData};
use crate::game::scheduler::TimerAction;
use crate::game::world::World;

// =============================================================================
// VARIANTS AND STATE
// =============================================================================

/// Enemy type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyVariant {
    /// Hops in place
    Flame,
    /// Walks back and forth
    Patrol,
    /// Crosses the level at a constant speed
    Flyer {
        /// Horizontal speed, whole units per second
        speed: i32,
    },
}

impl EnemyVariant {
    /// Stable numeric code for hashing.
    pub fn code(self) -> u8 {
        match self {
            EnemyVariant::Flame => 0,
            EnemyVariant::Patrol => 1,
            EnemyVariant::Flyer { .. } => 2,
        }
    }

    /// Spawn group name in level documents.
    pub fn name(self) -> &'static str {
        match self {
            EnemyVariant::Flame => "flame",
            EnemyVariant::Patrol => "guy",
            EnemyVariant::Flyer { .. } => "bird",
        }
    }
}

/// Behavior state label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnemyStateLabel {
    /// Waiting
    Idle,
    /// Airborne after a hop
    Jump,
    /// Walking left
    Left,
    /// Walking right
    Right,
    /// Constant flight
    Cruise,
}

/// Per-enemy payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyState {
    /// Enemy type
    pub variant: EnemyVariant,
    /// Current chart state
    pub state: EnemyStateLabel,
    /// Inside the inhale zone
    pub inhalable: bool,
}

impl EnemyState {
    /// Fresh state for `variant`, in the chart's initial state.
    pub fn new(variant: EnemyVariant) -> Self {
        Self {
            variant,
            state: initial_state(variant),
            inhalable: false,
        }
    }

    /// Feed this state into a world hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.variant.code());
        if let EnemyVariant::Flyer { speed } = self.variant {
            hasher.update_u32(speed as u32);
        }
        hasher.update_u8(self.state as u8);
        hasher.update_bool(self.inhalable);
    }
}

// =============================================================================
// CHARTS
// =============================================================================

/// Action run once when a state is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnterAction {
    /// Nothing
    Nothing,
    /// Upward impulse
    Jump,
    /// Turn the sprite to face a direction
    Face(Direction),
}

/// Horizontal motion applied every tick while in a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// Stand still
    Hold,
    /// Walk at patrol speed
    Walk(Direction),
}

/// How a state is left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// After a fixed delay
    After {
        /// Delay in milliseconds
        millis: u32,
        /// Next state
        to: EnemyStateLabel,
    },
    /// On the first tick the enemy is standing on ground
    WhenGrounded(EnemyStateLabel),
}

/// One state of a chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateSpec {
    /// State label
    pub label: EnemyStateLabel,
    /// Entry action
    pub on_enter: EnterAction,
    /// Per-tick motion
    pub on_update: UpdateAction,
    /// Exit condition
    pub transition: Transition,
}

const FLAME_CHART: &[StateSpec] = &[
    StateSpec {
        label: EnemyStateLabel::Idle,
        on_enter: EnterAction::Nothing,
        on_update: UpdateAction::Hold,
        transition: Transition::After { millis: 1000, to: EnemyStateLabel::Jump },
    },
    StateSpec {
        label: EnemyStateLabel::Jump,
        on_enter: EnterAction::Jump,
        on_update: UpdateAction::Hold,
        transition: Transition::WhenGrounded(EnemyStateLabel::Idle),
    },
];

const PATROL_CHART: &[StateSpec] = &[
    StateSpec {
        label: EnemyStateLabel::Idle,
        on_enter: EnterAction::Nothing,
        on_update: UpdateAction::Hold,
        transition: Transition::After { millis: 1000, to: EnemyStateLabel::Left },
    },
    StateSpec {
        label: EnemyStateLabel::Left,
        on_enter: EnterAction::Face(Direction::Left),
        on_update: UpdateAction::Walk(Direction::Left),
        transition: Transition::After { millis: 2000, to: EnemyStateLabel::Right },
    },
    StateSpec {
        label: EnemyStateLabel::Right,
        on_enter: EnterAction::Face(Direction::Right),
        on_update: UpdateAction::Walk(Direction::Right),
        transition: Transition::After { millis: 2000, to: EnemyStateLabel::Left },
    },
];

/// The state chart of a variant. Flyers have none.
pub fn chart(variant: EnemyVariant) -> &'static [StateSpec] {
    match variant {
        EnemyVariant::Flame => FLAME_CHART,
        EnemyVariant::Patrol => PATROL_CHART,
        EnemyVariant::Flyer { .. } => &[],
    }
}

/// Look up one state of a variant's chart.
pub fn state_spec(variant: EnemyVariant, label: EnemyStateLabel) -> Option<&'static StateSpec> {
    chart(variant).iter().find(|spec| spec.label == label)
}

/// State a freshly spawned enemy starts in.
pub fn initial_state(variant: EnemyVariant) -> EnemyStateLabel {
    match variant {
        EnemyVariant::Flyer { .. } => EnemyStateLabel::Cruise,
        _ => EnemyStateLabel::Idle,
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Switch an enemy into `label`, run its entry action and schedule its
/// timed transition.
pub fn enter_state(world: &mut World, id: EntityId, label: EnemyStateLabel) {
    let tick = world.tick;
    let jump_force = from_int(world.config.flame_jump_force);

    let Some(entity) = world.get_mut(id) else {
        trace!("Enemy {:?} gone before entering {:?}", id, label);
        return;
    };
    let Some(enemy) = entity.as_enemy_mut() else {
        return;
    };
    enemy.state = label;
    let Some(spec) = state_spec(enemy.variant, label) else {
        return;
    };

    let command = match spec.on_enter {
        EnterAction::Nothing => None,
        EnterAction::Jump => {
            entity.velocity.y = -jump_force;
            entity.grounded = false;
            Some(Command::ApplyImpulse {
                id,
                impulse: FixedVec2::new(0, -jump_force),
            })
        }
        EnterAction::Face(direction) => {
            // Enemy sprites face left unflipped
            entity.flip_x = direction == Direction::Right;
            Some(Command::SetFlip { id, flip_x: entity.flip_x })
        }
    };

    if let Some(command) = command {
        world.push_command(command);
    }
    if let Transition::After { millis, to } = spec.transition {
        world
            .scheduler
            .schedule(Some(id), tick, ticks_for_millis(millis), TimerAction::EnterEnemyState(to));
    }

    debug!("Enemy {:?} entered {:?} at tick {}", id, label, tick);
    world.push_event(GameEvent::new(
        tick,
        EventPriority::Other,
        GameEventData::EnemyStateChanged { enemy: id, state: label },
    ));
}

/// Per-tick enemy motion and landing transitions.
pub fn update_enemies(world: &mut World) {
    let pull = world
        .player_state()
        .filter(|player| player.is_inhaling())
        .map(|player| player.direction);
    let pull_speed = from_int(world.config.inhale_pull_speed);
    let patrol_speed = from_int(world.config.patrol_speed);

    let mut landed = Vec::new();

    for entity in world.entities.values_mut() {
        let grounded = entity.grounded;
        let Some(enemy) = entity.as_enemy() else {
            continue;
        };

        let mut vx = match enemy.variant {
            EnemyVariant::Flyer { speed } => -from_int(speed),
            variant => match state_spec(variant, enemy.state) {
                Some(spec) => {
                    if let Transition::WhenGrounded(to) = spec.transition {
                        if grounded {
                            landed.push((entity.id, to));
                        }
                    }
                    match spec.on_update {
                        UpdateAction::Hold => 0,
                        UpdateAction::Walk(direction) => patrol_speed * direction.sign(),
                    }
                }
                None => 0,
            },
        };

        if enemy.inhalable {
            if let Some(facing) = pull {
                vx = -pull_speed * facing.sign();
            }
        }
        entity.velocity.x = vx;
    }

    for (id, to) in landed {
        enter_state(world, id, to);
    }
}

// =============================================================================
// CONTACT HANDLERS
// =============================================================================

/// Mark an enemy as inside or outside the inhale zone.
pub fn set_inhalable(world: &mut World, id: EntityId, inhalable: bool) {
    if let Some(enemy) = world.get_mut(id).and_then(Entity::as_enemy_mut) {
        enemy.inhalable = inhalable;
        trace!("Enemy {:?} inhalable = {}", id, inhalable);
    }
}

/// A shooting star hit an enemy: both are destroyed.
pub fn on_star_contact(world: &mut World, enemy: EntityId, star: EntityId) {
    world.destroy(enemy);
    world.destroy(star);
    debug!("Enemy {:?} destroyed by shooting star {:?}", enemy, star);
    world.push_event(GameEvent::enemy_destroyed(world.tick, enemy, DestroyCause::Projectile));
}

/// Destroy enemies and shooting stars that left the playfield.
///
/// Returns how many entities were removed.
pub fn cull_offscreen(world: &mut World) -> usize {
    let Some(playfield) = world.playfield else {
        return 0;
    };

    let gone: Vec<(EntityId, bool)> = world
        .entities
        .values()
        .filter_map(|entity| {
            let enemy = entity.as_enemy().is_some();
            let star = matches!(entity.kind, EntityKind::ShootingStar { .. });
            ((enemy || star) && !entity.bounds().overlaps(&playfield)).then_some((entity.id, enemy))
        })
        .collect();

    for &(id, is_enemy) in &gone {
        world.destroy(id);
        if is_enemy {
            debug!("Enemy {:?} left the playfield", id);
            world.push_event(GameEvent::enemy_destroyed(world.tick, id, DestroyCause::OutOfBounds));
        }
    }

    gone.len()
}
