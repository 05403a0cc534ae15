//! Player Abilities
//!
//! Health, facing and the inhale cycle of the player character.
//!
//! ```text
//!            action held                enemy contact (inhalable)
//!   Idle ───────────────────► Inhaling ─────────────────────────► Full
//!    ▲                           │                                  │
//!    └────── action released ────┘       action released (spit) ◄───┘
//!
//!   any ── health reaches 0 ──► Dead (terminal)
//! ```
//!
//! Damage runs a short opacity flash that never blocks controls.
//! Contact handlers here are invoked through the collision router.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::config::{ticks_for_millis, GameConfig};
use crate::core::fixed::from_int;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::commands::Command;
use crate::game::entity::{Animation, Direction, Entity, EntityId, EntityKind};
use crate::game::events::{EventPriority, GameEvent, GameEventData};
use crate::game::factory;
use crate::game::input::InputFrame;
use crate::game::scheduler::TimerAction;
use crate::game::tween::Flash;
use crate::game::world::{SceneTarget, TransitionReason, World};

/// Ability cycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AbilityState {
    /// Nothing held
    #[default]
    Idle,
    /// Drawing enemies in
    Inhaling,
    /// Holding a swallowed enemy
    Full,
    /// Health exhausted
    Dead,
}

/// Player payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Remaining health
    pub health: u32,
    /// Facing
    pub direction: Direction,
    /// Ability cycle state
    pub ability: AbilityState,
    /// Hurt flash in progress
    pub flash: Option<Flash>,
    /// Extra jumps spent since last landing
    pub air_jumps_used: u8,
    /// Action input held last tick
    pub action_held: bool,
    /// Inhale effect sprite shown
    pub effect_visible: bool,
}

impl PlayerState {
    /// Fresh player with full health, facing right.
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            direction: Direction::Right,
            ability: AbilityState::Idle,
            flash: None,
            air_jumps_used: 0,
            action_held: false,
            effect_visible: false,
        }
    }

    /// Currently inhaling.
    #[inline]
    pub fn is_inhaling(&self) -> bool {
        self.ability == AbilityState::Inhaling
    }

    /// Holding a swallowed enemy.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ability == AbilityState::Full
    }

    /// Health exhausted.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.ability == AbilityState::Dead
    }

    /// Hurt flash running.
    #[inline]
    pub fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Feed this state into a world hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.health);
        hasher.update_u8(self.direction as u8);
        hasher.update_u8(self.ability as u8);
        hasher.update_bool(self.flash.is_some());
        hasher.update_u8(self.air_jumps_used);
        hasher.update_bool(self.action_held);
        hasher.update_bool(self.effect_visible);
    }
}

/// Inhale zone position relative to the player for a facing.
pub fn inhale_zone_offset(config: &GameConfig, direction: Direction) -> FixedVec2 {
    FixedVec2::from_ints(14 * config.map_scale * direction.sign(), 8 * config.map_scale)
}

fn inhale_effect(config: &GameConfig, position: FixedVec2, direction: Direction, visible: bool) -> Command {
    let offset = from_int(config.inhale_effect_offset_x * direction.sign());
    Command::SetInhaleEffect {
        visible,
        position: FixedVec2::new(position.x + offset, position.y),
        flip_x: direction == Direction::Left,
    }
}

fn play(current: &mut Animation, id: EntityId, animation: Animation, commands: &mut Vec<Command>) {
    if *current != animation {
        *current = animation;
        commands.push(Command::SetAnimation { id, animation });
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// Apply one tick of input to the player.
pub fn apply_input(world: &mut World, input: &InputFrame) {
    let Some(id) = world.player_id else {
        return;
    };
    let speed = from_int(world.config.player_speed);
    let jump_force = from_int(world.config.jump_force);
    let extra_jumps = world.config.extra_jumps;

    let Some(Entity {
        kind: EntityKind::Player(player),
        position,
        velocity,
        grounded,
        flip_x,
        animation,
        ..
    }) = world.entities.get_mut(&id)
    else {
        return;
    };
    if player.is_dead() {
        return;
    }

    let mut commands = Vec::new();
    let mut spit = None;

    // Movement
    let heading = match (input.left_held(), input.right_held()) {
        (true, false) => Some(Direction::Left),
        (false, true) => Some(Direction::Right),
        _ => None,
    };
    match heading {
        Some(direction) => {
            player.direction = direction;
            let flip = direction == Direction::Left;
            if *flip_x != flip {
                *flip_x = flip;
                commands.push(Command::SetFlip { id, flip_x: flip });
            }
            velocity.x = speed * direction.sign();
        }
        None => velocity.x = 0,
    }

    // Jump
    if *grounded {
        player.air_jumps_used = 0;
    }
    if input.jump_pressed() {
        let allowed = if *grounded {
            true
        } else if player.air_jumps_used < extra_jumps {
            player.air_jumps_used += 1;
            true
        } else {
            false
        };
        if allowed {
            velocity.y = -jump_force;
            *grounded = false;
            commands.push(Command::ApplyImpulse {
                id,
                impulse: FixedVec2::new(0, -jump_force),
            });
        }
    }

    // Ability
    let was_held = player.action_held;
    player.action_held = input.action_held();
    let mut effect = None;

    if input.action_held() {
        if player.is_full() {
            play(animation, id, Animation::KirbFull, &mut commands);
            effect = Some(false);
        } else {
            player.ability = AbilityState::Inhaling;
            play(animation, id, Animation::KirbInhaling, &mut commands);
            effect = Some(true);
        }
    } else if was_held {
        match player.ability {
            AbilityState::Full => {
                player.ability = AbilityState::Idle;
                play(animation, id, Animation::KirbInhaling, &mut commands);
                spit = Some((*position, player.direction));
            }
            AbilityState::Inhaling => {
                player.ability = AbilityState::Idle;
                play(animation, id, Animation::KirbIdle, &mut commands);
                effect = Some(false);
            }
            AbilityState::Idle | AbilityState::Dead => {}
        }
    }

    let direction = player.direction;
    let position = *position;
    if let Some(visible) = effect {
        // Shown effects are re-sent every tick by update_attachments
        if !visible && player.effect_visible {
            commands.push(inhale_effect(&world.config, position, direction, false));
        }
        player.effect_visible = visible;
    }

    for command in commands {
        world.push_command(command);
    }

    if let Some((origin, direction)) = spit {
        spit_star(world, id, origin, direction);
    }
}

fn spit_star(world: &mut World, player: EntityId, origin: FixedVec2, direction: Direction) {
    let offset = FixedVec2::from_ints(
        world.config.star_offset_x * direction.sign(),
        world.config.star_offset_y,
    );
    let star = factory::spawn_shooting_star(world, origin + offset, direction);

    let recover = ticks_for_millis(world.config.spit_recover_ms);
    world
        .scheduler
        .schedule(Some(player), world.tick, recover, TimerAction::PlayIdleAnimation);

    debug!("Player {:?} spat star {:?} facing {:?}", player, star, direction);
    world.push_event(GameEvent::projectile_fired(world.tick, player, star, direction));
}

/// Force the idle animation once the spit has played out, whatever
/// the player or the star has done since.
pub fn play_idle(world: &mut World, id: EntityId) {
    let Some(entity) = world.get_mut(id) else {
        return;
    };
    if entity.as_player().map_or(true, PlayerState::is_dead) {
        return;
    }
    entity.animation = Animation::KirbIdle;
    world.push_command(Command::SetAnimation { id, animation: Animation::KirbIdle });
}

// =============================================================================
// CONTACT HANDLERS
// =============================================================================

/// Player touched an enemy: swallow it if it is being inhaled,
/// otherwise take one point of damage.
pub fn on_enemy_contact(world: &mut World, player_id: EntityId, enemy_id: EntityId) {
    let tick = world.tick;
    let half_ticks = world.config.flash_half_ticks();
    let inhalable = world
        .get(enemy_id)
        .and_then(Entity::as_enemy)
        .is_some_and(|enemy| enemy.inhalable);

    let Some(player) = world.get_mut(player_id).and_then(Entity::as_player_mut) else {
        return;
    };
    if player.is_dead() {
        return;
    }

    if player.is_inhaling() && inhalable {
        player.ability = AbilityState::Full;
        let direction = player.direction;
        let was_visible = std::mem::take(&mut player.effect_visible);

        if was_visible {
            if let Some(position) = world.get(player_id).map(|e| e.position) {
                world.push_command(inhale_effect(&world.config, position, direction, false));
            }
        }
        world.destroy(enemy_id);
        debug!("Player {:?} swallowed enemy {:?}", player_id, enemy_id);
        world.push_event(GameEvent::enemy_captured(tick, player_id, enemy_id));
        return;
    }

    player.health = player.health.saturating_sub(1);
    let health = player.health;
    if health == 0 {
        player.ability = AbilityState::Dead;
        player.flash = None;
    } else {
        player.flash = Some(Flash::new(half_ticks));
    }
    world.push_event(GameEvent::player_damaged(tick, player_id, enemy_id, health));

    if health == 0 {
        info!("Player {:?} died at tick {}", player_id, tick);
        world.push_event(GameEvent::player_died(tick, player_id));
        world.destroy(player_id);
        world.request_scene(SceneTarget::Current, TransitionReason::PlayerDied);
    } else {
        debug!("Player {:?} hit by {:?}, {} health left", player_id, enemy_id, health);
    }
}

/// Player touched the exit.
pub fn on_exit_contact(world: &mut World, player_id: EntityId) {
    debug!("Player {:?} reached the exit", player_id);
    world.request_scene(SceneTarget::Next, TransitionReason::ReachedExit);
}

/// A shooting star hit level geometry.
pub fn on_star_hit_platform(world: &mut World, star: EntityId) {
    if world.destroy(star) {
        world.push_event(GameEvent::new(
            world.tick,
            EventPriority::Combat,
            GameEventData::ProjectileExpired { projectile: star },
        ));
    }
}

// =============================================================================
// PER-TICK UPDATES
// =============================================================================

/// Move the inhale zone with the player and re-send the effect sprite.
pub fn update_attachments(world: &mut World) {
    let Some(entity) = world.player() else {
        return;
    };
    let Some(player) = entity.as_player() else {
        return;
    };
    let (position, direction, visible) = (entity.position, player.direction, player.effect_visible);

    let offset = inhale_zone_offset(&world.config, direction);
    if let Some(zone) = world.inhale_zone_id.and_then(|z| world.entities.get_mut(&z)) {
        zone.position = position + offset;
    }

    if visible {
        let command = inhale_effect(&world.config, position, direction, true);
        world.push_command(command);
    }
}

/// Advance the hurt flash.
pub fn update_feedback(world: &mut World) {
    let Some(id) = world.player_id else {
        return;
    };
    let Some(Entity {
        kind: EntityKind::Player(player),
        opacity,
        ..
    }) = world.entities.get_mut(&id)
    else {
        return;
    };
    let Some(flash) = player.flash.as_mut() else {
        return;
    };

    *opacity = flash.advance();
    if flash.is_finished() {
        player.flash = None;
    }
    let opacity = *opacity;
    world.push_command(Command::SetOpacity { id, opacity });
}

/// Restart the level once the player drops past the world bound.
pub fn check_fall(world: &mut World) {
    let threshold = from_int(world.config.fall_threshold);
    let Some(player) = world.player() else {
        return;
    };
    if player.position.y <= threshold {
        return;
    }

    let id = player.id;
    if world.request_scene(SceneTarget::Current, TransitionReason::FellOutOfWorld) {
        world.push_event(GameEvent::new(
            world.tick,
            EventPriority::PlayerDeath,
            GameEventData::FellOutOfWorld { player: id },
        ));
    }
}

/// Point the camera ahead of the player until the level's camera limit.
pub fn update_camera(world: &mut World) {
    let Some(player) = world.player() else {
        return;
    };
    let x = player.position.x;
    if world.camera_limit.is_some_and(|limit| x >= limit) {
        return;
    }

    let position = FixedVec2::new(
        x + from_int(world.config.camera_offset_x),
        from_int(world.config.camera_y),
    );
    world.push_command(Command::SetCameraTarget { position });
}
