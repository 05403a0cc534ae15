//! Entity Factory
//!
//! Builds every entity kind with its collider, body, animation and
//! contact handlers, and instantiates a whole level from a [`TileMap`].
//! Spawn points and level geometry are in level space and are scaled
//! by the map scale here; shots are placed in world space.

use tracing::{debug, info, warn};

use crate::config::ticks_for_millis;
use crate::core::fixed::{fixed_mul, from_int, to_fixed, Fixed};
use crate::core::vec2::FixedVec2;
use crate::game::commands::Command;
use crate::game::enemy::{self, EnemyState, EnemyStateLabel, EnemyVariant};
use crate::game::entity::{Aabb, Animation, BodyKind, Direction, EntityId, EntityKind, Rect, Tag};
use crate::game::events::{EventPriority, GameEvent, GameEventData};
use crate::game::map::{ColliderKind, ColliderSpec, SpawnPoint, TileMap};
use crate::game::player::{inhale_zone_offset, PlayerState};
use crate::game::router::{ContactPhase, Reaction};
use crate::game::scene::SceneError;
use crate::game::scheduler::TimerAction;
use crate::game::world::World;

/// Spawn group of the player start.
pub const SPAWN_PLAYER: &str = "player";
/// Spawn group of flame enemies.
pub const SPAWN_FLAME: &str = "flame";
/// Spawn group of patrol enemies.
pub const SPAWN_PATROL: &str = "guy";
/// Spawn group of flyer emitters.
pub const SPAWN_FLYER: &str = "bird";

const KNOWN_GROUPS: [&str; 4] = [SPAWN_PLAYER, SPAWN_FLAME, SPAWN_PATROL, SPAWN_FLYER];

/// Collider rectangle in sprite space, before the map scale.
#[derive(Clone, Copy, Debug)]
struct SpriteShape {
    x: Fixed,
    y: Fixed,
    width: Fixed,
    height: Fixed,
}

impl SpriteShape {
    const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: to_fixed(x),
            y: to_fixed(y),
            width: to_fixed(width),
            height: to_fixed(height),
        }
    }

    fn collider(self, scale: Fixed) -> Aabb {
        Aabb::new(
            FixedVec2::new(fixed_mul(self.x, scale), fixed_mul(self.y, scale)),
            FixedVec2::new(fixed_mul(self.width, scale), fixed_mul(self.height, scale)),
        )
    }
}

const PLAYER_SHAPE: SpriteShape = SpriteShape::new(4.0, 5.9, 8.0, 10.0);
const INHALE_ZONE_SHAPE: SpriteShape = SpriteShape::new(0.0, 0.0, 20.0, 4.0);
const FLAME_SHAPE: SpriteShape = SpriteShape::new(4.0, 6.0, 8.0, 10.0);
const PATROL_SHAPE: SpriteShape = SpriteShape::new(2.0, 3.9, 12.0, 12.0);
const FLYER_SHAPE: SpriteShape = SpriteShape::new(4.0, 6.0, 8.0, 10.0);
const STAR_SHAPE: SpriteShape = SpriteShape::new(5.0, 4.0, 6.0, 6.0);

#[inline]
fn scaled(v: FixedVec2, scale: Fixed) -> FixedVec2 {
    FixedVec2::new(fixed_mul(v.x, scale), fixed_mul(v.y, scale))
}

// =============================================================================
// PLAYER
// =============================================================================

/// Spawn the player and its inhale zone at a level-space point.
pub fn spawn_player(world: &mut World, point: SpawnPoint) -> EntityId {
    let scale = world.config.scale();
    let position = scaled(point.position(), scale);
    let state = PlayerState::new(world.config.max_health);

    let player = world.spawn(
        EntityKind::Player(state),
        position,
        PLAYER_SHAPE.collider(scale),
        BodyKind::Dynamic,
        Animation::KirbIdle,
    );
    world.player_id = Some(player);

    let zone_position = position + inhale_zone_offset(&world.config, Direction::Right);
    let zone = world.spawn(
        EntityKind::InhaleZone { owner: player },
        zone_position,
        INHALE_ZONE_SHAPE.collider(scale),
        BodyKind::Trigger,
        Animation::None,
    );
    world.inhale_zone_id = Some(zone);

    world
        .router
        .register(player, Tag::Enemy, ContactPhase::Begin, Reaction::PlayerHitByEnemy);
    world
        .router
        .register(player, Tag::Exit, ContactPhase::Begin, Reaction::PlayerReachedExit);

    debug!("Spawned player {:?} at {} (inhale zone {:?})", player, position, zone);
    player
}

/// Spawn a shooting star at a world-space position.
pub fn spawn_shooting_star(world: &mut World, position: FixedVec2, direction: Direction) -> EntityId {
    let scale = world.config.scale();
    let speed = from_int(world.config.star_speed * direction.sign());

    let star = world.spawn(
        EntityKind::ShootingStar { direction },
        position,
        STAR_SHAPE.collider(scale),
        BodyKind::Kinematic,
        Animation::ShootingStar,
    );

    // The star sprite points left unflipped
    let flip_x = direction == Direction::Right;
    if let Some(entity) = world.get_mut(star) {
        entity.velocity = FixedVec2::new(speed, 0);
        entity.flip_x = flip_x;
    }
    if flip_x {
        world.push_command(Command::SetFlip { id: star, flip_x });
    }

    world
        .router
        .register(star, Tag::Platform, ContactPhase::Begin, Reaction::StarHitPlatform);
    star
}

// =============================================================================
// ENEMIES
// =============================================================================

fn spawn_enemy(
    world: &mut World,
    variant: EnemyVariant,
    point: SpawnPoint,
    shape: SpriteShape,
    body: BodyKind,
    animation: Animation,
) -> EntityId {
    let scale = world.config.scale();
    let id = world.spawn(
        EntityKind::Enemy(EnemyState::new(variant)),
        scaled(point.position(), scale),
        shape.collider(scale),
        body,
        animation,
    );
    make_inhalable(world, id);
    debug!("Spawned {} {:?}", variant.name(), id);
    id
}

/// Register the contact handlers every enemy shares.
pub fn make_inhalable(world: &mut World, enemy: EntityId) {
    let router = &mut world.router;
    router.register(enemy, Tag::InhaleZone, ContactPhase::Begin, Reaction::EnemyEnteredInhaleZone);
    router.register(enemy, Tag::InhaleZone, ContactPhase::End, Reaction::EnemyLeftInhaleZone);
    router.register(enemy, Tag::ShootingStar, ContactPhase::Begin, Reaction::EnemyHitByStar);
}

/// Spawn a flame at a level-space point.
pub fn spawn_flame(world: &mut World, point: SpawnPoint) -> EntityId {
    let id = spawn_enemy(world, EnemyVariant::Flame, point, FLAME_SHAPE, BodyKind::Dynamic, Animation::Flame);
    enemy::enter_state(world, id, EnemyStateLabel::Idle);
    id
}

/// Spawn a patrol at a level-space point.
pub fn spawn_patrol(world: &mut World, point: SpawnPoint) -> EntityId {
    let id = spawn_enemy(world, EnemyVariant::Patrol, point, PATROL_SHAPE, BodyKind::Dynamic, Animation::GuyWalk);
    enemy::enter_state(world, id, EnemyStateLabel::Idle);
    id
}

/// Spawn a flyer at a level-space point, heading left at `speed`.
pub fn spawn_flyer(world: &mut World, point: SpawnPoint, speed: i32) -> EntityId {
    let variant = EnemyVariant::Flyer { speed };
    let id = spawn_enemy(world, variant, point, FLYER_SHAPE, BodyKind::Kinematic, Animation::Bird);
    if let Some(entity) = world.get_mut(id) {
        entity.velocity = FixedVec2::new(-from_int(speed), 0);
    }

    world.push_event(GameEvent::new(
        world.tick,
        EventPriority::Other,
        GameEventData::FlyerSpawned { enemy: id, speed },
    ));
    id
}

/// Spawn a flyer with a speed drawn from the configured set.
pub fn spawn_scheduled_flyer(world: &mut World, origin: SpawnPoint) -> Option<EntityId> {
    let Some(&speed) = world.rng.choose(&world.config.flyer_speeds) else {
        warn!("No flyer speeds configured; skipping spawn");
        return None;
    };
    Some(spawn_flyer(world, origin, speed))
}

// =============================================================================
// LEVEL
// =============================================================================

/// Spawn one level collider.
pub fn spawn_collider(world: &mut World, spec: &ColliderSpec) -> EntityId {
    let scale = world.config.scale();
    let position = scaled(FixedVec2::new(spec.x, spec.y), scale);
    let size = scaled(FixedVec2::new(spec.width, spec.height), scale);

    let (kind, body) = match spec.kind {
        ColliderKind::Platform => (EntityKind::Platform, BodyKind::Static),
        ColliderKind::Exit => (EntityKind::Exit, BodyKind::Trigger),
    };
    world.spawn(kind, position, Aabb::new(FixedVec2::ZERO, size), body, Animation::None)
}

/// Instantiate a level: colliders, the player, charted enemies and the
/// flyer emitters. Returns the player id.
///
/// Nothing is spawned if the level has no player start.
pub fn populate_level(world: &mut World, map: &TileMap) -> Result<EntityId, SceneError> {
    let Some(start) = map.spawns.first(SPAWN_PLAYER) else {
        return Err(SceneError::MissingPlayerSpawn {
            level: map.level.clone(),
        });
    };

    for spec in &map.colliders {
        spawn_collider(world, spec);
    }

    let player = spawn_player(world, start);

    for &point in map.spawns.get(SPAWN_FLAME) {
        spawn_flame(world, point);
    }
    for &point in map.spawns.get(SPAWN_PATROL) {
        spawn_patrol(world, point);
    }

    let interval = ticks_for_millis(world.config.flyer_interval_ms);
    for &origin in map.spawns.get(SPAWN_FLYER) {
        world
            .scheduler
            .schedule_repeating(None, world.tick, interval, TimerAction::SpawnFlyer { origin });
    }

    for name in map.spawns.names() {
        if !KNOWN_GROUPS.contains(&name) {
            warn!("Level {}: ignoring unknown spawn group '{}'", map.level, name);
        }
    }

    if let Some((min, max)) = map.bounds() {
        let scale = world.config.scale();
        let margin = from_int(world.config.offscreen_margin);
        world.playfield = Some(
            Rect {
                min: scaled(min, scale),
                max: scaled(max, scale),
            }
            .expand(margin),
        );
    }

    info!(
        "Populated {}: {} entities, {} enemies, {} flyer emitters",
        map.level,
        world.entities.len(),
        world.enemy_count(),
        map.spawns.get(SPAWN_FLYER).len()
    );
    Ok(player)
}
