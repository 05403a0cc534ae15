//! Reference Physics
//!
//! Minimal fixed-timestep integration for headless runs:
//!
//! - Dynamic bodies fall under gravity (capped at terminal speed) and
//!   are pushed out of static bodies one axis at a time. Landing on top
//!   of a static body sets `grounded`.
//! - Kinematic bodies move by their velocity and pass through
//!   everything.
//! - Static bodies and triggers never move.
//!
//! Hosts running their own physics skip this step entirely.

use crate::core::fixed::{fixed_mul, from_int, Fixed, TICK_DURATION};
use crate::game::entity::{BodyKind, Entity, Rect};
use crate::game::world::World;

/// Advance every body by one tick.
pub fn step(world: &mut World) {
    let gravity = fixed_mul(from_int(world.config.gravity), TICK_DURATION);
    let max_fall = from_int(world.config.max_fall_speed);

    let solids: Vec<Rect> = world
        .entities
        .values()
        .filter(|e| e.body == BodyKind::Static)
        .map(Entity::bounds)
        .collect();

    for entity in world.entities.values_mut() {
        match entity.body {
            BodyKind::Dynamic => integrate_dynamic(entity, &solids, gravity, max_fall),
            BodyKind::Kinematic => {
                entity.position = entity.position + entity.velocity.scale(TICK_DURATION);
            }
            BodyKind::Static | BodyKind::Trigger => {}
        }
    }
}

fn integrate_dynamic(entity: &mut Entity, solids: &[Rect], gravity: Fixed, max_fall: Fixed) {
    entity.velocity.y = entity.velocity.y.saturating_add(gravity).min(max_fall);
    let delta = entity.velocity.scale(TICK_DURATION);

    entity.position.x = entity.position.x.saturating_add(delta.x);
    if delta.x != 0 {
        for solid in solids {
            let bounds = entity.bounds();
            if !bounds.overlaps(solid) {
                continue;
            }
            if delta.x > 0 {
                entity.position.x -= bounds.max.x - solid.min.x;
            } else {
                entity.position.x += solid.max.x - bounds.min.x;
            }
        }
    }

    entity.grounded = false;
    entity.position.y = entity.position.y.saturating_add(delta.y);
    if delta.y != 0 {
        for solid in solids {
            let bounds = entity.bounds();
            if !bounds.overlaps(solid) {
                continue;
            }
            if delta.y > 0 {
                entity.position.y -= bounds.max.y - solid.min.y;
                entity.grounded = true;
            } else {
                entity.position.y += solid.max.y - bounds.min.y;
            }
            entity.velocity.y = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::vec2::FixedVec2;
    use crate::game::entity::{Aabb, Animation, EntityId, EntityKind};

    fn world() -> World {
        World::new("test", GameConfig::default())
    }

    fn block(world: &mut World, x: i32, y: i32, w: i32, h: i32) -> EntityId {
        world.spawn(
            EntityKind::Platform,
            FixedVec2::from_ints(x, y),
            Aabb::new(FixedVec2::ZERO, FixedVec2::from_ints(w, h)),
            BodyKind::Static,
            Animation::None,
        )
    }

    fn body(world: &mut World, x: i32, y: i32, kind: BodyKind) -> EntityId {
        world.spawn(
            EntityKind::Platform,
            FixedVec2::from_ints(x, y),
            Aabb::new(FixedVec2::ZERO, FixedVec2::from_ints(10, 10)),
            kind,
            Animation::None,
        )
    }

    #[test]
    fn test_falls_and_lands() {
        let mut world = world();
        block(&mut world, -100, 100, 300, 20);
        let id = body(&mut world, 0, 50, BodyKind::Dynamic);

        for _ in 0..120 {
            step(&mut world);
        }

        let entity = world.get(id).unwrap();
        assert!(entity.grounded);
        assert_eq!(entity.position.y, from_int(90));
        assert_eq!(entity.velocity.y, 0);
    }

    #[test]
    fn test_wall_blocks_horizontal_motion() {
        let mut world = world();
        block(&mut world, -100, 100, 300, 20);
        block(&mut world, 40, 0, 20, 100);
        let id = body(&mut world, 0, 90, BodyKind::Dynamic);

        for _ in 0..120 {
            world.get_mut(id).unwrap().velocity.x = from_int(300);
            step(&mut world);
        }

        let entity = world.get(id).unwrap();
        assert_eq!(entity.position.x, from_int(30));
        assert!(entity.grounded);
    }

    #[test]
    fn test_ceiling_stops_rise() {
        let mut world = world();
        block(&mut world, -100, 0, 300, 20);
        let id = body(&mut world, 0, 30, BodyKind::Dynamic);
        world.get_mut(id).unwrap().velocity.y = -from_int(900);

        step(&mut world);
        let entity = world.get(id).unwrap();
        assert_eq!(entity.position.y, from_int(20));
        assert_eq!(entity.velocity.y, 0);
        assert!(!entity.grounded);
    }

    #[test]
    fn test_fall_speed_is_capped() {
        let mut world = world();
        let id = body(&mut world, 0, 0, BodyKind::Dynamic);
        for _ in 0..600 {
            step(&mut world);
        }
        assert_eq!(world.get(id).unwrap().velocity.y, from_int(1600));
    }

    #[test]
    fn test_endless_fall_saturates() {
        let mut world = world();
        let id = body(&mut world, 0, 32000, BodyKind::Dynamic);
        world.get_mut(id).unwrap().velocity.y = from_int(1600);

        for _ in 0..600 {
            step(&mut world);
        }
        let entity = world.get(id).unwrap();
        assert_eq!(entity.position.y, Fixed::MAX);
        assert!(!entity.grounded);
    }

    #[test]
    fn test_kinematic_ignores_gravity_and_walls() {
        let mut world = world();
        block(&mut world, 20, -50, 20, 100);
        let id = body(&mut world, 0, 0, BodyKind::Kinematic);
        world.get_mut(id).unwrap().velocity = FixedVec2::from_ints(600, 0);

        for _ in 0..10 {
            step(&mut world);
        }
        let entity = world.get(id).unwrap();
        assert!(entity.position.x > from_int(90));
        assert_eq!(entity.position.y, 0);
    }

    #[test]
    fn test_triggers_never_move() {
        let mut world = world();
        let id = body(&mut world, 5, 5, BodyKind::Trigger);
        step(&mut world);
        assert_eq!(world.get(id).unwrap().position, FixedVec2::from_ints(5, 5));
    }
}
