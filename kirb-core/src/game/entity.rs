//! Entity Model
//!
//! Tagged-variant entities: a shared base record (position, velocity,
//! collider, body kind, visuals) plus a variant payload selected by
//! [`EntityKind`]. Entities refer to one another only by [`EntityId`].

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;
use crate::game::enemy::EnemyState;
use crate::game::player::PlayerState;

// =============================================================================
// IDS AND TAGS
// =============================================================================

/// Unique entity identifier within one world.
///
/// Monotonic; never reused for the lifetime of a world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Collision routing tag.
///
/// Handlers are keyed by the tag of the *other* participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// The controllable character
    Player,
    /// Any enemy variant
    Enemy,
    /// Solid level geometry
    Platform,
    /// Level exit trigger
    Exit,
    /// Trigger in front of the player marking capturable enemies
    InhaleZone,
    /// Projectile spat out by a full player
    ShootingStar,
}

impl Tag {
    /// Name used by level documents and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Player => "player",
            Tag::Enemy => "enemy",
            Tag::Platform => "platform",
            Tag::Exit => "exit",
            Tag::InhaleZone => "inhaleZone",
            Tag::ShootingStar => "shootingStar",
        }
    }
}

/// Horizontal facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Facing -X
    Left,
    /// Facing +X
    #[default]
    Right,
}

impl Direction {
    /// -1 for left, +1 for right.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// How the physics stepper treats an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    /// Solid, never moves (platforms)
    Static,
    /// Gravity plus resolution against static bodies
    Dynamic,
    /// Moves by velocity only, passes through geometry
    Kinematic,
    /// Overlap detection only, positioned by its owner
    Trigger,
}

/// Named animation from the sprite sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Animation {
    /// Player standing
    KirbIdle,
    /// Player mouth open
    KirbInhaling,
    /// Player holding a captured enemy
    KirbFull,
    /// Spat projectile
    ShootingStar,
    /// Flame enemy loop
    Flame,
    /// Patrol enemy walk loop
    GuyWalk,
    /// Flyer wing loop
    Bird,
    /// No sprite (geometry, triggers)
    None,
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Axis-aligned rectangle in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: FixedVec2,
    /// Bottom-right corner
    pub max: FixedVec2,
}

impl Rect {
    /// Create from corner and size.
    pub fn from_origin_size(origin: FixedVec2, size: FixedVec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    /// Strict overlap test; touching edges do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: Fixed) -> Self {
        Self {
            min: FixedVec2::new(self.min.x - margin, self.min.y - margin),
            max: FixedVec2::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

/// Collider shape relative to the entity position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    /// Offset of the top-left corner from the entity position
    pub offset: FixedVec2,
    /// Width and height
    pub size: FixedVec2,
}

impl Aabb {
    /// Create a collider shape.
    pub const fn new(offset: FixedVec2, size: FixedVec2) -> Self {
        Self { offset, size }
    }

    /// World-space rectangle for an entity at `position`.
    #[inline]
    pub fn at(&self, position: FixedVec2) -> Rect {
        Rect::from_origin_size(position + self.offset, self.size)
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Variant payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EntityKind {
    /// The player and its ability state
    Player(PlayerState),
    /// An enemy and its behavior state
    Enemy(EnemyState),
    /// Trigger attached to the player
    InhaleZone {
        /// Player this zone belongs to
        owner: EntityId,
    },
    /// Projectile travelling in a fixed direction
    ShootingStar {
        /// Direction of travel
        direction: Direction,
    },
    /// Solid level geometry
    Platform,
    /// Level exit trigger
    Exit,
}

/// A live entity in the world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    /// Identity
    pub id: EntityId,
    /// Variant payload
    pub kind: EntityKind,
    /// World position (collider offsets are relative to this)
    pub position: FixedVec2,
    /// Velocity in units per second
    pub velocity: FixedVec2,
    /// Collider shape
    pub collider: Aabb,
    /// Physics treatment
    pub body: BodyKind,
    /// Resting on a static body after the last physics step
    pub grounded: bool,
    /// Sprite mirrored horizontally
    pub flip_x: bool,
    /// Current animation
    pub animation: Animation,
    /// Opacity (0 = invisible, FIXED_ONE = opaque)
    pub opacity: Fixed,
}

impl Entity {
    /// Create an entity with default visuals.
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        position: FixedVec2,
        collider: Aabb,
        body: BodyKind,
        animation: Animation,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: FixedVec2::ZERO,
            collider,
            body,
            grounded: false,
            flip_x: false,
            animation,
            opacity: FIXED_ONE,
        }
    }

    /// Routing tag derived from the variant.
    pub fn tag(&self) -> Tag {
        match &self.kind {
            EntityKind::Player(_) => Tag::Player,
            EntityKind::Enemy(_) => Tag::Enemy,
            EntityKind::InhaleZone { .. } => Tag::InhaleZone,
            EntityKind::ShootingStar { .. } => Tag::ShootingStar,
            EntityKind::Platform => Tag::Platform,
            EntityKind::Exit => Tag::Exit,
        }
    }

    /// Collider rectangle in world space.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.collider.at(self.position)
    }

    /// Player payload, if this is the player.
    pub fn as_player(&self) -> Option<&PlayerState> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable player payload.
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Enemy payload, if this is an enemy.
    pub fn as_enemy(&self) -> Option<&EnemyState> {
        match &self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable enemy payload.
    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyState> {
        match &mut self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = Rect::from_origin_size(FixedVec2::from_ints(0, 0), FixedVec2::from_ints(10, 10));
        let touching = Rect::from_origin_size(FixedVec2::from_ints(10, 0), FixedVec2::from_ints(10, 10));
        let inside = Rect::from_origin_size(FixedVec2::from_ints(5, 5), FixedVec2::from_ints(10, 10));

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_aabb_offset() {
        let shape = Aabb::new(FixedVec2::from_ints(16, 24), FixedVec2::from_ints(32, 40));
        let rect = shape.at(FixedVec2::from_ints(100, 200));
        assert_eq!(rect.min, FixedVec2::from_ints(116, 224));
        assert_eq!(rect.max, FixedVec2::from_ints(148, 264));
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::Left.sign(), -1);
        assert_eq!(Direction::Right.sign(), 1);
        assert_eq!(Direction::default(), Direction::Right);
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(Tag::InhaleZone.as_str(), "inhaleZone");
        assert_eq!(Tag::ShootingStar.as_str(), "shootingStar");
    }
}
