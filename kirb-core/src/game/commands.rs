//! Commands for the Host Engine
//!
//! Everything the core asks its rendering/physics collaborator to do.
//! Commands are queued on the world during a tick and drained into the
//! tick result in issue order.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::entity::{Animation, BodyKind, EntityId, Rect, Tag};

/// A command issued to the external collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Create an entity
    Create {
        /// New entity
        id: EntityId,
        /// Routing tag
        tag: Tag,
        /// Collider rectangle in world space
        shape: Rect,
        /// Static, dynamic, kinematic or trigger
        body: BodyKind,
    },

    /// Remove an entity
    Destroy {
        /// Removed entity
        id: EntityId,
    },

    /// Switch animation
    SetAnimation {
        /// Target entity
        id: EntityId,
        /// Animation to play
        animation: Animation,
    },

    /// Mirror the sprite
    SetFlip {
        /// Target entity
        id: EntityId,
        /// Mirrored horizontally
        flip_x: bool,
    },

    /// Change opacity (hurt flash)
    SetOpacity {
        /// Target entity
        id: EntityId,
        /// 0 = invisible, FIXED_ONE = opaque
        opacity: Fixed,
    },

    /// Apply an instantaneous velocity change
    ApplyImpulse {
        /// Target entity
        id: EntityId,
        /// Velocity delta
        impulse: FixedVec2,
    },

    /// Show, move or hide the inhale effect sprite
    SetInhaleEffect {
        /// Effect visible
        visible: bool,
        /// Effect position
        position: FixedVec2,
        /// Mirrored horizontally
        flip_x: bool,
    },

    /// Point the camera at a position
    SetCameraTarget {
        /// Camera target
        position: FixedVec2,
    },

    /// Activate a scene
    SwitchScene {
        /// Scene name
        scene: String,
    },
}

impl Command {
    /// Entity the command targets, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Command::Create { id, .. }
            | Command::Destroy { id }
            | Command::SetAnimation { id, .. }
            | Command::SetFlip { id, .. }
            | Command::SetOpacity { id, .. }
            | Command::ApplyImpulse { id, .. } => Some(*id),
            Command::SetInhaleEffect { .. }
            | Command::SetCameraTarget { .. }
            | Command::SwitchScene { .. } => None,
        }
    }
}
