//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `map`: Level documents, tile maps, map cache
//! - `entity`: Entities, tags, bodies, colliders
//! - `world`: Scene world state and pending output
//! - `factory`: Entity construction from spawn points
//! - `player`: Player ability state machine
//! - `enemy`: Enemy behavior charts
//! - `collision`/`router`: Contact tracking and tag-pair dispatch
//! - `physics`: Reference body integration
//! - `scheduler`/`tween`: Tick-based timers and feedback effects
//! - `tick`: Simulation loop and replay
//! - `scene`: Scene state and transitions
//! - `input`/`events`/`commands`: Host-facing input and output

pub mod input;
pub mod entity;
pub mod world;
pub mod map;
pub mod factory;
pub mod player;
pub mod enemy;
pub mod collision;
pub mod router;
pub mod physics;
pub mod scheduler;
pub mod tween;
pub mod tick;
pub mod scene;
pub mod events;
pub mod commands;

// Re-export key types
pub use input::{InputFrame, InputDelta, PlayerInputBuffer};
pub use entity::{Entity, EntityId, EntityKind, Tag};
pub use world::World;
pub use map::{TileMap, MapCache, LevelSource};
pub use scene::{SceneDirector, SceneState, SceneError};
pub use tick::TickResult;
pub use events::GameEvent;
pub use commands::Command;
