//! # Kirb Core
//!
//! Deterministic behavior core for a Kirby-like 2D side-scroller. The
//! host engine renders, plays audio and reads devices; this crate owns
//! everything that decides what happens.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        KIRB CORE                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── map.rs      - Level documents and map cache             │
//! │  ├── factory.rs  - Entities from spawn points                │
//! │  ├── player.rs   - Ability state machine                     │
//! │  ├── enemy.rs    - Enemy behavior charts                     │
//! │  ├── router.rs   - Collision event routing                   │
//! │  ├── tick.rs     - Simulation loop                           │
//! │  └── scene.rs    - Scene lifecycle                           │
//! │                                                              │
//! │  config.rs       - Gameplay constants and runtime settings   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Host Boundary
//!
//! Each tick the host supplies one [`InputFrame`] and receives
//! [`game::GameEvent`]s plus [`game::Command`]s (sprite creation,
//! animation, flip, destroy, scene switch) to apply to its own scene
//! graph. The host may skip [`game::physics`] and feed contacts from its
//! own engine instead.
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies (timers count ticks)
//! - All randomness from seeded Xorshift128+
//!
//! Given identical level data, config and inputs, a scene produces
//! **identical state hashes** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod config;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use config::GameConfig;
pub use game::input::{InputFrame, InputDelta, PlayerInputBuffer};
pub use game::world::World;
pub use game::scene::{SceneDirector, SceneState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
