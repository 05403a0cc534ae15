//! Input Capture and Recording
//!
//! One [`InputFrame`] per tick, already normalized by the host from raw
//! device events. Held keys are levels; jump is an edge (pressed this
//! frame). The ability action is a level, and the player state machine
//! derives press/release edges from consecutive frames.

use serde::{Serialize, Deserialize};

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Input state for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct InputFrame {
    /// Packed flags:
    /// - Bit 0: Move-left held
    /// - Bit 1: Move-right held
    /// - Bit 2: Jump pressed this frame
    /// - Bit 3: Ability action held
    /// - Bit 4-7: Reserved
    pub flags: u8,
}

impl InputFrame {
    /// Size in bytes
    pub const SIZE: usize = 1;

    /// Move-left flag bit
    pub const FLAG_LEFT: u8 = 0x01;

    /// Move-right flag bit
    pub const FLAG_RIGHT: u8 = 0x02;

    /// Jump flag bit
    pub const FLAG_JUMP: u8 = 0x04;

    /// Ability action flag bit
    pub const FLAG_ACTION: u8 = 0x08;

    /// Create a new empty input frame.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Create from raw flags.
    pub const fn from_flags(flags: u8) -> Self {
        Self { flags }
    }

    /// Move-left held.
    #[inline]
    pub fn left_held(&self) -> bool {
        self.flags & Self::FLAG_LEFT != 0
    }

    /// Move-right held.
    #[inline]
    pub fn right_held(&self) -> bool {
        self.flags & Self::FLAG_RIGHT != 0
    }

    /// Jump pressed this frame.
    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.flags & Self::FLAG_JUMP != 0
    }

    /// Ability action held.
    #[inline]
    pub fn action_held(&self) -> bool {
        self.flags & Self::FLAG_ACTION != 0
    }

    /// No keys down.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.flags == 0
    }

    #[inline]
    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Set move-left flag.
    pub fn set_left(&mut self, held: bool) {
        self.set_flag(Self::FLAG_LEFT, held);
    }

    /// Set move-right flag.
    pub fn set_right(&mut self, held: bool) {
        self.set_flag(Self::FLAG_RIGHT, held);
    }

    /// Set jump flag.
    pub fn set_jump(&mut self, pressed: bool) {
        self.set_flag(Self::FLAG_JUMP, pressed);
    }

    /// Set ability action flag.
    pub fn set_action(&mut self, held: bool) {
        self.set_flag(Self::FLAG_ACTION, held);
    }

    /// Builder: move-left held.
    pub const fn with_left(self) -> Self {
        Self { flags: self.flags | Self::FLAG_LEFT }
    }

    /// Builder: move-right held.
    pub const fn with_right(self) -> Self {
        Self { flags: self.flags | Self::FLAG_RIGHT }
    }

    /// Builder: jump pressed.
    pub const fn with_jump(self) -> Self {
        Self { flags: self.flags | Self::FLAG_JUMP }
    }

    /// Builder: ability action held.
    pub const fn with_action(self) -> Self {
        Self { flags: self.flags | Self::FLAG_ACTION }
    }
}

/// Delta-compressed input entry.
///
/// Only stored when input CHANGES (not every tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: u32,
    /// The new input state
    pub frame: InputFrame,
}

impl InputDelta {
    /// Size in bytes (approximate)
    pub const SIZE: usize = 5;

    /// Create new delta entry.
    pub fn new(tick: u32, frame: InputFrame) -> Self {
        Self { tick, frame }
    }
}

// =============================================================================
// INPUT BUFFER
// =============================================================================

/// Complete input recording for one play-through of a scene.
///
/// Together with the scene name and seed this is enough to replay the
/// scene tick-for-tick and reproduce its state hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerInputBuffer {
    /// Scene the recording was made in
    pub scene: String,

    /// RNG seed of the recorded world
    pub rng_seed: u64,

    /// First recorded tick
    pub start_tick: u32,

    /// Last recorded tick
    pub end_tick: u32,

    /// Delta-compressed input data.
    deltas: Vec<InputDelta>,

    /// Last recorded input (for delta comparison)
    #[serde(skip)]
    last_frame: InputFrame,
}

impl PlayerInputBuffer {
    /// Create an empty recording. Ticks start at 1 (the first simulated tick).
    pub fn new(scene: impl Into<String>, rng_seed: u64) -> Self {
        Self {
            scene: scene.into(),
            rng_seed,
            start_tick: 1,
            end_tick: 0,
            deltas: Vec::with_capacity(256),
            last_frame: InputFrame::new(),
        }
    }

    /// Record input for a tick.
    ///
    /// Only stores if input changed from previous frame.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = tick;

        if frame != self.last_frame {
            self.deltas.push(InputDelta::new(tick, frame));
            self.last_frame = frame;
        }
    }

    /// Get input at a specific tick.
    pub fn get_input_at(&self, tick: u32) -> InputFrame {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);

        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// All deltas.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of delta entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Number of ticks covered.
    pub fn tick_count(&self) -> u32 {
        (self.end_tick + 1).saturating_sub(self.start_tick)
    }

    /// Estimated size in bytes.
    pub fn estimated_size(&self) -> usize {
        24 + self.scene.len() + (self.deltas.len() * InputDelta::SIZE)
    }

    /// Close the recording at `end_tick`.
    pub fn finalize(&mut self, end_tick: u32) {
        self.end_tick = end_tick;
    }

    /// Iterate every recorded tick with its input.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            buffer: self,
            current_tick: self.start_tick,
            delta_idx: 0,
            current_frame: InputFrame::new(),
        }
    }
}

/// Iterator for replaying inputs tick-by-tick.
pub struct ReplayIterator<'a> {
    buffer: &'a PlayerInputBuffer,
    current_tick: u32,
    delta_idx: usize,
    current_frame: InputFrame,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, InputFrame);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.buffer.end_tick {
            return None;
        }

        while self.delta_idx < self.buffer.deltas.len() {
            let delta = &self.buffer.deltas[self.delta_idx];
            if delta.tick <= self.current_tick {
                self.current_frame = delta.frame;
                self.delta_idx += 1;
            } else {
                break;
            }
        }

        let result = (self.current_tick, self.current_frame);
        self.current_tick += 1;
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
