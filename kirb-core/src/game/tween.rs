//! Opacity Tweens
//!
//! The hurt flash: a linear fade to transparent followed by a linear
//! fade back to opaque, advanced one tick at a time.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{fixed_div, fixed_lerp, from_int, Fixed, FIXED_ONE};

/// Two-phase linear opacity flash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    half_ticks: u32,
    elapsed: u32,
}

impl Flash {
    /// Create a flash whose fade-out and fade-in each last `half_ticks`.
    pub fn new(half_ticks: u32) -> Self {
        Self {
            half_ticks: half_ticks.max(1),
            elapsed: 0,
        }
    }

    /// Opacity at the current step.
    pub fn opacity(&self) -> Fixed {
        let half = self.half_ticks;
        if self.elapsed <= half {
            fixed_lerp(FIXED_ONE, 0, progress(self.elapsed, half))
        } else {
            let step = (self.elapsed - half).min(half);
            fixed_lerp(0, FIXED_ONE, progress(step, half))
        }
    }

    /// Step one tick and return the new opacity.
    pub fn advance(&mut self) -> Fixed {
        if !self.is_finished() {
            self.elapsed += 1;
        }
        self.opacity()
    }

    /// Both phases complete.
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.total_ticks()
    }

    /// Length of the whole flash.
    pub fn total_ticks(&self) -> u32 {
        self.half_ticks * 2
    }
}

#[inline]
fn progress(step: u32, total: u32) -> Fixed {
    fixed_div(from_int(step as i32), from_int(total as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_fades_out_then_in() {
        let mut flash = Flash::new(3);
        assert_eq!(flash.opacity(), FIXED_ONE);

        let out: Vec<Fixed> = (0..3).map(|_| flash.advance()).collect();
        assert!(out[0] < FIXED_ONE && out[0] > out[1]);
        assert_eq!(out[2], 0);

        let back: Vec<Fixed> = (0..3).map(|_| flash.advance()).collect();
        assert!(back[0] > 0 && back[0] < back[1]);
        assert_eq!(back[2], FIXED_ONE);
        assert!(flash.is_finished());
    }

    #[test]
    fn test_finished_flash_stays_opaque() {
        let mut flash = Flash::new(1);
        flash.advance();
        flash.advance();
        assert!(flash.is_finished());
        assert_eq!(flash.advance(), FIXED_ONE);
        assert_eq!(flash.total_ticks(), 2);
    }

    #[test]
    fn test_zero_half_is_clamped() {
        let flash = Flash::new(0);
        assert_eq!(flash.total_ticks(), 2);
    }
}
