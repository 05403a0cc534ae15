//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. The only randomness in the
//! simulation is the flyer speed roll, and it must come out the same on
//! replay, so the generator lives in the world and its state is hashed.

use serde::{Serialize, Deserialize};

/// Seeded Xorshift128+ generator.
///
/// ```
/// use kirb::core::rng::DeterministicRng;
///
/// let speeds = [100, 200, 300];
/// let mut live = DeterministicRng::new(7);
/// let mut replay = DeterministicRng::new(7);
/// assert_eq!(live.choose(&speeds), replay.choose(&speeds));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl DeterministicRng {
    /// Create from a 64-bit seed. Weak seeds are spread by SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state = match [splitmix64(&mut s), splitmix64(&mut s)] {
            [0, 0] => [1, 1],
            seeded => seeded,
        };
        Self { state }
    }

    /// Next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let [s0, mut s1] = self.state;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state = [s0.rotate_left(24) ^ s1 ^ (s1 << 16), s1.rotate_left(37)];
        result
    }

    /// Integer in `[0, max)`. Returns 0 when `max` is 0.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Pick one element. Consumes a roll only when `slice` is non-empty.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        slice.get(self.next_int(slice.len() as u32) as usize)
    }

    /// Raw state, for world hashing.
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(12345);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(54321);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_next_int_bounds() {
        let mut rng = DeterministicRng::new(1234);
        for _ in 0..1000 {
            assert!(rng.next_int(3) < 3);
        }
        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_choose_covers_every_speed() {
        let speeds = [100, 200, 300];
        let mut rng = DeterministicRng::new(42);
        let mut seen = [false; 3];

        for _ in 0..300 {
            let pick = *rng.choose(&speeds).unwrap();
            let idx = speeds.iter().position(|s| *s == pick).unwrap();
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_choose_empty_keeps_state() {
        let mut rng = DeterministicRng::new(9);
        let before = rng.state();
        assert!(rng.choose::<u32>(&[]).is_none());
        assert_eq!(rng.state(), before);
    }
}
