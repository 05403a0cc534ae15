//! Q16.16 Fixed-Point Arithmetic
//!
//! Positions, velocities, timers and flash opacity are stored as
//! [`Fixed`]: a signed 32-bit integer with 16 fractional bits. A scaled
//! level is a few thousand world units wide, well inside the ±32768
//! integer range, and 1/65536 precision is far below a pixel.
//!
//! Floats only cross this boundary at load time ([`to_fixed`] on level
//! coordinates) and on the way out to a renderer ([`to_float`]).

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

/// One 60 Hz tick in seconds: round(65536/60) = 1092
pub const TICK_DURATION: Fixed = 1092;

/// Convert a float to fixed-point. Truncates toward zero.
///
/// ```
/// use kirb::core::fixed::{to_fixed, FIXED_ONE};
/// const SCALE: i32 = to_fixed(2.5);
/// assert_eq!(SCALE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Convert to float for rendering and logs. Never feed the result back.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply through an i64 intermediate, truncating.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    (((a as i64) * (b as i64)) >> FIXED_SCALE) as Fixed
}

/// Divide with a pre-shifted numerator. Division by zero yields 0.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    (((a as i64) << FIXED_SCALE) / b as i64) as Fixed
}

/// `a + (b - a) * t`, with `t` in `0..=FIXED_ONE`.
#[inline]
pub fn fixed_lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    a.wrapping_add(fixed_mul(b.wrapping_sub(a), t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(TICK_DURATION, 1092);
    }

    #[test]
    fn test_level_coordinates_convert() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(-1.0), -FIXED_ONE);
        assert_eq!(from_int(128), to_fixed(128.0));
        assert_eq!(to_float(to_fixed(-2.25)), -2.25);
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(fixed_mul(from_int(4), to_fixed(5.5)), from_int(22));
        assert_eq!(fixed_mul(to_fixed(-2.0), from_int(3)), from_int(-6));
        assert_eq!(fixed_div(from_int(6), from_int(4)), to_fixed(1.5));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_velocity_per_tick() {
        // 300 units/s over one tick is ~5 units
        let step = fixed_mul(from_int(300), TICK_DURATION);
        assert!((step - from_int(5)).abs() < 200);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(fixed_lerp(FIXED_ONE, 0, FIXED_HALF), FIXED_HALF);
        assert_eq!(fixed_lerp(0, FIXED_ONE, FIXED_ONE), FIXED_ONE);
        assert_eq!(fixed_lerp(0, FIXED_ONE, 0), 0);
    }
}
