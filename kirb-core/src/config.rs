//! Configuration
//!
//! [`GameConfig`] carries every gameplay constant. Its `Default` is the
//! shipped tuning; a JSON file may override any subset of fields.
//! [`RuntimeConfig`] holds process-level settings read from the
//! environment by the binary.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{from_int, Fixed};
use crate::TICK_RATE;

/// Convert a duration in milliseconds to whole ticks, rounding up.
///
/// ```
/// use kirb::config::ticks_for_millis;
/// assert_eq!(ticks_for_millis(1000), 60);
/// assert_eq!(ticks_for_millis(50), 3);
/// ```
#[inline]
pub const fn ticks_for_millis(ms: u32) -> u32 {
    // u32::MAX ms is ~257M ticks, so the narrowing cast cannot truncate
    ((ms as u64 * TICK_RATE as u64 + 999) / 1000) as u32
}

// =============================================================================
// GAMEPLAY CONFIG
// =============================================================================

/// Gameplay constants.
///
/// Speeds and distances are whole world units (pixels after map
/// scaling); durations are milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Multiplier applied to level coordinates and sprite-space shapes
    pub map_scale: i32,
    /// Downward acceleration (units/s²)
    pub gravity: i32,
    /// Terminal falling speed (units/s)
    pub max_fall_speed: i32,
    /// Player horizontal speed (units/s)
    pub player_speed: i32,
    /// Player jump impulse (units/s)
    pub jump_force: i32,
    /// Extra jumps allowed while airborne
    pub extra_jumps: u8,
    /// Starting health
    pub max_health: u32,
    /// Player y beyond which the level restarts
    pub fall_threshold: i32,
    /// Horizontal speed of an enemy being inhaled (units/s)
    pub inhale_pull_speed: i32,
    /// Shooting star speed (units/s)
    pub star_speed: i32,
    /// Horizontal spawn offset of a shooting star from the player
    pub star_offset_x: i32,
    /// Vertical spawn offset of a shooting star from the player
    pub star_offset_y: i32,
    /// Horizontal offset of the inhale effect sprite from the player
    pub inhale_effect_offset_x: i32,
    /// Duration of each half of the hurt flash (ms)
    pub flash_half_ms: u32,
    /// Delay before the idle animation returns after spitting (ms)
    pub spit_recover_ms: u32,
    /// Flame jump impulse (units/s)
    pub flame_jump_force: i32,
    /// Patrol walking speed (units/s)
    pub patrol_speed: i32,
    /// Interval between flyer spawns per spawn point (ms)
    pub flyer_interval_ms: u32,
    /// Speeds a new flyer picks from (units/s)
    pub flyer_speeds: Vec<i32>,
    /// Distance past the level bounds at which entities are culled
    pub offscreen_margin: i32,
    /// Camera x offset from the player
    pub camera_offset_x: i32,
    /// Fixed camera y
    pub camera_y: i32,
    /// Seed for the world RNG
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_scale: 4,
            gravity: 2100,
            max_fall_speed: 1600,
            player_speed: 300,
            jump_force: 640,
            extra_jumps: 1,
            max_health: 3,
            fall_threshold: 2000,
            inhale_pull_speed: 800,
            star_speed: 800,
            star_offset_x: 80,
            star_offset_y: 5,
            inhale_effect_offset_x: 60,
            flash_half_ms: 50,
            spit_recover_ms: 1000,
            flame_jump_force: 1000,
            patrol_speed: 100,
            flyer_interval_ms: 10_000,
            flyer_speeds: vec![100, 200, 300],
            offscreen_margin: 400,
            camera_offset_x: 500,
            camera_y: 800,
            rng_seed: 0x4B49_5242,
        }
    }
}

impl GameConfig {
    /// Load overrides from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse overrides from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_scale <= 0 {
            return Err(ConfigError::Invalid("map_scale must be positive"));
        }
        if self.max_health == 0 {
            return Err(ConfigError::Invalid("max_health must be at least 1"));
        }
        if self.flyer_interval_ms == 0 {
            return Err(ConfigError::Invalid("flyer_interval_ms must be positive"));
        }
        if self.flyer_speeds.is_empty() {
            return Err(ConfigError::Invalid("flyer_speeds must not be empty"));
        }
        Ok(())
    }

    /// Map scale as a fixed-point factor.
    #[inline]
    pub fn scale(&self) -> Fixed {
        from_int(self.map_scale)
    }

    /// Ticks per flash half.
    pub fn flash_half_ticks(&self) -> u32 {
        ticks_for_millis(self.flash_half_ms).max(1)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {path:?}: {source}")]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Not valid JSON for [`GameConfig`].
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parsed, but unusable.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

// =============================================================================
// RUNTIME CONFIG
// =============================================================================

/// Process settings for the headless runner.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Directory holding `<level>.json` documents
    pub level_dir: PathBuf,
    /// Scene entered at startup
    pub start_scene: String,
    /// Number of ticks to simulate
    pub max_ticks: u32,
    /// Optional JSON file with [`GameConfig`] overrides
    pub config_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            level_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/levels")),
            start_scene: "level-1".to_string(),
            max_ticks: 60 * TICK_RATE,
            config_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level_dir: std::env::var("KIRB_LEVEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.level_dir),
            start_scene: std::env::var("KIRB_START_SCENE").unwrap_or(defaults.start_scene),
            max_ticks: std::env::var("KIRB_MAX_TICKS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_ticks),
            config_path: std::env::var("KIRB_CONFIG").ok().map(PathBuf::from),
        }
    }

    /// Gameplay config: the override file if one is set, else defaults.
    pub fn game_config(&self) -> Result<GameConfig, ConfigError> {
        match &self.config_path {
            Some(path) => GameConfig::from_json_file(path),
            None => Ok(GameConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_for_millis() {
        assert_eq!(ticks_for_millis(0), 0);
        assert_eq!(ticks_for_millis(1000), 60);
        assert_eq!(ticks_for_millis(2000), 120);
        assert_eq!(ticks_for_millis(10_000), 600);
        assert_eq!(ticks_for_millis(50), 3);
        assert_eq!(ticks_for_millis(10), 1);
    }

    #[test]
    fn test_long_durations_do_not_overflow() {
        assert_eq!(ticks_for_millis(100_000_000), 6_000_000);
        assert_eq!(ticks_for_millis(u32::MAX), 257_698_038);

        let config = GameConfig { flash_half_ms: u32::MAX, ..GameConfig::default() };
        assert_eq!(config.flash_half_ticks(), 257_698_038);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "player_speed": 450, "max_health": 5 }"#).unwrap();
        assert_eq!(config.player_speed, 450);
        assert_eq!(config.max_health, 5);
        assert_eq!(config.gravity, 2100);
        assert_eq!(config.flyer_speeds, vec![100, 200, 300]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = GameConfig::from_json_str(r#"{ "flyer_speeds": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_flash_half_ticks() {
        let config = GameConfig::default();
        assert_eq!(config.flash_half_ticks(), 3);
        assert_eq!(config.scale(), from_int(4));
    }
}
