//! Engine Configuration
//!
//! Every numeric threshold the detectors use is a policy knob here, with the
//! production defaults inline. Config can be loaded from TOML; missing
//! sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gaze: GazeConfig,
    pub drift: DriftConfig,
    pub movement: MovementConfig,
    pub objects: ObjectConfig,
    pub throttle: ThrottleConfig,
    pub snapshot: SnapshotConfig,
    pub environment: EnvironmentConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.cooldown_sec <= 0.0 {
            return Err(ConfigError::Validation(
                "throttle.cooldown_sec must be positive".into(),
            ));
        }
        if self.snapshot.interval_sec <= 0.0 {
            return Err(ConfigError::Validation(
                "snapshot.interval_sec must be positive".into(),
            ));
        }
        if self.environment.min_brightness >= self.environment.max_brightness {
            return Err(ConfigError::Validation(
                "environment brightness bounds are inverted".into(),
            ));
        }
        if self.movement.change_threshold == 0 {
            return Err(ConfigError::Validation(
                "movement.change_threshold must be at least 1".into(),
            ));
        }
        if self.session.shards == 0 {
            return Err(ConfigError::Validation(
                "session.shards must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Looking-away classification thresholds. Degrees unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Yaw offset that saturates the confidence blend
    pub max_yaw_offset: f32,
    /// Pitch offset that saturates the confidence blend
    pub max_pitch_offset: f32,
    /// Minimum confidence to declare looking away
    pub confidence_gate: f32,
    /// Confidence at which severity escalates to high
    pub severity_gate: f32,
    /// Fraction of `max_yaw_offset` the yaw offset must exceed
    pub yaw_gate_fraction: f32,
    /// Minimum combined angular deviation
    pub min_total_deviation: f32,
    /// Absolute yaw floor
    pub min_yaw_offset: f32,
    /// Pitch offset above which the turn reads as nodding, not a head turn
    pub max_nod_pitch_offset: f32,
    /// Raw angles beyond this are treated as solver noise
    pub max_plausible_angle: f32,
    /// Calibration baselines beyond this are treated as invalid
    pub max_plausible_baseline: f32,
    /// Minimum landmark count for a trustworthy mesh
    pub min_landmarks: usize,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            max_yaw_offset: 60.0,
            max_pitch_offset: 50.0,
            confidence_gate: 0.98,
            severity_gate: 0.99,
            yaw_gate_fraction: 0.85,
            min_total_deviation: 55.0,
            min_yaw_offset: 50.0,
            max_nod_pitch_offset: 60.0,
            max_plausible_angle: 90.0,
            max_plausible_baseline: 45.0,
            min_landmarks: 400,
        }
    }
}

/// Sustained off-baseline gaze tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Eye-center offset from face center, as a fraction of face width
    pub eye_offset_threshold: f32,
    /// Frame-to-frame eye movement floor; a frozen face never accumulates
    pub min_movement: f32,
    /// Continuous away time before a violation fires (seconds)
    pub away_threshold_sec: f32,
    /// Eyes must be back this long before the episode resets (seconds)
    pub refocus_debounce_sec: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            eye_offset_threshold: 0.15,
            min_movement: 0.05,
            away_threshold_sec: 5.0,
            refocus_debounce_sec: 1.0,
        }
    }
}

/// Repeated body-shift tracking (face box center as body proxy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Normalized displacement floor (fraction of max frame dimension)
    pub displacement_threshold: f32,
    /// A qualifying shift this long after the previous one starts a new episode (seconds)
    pub episode_gap_sec: f32,
    /// Quiet time before the counter decays by one (seconds)
    pub decay_after_sec: f32,
    /// Qualifying shifts needed to fire
    pub change_threshold: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            displacement_threshold: 0.15,
            episode_gap_sec: 2.0,
            decay_after_sec: 1.0,
            change_threshold: 5,
        }
    }
}

/// Prohibited-object mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Detections below this confidence are ignored
    pub confidence_floor: f32,
    /// Book detections are mapped but suppressed unless enabled
    pub emit_book_violations: bool,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.3,
            emit_book_violations: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum interval between emissions of one violation type (seconds)
    pub cooldown_sec: f32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { cooldown_sec: 12.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Base snapshot interval (seconds); the evidence gate requires twice this
    pub interval_sec: f32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { interval_sec: 2.0 }
    }
}

/// Lighting and framing checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Mean luma below this reads as a switched-off camera
    pub black_screen_brightness: f32,
    /// Acceptable lighting range for the environment check (exclusive)
    pub min_brightness: f32,
    pub max_brightness: f32,
    /// Acceptable face-center band, normalized coordinates (exclusive)
    pub center_x_min: f32,
    pub center_x_max: f32,
    pub center_y_min: f32,
    pub center_y_max: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            black_screen_brightness: 15.0,
            min_brightness: 40.0,
            max_brightness: 220.0,
            center_x_min: 0.3,
            center_x_max: 0.7,
            center_y_min: 0.2,
            center_y_max: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions quiet for this long are removed by `evict_idle` (seconds)
    pub idle_timeout_sec: f32,
    /// Shard count for the session registry
    pub shards: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_sec: 600.0,
            shards: 16,
        }
    }
}
