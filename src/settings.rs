//! Data-driven tuning
//!
//! Every knob defaults to the value in `consts`; a JSON file only needs to
//! carry the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::level::PhysicalProps;

/// Level compiler knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTuning {
    /// World height the `screen` calibration rect is scaled to
    pub world_height: f32,
    /// Cubic subdivisions per unit of estimated curve length
    pub curve_subdivs: f32,
    /// Point coincidence tolerance
    pub epsilon: f32,
    /// Fixture properties for elements without an `fp:` annotation
    pub default_props: PhysicalProps,
}

impl Default for LevelTuning {
    fn default() -> Self {
        Self {
            world_height: LEVEL_HEIGHT,
            curve_subdivs: CURVE_SUBDIVS,
            epsilon: EPSILON,
            default_props: PhysicalProps::default(),
        }
    }
}

/// Player body and locomotion knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Rolling angular speed per unit of horizontal input
    pub velocity: f32,
    pub torque: f32,
    pub jump_impulse: f32,
    pub air_control: f32,
    pub v_max_air_control: f32,
    /// Terminal vertical speed while gliding (negative = downward)
    pub v_max_glide_drop: f32,
    /// Angular speed ceiling while tumbling
    pub v_max_roll: f32,
    pub glide_v_scale: f32,
    /// Contact flag lifetime, also the jump cooldown
    pub contact_ttl: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: PLAYER_RADIUS,
            density: PLAYER_DENSITY,
            friction: PLAYER_FRICTION,
            restitution: PLAYER_RESTITUTION,
            velocity: VELOCITY,
            torque: TORQUE,
            jump_impulse: JUMP_IMPULSE,
            air_control: AIR_CONTROL,
            v_max_air_control: V_MAX_AIRCONTROL,
            v_max_glide_drop: V_MAX_GLIDE_DROP,
            v_max_roll: V_MAX_ROLL,
            glide_v_scale: GLIDE_V_SCALE,
            contact_ttl: CONTACT_TTL,
        }
    }
}

/// Win/lose rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesTuning {
    /// Continuous goal contact needed for victory (seconds)
    pub win_hold_time: f32,
    pub score_goal: u32,
    /// Level time limit (seconds)
    pub time_limit: f32,
}

impl Default for RulesTuning {
    fn default() -> Self {
        Self {
            win_hold_time: WIN_HOLD_TIME,
            score_goal: SCORE_GOAL,
            time_limit: TIME_LIMIT,
        }
    }
}

/// All tuning, grouped by the subsystem that reads it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub level: LevelTuning,
    pub player: PlayerTuning,
    pub rules: RulesTuning,
}

impl Tuning {
    /// Parse tuning from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load tuning from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Load tuning, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("{e}; using default tuning");
                Self::default()
            }
        }
    }
}
