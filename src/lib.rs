//! ShapeMania - a shape-shifting ball platformer
//!
//! Core modules:
//! - `level`: Load-time compiler from vector artwork to physics geometry
//! - `sim`: Per-tick simulation (contacts, locomotion, world state)
//! - `settings`: Data-driven tuning
//! - `error`: Load and configuration errors

pub mod error;
pub mod level;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, LevelError};
pub use settings::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World height (meters) the calibration rect maps onto
    pub const LEVEL_HEIGHT: f32 = 24.0;
    /// Cubic curve subdivisions per world unit of estimated length
    pub const CURVE_SUBDIVS: f32 = 20.0;
    /// Coincidence tolerance for points, edges and triangles
    pub const EPSILON: f32 = 0.001;

    /// Placeholder level rules until documents carry their own
    pub const SCORE_GOAL: u32 = 10_000;
    pub const TIME_LIMIT: f32 = 300.0;
    /// Continuous goal-zone contact needed to win (seconds)
    pub const WIN_HOLD_TIME: f32 = 1.0;

    /// How long a contact flag survives without being renewed (seconds)
    pub const CONTACT_TTL: f32 = 0.2;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 0.5;
    pub const PLAYER_DENSITY: f32 = 3.0;
    pub const PLAYER_FRICTION: f32 = 0.1;
    pub const PLAYER_RESTITUTION: f32 = 1.0;
    /// Rolling angular speed per unit of horizontal input
    pub const VELOCITY: f32 = 5.0;
    pub const TORQUE: f32 = 2.0;
    pub const JUMP_IMPULSE: f32 = 4.0;
    pub const AIR_CONTROL: f32 = 3.0;
    pub const V_MAX_AIRCONTROL: f32 = 2.5;
    pub const V_MAX_GLIDE_DROP: f32 = -2.0;
    pub const V_MAX_ROLL: f32 = 40.0;
    pub const GLIDE_V_SCALE: f32 = 0.01;

    /// World gravity (m/s²)
    pub const GRAVITY: f32 = -9.81;
}

/// Axis-aligned rectangle in world or document space
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing all points
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn scaled(&self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.width * s, self.height * s)
    }
}

/// Normalized angle to [-π, π]
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

/// Twice the signed area of triangle (a, b, c); positive when counter-clockwise
#[inline]
pub fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}
