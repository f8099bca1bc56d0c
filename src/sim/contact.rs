//! Contact classification
//!
//! Each contact against solid static geometry is sorted by its normal into
//! floor, left wall or right wall. Flags are renewed while contact persists
//! and expire `ttl` seconds after the last renewal.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyKind, ContactEvent, ContactPhase};

/// cos 45°: normals steeper than this count as floor
pub const FLOOR_NORMAL_MIN: f32 = std::f32::consts::FRAC_1_SQRT_2;
/// cos 60°
pub const WALL_NORMAL_MIN: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Touch {
    Floor,
    /// Wall on the player's left (normal points right)
    LeftWall,
    RightWall,
}

impl Touch {
    /// Classify a normal pointing from the surface into the player
    pub fn classify(normal: Vec2) -> Option<Self> {
        if normal.y > FLOOR_NORMAL_MIN {
            Some(Touch::Floor)
        } else if normal.x > WALL_NORMAL_MIN {
            Some(Touch::LeftWall)
        } else if normal.x < -WALL_NORMAL_MIN {
            Some(Touch::RightWall)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactFlag {
    pub active: bool,
    /// Simulation clock at the last renewal (seconds)
    pub last_seen: f64,
}

impl ContactFlag {
    fn renew(&mut self, now: f64) {
        self.active = true;
        self.last_seen = now;
    }

    fn expire(&mut self, now: f64, ttl: f32) {
        if self.active && now - self.last_seen >= f64::from(ttl) {
            self.active = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactState {
    pub floor: ContactFlag,
    pub left_wall: ContactFlag,
    pub right_wall: ContactFlag,
    ttl: f32,
}

impl ContactState {
    pub fn new(ttl: f32) -> Self {
        Self {
            floor: ContactFlag::default(),
            left_wall: ContactFlag::default(),
            right_wall: ContactFlag::default(),
            ttl,
        }
    }

    pub fn on_floor(&self) -> bool {
        self.floor.active
    }

    pub fn on_left_wall(&self) -> bool {
        self.left_wall.active
    }

    pub fn on_right_wall(&self) -> bool {
        self.right_wall.active
    }

    /// Feed one contact event. Ends and non-solid contacts are ignored,
    /// flags simply time out.
    pub fn on_contact(&mut self, event: &ContactEvent, now: f64) -> Option<Touch> {
        if event.other_sensor || event.other_kind != BodyKind::Static {
            return None;
        }
        if event.phase == ContactPhase::End {
            return None;
        }
        let touch = Touch::classify(event.normal)?;
        self.flag_mut(touch).renew(now);
        Some(touch)
    }

    /// Clear flags not renewed within the ttl
    pub fn expire(&mut self, now: f64) {
        let ttl = self.ttl;
        for flag in [&mut self.floor, &mut self.left_wall, &mut self.right_wall] {
            flag.expire(now, ttl);
        }
    }

    fn flag_mut(&mut self, touch: Touch) -> &mut ContactFlag {
        match touch {
            Touch::Floor => &mut self.floor,
            Touch::LeftWall => &mut self.left_wall,
            Touch::RightWall => &mut self.right_wall,
        }
    }
}
