//! Player body and locomotion
//!
//! Three movement modes share one dynamic circle body. Switching mode swaps
//! the body profile; per-tick input is turned into forces, torques and jump
//! impulses depending on mode and current contacts.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::contact::ContactState;
use super::physics::{BodyDef, BodyHandle, BodyProfile, PhysicsEngine};
use super::tick::TickInput;
use crate::level::PhysicalProps;
use crate::settings::PlayerTuning;

/// Locomotion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Ground control, jumps and wall jumps
    #[default]
    Rolling,
    /// Torque-driven, bouncy
    Tumbling,
    /// Tiny, light, slow fall
    Gliding,
}

impl MovementMode {
    pub const ALL: [MovementMode; 3] = [
        MovementMode::Rolling,
        MovementMode::Tumbling,
        MovementMode::Gliding,
    ];

    /// Mode bound to selector key 1..=3
    pub fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(usize::from(slot).checked_sub(1)?).copied()
    }

    pub fn profile(self, tuning: &PlayerTuning) -> BodyProfile {
        let r = tuning.radius;
        match self {
            MovementMode::Rolling => BodyProfile {
                radius: r * 0.9,
                restitution: 0.1,
                linear_damping: 0.2,
                angular_damping: 0.8,
                fixed_rotation: false,
                gravity_scale: 1.0,
            },
            MovementMode::Tumbling => BodyProfile {
                radius: r,
                restitution: 0.1,
                linear_damping: 0.05,
                angular_damping: 0.05,
                fixed_rotation: false,
                gravity_scale: 1.0,
            },
            MovementMode::Gliding => BodyProfile {
                radius: r / 5.0,
                restitution: 0.0,
                linear_damping: 0.01,
                angular_damping: 0.8,
                fixed_rotation: true,
                gravity_scale: 0.1,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    body: BodyHandle,
    mode: MovementMode,
    contacts: ContactState,
    /// Clock reading of the last applied jump
    last_jump: Option<f64>,
    jump_held: bool,
    alive: bool,
}

impl Player {
    /// Create the player body at `position` in rolling mode
    pub fn spawn<E: PhysicsEngine>(engine: &mut E, position: Vec2, tuning: &PlayerTuning) -> Self {
        let props = PhysicalProps::new(tuning.density, tuning.friction, tuning.restitution);
        let body = engine.create_body(&BodyDef::ball(position, tuning.radius, props));
        engine.watch_contacts(body);

        let mut player = Self {
            body,
            mode: MovementMode::default(),
            contacts: ContactState::new(tuning.contact_ttl),
            last_jump: None,
            jump_held: false,
            alive: true,
        };
        player.apply_mode(engine, MovementMode::default(), tuning);
        log::debug!("Player spawned at {position}");
        player
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    pub fn contacts(&self) -> &ContactState {
        &self.contacts
    }

    pub fn contacts_mut(&mut self) -> &mut ContactState {
        &mut self.contacts
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn position<E: PhysicsEngine>(&self, engine: &E) -> Vec2 {
        engine.position(self.body)
    }

    /// Switch movement mode. Returns false if already in `mode`.
    pub fn set_mode<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        mode: MovementMode,
        tuning: &PlayerTuning,
    ) -> bool {
        if mode == self.mode {
            return false;
        }
        self.apply_mode(engine, mode, tuning);
        true
    }

    fn apply_mode<E: PhysicsEngine>(&mut self, engine: &mut E, mode: MovementMode, tuning: &PlayerTuning) {
        engine.apply_profile(self.body, &mode.profile(tuning));
        if mode == MovementMode::Gliding {
            let v = engine.linear_velocity(self.body);
            engine.set_linear_velocity(self.body, Vec2::new(v.x, v.y.clamp(-1.0, 1.0)));
        }
        engine.wake(self.body);
        self.mode = mode;
    }

    /// Apply one tick of locomotion. Returns the jump impulse, if one fired.
    pub fn drive<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        input: &TickInput,
        now: f64,
        tuning: &PlayerTuning,
    ) -> Option<Vec2> {
        let mv = input.movement;
        let body = self.body;
        let v = engine.linear_velocity(body);

        let jump_pressed = input.jump && !self.jump_held;
        self.jump_held = input.jump;

        match self.mode {
            MovementMode::Rolling => {
                if self.contacts.on_floor() {
                    engine.set_angular_velocity(body, -mv.x * tuning.velocity);
                } else if v.x.abs() < tuning.v_max_air_control {
                    engine.apply_force(body, Vec2::new(mv.x * tuning.air_control, 0.0));
                }

                if jump_pressed && self.jump_ready(now, tuning) {
                    let impulse = self.jump_impulse(mv, tuning)?;
                    engine.apply_impulse(body, impulse);
                    self.last_jump = Some(now);
                    log::trace!("jump {impulse} at {now:.3}");
                    return Some(impulse);
                }
            }
            MovementMode::Tumbling => {
                if engine.angular_velocity(body).abs() < tuning.v_max_roll {
                    engine.apply_torque(body, -mv.x * tuning.torque);
                }
                if v.length() < 0.1 {
                    engine.set_angular_velocity(body, -mv.x * tuning.velocity * 0.5);
                }
            }
            MovementMode::Gliding => {
                if v.y < tuning.v_max_glide_drop {
                    engine.set_linear_velocity(body, Vec2::new(v.x, tuning.v_max_glide_drop));
                }
                engine.apply_force(body, Vec2::new(0.0, mv.y * v.x.abs() * tuning.glide_v_scale));
            }
        }
        None
    }

    /// No locomotion outside of play; spinning stops
    pub fn idle<E: PhysicsEngine>(&mut self, engine: &mut E) {
        engine.set_angular_velocity(self.body, 0.0);
    }

    fn jump_ready(&self, now: f64, tuning: &PlayerTuning) -> bool {
        self.last_jump
            .is_none_or(|t| now - t >= f64::from(tuning.contact_ttl))
    }

    /// Floor jumps straight up; wall jumps need input pointing away from the wall
    fn jump_impulse(&self, mv: Vec2, tuning: &PlayerTuning) -> Option<Vec2> {
        let j = tuning.jump_impulse;
        if self.contacts.on_floor() {
            Some(Vec2::new(0.0, j))
        } else if self.contacts.on_left_wall() && mv.x > 0.0 {
            Some(Vec2::new(j / 3.0, j))
        } else if self.contacts.on_right_wall() && mv.x < 0.0 {
            Some(Vec2::new(-j / 3.0, j))
        } else {
            None
        }
    }

    /// Whether the body's lowest point is below `lower_bound`
    pub fn is_below<E: PhysicsEngine>(&self, engine: &E, lower_bound: f32, tuning: &PlayerTuning) -> bool {
        let radius = self.mode.profile(tuning).radius;
        engine.position(self.body).y - radius < lower_bound
    }

    /// Kill the player and remove its body
    pub fn kill<E: PhysicsEngine>(&mut self, engine: &mut E) {
        if self.alive {
            self.alive = false;
            engine.destroy_body(self.body);
            log::info!("Player killed");
        }
    }

    /// Remove the body without a death
    pub fn despawn<E: PhysicsEngine>(self, engine: &mut E) {
        if self.alive {
            engine.destroy_body(self.body);
        }
    }
}
