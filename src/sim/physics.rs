//! Physics engine seam
//!
//! The simulation never integrates bodies itself. It describes bodies,
//! pushes forces and impulses, and reads back per-body contact events
//! through `PhysicsEngine`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::{ConvexShape, PhysicalProps};

/// Opaque engine body id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves, infinite mass
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FixtureShape {
    /// Convex, counter-clockwise, body-local
    Polygon(Vec<Vec2>),
    Circle { radius: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDef {
    pub shape: FixtureShape,
    pub props: PhysicalProps,
    /// Sensors report contacts but never collide
    pub sensor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub fixtures: Vec<FixtureDef>,
}

impl BodyDef {
    /// Static terrain body made of compiled convex shapes
    pub fn fixed(position: Vec2, shapes: &[ConvexShape]) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            fixtures: shapes
                .iter()
                .map(|s| FixtureDef {
                    shape: FixtureShape::Polygon(s.vertices.clone()),
                    props: s.props,
                    sensor: false,
                })
                .collect(),
        }
    }

    /// Static trigger volume
    pub fn sensor(position: Vec2, vertices: Vec<Vec2>) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            fixtures: vec![FixtureDef {
                shape: FixtureShape::Polygon(vertices),
                props: PhysicalProps::default(),
                sensor: true,
            }],
        }
    }

    pub fn ball(position: Vec2, radius: f32, props: PhysicalProps) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position,
            fixtures: vec![FixtureDef {
                shape: FixtureShape::Circle { radius },
                props,
                sensor: false,
            }],
        }
    }
}

/// Dynamic-body parameters swapped in as one unit (e.g. on a mode change).
/// `radius` resizes the body's circle fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub radius: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub fixed_rotation: bool,
    pub gravity_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Begin,
    /// Still touching this step
    Persist,
    End,
}

/// Contact as seen from a watched body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// The watched body
    pub body: BodyHandle,
    pub other: BodyHandle,
    pub other_kind: BodyKind,
    pub other_sensor: bool,
    /// Unit normal pointing from `other` into `body`
    pub normal: Vec2,
    pub phase: ContactPhase,
}

/// What the simulation needs from a rigid-body engine.
///
/// Calls naming an unknown body are ignored; queries on one return zero.
pub trait PhysicsEngine {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    fn destroy_body(&mut self, body: BodyHandle);

    /// Destroy several bodies as one batch
    fn destroy_bodies(&mut self, bodies: &[BodyHandle]) {
        for body in bodies {
            self.destroy_body(*body);
        }
    }

    /// Report contacts involving `body` from the next step on
    fn watch_contacts(&mut self, body: BodyHandle);

    /// Advance by `dt`, appending contact events of watched bodies
    fn step(&mut self, dt: f32, events: &mut Vec<ContactEvent>);

    fn position(&self, body: BodyHandle) -> Vec2;
    fn angle(&self, body: BodyHandle) -> f32;
    fn linear_velocity(&self, body: BodyHandle) -> Vec2;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2);
    fn angular_velocity(&self, body: BodyHandle) -> f32;
    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32);

    /// Continuous force, applied at the center of mass for the next step
    fn apply_force(&mut self, body: BodyHandle, force: Vec2);
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2);
    fn apply_torque(&mut self, body: BodyHandle, torque: f32);

    fn apply_profile(&mut self, body: BodyHandle, profile: &BodyProfile);
    fn wake(&mut self, body: BodyHandle);
}
