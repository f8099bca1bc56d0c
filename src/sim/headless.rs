//! Scripted physics engine for unit tests
//!
//! Explicit Euler integration of dynamic bodies under gravity, forces,
//! impulses and damping. There is no collision detection: contact events
//! are injected with `inject_contact` and delivered on the next `step`.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::physics::{
    BodyDef, BodyHandle, BodyKind, BodyProfile, ContactEvent, FixtureShape, PhysicsEngine,
};
use crate::consts::GRAVITY;
use crate::normalize_angle;

/// Body state as integrated by `HeadlessWorld`
#[derive(Debug, Clone)]
pub struct HeadlessBody {
    pub def: BodyDef,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    /// Force accumulated for the next step
    pub force: Vec2,
    pub torque: f32,
    pub profile: BodyProfile,
    pub awake: bool,
    /// Impulses applied since creation
    pub impulse_count: usize,
    pub last_impulse: Option<Vec2>,
    mass: f32,
    inertia: f32,
}

impl HeadlessBody {
    fn new(def: &BodyDef) -> Self {
        let radius = def
            .fixtures
            .iter()
            .find_map(|f| match f.shape {
                FixtureShape::Circle { radius } => Some(radius),
                FixtureShape::Polygon(_) => None,
            })
            .unwrap_or(0.0);
        let mut body = Self {
            def: def.clone(),
            position: def.position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            profile: BodyProfile {
                radius,
                restitution: def.fixtures.first().map_or(0.0, |f| f.props.restitution),
                linear_damping: 0.0,
                angular_damping: 0.0,
                fixed_rotation: false,
                gravity_scale: 1.0,
            },
            awake: true,
            impulse_count: 0,
            last_impulse: None,
            mass: 1.0,
            inertia: 1.0,
        };
        body.update_mass();
        body
    }

    /// Mass and rotational inertia from fixture densities
    fn update_mass(&mut self) {
        let mut mass = 0.0;
        let mut inertia = 0.0;
        for fixture in self.def.fixtures.iter().filter(|f| !f.sensor) {
            match &fixture.shape {
                FixtureShape::Circle { radius } => {
                    let m = fixture.props.density * std::f32::consts::PI * radius * radius;
                    mass += m;
                    inertia += 0.5 * m * radius * radius;
                }
                FixtureShape::Polygon(vertices) => {
                    let area = polygon_area(vertices);
                    let m = fixture.props.density * area;
                    mass += m;
                    // bounding-radius approximation is enough here
                    let r2 = vertices.iter().map(|v| v.length_squared()).fold(0.0, f32::max);
                    inertia += 0.5 * m * r2;
                }
            }
        }
        self.mass = if mass > 0.0 { mass } else { 1.0 };
        self.inertia = if inertia > 0.0 { inertia } else { 1.0 };
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn is_dynamic(&self) -> bool {
        self.def.kind == BodyKind::Dynamic
    }
}

fn polygon_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum::<f32>()
        .abs()
        / 2.0
}

/// Collision-free engine with scripted contacts
#[derive(Debug, Clone)]
pub struct HeadlessWorld {
    gravity: Vec2,
    next_id: u32,
    bodies: BTreeMap<BodyHandle, HeadlessBody>,
    watched: BTreeSet<BodyHandle>,
    injected: Vec<ContactEvent>,
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, GRAVITY))
    }
}

impl HeadlessWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            next_id: 0,
            bodies: BTreeMap::new(),
            watched: BTreeSet::new(),
            injected: Vec::new(),
        }
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&HeadlessBody> {
        self.bodies.get(&handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    /// Queue a contact for delivery on the next step
    pub fn inject_contact(&mut self, event: ContactEvent) {
        self.injected.push(event);
    }

    fn with_body(&mut self, handle: BodyHandle, f: impl FnOnce(&mut HeadlessBody)) {
        match self.bodies.get_mut(&handle) {
            Some(body) => f(body),
            None => log::trace!("ignoring call on unknown body {handle:?}"),
        }
    }
}

impl PhysicsEngine for HeadlessWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;
        self.bodies.insert(handle, HeadlessBody::new(def));
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.watched.remove(&body);
    }

    fn watch_contacts(&mut self, body: BodyHandle) {
        self.watched.insert(body);
    }

    fn step(&mut self, dt: f32, events: &mut Vec<ContactEvent>) {
        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            let p = body.profile;
            body.velocity += (self.gravity * p.gravity_scale + body.force / body.mass) * dt;
            body.velocity *= 1.0 / (1.0 + dt * p.linear_damping);
            if p.fixed_rotation {
                body.angular_velocity = 0.0;
            } else {
                body.angular_velocity += body.torque / body.inertia * dt;
                body.angular_velocity *= 1.0 / (1.0 + dt * p.angular_damping);
            }
            body.position += body.velocity * dt;
            body.angle = normalize_angle(body.angle + body.angular_velocity * dt);
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }

        let bodies = &self.bodies;
        let watched = &self.watched;
        events.extend(self.injected.drain(..).filter(|e| {
            watched.contains(&e.body) && bodies.contains_key(&e.body) && bodies.contains_key(&e.other)
        }));
    }

    fn position(&self, body: BodyHandle) -> Vec2 {
        self.bodies.get(&body).map_or(Vec2::ZERO, |b| b.position)
    }

    fn angle(&self, body: BodyHandle) -> f32 {
        self.bodies.get(&body).map_or(0.0, |b| b.angle)
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec2 {
        self.bodies.get(&body).map_or(Vec2::ZERO, |b| b.velocity)
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        self.with_body(body, |b| b.velocity = velocity);
    }

    fn angular_velocity(&self, body: BodyHandle) -> f32 {
        self.bodies.get(&body).map_or(0.0, |b| b.angular_velocity)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) {
        self.with_body(body, |b| b.angular_velocity = omega);
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        self.with_body(body, |b| {
            b.force += force;
            b.awake = true;
        });
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        self.with_body(body, |b| {
            b.velocity += impulse / b.mass;
            b.impulse_count += 1;
            b.last_impulse = Some(impulse);
            b.awake = true;
        });
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) {
        self.with_body(body, |b| {
            b.torque += torque;
            b.awake = true;
        });
    }

    fn apply_profile(&mut self, body: BodyHandle, profile: &BodyProfile) {
        self.with_body(body, |b| {
            for fixture in &mut b.def.fixtures {
                if let FixtureShape::Circle { radius } = &mut fixture.shape {
                    *radius = profile.radius;
                }
                fixture.props.restitution = profile.restitution;
            }
            b.profile = *profile;
            b.update_mass();
        });
    }

    fn wake(&mut self, body: BodyHandle) {
        self.with_body(body, |b| b.awake = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{ConvexShape, PhysicalProps};
    use crate::sim::physics::ContactPhase;

    fn ball(world: &mut HeadlessWorld) -> BodyHandle {
        world.create_body(&BodyDef::ball(Vec2::new(0.0, 10.0), 0.5, PhysicalProps::new(1.0, 0.0, 0.0)))
    }

    fn contact(body: BodyHandle, other: BodyHandle) -> ContactEvent {
        ContactEvent {
            body,
            other,
            other_kind: BodyKind::Static,
            other_sensor: false,
            normal: Vec2::Y,
            phase: ContactPhase::Begin,
        }
    }

    #[test]
    fn test_gravity_integration() {
        let mut world = HeadlessWorld::default();
        let b = ball(&mut world);
        let mut events = Vec::new();
        world.step(0.5, &mut events);
        assert!((world.linear_velocity(b).y - GRAVITY * 0.5).abs() < 1e-5);
        assert!(world.position(b).y < 10.0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_static_bodies_do_not_move() {
        let mut world = HeadlessWorld::default();
        let square = ConvexShape::new(
            vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
            PhysicalProps::default(),
        );
        let s = world.create_body(&BodyDef::fixed(Vec2::new(3.0, 3.0), &[square]));
        world.step(1.0, &mut Vec::new());
        assert_eq!(world.position(s), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn test_impulse_and_mass() {
        let mut world = HeadlessWorld::new(Vec2::ZERO);
        let b = ball(&mut world);
        let mass = world.body(b).unwrap().mass();
        assert!((mass - std::f32::consts::PI * 0.25).abs() < 1e-5);
        world.apply_impulse(b, Vec2::new(mass, 0.0));
        assert!((world.linear_velocity(b).x - 1.0).abs() < 1e-5);
        let body = world.body(b).unwrap();
        assert_eq!(body.impulse_count, 1);
        assert_eq!(body.last_impulse, Some(Vec2::new(mass, 0.0)));
    }

    #[test]
    fn test_profile_resizes_and_scales_gravity() {
        let mut world = HeadlessWorld::default();
        let b = ball(&mut world);
        world.apply_profile(
            b,
            &BodyProfile {
                radius: 0.1,
                restitution: 0.0,
                linear_damping: 0.0,
                angular_damping: 0.0,
                fixed_rotation: true,
                gravity_scale: 0.1,
            },
        );
        world.set_angular_velocity(b, 3.0);
        world.step(1.0, &mut Vec::new());
        assert!((world.linear_velocity(b).y - GRAVITY * 0.1).abs() < 1e-5);
        assert_eq!(world.angular_velocity(b), 0.0);
        assert_eq!(world.body(b).unwrap().profile.radius, 0.1);
    }

    #[test]
    fn test_injected_contacts_only_for_watched_bodies() {
        let mut world = HeadlessWorld::default();
        let a = ball(&mut world);
        let b = ball(&mut world);
        world.watch_contacts(a);
        world.inject_contact(contact(a, b));
        world.inject_contact(contact(b, a));
        let mut events = Vec::new();
        world.step(0.1, &mut events);
        assert_eq!(events, vec![contact(a, b)]);

        // queue is drained
        events.clear();
        world.step(0.1, &mut events);
        assert!(events.is_empty());

        world.destroy_body(b);
        world.inject_contact(contact(a, b));
        world.step(0.1, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_unknown_body_is_ignored() {
        let mut world = HeadlessWorld::default();
        world.apply_force(BodyHandle(99), Vec2::ONE);
        assert_eq!(world.position(BodyHandle(99)), Vec2::ZERO);
        assert_eq!(world.body_count(), 0);
    }
}
