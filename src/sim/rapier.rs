//! Rapier-backed physics engine
//!
//! Wraps the rapier2d pipeline behind `PhysicsEngine`. Contacts of watched
//! bodies are read from the narrow phase after every step and diffed
//! against the previous step into Begin / Persist / End events.

use std::collections::BTreeMap;

use glam::Vec2;
use rapier2d::prelude::*;

use super::physics::{
    BodyDef, BodyHandle, BodyKind, BodyProfile, ContactEvent, ContactPhase, FixtureShape,
    PhysicsEngine,
};
use crate::consts::GRAVITY;

fn vec2_to_na(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn na_to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Contacts of one watched body, keyed by the other collider
type Touching = BTreeMap<(u32, u32), ContactEvent>;

pub struct RapierWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    next_id: u32,
    handles: BTreeMap<BodyHandle, RigidBodyHandle>,
    watched: BTreeMap<BodyHandle, Touching>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, GRAVITY))
    }
}

impl RapierWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            next_id: 0,
            handles: BTreeMap::new(),
            watched: BTreeMap::new(),
        }
    }

    pub fn body_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of colliders attached to `body`
    pub fn collider_count(&self, body: BodyHandle) -> usize {
        self.rigid_body(body).map_or(0, |rb| rb.colliders().len())
    }

    fn rigid_body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(*self.handles.get(&body)?)
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        match self.handles.get(&body) {
            Some(&handle) => self.bodies.get_mut(handle),
            None => {
                log::trace!("ignoring call on unknown body {body:?}");
                None
            }
        }
    }

    /// Describe a contact between `body` and the collider `other`
    fn contact_event(
        &self,
        body: BodyHandle,
        other: ColliderHandle,
        normal: Vec2,
    ) -> Option<ContactEvent> {
        let collider = self.colliders.get(other)?;
        let parent = self.bodies.get(collider.parent()?)?;
        Some(ContactEvent {
            body,
            other: BodyHandle(parent.user_data as u32),
            other_kind: if parent.is_dynamic() {
                BodyKind::Dynamic
            } else {
                BodyKind::Static
            },
            other_sensor: collider.is_sensor(),
            normal,
            phase: ContactPhase::Begin,
        })
    }

    /// Everything `body` touches after the last step. Sensor overlaps
    /// carry a zero normal.
    fn touching(&self, body: BodyHandle, handle: RigidBodyHandle) -> Touching {
        let mut current = Touching::new();
        let Some(rb) = self.bodies.get(handle) else {
            return current;
        };
        for &own in rb.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(own) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let Some(manifold) = pair
                    .manifolds
                    .iter()
                    .find(|m| !m.data.solver_contacts.is_empty())
                else {
                    continue;
                };
                // manifold normals point from collider1 to collider2
                let (other, normal) = if pair.collider1 == own {
                    (pair.collider2, -na_to_vec2(&manifold.data.normal))
                } else {
                    (pair.collider1, na_to_vec2(&manifold.data.normal))
                };
                if let Some(event) = self.contact_event(body, other, normal) {
                    current.insert(other.into_raw_parts(), event);
                }
            }
            for (c1, c2, intersecting) in self.narrow_phase.intersection_pairs_with(own) {
                if !intersecting {
                    continue;
                }
                let other = if c1 == own { c2 } else { c1 };
                if let Some(event) = self.contact_event(body, other, Vec2::ZERO) {
                    current.insert(other.into_raw_parts(), event);
                }
            }
        }
        current
    }
}

impl PhysicsEngine for RapierWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let builder = match def.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let rb = builder
            .translation(vec2_to_na(def.position))
            .user_data(u128::from(handle.0))
            .build();
        let parent = self.bodies.insert(rb);

        for (i, fixture) in def.fixtures.iter().enumerate() {
            let builder = match &fixture.shape {
                FixtureShape::Circle { radius } => Some(ColliderBuilder::ball(*radius)),
                FixtureShape::Polygon(vertices) => {
                    let points: Vec<Point<Real>> =
                        vertices.iter().map(|v| point![v.x, v.y]).collect();
                    ColliderBuilder::convex_hull(&points)
                }
            };
            let Some(builder) = builder else {
                log::warn!("skipping degenerate fixture #{i} of body {handle:?}");
                continue;
            };
            let collider = builder
                .density(fixture.props.density)
                .friction(fixture.props.friction)
                .restitution(fixture.props.restitution)
                .sensor(fixture.sensor)
                .build();
            self.colliders
                .insert_with_parent(collider, parent, &mut self.bodies);
        }

        self.handles.insert(handle, parent);
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        self.watched.remove(&body);
        if let Some(handle) = self.handles.remove(&body) {
            self.bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn watch_contacts(&mut self, body: BodyHandle) {
        self.watched.entry(body).or_default();
    }

    fn step(&mut self, dt: f32, events: &mut Vec<ContactEvent>) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        // forces only last one step
        for (_, rb) in self.bodies.iter_mut() {
            if rb.is_dynamic() {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }

        let watched: Vec<BodyHandle> = self.watched.keys().copied().collect();
        for body in watched {
            let Some(&handle) = self.handles.get(&body) else {
                continue;
            };
            let current = self.touching(body, handle);
            let previous = self
                .watched
                .insert(body, current.clone())
                .unwrap_or_default();

            for (key, event) in &current {
                let phase = if previous.contains_key(key) {
                    ContactPhase::Persist
                } else {
                    ContactPhase::Begin
                };
                events.push(ContactEvent { phase, ..*event });
            }
            for (key, event) in previous {
                if !current.contains_key(&key) && self.handles.contains_key(&event.other) {
                    events.push(ContactEvent {
                        phase: ContactPhase::End,
                        ..event
                    });
                }
            }
        }
    }

    fn position(&self, body: BodyHandle) -> Vec2 {
        self.rigid_body(body)
            .map_or(Vec2::ZERO, |rb| na_to_vec2(rb.translation()))
    }

    fn angle(&self, body: BodyHandle) -> f32 {
        self.rigid_body(body).map_or(0.0, |rb| rb.rotation().angle())
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec2 {
        self.rigid_body(body)
            .map_or(Vec2::ZERO, |rb| na_to_vec2(rb.linvel()))
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_linvel(vec2_to_na(velocity), true);
        }
    }

    fn angular_velocity(&self, body: BodyHandle) -> f32 {
        self.rigid_body(body).map_or(0.0, |rb| rb.angvel())
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_angvel(omega, true);
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.add_force(vec2_to_na(force), true);
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.apply_impulse(vec2_to_na(impulse), true);
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: f32) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.add_torque(torque, true);
        }
    }

    fn apply_profile(&mut self, body: BodyHandle, profile: &BodyProfile) {
        let Some(rb) = self.rigid_body_mut(body) else {
            return;
        };
        rb.set_linear_damping(profile.linear_damping);
        rb.set_angular_damping(profile.angular_damping);
        rb.set_gravity_scale(profile.gravity_scale, true);
        rb.lock_rotations(profile.fixed_rotation, true);
        if profile.fixed_rotation {
            rb.set_angvel(0.0, true);
        }
        let fixtures = rb.colliders().to_vec();

        for handle in fixtures {
            let Some(collider) = self.colliders.get_mut(handle) else {
                continue;
            };
            if collider.shape().as_ball().is_some() {
                collider.set_shape(SharedShape::ball(profile.radius));
            }
            collider.set_restitution(profile.restitution);
        }
    }

    fn wake(&mut self, body: BodyHandle) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.wake_up(true);
        }
    }
}
