//! Static Body Registry
//!
//! Owns every engine body created for one level: terrain and trigger zone
//! sensors. They are created together and destroyed together.

use std::collections::BTreeMap;

use super::assembler::{Level, LevelGeometry, ZoneKind};
use super::geometry::{ConvexShape, PhysicalProps};
use crate::sim::physics::{BodyDef, BodyHandle, PhysicsEngine};

#[must_use = "level bodies leak unless the registry is disposed"]
#[derive(Debug, Default)]
pub struct StaticBodyRegistry {
    terrain: Vec<BodyHandle>,
    zones: BTreeMap<BodyHandle, ZoneKind>,
}

impl StaticBodyRegistry {
    /// Create the level's bodies in `engine`
    pub fn instantiate<E: PhysicsEngine>(
        level: &Level,
        geometry: &LevelGeometry,
        engine: &mut E,
    ) -> Self {
        let terrain = geometry
            .bodies
            .iter()
            .map(|b| engine.create_body(&BodyDef::fixed(b.origin, &b.shapes)))
            .collect();

        let zones = level
            .markers
            .zones()
            .map(|zone| {
                let origin = zone.corners[0];
                let local = zone.corners.iter().map(|c| *c - origin).collect();
                // mirrored markers arrive clockwise
                let outline = ConvexShape::new(local, PhysicalProps::default());
                let sensor = BodyDef::sensor(origin, outline.vertices);
                (engine.create_body(&sensor), zone.kind)
            })
            .collect();

        let registry = Self { terrain, zones };
        log::debug!(
            "Instantiated {} terrain bodies and {} zones",
            registry.terrain.len(),
            registry.zones.len()
        );
        registry
    }

    /// Which trigger zone a body is, if any
    pub fn zone(&self, body: BodyHandle) -> Option<ZoneKind> {
        self.zones.get(&body).copied()
    }

    /// Trigger zone bodies in handle order
    pub fn zones(&self) -> impl Iterator<Item = (BodyHandle, ZoneKind)> + '_ {
        self.zones.iter().map(|(h, k)| (*h, *k))
    }

    pub fn terrain(&self) -> &[BodyHandle] {
        &self.terrain
    }

    pub fn len(&self) -> usize {
        self.terrain.len() + self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every body in one batch
    pub fn dispose<E: PhysicsEngine>(mut self, engine: &mut E) {
        let mut handles = std::mem::take(&mut self.terrain);
        handles.extend(std::mem::take(&mut self.zones).into_keys());
        engine.destroy_bodies(&handles);
        log::debug!("Disposed {} level bodies", handles.len());
    }
}

impl Drop for StaticBodyRegistry {
    fn drop(&mut self) {
        if !self.is_empty() {
            log::warn!("StaticBodyRegistry dropped with {} live bodies", self.len());
        }
    }
}
