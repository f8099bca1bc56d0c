//! Per-tick simulation
//!
//! Runs every fixed step once a level is loaded:
//! - `contact`: floor and wall classification with expiring flags
//! - `player`: movement modes and locomotion
//! - `world`: INIT / GAME / VICTORY / DEFEAT
//! - `tick`: the `Game` orchestrator
//!
//! Rigid-body dynamics stay behind the `PhysicsEngine` trait, implemented
//! over rapier2d by `RapierWorld`.

pub mod contact;
#[cfg(test)]
pub(crate) mod headless;
pub mod physics;
pub mod player;
pub mod rapier;
pub mod tick;
pub mod world;

pub use contact::{ContactFlag, ContactState, Touch};
pub use physics::{
    BodyDef, BodyHandle, BodyKind, BodyProfile, ContactEvent, ContactPhase, FixtureDef,
    FixtureShape, PhysicsEngine,
};
pub use player::{MovementMode, Player};
pub use rapier::RapierWorld;
pub use tick::{DeathCause, Game, GameEvent, TickInput};
pub use world::{Transition, WorldState, WorldStateMachine};
