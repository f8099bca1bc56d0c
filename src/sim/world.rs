//! World state machine
//!
//! INIT → GAME → VICTORY | DEFEAT. Victory needs continuous goal contact
//! for the hold time; every break in contact restarts the clock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::physics::BodyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorldState {
    /// Level loaded, waiting to start
    #[default]
    Init,
    Game,
    Victory,
    Defeat,
}

impl WorldState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorldState::Victory | WorldState::Defeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: WorldState,
    pub to: WorldState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateMachine {
    state: WorldState,
    hold_time: f32,
    /// Goal zones currently touched, with the clock reading when contact began
    goal_contacts: BTreeMap<BodyHandle, f64>,
}

impl WorldStateMachine {
    pub fn new(hold_time: f32) -> Self {
        Self {
            state: WorldState::Init,
            hold_time,
            goal_contacts: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    /// Back to INIT, forgetting goal contacts
    pub fn reset(&mut self) {
        self.state = WorldState::Init;
        self.goal_contacts.clear();
    }

    pub fn start(&mut self) -> Option<Transition> {
        self.transition(WorldState::Init, WorldState::Game)
    }

    /// Contact with a goal zone began (or persists; the first time wins)
    pub fn goal_entered(&mut self, zone: BodyHandle, now: f64) {
        self.goal_contacts.entry(zone).or_insert(now);
    }

    pub fn goal_left(&mut self, zone: BodyHandle) {
        self.goal_contacts.remove(&zone);
    }

    /// Player touched a hazard or died any other way
    pub fn player_died(&mut self) -> Option<Transition> {
        self.transition(WorldState::Game, WorldState::Defeat)
    }

    /// Check the goal hold timer
    pub fn update(&mut self, now: f64) -> Option<Transition> {
        let hold = f64::from(self.hold_time);
        let held = self.goal_contacts.values().any(|since| now - since >= hold);
        if held {
            self.transition(WorldState::Game, WorldState::Victory)
        } else {
            None
        }
    }

    fn transition(&mut self, from: WorldState, to: WorldState) -> Option<Transition> {
        if self.state != from {
            return None;
        }
        self.state = to;
        log::info!("World state {from:?} -> {to:?}");
        Some(Transition { from, to })
    }
}
