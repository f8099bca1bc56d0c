//! Fixed timestep simulation tick
//!
//! `Game` owns the engine, the loaded level and the player, and advances
//! them one step at a time:
//! 1. step the engine, collecting the player's contacts
//! 2. route contacts: hazards kill, goals feed the hold timer, terrain
//!    feeds the contact classifier
//! 3. expire stale contact flags
//! 4. apply locomotion (only while in GAME), then the fall check
//! 5. advance the world state machine

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{ContactEvent, ContactPhase, PhysicsEngine};
use super::player::{MovementMode, Player};
use super::world::{Transition, WorldState, WorldStateMachine};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::LevelError;
use crate::level::{Element, Level, LevelGeometry, StaticBodyRegistry, ZoneKind, assemble};
use crate::settings::Tuning;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Directional input, each axis in -1..=1
    pub movement: Vec2,
    /// Jump button held
    pub jump: bool,
    /// Requested movement mode
    pub mode: Option<MovementMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Dropped below the level
    Fell,
    Hazard,
}

/// Events emitted by a tick for audio, effects and UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    StateChanged { from: WorldState, to: WorldState },
    PlayerKilled { cause: DeathCause },
    ModeChanged(MovementMode),
    Jumped(Vec2),
}

impl From<Transition> for GameEvent {
    fn from(t: Transition) -> Self {
        GameEvent::StateChanged {
            from: t.from,
            to: t.to,
        }
    }
}

struct LoadedLevel {
    level: Level,
    geometry: LevelGeometry,
    bodies: StaticBodyRegistry,
    player: Player,
}

pub struct Game<E: PhysicsEngine> {
    engine: E,
    tuning: Tuning,
    world: WorldStateMachine,
    loaded: Option<LoadedLevel>,
    /// Simulated seconds since the level was loaded. Kept in f64 so
    /// fixed steps stay exact late into a level.
    time: f64,
    /// Unsimulated frame time
    accumulator: f32,
    contacts: Vec<ContactEvent>,
}

impl<E: PhysicsEngine> Game<E> {
    pub fn new(engine: E, tuning: Tuning) -> Self {
        let world = WorldStateMachine::new(tuning.rules.win_hold_time);
        Self {
            engine,
            tuning,
            world,
            loaded: None,
            time: 0.0,
            accumulator: 0.0,
            contacts: Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn state(&self) -> WorldState {
        self.world.state()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn level(&self) -> Option<&Level> {
        self.loaded.as_ref().map(|l| &l.level)
    }

    pub fn geometry(&self) -> Option<&LevelGeometry> {
        self.loaded.as_ref().map(|l| &l.geometry)
    }

    pub fn registry(&self) -> Option<&StaticBodyRegistry> {
        self.loaded.as_ref().map(|l| &l.bodies)
    }

    pub fn player(&self) -> Option<&Player> {
        self.loaded.as_ref().map(|l| &l.player)
    }

    /// Replace the current level. On error nothing is loaded.
    pub fn load_level(&mut self, document: &Element) -> Result<&Level, LevelError> {
        self.unload_level();

        let (level, geometry) = assemble(document, &self.tuning)?;
        let bodies = StaticBodyRegistry::instantiate(&level, &geometry, &mut self.engine);
        let player = Player::spawn(&mut self.engine, level.spawn, &self.tuning.player);
        self.time = 0.0;
        self.accumulator = 0.0;

        let loaded = self.loaded.insert(LoadedLevel {
            level,
            geometry,
            bodies,
            player,
        });
        Ok(&loaded.level)
    }

    /// Tear down the level's bodies and the player
    pub fn unload_level(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.player.despawn(&mut self.engine);
            loaded.bodies.dispose(&mut self.engine);
            log::info!("Level unloaded");
        }
        self.world.reset();
    }

    /// INIT → GAME; needs a loaded level
    pub fn start(&mut self) -> Option<Transition> {
        self.loaded.as_ref()?;
        self.world.start()
    }

    /// Run as many fixed steps as `frame_time` covers, capped at
    /// `MAX_SUBSTEPS`. Leftover time carries into the next frame.
    pub fn advance(&mut self, input: &TickInput, frame_time: f32) -> Vec<GameEvent> {
        self.accumulator += frame_time;
        let mut events = Vec::new();
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            events.extend(self.tick(input, SIM_DT));
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            // drop the backlog rather than spiral
            self.accumulator = 0.0;
        }
        events
    }

    /// Advance the simulation by one step of `dt` seconds
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(loaded) = self.loaded.as_mut() else {
            return events;
        };
        let tuning = &self.tuning.player;

        self.contacts.clear();
        self.engine.step(dt, &mut self.contacts);
        self.time += f64::from(dt);
        let now = self.time;
        let playing = self.world.state() == WorldState::Game;

        let player = &mut loaded.player;
        let body = player.body();
        for contact in self.contacts.iter().filter(|c| c.body == body) {
            match loaded.bodies.zone(contact.other) {
                Some(ZoneKind::Hazard) => {
                    if playing && contact.phase != ContactPhase::End && player.is_alive() {
                        player.kill(&mut self.engine);
                        events.push(GameEvent::PlayerKilled {
                            cause: DeathCause::Hazard,
                        });
                    }
                }
                Some(ZoneKind::Goal) => match contact.phase {
                    ContactPhase::End => self.world.goal_left(contact.other),
                    ContactPhase::Begin | ContactPhase::Persist => {
                        self.world.goal_entered(contact.other, now)
                    }
                },
                None => {
                    if let Some(touch) = player.contacts_mut().on_contact(contact, now) {
                        log::trace!("{touch:?} contact at {now:.3}");
                    }
                }
            }
        }
        player.contacts_mut().expire(now);

        if player.is_alive() {
            if playing {
                if let Some(mode) = input.mode {
                    if player.set_mode(&mut self.engine, mode, tuning) {
                        events.push(GameEvent::ModeChanged(mode));
                    }
                }
                if let Some(impulse) = player.drive(&mut self.engine, input, now, tuning) {
                    events.push(GameEvent::Jumped(impulse));
                }
            } else {
                player.idle(&mut self.engine);
            }

            if player.is_below(&self.engine, loaded.level.lower_bound(), tuning) {
                player.kill(&mut self.engine);
                events.push(GameEvent::PlayerKilled {
                    cause: DeathCause::Fell,
                });
            }
        }

        if !player.is_alive() {
            events.extend(self.world.player_died().map(GameEvent::from));
        }
        events.extend(self.world.update(now).map(GameEvent::from));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::fixtures::sample_document;
    use crate::sim::headless::HeadlessWorld;
    use crate::sim::physics::{BodyHandle, BodyKind};

    fn loaded_game() -> Game<HeadlessWorld> {
        let mut game = Game::new(HeadlessWorld::default(), Tuning::default());
        game.load_level(&sample_document()).unwrap();
        game
    }

    fn player_body(game: &Game<HeadlessWorld>) -> BodyHandle {
        game.player().unwrap().body()
    }

    fn zone(game: &Game<HeadlessWorld>, kind: ZoneKind) -> BodyHandle {
        game.registry()
            .unwrap()
            .zones()
            .find(|(_, k)| *k == kind)
            .map(|(h, _)| h)
            .unwrap()
    }

    fn inject(game: &mut Game<HeadlessWorld>, other: BodyHandle, sensor: bool, phase: ContactPhase) {
        let body = player_body(game);
        game.engine_mut().inject_contact(ContactEvent {
            body,
            other,
            other_kind: BodyKind::Static,
            other_sensor: sensor,
            normal: Vec2::Y,
            phase,
        });
    }

    #[test]
    fn test_load_spawns_player_at_spawn() {
        let game = loaded_game();
        assert_eq!(game.state(), WorldState::Init);
        let spawn = game.level().unwrap().spawn;
        assert_eq!(game.engine().position(player_body(&game)), spawn);
        // 3 terrain + 2 zones + player
        assert_eq!(game.engine().body_count(), 6);
        assert_eq!(game.geometry().unwrap().bodies.len(), 3);
    }

    #[test]
    fn test_no_level_no_tick() {
        let mut game = Game::new(HeadlessWorld::default(), Tuning::default());
        assert!(game.tick(&TickInput::default(), SIM_DT).is_empty());
        assert_eq!(game.start(), None);
        assert_eq!(game.time(), 0.0);
    }

    #[test]
    fn test_no_control_before_start() {
        let mut game = loaded_game();
        let body = player_body(&game);
        game.engine_mut().set_angular_velocity(body, 3.0);
        let input = TickInput {
            movement: Vec2::X,
            mode: Some(MovementMode::Gliding),
            ..Default::default()
        };
        assert!(game.tick(&input, SIM_DT).is_empty());
        assert_eq!(game.engine().angular_velocity(body), 0.0);
        assert_eq!(game.player().unwrap().mode(), MovementMode::Rolling);
    }

    #[test]
    fn test_falling_out_is_defeat() {
        let mut game = loaded_game();
        game.start();
        let body = player_body(&game);
        // rolling radius 0.45, lowest point at -0.01
        game.engine_mut().set_position(body, Vec2::new(10.0, 0.44));
        let events = game.tick(&TickInput::default(), SIM_DT);
        assert_eq!(
            events,
            vec![
                GameEvent::PlayerKilled {
                    cause: DeathCause::Fell
                },
                GameEvent::StateChanged {
                    from: WorldState::Game,
                    to: WorldState::Defeat
                },
            ]
        );
        assert!(!game.player().unwrap().is_alive());
        assert_eq!(game.engine().body_count(), 5);

        // nothing more happens
        assert!(game.tick(&TickInput::default(), SIM_DT).is_empty());
    }

    #[test]
    fn test_hazard_contact_is_defeat() {
        let mut game = loaded_game();
        game.start();
        let hazard = zone(&game, ZoneKind::Hazard);
        inject(&mut game, hazard, true, ContactPhase::Begin);
        let events = game.tick(&TickInput::default(), SIM_DT);
        assert_eq!(
            events[0],
            GameEvent::PlayerKilled {
                cause: DeathCause::Hazard
            }
        );
        assert_eq!(game.state(), WorldState::Defeat);
    }

    #[test]
    fn test_goal_hold_is_victory() {
        let mut game = loaded_game();
        game.start();
        let goal = zone(&game, ZoneKind::Goal);
        let idle = TickInput::default();

        // 0.25 s steps keep the clock exact
        inject(&mut game, goal, true, ContactPhase::Begin);
        assert!(game.tick(&idle, 0.25).is_empty());
        for _ in 0..3 {
            assert!(game.tick(&idle, 0.25).is_empty());
        }
        let events = game.tick(&idle, 0.25);
        assert_eq!(
            events,
            vec![GameEvent::StateChanged {
                from: WorldState::Game,
                to: WorldState::Victory
            }]
        );
        assert!(game.tick(&idle, 0.25).is_empty());
    }

    #[test]
    fn test_goal_release_restarts_hold() {
        let mut game = loaded_game();
        game.start();
        let goal = zone(&game, ZoneKind::Goal);
        let idle = TickInput::default();

        inject(&mut game, goal, true, ContactPhase::Begin);
        game.tick(&idle, 0.25);
        game.tick(&idle, 0.25);
        inject(&mut game, goal, true, ContactPhase::End);
        game.tick(&idle, 0.25);
        inject(&mut game, goal, true, ContactPhase::Begin);
        game.tick(&idle, 0.25);
        for _ in 0..3 {
            game.tick(&idle, 0.25);
        }
        assert_eq!(game.state(), WorldState::Game);
        game.tick(&idle, 0.25);
        assert_eq!(game.state(), WorldState::Victory);
    }

    #[test]
    fn test_mode_change_and_jump_events() {
        let mut game = loaded_game();
        game.start();
        let floor = game.registry().unwrap().terrain()[1];

        inject(&mut game, floor, false, ContactPhase::Begin);
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        let events = game.tick(&jump, SIM_DT);
        assert_eq!(events, vec![GameEvent::Jumped(Vec2::new(0.0, 4.0))]);

        let glide = TickInput {
            mode: Some(MovementMode::Tumbling),
            ..Default::default()
        };
        let events = game.tick(&glide, SIM_DT);
        assert_eq!(events, vec![GameEvent::ModeChanged(MovementMode::Tumbling)]);
        assert!(game.tick(&glide, SIM_DT).is_empty());
    }

    #[test]
    fn test_unload_and_failed_load() {
        let mut game = loaded_game();
        game.unload_level();
        assert!(game.level().is_none());
        assert_eq!(game.engine().body_count(), 0);

        game.load_level(&sample_document()).unwrap();
        let broken = Element::new("svg").with_attr("viewBox", "0 0 1 1");
        assert!(game.load_level(&broken).is_err());
        assert!(game.level().is_none());
        assert_eq!(game.engine().body_count(), 0);
        assert_eq!(game.state(), WorldState::Init);
    }

    #[test]
    fn test_advance_caps_substeps() {
        let mut game = loaded_game();
        game.advance(&TickInput::default(), 1.0);
        let capped = f64::from(MAX_SUBSTEPS) * f64::from(SIM_DT);
        assert!((game.time() - capped).abs() < 1e-9);

        let before = game.time();
        game.advance(&TickInput::default(), SIM_DT * 0.5);
        assert_eq!(game.time(), before);
        game.advance(&TickInput::default(), SIM_DT * 0.6);
        assert!(game.time() > before);
    }

    fn floating_game() -> Game<HeadlessWorld> {
        let mut game = Game::new(HeadlessWorld::new(Vec2::ZERO), Tuning::default());
        game.load_level(&sample_document()).unwrap();
        game
    }

    #[test]
    fn test_contact_ttl_does_not_drift_with_level_time() {
        let idle = TickInput::default();
        for warmup in [0, 37, 600] {
            let mut game = floating_game();
            for _ in 0..warmup {
                game.tick(&idle, SIM_DT);
            }
            let floor = game.registry().unwrap().terrain()[1];
            inject(&mut game, floor, false, ContactPhase::Begin);
            game.tick(&idle, SIM_DT);

            // 0.2 s is twelve 60 Hz steps
            for step in 1..12 {
                game.tick(&idle, SIM_DT);
                assert!(
                    game.player().unwrap().contacts().on_floor(),
                    "warmup {warmup}: floor lost after {step} steps"
                );
            }
            game.tick(&idle, SIM_DT);
            assert!(
                !game.player().unwrap().contacts().on_floor(),
                "warmup {warmup}: floor kept past the ttl"
            );
        }
    }

    #[test]
    fn test_goal_hold_does_not_drift_with_level_time() {
        let idle = TickInput::default();
        let mut game = floating_game();
        game.start();
        for _ in 0..17_999 {
            game.tick(&idle, SIM_DT);
        }
        assert_eq!(game.state(), WorldState::Game);

        let goal = zone(&game, ZoneKind::Goal);
        inject(&mut game, goal, true, ContactPhase::Begin);
        game.tick(&idle, SIM_DT);
        for step in 1..60 {
            assert!(game.tick(&idle, SIM_DT).is_empty(), "early victory at step {step}");
        }
        assert_eq!(
            game.tick(&idle, SIM_DT),
            vec![GameEvent::StateChanged {
                from: WorldState::Game,
                to: WorldState::Victory
            }]
        );
    }
}
