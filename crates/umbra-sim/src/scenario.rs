//! Fixed-timestep scenario runner.
//!
//! Wires a loaded level into the gameplay systems and steps them together:
//! the scripted player walks its route and hides at spots, the hide
//! controller counts down, every enemy ticks against the player's status,
//! and progression events are fed to the puzzle.

use std::collections::HashMap;

use glam::Vec2;
use tracing::{debug, info};
use umbra_common::{EntityId, SpotId};
use umbra_gameplay::enemy::EnemyState;
use umbra_gameplay::events::{EventBus, GameEvent};
use umbra_gameplay::hide::{HideAction, HideController};
use umbra_gameplay::hide_spot::HideSpotRegistry;
use umbra_gameplay::puzzle::SequencePuzzle;
use umbra_gameplay::roster::{AgentStorage, EnemyRoster};
use umbra_gameplay::target::TargetStatus;
use umbra_gameplay::world::{LayerMask, ObstacleWorld, WorldQuery};

use crate::config::SimConfig;
use crate::level::{LevelDefinition, LevelLoadResult};

/// Distance at which the scripted player counts a waypoint as reached.
const WAYPOINT_RADIUS: f32 = 0.05;

/// Moves a disc from `from` toward `to`, sliding along blocked axes.
pub fn resolve_move<W: WorldQuery + ?Sized>(world: &W, from: Vec2, to: Vec2, radius: f32) -> Vec2 {
    let mask = LayerMask::OBSTACLES;
    if !world.overlap_circle(to, radius, mask) {
        return to;
    }

    let slide_x = Vec2::new(to.x, from.y);
    if !world.overlap_circle(slide_x, radius, mask) {
        return slide_x;
    }
    let slide_y = Vec2::new(from.x, to.y);
    if !world.overlap_circle(slide_y, radius, mask) {
        return slide_y;
    }
    from
}

/// Enemy positions with disc collision against the level.
struct Bodies<'a> {
    positions: &'a mut HashMap<EntityId, Vec2>,
    world: &'a ObstacleWorld,
    radius: f32,
}

impl AgentStorage for Bodies<'_> {
    fn position(&self, agent: EntityId) -> Option<Vec2> {
        self.positions.get(&agent).copied()
    }

    fn move_position(&mut self, agent: EntityId, position: Vec2) {
        let from = self.positions.get(&agent).copied().unwrap_or(position);
        let resolved = resolve_move(self.world, from, position, self.radius);
        self.positions.insert(agent, resolved);
    }
}

/// Scripted player: walks a route and hides at spots along it.
#[derive(Debug)]
struct PlayerRig {
    position: Vec2,
    facing: Vec2,
    hide: HideController,
    route: Vec<Vec2>,
    next_waypoint: usize,
    in_trigger: Option<SpotId>,
}

impl PlayerRig {
    fn step(&mut self, dt: f32, world: &ObstacleWorld, spots: &mut HideSpotRegistry, config: &SimConfig) {
        if self.hide.is_hidden() {
            if let Some(report) = self.hide.update(dt, spots) {
                if let Some(exit) = report.exit_point {
                    self.position = exit;
                }
                if let Some(look) = report.look_dir {
                    self.facing = look;
                }
                self.in_trigger = spots.spot_at(self.position);
            }
            return;
        }

        let here = spots.spot_at(self.position);
        if here != self.in_trigger {
            if let Some(previous) = self.in_trigger {
                self.hide.clear_nearby_spot(previous);
            }
            if let Some(spot) = here {
                self.hide.set_nearby_spot(spot);
            }
            self.in_trigger = here;
        }

        let Some(&waypoint) = self.route.get(self.next_waypoint) else {
            return;
        };

        let distance = self.position.distance(waypoint);
        if distance <= WAYPOINT_RADIUS {
            self.next_waypoint += 1;
            let prompt = here
                .and_then(|id| spots.get(id))
                .is_some_and(|spot| spot.should_prompt(self.hide.can_enter()));
            if prompt {
                match self.hide.on_defend_input(spots, self.facing) {
                    Ok(HideAction::Hidden { spot, duration }) => {
                        debug!("Player hid in {spot} for {duration:.2}s");
                    },
                    Ok(HideAction::Exited(_)) => {},
                    Err(e) => debug!("Player could not hide: {e}"),
                }
            }
            return;
        }

        let direction = (waypoint - self.position) / distance;
        let target = self.position + direction * (config.player_speed * dt).min(distance);
        self.position = resolve_move(world, self.position, target, config.player_radius);
        self.facing = direction;
    }

    fn status(&self) -> TargetStatus {
        let hidden = self.hide.is_hidden();
        TargetStatus {
            position: self.position,
            active: true,
            visible: !hidden,
            collider_enabled: !hidden,
            hidden,
        }
    }
}

/// One recorded enemy state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Tick the change was observed on
    pub tick: u32,
    /// Enemy id
    pub agent: EntityId,
    /// Previous state
    pub from: EnemyState,
    /// New state
    pub to: EnemyState,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    /// Ticks simulated
    pub ticks: u32,
    /// Every enemy state change in order
    pub transitions: Vec<TransitionRecord>,
    /// Successful hides
    pub hides: u32,
    /// Whether the spot puzzle was solved
    pub puzzle_solved: bool,
    /// Whether the player ended hidden
    pub player_hidden: bool,
    /// Final player position
    pub player_position: Vec2,
    /// Final enemy states and positions in spawn order
    pub enemies: Vec<(EnemyState, Vec2)>,
}

/// A level running under the fixed-timestep loop.
#[derive(Debug)]
pub struct Scenario {
    config: SimConfig,
    world: ObstacleWorld,
    spots: HideSpotRegistry,
    puzzle: Option<SequencePuzzle>,
    roster: EnemyRoster,
    enemy_order: Vec<EntityId>,
    positions: HashMap<EntityId, Vec2>,
    player: PlayerRig,
    bus: EventBus,
    tick: u32,
    transitions: Vec<TransitionRecord>,
    hides: u32,
}

impl Scenario {
    /// Builds a scenario from a validated level.
    pub fn new(level: &LevelDefinition, config: SimConfig) -> LevelLoadResult<Self> {
        let bus = EventBus::new(config.event_capacity);

        let world = level.build_world();
        let mut spots = level.build_spots()?;
        spots.connect(&bus.sender());
        let puzzle = level.build_puzzle().map(|p| p.with_notifier(bus.sender()));

        let mut roster = EnemyRoster::with_seed(config.seed);
        let mut positions = HashMap::new();
        let mut enemy_order = Vec::with_capacity(level.enemies.len());
        for spawn in &level.enemies {
            let id = roster.spawn(&mut positions, config.enemy, spawn.position, spawn.roam);
            if let Some(agent) = roster.get_mut(id) {
                agent.set_events(Some(bus.sender()));
            }
            enemy_order.push(id);
        }

        let mut hide = HideController::new(EntityId::new(), config.hide);
        hide.equip(level.player.equipped);
        let player = PlayerRig {
            position: level.player.position,
            facing: Vec2::NEG_Y,
            hide,
            route: level.player.route.clone(),
            next_waypoint: 0,
            in_trigger: None,
        };

        info!(
            "Scenario '{}' ready: {} enemies, {} spots",
            level.name,
            roster.len(),
            spots.len()
        );

        Ok(Self {
            config,
            world,
            spots,
            puzzle,
            roster,
            enemy_order,
            positions,
            player,
            bus,
            tick: 0,
            transitions: Vec::new(),
            hides: 0,
        })
    }

    /// Returns the current tick.
    #[must_use]
    pub const fn tick(&self) -> u32 {
        self.tick
    }

    /// Returns the player's current status as the enemies see it.
    #[must_use]
    pub fn player_status(&self) -> TargetStatus {
        self.player.status()
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        let dt = self.config.dt();

        self.player.step(dt, &self.world, &mut self.spots, &self.config);
        let status = self.player.status();

        let mut bodies = Bodies {
            positions: &mut self.positions,
            world: &self.world,
            radius: self.config.enemy_radius,
        };
        self.roster.update_all(dt, &self.world, &mut bodies, Some(&status));

        self.pump_events();
        self.tick += 1;
    }

    /// Runs `ticks` ticks and summarizes the result.
    pub fn run(&mut self, ticks: u32) -> ScenarioReport {
        for _ in 0..ticks {
            self.step();
        }
        // Puzzle events published during the last tick.
        self.pump_events();

        let report = self.report();
        info!(
            "Ran {} ticks: {} transitions, {} hides, puzzle solved: {}",
            report.ticks,
            report.transitions.len(),
            report.hides,
            report.puzzle_solved
        );
        report
    }

    /// Summarizes the current state.
    #[must_use]
    pub fn report(&self) -> ScenarioReport {
        let enemies = self
            .enemy_order
            .iter()
            .filter_map(|id| {
                let agent = self.roster.get(*id)?;
                let position = self.positions.get(id).copied()?;
                Some((agent.state(), position))
            })
            .collect();

        ScenarioReport {
            ticks: self.tick,
            transitions: self.transitions.clone(),
            hides: self.hides,
            puzzle_solved: self.puzzle.as_ref().is_some_and(SequencePuzzle::is_solved),
            player_hidden: self.player.hide.is_hidden(),
            player_position: self.player.position,
            enemies,
        }
    }

    fn pump_events(&mut self) {
        let events = self.bus.drain();
        for event in &events {
            match *event {
                GameEvent::SpotEntered { .. } => self.hides += 1,
                GameEvent::EnemyStateChanged { agent, from, to } => {
                    self.transitions.push(TransitionRecord {
                        tick: self.tick,
                        agent,
                        from,
                        to,
                    });
                },
                GameEvent::PuzzleSolved => info!("Puzzle solved on tick {}", self.tick),
                _ => {},
            }
        }
        if let Some(puzzle) = self.puzzle.as_mut() {
            puzzle.consume(&events);
        }
    }
}
