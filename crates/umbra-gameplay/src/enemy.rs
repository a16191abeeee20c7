//! Enemy perception and pursuit state machine.
//!
//! Each enemy is an [`EnemyAgent`] that runs one of three behaviors per tick:
//!
//! - **Wander**: roam between planned targets inside optional bounds
//! - **Chase**: pursue a visible target, sliding around walls when the line
//!   of sight is blocked
//! - **Search**: walk to the last known target position and wait there
//!
//! Search always resolves back to Wander. A target that reappears during the
//! search is ignored until the agent is wandering again.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use umbra_common::steering::{blend_heading, direction_to};
use umbra_common::EntityId;

use crate::debug::{AiObserver, NullObserver, WanderPlanKind};
use crate::events::{notify, EventSender, GameEvent};
use crate::sensor::{RayFanSensor, SensorConfig};
use crate::target::TargetStatus;
use crate::wall_nav::{WallNavConfig, WallNavigator};
use crate::wander::{RoamBounds, StuckTracker, StuckVerdict, WanderConfig, WanderPlan, WanderPlanner};
use crate::world::{LayerMask, WorldQuery};

/// Behavior state of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// Roaming between random targets
    #[default]
    Wander,
    /// Pursuing a visible target
    Chase,
    /// Checking the last known target position
    Search,
}

impl fmt::Display for EnemyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wander => "wander",
            Self::Chase => "chase",
            Self::Search => "search",
        };
        f.write_str(name)
    }
}

/// Tunables for one enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Movement speed while wandering
    pub wander_speed: f32,
    /// Movement speed while chasing
    pub chase_speed: f32,
    /// Movement speed while searching
    pub search_speed: f32,
    /// Distance at which a visible target is noticed
    pub aggro_range: f32,
    /// Distance at which a chase is abandoned
    pub lose_range: f32,
    /// Seconds spent at the last known position before giving up
    pub search_duration: f32,
    /// Distance at which a destination counts as reached
    pub arrival_radius: f32,
    /// Layers that block line of sight
    pub sight_mask: LayerMask,
    /// Obstacle sensor settings
    pub sensor: SensorConfig,
    /// Wall navigator settings
    pub wall_nav: WallNavConfig,
    /// Wander planner and stuck detection settings
    pub wander: WanderConfig,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            wander_speed: 2.0,
            chase_speed: 3.2,
            search_speed: 3.2,
            aggro_range: 4.0,
            lose_range: 6.0,
            search_duration: 3.0,
            arrival_radius: 0.2,
            sight_mask: LayerMask::OBSTACLES,
            sensor: SensorConfig::default(),
            wall_nav: WallNavConfig::default(),
            wander: WanderConfig::default(),
        }
    }
}

/// Physics-side handle of an agent.
///
/// The AI reads the position once per tick and hands back the desired new
/// position; collision resolution is up to the implementor.
pub trait AgentBody {
    /// Current position.
    fn position(&self) -> Vec2;

    /// Requests a move to `position`.
    fn move_position(&mut self, position: Vec2);
}

impl AgentBody for Vec2 {
    fn position(&self) -> Vec2 {
        *self
    }

    fn move_position(&mut self, position: Vec2) {
        *self = position;
    }
}

/// Summary of one agent tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// State before the tick
    pub previous: EnemyState,
    /// State after the tick
    pub state: EnemyState,
    /// Movement requested this tick
    pub delta: Vec2,
}

impl TickReport {
    /// Checks whether the tick changed state.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

/// One enemy's AI.
pub struct EnemyAgent {
    id: EntityId,
    config: EnemyConfig,
    state: EnemyState,
    wander_target: Vec2,
    last_known_target_pos: Option<Vec2>,
    search_timer: f32,
    heading: Vec2,
    stuck: StuckTracker,
    roam_bounds: Option<RoamBounds>,
    rng: fastrand::Rng,
    sensor: RayFanSensor,
    navigator: WallNavigator,
    planner: WanderPlanner,
    observer: Option<Box<dyn AiObserver>>,
    events: Option<EventSender>,
}

impl fmt::Debug for EnemyAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnemyAgent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("wander_target", &self.wander_target)
            .field("last_known_target_pos", &self.last_known_target_pos)
            .field("search_timer", &self.search_timer)
            .field("stuck", &self.stuck)
            .field("roam_bounds", &self.roam_bounds)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl EnemyAgent {
    /// Creates an agent spawned at `spawn`.
    ///
    /// `seed` drives wander sampling. The first Wander tick plans a target.
    #[must_use]
    pub fn new(id: EntityId, config: EnemyConfig, spawn: Vec2, seed: u64) -> Self {
        Self {
            id,
            config,
            state: EnemyState::Wander,
            wander_target: spawn,
            last_known_target_pos: None,
            search_timer: 0.0,
            heading: Vec2::NEG_Y,
            stuck: StuckTracker::new(spawn),
            roam_bounds: None,
            rng: fastrand::Rng::with_seed(seed),
            sensor: RayFanSensor::new(config.sensor),
            navigator: WallNavigator::new(config.wall_nav),
            planner: WanderPlanner::new(config.wander),
            observer: None,
            events: None,
        }
    }

    /// Restricts wandering to `bounds`.
    #[must_use]
    pub fn with_roam_bounds(mut self, bounds: RoamBounds) -> Self {
        self.roam_bounds = Some(bounds);
        self
    }

    /// Attaches a debug observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn AiObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Publishes state changes to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Replaces or clears the state-change channel.
    pub fn set_events(&mut self, sender: Option<EventSender>) {
        self.events = sender;
    }

    /// Replaces or clears the roam bounds.
    pub fn set_roam_bounds(&mut self, bounds: Option<RoamBounds>) {
        self.roam_bounds = bounds;
    }

    /// Detaches and returns the debug observer.
    pub fn take_observer(&mut self) -> Option<Box<dyn AiObserver>> {
        self.observer.take()
    }

    /// Returns the agent id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EnemyConfig {
        &self.config
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> EnemyState {
        self.state
    }

    /// Returns the current wander destination.
    #[must_use]
    pub const fn wander_target(&self) -> Vec2 {
        self.wander_target
    }

    /// Returns the last position the target was seen at while chasing.
    #[must_use]
    pub const fn last_known_target_pos(&self) -> Option<Vec2> {
        self.last_known_target_pos
    }

    /// Returns the remaining search time (zero outside Search).
    #[must_use]
    pub const fn search_timer(&self) -> f32 {
        self.search_timer
    }

    /// Returns the last movement direction.
    #[must_use]
    pub const fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Returns the roam bounds, if any.
    #[must_use]
    pub const fn roam_bounds(&self) -> Option<&RoamBounds> {
        self.roam_bounds.as_ref()
    }

    /// Returns the stuck tracker.
    #[must_use]
    pub const fn stuck(&self) -> &StuckTracker {
        &self.stuck
    }

    /// Runs one simulation tick.
    ///
    /// `target` is `None` when there is nothing to pursue; the agent then
    /// wanders. Never panics and never fails.
    pub fn update<W, B>(
        &mut self,
        dt: f32,
        world: &W,
        body: &mut B,
        target: Option<&TargetStatus>,
    ) -> TickReport
    where
        W: WorldQuery + ?Sized,
        B: AgentBody + ?Sized,
    {
        let dt = dt.max(0.0);
        let position = body.position();
        let previous = self.state;

        let mut attached = self.observer.take();
        let mut null = NullObserver;
        let observer: &mut dyn AiObserver = match attached.as_deref_mut() {
            Some(observer) => observer,
            None => &mut null,
        };

        self.perceive(world, position, target, observer);

        let (direction, goal) = match self.state {
            EnemyState::Wander => self.wander_step(world, position, dt, observer),
            EnemyState::Chase => {
                let goal = self.last_known_target_pos.unwrap_or(position);
                (self.pursue(world, position, goal, observer), Some(goal))
            },
            EnemyState::Search => self.search_step(world, position, dt, observer),
        };

        let speed = match self.state {
            EnemyState::Wander => self.config.wander_speed,
            EnemyState::Chase => self.config.chase_speed,
            EnemyState::Search => self.config.search_speed,
        };

        // Never step past the destination.
        let mut step = speed * dt;
        if let Some(goal) = goal {
            step = step.min(position.distance(goal));
        }
        let delta = direction * step;
        if delta != Vec2::ZERO {
            body.move_position(position + delta);
            self.heading = direction;
        }

        self.observer = attached;

        TickReport {
            previous,
            state: self.state,
            delta,
        }
    }

    /// Applies perception-driven transitions for this tick.
    fn perceive<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        position: Vec2,
        target: Option<&TargetStatus>,
        observer: &mut dyn AiObserver,
    ) {
        let Some(target) = target else {
            if self.state != EnemyState::Wander {
                self.enter_wander(world, position, observer);
            }
            return;
        };

        let distance = position.distance(target.position);
        let concealed = target.is_concealed();

        match self.state {
            EnemyState::Wander => {
                if !concealed && distance <= self.config.aggro_range {
                    self.last_known_target_pos = Some(target.position);
                    self.transition(EnemyState::Chase, observer);
                }
            },
            EnemyState::Chase => {
                if distance >= self.config.lose_range {
                    self.enter_wander(world, position, observer);
                } else if concealed {
                    self.search_timer = self.config.search_duration.max(0.0);
                    self.transition(EnemyState::Search, observer);
                } else {
                    self.last_known_target_pos = Some(target.position);
                }
            },
            EnemyState::Search => {},
        }
    }

    fn wander_step<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        position: Vec2,
        dt: f32,
        observer: &mut dyn AiObserver,
    ) -> (Vec2, Option<Vec2>) {
        if position.distance(self.wander_target) <= self.config.arrival_radius {
            self.stuck.on_target_reached();
            let plan = self.plan_wander(world, position);
            self.apply_plan(plan, observer);
        }

        match self.stuck.update(position, dt, &self.config.wander) {
            StuckVerdict::Moving => {},
            StuckVerdict::Repick => {
                observer.on_stuck(self.id, self.stuck.retry_count());
                debug!("{} stuck at {position}, re-planning", self.id);
                let plan = self.plan_wander(world, position);
                self.apply_plan(plan, observer);
            },
            StuckVerdict::Emergency => {
                observer.on_stuck(self.id, self.config.wander.max_stuck_retries);
                info!("{} repeatedly stuck at {position}, using emergency target", self.id);
                let bounds = self.roam_bounds.as_ref();
                let plan = self.planner.pick_emergency_target(world, position, bounds);
                self.apply_plan(plan, observer);
            },
        }

        let desired = direction_to(position, self.wander_target);
        if desired == Vec2::ZERO {
            return (Vec2::ZERO, Some(self.wander_target));
        }
        let avoid = self.sensor.sense(world, position, desired, observer);
        (blend_heading(desired, avoid), Some(self.wander_target))
    }

    fn search_step<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        position: Vec2,
        dt: f32,
        observer: &mut dyn AiObserver,
    ) -> (Vec2, Option<Vec2>) {
        let goal = self.last_known_target_pos.unwrap_or(position);

        if position.distance(goal) > self.config.arrival_radius {
            return (self.pursue(world, position, goal, observer), Some(goal));
        }

        self.search_timer = (self.search_timer - dt).max(0.0);
        trace!("{} searching, {:.2}s left", self.id, self.search_timer);
        if self.search_timer <= 0.0 {
            self.enter_wander(world, position, observer);
        }
        (Vec2::ZERO, None)
    }

    /// Steers toward `goal`, sliding along walls that block the view.
    fn pursue<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        position: Vec2,
        goal: Vec2,
        observer: &mut dyn AiObserver,
    ) -> Vec2 {
        let to_goal = direction_to(position, goal);
        if to_goal == Vec2::ZERO {
            return Vec2::ZERO;
        }

        let sight = world.linecast(position, goal, self.config.sight_mask);
        observer.on_ray(position, to_goal, position.distance(goal), sight.as_ref());

        match sight {
            None => {
                let avoid = self.sensor.sense(world, position, to_goal, observer);
                blend_heading(to_goal, avoid)
            },
            Some(wall_hit) => {
                let steer = self.navigator.navigate_around_wall(
                    world,
                    &self.sensor,
                    position,
                    to_goal,
                    &wall_hit,
                    observer,
                );
                trace!("{} navigating around wall: {:?}", self.id, steer.mode);
                steer.direction
            },
        }
    }

    fn enter_wander<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        position: Vec2,
        observer: &mut dyn AiObserver,
    ) {
        self.search_timer = 0.0;
        self.stuck.rebase(position);
        self.transition(EnemyState::Wander, observer);
        let plan = self.plan_wander(world, position);
        self.apply_plan(plan, observer);
    }

    fn plan_wander<W: WorldQuery + ?Sized>(&mut self, world: &W, position: Vec2) -> WanderPlan {
        self.planner
            .pick_wander_target(world, &mut self.rng, position, self.roam_bounds.as_ref())
    }

    fn apply_plan(&mut self, plan: WanderPlan, observer: &mut dyn AiObserver) {
        self.wander_target = plan.target;
        if plan.kind != WanderPlanKind::Normal {
            debug!("{} wander target {} ({:?})", self.id, plan.target, plan.kind);
        }
        observer.on_wander_target(self.id, plan.target, plan.kind);
    }

    fn transition(&mut self, to: EnemyState, observer: &mut dyn AiObserver) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!("{} {from} -> {to}", self.id);
        observer.on_state_changed(self.id, from, to);
        notify(
            self.events.as_ref(),
            GameEvent::EnemyStateChanged {
                agent: self.id,
                from,
                to,
            },
        );
    }
}
