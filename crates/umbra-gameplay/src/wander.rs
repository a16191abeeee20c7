//! Wander target planning and stuck detection.
//!
//! The planner samples random destinations around the agent and validates
//! each against the roam bounds and the obstacle layer. The stuck tracker
//! watches per-tick movement and escalates to the emergency planner after
//! repeated idle periods.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::debug::WanderPlanKind;
use crate::world::{LayerMask, WorldQuery};

/// Number of compass directions tried by the emergency planner.
const EMERGENCY_DIRECTIONS: u32 = 8;

/// Area an agent is allowed to roam in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoamBounds {
    /// Disc around a center point
    Circle {
        /// Center of the roam area
        center: Vec2,
        /// Radius of the roam area
        radius: f32,
    },
    /// Axis-aligned box
    Rect {
        /// Minimum corner
        min: Vec2,
        /// Maximum corner
        max: Vec2,
    },
}

impl RoamBounds {
    /// Checks whether a point lies inside the bounds (edges included).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Self::Circle { center, radius } => point.distance_squared(center) <= radius * radius,
            Self::Rect { min, max } => point.cmpge(min).all() && point.cmple(max).all(),
        }
    }

    /// Returns the center of the bounds.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        match *self {
            Self::Circle { center, .. } => center,
            Self::Rect { min, max } => (min + max) * 0.5,
        }
    }
}

/// Configuration for wander planning and stuck detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WanderConfig {
    /// Shortest step toward a new target
    pub min_step: f32,
    /// Longest step toward a new target
    pub max_step: f32,
    /// Distance kept from a wall hit along the sampled direction
    pub wall_margin: f32,
    /// Shortest accepted distance to a target after backing off a wall
    pub min_travel: f32,
    /// Radius of the agent used for overlap checks
    pub footprint_radius: f32,
    /// Spacing between path samples
    pub path_sample_step: f32,
    /// Upper bound on path samples per candidate
    pub max_path_samples: u32,
    /// Candidates tried before falling back
    pub max_attempts: u32,
    /// Length of the unchecked fallback offset
    pub fallback_offset: f32,
    /// Per-tick movement below which the agent counts as idle
    pub movement_threshold: f32,
    /// Idle seconds before a stuck event fires
    pub stuck_check_time: f32,
    /// Stuck events before the emergency planner is used
    pub max_stuck_retries: u32,
    /// Layers treated as obstacles
    pub mask: LayerMask,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            min_step: 2.0,
            max_step: 6.0,
            wall_margin: 0.5,
            min_travel: 0.5,
            footprint_radius: 0.4,
            path_sample_step: 0.5,
            max_path_samples: 24,
            max_attempts: 30,
            fallback_offset: 1.0,
            movement_threshold: 0.02,
            stuck_check_time: 1.0,
            max_stuck_retries: 3,
            mask: LayerMask::OBSTACLES,
        }
    }
}

/// A planned wander destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderPlan {
    /// Destination point
    pub target: Vec2,
    /// How the destination was produced
    pub kind: WanderPlanKind,
}

/// Randomized roam-target planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct WanderPlanner {
    config: WanderConfig,
}

impl WanderPlanner {
    /// Creates a planner with the given configuration.
    #[must_use]
    pub const fn new(config: WanderConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WanderConfig {
        &self.config
    }

    /// Picks a validated random destination.
    ///
    /// Falls back to an unchecked offset from `position` when every attempt
    /// is rejected.
    pub fn pick_wander_target<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        rng: &mut fastrand::Rng,
        position: Vec2,
        bounds: Option<&RoamBounds>,
    ) -> WanderPlan {
        let cfg = &self.config;
        let span = (cfg.max_step - cfg.min_step).max(0.0);

        for _ in 0..cfg.max_attempts {
            let dir = Vec2::from_angle(rng.f32() * TAU);
            let step = cfg.min_step + rng.f32() * span;

            let candidate = match world.raycast(position, dir, step, cfg.mask) {
                Some(hit) => position + dir * (hit.distance - cfg.wall_margin).max(0.0),
                None => position + dir * step,
            };

            if candidate.distance(position) < cfg.min_travel {
                continue;
            }
            if bounds.is_some_and(|b| !b.contains(candidate)) {
                continue;
            }
            if world.overlap_circle(candidate, cfg.footprint_radius, cfg.mask) {
                continue;
            }
            if !self.path_is_clear(world, position, candidate) {
                continue;
            }

            return WanderPlan {
                target: candidate,
                kind: WanderPlanKind::Normal,
            };
        }

        let target = position + Vec2::from_angle(rng.f32() * TAU) * cfg.fallback_offset;
        warn!(
            "Wander planning exhausted {} attempts at {position}, using unchecked target {target}",
            cfg.max_attempts
        );
        WanderPlan {
            target,
            kind: WanderPlanKind::Fallback,
        }
    }

    /// Picks a destination along fixed compass directions.
    ///
    /// Used after repeated stuck events. Ends at the roam-bounds center, or
    /// the current position when unbounded, if no direction is usable.
    pub fn pick_emergency_target<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        position: Vec2,
        bounds: Option<&RoamBounds>,
    ) -> WanderPlan {
        let cfg = &self.config;
        let reach = cfg.max_step * 2.0;

        for i in 0..EMERGENCY_DIRECTIONS {
            let angle = (i as f32 * 45.0).to_radians();
            let candidate = position + Vec2::from_angle(angle) * reach;

            if bounds.is_some_and(|b| !b.contains(candidate)) {
                continue;
            }
            if world.overlap_circle(candidate, cfg.footprint_radius, cfg.mask) {
                continue;
            }

            debug!("Emergency wander target {candidate} (heading {}°)", i * 45);
            return WanderPlan {
                target: candidate,
                kind: WanderPlanKind::Emergency,
            };
        }

        let target = bounds.map_or(position, RoamBounds::center);
        debug!("Emergency wander found no open heading, using {target}");
        WanderPlan {
            target,
            kind: WanderPlanKind::Emergency,
        }
    }

    fn path_is_clear<W: WorldQuery + ?Sized>(&self, world: &W, from: Vec2, to: Vec2) -> bool {
        let cfg = &self.config;
        let distance = from.distance(to);
        if distance <= f32::EPSILON || cfg.path_sample_step <= 0.0 {
            return true;
        }

        let samples = ((distance / cfg.path_sample_step).ceil() as u32).clamp(1, cfg.max_path_samples.max(1));
        (1..=samples).all(|i| {
            let point = from.lerp(to, i as f32 / samples as f32);
            !world.overlap_circle(point, cfg.footprint_radius, cfg.mask)
        })
    }
}

/// Outcome of one stuck-tracker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckVerdict {
    /// Nothing to do
    Moving,
    /// Idle too long; pick a fresh wander target
    Repick,
    /// Idle too often; use the emergency planner
    Emergency,
}

/// Per-agent idle detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StuckTracker {
    last_pos: Vec2,
    stuck_timer: f32,
    retry_count: u32,
}

impl StuckTracker {
    /// Creates a tracker anchored at the agent's spawn position.
    #[must_use]
    pub const fn new(position: Vec2) -> Self {
        Self {
            last_pos: position,
            stuck_timer: 0.0,
            retry_count: 0,
        }
    }

    /// Advances the tracker by one tick.
    pub fn update(&mut self, position: Vec2, dt: f32, config: &WanderConfig) -> StuckVerdict {
        let moved = position.distance(self.last_pos);
        self.last_pos = position;

        if moved >= config.movement_threshold {
            self.stuck_timer = 0.0;
            return StuckVerdict::Moving;
        }

        self.stuck_timer += dt.max(0.0);
        if self.stuck_timer < config.stuck_check_time {
            return StuckVerdict::Moving;
        }

        self.stuck_timer = 0.0;
        self.retry_count += 1;
        if self.retry_count >= config.max_stuck_retries {
            self.retry_count = 0;
            StuckVerdict::Emergency
        } else {
            StuckVerdict::Repick
        }
    }

    /// Clears the retry counter after reaching a wander target.
    pub fn on_target_reached(&mut self) {
        self.retry_count = 0;
        self.stuck_timer = 0.0;
    }

    /// Re-anchors the tracker without counting the jump as movement.
    pub fn rebase(&mut self, position: Vec2) {
        self.last_pos = position;
        self.stuck_timer = 0.0;
    }

    /// Returns the number of stuck events since the last reset.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the accumulated idle time.
    #[must_use]
    pub const fn stuck_timer(&self) -> f32 {
        self.stuck_timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ObstacleWorld;
    use proptest::prelude::*;

    fn planner() -> WanderPlanner {
        WanderPlanner::new(WanderConfig {
            mask: LayerMask::ALL,
            ..WanderConfig::default()
        })
    }

    #[test]
    fn test_bounds_contains() {
        let circle = RoamBounds::Circle {
            center: Vec2::new(1.0, 1.0),
            radius: 2.0,
        };
        assert!(circle.contains(Vec2::new(3.0, 1.0)));
        assert!(!circle.contains(Vec2::new(3.1, 1.0)));
        assert_eq!(circle.center(), Vec2::new(1.0, 1.0));

        let rect = RoamBounds::Rect {
            min: Vec2::new(-2.0, 0.0),
            max: Vec2::new(2.0, 4.0),
        };
        assert!(rect.contains(Vec2::new(0.0, 4.0)));
        assert!(!rect.contains(Vec2::new(0.0, -0.1)));
        assert_eq!(rect.center(), Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_unbounded_empty_world_picks_normal_target() {
        let world = ObstacleWorld::new();
        let mut rng = fastrand::Rng::with_seed(7);
        let plan = planner().pick_wander_target(&world, &mut rng, Vec2::ZERO, None);

        assert_eq!(plan.kind, WanderPlanKind::Normal);
        let d = plan.target.length();
        assert!((2.0 - 1e-4..=6.0 + 1e-4).contains(&d));
    }

    #[test]
    fn test_candidates_avoid_obstacles() {
        let mut world = ObstacleWorld::new();
        world.add_rect(Vec2::new(1.0, -10.0), Vec2::new(3.0, 10.0));
        world.add_circle(Vec2::new(-3.0, 0.0), 1.0);

        let p = planner();
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..200 {
            let plan = p.pick_wander_target(&world, &mut rng, Vec2::ZERO, None);
            if plan.kind == WanderPlanKind::Normal {
                assert!(!world.overlap_circle(plan.target, 0.4, LayerMask::ALL));
                assert!(plan.target.x < 1.0, "target crossed the wall: {:?}", plan.target);
            }
        }
    }

    #[test]
    fn test_wall_inside_margin_never_yields_idle_target() {
        let mut world = ObstacleWorld::new();
        world.add_rect(Vec2::new(0.45, -5.0), Vec2::new(2.0, 5.0));

        let p = planner();
        for seed in 0..500 {
            let mut rng = fastrand::Rng::with_seed(seed);
            let plan = p.pick_wander_target(&world, &mut rng, Vec2::ZERO, None);
            if plan.kind == WanderPlanKind::Normal {
                assert!(
                    plan.target.length() >= 0.5,
                    "seed {seed} planned {:?} next to the agent",
                    plan.target
                );
            }
        }
    }

    #[test]
    fn test_exhausted_attempts_fall_back_to_small_offset() {
        let world = ObstacleWorld::new();
        // Bounds smaller than min_step reject every sampled candidate.
        let bounds = RoamBounds::Circle {
            center: Vec2::ZERO,
            radius: 0.5,
        };
        let mut rng = fastrand::Rng::with_seed(3);
        let plan = planner().pick_wander_target(&world, &mut rng, Vec2::ZERO, Some(&bounds));

        assert_eq!(plan.kind, WanderPlanKind::Fallback);
        assert!((plan.target.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_emergency_takes_first_open_heading() {
        let mut world = ObstacleWorld::new();
        let p = planner();

        let plan = p.pick_emergency_target(&world, Vec2::ZERO, None);
        assert_eq!(plan.kind, WanderPlanKind::Emergency);
        assert!((plan.target - Vec2::new(12.0, 0.0)).length() < 1e-4);

        // Block east; the 45 degree heading comes next.
        world.add_circle(Vec2::new(12.0, 0.0), 1.0);
        let plan = p.pick_emergency_target(&world, Vec2::ZERO, None);
        let expected = Vec2::new(1.0, 1.0).normalize() * 12.0;
        assert!((plan.target - expected).length() < 1e-3);
    }

    #[test]
    fn test_emergency_falls_back_to_bounds_center() {
        let world = ObstacleWorld::new();
        let bounds = RoamBounds::Rect {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(4.0, 2.0),
        };
        let plan = planner().pick_emergency_target(&world, Vec2::new(1.0, 1.0), Some(&bounds));
        assert_eq!(plan.target, Vec2::new(2.0, 1.0));

        let mut walled = ObstacleWorld::new();
        walled.add_rect(Vec2::new(-20.0, -20.0), Vec2::new(20.0, 20.0));
        let plan = planner().pick_emergency_target(&walled, Vec2::new(5.0, 5.0), None);
        assert_eq!(plan.target, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_stuck_escalates_to_emergency_once() {
        let config = WanderConfig::default();
        let mut tracker = StuckTracker::new(Vec2::ZERO);
        let ticks = (config.stuck_check_time * config.max_stuck_retries as f32 / 0.25) as usize;

        let verdicts: Vec<StuckVerdict> = (0..ticks)
            .map(|_| tracker.update(Vec2::ZERO, 0.25, &config))
            .collect();

        let repicks = verdicts.iter().filter(|v| **v == StuckVerdict::Repick).count();
        let emergencies = verdicts.iter().filter(|v| **v == StuckVerdict::Emergency).count();
        assert_eq!(repicks, 2);
        assert_eq!(emergencies, 1);
        assert_eq!(verdicts.last(), Some(&StuckVerdict::Emergency));
        assert_eq!(tracker.retry_count(), 0);
    }

    #[test]
    fn test_movement_resets_idle_timer() {
        let config = WanderConfig::default();
        let mut tracker = StuckTracker::new(Vec2::ZERO);

        for _ in 0..3 {
            assert_eq!(tracker.update(Vec2::ZERO, 0.25, &config), StuckVerdict::Moving);
        }
        assert!(tracker.stuck_timer() > 0.0);

        assert_eq!(tracker.update(Vec2::new(0.5, 0.0), 0.25, &config), StuckVerdict::Moving);
        assert_eq!(tracker.stuck_timer(), 0.0);
    }

    #[test]
    fn test_target_reached_clears_retries() {
        let config = WanderConfig::default();
        let mut tracker = StuckTracker::new(Vec2::ZERO);
        for _ in 0..4 {
            tracker.update(Vec2::ZERO, 0.25, &config);
        }
        assert_eq!(tracker.retry_count(), 1);

        tracker.on_target_reached();
        assert_eq!(tracker.retry_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_circle_bounds_contain_every_target(seed in any::<u64>()) {
            let world = ObstacleWorld::new();
            let bounds = RoamBounds::Circle { center: Vec2::ZERO, radius: 10.0 };
            let mut rng = fastrand::Rng::with_seed(seed);
            let p = planner();

            for _ in 0..20 {
                let plan = p.pick_wander_target(&world, &mut rng, Vec2::ZERO, Some(&bounds));
                prop_assert!(plan.target.length() <= 10.0 + 1e-4);
            }
        }
    }
}
