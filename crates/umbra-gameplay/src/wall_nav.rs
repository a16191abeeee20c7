//! Wall-sliding navigation around obstructions.
//!
//! Used while chasing when the line of sight to the target is blocked. The
//! navigator slides along the blocking surface in whichever direction makes
//! more progress toward the target, switches sides when that way is blocked,
//! and backs out of concave corners. No pathfinding is involved.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use umbra_common::steering::{blend_heading, left_perp};

use crate::debug::AiObserver;
use crate::sensor::RayFanSensor;
use crate::world::{LayerMask, RayHit, WorldQuery};

/// Configuration for the wall navigator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallNavConfig {
    /// Length of the forward probe toward the target
    pub probe_distance: f32,
    /// Length of the probe along a slide candidate
    pub slide_probe_distance: f32,
    /// Weight of the slide direction in the final blend
    pub slide_weight: f32,
    /// Weight of the direct pull toward the target in the final blend
    pub target_pull: f32,
    /// Layers treated as walls
    pub mask: LayerMask,
}

impl Default for WallNavConfig {
    fn default() -> Self {
        Self {
            probe_distance: 1.2,
            slide_probe_distance: 0.8,
            slide_weight: 1.0,
            target_pull: 0.3,
            mask: LayerMask::OBSTACLES,
        }
    }
}

/// Which branch of the navigator produced a steering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallNavMode {
    /// Nothing directly ahead; sensor-blended pursuit
    Direct,
    /// Sliding along the better-scoring side
    Slide,
    /// Preferred side blocked; sliding along the other side
    AlternateSlide,
    /// Both sides blocked; backing out of a corner
    Corner,
}

/// Output of the wall navigator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSteer {
    /// Unit steering direction (zero only if every input was zero)
    pub direction: Vec2,
    /// Branch taken
    pub mode: WallNavMode,
}

/// Corner-aware wall follower.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallNavigator {
    config: WallNavConfig,
}

impl WallNavigator {
    /// Creates a navigator with the given configuration.
    #[must_use]
    pub const fn new(config: WallNavConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WallNavConfig {
        &self.config
    }

    /// Computes a steering direction around the wall in `wall_hit`.
    ///
    /// `direction_to_target` should be normalized; `wall_hit` is the blocked
    /// line-of-sight hit and supplies the surface normal.
    pub fn navigate_around_wall<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        sensor: &RayFanSensor,
        position: Vec2,
        direction_to_target: Vec2,
        wall_hit: &RayHit,
        observer: &mut dyn AiObserver,
    ) -> WallSteer {
        let cfg = &self.config;
        let to_target = direction_to_target.normalize_or_zero();

        let probe = world.raycast(position, to_target, cfg.probe_distance, cfg.mask);
        observer.on_ray(position, to_target, cfg.probe_distance, probe.as_ref());

        if probe.is_none() {
            let avoid = sensor.sense(world, position, to_target, observer);
            return WallSteer {
                direction: blend_heading(to_target, avoid),
                mode: WallNavMode::Direct,
            };
        }

        let normal = wall_hit.normal.normalize_or_zero();
        let side_a = left_perp(normal);
        let side_b = -side_a;
        let (preferred, other) = if side_a.dot(to_target) >= side_b.dot(to_target) {
            (side_a, side_b)
        } else {
            (side_b, side_a)
        };

        let (slide, mode) = if self.side_is_clear(world, position, preferred, observer) {
            (preferred, WallNavMode::Slide)
        } else if self.side_is_clear(world, position, other, observer) {
            (other, WallNavMode::AlternateSlide)
        } else {
            let retreat = (normal * 0.5 + preferred * 0.5).normalize_or_zero();
            return WallSteer {
                direction: if retreat == Vec2::ZERO { normal } else { retreat },
                mode: WallNavMode::Corner,
            };
        };

        let avoid = sensor.sense(world, position, slide, observer);
        let steer = slide * cfg.slide_weight + to_target * cfg.target_pull + avoid;
        let direction = steer.normalize_or_zero();

        WallSteer {
            direction: if direction == Vec2::ZERO { slide } else { direction },
            mode,
        }
    }

    fn side_is_clear<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        position: Vec2,
        side: Vec2,
        observer: &mut dyn AiObserver,
    ) -> bool {
        let hit = world.raycast(position, side, self.config.slide_probe_distance, self.config.mask);
        observer.on_ray(position, side, self.config.slide_probe_distance, hit.as_ref());
        hit.is_none()
    }
}
