//! Ray-fan obstacle sensor.
//!
//! Casts a symmetric fan of rays around a heading and turns the hits into a
//! single sideways repulsion vector. Closer hits push harder; the result is
//! the average over all hitting rays so its magnitude stays bounded by
//! `force`.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use umbra_common::steering::{fan_offsets, left_perp, right_perp, rotate_degrees};

use crate::debug::AiObserver;
use crate::world::{LayerMask, WorldQuery};

/// Configuration for the ray-fan sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Number of rays in the fan
    pub ray_count: usize,
    /// Total angle covered by the fan (degrees)
    pub spread_degrees: f32,
    /// Ray length
    pub max_distance: f32,
    /// Repulsion strength of a hit at distance zero
    pub force: f32,
    /// Layers treated as obstacles
    pub mask: LayerMask,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ray_count: 5,
            spread_degrees: 60.0,
            max_distance: 1.5,
            force: 1.0,
            mask: LayerMask::OBSTACLES,
        }
    }
}

/// Ray-fan obstacle sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayFanSensor {
    config: SensorConfig,
}

impl RayFanSensor {
    /// Creates a sensor with the given configuration.
    #[must_use]
    pub const fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Senses obstacles around `forward` and returns the repulsion vector.
    ///
    /// Returns zero when `forward` is zero, the fan is empty, or no ray hits.
    pub fn sense<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        origin: Vec2,
        forward: Vec2,
        observer: &mut dyn AiObserver,
    ) -> Vec2 {
        let cfg = &self.config;
        let forward = forward.normalize_or_zero();
        if forward == Vec2::ZERO || cfg.max_distance <= 0.0 {
            return Vec2::ZERO;
        }

        let mut sum = Vec2::ZERO;
        let mut hits = 0u32;

        for offset in fan_offsets(cfg.ray_count, cfg.spread_degrees) {
            let dir = rotate_degrees(forward, offset);
            let hit = world.raycast(origin, dir, cfg.max_distance, cfg.mask);
            observer.on_ray(origin, dir, cfg.max_distance, hit.as_ref());

            let Some(hit) = hit else {
                continue;
            };

            // Positive offsets are left of forward and push right.
            let escape = if offset >= 0.0 {
                right_perp(dir)
            } else {
                left_perp(dir)
            };
            let strength = (1.0 - hit.distance / cfg.max_distance).clamp(0.0, 1.0);
            sum += escape * strength * cfg.force;
            hits += 1;
        }

        if hits == 0 {
            Vec2::ZERO
        } else {
            sum / hits as f32
        }
    }
}
