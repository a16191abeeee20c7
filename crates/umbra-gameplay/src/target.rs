//! Snapshot of the pursued target as seen by the enemy AI.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Per-tick status of the target an enemy may pursue.
///
/// Built by the host from the player's transform, renderer, collider and
/// hide controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    /// World position
    pub position: Vec2,
    /// Target object is active in the scene
    pub active: bool,
    /// Target is being rendered
    pub visible: bool,
    /// Target collider is enabled
    pub collider_enabled: bool,
    /// Target is inside a hide spot
    pub hidden: bool,
}

impl TargetStatus {
    /// Status of a fully exposed target at `position`.
    #[must_use]
    pub const fn exposed(position: Vec2) -> Self {
        Self {
            position,
            active: true,
            visible: true,
            collider_enabled: true,
            hidden: false,
        }
    }

    /// Status of a target hidden at `position`.
    #[must_use]
    pub const fn hidden_at(position: Vec2) -> Self {
        Self {
            position,
            active: true,
            visible: false,
            collider_enabled: false,
            hidden: true,
        }
    }

    /// Checks whether the target cannot be detected regardless of distance.
    #[must_use]
    pub const fn is_concealed(&self) -> bool {
        !self.active || !self.visible || !self.collider_enabled || self.hidden
    }
}
