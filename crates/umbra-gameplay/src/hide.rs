//! Player-side hide controller.
//!
//! Tracks which spot the player stands next to, whether the water mask is
//! equipped, and the auto-release countdown armed on every successful hide.
//! The controller and the spot refer to each other by id only.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use umbra_common::steering::quantize_to_4;
use umbra_common::{EntityId, SpotId};

use crate::hide_spot::HideSpotRegistry;

/// Fraction of a tick still counted as zero time remaining.
const RELEASE_TOLERANCE: f32 = 0.01;

/// Error types for hide requests.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HideError {
    /// Not standing at any spot
    #[error("No hide spot nearby")]
    NoNearbySpot,
    /// Water mask not equipped
    #[error("Water mask not equipped")]
    MaskNotEquipped,
    /// Spot already taken
    #[error("Hide spot {0} is occupied")]
    SpotOccupied(SpotId),
    /// Spot id not present in the registry
    #[error("Unknown hide spot: {0}")]
    UnknownSpot(SpotId),
    /// Exit input ignored while hidden
    #[error("Input is locked while hidden")]
    InputLocked,
    /// Already hiding somewhere
    #[error("Already hidden in {0}")]
    AlreadyHidden(SpotId),
}

/// Result type for hide requests.
pub type HideResult<T> = Result<T, HideError>;

/// Items the player can have equipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Allows hiding in water spots
    MaskWater,
    /// Fire mask
    MaskFire,
}

/// Hide controller tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HideConfig {
    /// Hide duration when the spot has no override
    pub default_duration: f32,
    /// Lower clamp for any hide duration
    pub min_duration: f32,
    /// Ignore exit input while hidden
    pub lock_input_while_hidden: bool,
    /// Direction to face after leaving a spot
    pub exit_look_dir: Option<Vec2>,
}

impl Default for HideConfig {
    fn default() -> Self {
        Self {
            default_duration: 5.0,
            min_duration: 0.1,
            lock_input_while_hidden: true,
            exit_look_dir: None,
        }
    }
}

/// Data the player controller needs after leaving a spot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitReport {
    /// Spot that was left
    pub spot: SpotId,
    /// Where to place the player, if the spot has an anchor for the entry side
    pub exit_point: Option<Vec2>,
    /// Forced facing, quantized to a cardinal direction
    pub look_dir: Option<Vec2>,
}

/// Outcome of the defend input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HideAction {
    /// Player is now hidden
    Hidden {
        /// Spot entered
        spot: SpotId,
        /// Seconds until auto-release
        duration: f32,
    },
    /// Player left a spot
    Exited(ExitReport),
}

/// Hide state of one player.
#[derive(Debug, Clone)]
pub struct HideController {
    agent: EntityId,
    config: HideConfig,
    occupied_spot: Option<SpotId>,
    nearby_spot: Option<SpotId>,
    auto_release: Option<f32>,
    equipped: Option<ItemKind>,
}

impl HideController {
    /// Creates a controller for `agent`.
    #[must_use]
    pub const fn new(agent: EntityId, config: HideConfig) -> Self {
        Self {
            agent,
            config,
            occupied_spot: None,
            nearby_spot: None,
            auto_release: None,
            equipped: None,
        }
    }

    /// Returns the controlled agent.
    #[must_use]
    pub const fn agent(&self) -> EntityId {
        self.agent
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HideConfig {
        &self.config
    }

    /// Checks whether the player is hidden.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.occupied_spot.is_some()
    }

    /// Returns the spot the player is hidden in.
    #[must_use]
    pub const fn occupied_spot(&self) -> Option<SpotId> {
        self.occupied_spot
    }

    /// Returns the spot the player is standing at.
    #[must_use]
    pub const fn nearby_spot(&self) -> Option<SpotId> {
        self.nearby_spot
    }

    /// Returns the seconds left before auto-release.
    #[must_use]
    pub const fn remaining(&self) -> Option<f32> {
        self.auto_release
    }

    /// Returns the equipped item.
    #[must_use]
    pub const fn equipped(&self) -> Option<ItemKind> {
        self.equipped
    }

    /// Equips or clears an item.
    pub fn equip(&mut self, item: Option<ItemKind>) {
        self.equipped = item;
    }

    /// Checks whether the equipped item allows hiding.
    #[must_use]
    pub fn can_enter(&self) -> bool {
        self.equipped == Some(ItemKind::MaskWater)
    }

    /// Records entering a spot's trigger.
    pub fn set_nearby_spot(&mut self, spot: SpotId) {
        self.nearby_spot = Some(spot);
    }

    /// Records leaving a spot's trigger. Ignored for any other spot.
    pub fn clear_nearby_spot(&mut self, spot: SpotId) {
        if self.nearby_spot == Some(spot) {
            self.nearby_spot = None;
        }
    }

    /// Hide duration for a spot override.
    #[must_use]
    pub fn effective_duration(&self, spot_override: f32) -> f32 {
        let base = if spot_override > 0.0 {
            spot_override
        } else {
            self.config.default_duration
        };
        base.max(self.config.min_duration.max(f32::EPSILON))
    }

    /// Handles the defend input: hide at the nearby spot, or leave the
    /// current one.
    pub fn on_defend_input(
        &mut self,
        spots: &mut HideSpotRegistry,
        approach: Vec2,
    ) -> HideResult<HideAction> {
        if self.is_hidden() {
            if self.config.lock_input_while_hidden {
                return Err(HideError::InputLocked);
            }
            return self.unhide(spots).map(HideAction::Exited).ok_or(HideError::InputLocked);
        }

        let spot = self.nearby_spot.ok_or(HideError::NoNearbySpot)?;
        if !self.can_enter() {
            return Err(HideError::MaskNotEquipped);
        }
        let duration = self.hide(spots, spot, approach)?;
        Ok(HideAction::Hidden { spot, duration })
    }

    /// Hides in `spot` and arms the auto-release countdown.
    ///
    /// Returns the countdown length.
    pub fn hide(
        &mut self,
        spots: &mut HideSpotRegistry,
        spot: SpotId,
        approach: Vec2,
    ) -> HideResult<f32> {
        if let Some(current) = self.occupied_spot {
            return Err(HideError::AlreadyHidden(current));
        }
        let target = spots.get_mut(spot).ok_or(HideError::UnknownSpot(spot))?;
        if !target.try_hide(self.agent, approach) {
            debug!("{} could not hide: {spot} occupied", self.agent);
            return Err(HideError::SpotOccupied(spot));
        }

        let duration = self.effective_duration(target.hide_seconds());
        self.occupied_spot = Some(spot);
        self.nearby_spot = None;
        self.auto_release = Some(duration);
        debug!("{} auto-release in {duration:.2}s", self.agent);
        Ok(duration)
    }

    /// Leaves the current spot and cancels the countdown.
    ///
    /// Returns `None` when not hidden.
    pub fn unhide(&mut self, spots: &mut HideSpotRegistry) -> Option<ExitReport> {
        let spot = self.occupied_spot.take()?;
        self.auto_release = None;

        let exit_point = spots.get_mut(spot).and_then(|s| {
            if !s.unhide(self.agent) {
                debug!("{} was not the occupant of {spot}", self.agent);
            }
            s.exit_point()
        });
        let look_dir = self.config.exit_look_dir.map(quantize_to_4);

        info!("{} exited {spot}", self.agent);
        Some(ExitReport {
            spot,
            exit_point,
            look_dir,
        })
    }

    /// Advances the auto-release countdown.
    ///
    /// Returns the exit report on the tick the countdown releases the player.
    pub fn update(&mut self, dt: f32, spots: &mut HideSpotRegistry) -> Option<ExitReport> {
        let dt = dt.max(0.0);
        let remaining = self.auto_release.as_mut()?;
        *remaining -= dt;
        // Rounding left over from summing fixed steps does not delay release.
        if *remaining > dt * RELEASE_TOLERANCE {
            return None;
        }

        self.auto_release = None;
        if self.is_hidden() {
            debug!("{} hide time elapsed", self.agent);
            self.unhide(spots)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hide_spot::{ExitAnchors, HideSpot};

    const SPOT: SpotId = SpotId(1);

    fn setup(hide_seconds: f32) -> (HideController, HideSpotRegistry) {
        let mut spots = HideSpotRegistry::new();
        spots
            .insert(
                HideSpot::new(SPOT, Vec2::ZERO)
                    .with_hide_seconds(hide_seconds)
                    .with_exits(ExitAnchors {
                        up: Some(Vec2::new(0.0, 1.5)),
                        ..ExitAnchors::default()
                    }),
            )
            .expect("insert should succeed");

        let mut controller = HideController::new(EntityId::new(), HideConfig::default());
        controller.equip(Some(ItemKind::MaskWater));
        controller.set_nearby_spot(SPOT);
        (controller, spots)
    }

    fn tick_until_release(
        controller: &mut HideController,
        spots: &mut HideSpotRegistry,
        dt: f32,
        max_ticks: usize,
    ) -> Vec<usize> {
        (0..max_ticks)
            .filter(|_| controller.update(dt, spots).is_some())
            .collect()
    }

    #[test]
    fn test_defend_hides_at_nearby_spot() {
        let (mut controller, mut spots) = setup(0.0);

        let action = controller
            .on_defend_input(&mut spots, Vec2::Y)
            .expect("hide should succeed");

        assert_eq!(action, HideAction::Hidden { spot: SPOT, duration: 5.0 });
        assert!(controller.is_hidden());
        assert_eq!(controller.occupied_spot(), Some(SPOT));
        assert_eq!(controller.nearby_spot(), None);
        assert_eq!(spots.get(SPOT).and_then(HideSpot::occupant), Some(controller.agent()));
    }

    #[test]
    fn test_defend_refusals() {
        let (mut controller, mut spots) = setup(0.0);

        controller.clear_nearby_spot(SPOT);
        assert_eq!(
            controller.on_defend_input(&mut spots, Vec2::Y),
            Err(HideError::NoNearbySpot)
        );

        controller.set_nearby_spot(SPOT);
        controller.equip(Some(ItemKind::MaskFire));
        assert_eq!(
            controller.on_defend_input(&mut spots, Vec2::Y),
            Err(HideError::MaskNotEquipped)
        );

        controller.equip(Some(ItemKind::MaskWater));
        spots
            .get_mut(SPOT)
            .map(|s| s.try_hide(EntityId::new(), Vec2::X))
            .expect("spot should exist");
        assert_eq!(
            controller.on_defend_input(&mut spots, Vec2::Y),
            Err(HideError::SpotOccupied(SPOT))
        );
        assert!(!controller.is_hidden());
    }

    #[test]
    fn test_clear_nearby_only_for_same_spot() {
        let (mut controller, _) = setup(0.0);
        controller.clear_nearby_spot(SpotId(99));
        assert_eq!(controller.nearby_spot(), Some(SPOT));
        controller.clear_nearby_spot(SPOT);
        assert_eq!(controller.nearby_spot(), None);
    }

    #[test]
    fn test_locked_input_keeps_player_hidden() {
        let (mut controller, mut spots) = setup(0.0);
        controller
            .on_defend_input(&mut spots, Vec2::Y)
            .expect("hide should succeed");

        assert_eq!(
            controller.on_defend_input(&mut spots, Vec2::Y),
            Err(HideError::InputLocked)
        );
        assert!(controller.is_hidden());
    }

    #[test]
    fn test_unlocked_input_exits() {
        let (mut controller, mut spots) = setup(0.0);
        controller.config.lock_input_while_hidden = false;
        controller.config.exit_look_dir = Some(Vec2::new(-3.0, 1.0));

        controller
            .on_defend_input(&mut spots, Vec2::Y)
            .expect("hide should succeed");
        let action = controller
            .on_defend_input(&mut spots, Vec2::ZERO)
            .expect("exit should succeed");

        assert_eq!(
            action,
            HideAction::Exited(ExitReport {
                spot: SPOT,
                exit_point: Some(Vec2::new(0.0, 1.5)),
                look_dir: Some(Vec2::NEG_X),
            })
        );
        assert!(!controller.is_hidden());
        assert_eq!(controller.remaining(), None);
        assert!(!spots.get(SPOT).is_some_and(HideSpot::is_occupied));
    }

    #[test]
    fn test_zero_exit_look_dir_defaults_down() {
        let (mut controller, mut spots) = setup(0.0);
        controller.config.exit_look_dir = Some(Vec2::ZERO);
        controller.hide(&mut spots, SPOT, Vec2::X).expect("hide should succeed");

        let report = controller.unhide(&mut spots).expect("should exit");
        assert_eq!(report.look_dir, Some(Vec2::NEG_Y));
        assert_eq!(report.exit_point, None);
    }

    #[test]
    fn test_auto_release_fires_once_at_duration() {
        let (mut controller, mut spots) = setup(1.0);
        let duration = controller
            .hide(&mut spots, SPOT, Vec2::Y)
            .expect("hide should succeed");
        assert_eq!(duration, 1.0);

        let released = tick_until_release(&mut controller, &mut spots, 0.25, 12);
        assert_eq!(released, vec![3]);
        assert!(!controller.is_hidden());
        assert!(!spots.get(SPOT).is_some_and(HideSpot::is_occupied));
    }

    #[test]
    fn test_auto_release_on_exact_tick_at_fixed_rates() {
        for (dt, seconds, expected) in [(0.02, 5.0, 249), (0.1, 5.0, 49), (0.02, 0.2, 9)] {
            let (mut controller, mut spots) = setup(seconds);
            controller
                .hide(&mut spots, SPOT, Vec2::Y)
                .expect("hide should succeed");

            let released = tick_until_release(&mut controller, &mut spots, dt, 400);
            assert_eq!(released, vec![expected], "dt {dt}, {seconds}s");
        }
    }

    #[test]
    fn test_unhide_reports_exit_when_spot_lost_occupant() {
        let (mut controller, mut spots) = setup(0.0);
        controller.hide(&mut spots, SPOT, Vec2::Y).expect("hide should succeed");
        spots
            .get_mut(SPOT)
            .map(|s| s.unhide(controller.agent()))
            .expect("spot should exist");

        let report = controller.unhide(&mut spots).expect("should exit");
        assert_eq!(report.spot, SPOT);
        assert!(!controller.is_hidden());
        assert!(!spots.get(SPOT).is_some_and(HideSpot::is_occupied));
    }

    #[test]
    fn test_manual_exit_cancels_and_rehide_rearms() {
        let (mut controller, mut spots) = setup(1.0);
        controller.hide(&mut spots, SPOT, Vec2::Y).expect("hide should succeed");
        for _ in 0..3 {
            assert!(controller.update(0.25, &mut spots).is_none());
        }

        controller.unhide(&mut spots).expect("should exit");
        assert!(controller.update(0.25, &mut spots).is_none());

        controller.hide(&mut spots, SPOT, Vec2::Y).expect("re-hide should succeed");
        assert_eq!(controller.remaining(), Some(1.0));
        let released = tick_until_release(&mut controller, &mut spots, 0.25, 12);
        assert_eq!(released, vec![3]);
    }

    #[test]
    fn test_hide_while_hidden_is_refused() {
        let (mut controller, mut spots) = setup(0.0);
        controller.hide(&mut spots, SPOT, Vec2::Y).expect("hide should succeed");
        assert_eq!(
            controller.hide(&mut spots, SPOT, Vec2::Y),
            Err(HideError::AlreadyHidden(SPOT))
        );
        assert_eq!(
            controller.hide(&mut spots, SpotId(7), Vec2::Y),
            Err(HideError::AlreadyHidden(SPOT))
        );
    }

    #[test]
    fn test_effective_duration() {
        let controller = HideController::new(
            EntityId::new(),
            HideConfig {
                default_duration: -2.0,
                ..HideConfig::default()
            },
        );
        assert_eq!(controller.effective_duration(3.0), 3.0);
        assert_eq!(controller.effective_duration(0.0), 0.1);
        assert_eq!(controller.effective_duration(-1.0), 0.1);
    }
}
