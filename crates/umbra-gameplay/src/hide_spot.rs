//! Hide spots and their single-occupant reservation.
//!
//! A spot is either free or held by exactly one agent. Occupancy changes only
//! through [`HideSpot::try_hide`] and [`HideSpot::unhide`]; invalid requests
//! are refused by return value and never change state.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use umbra_common::steering::Cardinal;
use umbra_common::{EntityId, SpotId, UmbraError, UmbraResult};

use crate::events::{notify, EventSender, GameEvent};

/// Optional exit positions, one per entry direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitAnchors {
    /// Exit used after entering upward
    pub up: Option<Vec2>,
    /// Exit used after entering downward
    pub down: Option<Vec2>,
    /// Exit used after entering leftward
    pub left: Option<Vec2>,
    /// Exit used after entering rightward
    pub right: Option<Vec2>,
}

impl ExitAnchors {
    /// Returns the anchor for a direction.
    #[must_use]
    pub const fn get(&self, direction: Cardinal) -> Option<Vec2> {
        match direction {
            Cardinal::Up => self.up,
            Cardinal::Down => self.down,
            Cardinal::Left => self.left,
            Cardinal::Right => self.right,
        }
    }

    /// Checks whether no anchor is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.up.is_none() && self.down.is_none() && self.left.is_none() && self.right.is_none()
    }
}

/// A concealment point that one agent at a time can hide in.
#[derive(Debug, Clone)]
pub struct HideSpot {
    id: SpotId,
    position: Vec2,
    trigger_radius: f32,
    hide_seconds: f32,
    exits: ExitAnchors,
    occupant: Option<EntityId>,
    last_entry: Cardinal,
    notifier: Option<EventSender>,
}

impl HideSpot {
    /// Default radius of the interaction trigger.
    pub const DEFAULT_TRIGGER_RADIUS: f32 = 0.75;

    /// Creates a free spot with no exits and no duration override.
    #[must_use]
    pub fn new(id: SpotId, position: Vec2) -> Self {
        Self {
            id,
            position,
            trigger_radius: Self::DEFAULT_TRIGGER_RADIUS,
            hide_seconds: 0.0,
            exits: ExitAnchors::default(),
            occupant: None,
            last_entry: Cardinal::Down,
            notifier: None,
        }
    }

    /// Sets the directional exit anchors.
    #[must_use]
    pub fn with_exits(mut self, exits: ExitAnchors) -> Self {
        self.exits = exits;
        self
    }

    /// Sets the hide duration override (`<= 0` means controller default).
    #[must_use]
    pub fn with_hide_seconds(mut self, seconds: f32) -> Self {
        self.hide_seconds = seconds;
        self
    }

    /// Sets the interaction trigger radius.
    #[must_use]
    pub fn with_trigger_radius(mut self, radius: f32) -> Self {
        self.trigger_radius = radius.max(0.0);
        self
    }

    /// Connects the spot to a progression channel.
    pub fn set_notifier(&mut self, sender: Option<EventSender>) {
        self.notifier = sender;
    }

    /// Returns the spot id.
    #[must_use]
    pub const fn id(&self) -> SpotId {
        self.id
    }

    /// Returns the spot position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Returns the interaction trigger radius.
    #[must_use]
    pub const fn trigger_radius(&self) -> f32 {
        self.trigger_radius
    }

    /// Returns the configured hide duration override.
    #[must_use]
    pub const fn hide_seconds(&self) -> f32 {
        self.hide_seconds
    }

    /// Returns the exit anchors.
    #[must_use]
    pub const fn exits(&self) -> &ExitAnchors {
        &self.exits
    }

    /// Returns the direction of the most recent entry.
    #[must_use]
    pub const fn last_entry(&self) -> Cardinal {
        self.last_entry
    }

    /// Returns the current occupant.
    #[must_use]
    pub const fn occupant(&self) -> Option<EntityId> {
        self.occupant
    }

    /// Checks whether someone is hiding here.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Checks whether `point` is inside the interaction trigger.
    #[must_use]
    pub fn in_trigger(&self, point: Vec2) -> bool {
        point.distance(self.position) <= self.trigger_radius
    }

    /// Checks whether the interaction prompt should be shown to a visitor.
    #[must_use]
    pub const fn should_prompt(&self, can_enter: bool) -> bool {
        !self.is_occupied() && can_enter
    }

    /// Reserves the spot for `agent` entering along `approach`.
    ///
    /// Returns `false` without any change when the spot is occupied.
    pub fn try_hide(&mut self, agent: EntityId, approach: Vec2) -> bool {
        if let Some(occupant) = self.occupant {
            debug!("{} refused {agent}: held by {occupant}", self.id);
            return false;
        }

        self.last_entry = Cardinal::from_direction(approach);
        self.occupant = Some(agent);
        info!("{agent} hid in {} facing {:?}", self.id, self.last_entry);
        notify(
            self.notifier.as_ref(),
            GameEvent::SpotEntered {
                spot: self.id,
                agent,
            },
        );
        true
    }

    /// Releases the spot if `agent` is the occupant.
    ///
    /// Returns whether the spot was released.
    pub fn unhide(&mut self, agent: EntityId) -> bool {
        if self.occupant != Some(agent) {
            return false;
        }

        self.occupant = None;
        info!("{agent} left {}", self.id);
        notify(
            self.notifier.as_ref(),
            GameEvent::SpotReleased {
                spot: self.id,
                agent,
            },
        );
        true
    }

    /// Returns the exit anchor matching the last entry direction.
    #[must_use]
    pub const fn exit_point(&self) -> Option<Vec2> {
        self.exits.get(self.last_entry)
    }
}

/// All hide spots of a level.
#[derive(Debug, Default)]
pub struct HideSpotRegistry {
    spots: HashMap<SpotId, HideSpot>,
}

impl HideSpotRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spot. Fails if the id is taken.
    pub fn insert(&mut self, spot: HideSpot) -> UmbraResult<()> {
        if self.spots.contains_key(&spot.id()) {
            return Err(UmbraError::InvalidLevel(format!("duplicate {}", spot.id())));
        }
        self.spots.insert(spot.id(), spot);
        Ok(())
    }

    /// Connects every spot to a progression channel.
    pub fn connect(&mut self, sender: &EventSender) {
        for spot in self.spots.values_mut() {
            spot.set_notifier(Some(sender.clone()));
        }
    }

    /// Gets a spot.
    #[must_use]
    pub fn get(&self, id: SpotId) -> Option<&HideSpot> {
        self.spots.get(&id)
    }

    /// Gets a mutable spot.
    pub fn get_mut(&mut self, id: SpotId) -> Option<&mut HideSpot> {
        self.spots.get_mut(&id)
    }

    /// Returns the number of spots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    /// Returns whether there are no spots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Iterates over all spots in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &HideSpot> {
        self.spots.values()
    }

    /// Returns the closest spot whose trigger contains `point`.
    #[must_use]
    pub fn spot_at(&self, point: Vec2) -> Option<SpotId> {
        self.spots
            .values()
            .filter(|spot| spot.in_trigger(point))
            .min_by(|a, b| {
                a.position()
                    .distance_squared(point)
                    .total_cmp(&b.position().distance_squared(point))
            })
            .map(HideSpot::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn exits() -> ExitAnchors {
        ExitAnchors {
            up: Some(Vec2::new(0.0, 1.0)),
            down: Some(Vec2::new(0.0, -1.0)),
            left: None,
            right: Some(Vec2::new(1.0, 0.0)),
        }
    }

    #[test]
    fn test_occupancy_is_exclusive() {
        let mut spot = HideSpot::new(SpotId::new(1), Vec2::ZERO);
        let a = EntityId::new();
        let b = EntityId::new();

        assert!(spot.try_hide(a, Vec2::X));
        assert!(!spot.try_hide(b, Vec2::Y));
        assert_eq!(spot.occupant(), Some(a));
        assert_eq!(spot.last_entry(), Cardinal::Right);
    }

    #[test]
    fn test_unhide_by_non_occupant_is_noop() {
        let mut spot = HideSpot::new(SpotId::new(1), Vec2::ZERO);
        let a = EntityId::new();
        let b = EntityId::new();

        assert!(!spot.unhide(a));
        spot.try_hide(a, Vec2::ZERO);
        assert!(!spot.unhide(b));
        assert!(spot.is_occupied());
        assert!(spot.unhide(a));
        assert!(!spot.is_occupied());
    }

    #[test]
    fn test_exit_point_follows_entry_direction() {
        let mut spot = HideSpot::new(SpotId::new(2), Vec2::ZERO).with_exits(exits());
        let agent = EntityId::new();

        spot.try_hide(agent, Vec2::new(3.0, 1.0));
        assert_eq!(spot.exit_point(), Some(Vec2::new(1.0, 0.0)));
        spot.unhide(agent);

        spot.try_hide(agent, Vec2::new(-4.0, 0.5));
        assert_eq!(spot.exit_point(), None);
        spot.unhide(agent);

        spot.try_hide(agent, Vec2::ZERO);
        assert_eq!(spot.last_entry(), Cardinal::Down);
        assert_eq!(spot.exit_point(), Some(Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn test_spot_without_exits_has_no_exit_point() {
        let mut spot = HideSpot::new(SpotId::new(3), Vec2::ZERO);
        assert!(spot.exits().is_empty());
        spot.try_hide(EntityId::new(), Vec2::Y);
        assert_eq!(spot.exit_point(), None);
    }

    #[test]
    fn test_prompt_requires_free_spot_and_mask() {
        let mut spot = HideSpot::new(SpotId::new(4), Vec2::ZERO);
        assert!(spot.should_prompt(true));
        assert!(!spot.should_prompt(false));
        spot.try_hide(EntityId::new(), Vec2::Y);
        assert!(!spot.should_prompt(true));
    }

    #[test]
    fn test_notifications() {
        let bus = EventBus::new(8);
        let mut spot = HideSpot::new(SpotId::new(5), Vec2::ZERO);
        spot.set_notifier(Some(bus.sender()));
        let agent = EntityId::new();
        let other = EntityId::new();

        spot.try_hide(agent, Vec2::Y);
        spot.try_hide(other, Vec2::Y);
        spot.unhide(other);
        spot.unhide(agent);

        assert_eq!(
            bus.drain(),
            vec![
                GameEvent::SpotEntered {
                    spot: SpotId::new(5),
                    agent
                },
                GameEvent::SpotReleased {
                    spot: SpotId::new(5),
                    agent
                },
            ]
        );
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = HideSpotRegistry::new();
        registry
            .insert(HideSpot::new(SpotId::new(1), Vec2::ZERO))
            .expect("insert should succeed");
        registry
            .insert(HideSpot::new(SpotId::new(2), Vec2::new(1.0, 0.0)))
            .expect("insert should succeed");
        assert!(registry.insert(HideSpot::new(SpotId::new(1), Vec2::ONE)).is_err());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.spot_at(Vec2::new(0.6, 0.0)), Some(SpotId::new(2)));
        assert_eq!(registry.spot_at(Vec2::new(0.2, 0.0)), Some(SpotId::new(1)));
        assert_eq!(registry.spot_at(Vec2::new(5.0, 5.0)), None);
    }
}
