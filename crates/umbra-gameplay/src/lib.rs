//! # Umbra Gameplay
//!
//! Enemy AI and stealth systems for Project Umbra.
//!
//! This crate provides the engine-agnostic gameplay layer:
//! - World query seam and a small analytic obstacle world
//! - Ray-fan obstacle sensor and wall-sliding navigator
//! - Wander planning with stuck detection
//! - Wander/Chase/Search enemy state machine and the enemy roster
//! - Hide spots, the player hide controller and the spot sequence puzzle
//! - Event bus for progression notifications
//! - Optional debug observer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod debug;
pub mod enemy;
pub mod events;
pub mod hide;
pub mod hide_spot;
pub mod puzzle;
pub mod roster;
pub mod sensor;
pub mod target;
pub mod wall_nav;
pub mod wander;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::debug::*;
    pub use crate::enemy::*;
    pub use crate::events::*;
    pub use crate::hide::*;
    pub use crate::hide_spot::*;
    pub use crate::puzzle::*;
    pub use crate::roster::*;
    pub use crate::sensor::*;
    pub use crate::target::*;
    pub use crate::wall_nav::*;
    pub use crate::wander::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_common::{EntityId, SpotId, Vec2};

    #[test]
    fn test_hidden_player_turns_chase_into_search() {
        let world = ObstacleWorld::new();
        let bus = EventBus::new(32);

        let mut spots = HideSpotRegistry::new();
        spots
            .insert(HideSpot::new(SpotId::new(1), Vec2::new(2.0, 0.0)))
            .expect("insert should succeed");
        spots.connect(&bus.sender());

        let mut player = HideController::new(EntityId::new(), HideConfig::default());
        player.equip(Some(ItemKind::MaskWater));
        let player_pos = Vec2::new(2.0, 0.0);

        let mut enemy = EnemyAgent::new(EntityId::new(), EnemyConfig::default(), Vec2::ZERO, 3);
        let mut enemy_pos = Vec2::ZERO;

        let status = |hidden: bool| TargetStatus {
            hidden,
            ..TargetStatus::exposed(player_pos)
        };

        enemy.update(0.02, &world, &mut enemy_pos, Some(&status(player.is_hidden())));
        assert_eq!(enemy.state(), EnemyState::Chase);

        if let Some(spot) = spots.spot_at(player_pos) {
            player.set_nearby_spot(spot);
        }
        player
            .on_defend_input(&mut spots, Vec2::X)
            .expect("hide should succeed");

        enemy.update(0.02, &world, &mut enemy_pos, Some(&status(player.is_hidden())));
        assert_eq!(enemy.state(), EnemyState::Search);
        assert_eq!(enemy.last_known_target_pos(), Some(player_pos));
        assert!(matches!(
            bus.drain().as_slice(),
            [GameEvent::SpotEntered { spot, .. }] if *spot == SpotId::new(1)
        ));
    }
}
