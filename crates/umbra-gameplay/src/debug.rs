//! Optional debug observer for AI internals.
//!
//! The AI core calls into an [`AiObserver`] only if one is attached. Nothing
//! in the decision logic reads back from it, so detaching it never changes
//! behavior.

use glam::Vec2;
use umbra_common::EntityId;

use crate::enemy::EnemyState;
use crate::world::RayHit;

/// How a wander target was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WanderPlanKind {
    /// Random validated candidate
    Normal,
    /// All attempts failed; unchecked offset from the current position
    Fallback,
    /// Compass search after repeated stuck detection
    Emergency,
}

/// Receives debug notifications from agents. All methods default to no-ops.
pub trait AiObserver {
    /// A sensor or probe ray was cast.
    fn on_ray(&mut self, _origin: Vec2, _direction: Vec2, _length: f32, _hit: Option<&RayHit>) {}

    /// An agent changed state.
    fn on_state_changed(&mut self, _agent: EntityId, _from: EnemyState, _to: EnemyState) {}

    /// An agent picked a new wander target.
    fn on_wander_target(&mut self, _agent: EntityId, _target: Vec2, _kind: WanderPlanKind) {}

    /// The stuck tracker fired for an agent.
    fn on_stuck(&mut self, _agent: EntityId, _retry: u32) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl AiObserver for NullObserver {}
