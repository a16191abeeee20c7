//! # Umbra Common
//!
//! Common types, utilities, and shared abstractions for Project Umbra.
//!
//! This crate provides foundational types used across all Umbra subsystems:
//! - ID types (EntityId, SpotId, ColliderId)
//! - Steering math on top of `glam::Vec2`
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod steering;

pub use glam::Vec2;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::steering::*;
    pub use glam::Vec2;
}

pub use prelude::*;
