//! # Umbra Sim
//!
//! Headless runner for the Umbra gameplay systems.
//!
//! - `config`: simulation settings loaded from `umbra.toml`
//! - `level`: TOML level definitions and validation
//! - `scenario`: fixed-timestep loop driving a scripted player against enemies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod level;
pub mod scenario;

pub use config::{ConfigError, SimConfig};
pub use level::{LevelDefinition, LevelLoadError};
pub use scenario::{Scenario, ScenarioReport, TransitionRecord};
