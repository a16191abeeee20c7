//! Error types for Project Umbra.

use thiserror::Error;

/// Top-level error type for Umbra operations.
///
/// Per-tick simulation never produces these; they surface from loading and
/// setup paths only.
#[derive(Debug, Error)]
pub enum UmbraError {
    /// Level data is structurally invalid
    #[error("Invalid level: {0}")]
    InvalidLevel(String),
}

/// Result type alias for Umbra operations.
pub type UmbraResult<T> = Result<T, UmbraError>;
