//! Error types for tour-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Only construction-time failures reach callers; recoverable playback
//! failures are absorbed by the controller and surfaced as `TourError` events.

use thiserror::Error;

/// Main error type for tour-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (invalid waypoints, config, I/O)
    #[error(transparent)]
    Common(#[from] tour_common::Error),

    /// Player task is gone (handle used after shutdown)
    #[error("Player stopped: {0}")]
    PlayerStopped(String),
}

/// Convenience Result type using tour-player Error
pub type Result<T> = std::result::Result<T, Error>;
