//! Common error types for the tour workspace

use thiserror::Error;

/// Common result type for tour operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the tour crates
#[derive(Error, Debug)]
pub enum Error {
    /// Waypoint sequence is empty or malformed (fatal at construction)
    #[error("Invalid waypoint sequence: {0}")]
    InvalidWaypointSequence(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (waypoint data source)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error (configuration file)
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
