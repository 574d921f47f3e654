//! Playback-related type definitions
//!
//! Supporting types for the controller phase machine and its error channel.

use serde::{Deserialize, Serialize};

/// Playback controller phase
///
/// ```text
/// Idle -> AwaitingRoute -> Animating -> Settled -> ... -> Complete
///                            |    ^
///                            v    |
///                            Paused
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not departed from the first waypoint
    Idle,
    /// Route request for the current leg is in flight
    AwaitingRoute,
    /// Scheduler running against the active route
    Animating,
    /// Scheduler frozen at the last progress
    Paused,
    /// Leg finished, waiting for the next start (or auto-advance)
    Settled,
    /// Last waypoint reached; terminal until reset
    Complete,
}

impl Phase {
    /// True while a leg is underway (requested, moving or paused)
    pub fn is_in_leg(&self) -> bool {
        matches!(self, Phase::AwaitingRoute | Phase::Animating | Phase::Paused)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::AwaitingRoute => write!(f, "AwaitingRoute"),
            Phase::Animating => write!(f, "Animating"),
            Phase::Paused => write!(f, "Paused"),
            Phase::Settled => write!(f, "Settled"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Recoverable failure kinds surfaced on the event channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Routing failed or timed out; a straight-line fallback is animating
    RouteDegraded,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::RouteDegraded => write!(f, "route_degraded"),
        }
    }
}
