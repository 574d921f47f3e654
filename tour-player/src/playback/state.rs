//! Playback state and read-only snapshots
//!
//! `PlaybackState` is owned exclusively by the controller. Everything that
//! leaves the controller (UI, camera consumers, tests) is a cloned
//! `TourSnapshot`.

use super::camera::CameraTarget;
use super::markers::MarkerSnapshot;
use crate::routing::Resolution;
use serde::{Deserialize, Serialize};
use tour_common::events::Phase;
use tour_common::{LatLng, LegKey, Route};

/// Controller-owned playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub phase: Phase,
    /// Waypoint the markers departed from or settled at; `None` before
    /// departure from the first waypoint
    pub current_index: Option<usize>,
    /// Position along `active_route` in `[0, 1]`
    pub progress: f64,
    pub active_route: Option<Route>,
    /// Bumped whenever in-flight work must be invalidated
    pub request_generation: u64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            current_index: None,
            progress: 0.0,
            active_route: None,
            request_generation: 0,
        }
    }

    /// Leg currently requested, animating or paused
    pub fn active_leg(&self) -> Option<LegKey> {
        match self.phase {
            Phase::AwaitingRoute | Phase::Animating | Phase::Paused => {
                self.current_index.map(LegKey::departing)
            }
            _ => None,
        }
    }

    /// `current_index` with `-1` standing for "not departed"
    pub fn signed_index(&self) -> i64 {
        self.current_index.map(|i| i as i64).unwrap_or(-1)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Route resolution delivered back to the controller
///
/// Tagged with the generation that was current when the request was issued.
#[derive(Debug, Clone)]
pub struct RouteArrival {
    pub generation: u64,
    pub leg: LegKey,
    pub resolution: Resolution,
}

/// Serializable view of the whole tour for UI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourSnapshot {
    pub phase: Phase,
    /// `-1` before departure from the first waypoint
    pub current_index: i64,
    pub progress: f64,
    pub request_generation: u64,
    pub active_leg: Option<LegKey>,
    pub route_is_fallback: bool,
    pub markers: Vec<MarkerSnapshot>,
    pub camera: Option<CameraTarget>,
    /// Zoom level for the current phase (overview, animating or settled)
    pub zoom: u8,
    /// Visited path: completed legs plus the covered part of the active leg
    pub traveled_path: Vec<LatLng>,
}
