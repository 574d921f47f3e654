//! Camera synchronisation
//!
//! Produces viewport targets while the controller is animating, throttled to
//! the configured recenter interval. In every other phase the last target is
//! left untouched so manual panning by the user is respected.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tour_common::config::{CameraConfig, CameraMode, ZoomLevels};
use tour_common::events::Phase;
use tour_common::{GeoBounds, LatLng};

/// Viewport request for the map layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub center: LatLng,
    pub zoom: u8,
    /// Area to fit, when framing several markers
    pub bounds: Option<GeoBounds>,
}

/// Thin viewport follower
#[derive(Debug, Clone)]
pub struct CameraSync {
    mode: CameraMode,
    zoom_levels: ZoomLevels,
    interval: Duration,
    last_recenter: Option<Instant>,
    target: Option<CameraTarget>,
}

impl CameraSync {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            mode: config.mode,
            zoom_levels: config.zoom_levels,
            interval: config.recenter_interval(),
            last_recenter: None,
            target: None,
        }
    }

    /// Consider recentering for the current frame
    ///
    /// Returns the new target when the viewport moved. Does nothing outside
    /// `Animating`, or when the previous recenter is more recent than the
    /// configured interval.
    pub fn observe(
        &mut self,
        phase: Phase,
        now: Instant,
        markers: Option<GeoBounds>,
        path: &[LatLng],
    ) -> Option<CameraTarget> {
        if phase != Phase::Animating {
            return None;
        }
        if let Some(last) = self.last_recenter {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        let target = match self.mode {
            CameraMode::FollowMarkers => markers.map(|bounds| CameraTarget {
                center: bounds.center(),
                zoom: self.zoom_levels.animating,
                bounds: Some(bounds),
            }),
            CameraMode::PathMidpoint => path_midpoint(path).map(|center| CameraTarget {
                center,
                zoom: self.zoom_levels.animating,
                bounds: None,
            }),
        }?;

        self.last_recenter = Some(now);
        self.target = Some(target);
        Some(target)
    }

    /// Zoom level a map layer should use in `phase` when it frames the
    /// tour itself
    pub fn zoom_for(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Idle | Phase::Complete => self.zoom_levels.overview,
            Phase::Settled => self.zoom_levels.settled,
            Phase::AwaitingRoute | Phase::Animating | Phase::Paused => self.zoom_levels.animating,
        }
    }

    /// Last target produced, if any
    pub fn target(&self) -> Option<CameraTarget> {
        self.target
    }

    /// Forget the throttle so the first frame of a new leg recenters at once
    pub fn rearm(&mut self) {
        self.last_recenter = None;
    }
}

fn path_midpoint(path: &[LatLng]) -> Option<LatLng> {
    let first = path.first()?;
    let last = path.last()?;
    Some(first.midpoint(last))
}
