//! Core playback controller - definition, construction and read access
//!
//! **Responsibilities:**
//! - PlaybackController struct definition and initialization
//! - Read-only accessors and `TourSnapshot` assembly
//! - Phase transitions and deferred event emission

use crate::playback::camera::{CameraSync, CameraTarget};
use crate::playback::markers::{MarkerSet, MarkerSnapshot, MarkerSpec};
use crate::playback::scheduler::{traveled_prefix, AnimationScheduler};
use crate::playback::state::{PlaybackState, RouteArrival, TourSnapshot};
use crate::routing::RouteResolver;
use crate::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tour_common::config::TourConfig;
use tour_common::events::{EventBus, Phase, TourEvent};
use tour_common::{LatLng, Waypoint, WaypointSequence};
use tracing::{debug, info};

/// Receiver of route resolutions, drained by the player loop
pub type RouteArrivals = mpsc::UnboundedReceiver<RouteArrival>;

/// Playback controller - orchestrates resolver, scheduler and markers
///
/// A plain `&mut self` state machine: it never blocks and never awaits.
/// Route requests run on spawned tasks whose results come back through the
/// `RouteArrivals` channel returned at construction.
pub struct PlaybackController {
    /// Tour stops (immutable while a tour is underway)
    pub(super) waypoints: WaypointSequence,

    /// Engine configuration
    pub(super) config: TourConfig,

    /// Exclusively owned playback state
    pub(super) state: PlaybackState,

    /// Single-session interpolation driver
    pub(super) scheduler: AnimationScheduler,

    /// Moving markers (tour marker or guests)
    pub(super) markers: MarkerSet,

    /// Viewport follower
    pub(super) camera: CameraSync,

    /// Shared caching/deduplicating resolver
    pub(super) resolver: Arc<RouteResolver>,

    /// Sender cloned into every route request task
    pub(super) arrivals_tx: mpsc::UnboundedSender<RouteArrival>,

    /// Lifecycle event channel
    pub(super) events: EventBus,

    /// Events queued by the current operation, emitted by `flush_events`
    pub(super) pending_events: Vec<TourEvent>,

    /// When the current Settled phase began (auto-advance dwell)
    pub(super) settled_at: Option<Instant>,

    /// Path of completed legs, for the traveled polyline
    pub(super) traveled: Vec<LatLng>,
}

impl PlaybackController {
    /// Create a controller for a validated waypoint sequence
    ///
    /// Markers start on the first waypoint in phase `Idle`.
    pub fn new(
        waypoints: WaypointSequence,
        markers: Vec<MarkerSpec>,
        resolver: Arc<RouteResolver>,
        config: TourConfig,
        events: EventBus,
    ) -> (Self, RouteArrivals) {
        let (arrivals_tx, arrivals_rx) = mpsc::unbounded_channel();
        let start = waypoints.first().position();

        info!(
            waypoints = waypoints.len(),
            markers = markers.len().max(1),
            leg_duration_ms = config.animation.leg_duration().as_millis() as u64,
            auto_advance = config.animation.auto_advance,
            "Creating playback controller"
        );

        let controller = Self {
            markers: MarkerSet::new(markers, config.markers.jitter_radius_m, start),
            camera: CameraSync::new(&config.camera),
            waypoints,
            config,
            state: PlaybackState::new(),
            scheduler: AnimationScheduler::new(),
            resolver,
            arrivals_tx,
            events,
            pending_events: Vec::new(),
            settled_at: None,
            traveled: Vec::new(),
        };
        (controller, arrivals_rx)
    }

    /// Create a controller from raw waypoints
    ///
    /// # Errors
    /// `InvalidWaypointSequence` (fatal) when the list is empty or malformed.
    pub fn from_waypoints(
        waypoints: Vec<Waypoint>,
        markers: Vec<MarkerSpec>,
        resolver: Arc<RouteResolver>,
        config: TourConfig,
        events: EventBus,
    ) -> Result<(Self, RouteArrivals)> {
        let sequence = WaypointSequence::new(waypoints)?;
        Ok(Self::new(sequence, markers, resolver, config, events))
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.current_index
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn request_generation(&self) -> u64 {
        self.state.request_generation
    }

    pub fn waypoints(&self) -> &WaypointSequence {
        &self.waypoints
    }

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<RouteResolver> {
        &self.resolver
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current marker positions
    pub fn marker_positions(&self) -> Vec<MarkerSnapshot> {
        self.markers.snapshots()
    }

    pub fn camera_target(&self) -> Option<CameraTarget> {
        self.camera.target()
    }

    /// Visited path: completed legs plus the covered part of the active leg
    pub fn traveled_path(&self) -> Vec<LatLng> {
        let mut path = self.traveled.clone();
        if matches!(self.state.phase, Phase::Animating | Phase::Paused) {
            if let Some(route) = &self.state.active_route {
                for point in traveled_prefix(&route.path, self.state.progress) {
                    if path.last() != Some(&point) {
                        path.push(point);
                    }
                }
            }
        }
        path
    }

    /// Read-only view for UI layers
    pub fn snapshot(&self) -> TourSnapshot {
        TourSnapshot {
            phase: self.state.phase,
            current_index: self.state.signed_index(),
            progress: self.state.progress,
            request_generation: self.state.request_generation,
            active_leg: self.state.active_leg(),
            route_is_fallback: self
                .state
                .active_route
                .as_ref()
                .map(|r| r.is_fallback)
                .unwrap_or(false),
            markers: self.markers.snapshots(),
            camera: self.camera.target(),
            zoom: self.camera.zoom_for(self.state.phase),
            traveled_path: self.traveled_path(),
        }
    }

    /// Position of a waypoint by index
    pub(super) fn waypoint_position(&self, index: usize) -> Option<LatLng> {
        self.waypoints.get(index).map(Waypoint::position)
    }

    /// Bump the generation, invalidating in-flight requests and sessions
    pub(super) fn next_generation(&mut self) -> u64 {
        self.state.request_generation += 1;
        self.state.request_generation
    }

    /// Change phase, queueing a PhaseChanged event when it differs
    pub(super) fn transition(&mut self, new_phase: Phase) {
        let old_phase = self.state.phase;
        if old_phase == new_phase {
            return;
        }
        self.state.phase = new_phase;
        debug!("Phase {} -> {}", old_phase, new_phase);
        self.pending_events.push(TourEvent::PhaseChanged {
            old_phase,
            new_phase,
            generation: self.state.request_generation,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn queue_event(&mut self, event: TourEvent) {
        self.pending_events.push(event);
    }

    /// Emit queued events, after the operation has updated all state
    pub(super) fn flush_events(&mut self) {
        for event in self.pending_events.drain(..) {
            self.events.emit_lossy(event);
        }
    }

    /// StepSettled event for a waypoint
    pub(super) fn step_settled_event(&self, index: usize) -> Option<TourEvent> {
        let waypoint = self.waypoints.get(index)?;
        Some(TourEvent::StepSettled {
            index,
            waypoint_id: waypoint.id.clone(),
            waypoint_name: waypoint.name.clone(),
            timestamp: chrono::Utc::now(),
        })
    }
}
