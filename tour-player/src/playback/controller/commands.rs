//! User commands
//!
//! Every command runs to completion synchronously, updates all state it
//! touches, and only then emits its events. Commands that do not apply in
//! the current phase are ignored with a debug log, never reported as errors.

use super::core::PlaybackController;
use crate::playback::scheduler::interpolate_along;
use tokio::time::Instant;
use tour_common::events::{Phase, TourEvent};
use tour_common::{LatLng, WaypointSequence};
use tracing::{debug, info, warn};

impl PlaybackController {
    /// Start the tour or the next leg
    ///
    /// From `Idle` departs the first waypoint; from `Settled` departs the
    /// current waypoint. Ignored in every other phase.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub(super) fn start_at(&mut self, now: Instant) {
        let last = self.waypoints.last_index();
        match (self.state.phase, self.state.current_index) {
            (Phase::Idle, _) if last == 0 => self.complete_single_stop(),
            (Phase::Idle, _) => self.begin_leg(0, now),
            (Phase::Settled, Some(index)) if index < last => self.begin_leg(index, now),
            (phase, index) => {
                debug!(phase = %phase, ?index, "start() ignored");
            }
        }
        self.flush_events();
    }

    /// Freeze the running leg
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub(super) fn pause_at(&mut self, now: Instant) {
        if self.state.phase != Phase::Animating {
            debug!(phase = %self.state.phase, "pause() ignored");
            return;
        }
        let Some(progress) = self.scheduler.pause(now) else {
            debug!("pause() found no running session");
            return;
        };

        self.state.progress = self.state.progress.max(progress);
        if let Some(position) = self
            .state
            .active_route
            .as_ref()
            .and_then(|route| interpolate_along(&route.path, self.state.progress))
        {
            self.markers.update(position);
        }
        self.transition(Phase::Paused);
        info!(progress = self.state.progress, "Playback paused");
        self.flush_events();
    }

    /// Continue a paused leg from its frozen progress
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    pub(super) fn resume_at(&mut self, now: Instant) {
        if self.state.phase != Phase::Paused {
            debug!(phase = %self.state.phase, "resume() ignored");
            return;
        }
        if self.scheduler.resume(now).is_none() {
            debug!("resume() found no paused session");
            return;
        }
        self.camera.rearm();
        self.transition(Phase::Animating);
        info!(progress = self.state.progress, "Playback resumed");
        self.flush_events();
    }

    /// Play/Pause button: pause while animating, resume while paused,
    /// otherwise start
    pub fn toggle_play(&mut self) {
        match self.state.phase {
            Phase::Animating => self.pause(),
            Phase::Paused => self.resume(),
            _ => self.start(),
        }
    }

    /// Return to `Idle` from any phase
    ///
    /// Invalidates in-flight route requests, cancels the scheduler, clears
    /// pins and places markers back on the first waypoint.
    pub fn reset(&mut self) {
        let generation = self.next_generation();
        self.scheduler.cancel();
        let cleared = self.markers.clear_pins();

        self.state.current_index = None;
        self.state.progress = 0.0;
        self.state.active_route = None;
        self.settled_at = None;
        self.traveled.clear();
        self.markers.update(self.waypoints.first().position());

        self.transition(Phase::Idle);
        self.queue_event(TourEvent::TourReset {
            generation,
            timestamp: chrono::Utc::now(),
        });
        info!(generation, pins_cleared = cleared, "Tour reset");
        self.flush_events();
    }

    /// Jump straight to a waypoint without animating (locate shortcut)
    ///
    /// Settles at `index`. Locating the last waypoint completes the tour,
    /// since no leg departs from there. Out-of-range indices are ignored.
    pub fn on_external_step_change(&mut self, index: usize) {
        let Some(position) = self.waypoint_position(index) else {
            warn!(
                index,
                waypoints = self.waypoints.len(),
                "Ignoring external step change: index out of range"
            );
            return;
        };

        let generation = self.next_generation();
        self.scheduler.cancel();

        self.state.current_index = Some(index);
        self.state.progress = 1.0;
        self.state.active_route = None;
        self.settled_at = None;
        self.traveled = vec![position];
        self.markers.update(position);

        let last = index >= self.waypoints.last_index();
        self.transition(if last { Phase::Complete } else { Phase::Settled });
        if let Some(event) = self.step_settled_event(index) {
            self.queue_event(event);
        }
        if last {
            self.queue_event(TourEvent::TourComplete {
                waypoints: self.waypoints.len(),
                timestamp: chrono::Utc::now(),
            });
        }
        info!(index, generation, complete = last, "Jumped to waypoint");
        self.flush_events();
    }

    /// Pin a marker at `position` until the next leg starts
    ///
    /// Returns false for unknown ids or invalid coordinates.
    pub fn pin_marker(&mut self, id: &str, position: LatLng) -> bool {
        if !position.is_valid() {
            warn!(marker = id, %position, "Ignoring pin: invalid coordinates");
            return false;
        }
        if !self.markers.pin(id, position) {
            warn!(marker = id, "Ignoring pin: unknown marker");
            return false;
        }
        debug!(marker = id, %position, "Marker pinned");
        true
    }

    /// Release a pinned marker
    pub fn unpin_marker(&mut self, id: &str) -> bool {
        if !self.markers.unpin(id) {
            warn!(marker = id, "Ignoring unpin: unknown marker");
            return false;
        }
        debug!(marker = id, "Marker unpinned");
        true
    }

    /// Install a new waypoint sequence
    ///
    /// Only from `Idle` or `Complete`; the route cache is invalidated and the
    /// controller returns to `Idle` on the new first waypoint. Returns false
    /// when ignored.
    pub fn replace_waypoints(&mut self, waypoints: WaypointSequence) -> bool {
        if !matches!(self.state.phase, Phase::Idle | Phase::Complete) {
            debug!(phase = %self.state.phase, "replace_waypoints() ignored during a tour");
            return false;
        }

        self.resolver.invalidate();
        self.waypoints = waypoints;
        self.next_generation();
        self.scheduler.cancel();
        self.markers.clear_pins();

        self.state.current_index = None;
        self.state.progress = 0.0;
        self.state.active_route = None;
        self.settled_at = None;
        self.traveled.clear();
        self.markers.update(self.waypoints.first().position());

        self.transition(Phase::Idle);
        let count = self.waypoints.len();
        self.queue_event(TourEvent::WaypointsReplaced {
            count,
            timestamp: chrono::Utc::now(),
        });
        info!(waypoints = count, "Waypoint sequence replaced");
        self.flush_events();
        true
    }

    /// Tour with a single stop: nothing to animate
    fn complete_single_stop(&mut self) {
        let position = self.waypoints.first().position();
        self.next_generation();
        self.state.current_index = Some(0);
        self.state.progress = 1.0;
        self.traveled = vec![position];
        self.markers.update(position);

        self.transition(Phase::Complete);
        if let Some(event) = self.step_settled_event(0) {
            self.queue_event(event);
        }
        self.queue_event(TourEvent::TourComplete {
            waypoints: 1,
            timestamp: chrono::Utc::now(),
        });
        info!("Single-stop tour complete");
    }
}
