//! Leg progression - route requests, frames and settling
//!
//! **Flow per leg:**
//! ```text
//! begin_leg ──cache hit──────────────────────────┐
//!     │                                           ▼
//!     └─spawn resolve ─> on_route_arrival ─> begin_animation ─> tick* ─> settle_leg
//! ```
//!
//! Arrivals and frames carry the generation active when they were produced;
//! anything from an older generation is dropped before touching state.

use super::core::PlaybackController;
use crate::playback::state::RouteArrival;
use std::sync::Arc;
use tokio::time::Instant;
use tour_common::events::{ErrorKind, Phase, TourEvent};
use tour_common::{LatLng, LegKey, Route};
use tracing::{debug, info, warn};

impl PlaybackController {
    /// Request the route for the leg departing `from` and await it
    ///
    /// A cached route starts animating within the same call.
    pub(super) fn begin_leg(&mut self, from: usize, now: Instant) {
        let leg = LegKey::departing(from);
        let (Some(origin), Some(destination)) =
            (self.waypoint_position(leg.from), self.waypoint_position(leg.to))
        else {
            debug!(leg = %leg, "No leg departs the last waypoint");
            return;
        };

        let generation = self.next_generation();
        self.scheduler.cancel();
        self.settled_at = None;
        self.state.current_index = Some(from);
        self.state.progress = 0.0;
        self.state.active_route = None;

        if let Some(route) = self.resolver.cached(leg) {
            debug!(leg = %leg, generation, "Route cached, animating at once");
            self.begin_animation(route, now);
            return;
        }

        self.transition(Phase::AwaitingRoute);
        info!(leg = %leg, generation, "Requesting route");

        let resolver = Arc::clone(&self.resolver);
        let arrivals = self.arrivals_tx.clone();
        tokio::spawn(async move {
            let resolution = resolver.resolve(leg, origin, destination).await;
            let arrival = RouteArrival {
                generation,
                leg,
                resolution,
            };
            if arrivals.send(arrival).is_err() {
                debug!(leg = %leg, "Route arrived after the controller stopped");
            }
        });
    }

    /// Apply a route resolution
    ///
    /// Ignored unless it answers the request of the current generation.
    pub fn on_route_arrival(&mut self, arrival: RouteArrival) {
        self.on_route_arrival_at(arrival, Instant::now());
    }

    pub(super) fn on_route_arrival_at(&mut self, arrival: RouteArrival, now: Instant) {
        let RouteArrival {
            generation,
            leg,
            resolution,
        } = arrival;

        if generation != self.state.request_generation
            || self.state.phase != Phase::AwaitingRoute
            || self.state.active_leg() != Some(leg)
        {
            debug!(
                leg = %leg,
                generation,
                current_generation = self.state.request_generation,
                phase = %self.state.phase,
                "Dropping stale route arrival"
            );
            return;
        }

        if let Some(degradation) = &resolution.degradation {
            warn!(leg = %leg, reason = %degradation, "Animating straight-line fallback");
            self.queue_event(TourEvent::TourError {
                kind: ErrorKind::RouteDegraded,
                leg: Some(leg),
                detail: degradation.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }

        self.begin_animation(resolution.route, now);
        self.flush_events();
    }

    /// Start the scheduler session for a resolved leg
    fn begin_animation(&mut self, route: Route, now: Instant) {
        let leg = route.leg;
        let duration = self.config.animation.leg_duration();
        let generation = self.state.request_generation;

        let cleared = self.markers.clear_pins();
        if cleared > 0 {
            debug!(cleared, "Cleared marker pins for new leg");
        }

        self.scheduler
            .start(Arc::clone(&route.path), duration, 0.0, generation, now);
        if let Some(origin) = route.origin() {
            self.markers.update(origin);
        }
        self.camera.rearm();

        let is_fallback = route.is_fallback;
        let points = route.path.len();
        self.state.progress = 0.0;
        self.state.active_route = Some(route);
        self.transition(Phase::Animating);
        self.queue_event(TourEvent::LegStarted {
            leg,
            is_fallback,
            points,
            duration_ms: duration.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });
        info!(leg = %leg, points, is_fallback, "Leg animating");

        self.prefetch_after(leg);
    }

    fn prefetch_after(&self, leg: LegKey) {
        if !self.config.routing.prefetch_next_leg || leg.to >= self.waypoints.last_index() {
            return;
        }
        let next = LegKey::departing(leg.to);
        if let (Some(origin), Some(destination)) =
            (self.waypoint_position(next.from), self.waypoint_position(next.to))
        {
            self.resolver.prefetch(next, origin, destination);
        }
    }

    /// Advance one frame
    ///
    /// Moves markers and camera while animating, settles the leg on its last
    /// frame and performs auto-advance once the dwell has elapsed. Returns
    /// true when state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = match self.state.phase {
            Phase::Animating => self.animate_frame(now),
            Phase::Settled => self.auto_advance(now),
            _ => false,
        };
        self.flush_events();
        changed
    }

    fn animate_frame(&mut self, now: Instant) -> bool {
        let Some(frame) = self.scheduler.tick(now) else {
            return false;
        };
        if frame.token != self.state.request_generation {
            debug!(
                token = frame.token,
                generation = self.state.request_generation,
                "Dropping frame from superseded session"
            );
            return false;
        }

        self.state.progress = self.state.progress.max(frame.progress);
        self.markers.update(frame.position);

        let path: &[LatLng] = self
            .state
            .active_route
            .as_ref()
            .map(|route| &route.path[..])
            .unwrap_or(&[]);
        self.camera
            .observe(self.state.phase, now, self.markers.bounds(), path);

        if frame.completed {
            self.settle_leg(now);
        }
        true
    }

    fn auto_advance(&mut self, now: Instant) -> bool {
        if !self.config.animation.auto_advance {
            return false;
        }
        let Some(settled_at) = self.settled_at else {
            return false;
        };
        if now.saturating_duration_since(settled_at) < self.config.animation.pause_duration() {
            return false;
        }
        match self.state.current_index {
            Some(index) if index < self.waypoints.last_index() => {
                debug!(index, "Auto-advancing");
                self.begin_leg(index, now);
                true
            }
            _ => false,
        }
    }

    /// Leg reached progress 1
    fn settle_leg(&mut self, now: Instant) {
        let Some(route) = self.state.active_route.as_ref() else {
            return;
        };
        let arrived = route.leg.to;
        for point in route.path.iter() {
            if self.traveled.last() != Some(point) {
                self.traveled.push(*point);
            }
        }

        self.state.current_index = Some(arrived);
        self.state.progress = 1.0;
        if let Some(position) = self.waypoint_position(arrived) {
            self.markers.update(position);
        }

        let step = self.step_settled_event(arrived);
        if arrived >= self.waypoints.last_index() {
            self.transition(Phase::Complete);
            self.queue_events(step);
            self.queue_event(TourEvent::TourComplete {
                waypoints: self.waypoints.len(),
                timestamp: chrono::Utc::now(),
            });
            info!(index = arrived, "Tour complete");
        } else {
            self.settled_at = Some(now);
            self.transition(Phase::Settled);
            self.queue_events(step);
            info!(index = arrived, "Step settled");
        }
    }

    fn queue_events(&mut self, events: impl IntoIterator<Item = TourEvent>) {
        for event in events {
            self.queue_event(event);
        }
    }
}
