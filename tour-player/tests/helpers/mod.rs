//! Test helpers for tour-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - MockRouter: scriptable routing service that counts calls
//! - Waypoint and config builders
//! - Controller setup and leg driving on a paused tokio clock

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tour_common::config::TourConfig;
use tour_common::events::{EventBus, Phase, TourEvent};
use tour_common::route::straight_path;
use tour_common::{LatLng, Waypoint, WaypointSequence};
use tour_player::playback::{MarkerSpec, PlaybackController, RouteArrivals};
use tour_player::routing::{RouteRequest, RoutingFailure};
use tour_player::{RouteResolver, RoutingService};

/// Leg duration used by `test_config`
pub const LEG_MS: u64 = 1000;

/// How the mock answers
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Straight line with the given number of points
    Straight(usize),
    /// Return exactly these points
    Points(Vec<LatLng>),
    /// Always fail with the given reason
    Fail(RoutingFailure),
    /// Never answer (exercises the resolver timeout)
    Hang,
}

/// Scriptable routing service
pub struct MockRouter {
    behavior: Behavior,
    latency: Duration,
    calls: AtomicU64,
}

impl MockRouter {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_latency(behavior, Duration::ZERO)
    }

    pub fn with_latency(behavior: Behavior, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            latency,
            calls: AtomicU64::new(0),
        })
    }

    pub fn straight() -> Arc<Self> {
        Self::new(Behavior::Straight(11))
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingService for MockRouter {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn route(&self, request: &RouteRequest) -> Result<Vec<LatLng>, RoutingFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.behavior {
            Behavior::Straight(points) => {
                Ok(straight_path(request.origin, request.destination, *points))
            }
            Behavior::Points(points) => Ok(points.clone()),
            Behavior::Fail(reason) => Err(reason.clone()),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// `n` waypoints walking north-east from Circular Quay
pub fn waypoints(n: usize) -> WaypointSequence {
    let stops = (0..n)
        .map(|i| {
            Waypoint::new(
                format!("wp-{i}"),
                format!("Stop {i}"),
                -33.8610 + i as f64 * 0.002,
                151.2106 + i as f64 * 0.001,
            )
        })
        .collect();
    WaypointSequence::new(stops).expect("valid test waypoints")
}

/// Deterministic config: 1s legs, no jitter, no prefetch
pub fn test_config() -> TourConfig {
    let mut config = TourConfig::default();
    config.animation.leg_duration_ms = LEG_MS;
    config.animation.frame_interval_ms = 10;
    config.animation.pause_duration_ms = 500;
    config.markers.jitter_radius_m = 0.0;
    config.routing.prefetch_next_leg = false;
    config.routing.timeout_ms = 2000;
    config.camera.recenter_interval_ms = 0;
    config
}

/// Controller under test with its arrival channel and an event subscription
pub struct Harness {
    pub controller: PlaybackController,
    pub arrivals: RouteArrivals,
    pub events: broadcast::Receiver<TourEvent>,
    pub resolver: Arc<RouteResolver>,
}

impl Harness {
    pub fn new(n: usize, router: Arc<MockRouter>, config: TourConfig) -> Self {
        Self::with_markers(n, router, config, Vec::new())
    }

    pub fn with_markers(
        n: usize,
        router: Arc<MockRouter>,
        config: TourConfig,
        markers: Vec<MarkerSpec>,
    ) -> Self {
        let resolver = Arc::new(RouteResolver::new(
            router,
            config.routing.timeout(),
            config.routing.fallback_points,
        ));
        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let (controller, arrivals) =
            PlaybackController::new(waypoints(n), markers, Arc::clone(&resolver), config, bus);
        Self {
            controller,
            arrivals,
            events,
            resolver,
        }
    }

    /// Wait for the pending route and hand it to the controller
    pub async fn deliver_route(&mut self) {
        let arrival = self.arrivals.recv().await.expect("arrival channel open");
        self.controller.on_route_arrival(arrival);
    }

    /// Complete the current leg: deliver the route if needed, then tick
    /// through the full leg duration
    pub async fn finish_leg(&mut self) {
        if self.controller.phase() == Phase::AwaitingRoute {
            self.deliver_route().await;
        }
        assert_eq!(self.controller.phase(), Phase::Animating);
        let leg = Duration::from_millis(LEG_MS);
        for _ in 0..4 {
            tokio::time::advance(leg / 4).await;
            self.controller.tick(Instant::now());
        }
    }

    /// `start()` followed by a full leg
    pub async fn play_leg(&mut self) {
        self.controller.start();
        self.finish_leg().await;
    }

    /// Events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<TourEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Event type names, for compact ordering assertions
pub fn event_types(events: &[TourEvent]) -> Vec<&'static str> {
    events.iter().map(TourEvent::event_type).collect()
}

pub fn settled_indices(events: &[TourEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            TourEvent::StepSettled { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}
