//! Playback controller integration tests
//!
//! Drive the controller directly on a paused tokio clock: route arrivals are
//! delivered by hand and frames are ticked at chosen instants, so every
//! transition is deterministic.

mod helpers;

use helpers::{event_types, settled_indices, Behavior, Harness, MockRouter, LEG_MS};
use std::time::Duration;
use tokio::time::{advance, Instant};
use tour_common::events::{ErrorKind, Phase, TourEvent};
use tour_common::{LatLng, LegKey};
use tour_player::playback::{MarkerSpec, PlaybackController};
use tour_player::routing::RoutingFailure;
use tour_player::Error;

const EPS: f64 = 1e-9;

fn tour_marker(h: &Harness) -> LatLng {
    h.controller.marker_positions()[0].position
}

// ================================================================================================
// Lifecycle
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_three_stop_tour_scenario() {
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());
    assert_eq!(h.controller.phase(), Phase::Idle);
    assert_eq!(h.controller.snapshot().current_index, -1);

    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::AwaitingRoute);
    assert_eq!(h.controller.current_index(), Some(0));
    assert_eq!(h.controller.state().active_leg(), Some(LegKey::new(0, 1)));

    h.deliver_route().await;
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert_eq!(h.controller.progress(), 0.0);

    advance(Duration::from_millis(LEG_MS / 2)).await;
    h.controller.tick(Instant::now());
    assert!((h.controller.progress() - 0.5).abs() < EPS);

    advance(Duration::from_millis(LEG_MS / 2)).await;
    h.controller.tick(Instant::now());
    assert_eq!(h.controller.phase(), Phase::Settled);
    assert_eq!(h.controller.current_index(), Some(1));
    assert_eq!(h.controller.progress(), 1.0);

    let events = h.drain_events();
    assert_eq!(settled_indices(&events), vec![1]);
    assert_eq!(
        event_types(&events),
        vec!["PhaseChanged", "PhaseChanged", "LegStarted", "PhaseChanged", "StepSettled"]
    );

    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::AwaitingRoute);
    assert_eq!(h.controller.state().active_leg(), Some(LegKey::new(1, 2)));
    h.finish_leg().await;

    assert_eq!(h.controller.phase(), Phase::Complete);
    assert_eq!(h.controller.current_index(), Some(2));
    assert_eq!(h.controller.progress(), 1.0);
    let events = h.drain_events();
    assert_eq!(settled_indices(&events), vec![2]);
    assert_eq!(event_types(&events).last(), Some(&"TourComplete"));

    h.controller.reset();
    assert_eq!(h.controller.phase(), Phase::Idle);
    assert_eq!(h.controller.current_index(), None);
    assert_eq!(h.controller.snapshot().current_index, -1);
}

#[tokio::test(start_paused = true)]
async fn test_n_minus_one_cycles_complete_tour() {
    for n in 2..=6 {
        let mut h = Harness::new(n, MockRouter::straight(), helpers::test_config());
        for _ in 0..n - 1 {
            assert_ne!(h.controller.phase(), Phase::Complete);
            h.play_leg().await;
        }
        assert_eq!(h.controller.phase(), Phase::Complete, "n = {n}");
        assert_eq!(h.controller.current_index(), Some(n - 1));

        let events = h.drain_events();
        assert_eq!(settled_indices(&events), (1..n).collect::<Vec<_>>());
        let completes = events
            .iter()
            .filter(|e| matches!(e, TourEvent::TourComplete { .. }))
            .count();
        assert_eq!(completes, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_waypoint_completes_on_start() {
    let mut h = Harness::new(1, MockRouter::straight(), helpers::test_config());
    h.controller.start();

    assert_eq!(h.controller.phase(), Phase::Complete);
    assert_eq!(h.controller.current_index(), Some(0));
    assert_eq!(h.controller.progress(), 1.0);
    assert_eq!(h.resolver.requests_issued(), 0);

    let events = h.drain_events();
    assert_eq!(
        event_types(&events),
        vec!["PhaseChanged", "StepSettled", "TourComplete"]
    );
}

#[test]
fn test_empty_sequence_is_fatal() {
    let resolver = std::sync::Arc::new(tour_player::RouteResolver::new(
        MockRouter::straight(),
        Duration::from_secs(1),
        2,
    ));
    let result = PlaybackController::from_waypoints(
        Vec::new(),
        Vec::new(),
        resolver,
        helpers::test_config(),
        tour_common::events::EventBus::default(),
    );
    assert!(matches!(
        result,
        Err(Error::Common(tour_common::Error::InvalidWaypointSequence(_)))
    ));
}

// ================================================================================================
// Progress, pause and resume
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_progress_is_monotonic() {
    let mut h = Harness::new(2, MockRouter::straight(), helpers::test_config());
    h.controller.start();
    h.deliver_route().await;

    let mut last = 0.0;
    for step in 1..=20 {
        advance(Duration::from_millis(LEG_MS / 20)).await;
        h.controller.tick(Instant::now());
        let progress = h.controller.progress();
        assert!(progress >= last, "step {step}: {progress} < {last}");
        last = progress;
    }

    // A late frame stamped before the previous one must not move backwards
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());
    h.controller.start();
    h.deliver_route().await;
    let t0 = Instant::now();
    h.controller.tick(t0 + Duration::from_millis(600));
    h.controller.tick(t0 + Duration::from_millis(300));
    assert!((h.controller.progress() - 0.6).abs() < EPS);
}

#[tokio::test(start_paused = true)]
async fn test_pause_resume_preserves_progress() {
    let mut h = Harness::new(2, MockRouter::straight(), helpers::test_config());
    h.controller.start();
    h.deliver_route().await;

    advance(Duration::from_millis(400)).await;
    h.controller.tick(Instant::now());
    h.controller.pause();
    assert_eq!(h.controller.phase(), Phase::Paused);
    let frozen = h.controller.progress();
    assert!((frozen - 0.4).abs() < EPS);
    let frozen_marker = tour_marker(&h);

    advance(Duration::from_secs(10)).await;
    assert!(!h.controller.tick(Instant::now()));
    assert_eq!(h.controller.progress(), frozen);
    assert_eq!(tour_marker(&h), frozen_marker);

    h.controller.resume();
    assert_eq!(h.controller.phase(), Phase::Animating);
    h.controller.tick(Instant::now());
    assert!((h.controller.progress() - frozen).abs() < 1e-6);

    advance(Duration::from_millis(100)).await;
    h.controller.tick(Instant::now());
    assert!((h.controller.progress() - 0.5).abs() < 1e-6);

    advance(Duration::from_millis(500)).await;
    h.controller.tick(Instant::now());
    assert_eq!(h.controller.phase(), Phase::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_transitions_are_ignored() {
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());

    h.controller.pause();
    h.controller.resume();
    assert_eq!(h.controller.phase(), Phase::Idle);
    assert!(h.drain_events().is_empty());

    h.controller.start();
    h.deliver_route().await;
    h.drain_events();

    h.controller.start();
    h.controller.resume();
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert!(h.drain_events().is_empty());

    h.controller.pause();
    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_play() {
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());
    h.controller.toggle_play();
    assert_eq!(h.controller.phase(), Phase::AwaitingRoute);
    h.deliver_route().await;

    h.controller.toggle_play();
    assert_eq!(h.controller.phase(), Phase::Paused);
    h.controller.toggle_play();
    assert_eq!(h.controller.phase(), Phase::Animating);
}

// ================================================================================================
// Reset and stale work
// ================================================================================================

async fn harness_in(phase: Phase) -> Harness {
    let specs = vec![MarkerSpec::new("deb", "Deb"), MarkerSpec::new("sam", "Sam")];
    let router = MockRouter::with_latency(Behavior::Straight(5), Duration::from_millis(50));
    let mut h = Harness::with_markers(3, router, helpers::test_config(), specs);

    match phase {
        Phase::Idle => {}
        Phase::AwaitingRoute => h.controller.start(),
        Phase::Animating => {
            h.controller.start();
            h.deliver_route().await;
            advance(Duration::from_millis(300)).await;
            h.controller.tick(Instant::now());
        }
        Phase::Paused => {
            h.controller.start();
            h.deliver_route().await;
            advance(Duration::from_millis(300)).await;
            h.controller.tick(Instant::now());
            h.controller.pause();
        }
        Phase::Settled => h.play_leg().await,
        Phase::Complete => {
            h.play_leg().await;
            h.play_leg().await;
        }
    }
    assert_eq!(h.controller.phase(), phase);
    assert!(h.controller.pin_marker("sam", LatLng::new(-33.87, 151.20)));
    h
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_any_phase() {
    for phase in [
        Phase::Idle,
        Phase::AwaitingRoute,
        Phase::Animating,
        Phase::Paused,
        Phase::Settled,
        Phase::Complete,
    ] {
        let mut h = harness_in(phase).await;
        let generation = h.controller.request_generation();
        h.drain_events();

        h.controller.reset();

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle, "from {phase}");
        assert_eq!(snapshot.current_index, -1);
        assert_eq!(snapshot.progress, 0.0);
        assert!(snapshot.active_leg.is_none());
        assert!(snapshot.traveled_path.is_empty());
        assert!(snapshot.markers.iter().all(|m| !m.pinned), "pins survive reset from {phase}");
        let first = h.controller.waypoints().first().position();
        assert!(snapshot.markers.iter().all(|m| m.position == first));
        assert!(h.controller.request_generation() > generation);

        let events = h.drain_events();
        assert!(matches!(events.last(), Some(TourEvent::TourReset { .. })));
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_arrival_after_reset_is_dropped() {
    let router = MockRouter::with_latency(Behavior::Straight(5), Duration::from_millis(200));
    let mut h = Harness::new(3, router, helpers::test_config());

    h.controller.start();
    h.controller.reset();
    let before = h.controller.state().clone();
    h.drain_events();

    // The request completes after the reset
    h.deliver_route().await;

    assert_eq!(h.controller.state(), &before);
    assert_eq!(h.controller.phase(), Phase::Idle);
    assert!(h.controller.state().active_route.is_none());
    assert!(h.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_arrival_for_previous_leg_is_dropped() {
    let router = MockRouter::with_latency(Behavior::Straight(5), Duration::from_millis(200));
    let mut h = Harness::new(4, router, helpers::test_config());

    h.controller.start();
    h.controller.on_external_step_change(2);
    h.controller.start();
    assert_eq!(h.controller.state().active_leg(), Some(LegKey::new(2, 3)));

    // One of the two arrivals answers leg 0->1 under an old generation
    h.deliver_route().await;
    h.deliver_route().await;
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert_eq!(
        h.controller.state().active_route.as_ref().map(|r| r.leg),
        Some(LegKey::new(2, 3))
    );
}

// ================================================================================================
// Routing: dedup, cache, fallback
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_double_start_issues_one_request() {
    let router = MockRouter::with_latency(Behavior::Straight(5), Duration::from_millis(100));
    let mut h = Harness::new(3, router.clone(), helpers::test_config());

    h.controller.start();
    h.controller.start();
    let generation = h.controller.request_generation();
    h.deliver_route().await;

    assert_eq!(h.controller.phase(), Phase::Animating);
    assert_eq!(h.controller.request_generation(), generation);
    assert_eq!(h.resolver.requests_issued(), 1);
    assert_eq!(router.calls(), 1);
    assert!(h.arrivals.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_cached_route_skips_awaiting() {
    let router = MockRouter::straight();
    let mut h = Harness::new(3, router.clone(), helpers::test_config());
    h.play_leg().await;
    h.controller.reset();
    h.drain_events();

    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert_eq!(router.calls(), 1);

    let events = h.drain_events();
    assert_eq!(event_types(&events), vec!["PhaseChanged", "LegStarted"]);
    assert!(matches!(
        events[0],
        TourEvent::PhaseChanged {
            old_phase: Phase::Idle,
            new_phase: Phase::Animating,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_routing_failure_animates_fallback() {
    let router = MockRouter::new(Behavior::Fail(RoutingFailure::ZeroResults));
    let mut h = Harness::new(3, router.clone(), helpers::test_config());

    h.controller.start();
    h.deliver_route().await;

    assert_eq!(h.controller.phase(), Phase::Animating);
    let route = h.controller.state().active_route.clone().expect("active route");
    assert!(route.is_fallback);
    assert_eq!(route.path.first(), Some(&h.controller.waypoints().first().position()));
    assert_eq!(
        route.path.last(),
        h.controller.waypoints().get(1).map(|w| w.position()).as_ref()
    );
    assert!(h.controller.snapshot().route_is_fallback);

    let events = h.drain_events();
    let error = events
        .iter()
        .find(|e| matches!(e, TourEvent::TourError { .. }))
        .expect("TourError emitted");
    match error {
        TourEvent::TourError { kind, leg, detail, .. } => {
            assert_eq!(*kind, ErrorKind::RouteDegraded);
            assert_eq!(*leg, Some(LegKey::new(0, 1)));
            assert!(detail.contains("zero results"));
        }
        _ => unreachable!(),
    }

    // Playback still completes the leg
    h.finish_leg().await;
    assert_eq!(h.controller.phase(), Phase::Settled);

    // Fallbacks are not cached: the next tour asks again
    h.controller.reset();
    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::AwaitingRoute);
    h.deliver_route().await;
    assert_eq!(router.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_route_timeout_falls_back() {
    let mut config = helpers::test_config();
    config.routing.timeout_ms = 300;
    let mut h = Harness::new(2, MockRouter::new(Behavior::Hang), config);

    h.controller.start();
    let requested = Instant::now();
    h.deliver_route().await;

    assert!(Instant::now() - requested >= Duration::from_millis(300));
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert!(h.controller.snapshot().route_is_fallback);
    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        TourEvent::TourError { detail, .. } if detail.contains("timed out")
    )));
}

#[tokio::test(start_paused = true)]
async fn test_next_leg_is_prefetched() {
    let mut config = helpers::test_config();
    config.routing.prefetch_next_leg = true;
    let router = MockRouter::straight();
    let mut h = Harness::new(3, router.clone(), config);

    h.controller.start();
    h.deliver_route().await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(h.resolver.cached(LegKey::new(1, 2)).is_some());

    h.finish_leg().await;
    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::Animating);
    assert_eq!(router.calls(), 2);
}

// ================================================================================================
// Markers, camera, traveled path
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_pins_hold_until_next_leg() {
    let specs = vec![MarkerSpec::new("deb", "Deb"), MarkerSpec::new("sam", "Sam")];
    let mut h = Harness::with_markers(3, MockRouter::straight(), helpers::test_config(), specs);
    h.play_leg().await;

    let dragged = LatLng::new(-33.85, 151.22);
    assert!(h.controller.pin_marker("sam", dragged));
    assert!(!h.controller.pin_marker("nobody", dragged));
    assert!(!h.controller.pin_marker("deb", LatLng::new(f64::NAN, 0.0)));

    h.controller.start();
    // Still pinned while the route is pending
    let sam = |h: &Harness| {
        h.controller
            .marker_positions()
            .into_iter()
            .find(|m| m.id == "sam")
            .expect("sam marker")
    };
    assert!(sam(&h).pinned);
    assert_eq!(sam(&h).position, dragged);

    h.deliver_route().await;
    assert!(!sam(&h).pinned);
    advance(Duration::from_millis(500)).await;
    h.controller.tick(Instant::now());
    assert_ne!(sam(&h).position, dragged);
}

#[tokio::test(start_paused = true)]
async fn test_pinned_marker_ignores_frames() {
    let specs = vec![MarkerSpec::new("deb", "Deb"), MarkerSpec::new("sam", "Sam")];
    let mut h = Harness::with_markers(2, MockRouter::straight(), helpers::test_config(), specs);
    h.controller.start();
    h.deliver_route().await;

    let dragged = LatLng::new(-33.85, 151.22);
    h.controller.pin_marker("deb", dragged);
    advance(Duration::from_millis(500)).await;
    h.controller.tick(Instant::now());

    let markers = h.controller.marker_positions();
    assert_eq!(markers[0].position, dragged);
    assert_ne!(markers[1].position, dragged);

    assert!(h.controller.unpin_marker("deb"));
    assert!(!h.controller.unpin_marker("nobody"));
    advance(Duration::from_millis(100)).await;
    h.controller.tick(Instant::now());
    let markers = h.controller.marker_positions();
    assert_eq!(markers[0].position, markers[1].position);
}

#[tokio::test(start_paused = true)]
async fn test_camera_only_moves_while_animating() {
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());
    assert!(h.controller.camera_target().is_none());

    h.controller.start();
    h.deliver_route().await;
    advance(Duration::from_millis(300)).await;
    h.controller.tick(Instant::now());
    let animating = h.controller.camera_target().expect("camera follows markers");
    assert_eq!(animating.center, tour_marker(&h));

    h.controller.pause();
    advance(Duration::from_millis(300)).await;
    h.controller.tick(Instant::now());
    assert_eq!(h.controller.camera_target(), Some(animating));

    h.controller.resume();
    h.finish_leg().await;
    let settled = h.controller.camera_target();
    for _ in 0..10 {
        advance(Duration::from_millis(100)).await;
        h.controller.tick(Instant::now());
        assert_eq!(h.controller.camera_target(), settled);
    }
}

#[tokio::test(start_paused = true)]
async fn test_traveled_path_grows() {
    let mut h = Harness::new(3, MockRouter::straight(), helpers::test_config());
    h.controller.start();
    h.deliver_route().await;

    let mut last_len = h.controller.traveled_path().len();
    for _ in 0..4 {
        advance(Duration::from_millis(LEG_MS / 5)).await;
        h.controller.tick(Instant::now());
        let path = h.controller.traveled_path();
        assert!(path.len() >= last_len);
        assert_eq!(path.last(), Some(&tour_marker(&h)));
        last_len = path.len();
    }

    advance(Duration::from_millis(LEG_MS)).await;
    h.controller.tick(Instant::now());
    let first_leg = h.controller.traveled_path();
    assert_eq!(first_leg.len(), 11);
    assert_eq!(first_leg.first(), Some(&h.controller.waypoints().first().position()));

    h.play_leg().await;
    // Shared joint point appears once
    assert_eq!(h.controller.traveled_path().len(), 21);
}

// ================================================================================================
// Auto-advance, locate, waypoint replacement
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_auto_advance_after_dwell() {
    let mut config = helpers::test_config();
    config.animation.auto_advance = true;
    let mut h = Harness::new(3, MockRouter::straight(), config);

    h.play_leg().await;
    assert_eq!(h.controller.phase(), Phase::Settled);

    advance(Duration::from_millis(250)).await;
    assert!(!h.controller.tick(Instant::now()));
    assert_eq!(h.controller.phase(), Phase::Settled);

    advance(Duration::from_millis(250)).await;
    assert!(h.controller.tick(Instant::now()));
    assert_eq!(h.controller.phase(), Phase::AwaitingRoute);
    assert_eq!(h.controller.state().active_leg(), Some(LegKey::new(1, 2)));

    h.finish_leg().await;
    assert_eq!(h.controller.phase(), Phase::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_locate_jumps_without_animating() {
    let mut h = Harness::new(4, MockRouter::straight(), helpers::test_config());
    h.controller.start();
    h.deliver_route().await;
    advance(Duration::from_millis(300)).await;
    h.controller.tick(Instant::now());
    h.drain_events();

    h.controller.on_external_step_change(2);
    assert_eq!(h.controller.phase(), Phase::Settled);
    assert_eq!(h.controller.current_index(), Some(2));
    assert_eq!(h.controller.progress(), 1.0);
    assert!(h.controller.state().active_route.is_none());
    let target = h.controller.waypoints().get(2).map(|w| w.position());
    assert_eq!(Some(tour_marker(&h)), target);
    assert_eq!(h.controller.traveled_path(), target.into_iter().collect::<Vec<_>>());
    assert_eq!(settled_indices(&h.drain_events()), vec![2]);
    assert_eq!(
        h.controller.snapshot().zoom,
        h.controller.config().camera.zoom_levels.settled
    );

    // The cancelled session produces nothing further
    advance(Duration::from_millis(LEG_MS)).await;
    assert!(!h.controller.tick(Instant::now()));
    assert_eq!(h.controller.current_index(), Some(2));

    h.controller.on_external_step_change(9);
    assert_eq!(h.controller.current_index(), Some(2));
    assert!(h.drain_events().is_empty());

    h.controller.start();
    assert_eq!(h.controller.state().active_leg(), Some(LegKey::new(2, 3)));
    h.finish_leg().await;
    assert_eq!(h.controller.phase(), Phase::Complete);

}

#[tokio::test(start_paused = true)]
async fn test_locate_last_waypoint_completes() {
    let mut h = Harness::new(4, MockRouter::straight(), helpers::test_config());
    h.controller.on_external_step_change(1);
    h.drain_events();

    h.controller.on_external_step_change(3);
    assert_eq!(h.controller.phase(), Phase::Complete);
    assert_eq!(h.controller.current_index(), Some(3));
    assert_eq!(h.controller.progress(), 1.0);
    let events = h.drain_events();
    assert_eq!(
        event_types(&events),
        vec!["PhaseChanged", "StepSettled", "TourComplete"]
    );

    let zoom_levels = h.controller.config().camera.zoom_levels;
    assert_eq!(h.controller.snapshot().zoom, zoom_levels.overview);

    // Terminal until reset, like a tour that walked every leg
    h.controller.start();
    assert_eq!(h.controller.phase(), Phase::Complete);
    h.controller.reset();
    assert_eq!(h.controller.phase(), Phase::Idle);
    h.play_leg().await;
    assert_eq!(h.controller.current_index(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_replace_waypoints() {
    let mut h = Harness::new(2, MockRouter::straight(), helpers::test_config());
    h.play_leg().await;
    assert_eq!(h.controller.phase(), Phase::Complete);
    assert_eq!(h.resolver.cache_len(), 1);

    let replacement = helpers::waypoints(4);
    assert!(h.controller.replace_waypoints(replacement.clone()));
    assert_eq!(h.controller.phase(), Phase::Idle);
    assert_eq!(h.controller.waypoints(), &replacement);
    assert_eq!(h.resolver.cache_len(), 0);
    assert!(h
        .drain_events()
        .iter()
        .any(|e| matches!(e, TourEvent::WaypointsReplaced { count: 4, .. })));

    h.controller.start();
    h.deliver_route().await;
    assert!(!h.controller.replace_waypoints(helpers::waypoints(2)));
    assert_eq!(h.controller.waypoints().len(), 4);
}
