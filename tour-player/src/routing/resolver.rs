//! Caching, deduplicating route resolver
//!
//! Wraps a `RoutingService` with:
//! - A per-leg cache (a hit is answered synchronously via `cached`)
//! - Request deduplication: concurrent callers for the same leg attach to one
//!   shared pending future instead of issuing new service calls
//! - A timeout, after which (or after any service failure) a straight-line
//!   fallback path is returned instead of an error
//!
//! Fallback routes are not cached, so a replayed tour retries the service.

use super::{RouteRequest, RoutingFailure, RoutingService};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tour_common::{LatLng, LegKey, Route};

/// Why a resolution fell back to a straight line
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDegradation {
    /// Service reported a failure (or returned an unusable path)
    Unavailable(RoutingFailure),
    /// Service did not answer within the timeout
    Timeout(Duration),
}

impl std::fmt::Display for RouteDegradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteDegradation::Unavailable(reason) => write!(f, "route unavailable: {}", reason),
            RouteDegradation::Timeout(after) => {
                write!(f, "route timed out after {}ms", after.as_millis())
            }
        }
    }
}

/// Outcome of resolving one leg
#[derive(Debug, Clone)]
pub struct Resolution {
    pub route: Route,
    /// Set when `route` is a fallback
    pub degradation: Option<RouteDegradation>,
    /// Answered from the cache without awaiting the service
    pub from_cache: bool,
}

impl Resolution {
    fn cached(route: Route) -> Self {
        Self {
            route,
            degradation: None,
            from_cache: true,
        }
    }
}

type PendingRoute = Shared<BoxFuture<'static, Resolution>>;

struct InFlight {
    id: u64,
    epoch: u64,
    pending: PendingRoute,
}

#[derive(Default)]
struct ResolverState {
    cache: HashMap<LegKey, Route>,
    in_flight: HashMap<LegKey, InFlight>,
    /// Bumped by `invalidate`; results from an older epoch are never cached
    epoch: u64,
    next_request_id: u64,
    requests_issued: u64,
}

enum Lookup {
    Cached(Route),
    Pending { id: u64, epoch: u64, pending: PendingRoute },
}

/// Route resolver shared by the controller and its background requests
pub struct RouteResolver {
    service: Arc<dyn RoutingService>,
    timeout: Duration,
    fallback_points: usize,
    state: Mutex<ResolverState>,
}

impl RouteResolver {
    /// Create a resolver around a routing service
    ///
    /// # Arguments
    /// * `service` - Routing backend
    /// * `timeout` - Maximum wait for one service call
    /// * `fallback_points` - Points in a straight-line fallback path (min 2)
    pub fn new(service: Arc<dyn RoutingService>, timeout: Duration, fallback_points: usize) -> Self {
        info!(
            "Route resolver using '{}' service (timeout {}ms)",
            service.name(),
            timeout.as_millis()
        );
        Self {
            service,
            timeout,
            fallback_points: fallback_points.max(2),
            state: Mutex::new(ResolverState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResolverState> {
        // State is a plain cache; a panic elsewhere cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Synchronous cache lookup
    pub fn cached(&self, leg: LegKey) -> Option<Route> {
        self.lock().cache.get(&leg).cloned()
    }

    /// True when a service call for `leg` is currently pending
    pub fn is_in_flight(&self, leg: LegKey) -> bool {
        self.lock().in_flight.contains_key(&leg)
    }

    /// Number of underlying service calls issued so far
    pub fn requests_issued(&self) -> u64 {
        self.lock().requests_issued
    }

    pub fn cache_len(&self) -> usize {
        self.lock().cache.len()
    }

    /// Drop all cached routes (waypoint sequence changed)
    ///
    /// Pending requests still complete for their awaiters, but their results
    /// are not cached and new callers no longer attach to them.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        let dropped = state.cache.len();
        state.cache.clear();
        state.in_flight.clear();
        info!(dropped, epoch = state.epoch, "Route cache invalidated");
    }

    /// Resolve the path for `leg`
    ///
    /// Never fails: service errors and timeouts yield a straight-line route
    /// with `is_fallback = true` and the reason in `degradation`.
    pub async fn resolve(&self, leg: LegKey, origin: LatLng, destination: LatLng) -> Resolution {
        let (id, epoch, pending) = match self.lookup_or_issue(leg, origin, destination) {
            Lookup::Cached(route) => {
                debug!(leg = %leg, "Route cache hit");
                return Resolution::cached(route);
            }
            Lookup::Pending { id, epoch, pending } => (id, epoch, pending),
        };

        let resolution = pending.await;
        self.complete(leg, id, epoch, &resolution);
        resolution
    }

    /// Warm the cache for `leg` in the background
    ///
    /// No-op when the leg is already cached or in flight.
    pub fn prefetch(self: &Arc<Self>, leg: LegKey, origin: LatLng, destination: LatLng) {
        {
            let state = self.lock();
            if state.cache.contains_key(&leg) || state.in_flight.contains_key(&leg) {
                return;
            }
        }
        debug!(leg = %leg, "Prefetching route");
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            resolver.resolve(leg, origin, destination).await;
        });
    }

    fn lookup_or_issue(&self, leg: LegKey, origin: LatLng, destination: LatLng) -> Lookup {
        let mut state = self.lock();

        if let Some(route) = state.cache.get(&leg) {
            return Lookup::Cached(route.clone());
        }

        if let Some(in_flight) = state.in_flight.get(&leg) {
            debug!(leg = %leg, request_id = in_flight.id, "Attaching to in-flight route request");
            return Lookup::Pending {
                id: in_flight.id,
                epoch: in_flight.epoch,
                pending: in_flight.pending.clone(),
            };
        }

        state.next_request_id += 1;
        state.requests_issued += 1;
        let id = state.next_request_id;
        let epoch = state.epoch;

        let pending = fetch(
            Arc::clone(&self.service),
            self.timeout,
            self.fallback_points,
            leg,
            origin,
            destination,
        )
        .boxed()
        .shared();

        state.in_flight.insert(
            leg,
            InFlight {
                id,
                epoch,
                pending: pending.clone(),
            },
        );
        debug!(leg = %leg, request_id = id, "Issued route request");

        Lookup::Pending { id, epoch, pending }
    }

    fn complete(&self, leg: LegKey, id: u64, epoch: u64, resolution: &Resolution) {
        let mut state = self.lock();

        // Every awaiter lands here; only the matching entry is removed
        if state.in_flight.get(&leg).map(|f| f.id) == Some(id) {
            state.in_flight.remove(&leg);
        }

        if resolution.degradation.is_none() && epoch == state.epoch {
            state
                .cache
                .entry(leg)
                .or_insert_with(|| resolution.route.clone());
        }
    }
}

/// One service call with timeout and fallback
async fn fetch(
    service: Arc<dyn RoutingService>,
    timeout: Duration,
    fallback_points: usize,
    leg: LegKey,
    origin: LatLng,
    destination: LatLng,
) -> Resolution {
    let request = RouteRequest::walking(origin, destination);
    let started = Instant::now();

    let outcome = match tokio::time::timeout(timeout, service.route(&request)).await {
        Ok(Ok(points)) => anchor_path(points, origin, destination)
            .map_err(RouteDegradation::Unavailable),
        Ok(Err(failure)) => Err(RouteDegradation::Unavailable(failure)),
        Err(_) => Err(RouteDegradation::Timeout(timeout)),
    };

    match outcome {
        Ok(path) => {
            debug!(
                leg = %leg,
                points = path.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Route resolved"
            );
            Resolution {
                route: Route::new(leg, path, false),
                degradation: None,
                from_cache: false,
            }
        }
        Err(degradation) => {
            warn!(leg = %leg, "Using straight-line fallback: {}", degradation);
            Resolution {
                route: Route::straight_line(leg, origin, destination, fallback_points),
                degradation: Some(degradation),
                from_cache: false,
            }
        }
    }
}

/// Validate a service path and pin its ends onto the waypoints
///
/// Services usually start and end on the nearest walkable segment; the
/// waypoint itself is added when it is not already the first/last point.
fn anchor_path(
    mut points: Vec<LatLng>,
    origin: LatLng,
    destination: LatLng,
) -> Result<Vec<LatLng>, RoutingFailure> {
    if points.len() < 2 {
        return Err(RoutingFailure::InvalidResponse(format!(
            "path has {} point(s), need at least 2",
            points.len()
        )));
    }
    if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
        return Err(RoutingFailure::InvalidResponse(format!(
            "path contains invalid coordinate {}",
            bad
        )));
    }

    if points.first() != Some(&origin) {
        points.insert(0, origin);
    }
    if points.last() != Some(&destination) {
        points.push(destination);
    }
    Ok(points)
}
