//! Transport-free routing service
//!
//! Produces an evenly densified straight line between origin and
//! destination. Used by the command-line player and as a stand-in wherever
//! no real routing backend is wired up.

use super::{RouteRequest, RoutingFailure, RoutingService};
use async_trait::async_trait;
use std::time::Duration;
use tour_common::route::straight_path;
use tour_common::LatLng;

/// Default number of points per leg
const DEFAULT_POINTS: usize = 24;

/// Straight-line router with optional simulated latency
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    points: usize,
    latency: Duration,
}

impl StraightLineRouter {
    pub fn new() -> Self {
        Self {
            points: DEFAULT_POINTS,
            latency: Duration::ZERO,
        }
    }

    /// Number of points per returned path (minimum 2)
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points.max(2);
        self
    }

    /// Delay every response, to exercise the AwaitingRoute phase
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoutingService for StraightLineRouter {
    fn name(&self) -> &'static str {
        "straight-line"
    }

    async fn route(&self, request: &RouteRequest) -> Result<Vec<LatLng>, RoutingFailure> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(straight_path(request.origin, request.destination, self.points))
    }
}
