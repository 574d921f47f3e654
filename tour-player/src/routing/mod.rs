//! Route resolution
//!
//! The playback core depends only on the abstract `RoutingService` contract
//! (origin, destination, travel mode in; ordered points or a reason code
//! out). Transport-specific clients implement the trait outside this crate.

mod resolver;
mod straight;

pub use resolver::{Resolution, RouteDegradation, RouteResolver};
pub use straight::StraightLineRouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tour_common::LatLng;

/// Travel mode requested from the routing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
}

/// Routing request for one leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    pub mode: TravelMode,
}

impl RouteRequest {
    pub fn walking(origin: LatLng, destination: LatLng) -> Self {
        Self {
            origin,
            destination,
            mode: TravelMode::Walking,
        }
    }
}

/// Failure reason codes reported by a routing service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingFailure {
    /// No route between origin and destination
    #[error("zero results")]
    ZeroResults,

    /// Origin or destination could not be geocoded
    #[error("not found")]
    NotFound,

    /// Service refused the request (credentials, quota policy)
    #[error("request denied")]
    RequestDenied,

    /// Rate limited
    #[error("over query limit")]
    OverQueryLimit,

    /// Service-side or transport error
    #[error("service error: {0}")]
    Service(String),

    /// Response was received but unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Walking-path provider
///
/// Implementations must be cheap to call concurrently; the resolver takes
/// care of caching, deduplication and timeouts.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &'static str;

    /// Resolve an ordered list of points from origin to destination
    async fn route(&self, request: &RouteRequest) -> Result<Vec<LatLng>, RoutingFailure>;
}
