//! # Tour Player Library (tour-player)
//!
//! Tour playback engine: resolves walking routes between consecutive
//! waypoints, animates markers along them over wall-clock time and keeps a
//! camera target in sync, under play/pause/resume/reset control.
//!
//! **Architecture:** a synchronous `PlaybackController` state machine owned
//! by one async `TourPlayer` task. Route resolution is the only async
//! boundary; every async result is tagged with the generation active when it
//! was requested and dropped if stale.

pub mod error;
pub mod playback;
pub mod routing;

pub use error::{Error, Result};
pub use playback::{PlaybackController, TourHandle, TourPlayer};
pub use routing::{RouteResolver, RoutingService, StraightLineRouter};
