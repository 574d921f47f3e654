//! # Tour Common Library
//!
//! Shared code for the tour playback workspace including:
//! - Geographic primitives (LatLng, GeoBounds)
//! - Waypoint data model and the JSON waypoint source
//! - Route and leg types
//! - Event types (TourEvent enum) and the EventBus
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod route;
pub mod waypoint;

pub use error::{Error, Result};
pub use geo::{GeoBounds, LatLng};
pub use route::{LegKey, Route};
pub use waypoint::{Waypoint, WaypointSequence};
