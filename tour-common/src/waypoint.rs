//! Waypoint data model and the JSON waypoint source
//!
//! A `WaypointSequence` is validated once at construction and never mutated
//! afterwards; the playback controller relies on that for the lifetime of
//! a tour.

use crate::geo::LatLng;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// A named stop in the tour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Ordered, non-empty, immutable list of waypoints
///
/// Cloning is cheap (shared `Arc`), so the controller and background route
/// requests can hold the same sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSequence {
    waypoints: Arc<[Waypoint]>,
}

impl WaypointSequence {
    /// Validate and wrap a list of waypoints
    ///
    /// # Errors
    /// `Error::InvalidWaypointSequence` if the list is empty, contains an
    /// invalid coordinate, or repeats a waypoint id.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(Error::InvalidWaypointSequence(
                "sequence must contain at least one waypoint".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, waypoint) in waypoints.iter().enumerate() {
            if !waypoint.position().is_valid() {
                return Err(Error::InvalidWaypointSequence(format!(
                    "waypoint {} ('{}') has invalid coordinates {}",
                    index,
                    waypoint.name,
                    waypoint.position()
                )));
            }
            if !seen.insert(waypoint.id.as_str()) {
                return Err(Error::InvalidWaypointSequence(format!(
                    "duplicate waypoint id '{}'",
                    waypoint.id
                )));
            }
        }

        Ok(Self {
            waypoints: waypoints.into(),
        })
    }

    /// Parse a JSON array of `{id, name, lat, lng}` objects
    pub fn from_json_str(json: &str) -> Result<Self> {
        let waypoints: Vec<Waypoint> = serde_json::from_str(json)?;
        Self::new(waypoints)
    }

    /// Load a waypoint file from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn first(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    /// Index of the last waypoint (N-1)
    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }
}
