//! Route and leg types

use crate::geo::{path_length_m, LatLng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies a leg by its waypoint indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegKey {
    pub from: usize,
    pub to: usize,
}

impl LegKey {
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Leg departing from `index` towards the next waypoint
    pub const fn departing(index: usize) -> Self {
        Self {
            from: index,
            to: index + 1,
        }
    }
}

impl std::fmt::Display for LegKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Resolved (or fallback) walking path for a leg
///
/// The path is shared so that cache hits, the scheduler session and
/// snapshots can reference it without copying points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub leg: LegKey,
    pub path: Arc<[LatLng]>,
    /// True when the path is a straight-line substitute
    pub is_fallback: bool,
}

impl Route {
    pub fn new(leg: LegKey, path: Vec<LatLng>, is_fallback: bool) -> Self {
        Self {
            leg,
            path: path.into(),
            is_fallback,
        }
    }

    /// Straight line from `origin` to `destination` with `points` evenly
    /// spaced points (at least 2), marked as fallback
    pub fn straight_line(leg: LegKey, origin: LatLng, destination: LatLng, points: usize) -> Self {
        Self::new(leg, straight_path(origin, destination, points), true)
    }

    pub fn origin(&self) -> Option<LatLng> {
        self.path.first().copied()
    }

    pub fn destination(&self) -> Option<LatLng> {
        self.path.last().copied()
    }

    pub fn length_m(&self) -> f64 {
        path_length_m(&self.path)
    }
}

/// Evenly spaced points on the segment `origin -> destination`
///
/// Endpoints are reproduced exactly.
pub fn straight_path(origin: LatLng, destination: LatLng, points: usize) -> Vec<LatLng> {
    let points = points.max(2);
    let last = (points - 1) as f64;
    (0..points)
        .map(|i| origin.lerp(&destination, i as f64 / last))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_endpoints() {
        let a = LatLng::new(-33.85, 151.20);
        let b = LatLng::new(-33.86, 151.21);
        let route = Route::straight_line(LegKey::new(0, 1), a, b, 5);
        assert!(route.is_fallback);
        assert_eq!(route.path.len(), 5);
        assert_eq!(route.origin(), Some(a));
        assert_eq!(route.destination(), Some(b));
    }

    #[test]
    fn test_straight_path_minimum_two_points() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(1.0, 1.0);
        assert_eq!(straight_path(a, b, 0), vec![a, b]);
        assert_eq!(straight_path(a, b, 1), vec![a, b]);
    }

    #[test]
    fn test_leg_key() {
        assert_eq!(LegKey::departing(2), LegKey::new(2, 3));
        assert_eq!(LegKey::new(0, 1).to_string(), "0->1");
    }
}
