//! Geographic primitives
//!
//! Coordinates are WGS84 degrees. Distances use a spherical earth model,
//! which is plenty for walking-scale legs and marker jitter.

use serde::{Deserialize, Serialize};

/// Mean earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Metres per degree of latitude on the spherical model
const METRES_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and within WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Linear interpolation towards `other`
    ///
    /// `t` is clamped to `[0, 1]`, so `t = 0` yields `self` and `t = 1`
    /// yields `other` exactly.
    pub fn lerp(&self, other: &LatLng, t: f64) -> LatLng {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return *other;
        }
        LatLng {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    pub fn midpoint(&self, other: &LatLng) -> LatLng {
        self.lerp(other, 0.5)
    }

    /// Great-circle distance in metres (haversine)
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }

    /// Offset by a small displacement in metres (north, east)
    ///
    /// Uses the local flat-earth approximation; only meaningful for offsets
    /// of a few hundred metres at most.
    pub fn offset_m(&self, north_m: f64, east_m: f64) -> LatLng {
        let d_lat = north_m / METRES_PER_DEGREE;
        let cos_lat = self.lat.to_radians().cos().abs().max(1e-6);
        let d_lng = east_m / (METRES_PER_DEGREE * cos_lat);
        LatLng {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Total length of a polyline in metres
pub fn path_length_m(path: &[LatLng]) -> f64 {
    path.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Degenerate bounds around a single point
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Bounds of a point set, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(*first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: &LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }
}
