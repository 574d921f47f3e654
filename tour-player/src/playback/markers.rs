//! Marker set
//!
//! Holds one entity per moving actor (a single tour marker, or one per
//! guest). All entities follow the same scheduler-driven base position; each
//! adds its own bounded jitter, redrawn every tick, so a group of guests
//! clusters naturally instead of stacking on one point.
//!
//! A pinned entity (manual drag) ignores the base position until the pins
//! are cleared when the next leg starts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tour_common::{GeoBounds, LatLng};

/// Description of a marker to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub id: String,
    pub label: String,
    /// Jitter seed; derived from the id when absent
    #[serde(default)]
    pub jitter_seed: Option<u64>,
}

impl MarkerSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            jitter_seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }
}

/// Read-only view of one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    pub id: String,
    pub label: String,
    pub position: LatLng,
    pub pinned: bool,
}

#[derive(Debug, Clone)]
struct MarkerEntity {
    id: String,
    label: String,
    jitter_seed: u64,
    pinned_position: Option<LatLng>,
    position: LatLng,
    rng: StdRng,
}

impl MarkerEntity {
    fn new(spec: MarkerSpec, at: LatLng) -> Self {
        let jitter_seed = spec.jitter_seed.unwrap_or_else(|| seed_from_id(&spec.id));
        Self {
            id: spec.id,
            label: spec.label,
            jitter_seed,
            pinned_position: None,
            position: at,
            rng: StdRng::seed_from_u64(jitter_seed),
        }
    }

    fn jitter(&mut self, base: LatLng, radius_m: f64) -> LatLng {
        if radius_m <= 0.0 {
            return base;
        }
        // Uniform over the disc
        let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = radius_m * self.rng.gen::<f64>().sqrt();
        base.offset_m(distance * angle.cos(), distance * angle.sin())
    }
}

fn seed_from_id(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Set of markers moving together along the active route
#[derive(Debug, Clone)]
pub struct MarkerSet {
    entities: Vec<MarkerEntity>,
    jitter_radius_m: f64,
}

impl MarkerSet {
    /// Create markers placed on `at`
    ///
    /// An empty spec list yields a single "tour" marker, so there is always
    /// at least one entity to follow.
    pub fn new(specs: Vec<MarkerSpec>, jitter_radius_m: f64, at: LatLng) -> Self {
        let specs = if specs.is_empty() {
            vec![MarkerSpec::new("tour", "Tour")]
        } else {
            specs
        };
        let mut set = Self {
            entities: specs.into_iter().map(|spec| MarkerEntity::new(spec, at)).collect(),
            jitter_radius_m: jitter_radius_m.max(0.0),
        };
        set.update(at);
        set
    }

    /// Move every unpinned marker to `base` plus fresh jitter
    pub fn update(&mut self, base: LatLng) {
        let radius = self.jitter_radius_m;
        for entity in &mut self.entities {
            entity.position = match entity.pinned_position {
                Some(pinned) => pinned,
                None => entity.jitter(base, radius),
            };
        }
    }

    /// Pin a marker at a fixed position; returns false for unknown ids
    pub fn pin(&mut self, id: &str, position: LatLng) -> bool {
        match self.entities.iter_mut().find(|e| e.id == id) {
            Some(entity) => {
                entity.pinned_position = Some(position);
                entity.position = position;
                true
            }
            None => false,
        }
    }

    /// Release a pin; returns false for unknown ids
    ///
    /// The marker rejoins the group on the next update.
    pub fn unpin(&mut self, id: &str) -> bool {
        match self.entities.iter_mut().find(|e| e.id == id) {
            Some(entity) => {
                entity.pinned_position = None;
                true
            }
            None => false,
        }
    }

    /// Clear all pins, returning how many were set
    pub fn clear_pins(&mut self) -> usize {
        let mut cleared = 0;
        for entity in &mut self.entities {
            if entity.pinned_position.take().is_some() {
                cleared += 1;
            }
        }
        cleared
    }

    pub fn has_pins(&self) -> bool {
        self.entities.iter().any(|e| e.pinned_position.is_some())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn jitter_radius_m(&self) -> f64 {
        self.jitter_radius_m
    }

    /// Jitter seed of a marker
    pub fn jitter_seed(&self, id: &str) -> Option<u64> {
        self.entities.iter().find(|e| e.id == id).map(|e| e.jitter_seed)
    }

    pub fn position(&self, id: &str) -> Option<LatLng> {
        self.entities.iter().find(|e| e.id == id).map(|e| e.position)
    }

    /// Bounding box of all current marker positions
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.entities.iter().map(|e| &e.position))
    }

    pub fn snapshots(&self) -> Vec<MarkerSnapshot> {
        self.entities
            .iter()
            .map(|e| MarkerSnapshot {
                id: e.id.clone(),
                label: e.label.clone(),
                position: e.position,
                pinned: e.pinned_position.is_some(),
            })
            .collect()
    }
}
