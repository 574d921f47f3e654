//! Event types for the tour event system
//!
//! Provides lifecycle event definitions and the EventBus the playback
//! controller publishes on. UI layers subscribe instead of registering
//! callbacks, so `onStepSettled`, `onComplete` and `onError` map to the
//! `StepSettled`, `TourComplete` and `TourError` variants.

mod playback_types;

pub use playback_types::{ErrorKind, Phase};

use crate::route::LegKey;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Tour lifecycle events
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI layer. All state changes described by an event are already
/// applied when the event is emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TourEvent {
    /// Controller phase changed
    PhaseChanged {
        /// Phase before change
        old_phase: Phase,
        /// Phase after change
        new_phase: Phase,
        /// Generation active after the change
        generation: u64,
        /// When phase changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A leg started animating
    ///
    /// Triggers:
    /// - UI: Close venue popups of the previous stop
    /// - Camera: Switch to the animating zoom level
    LegStarted {
        /// Leg being animated
        leg: LegKey,
        /// Whether the path is a straight-line fallback
        is_fallback: bool,
        /// Number of points in the path
        points: usize,
        /// Effective animation duration
        duration_ms: u64,
        /// When the leg started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Markers arrived at a waypoint (leg completed or locate jump)
    ///
    /// Triggers:
    /// - UI: Open venue popup for the waypoint
    StepSettled {
        /// Index of the waypoint reached
        index: usize,
        /// Waypoint id
        waypoint_id: String,
        /// Waypoint display name
        waypoint_name: String,
        /// When the step settled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Last waypoint reached
    ///
    /// Triggers:
    /// - UI: Show end-of-tour dialog
    TourComplete {
        /// Number of waypoints visited
        waypoints: usize,
        /// When the tour completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Recoverable failure (playback continues)
    TourError {
        /// Failure kind
        kind: ErrorKind,
        /// Affected leg, if any
        leg: Option<LegKey>,
        /// Human-readable detail for logs
        detail: String,
        /// When the failure was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Tour reset to Idle
    TourReset {
        /// Generation active after the reset
        generation: u64,
        /// When the reset happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Waypoint sequence replaced (route cache invalidated)
    WaypointsReplaced {
        /// Length of the new sequence
        count: usize,
        /// When the sequence was replaced
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TourEvent {
    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            TourEvent::PhaseChanged { .. } => "PhaseChanged",
            TourEvent::LegStarted { .. } => "LegStarted",
            TourEvent::StepSettled { .. } => "StepSettled",
            TourEvent::TourComplete { .. } => "TourComplete",
            TourEvent::TourError { .. } => "TourError",
            TourEvent::TourReset { .. } => "TourReset",
            TourEvent::WaypointsReplaced { .. } => "WaypointsReplaced",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the controller)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use tour_common::events::{EventBus, TourEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(TourEvent::TourComplete {
///     waypoints: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(TourEvent::TourComplete { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TourEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: TourEvent) -> Result<usize, broadcast::error::SendError<TourEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TourEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
