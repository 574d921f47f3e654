//! Playback controller - the tour state machine
//!
//! **Module Structure:**
//! - `core.rs`: Struct definition, construction, accessors, snapshots
//! - `commands.rs`: User commands (start, pause, resume, reset, locate, pins)
//! - `progress.rs`: Route arrivals, frame ticks, settling, auto-advance
//!
//! **Invariants:**
//! - All fields of `PlaybackState` change together; events queued during an
//!   operation are only emitted once the operation has finished
//! - Every async result and scheduler frame carries the generation that was
//!   current when it was produced, and is dropped when that is stale

mod commands;
mod core;
mod progress;

pub use self::core::{PlaybackController, RouteArrivals};
