//! Tour player - async driver for the playback controller
//!
//! Owns the `PlaybackController` on a single task and feeds it from three
//! sources:
//!
//! ```text
//!   frame interval ──┐
//!   TourHandle cmds ─┼─> select! ─> PlaybackController ─> watch<TourSnapshot>
//!   route arrivals ──┘                                 └─> EventBus
//! ```
//!
//! Everything the controller does happens on this one task, so frames,
//! commands and arrivals are never interleaved mid-operation.

use super::controller::{PlaybackController, RouteArrivals};
use super::markers::MarkerSpec;
use super::state::TourSnapshot;
use crate::error::{Error, Result};
use crate::routing::{RouteResolver, RoutingService};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tour_common::config::TourConfig;
use tour_common::events::{EventBus, TourEvent};
use tour_common::{LatLng, WaypointSequence};
use tracing::{debug, info};

/// Event bus capacity
const EVENT_CAPACITY: usize = 256;

/// Commands accepted by the player task
#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Resume,
    TogglePlay,
    Reset,
    /// Jump to a waypoint without animating
    Locate(usize),
    Pin { id: String, position: LatLng },
    Unpin { id: String },
    ReplaceWaypoints(WaypointSequence),
    Shutdown,
}

/// Async driver owning the controller
pub struct TourPlayer {
    controller: PlaybackController,
    arrivals: RouteArrivals,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<TourSnapshot>,
}

impl TourPlayer {
    /// Create a player and the handle that controls it
    ///
    /// # Arguments
    /// * `waypoints` - Validated tour stops
    /// * `markers` - Moving actors; empty for a single tour marker
    /// * `service` - Routing collaborator
    /// * `config` - Engine configuration
    pub fn new(
        waypoints: WaypointSequence,
        markers: Vec<MarkerSpec>,
        service: Arc<dyn RoutingService>,
        config: TourConfig,
    ) -> (Self, TourHandle) {
        let resolver = Arc::new(RouteResolver::new(
            service,
            config.routing.timeout(),
            config.routing.fallback_points,
        ));
        let events = EventBus::new(EVENT_CAPACITY);
        let (controller, arrivals) =
            PlaybackController::new(waypoints, markers, resolver, config, events.clone());

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(controller.snapshot());

        let player = Self {
            controller,
            arrivals,
            commands,
            snapshots,
        };
        let handle = TourHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events,
        };
        (player, handle)
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Run the player on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the controller until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let mut frames = interval(self.controller.config().animation.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            waypoints = self.controller.waypoints().len(),
            frame_interval_ms = self.controller.config().animation.frame_interval_ms,
            "Tour player running"
        );

        loop {
            tokio::select! {
                _ = frames.tick() => {
                    if self.controller.tick(Instant::now()) {
                        self.publish();
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => {
                            self.apply(command);
                            self.publish();
                        }
                    }
                }
                Some(arrival) = self.arrivals.recv() => {
                    self.controller.on_route_arrival(arrival);
                    self.publish();
                }
            }
        }

        self.controller.reset();
        self.publish();
        info!("Tour player stopped");
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "Applying command");
        match command {
            Command::Start => self.controller.start(),
            Command::Pause => self.controller.pause(),
            Command::Resume => self.controller.resume(),
            Command::TogglePlay => self.controller.toggle_play(),
            Command::Reset => self.controller.reset(),
            Command::Locate(index) => self.controller.on_external_step_change(index),
            Command::Pin { id, position } => {
                self.controller.pin_marker(&id, position);
            }
            Command::Unpin { id } => {
                self.controller.unpin_marker(&id);
            }
            Command::ReplaceWaypoints(waypoints) => {
                self.controller.replace_waypoints(waypoints);
            }
            Command::Shutdown => {}
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }
}

/// Cloneable control surface for UI layers
#[derive(Clone)]
pub struct TourHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<TourSnapshot>,
    events: EventBus,
}

impl TourHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|e| Error::PlayerStopped(format!("command {:?} not delivered", e.0)))
    }

    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Play/Pause button
    pub fn toggle_play(&self) -> Result<()> {
        self.send(Command::TogglePlay)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Jump to waypoint `index` without animating
    pub fn locate(&self, index: usize) -> Result<()> {
        self.send(Command::Locate(index))
    }

    pub fn pin_marker(&self, id: impl Into<String>, position: LatLng) -> Result<()> {
        self.send(Command::Pin {
            id: id.into(),
            position,
        })
    }

    pub fn unpin_marker(&self, id: impl Into<String>) -> Result<()> {
        self.send(Command::Unpin { id: id.into() })
    }

    pub fn replace_waypoints(&self, waypoints: WaypointSequence) -> Result<()> {
        self.send(Command::ReplaceWaypoints(waypoints))
    }

    /// Stop the player task (state is reset on the way out)
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TourEvent> {
        self.events.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> TourSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    ///
    /// # Errors
    /// `PlayerStopped` when the player task ends first.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<TourSnapshot>
    where
        F: FnMut(&TourSnapshot) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| Error::PlayerStopped("snapshot channel closed".to_string()))?;
        Ok(snapshot.clone())
    }
}
