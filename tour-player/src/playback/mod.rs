//! Tour playback: controller state machine, scheduler, markers and camera

pub mod camera;
pub mod controller;
pub mod markers;
pub mod player;
pub mod scheduler;
pub mod state;

pub use camera::{CameraSync, CameraTarget};
pub use controller::{PlaybackController, RouteArrivals};
pub use markers::{MarkerSet, MarkerSnapshot, MarkerSpec};
pub use player::{Command, TourHandle, TourPlayer};
pub use scheduler::{AnimationScheduler, Frame};
pub use state::{PlaybackState, RouteArrival, TourSnapshot};
