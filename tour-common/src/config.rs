//! Tour configuration loading
//!
//! Configuration is a single TOML file. Every field has a built-in default,
//! so a missing file or a partial file is never fatal.
//!
//! # Config File Resolution Priority
//!
//! 1. Command-line argument
//! 2. Environment variable (`TOUR_CONFIG`)
//! 3. Platform config directory (`<config_dir>/tour-player/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! # Example
//!
//! ```toml
//! [animation]
//! leg_duration_ms = 8000
//! auto_advance = true
//!
//! [camera]
//! mode = "path_midpoint"
//!
//! [camera.zoom_levels]
//! animating = 15
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "TOUR_CONFIG";

/// Top-level tour configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TourConfig {
    #[serde(default)]
    pub animation: AnimationConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub camera: CameraConfig,
}

/// Leg animation timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Base duration of one leg in milliseconds (default: 5000)
    #[serde(default = "default_leg_duration_ms")]
    pub leg_duration_ms: u64,

    /// Speed multiplier applied to the base duration (default: 1.0)
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f64,

    /// Frame tick interval in milliseconds (default: 16, about 60 fps)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Dwell at a settled waypoint before auto-advancing (default: 2000)
    #[serde(default = "default_pause_duration_ms")]
    pub pause_duration_ms: u64,

    /// Advance to the next leg automatically after the dwell (default: false)
    #[serde(default)]
    pub auto_advance: bool,
}

/// Route resolution behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Routing service timeout in milliseconds (default: 5000)
    #[serde(default = "default_route_timeout_ms")]
    pub timeout_ms: u64,

    /// Resolve the following leg in the background (default: true)
    #[serde(default = "default_true")]
    pub prefetch_next_leg: bool,

    /// Points in a straight-line fallback path (default: 2)
    #[serde(default = "default_fallback_points")]
    pub fallback_points: usize,
}

/// Marker jitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Maximum jitter offset in metres; 0 disables jitter (default: 8.0)
    #[serde(default = "default_jitter_radius_m")]
    pub jitter_radius_m: f64,
}

/// What the camera frames while animating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Fit the bounding box of all markers
    #[default]
    FollowMarkers,
    /// Center on the midpoint of the active path
    PathMidpoint,
}

/// Viewport synchronisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub mode: CameraMode,

    /// Minimum time between recenters in milliseconds (default: 250)
    #[serde(default = "default_recenter_interval_ms")]
    pub recenter_interval_ms: u64,

    #[serde(default)]
    pub zoom_levels: ZoomLevels,
}

/// Zoom levels per situation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLevels {
    /// Whole-tour overview (default: 13)
    #[serde(default = "default_zoom_overview")]
    pub overview: u8,

    /// While markers are moving (default: 16)
    #[serde(default = "default_zoom_animating")]
    pub animating: u8,

    /// Focused on a settled waypoint (default: 17)
    #[serde(default = "default_zoom_settled")]
    pub settled: u8,
}

// Default value functions
fn default_leg_duration_ms() -> u64 {
    5000
}

fn default_animation_speed() -> f64 {
    1.0
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_pause_duration_ms() -> u64 {
    2000
}

fn default_route_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_fallback_points() -> usize {
    2
}

fn default_jitter_radius_m() -> f64 {
    8.0
}

fn default_recenter_interval_ms() -> u64 {
    250
}

fn default_zoom_overview() -> u8 {
    13
}

fn default_zoom_animating() -> u8 {
    16
}

fn default_zoom_settled() -> u8 {
    17
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            leg_duration_ms: default_leg_duration_ms(),
            animation_speed: default_animation_speed(),
            frame_interval_ms: default_frame_interval_ms(),
            pause_duration_ms: default_pause_duration_ms(),
            auto_advance: false,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_route_timeout_ms(),
            prefetch_next_leg: true,
            fallback_points: default_fallback_points(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            jitter_radius_m: default_jitter_radius_m(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::default(),
            recenter_interval_ms: default_recenter_interval_ms(),
            zoom_levels: ZoomLevels::default(),
        }
    }
}

impl Default for ZoomLevels {
    fn default() -> Self {
        Self {
            overview: default_zoom_overview(),
            animating: default_zoom_animating(),
            settled: default_zoom_settled(),
        }
    }
}

/// Longest effective leg duration accepted after the speed multiplier
pub const MAX_LEG_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

impl AnimationConfig {
    /// Effective leg duration after applying the speed multiplier
    ///
    /// `None` when the result does not fit below [`MAX_LEG_DURATION`].
    pub fn checked_leg_duration(&self) -> Option<Duration> {
        let speed = if self.animation_speed > 0.0 { self.animation_speed } else { 1.0 };
        Duration::try_from_secs_f64(self.leg_duration_ms as f64 / 1000.0 / speed)
            .ok()
            .filter(|duration| *duration <= MAX_LEG_DURATION)
    }

    /// Effective leg duration, capped at [`MAX_LEG_DURATION`]
    pub fn leg_duration(&self) -> Duration {
        self.checked_leg_duration().unwrap_or(MAX_LEG_DURATION)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn pause_duration(&self) -> Duration {
        Duration::from_millis(self.pause_duration_ms)
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CameraConfig {
    pub fn recenter_interval(&self) -> Duration {
        Duration::from_millis(self.recenter_interval_ms)
    }
}

impl TourConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TourConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields defaults with a warning
    ///
    /// Parse and validation errors are returned, since silently ignoring a
    /// file the user wrote would be surprising.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                info!("Loaded tour config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Resolve the config file location and load it
    ///
    /// Falls back to built-in defaults when no file is found anywhere.
    pub fn resolve_and_load(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => Self::load(&path),
            None => {
                info!("No tour config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the playback engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.animation.animation_speed.is_finite() && self.animation.animation_speed > 0.0) {
            return Err(Error::Config(format!(
                "animation.animation_speed must be positive, got {}",
                self.animation.animation_speed
            )));
        }
        if self.animation.checked_leg_duration().is_none() {
            return Err(Error::Config(format!(
                "animation.leg_duration_ms / animation_speed must not exceed {}s, got {}ms at speed {}",
                MAX_LEG_DURATION.as_secs(),
                self.animation.leg_duration_ms,
                self.animation.animation_speed
            )));
        }
        if self.animation.frame_interval_ms == 0 {
            return Err(Error::Config("animation.frame_interval_ms must be non-zero".to_string()));
        }
        if !(self.markers.jitter_radius_m.is_finite() && self.markers.jitter_radius_m >= 0.0) {
            return Err(Error::Config(format!(
                "markers.jitter_radius_m must be >= 0, got {}",
                self.markers.jitter_radius_m
            )));
        }
        if self.routing.timeout_ms == 0 {
            return Err(Error::Config("routing.timeout_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Config file resolution following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory, if the file exists
///
/// Returns `None` when no candidate applies.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/tour-player/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tour-player").join("config.toml"))
}
