//! Tour Player (tour-player) - Main entry point
//!
//! Plays a walking tour from a JSON waypoint file against the straight-line
//! router, logging lifecycle events. Without `--auto` the next leg is started
//! as soon as a step settles; with it the configured dwell applies.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tour_common::config::TourConfig;
use tour_common::events::TourEvent;
use tour_common::WaypointSequence;
use tour_player::playback::MarkerSpec;
use tour_player::{StraightLineRouter, TourHandle, TourPlayer};

/// Command-line arguments for tour-player
#[derive(Parser, Debug)]
#[command(name = "tour-player")]
#[command(about = "Animated walking tour playback")]
#[command(version)]
struct Args {
    /// JSON file with an array of {id, name, lat, lng} waypoints
    #[arg(short, long)]
    waypoints: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "TOUR_CONFIG")]
    config: Option<PathBuf>,

    /// Guest marker name (repeatable); a single tour marker when omitted
    #[arg(short, long = "guest")]
    guests: Vec<String>,

    /// Advance to the next leg automatically after the configured dwell
    #[arg(long)]
    auto: bool,

    /// Simulated routing latency in milliseconds
    #[arg(long, default_value = "0")]
    route_latency_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tour_player=debug,tour_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = TourConfig::resolve_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if args.auto {
        config.animation.auto_advance = true;
    }

    let waypoints = WaypointSequence::from_json_file(&args.waypoints).with_context(|| {
        format!("Failed to load waypoints from {}", args.waypoints.display())
    })?;
    info!(
        "Loaded {} waypoints from {}",
        waypoints.len(),
        args.waypoints.display()
    );

    let markers: Vec<MarkerSpec> = args
        .guests
        .iter()
        .map(|name| MarkerSpec::new(name.to_lowercase(), name.clone()))
        .collect();

    let router = StraightLineRouter::new().with_latency(Duration::from_millis(args.route_latency_ms));
    let auto_advance = config.animation.auto_advance;
    let (player, handle) = TourPlayer::new(waypoints, markers, Arc::new(router), config);

    let mut events = handle.subscribe();
    let player_task = player.spawn();
    handle.start()?;

    tokio::select! {
        result = follow_tour(&handle, &mut events, auto_advance) => result?,
        _ = shutdown_signal() => {}
    }

    let snapshot = handle.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    );

    handle.shutdown()?;
    player_task.await.context("Player task failed")?;
    info!("Tour player exited");
    Ok(())
}

/// Log events until the tour completes, starting each leg when not in auto mode
async fn follow_tour(
    handle: &TourHandle,
    events: &mut tokio::sync::broadcast::Receiver<TourEvent>,
    auto_advance: bool,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(TourEvent::StepSettled {
                index,
                waypoint_name,
                ..
            }) => {
                info!("Arrived at {} ({})", waypoint_name, index);
                if !auto_advance {
                    handle.start()?;
                }
            }
            Ok(TourEvent::TourComplete { waypoints, .. }) => {
                info!("Tour complete after {} waypoints", waypoints);
                return Ok(());
            }
            Ok(TourEvent::TourError { detail, leg, .. }) => {
                warn!(?leg, "Route degraded: {}", detail);
            }
            Ok(TourEvent::LegStarted { leg, points, .. }) => {
                info!("Walking leg {} ({} points)", leg, points);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
