//! Animation scheduler
//!
//! Runs one time-based interpolation session per leg. The scheduler does not
//! own a timer: the player's frame clock calls `tick(now)` once per frame,
//! which keeps the scheduler synchronous and deterministic under test.
//!
//! # Progress Model
//!
//! ```text
//! progress = clamp((now - start_time + start_progress * duration) / duration, 0, 1)
//! ```
//!
//! Progress is mapped onto the path by fractional point index
//! (`progress * (len - 1)`), interpolating linearly between the two
//! bracketing points. Segment lengths are deliberately not considered.
//!
//! # Session Tokens
//!
//! Every session carries the controller generation active when it started.
//! Frames report that token so a frame from a superseded session can be
//! recognised and dropped before it touches any state.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tour_common::LatLng;

/// One interpolated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Generation token of the session that produced the frame
    pub token: u64,
    /// Position along the path in `[0, 1]`
    pub progress: f64,
    /// Interpolated point on the path
    pub position: LatLng,
    /// True exactly once per session, on the frame reaching progress 1
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running { start_time: Instant },
    Paused,
}

#[derive(Debug, Clone)]
struct Session {
    token: u64,
    path: Arc<[LatLng]>,
    duration: Duration,
    start_progress: f64,
    last_progress: f64,
    state: SessionState,
}

impl Session {
    fn progress_at(&self, now: Instant, start_time: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(start_time).as_secs_f64();
        let duration = self.duration.as_secs_f64();
        let raw = ((elapsed + self.start_progress * duration) / duration).clamp(0.0, 1.0);
        // Never move backwards within a session
        raw.max(self.last_progress)
    }
}

/// Single-session animation scheduler
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    session: Option<Session>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Start a session, cancelling any running one first
    ///
    /// # Arguments
    /// * `path` - Points to interpolate along (empty paths are rejected by the caller)
    /// * `duration` - Wall-clock time from progress 0 to 1
    /// * `start_progress` - Initial progress in `[0, 1]`
    /// * `token` - Generation token reported by every frame
    /// * `now` - Session start time
    pub fn start(
        &mut self,
        path: Arc<[LatLng]>,
        duration: Duration,
        start_progress: f64,
        token: u64,
        now: Instant,
    ) {
        self.cancel();
        let start_progress = if start_progress.is_finite() {
            start_progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.session = Some(Session {
            token,
            path,
            duration,
            start_progress,
            last_progress: start_progress,
            state: SessionState::Running { start_time: now },
        });
    }

    /// Compute the frame for `now`
    ///
    /// Returns `None` when no session is running (idle, paused, finished or
    /// cancelled). The frame that reaches progress 1 has `completed = true`
    /// and ends the session, so completion is reported exactly once.
    pub fn tick(&mut self, now: Instant) -> Option<Frame> {
        let session = self.session.as_mut()?;
        let start_time = match session.state {
            SessionState::Running { start_time } => start_time,
            SessionState::Paused => return None,
        };

        let progress = session.progress_at(now, start_time);
        session.last_progress = progress;

        let frame = Frame {
            token: session.token,
            progress,
            position: interpolate_path(&session.path, progress),
            completed: progress >= 1.0,
        };

        if frame.completed {
            self.session = None;
        }
        Some(frame)
    }

    /// Freeze the session and return the progress it was frozen at
    ///
    /// No-op (returns `None`) unless a session is running.
    pub fn pause(&mut self, now: Instant) -> Option<f64> {
        let session = self.session.as_mut()?;
        let start_time = match session.state {
            SessionState::Running { start_time } => start_time,
            SessionState::Paused => return None,
        };
        let progress = session.progress_at(now, start_time);
        session.last_progress = progress;
        session.state = SessionState::Paused;
        Some(progress)
    }

    /// Resume a paused session from its frozen progress
    ///
    /// No-op (returns `None`) unless a session is paused.
    pub fn resume(&mut self, now: Instant) -> Option<f64> {
        let session = self.session.as_mut()?;
        if session.state != SessionState::Paused {
            return None;
        }
        session.start_progress = session.last_progress;
        session.state = SessionState::Running { start_time: now };
        Some(session.last_progress)
    }

    /// Stop the session and drop its path; idempotent
    pub fn cancel(&mut self) {
        self.session = None;
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.session,
            Some(Session {
                state: SessionState::Running { .. },
                ..
            })
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self.session,
            Some(Session {
                state: SessionState::Paused,
                ..
            })
        )
    }

    /// Token of the current session, if any
    pub fn token(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.token)
    }

    /// Last computed progress of the current session
    pub fn last_progress(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.last_progress)
    }
}

/// Map `progress` onto `path` by fractional point index
///
/// An empty path yields `None`; a single-point path always yields that point.
pub fn interpolate_along(path: &[LatLng], progress: f64) -> Option<LatLng> {
    match path.len() {
        0 => None,
        1 => Some(path[0]),
        len => {
            let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
            let position = progress * (len - 1) as f64;
            let index = (position.floor() as usize).min(len - 2);
            let fraction = position - index as f64;
            Some(path[index].lerp(&path[index + 1], fraction))
        }
    }
}

fn interpolate_path(path: &[LatLng], progress: f64) -> LatLng {
    interpolate_along(path, progress).unwrap_or(LatLng::new(0.0, 0.0))
}

/// Points of `path` covered at `progress`, ending on the interpolated point
pub fn traveled_prefix(path: &[LatLng], progress: f64) -> Vec<LatLng> {
    let Some(current) = interpolate_along(path, progress) else {
        return Vec::new();
    };
    if path.len() == 1 {
        return vec![current];
    }
    let position = progress.clamp(0.0, 1.0) * (path.len() - 1) as f64;
    let whole = (position.floor() as usize).min(path.len() - 1);
    let mut prefix: Vec<LatLng> = path[..=whole].to_vec();
    if prefix.last() != Some(&current) {
        prefix.push(current);
    }
    prefix
}
