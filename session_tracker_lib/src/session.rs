use chrono::{DateTime, Utc};

use crate::{
    clock::{Clock, SystemClock},
    geo::haversine_distance,
    position_sample::{Coordinates, PositionSample},
};

/// Everything the tracker knows about the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    start_time: Option<DateTime<Utc>>,
    last_position: Option<Coordinates>,
    total_distance_meters: f64,
    current_speed: f64,
    running: bool,
}

impl SessionState {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// None until the first sample of the session has been accepted.
    pub fn last_position(&self) -> Option<Coordinates> {
        self.last_position
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    /// Meters per second, never negative.
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// The sample was applied. `segment_meters` is the distance added by it.
    Accepted { segment_meters: f64 },
    /// No session is running.
    Ignored,
}

/// Owns the session state and applies samples to it.
///
/// The tracker is not shared: whoever drives it (an event loop, a test) holds it
/// by value and calls into it from one place.
#[derive(Debug)]
pub struct SessionTracker<C: Clock = SystemClock> {
    clock: C,
    state: SessionState,
}

impl SessionTracker<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for SessionTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SessionTracker<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Starts a fresh session. Does nothing if one is already running.
    pub fn start(&mut self) {
        if self.state.running {
            tracing::debug!("Session already running, ignoring start");
            return;
        }

        let now = self.clock.now();
        self.state = SessionState {
            start_time: Some(now),
            running: true,
            ..SessionState::default()
        };

        tracing::info!("Session started at {}", now);
    }

    pub fn on_sample(&mut self, sample: &PositionSample) -> SampleOutcome {
        if !self.state.running {
            tracing::trace!("Ignoring sample received while stopped");
            return SampleOutcome::Ignored;
        }

        let position = sample.coordinates();
        let segment_meters = match self.state.last_position {
            Some(last) => haversine_distance(last, position),
            None => 0.0,
        };

        self.state.total_distance_meters += segment_meters;
        self.state.last_position = Some(position);
        self.state.current_speed = sanitize_speed(sample.speed);

        tracing::debug!(
            "Sample ({:.5}, {:.5}) added {:.1} m, total {:.1} m",
            position.0,
            position.1,
            segment_meters,
            self.state.total_distance_meters
        );

        SampleOutcome::Accepted { segment_meters }
    }

    /// Seconds since `start`, or None when no session is running.
    pub fn elapsed_seconds(&self) -> Option<f64> {
        if !self.state.running {
            return None;
        }

        let start = self.state.start_time?;
        let elapsed = self.clock.now().signed_duration_since(start);

        // A clock stepping backwards should not produce negative time
        Some((elapsed.num_milliseconds() as f64 / 1000.0).max(0.0))
    }

    /// Ends the session and clears everything back to the initial state.
    pub fn stop(&mut self) {
        if self.state.running {
            tracing::info!(
                "Session stopped after {:.0} s, {:.0} m",
                self.elapsed_seconds().unwrap_or_default(),
                self.state.total_distance_meters
            );
        }

        self.state = SessionState::default();
    }
}

/// Device speed can be missing, negative or NaN depending on the platform. All of
/// those are shown as standing still.
pub fn sanitize_speed(speed: Option<f64>) -> f64 {
    match speed {
        Some(speed) if speed.is_finite() && speed > 0.0 => speed,
        _ => 0.0,
    }
}
