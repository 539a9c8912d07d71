use std::fmt;

use crate::{clock::Clock, session::SessionTracker};

/// `MM:SS`, minutes keep counting past 59.
pub fn format_elapsed(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn format_speed(meters_per_second: f64) -> String {
    format!("Speed: {:.1} m/s", meters_per_second)
}

pub fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("Latitude: {:.4}, Longitude: {:.4}", latitude, longitude)
}

pub fn format_distance(meters: f64) -> String {
    format!("Distance: {:.0} m", meters)
}

/// The strings a UI shows for a session, taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDisplay {
    pub speed: String,
    pub coordinates: String,
    pub distance: String,
    pub time: String,
}

impl SessionDisplay {
    /// What is shown before the first start and after every stop.
    pub fn initial() -> Self {
        Self {
            speed: format_speed(0.0),
            coordinates: format_coordinates(0.0, 0.0),
            distance: format_distance(0.0),
            time: format!("Time: {}", format_elapsed(0.0)),
        }
    }

    pub fn snapshot<C: Clock>(tracker: &SessionTracker<C>) -> Self {
        let state = tracker.state();
        let (latitude, longitude) = state.last_position().unwrap_or((0.0, 0.0));

        Self {
            speed: format_speed(state.current_speed()),
            coordinates: format_coordinates(latitude, longitude),
            distance: format_distance(state.total_distance_meters()),
            time: format!("Time: {}", format_elapsed(tracker.elapsed_seconds().unwrap_or(0.0))),
        }
    }
}

impl Default for SessionDisplay {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for SessionDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {} | {}", self.time, self.speed, self.distance, self.coordinates)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use crate::{clock::ManualClock, position_sample::PositionSample};

    use super::*;

    #[test]
    fn elapsed_is_zero_padded() {
        assert_eq!(format_elapsed(0.0), "00:00");
        assert_eq!(format_elapsed(9.99), "00:09");
        assert_eq!(format_elapsed(65.0), "01:05");
        assert_eq!(format_elapsed(600.0), "10:00");
    }

    #[test]
    fn minutes_are_not_capped() {
        assert_eq!(format_elapsed(3600.0), "60:00");
        assert_eq!(format_elapsed(100.0 * 60.0 + 7.0), "100:07");
    }

    #[test]
    fn negative_and_nan_elapsed_show_zero() {
        assert_eq!(format_elapsed(-3.0), "00:00");
        assert_eq!(format_elapsed(f64::NAN), "00:00");
    }

    #[test]
    fn precision_per_field() {
        assert_eq!(format_speed(3.14159), "Speed: 3.1 m/s");
        assert_eq!(format_coordinates(56.162939, 10.203921), "Latitude: 56.1629, Longitude: 10.2039");
        assert_eq!(format_distance(1234.7), "Distance: 1235 m");
    }

    #[test]
    fn stopped_tracker_shows_initial_display() {
        let tracker = SessionTracker::with_clock(ManualClock::new(Utc::now()));
        assert_eq!(SessionDisplay::snapshot(&tracker), SessionDisplay::initial());
    }

    #[test]
    fn snapshot_of_running_session() {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let mut tracker = SessionTracker::with_clock(clock.clone());
        tracker.start();
        tracker.on_sample(&PositionSample::new(0.0, 0.0, None, clock.now()));
        tracker.on_sample(&PositionSample::new(0.0, 0.01, Some(1.26), clock.now()));
        clock.advance(Duration::seconds(65));

        let display = SessionDisplay::snapshot(&tracker);

        assert_eq!(display.time, "Time: 01:05");
        assert_eq!(display.speed, "Speed: 1.3 m/s");
        assert_eq!(display.coordinates, "Latitude: 0.0000, Longitude: 0.0100");
        assert_eq!(display.distance, "Distance: 1112 m");
    }
}
