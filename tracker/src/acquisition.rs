use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use session_tracker_lib::PositionSample;

/// How samples are requested from, and accepted out of, a location watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionPolicy {
    /// Samples older than this when they arrive are cached fixes and get dropped.
    pub max_sample_age_ms: u64,
    /// How long to wait for a sample before telling the user.
    pub sample_timeout_ms: u64,
    /// Advisory. It is logged when a run starts, but none of the current
    /// sources (GPX replay, device endpoint) can change how precise their fixes are.
    pub high_accuracy: bool,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self {
            max_sample_age_ms: 10_000,
            sample_timeout_ms: 5_000,
            high_accuracy: true,
        }
    }
}

impl AcquisitionPolicy {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    pub fn max_sample_age(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.max_sample_age_ms as i64)
    }

    /// A sample stamped in the future (device clock ahead of ours) counts as fresh.
    pub fn is_fresh(&self, sample: &PositionSample, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(sample.timestamp) <= self.max_sample_age()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample_at(timestamp: DateTime<Utc>) -> PositionSample {
        PositionSample::new(56.0, 10.0, None, timestamp)
    }

    #[test]
    fn defaults_follow_browser_watch_options() {
        let policy = AcquisitionPolicy::default();
        assert_eq!(policy.max_sample_age_ms, 10_000);
        assert_eq!(policy.sample_timeout(), std::time::Duration::from_secs(5));
        assert!(policy.high_accuracy);
    }

    #[test]
    fn freshness_boundary() {
        let policy = AcquisitionPolicy::default();
        let now = Utc::now();

        assert!(policy.is_fresh(&sample_at(now), now));
        assert!(policy.is_fresh(&sample_at(now - Duration::seconds(10)), now));
        assert!(!policy.is_fresh(&sample_at(now - Duration::milliseconds(10_001)), now));
        assert!(policy.is_fresh(&sample_at(now + Duration::seconds(30)), now));
    }
}
