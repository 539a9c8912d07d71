use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    time::Duration,
};

use chrono::{DateTime, Utc};
use geo_types::Point;
use session_tracker_lib::{Clock, PositionSample, PositionSource, SourceError};
use tokio::time::Instant;

/// Gap used between points that have no timestamps.
const UNTIMED_GAP: Duration = Duration::from_secs(1);

struct ReplayPoint {
    position: Point,
    time: Option<DateTime<Utc>>,
    speed: Option<f64>,
}

/// Plays a recorded GPX track back as if a device was reporting it live.
///
/// Points are released with the same spacing they were recorded with, divided by
/// `speedup`, and stamped with the clock's current time so they look fresh.
pub struct GpxReplaySource<C: Clock> {
    points: Vec<ReplayPoint>,
    next: usize,
    due: Option<Instant>,
    speedup: f64,
    clock: C,
    name: String,
}

impl<C: Clock> GpxReplaySource<C> {
    pub fn open(path: &Path, speedup: f64, clock: C) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let mut source = Self::from_reader(BufReader::new(file), speedup, clock)?;
        source.name = format!("gpx:{}", path.display());
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R, speedup: f64, clock: C) -> Result<Self, SourceError> {
        if !(speedup.is_finite() && speedup > 0.0) {
            return Err(SourceError::Unavailable(format!("Invalid replay speed-up {}", speedup)));
        }

        let gpx = gpx::read(reader).map_err(|err| SourceError::Malformed(format!("Failed to read gpx: {err}")))?;

        let mut points = Vec::new();
        for track in gpx.tracks {
            for segment in track.segments {
                for point in segment.points {
                    let time = point
                        .time
                        .as_ref()
                        .and_then(|t| t.format().ok())
                        .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                        .map(|t| t.with_timezone(&Utc));

                    points.push(ReplayPoint {
                        position: point.point(),
                        time,
                        speed: point.speed,
                    });
                }
            }
        }

        if points.is_empty() {
            return Err(SourceError::Unavailable("GPX file has no track points".into()));
        }

        tracing::debug!("Loaded {} track points for replay", points.len());

        Ok(Self {
            points,
            next: 0,
            due: None,
            speedup,
            clock,
            name: "gpx".into(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.points.len() - self.next
    }

    fn delay_before(&self, index: usize) -> Duration {
        if index == 0 {
            return Duration::ZERO;
        }

        let gap = match (self.points[index - 1].time, self.points[index].time) {
            (Some(prev), Some(curr)) => curr.signed_duration_since(prev).to_std().unwrap_or(Duration::ZERO),
            _ => UNTIMED_GAP,
        };

        gap.div_f64(self.speedup)
    }
}

#[async_trait::async_trait]
impl<C: Clock + Send> PositionSource for GpxReplaySource<C> {
    /// The deadline is remembered between calls, so a cancelled wait picks up where it left off.
    async fn next_sample(&mut self) -> Result<Option<PositionSample>, SourceError> {
        if self.next >= self.points.len() {
            return Ok(None);
        }

        let due = match self.due {
            Some(due) => due,
            None => {
                let due = Instant::now() + self.delay_before(self.next);
                self.due = Some(due);
                due
            }
        };

        tokio::time::sleep_until(due).await;

        self.due = None;
        let point = &self.points[self.next];
        self.next += 1;

        Ok(Some(PositionSample::from_point(point.position, point.speed, self.clock.now())))
    }

    async fn release(&mut self) {
        self.due = None;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
