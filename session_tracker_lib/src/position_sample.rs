use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::source::SourceError;

/// (latitude, longitude) in degrees.
pub type Coordinates = (f64, f64);

/// One position reported by the device. Speed is whatever the device reported,
/// which may be missing or nonsense depending on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, speed: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            speed,
            timestamp,
        }
    }

    /// Builds a sample from a geo point, where x is longitude and y is latitude.
    pub fn from_point(point: Point, speed: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self::new(point.y(), point.x(), speed, timestamp)
    }

    pub fn coordinates(&self) -> Coordinates {
        (self.latitude, self.longitude)
    }

    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SourceError> {
        bincode::serialize(self).map_err(|err| SourceError::Malformed(format!("Failed to serialize sample: {err}")))
    }
}

impl TryFrom<&[u8]> for PositionSample {
    type Error = SourceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(value).map_err(|err| SourceError::Malformed(format!("Failed to deserialize sample: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_uses_longitude_as_x() {
        let sample = PositionSample::new(56.2, 10.4, None, Utc::now());
        let point = sample.point();

        assert_eq!(point.x(), 10.4);
        assert_eq!(point.y(), 56.2);
        assert_eq!(PositionSample::from_point(point, None, sample.timestamp), sample);
    }

    #[test]
    fn bytes_decode_back_to_sample() {
        let sample = PositionSample::new(55.6761, 12.5683, Some(4.2), Utc::now());
        let bytes = sample.to_bytes().unwrap();

        assert_eq!(PositionSample::try_from(bytes.as_slice()).unwrap(), sample);
    }

    #[test]
    fn truncated_bytes_are_malformed() {
        let sample = PositionSample::new(55.6761, 12.5683, None, Utc::now());
        let bytes = sample.to_bytes().unwrap();

        let res = PositionSample::try_from(&bytes[..4]);
        assert!(matches!(res, Err(SourceError::Malformed(_))));
    }

    #[test]
    fn json_keeps_missing_speed() {
        let json = r#"{"latitude":1.5,"longitude":2.5,"speed":null,"timestamp":"2024-05-01T10:00:00Z"}"#;
        let sample: PositionSample = serde_json::from_str(json).unwrap();

        assert_eq!(sample.coordinates(), (1.5, 2.5));
        assert_eq!(sample.speed, None);
    }
}
