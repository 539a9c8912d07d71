use crate::position_sample::Coordinates;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two (lat, lon) points given in degrees.
/// Spherical earth, so expect errors around 0.5% against the ellipsoid.
pub fn haversine_distance(p1: Coordinates, p2: Coordinates) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    // Rounding can push `a` just past 1 for nearly antipodal points
    let a = a.clamp(0., 1.);
    let c = 2. * f64::atan2(a.sqrt(), (1. - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!((actual - expected).abs() <= tolerance, "expected {expected} ± {tolerance}, got {actual}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_distance((56.15, 10.2), (56.15, 10.2)), 0.0);
    }

    #[test]
    fn one_degree_latitude_at_equator() {
        let d = haversine_distance((0.0, 0.0), (1.0, 0.0));
        assert_close(d, 111_195.0, 111_195.0 * 0.01);
    }

    #[test]
    fn one_degree_longitude_at_equator_matches_latitude() {
        let lat = haversine_distance((0.0, 0.0), (1.0, 0.0));
        let lon = haversine_distance((0.0, 0.0), (0.0, 1.0));
        assert_close(lat, lon, 1e-6);
    }

    #[test]
    fn is_symmetric() {
        let aarhus = (56.1629, 10.2039);
        let copenhagen = (55.6761, 12.5683);
        assert_close(haversine_distance(aarhus, copenhagen), haversine_distance(copenhagen, aarhus), 1e-6);
        // Roughly 157 km as the crow flies
        assert_close(haversine_distance(aarhus, copenhagen) / 1000.0, 157.0, 3.0);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_distance((0.0, 0.0), (0.0, 180.0));
        assert_close(d, std::f64::consts::PI * EARTH_RADIUS_METERS, 1.0);
    }

    #[test]
    fn near_antipodes_near_the_poles_stay_finite() {
        let d = haversine_distance((-89.919, 0.0), (89.919, 180.0));
        assert!(d.is_finite(), "got {}", d);
        assert_close(d, std::f64::consts::PI * EARTH_RADIUS_METERS, 1.0);
    }
}
