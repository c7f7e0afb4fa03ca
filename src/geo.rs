//! Great-circle geometry on the spherical Earth model (R = 6371 km).

use crate::types::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Initial great-circle bearing from `from` to `to`, degrees in [0, 360).
///
/// Coincident points are degenerate: atan2(0, 0) yields 0.0 rather than an
/// error, so callers never see a crash for a zero-length path.
pub fn bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.latitude_deg.to_radians();
    let phi2 = to.latitude_deg.to_radians();
    let d_lon = (to.longitude_deg - from.longitude_deg).to_radians();

    let y = d_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Haversine distance between two points in kilometres.
pub fn distance_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.latitude_deg - from.latitude_deg).to_radians();
    let d_lon = (to.longitude_deg - from.longitude_deg).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude_deg.to_radians().cos()
            * to.latitude_deg.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_bearing_in_range() {
        let cases = [
            (p(0.0, 0.0), p(10.0, 10.0)),
            (p(51.5, -0.1), p(21.4225, 39.8262)),
            (p(-33.9, 151.2), p(21.4225, 39.8262)),
            (p(64.1, -21.9), p(21.4225, 39.8262)),
        ];
        for (a, b) in cases {
            let brg = bearing_deg(a, b);
            assert!((0.0..360.0).contains(&brg), "bearing {} out of range", brg);
        }
    }

    #[test]
    fn test_bearing_coincident_points_does_not_crash() {
        let a = p(21.4225, 39.8262);
        let brg = bearing_deg(a, a);
        assert!(brg.is_finite());
        assert_relative_eq!(brg, 0.0);
    }

    #[test]
    fn test_bearing_due_north_and_east() {
        // Due north along a meridian.
        assert_relative_eq!(bearing_deg(p(0.0, 20.0), p(10.0, 20.0)), 0.0, epsilon = 1e-9);
        // Due east along the equator.
        assert_relative_eq!(bearing_deg(p(0.0, 0.0), p(0.0, 10.0)), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_symmetry() {
        let a = p(21.3891, 39.8579);
        let b = p(51.5074, -0.1278);
        assert_relative_eq!(distance_km(a, b), distance_km(b, a), epsilon = 1e-9);
    }

    #[test]
    fn test_mecca_fixture() {
        // From a point near Mecca to the Kaaba: ~4.7 km, heading NNW.
        let from = p(21.3891, 39.8579);
        let kaaba = p(21.4225, 39.8262);
        let d = distance_km(from, kaaba);
        assert!((d - 4.7).abs() < 1.0, "expected ~4.7 km, got {}", d);
        let brg = bearing_deg(from, kaaba);
        assert!(
            (290.0..=350.0).contains(&brg),
            "expected roughly NNW, got {}",
            brg
        );
    }
}
