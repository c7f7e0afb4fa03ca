//! Coarse magnetic declination estimate.
//!
//! This is a low-fidelity analytic stand-in for a real geomagnetic model
//! (WMM/IGRF): a trigonometric function of latitude and longitude, linearly
//! attenuated by years elapsed since the 2020 reference epoch. Accuracy is
//! ±several degrees, a known limitation of the model rather than of this
//! code. Substitute a real model wholesale if better accuracy is ever
//! required.

use crate::types::GeoPoint;

const REFERENCE_EPOCH_YEAR: i32 = 2020;

/// Estimated magnetic declination in degrees (east positive) at `point`
/// during calendar `year`.
pub fn declination_deg(point: GeoPoint, year: i32) -> f64 {
    let lat = point.latitude_deg.to_radians();
    let lon = point.longitude_deg.to_radians();
    let years_since_epoch = (year - REFERENCE_EPOCH_YEAR) as f64;

    (11.5 * lat.sin() + 0.5 * (2.0 * lon).cos()) * (1.0 - 0.02 * years_since_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_epoch_value_unattenuated() {
        let d = declination_deg(p(45.0, 0.0), 2020);
        // 11.5 * sin(45°) + 0.5 * cos(0) = 8.6317...
        assert_relative_eq!(d, 11.5 * 45.0_f64.to_radians().sin() + 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_attenuates_after_epoch() {
        let at_epoch = declination_deg(p(45.0, 10.0), 2020);
        let later = declination_deg(p(45.0, 10.0), 2025);
        assert!(later.abs() < at_epoch.abs());
        assert_relative_eq!(later, at_epoch * 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_magnitude_stays_coarse() {
        // The approximation never exceeds 12 degrees anywhere on Earth at epoch.
        for lat in [-80.0, -40.0, 0.0, 40.0, 80.0] {
            for lon in [-170.0, -60.0, 0.0, 60.0, 170.0] {
                assert!(declination_deg(p(lat, lon), 2020).abs() <= 12.0);
            }
        }
    }
}
