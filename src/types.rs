use chrono::{DateTime, NaiveDate, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SensorSample {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// A geographic position. Construction is range-checked: latitude must lie in
/// [-90, 90] and longitude in [-180, 180], otherwise `InvalidCoordinate`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl GeoPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude_deg)
            || !(-180.0..=180.0).contains(&longitude_deg)
            || latitude_deg.is_nan()
            || longitude_deg.is_nan()
        {
            return Err(Error::InvalidCoordinate {
                latitude: latitude_deg,
                longitude: longitude_deg,
            });
        }
        Ok(Self { latitude_deg, longitude_deg })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Calibrating,
    Stable,
}

/// Smoothed compass heading in degrees, [0, 360). Overwritten each sensor
/// tick; not retained by the engine beyond the current update.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HeadingSample {
    pub degrees: f64,
}

impl HeadingSample {
    pub fn new(degrees: f64) -> Self {
        Self { degrees: degrees.rem_euclid(360.0) }
    }
}

/// Great-circle initial bearing in degrees, [0, 360). Stable until the
/// location changes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Bearing {
    pub degrees: f64,
}

impl Bearing {
    pub fn new(degrees: f64) -> Self {
        Self { degrees: degrees.rem_euclid(360.0) }
    }
}

/// The six daily prayer slots, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    pub const ALL: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrayerEvent {
    pub name: PrayerName,
    pub instant: DateTime<Utc>,
}

/// The ordered prayer events of one calendar day. Slots the astronomical
/// source could not produce are simply absent, so the set may hold fewer
/// than six entries. Coincident instants keep their slot order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrayerEventSet {
    pub date: NaiveDate,
    events: Vec<PrayerEvent>,
}

impl PrayerEventSet {
    pub fn new(date: NaiveDate, mut events: Vec<PrayerEvent>) -> Self {
        // Stable sort: exact ties retain canonical slot order.
        events.sort_by_key(|e| e.instant);
        Self { date, events }
    }

    pub fn events(&self) -> &[PrayerEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&PrayerEvent> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&PrayerEvent> {
        self.events.last()
    }
}

/// Derived each schedule tick; never persisted.
#[derive(Clone, Debug)]
pub struct NextEventStatus {
    pub event: PrayerEvent,
    pub remaining: chrono::Duration,
    pub progress_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_geo_point_range_check() {
        assert!(GeoPoint::new(21.4225, 39.8262).is_ok());
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_heading_sample_normalizes() {
        assert!((HeadingSample::new(-10.0).degrees - 350.0).abs() < 1e-9);
        assert!((HeadingSample::new(370.0).degrees - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_set_stable_order_on_ties() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let set = PrayerEventSet::new(
            date,
            vec![
                PrayerEvent { name: PrayerName::Dhuhr, instant: t },
                PrayerEvent { name: PrayerName::Asr, instant: t },
            ],
        );
        assert_eq!(set.events()[0].name, PrayerName::Dhuhr);
        assert_eq!(set.events()[1].name, PrayerName::Asr);
    }
}
