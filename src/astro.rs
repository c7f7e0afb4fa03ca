//! Daily prayer timetable from sun position.
//!
//! `TimetableSource` is the collaborator seam: the schedule engine only
//! sequences events, it never computes astronomy itself. `SolarTimetable` is
//! the shipped source: standard sun-position equations (Julian day, solar
//! declination, equation of time) with the twilight angles of the configured
//! calculation convention and the madhab shadow factor for Asr.
//!
//! At extreme latitudes some slots have no solution (the sun never reaches
//! the required altitude); those slots are omitted from the day's set.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, PrayerEvent, PrayerEventSet, PrayerName};

/// Supplies the ordered prayer events for one calendar day at a location.
/// Implementations must be pure: identical inputs yield identical sets.
pub trait TimetableSource: Send + Sync {
    fn daily_events(&self, location: GeoPoint, date: NaiveDate) -> PrayerEventSet;
}

/// Twilight-angle conventions. Angles are degrees of solar depression below
/// the horizon for Fajr and Isha respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMethod {
    /// University of Islamic Sciences, Karachi (18 / 18).
    Karachi,
    /// Muslim World League (18 / 17).
    MuslimWorldLeague,
    /// Islamic Society of North America (15 / 15).
    Isna,
    /// Egyptian General Authority of Survey (19.5 / 17.5).
    Egyptian,
}

impl CalculationMethod {
    pub fn fajr_angle(&self) -> f64 {
        match self {
            CalculationMethod::Karachi => 18.0,
            CalculationMethod::MuslimWorldLeague => 18.0,
            CalculationMethod::Isna => 15.0,
            CalculationMethod::Egyptian => 19.5,
        }
    }

    pub fn isha_angle(&self) -> f64 {
        match self {
            CalculationMethod::Karachi => 18.0,
            CalculationMethod::MuslimWorldLeague => 17.0,
            CalculationMethod::Isna => 15.0,
            CalculationMethod::Egyptian => 17.5,
        }
    }
}

/// Juristic school governing the Asr shadow factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Madhab {
    Shafi,
    Hanafi,
}

impl Madhab {
    pub fn shadow_factor(&self) -> f64 {
        match self {
            Madhab::Shafi => 1.0,
            Madhab::Hanafi => 2.0,
        }
    }
}

/// Solar altitude defining sunrise and sunset (refraction + solar radius).
const HORIZON_ALTITUDE_DEG: f64 = -0.833;

#[derive(Clone, Copy, Debug)]
pub struct SolarTimetable {
    pub method: CalculationMethod,
    pub madhab: Madhab,
}

impl Default for SolarTimetable {
    fn default() -> Self {
        Self {
            method: CalculationMethod::Karachi,
            madhab: Madhab::Hanafi,
        }
    }
}

impl SolarTimetable {
    pub fn new(method: CalculationMethod, madhab: Madhab) -> Self {
        Self { method, madhab }
    }
}

impl TimetableSource for SolarTimetable {
    fn daily_events(&self, location: GeoPoint, date: NaiveDate) -> PrayerEventSet {
        let jd = julian_day(date);
        let lat = location.latitude_deg.to_radians();
        let lon = location.longitude_deg;

        let dhuhr = solar_noon_utc_hours(jd, lon);
        let slots: [(PrayerName, Option<f64>); 6] = [
            (
                PrayerName::Fajr,
                angle_time(jd, lat, lon, -self.method.fajr_angle(), true),
            ),
            (
                PrayerName::Sunrise,
                angle_time(jd, lat, lon, HORIZON_ALTITUDE_DEG, true),
            ),
            (PrayerName::Dhuhr, Some(dhuhr)),
            (
                PrayerName::Asr,
                asr_time(jd, lat, lon, self.madhab.shadow_factor()),
            ),
            (
                PrayerName::Maghrib,
                angle_time(jd, lat, lon, HORIZON_ALTITUDE_DEG, false),
            ),
            (
                PrayerName::Isha,
                angle_time(jd, lat, lon, -self.method.isha_angle(), false),
            ),
        ];

        let mut events = Vec::with_capacity(6);
        let mut omitted = Vec::new();
        for (name, hours) in slots {
            match hours {
                Some(h) => events.push(PrayerEvent {
                    name,
                    instant: utc_instant(date, h),
                }),
                None => omitted.push(name.as_str()),
            }
        }
        if !omitted.is_empty() {
            log::warn!(
                "no solution for {} at lat {:.2} on {}; slots omitted",
                omitted.join(", "),
                location.latitude_deg,
                date
            );
        }

        PrayerEventSet::new(date, events)
    }
}

/// Julian day number at 0h UT of a calendar date.
fn julian_day(date: NaiveDate) -> f64 {
    let mut y = date.year() as f64;
    let mut m = date.month() as f64;
    let d = date.day() as f64;
    if m <= 2.0 {
        y -= 1.0;
        m += 12.0;
    }
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + d + b - 1524.5
}

/// Solar declination (radians) and equation of time (hours) at a Julian day.
fn sun_position(jd: f64) -> (f64, f64) {
    let d = jd - 2451545.0;
    let g = (357.529 + 0.98560028 * d).rem_euclid(360.0).to_radians();
    let q = (280.459 + 0.98564736 * d).rem_euclid(360.0);
    let l = (q + 1.915 * g.sin() + 0.020 * (2.0 * g).sin())
        .rem_euclid(360.0)
        .to_radians();
    let e = (23.439 - 0.000_000_36 * d).to_radians();

    let declination = (e.sin() * l.sin()).asin();
    let ra_hours = (e.cos() * l.sin()).atan2(l.cos()).to_degrees().rem_euclid(360.0) / 15.0;
    let mut equation_of_time = q / 15.0 - ra_hours;
    if equation_of_time > 12.0 {
        equation_of_time -= 24.0;
    } else if equation_of_time < -12.0 {
        equation_of_time += 24.0;
    }
    (declination, equation_of_time)
}

/// Hour angle (degrees from solar noon) at which the sun reaches the given
/// altitude. None when the sun never does (polar day/night).
fn hour_angle_deg(lat_rad: f64, declination_rad: f64, altitude_deg: f64) -> Option<f64> {
    let alt = altitude_deg.to_radians();
    let cos_h = (alt.sin() - lat_rad.sin() * declination_rad.sin())
        / (lat_rad.cos() * declination_rad.cos());
    if !(-1.0..=1.0).contains(&cos_h) {
        return None;
    }
    Some(cos_h.acos().to_degrees())
}

fn solar_noon_utc_hours(jd: f64, lon_deg: f64) -> f64 {
    let mut t = 12.0 - lon_deg / 15.0;
    // One refinement pass: re-evaluate the equation of time at the estimate.
    for _ in 0..2 {
        let (_, eqt) = sun_position(jd + t / 24.0);
        t = 12.0 - lon_deg / 15.0 - eqt;
    }
    t
}

fn angle_time(jd: f64, lat_rad: f64, lon_deg: f64, altitude_deg: f64, before_noon: bool) -> Option<f64> {
    let mut t = 12.0 - lon_deg / 15.0;
    for _ in 0..2 {
        let (decl, eqt) = sun_position(jd + t / 24.0);
        let noon = 12.0 - lon_deg / 15.0 - eqt;
        let ha = hour_angle_deg(lat_rad, decl, altitude_deg)?;
        t = if before_noon { noon - ha / 15.0 } else { noon + ha / 15.0 };
    }
    Some(t)
}

/// Asr: the moment an object's shadow equals `factor` times its height plus
/// the noon shadow, expressed as a solar altitude.
fn asr_time(jd: f64, lat_rad: f64, lon_deg: f64, factor: f64) -> Option<f64> {
    let mut t = 12.0 - lon_deg / 15.0;
    for _ in 0..2 {
        let (decl, eqt) = sun_position(jd + t / 24.0);
        let noon = 12.0 - lon_deg / 15.0 - eqt;
        let shadow = factor + (lat_rad - decl).abs().tan();
        if shadow <= 0.0 {
            return None;
        }
        let altitude_deg = (1.0 / shadow).atan().to_degrees();
        let ha = hour_angle_deg(lat_rad, decl, altitude_deg)?;
        t = noon + ha / 15.0;
    }
    Some(t)
}

fn utc_instant(date: NaiveDate, utc_hours: f64) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    DateTime::<Utc>::from_naive_utc_and_offset(midnight, Utc)
        + Duration::milliseconds((utc_hours * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_day_canonical_order() {
        let source = SolarTimetable::default();
        let set = source.daily_events(p(33.6844, 73.0479), date(2026, 3, 15));
        let events = set.events();
        assert_eq!(events.len(), 6);
        let names: Vec<_> = events.iter().map(|e| e.name).collect();
        assert_eq!(names, PrayerName::ALL.to_vec());
        for pair in events.windows(2) {
            assert!(pair[0].instant < pair[1].instant, "events must increase");
        }
    }

    #[test]
    fn test_idempotent_for_same_inputs() {
        let source = SolarTimetable::default();
        let loc = p(24.8607, 67.0011); // Karachi
        let a = source.daily_events(loc, date(2026, 8, 6));
        let b = source.daily_events(loc, date(2026, 8, 6));
        assert_eq!(a.events().len(), b.events().len());
        for (x, y) in a.events().iter().zip(b.events()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.instant, y.instant);
        }
    }

    #[test]
    fn test_equinox_sunrise_near_six_local() {
        let source = SolarTimetable::default();
        let set = source.daily_events(p(51.5, 0.0), date(2026, 3, 20));
        let sunrise = set
            .events()
            .iter()
            .find(|e| e.name == PrayerName::Sunrise)
            .unwrap();
        let h = sunrise.instant.hour() as f64 + sunrise.instant.minute() as f64 / 60.0;
        assert!((5.6..=6.4).contains(&h), "equinox sunrise at {}", h);
    }

    #[test]
    fn test_mecca_noon_hour() {
        let source = SolarTimetable::default();
        let set = source.daily_events(p(21.4225, 39.8262), date(2026, 3, 15));
        let dhuhr = set
            .events()
            .iter()
            .find(|e| e.name == PrayerName::Dhuhr)
            .unwrap();
        // Longitude 39.83°E puts solar noon near 09:20 UTC.
        assert!((9..=10).contains(&dhuhr.instant.hour()));
    }

    #[test]
    fn test_polar_summer_omits_unsolvable_slots() {
        let source = SolarTimetable::default();
        // Tromsø, midnight sun: no sunrise/sunset and no 18° twilight.
        let set = source.daily_events(p(69.65, 18.96), date(2026, 6, 21));
        let names: Vec<_> = set.events().iter().map(|e| e.name).collect();
        assert!(!names.contains(&PrayerName::Fajr));
        assert!(!names.contains(&PrayerName::Maghrib));
        assert!(!names.contains(&PrayerName::Isha));
        assert!(names.contains(&PrayerName::Dhuhr));
        assert!(!set.is_empty());
        assert!(set.events().len() < 6);
    }

    #[test]
    fn test_hanafi_asr_later_than_shafi() {
        let loc = p(33.6844, 73.0479);
        let d = date(2026, 3, 15);
        let hanafi = SolarTimetable::new(CalculationMethod::Karachi, Madhab::Hanafi);
        let shafi = SolarTimetable::new(CalculationMethod::Karachi, Madhab::Shafi);
        let asr_of = |set: &PrayerEventSet| {
            set.events()
                .iter()
                .find(|e| e.name == PrayerName::Asr)
                .unwrap()
                .instant
        };
        assert!(asr_of(&hanafi.daily_events(loc, d)) > asr_of(&shafi.daily_events(loc, d)));
    }
}
