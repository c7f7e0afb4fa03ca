//! Orientation & time-geometry engine for a prayer-companion app.
//!
//! Everything in this crate is independent of any UI framework. It takes
//! sensor samples and location fixes in, and produces plain data out:
//!   - a tilt-compensated compass heading with a calibration state machine,
//!   - the great-circle bearing and distance to the Kaaba,
//!   - the next prayer event, countdown, and progress through the current
//!     interval with day-boundary rollover.
//!
//! Hosts feed `CompassSession` from their sensor callbacks and poll
//! `SessionStatus` once per tick; the demo binary wires the same path to
//! simulated streams.

pub mod astro;
pub mod declination;
pub mod error;
pub mod geo;
pub mod heading;
pub mod qibla;
pub mod schedule;
pub mod sensors;
pub mod session;
pub mod types;

pub use astro::{CalculationMethod, Madhab, SolarTimetable, TimetableSource};
pub use error::{Error, Result};
pub use heading::{HeadingConfig, HeadingFilter};
pub use qibla::{AccuracyLevel, QiblaConfig, QiblaEngine, KAABA};
pub use schedule::PrayerScheduleEngine;
pub use session::{CompassSession, LocationContext, SessionConfig, SessionStatus};
pub use types::{
    Bearing, CalibrationState, GeoPoint, HeadingSample, NextEventStatus, PrayerEvent,
    PrayerEventSet, PrayerName, SensorSample,
};
