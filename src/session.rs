//! Single-owner integration of the heading filter, Qibla engine, and prayer
//! schedule.
//!
//! Sensor callbacks mutate the filter from one serialized stream; location
//! updates publish a complete, immutable `LocationContext` behind an atomic
//! Arc swap, so the schedule tick always reads either the old or the fully
//! updated pair and never partial state. Teardown is a plain drop and is
//! safe at any point; recalibration leaves the filter in a valid
//! Calibrating state.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::astro::{CalculationMethod, Madhab, SolarTimetable};
use crate::heading::{HeadingConfig, HeadingFilter};
use crate::qibla::{self, AccuracyLevel, QiblaConfig, QiblaEngine};
use crate::schedule::PrayerScheduleEngine;
use crate::types::{
    Bearing, CalibrationState, GeoPoint, PrayerEventSet, PrayerName, SensorSample,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub heading: HeadingConfig,
    pub qibla: QiblaConfig,
    pub method: CalculationMethod,
    pub madhab: Madhab,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heading: HeadingConfig::default(),
            qibla: QiblaConfig::default(),
            method: CalculationMethod::Karachi,
            madhab: Madhab::Hanafi,
        }
    }
}

/// Everything derived from a location fix, bundled so it can be replaced in
/// one step: the fix itself, the bearing and declination it implies, and the
/// day's prayer events. Immutable once published.
#[derive(Clone, Debug)]
pub struct LocationContext {
    pub location: GeoPoint,
    pub qibla_bearing: Bearing,
    pub declination_deg: f64,
    pub events: PrayerEventSet,
}

/// Per-tick snapshot handed to the presentation layer.
#[derive(Clone, Debug, Serialize)]
pub struct SessionStatus {
    pub timestamp: DateTime<Utc>,
    pub calibration_state: CalibrationState,
    pub calibration_progress: f64,
    pub heading_deg: Option<f64>,
    pub pointing_deg: Option<f64>,
    pub rotation_deg: Option<f64>,
    pub accuracy: Option<AccuracyLevel>,
    pub aligned: bool,
    pub alignment_pulse: bool,
    pub qibla_bearing_deg: Option<f64>,
    pub declination_deg: Option<f64>,
    pub distance_km: Option<f64>,
    pub next_prayer: Option<PrayerName>,
    pub next_prayer_at: Option<DateTime<Utc>>,
    pub remaining_secs: Option<i64>,
    pub progress_percent: Option<f64>,
}

pub struct CompassSession {
    filter: HeadingFilter,
    qibla: QiblaEngine,
    schedule: PrayerScheduleEngine,
    context: RwLock<Option<Arc<LocationContext>>>,
}

impl CompassSession {
    /// `year` feeds the declination model; pass the current calendar year.
    pub fn new(config: SessionConfig, year: i32) -> Self {
        let source = SolarTimetable::new(config.method, config.madhab);
        Self {
            filter: HeadingFilter::new(config.heading.clone()),
            qibla: QiblaEngine::new(config.qibla.clone(), year),
            schedule: PrayerScheduleEngine::new(Box::new(source)),
            context: RwLock::new(None),
        }
    }

    pub fn ingest_accelerometer(&mut self, sample: &SensorSample) {
        self.filter.ingest_accelerometer(sample);
    }

    pub fn ingest_magnetometer(&mut self, sample: &SensorSample) {
        self.filter.ingest_magnetometer(sample);
    }

    /// Publish a new location fix (and the calendar day it applies to).
    /// Builds the complete derived context first, then swaps it in; readers
    /// observe the old pair or the new pair, nothing in between. Also the
    /// entry point for date rollover: call again with the new date.
    pub fn update_location(&self, location: GeoPoint, date: NaiveDate) {
        let events = self.schedule.daily_events(location, date);
        let context = LocationContext {
            location,
            qibla_bearing: Bearing::new(self.qibla.bearing_deg(location)),
            declination_deg: self.qibla.declination_deg(location),
            events,
        };
        log::info!(
            "location updated: lat {:.4} lon {:.4}, bearing {:.1}°, {} events for {}",
            location.latitude_deg,
            location.longitude_deg,
            context.qibla_bearing.degrees,
            context.events.events().len(),
            date
        );
        *self.context.write().unwrap() = Some(Arc::new(context));
    }

    /// The currently published context, if a location fix has arrived.
    pub fn context(&self) -> Option<Arc<LocationContext>> {
        self.context.read().unwrap().clone()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.filter.state()
    }

    /// Explicit user retry entry point. Safe at any time.
    pub fn request_recalibration(&mut self) {
        log::info!("recalibration requested");
        self.filter.request_recalibration();
    }

    /// Recompute the derived outputs for the presentation layer. Idempotent
    /// apart from the rotation smoothing and the rate-limited pulse; safe to
    /// call on any cadence (the demo binary uses 1 s).
    pub fn tick(&mut self, now: DateTime<Utc>) -> SessionStatus {
        let context = self.context();
        let heading = self.filter.true_heading();

        let mut status = SessionStatus {
            timestamp: now,
            calibration_state: self.filter.state(),
            calibration_progress: self.filter.calibration_progress(),
            heading_deg: heading,
            pointing_deg: None,
            rotation_deg: None,
            accuracy: None,
            aligned: false,
            alignment_pulse: false,
            qibla_bearing_deg: None,
            declination_deg: None,
            distance_km: None,
            next_prayer: None,
            next_prayer_at: None,
            remaining_secs: None,
            progress_percent: None,
        };

        let Some(context) = context else {
            return status;
        };

        status.qibla_bearing_deg = Some(context.qibla_bearing.degrees);
        status.declination_deg = Some(context.declination_deg);
        status.distance_km = Some(self.qibla.distance_km(context.location));

        if let Some(heading_deg) = heading {
            let pointing = qibla::relative_angle(
                context.qibla_bearing.degrees,
                heading_deg,
                context.declination_deg,
            );
            status.pointing_deg = Some(pointing);
            status.rotation_deg = Some(self.filter.smoothed_rotation(pointing));
            status.accuracy = Some(self.qibla.classify(pointing));
            status.aligned = self.qibla.is_aligned(pointing);
            status.alignment_pulse = self
                .qibla
                .alignment_pulse(pointing, now.timestamp_millis() as f64 / 1000.0);
        }

        if let Some(next) = self.schedule.next_event(&context.events, context.location, now) {
            status.next_prayer = Some(next.event.name);
            status.next_prayer_at = Some(next.event.instant);
            status.remaining_secs = Some(next.remaining.num_seconds());
            status.progress_percent = Some(next.progress_percent);
        }

        status
    }
}
