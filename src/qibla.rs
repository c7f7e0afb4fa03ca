//! Target-relative pointing: combines the great-circle bearing to the Kaaba,
//! the magnetic declination estimate, and the filtered compass heading into
//! the angle the device must rotate to face the target.

use serde::{Deserialize, Serialize};

use crate::declination;
use crate::geo;
use crate::types::{GeoPoint, HeadingSample};

/// The fixed target: the Kaaba in Mecca.
pub const KAABA: GeoPoint = GeoPoint {
    latitude_deg: 21.4225,
    longitude_deg: 39.8262,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QiblaConfig {
    /// Deviation at or below which the device counts as aligned (degrees).
    pub alignment_threshold_deg: f64,
    /// Minimum spacing between alignment pulses (seconds).
    pub pulse_cooldown_secs: f64,
}

impl Default for QiblaConfig {
    fn default() -> Self {
        Self {
            alignment_threshold_deg: 3.0,
            pulse_cooldown_secs: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyLevel {
    High,
    Medium,
    Low,
}

/// Composes bearing, heading, and declination into the pointing angle.
/// Shared by the engine and the session context so there is exactly one copy
/// of this arithmetic.
pub fn relative_angle(bearing_deg: f64, heading_deg: f64, declination_deg: f64) -> f64 {
    (bearing_deg - (heading_deg + declination_deg)).rem_euclid(360.0)
}

/// Angular deviation of a pointing angle from dead-ahead, in [0, 180].
pub fn deviation_deg(pointing_deg: f64) -> f64 {
    let p = pointing_deg.rem_euclid(360.0);
    p.min(360.0 - p)
}

struct PulseGate {
    last_trigger: f64,
    cooldown_secs: f64,
}

impl PulseGate {
    fn new(cooldown_secs: f64) -> Self {
        Self { last_trigger: f64::NEG_INFINITY, cooldown_secs }
    }

    fn ready_and_touch(&mut self, now: f64) -> bool {
        if now - self.last_trigger >= self.cooldown_secs {
            self.last_trigger = now;
            true
        } else {
            false
        }
    }
}

pub struct QiblaEngine {
    config: QiblaConfig,
    year: i32,
    pulse: PulseGate,
}

impl QiblaEngine {
    /// `year` feeds the declination model; pass the current calendar year.
    pub fn new(config: QiblaConfig, year: i32) -> Self {
        let pulse = PulseGate::new(config.pulse_cooldown_secs);
        Self { config, year, pulse }
    }

    /// The angle the device must rotate, relative to its current facing, to
    /// point at the Kaaba. Degrees in [0, 360).
    pub fn pointing_angle(&self, location: GeoPoint, heading: HeadingSample) -> f64 {
        let bearing = geo::bearing_deg(location, KAABA);
        let decl = declination::declination_deg(location, self.year);
        relative_angle(bearing, heading.degrees, decl)
    }

    pub fn distance_km(&self, location: GeoPoint) -> f64 {
        geo::distance_km(location, KAABA)
    }

    pub fn bearing_deg(&self, location: GeoPoint) -> f64 {
        geo::bearing_deg(location, KAABA)
    }

    pub fn declination_deg(&self, location: GeoPoint) -> f64 {
        declination::declination_deg(location, self.year)
    }

    pub fn is_aligned(&self, pointing_deg: f64) -> bool {
        deviation_deg(pointing_deg) <= self.config.alignment_threshold_deg
    }

    /// Coarse accuracy classification of the current pointing angle.
    pub fn classify(&self, pointing_deg: f64) -> AccuracyLevel {
        let dev = deviation_deg(pointing_deg);
        let thr = self.config.alignment_threshold_deg;
        if dev <= thr {
            AccuracyLevel::High
        } else if dev <= 3.0 * thr {
            AccuracyLevel::Medium
        } else {
            AccuracyLevel::Low
        }
    }

    /// True at most once per cooldown period while aligned. Drives a single
    /// host-side feedback pulse; the rate limit prevents feedback storms when
    /// the heading hovers around the threshold.
    pub fn alignment_pulse(&mut self, pointing_deg: f64, now_secs: f64) -> bool {
        if !self.is_aligned(pointing_deg) {
            return false;
        }
        self.pulse.ready_and_touch(now_secs)
    }
}
