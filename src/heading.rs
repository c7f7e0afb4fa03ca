//! Tilt-compensated compass heading from fused accelerometer and
//! magnetometer streams.
//!
//! The filter owns a small calibration state machine: it starts out
//! `Calibrating`, watches a sliding window of filtered magnetometer samples,
//! and flips to `Stable` once the window's combined standard deviation drops
//! below the stability threshold. `request_recalibration` returns it to
//! `Calibrating` at any time.

use std::collections::VecDeque;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::types::{CalibrationState, SensorSample};

const VECTOR_NORM_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeadingConfig {
    /// Exponential low-pass smoothing constant for both sensor streams.
    pub alpha: f64,
    /// Calibration window capacity (samples).
    pub calibration_window: usize,
    /// Combined standard deviation below which the window counts as stable.
    pub stability_threshold: f64,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            calibration_window: 50,
            stability_threshold: 0.05,
        }
    }
}

struct LowPass {
    alpha: f64,
    value: Vector3<f64>,
    seeded: bool,
}

impl LowPass {
    fn new(alpha: f64) -> Self {
        Self { alpha, value: Vector3::zeros(), seeded: false }
    }

    fn update(&mut self, input: Vector3<f64>) -> Vector3<f64> {
        if !self.seeded {
            self.value = input;
            self.seeded = true;
            return input;
        }
        self.value = input * self.alpha + self.value * (1.0 - self.alpha);
        self.value
    }
}

pub struct HeadingFilter {
    config: HeadingConfig,
    accel: LowPass,
    mag: LowPass,
    state: CalibrationState,
    // Sliding window of filtered magnetometer vectors; oldest sample is
    // evicted when a new one arrives at capacity (not reset-on-fill).
    window: VecDeque<Vector3<f64>>,
    heading_deg: Option<f64>,
    last_rotation_deg: Option<f64>,
}

impl HeadingFilter {
    pub fn new(config: HeadingConfig) -> Self {
        let alpha = config.alpha;
        Self {
            accel: LowPass::new(alpha),
            mag: LowPass::new(alpha),
            state: CalibrationState::Calibrating,
            window: VecDeque::with_capacity(config.calibration_window),
            heading_deg: None,
            last_rotation_deg: None,
            config,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Window fill fraction in [0, 1]; 1.0 once the calibration window is full.
    pub fn calibration_progress(&self) -> f64 {
        if self.config.calibration_window == 0 {
            return 1.0;
        }
        (self.window.len() as f64 / self.config.calibration_window as f64).min(1.0)
    }

    pub fn ingest_accelerometer(&mut self, sample: &SensorSample) {
        self.accel.update(sample.vector());
        if self.state == CalibrationState::Stable {
            self.recompute_heading();
        }
    }

    pub fn ingest_magnetometer(&mut self, sample: &SensorSample) {
        let filtered = self.mag.update(sample.vector());

        match self.state {
            CalibrationState::Calibrating => self.check_calibration(filtered),
            CalibrationState::Stable => self.recompute_heading(),
        }
    }

    /// Smoothed tilt-compensated heading in degrees, [0, 360). `Some` only
    /// once the filter is `Stable`; callers must check the state first.
    pub fn true_heading(&self) -> Option<f64> {
        if self.state == CalibrationState::Stable {
            self.heading_deg
        } else {
            None
        }
    }

    /// Continuous (non-wrapping) rotation angle for a target heading.
    ///
    /// Adds the signed shortest angular delta to the previously emitted
    /// value, so a raw sequence crossing 0°/360° (e.g. 359° → 1°) moves by
    /// +2° instead of snapping back through −358°.
    pub fn smoothed_rotation(&mut self, target_deg: f64) -> f64 {
        let emitted = match self.last_rotation_deg {
            None => target_deg,
            Some(prev) => {
                let delta = (target_deg - prev + 540.0).rem_euclid(360.0) - 180.0;
                prev + delta
            }
        };
        self.last_rotation_deg = Some(emitted);
        emitted
    }

    /// Clears the calibration window and returns to `Calibrating`. Safe to
    /// call at any time; the filtered vectors stay valid (if stale).
    pub fn request_recalibration(&mut self) {
        self.window.clear();
        self.state = CalibrationState::Calibrating;
    }

    fn check_calibration(&mut self, filtered_mag: Vector3<f64>) {
        if self.window.len() == self.config.calibration_window {
            self.window.pop_front();
        }
        self.window.push_back(filtered_mag);

        if self.window.len() < self.config.calibration_window {
            return;
        }

        let n = self.window.len() as f64;
        let mut mean = Vector3::zeros();
        for v in &self.window {
            mean += *v;
        }
        mean /= n;

        let mut sq_dev = Vector3::zeros();
        for v in &self.window {
            let d = *v - mean;
            sq_dev += d.component_mul(&d);
        }

        // Per-axis squared deviations combined via root-sum-of-squares over
        // the sample count.
        let combined_std_dev = (sq_dev.x + sq_dev.y + sq_dev.z).sqrt() / n;
        if combined_std_dev < self.config.stability_threshold {
            self.state = CalibrationState::Stable;
            self.recompute_heading();
        }
    }

    /// Tilt compensation: the filtered acceleration vector is the gravity
    /// reference (up in the body frame). East = magnetic × gravity, north =
    /// gravity × east; the heading is atan2 of the forward axis's east and
    /// north components. A zero-norm gravity, magnetic, or east vector skips
    /// the update and keeps the previous heading.
    fn recompute_heading(&mut self) {
        let accel = self.accel.value;
        let mag = self.mag.value;

        if !self.accel.seeded || !self.mag.seeded {
            return;
        }
        if accel.norm() < VECTOR_NORM_EPSILON || mag.norm() < VECTOR_NORM_EPSILON {
            return;
        }

        let gravity = accel.normalize();
        let east = mag.cross(&gravity);
        if east.norm() < VECTOR_NORM_EPSILON {
            // Magnetic field parallel to gravity: heading is unobservable.
            return;
        }
        let east = east.normalize();
        let north = gravity.cross(&east);

        let heading = east.y.atan2(north.y).to_degrees().rem_euclid(360.0);
        self.heading_deg = Some(heading);
    }
}
