//! Sensor ingestion loops for the demo binary.
//!
//! Each loop ticks on its own interval and pushes samples into a bounded
//! channel; when the channel is full the sample is dropped rather than
//! blocking the producer. This build carries no platform sensor backend, so
//! the loops synthesize plausible device motion: the simulated phone lies
//! flat, swings toward a fixed heading over the first few seconds, then
//! holds steady so the calibration window can settle.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::error::{Error, Result};
use crate::types::{GeoPoint, SensorSample};

/// Sensor delivery interval (both accelerometer and magnetometer).
pub const SENSOR_INTERVAL_MS: u64 = 100;
/// Location refresh interval.
pub const LOCATION_INTERVAL_SECS: u64 = 300;

/// Simulated horizontal and vertical field strength (µT).
const FIELD_HORIZONTAL: f64 = 30.0;
const FIELD_VERTICAL: f64 = -20.0;
/// Heading the simulated device settles on, and how long the swing takes.
const SETTLE_HEADING_DEG: f64 = 137.0;
const SETTLE_SECS: f64 = 8.0;

/// Check for a platform sensor backend. There is none in this build, so the
/// caller gets `SensorUnavailable` exactly once and falls back to the
/// simulator.
pub fn probe_hardware() -> Result<()> {
    Err(Error::SensorUnavailable(
        "no platform sensor backend in this build".into(),
    ))
}

pub async fn accel_loop(tx: Sender<SensorSample>) {
    let mut interval = interval(Duration::from_millis(SENSOR_INTERVAL_MS));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let sample = mock_accel_sample();
        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[accel] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[accel] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

pub async fn mag_loop(tx: Sender<SensorSample>) {
    let mut interval = interval(Duration::from_millis(SENSOR_INTERVAL_MS));
    let mut sample_count = 0u64;

    loop {
        interval.tick().await;

        let sample = mock_mag_sample();
        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("[mag] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[mag] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

/// Emits the configured fix immediately, then re-emits on the refresh
/// interval the way a coarse platform location service would.
pub async fn location_loop(tx: Sender<GeoPoint>, fix: GeoPoint) {
    let mut interval = interval(Duration::from_secs(LOCATION_INTERVAL_SECS));
    let mut fix_count = 0u64;

    loop {
        interval.tick().await;

        match tx.try_send(fix) {
            Ok(_) => {
                fix_count += 1;
                log::debug!("[location] {} fixes", fix_count);
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("[location] channel closed after {} fixes", fix_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {}
        }
    }
}

fn simulated_heading_deg(t_secs: f64) -> f64 {
    let ramp = (t_secs / SETTLE_SECS).min(1.0);
    SETTLE_HEADING_DEG * ramp
}

fn mock_accel_sample() -> SensorSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * 0.1;

    // Flat on a surface: gravity on +z, a whisper of hand tremor on x/y.
    SensorSample::new(t, (t * 2.1).sin() * 0.05, (t * 1.7).cos() * 0.05, 9.81)
}

fn mock_mag_sample() -> SensorSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * 0.1;

    let theta = simulated_heading_deg(t).to_radians();
    SensorSample::new(
        t,
        -FIELD_HORIZONTAL * theta.sin(),
        FIELD_HORIZONTAL * theta.cos(),
        FIELD_VERTICAL,
    )
}
