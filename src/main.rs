use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use prayer_compass_rs::astro::{CalculationMethod, Madhab};
use prayer_compass_rs::sensors;
use prayer_compass_rs::session::{CompassSession, SessionConfig};
use prayer_compass_rs::types::{CalibrationState, GeoPoint};

#[derive(Parser, Debug)]
#[command(name = "prayer_compass")]
#[command(about = "Qibla compass and prayer schedule engine demo", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Latitude of the simulated location fix
    #[arg(long, default_value = "24.8607")]
    lat: f64,

    /// Longitude of the simulated location fix
    #[arg(long, default_value = "67.0011")]
    lon: f64,

    /// Calculation method (karachi, mwl, isna, egyptian)
    #[arg(long, default_value = "karachi")]
    method: String,

    /// Asr madhab (shafi, hanafi)
    #[arg(long, default_value = "hanafi")]
    madhab: String,

    /// Alignment threshold in degrees
    #[arg(long, default_value = "3.0")]
    threshold: f64,

    /// Status snapshot file (JSON, rewritten every second)
    #[arg(long, default_value = "prayer_compass_status.json")]
    status_file: String,
}

fn parse_method(name: &str) -> Result<CalculationMethod> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "karachi" => CalculationMethod::Karachi,
        "mwl" => CalculationMethod::MuslimWorldLeague,
        "isna" => CalculationMethod::Isna,
        "egyptian" => CalculationMethod::Egyptian,
        other => bail!("unknown calculation method '{other}'"),
    })
}

fn parse_madhab(name: &str) -> Result<Madhab> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "shafi" => Madhab::Shafi,
        "hanafi" => Madhab::Hanafi,
        other => bail!("unknown madhab '{other}'"),
    })
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let fix = GeoPoint::new(args.lat, args.lon)
        .with_context(|| format!("invalid coordinates {}, {}", args.lat, args.lon))?;

    let mut config = SessionConfig::default();
    config.method = parse_method(&args.method)?;
    config.madhab = parse_madhab(&args.madhab)?;
    config.qibla.alignment_threshold_deg = args.threshold;

    println!("[{}] Prayer Compass Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Location: {:.4}, {:.4}", args.lat, args.lon);
    println!("  Method: {} / {}", args.method, args.madhab);
    println!("  Alignment threshold: {:.1}°", args.threshold);

    // Report missing hardware once, then run on simulated streams.
    if let Err(e) = sensors::probe_hardware() {
        log::warn!("{e}; using simulated sensor data");
    }

    let mut session = CompassSession::new(config, Utc::now().year());

    let (accel_tx, mut accel_rx) = mpsc::channel(500);
    let (mag_tx, mut mag_rx) = mpsc::channel(500);
    let (loc_tx, mut loc_rx) = mpsc::channel(16);

    let _accel_handle = tokio::spawn(sensors::accel_loop(accel_tx.clone()));
    let _mag_handle = tokio::spawn(sensors::mag_loop(mag_tx.clone()));
    let _loc_handle = tokio::spawn(sensors::location_loop(loc_tx.clone(), fix));

    // Drop original senders so tasks only hold references
    drop(accel_tx);
    drop(mag_tx);
    drop(loc_tx);

    let start = Utc::now();
    let mut current_date = start.date_naive();
    let mut last_schedule_tick = start;
    let mut last_status_print = start;
    let mut was_calibrating = true;

    println!("[{}] Calibrating compass...", ts_now());

    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }

        while let Ok(sample) = accel_rx.try_recv() {
            session.ingest_accelerometer(&sample);
        }
        while let Ok(sample) = mag_rx.try_recv() {
            session.ingest_magnetometer(&sample);
        }
        while let Ok(point) = loc_rx.try_recv() {
            session.update_location(point, Utc::now().date_naive());
        }

        let now = Utc::now();

        // Regenerate the timetable when the calendar day rolls over.
        if now.date_naive() != current_date {
            current_date = now.date_naive();
            if let Some(context) = session.context() {
                session.update_location(context.location, current_date);
                println!("[{}] Date rollover, timetable regenerated", ts_now());
            }
        }

        if now.signed_duration_since(last_schedule_tick).num_milliseconds() >= 1000 {
            last_schedule_tick = now;
            let status = session.tick(now);

            if was_calibrating && status.calibration_state == CalibrationState::Stable {
                was_calibrating = false;
                println!("[{}] Compass calibrated", ts_now());
            }

            if status.alignment_pulse {
                println!("[{}] Aligned with the Qibla", ts_now());
            }

            if let Ok(json) = serde_json::to_string_pretty(&status) {
                let _ = std::fs::write(&args.status_file, json);
            }

            if now.signed_duration_since(last_status_print).num_seconds() >= 5 {
                last_status_print = now;
                match (status.pointing_deg, status.next_prayer) {
                    (Some(pointing), Some(next)) => {
                        println!(
                            "[{}] heading {:6.1}°  qibla {:6.1}°  distance {:7.1} km  next {} in {}s ({:.1}%)",
                            ts_now(),
                            status.heading_deg.unwrap_or(0.0),
                            pointing,
                            status.distance_km.unwrap_or(0.0),
                            next,
                            status.remaining_secs.unwrap_or(0),
                            status.progress_percent.unwrap_or(0.0),
                        );
                    }
                    _ => {
                        println!(
                            "[{}] calibrating... {:.0}%",
                            ts_now(),
                            status.calibration_progress * 100.0
                        );
                    }
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    println!("[{}] Session complete", ts_now());
    Ok(())
}
