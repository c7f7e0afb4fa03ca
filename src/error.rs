use thiserror::Error;

/// Engine error types.
///
/// Degenerate sensor math (zero-norm vectors, coincident coordinates) and
/// incomplete timetables are recovered locally by the components involved and
/// never surface here.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Location or sensor permission denied: {0}")]
    PermissionDenied(String),

    #[error("Required sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Coordinate out of range: lat {latitude}, lon {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
