//! Drivetrain configuration
//!
//! Static description of the chassis consumed by the motion facade: geometry
//! and gearing of the drivetrain, gains of the lateral and angular
//! controllers, and the input shaping curves used for manual driving.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod curve;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use curve::*;
pub use params::*;

#[cfg(test)]
pub(crate) use params::test;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when validating a chassis configuration.
#[derive(Debug, thiserror::Error)]
pub enum DriveConfigError {
    #[error("Track width must be positive, found {0} in")]
    InvalidTrackWidth(f64),

    #[error("Wheel rpm must be positive, found {0}")]
    InvalidWheelRpm(f64),

    #[error("The {0} motor group is empty")]
    EmptyMotorGroup(&'static str),

    #[error("Motor port {0} is invalid or used more than once")]
    InvalidMotorPort(i8),

    #[error("IMU port {0} is invalid or used by a drive motor")]
    InvalidImuPort(u8),

    #[error("{gains} gains: {field} must not be negative, found {value}")]
    NegativeGain {
        gains: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error(
        "{0} curve: expected 0 <= deadband < min_output <= 127, \
        found deadband = {1}, min_output = {2}"
    )]
    InvalidCurveBounds(&'static str, f64, f64),

    #[error("{0} curve: expo gain must be positive, found {1}")]
    InvalidExpoGain(&'static str, f64),
}
