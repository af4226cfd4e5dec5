//! Actuator hardware drivers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use comms_if::act::ActId;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The hardware output layer beneath [`super::ActCtrl`].
///
/// Implementations write straight to the device, they hold no state of their
/// own about what was last commanded.
pub trait ActuatorDriver: Send {
    /// Drive a pneumatic solenoid.
    fn write_binary(&mut self, id: ActId, extended: bool) -> Result<(), DriverError>;

    /// Set the target velocity of a motor.
    ///
    /// Units: rpm
    fn write_velocity(&mut self, id: ActId, rpm: i32) -> Result<(), DriverError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Driver used when running on the host, every write succeeds and is traced.
#[derive(Debug, Default)]
pub struct SimActDriver;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Device for {0:?} is not connected")]
    Disconnected(ActId),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuatorDriver for SimActDriver {
    fn write_binary(&mut self, id: ActId, extended: bool) -> Result<(), DriverError> {
        trace!("{:?} <- {}", id, if extended { "extend" } else { "retract" });
        Ok(())
    }

    fn write_velocity(&mut self, id: ActId, rpm: i32) -> Result<(), DriverError> {
        trace!("{:?} <- {} rpm", id, rpm);
        Ok(())
    }
}
