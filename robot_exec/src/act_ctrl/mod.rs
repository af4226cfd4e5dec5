//! Actuator control module
//!
//! Logical wrappers over the robot's discrete (pneumatic) and continuous
//! (velocity controlled motor) outputs. The commanded state of every actuator
//! is tracked in software, toggles act on the last commanded state rather
//! than on a sensed one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod driver;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use driver::*;
pub use params::*;
pub use state::*;

#[cfg(test)]
pub(crate) use state::test;

use comms_if::act::{ActId, GroupId};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ActCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ActCtrlError {
    #[error("Actuator {0:?} is not configured")]
    UnknownActuator(ActId),

    #[error("Actuator {0:?} is not a pneumatic actuator")]
    NotBinary(ActId),

    #[error("Actuator {0:?} is not a motor")]
    NotMotor(ActId),

    #[error("Motor group {0:?} is not configured")]
    UnknownGroup(GroupId),

    #[error("Motor group {group:?} has {expected} members but {found} velocities were given")]
    GroupSizeMismatch {
        group: GroupId,
        expected: usize,
        found: usize,
    },

    #[error("Invalid actuator parameters: {0}")]
    InvalidParams(String),
}
