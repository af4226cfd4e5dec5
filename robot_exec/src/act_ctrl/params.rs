//! Parameters structure for ActCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use comms_if::act::{ActId, Gearset, GroupId};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for actuator control, loaded from `actuators.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    /// Pneumatic actuators, one solenoid per entry.
    #[serde(default)]
    pub pneumatics: Vec<PneumaticParams>,

    /// Velocity controlled smart motors.
    #[serde(default)]
    pub motors: Vec<MotorParams>,

    /// Named groups of motors commanded together.
    #[serde(default)]
    pub groups: Vec<GroupParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PneumaticParams {
    pub id: ActId,

    /// Three wire port the solenoid is plugged into, `a` to `h`.
    pub adi_port: String,

    /// State the actuator is put in when ActCtrl is created.
    #[serde(default)]
    pub initially_extended: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorParams {
    pub id: ActId,

    /// Smart port, 1 to 21. Negative ports are reversed.
    pub port: i8,

    pub gearset: Gearset,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupParams {
    pub id: GroupId,

    /// Members of the group, in the order used by per-motor velocity
    /// commands.
    pub members: Vec<ActId>,
}
