//! # Actuator commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all actuators (other than the drivetrain) available to the robot
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub enum ActId {
    /// Main pneumatic pistons
    MainPistons,
    /// Pneumatic hood over the top outtake
    Hood,
    /// Lowest intake/outtake roller motor
    IoLower,
    /// Middle intake/outtake roller motor
    IoMiddle,
    /// Top intake/outtake roller motor
    IoUpper,
}

/// IDs of the motor groups which are commanded together
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub enum GroupId {
    Intake,
    Outtake,
}

/// Motor cartridge fitted to a smart motor.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum Gearset {
    /// 100 rpm
    Red,
    /// 200 rpm
    Green,
    /// 600 rpm
    Blue,
}

/// Commanded state of a pneumatic actuator.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum BinaryState {
    Extended,
    Retracted,
}

/// A command to one of the actuators.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ActCmd {
    /// Extend or retract a pneumatic actuator.
    SetBinary { id: ActId, extended: bool },

    /// Flip a pneumatic actuator relative to its last commanded state.
    ToggleBinary { id: ActId },

    /// Set the velocity of a single motor.
    ///
    /// Units: rpm
    SetVelocity { id: ActId, rpm: i32 },

    /// Set every motor in a group to the same velocity.
    ///
    /// Units: rpm
    SetGroupVelocity { group: GroupId, rpm: i32 },

    /// Set a distinct velocity for each motor in a group, in the group's member order.
    ///
    /// Units: rpm
    SetGroupVelocities { group: GroupId, rpms: Vec<i32> },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Gearset {
    /// Free speed of the cartridge.
    pub fn max_rpm(&self) -> i32 {
        match self {
            Gearset::Red => 100,
            Gearset::Green => 200,
            Gearset::Blue => 600,
        }
    }
}

impl BinaryState {
    pub fn from_extended(extended: bool) -> Self {
        if extended {
            BinaryState::Extended
        } else {
            BinaryState::Retracted
        }
    }

    pub fn is_extended(&self) -> bool {
        *self == BinaryState::Extended
    }

    pub fn toggled(&self) -> Self {
        match self {
            BinaryState::Extended => BinaryState::Retracted,
            BinaryState::Retracted => BinaryState::Extended,
        }
    }
}
