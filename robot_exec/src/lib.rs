//! # Robot library.
//!
//! This library allows other crates in the workspace to access items defined inside the robot
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator control module - pneumatic pistons and the intake/outtake motors
pub mod act_ctrl;

/// Autonomous sequencer - runs scripted routines of motions and actuator commands
pub mod auto_seq;

/// Drivetrain configuration - chassis geometry, controller gains and drive curves
pub mod drive_config;

/// Motion facade - interface to the motion stack and its host simulation
pub mod motion;

/// Phase manager - competition phase state machine owning the phase task
pub mod phase;

/// Telemetry task - periodic pose and health display
pub mod telemetry;

/// Teleoperation control module - maps the operator controller onto the robot
pub mod teleop;
