//! # Communications interface crate.
//!
//! Provides the data types shared between the robot executable, its parameter files and the event
//! scripts which drive it on the host.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator identifiers and commands
pub mod act;

/// Operator controller snapshots
pub mod input;

/// Motion facade data (pose, motion options and commands)
pub mod motion;

pub mod tc;
