//! Teleoperation control module
//!
//! Maps the operator controller onto the drivetrain and the actuators once
//! per tick. The sticks drive the chassis in tank mode, the buttons are
//! evaluated against a priority ordered list of bindings of which exactly one
//! is applied each tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod input;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use input::*;
pub use params::*;
pub use state::*;
