//! Motion facade
//!
//! The odometry and closed loop motion stack is an external collaborator.
//! Everything else in the executable talks to it through [`MotionFacade`].
//!
//! Motion commands return as soon as the motion has started. Callers that
//! need to block use [`MotionFacade::wait_until`] or
//! [`MotionFacade::wait_until_done`], or poll [`MotionFacade::is_in_motion`]
//! themselves.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

#[cfg(test)]
pub(crate) mod mock;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::thread;
use std::time::Duration;

// Internal
pub use sim::*;

use crate::drive_config::DriveConfigError;
use comms_if::motion::{MotionCmd, MotionOpts, Pose};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the blocking waits poll the facade.
pub const WAIT_POLL_PERIOD: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Primitives exposed by the motion stack.
///
/// Starting a motion while another is in flight blocks until the previous
/// one has finished.
pub trait MotionFacade: Send + Sync {
    /// Calibrate the sensors and check the chassis configuration.
    ///
    /// An error here is fatal, it is not retried.
    fn calibrate(&self) -> Result<(), MotionError>;

    /// Override the estimated pose. Visible in the very next `get_pose`.
    fn set_pose(&self, pose: Pose);

    /// Snapshot of the estimated pose.
    fn get_pose(&self) -> Pose;

    fn move_to_point(&self, x: f64, y: f64, timeout_ms: u32, opts: MotionOpts);

    fn move_to_pose(&self, x: f64, y: f64, heading: f64, timeout_ms: u32, opts: MotionOpts);

    fn turn_to_heading(&self, heading: f64, timeout_ms: u32, opts: MotionOpts);

    /// Open loop drive, one stick value (-127 to 127) per side. The throttle
    /// curve is applied inside the facade.
    fn tank(&self, left: i32, right: i32);

    /// Stop the motion in flight, if any.
    fn cancel_motion(&self);

    fn is_in_motion(&self) -> bool;

    /// Distance covered by the motion in flight, `None` if there is none.
    ///
    /// Units: inches for moves, degrees for turns
    fn distance_traveled(&self) -> Option<f64>;

    /// Block until the motion in flight has covered `distance`, or has ended.
    fn wait_until(&self, distance: f64) {
        while let Some(d) = self.distance_traveled() {
            if d >= distance {
                break;
            }
            thread::sleep(WAIT_POLL_PERIOD);
        }
    }

    /// Block until the motion in flight has ended, for any reason.
    fn wait_until_done(&self) {
        while self.is_in_motion() {
            thread::sleep(WAIT_POLL_PERIOD);
        }
    }

    /// Start the given motion command.
    fn issue(&self, cmd: &MotionCmd) {
        match *cmd {
            MotionCmd::MoveToPoint { x, y, timeout_ms, opts } => {
                self.move_to_point(x, y, timeout_ms, opts)
            }
            MotionCmd::MoveToPose { x, y, heading, timeout_ms, opts } => {
                self.move_to_pose(x, y, heading, timeout_ms, opts)
            }
            MotionCmd::TurnToHeading { heading, timeout_ms, opts } => {
                self.turn_to_heading(heading, timeout_ms, opts)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("Invalid chassis configuration: {0}")]
    InvalidConfig(#[from] DriveConfigError),

    #[error("Could not start the chassis control task: {0}")]
    ControlTaskSpawn(std::io::Error),
}
