//! Recording facade used by the unit tests

use std::sync::Mutex;

use super::{MotionError, MotionFacade};
use comms_if::motion::{MotionCmd, MotionOpts, Pose};

/// Facade whose motions end as soon as they start. Every call is recorded.
#[derive(Default)]
pub(crate) struct RecordingFacade {
    pub pose: Mutex<Pose>,
    pub motions: Mutex<Vec<MotionCmd>>,
    pub tank: Mutex<Vec<(i32, i32)>>,
    pub num_cancels: Mutex<usize>,
    pub num_calibrations: Mutex<usize>,
}

impl RecordingFacade {
    pub fn last_tank(&self) -> Option<(i32, i32)> {
        self.tank.lock().unwrap().last().copied()
    }
}

impl MotionFacade for RecordingFacade {
    fn calibrate(&self) -> Result<(), MotionError> {
        *self.num_calibrations.lock().unwrap() += 1;
        Ok(())
    }

    fn set_pose(&self, pose: Pose) {
        *self.pose.lock().unwrap() = pose;
    }

    fn get_pose(&self) -> Pose {
        *self.pose.lock().unwrap()
    }

    fn move_to_point(&self, x: f64, y: f64, timeout_ms: u32, opts: MotionOpts) {
        self.motions.lock().unwrap().push(MotionCmd::MoveToPoint {
            x,
            y,
            timeout_ms,
            opts,
        });
    }

    fn move_to_pose(&self, x: f64, y: f64, heading: f64, timeout_ms: u32, opts: MotionOpts) {
        self.motions.lock().unwrap().push(MotionCmd::MoveToPose {
            x,
            y,
            heading,
            timeout_ms,
            opts,
        });
    }

    fn turn_to_heading(&self, heading: f64, timeout_ms: u32, opts: MotionOpts) {
        self.motions.lock().unwrap().push(MotionCmd::TurnToHeading {
            heading,
            timeout_ms,
            opts,
        });
    }

    fn tank(&self, left: i32, right: i32) {
        self.tank.lock().unwrap().push((left, right));
    }

    fn cancel_motion(&self) {
        *self.num_cancels.lock().unwrap() += 1;
    }

    fn is_in_motion(&self) -> bool {
        false
    }

    fn distance_traveled(&self) -> Option<f64> {
        None
    }
}
