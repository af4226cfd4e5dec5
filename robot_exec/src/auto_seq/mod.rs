//! # Autonomous sequencer
//!
//! Executes a [`Routine`] step by step against the motion facade and the actuators. The sequencer
//! moves through the following states:
//!
//! - `Idle` - No routine has been started.
//! - `Running(n)` - Step `n` of the routine is executing.
//! - `Complete` - Every step has been executed.
//! - `Cancelled` - The cancel flag was raised from outside (usually a phase change).
//!
//! There is no error path. Motions that time out count as complete, actuator errors are logged and
//! the routine carries on. Every wait on the facade is guarded by the motion's timeout (plus the
//! configured grace period, zero by default), so a facade that never reports completion cannot
//! stall the routine.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod routines;
mod step;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

pub use step::*;

use crate::{act_ctrl::ActCtrl, motion::MotionFacade};
use comms_if::act::ActCmd;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Autonomous sequencer
pub struct AutoSeq {
    params: AutoSeqParams,

    state: SeqState,

    report: StatusReport,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoSeqParams {
    /// Period at which waits poll the facade and the cancel flag.
    pub poll_period_ms: u64,

    /// Time allowed past a motion's own timeout before the sequencer cancels the motion itself.
    ///
    /// Zero ends every wait at the motion's timeout, as the facade itself does.
    pub timeout_grace_ms: u64,
}

/// Summary of a routine run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Number of steps started, including a cancelled one.
    pub steps_run: usize,

    pub motions_issued: usize,

    /// Number of motions the sequencer had to cancel because the facade did not end them in time.
    pub motions_overran: usize,

    pub final_state: SeqState,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeqState {
    Idle,
    Running(usize),
    Complete,
    Cancelled,
}

/// How a guarded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// The condition being waited on was met, or the motion ended.
    Done,

    /// The deadline passed and the motion was cancelled.
    Overran,

    /// The cancel flag was raised.
    Cancelled,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for AutoSeqParams {
    fn default() -> Self {
        Self {
            poll_period_ms: 10,
            timeout_grace_ms: 0,
        }
    }
}

impl Default for SeqState {
    fn default() -> Self {
        SeqState::Idle
    }
}

impl AutoSeq {
    pub fn new(params: AutoSeqParams) -> Self {
        Self {
            params,
            state: SeqState::Idle,
            report: StatusReport::default(),
        }
    }

    pub fn state(&self) -> SeqState {
        self.state
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Run the routine to completion, or until `cancel` is raised.
    ///
    /// On cancellation the motion in flight is cancelled before returning. Actuators are left in
    /// their last commanded state.
    pub fn run(
        &mut self,
        routine: &Routine,
        drive: &dyn MotionFacade,
        acts: &mut ActCtrl,
        cancel: &AtomicBool,
    ) -> StatusReport {
        info!(
            "Starting routine \"{}\" ({} steps, {} motions)",
            routine.name,
            routine.steps.len(),
            routine.num_motions()
        );

        self.report = StatusReport::default();
        drive.set_pose(routine.start);

        for (i, step) in routine.steps.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                self.state = SeqState::Cancelled;
                break;
            }

            self.state = SeqState::Running(i);
            self.report.steps_run += 1;
            debug!("Step {}: {:?}", i, step);

            if self.exec_step(step, drive, acts, cancel) == WaitOutcome::Cancelled {
                self.state = SeqState::Cancelled;
                break;
            }
        }

        if self.state != SeqState::Cancelled {
            self.state = SeqState::Complete;
        }

        self.report.final_state = self.state;
        info!(
            "Routine \"{}\" ended {:?} after {} steps, {} motion(s) overran",
            routine.name, self.state, self.report.steps_run, self.report.motions_overran
        );

        self.report
    }

    fn exec_step(
        &mut self,
        step: &Step,
        drive: &dyn MotionFacade,
        acts: &mut ActCtrl,
        cancel: &AtomicBool,
    ) -> WaitOutcome {
        match step {
            Step::Motion(cmd) => {
                let deadline = self.issue(drive, cmd.timeout_ms());
                drive.issue(cmd);
                self.wait_until_done(drive, deadline, cancel)
            }
            Step::PartialMotion {
                motion,
                distance,
                actions,
                truncate,
            } => {
                let deadline = self.issue(drive, motion.timeout_ms());
                drive.issue(motion);

                // The actions are applied even if the motion ended short of the distance
                if self.wait_until(drive, *distance, deadline, cancel) == WaitOutcome::Cancelled {
                    return WaitOutcome::Cancelled;
                }

                for action in actions.iter() {
                    Self::apply(acts, action);
                }

                if *truncate {
                    drive.cancel_motion();
                }

                self.wait_until_done(drive, deadline, cancel)
            }
            Step::Act(cmd) => {
                Self::apply(acts, cmd);
                WaitOutcome::Done
            }
            Step::SetPose(pose) => {
                drive.set_pose(*pose);
                WaitOutcome::Done
            }
            Step::Delay { ms } => self.delay(Duration::from_millis(*ms), cancel),
        }
    }

    /// Count a motion about to be issued and return its deadline.
    fn issue(&mut self, drive: &dyn MotionFacade, timeout_ms: u32) -> Instant {
        // Nothing may still be moving when a step starts
        if drive.is_in_motion() {
            warn!("A motion was still in flight at the start of a step, cancelling it");
            drive.cancel_motion();
        }

        self.report.motions_issued += 1;
        Instant::now()
            + Duration::from_millis(timeout_ms as u64)
            + Duration::from_millis(self.params.timeout_grace_ms)
    }

    fn apply(acts: &mut ActCtrl, cmd: &ActCmd) {
        if let Err(e) = acts.apply(cmd) {
            warn!("Could not apply {:?}: {}", cmd, e);
        }
    }

    fn wait_until_done(
        &mut self,
        drive: &dyn MotionFacade,
        deadline: Instant,
        cancel: &AtomicBool,
    ) -> WaitOutcome {
        self.guarded_wait(drive, deadline, cancel, || !drive.is_in_motion())
    }

    fn wait_until(
        &mut self,
        drive: &dyn MotionFacade,
        distance: f64,
        deadline: Instant,
        cancel: &AtomicBool,
    ) -> WaitOutcome {
        self.guarded_wait(drive, deadline, cancel, || match drive.distance_traveled() {
            Some(d) => d >= distance,
            None => true,
        })
    }

    /// Poll `done` until it returns `true`, the deadline passes or `cancel` is raised.
    fn guarded_wait<F>(
        &mut self,
        drive: &dyn MotionFacade,
        deadline: Instant,
        cancel: &AtomicBool,
        mut done: F,
    ) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        let poll_period = Duration::from_millis(self.params.poll_period_ms);

        loop {
            if cancel.load(Ordering::Relaxed) {
                drive.cancel_motion();
                return WaitOutcome::Cancelled;
            }

            if done() {
                return WaitOutcome::Done;
            }

            if Instant::now() >= deadline {
                warn!("Motion did not end within its timeout, cancelling it");
                drive.cancel_motion();
                self.report.motions_overran += 1;
                return WaitOutcome::Overran;
            }

            thread::sleep(poll_period);
        }
    }

    fn delay(&self, duration: Duration, cancel: &AtomicBool) -> WaitOutcome {
        let end = Instant::now() + duration;
        let poll_period = Duration::from_millis(self.params.poll_period_ms);

        loop {
            if cancel.load(Ordering::Relaxed) {
                return WaitOutcome::Cancelled;
            }

            let now = Instant::now();
            if now >= end {
                return WaitOutcome::Done;
            }

            thread::sleep(poll_period.min(end - now));
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
