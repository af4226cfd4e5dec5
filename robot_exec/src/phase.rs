//! # Phase manager
//!
//! Competition phase state machine. The field controller (or the event script on the host) raises
//! [`PhaseEvent`]s, each of which moves the robot between the following phases:
//!
//! - `Idle` - Program started, nothing initialised.
//! - `Initializing` - Telemetry running and the chassis calibrated, waiting for a match phase.
//! - `Autonomous` - The selected routine runs in the phase task.
//! - `Teleop` - The teleop loop runs in the phase task.
//! - `Disabled` - Outputs stopped, waiting for the next phase.
//!
//! The actuators and the input source are moved into the phase task and handed back when the task
//! is joined, so the sequencer and the teleop loop can never hold them at the same time.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{
    act_ctrl::ActCtrl,
    auto_seq::{self, AutoSeq, Routine},
    motion::{MotionError, MotionFacade},
    telemetry::{DisplaySink, HealthSource, Telemetry, TelemetryError, TelemetryParams},
    teleop::{self, InputSource, TeleopCtrl},
};
use comms_if::tc::PhaseEvent;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use util::archive::Archiver;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Hardware handles of the robot, built once at startup.
pub struct Robot {
    pub drive: Arc<dyn MotionFacade>,

    pub acts: ActCtrl,

    pub input: Box<dyn InputSource>,

    pub display: Box<dyn DisplaySink>,

    pub health: Box<dyn HealthSource>,
}

/// The controllers run by the phase task.
pub struct Modes {
    /// Routine run in the autonomous phase.
    pub routine: Routine,

    pub auto_seq: AutoSeq,

    pub teleop: TeleopCtrl,
}

/// Phase manager
pub struct PhaseMgr {
    phase: Phase,

    drive: Arc<dyn MotionFacade>,

    /// Hardware owned by the manager between phase tasks, `None` while a task holds it.
    hw: Option<PhaseHw>,

    task: Option<PhaseTask>,

    /// Telemetry parts, consumed when telemetry starts.
    telemetry_setup: Option<TelemetrySetup>,

    telemetry: Option<Telemetry>,

    routine: Routine,
}

/// Everything moved into a phase task.
struct PhaseHw {
    acts: ActCtrl,
    input: Box<dyn InputSource>,
    auto_seq: AutoSeq,
    teleop: TeleopCtrl,
}

struct PhaseTask {
    name: &'static str,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<(PhaseHw, TaskReport)>,
}

struct TelemetrySetup {
    display: Box<dyn DisplaySink>,
    health: Box<dyn HealthSource>,
    archiver: Option<Archiver>,
    params: TelemetryParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Initializing,
    Autonomous,
    Teleop,
    Disabled,
}

/// Report produced by a finished phase task.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum TaskReport {
    Autonomous(auto_seq::StatusReport),
    Teleop(teleop::LoopReport),
}

#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("Event {event:?} is not valid in the {from:?} phase")]
    InvalidTransition { from: Phase, event: PhaseEvent },

    #[error("Chassis calibration failed: {0}")]
    Calibration(#[from] MotionError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("Could not start the {0} task: {1}")]
    SpawnFailed(&'static str, std::io::Error),

    #[error("The {0} task panicked, the actuators are lost")]
    TaskPanicked(&'static str),

    #[error("The actuators are not available")]
    HardwareUnavailable,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Phase reached from `current` on `event`.
pub fn next_phase(current: Phase, event: PhaseEvent) -> Result<Phase, PhaseError> {
    use Phase::*;

    let next = match (current, event) {
        (Idle, PhaseEvent::Initialize) => Initializing,
        (Initializing, PhaseEvent::Autonomous) | (Disabled, PhaseEvent::Autonomous) => Autonomous,
        (Initializing, PhaseEvent::Opcontrol)
        | (Disabled, PhaseEvent::Opcontrol)
        | (Autonomous, PhaseEvent::Opcontrol) => Teleop,
        (Initializing, PhaseEvent::Disable)
        | (Autonomous, PhaseEvent::Disable)
        | (Teleop, PhaseEvent::Disable) => Disabled,
        (from, event) => return Err(PhaseError::InvalidTransition { from, event }),
    };

    Ok(next)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PhaseMgr {
    pub fn new(
        robot: Robot,
        modes: Modes,
        telemetry_params: TelemetryParams,
        telemetry_archiver: Option<Archiver>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            drive: robot.drive,
            hw: Some(PhaseHw {
                acts: robot.acts,
                input: robot.input,
                auto_seq: modes.auto_seq,
                teleop: modes.teleop,
            }),
            task: None,
            telemetry_setup: Some(TelemetrySetup {
                display: robot.display,
                health: robot.health,
                archiver: telemetry_archiver,
                params: telemetry_params,
            }),
            telemetry: None,
            routine: modes.routine,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The actuators, if no phase task currently holds them.
    pub fn acts(&self) -> Option<&ActCtrl> {
        self.hw.as_ref().map(|hw| &hw.acts)
    }

    /// Handle a phase event.
    ///
    /// Invalid events are rejected and leave the phase unchanged. Any other error is fatal.
    pub fn handle_event(&mut self, event: PhaseEvent) -> Result<Phase, PhaseError> {
        let next = next_phase(self.phase, event)?;
        info!("Phase {:?} -> {:?}", self.phase, next);

        self.end_task()?;

        match next {
            Phase::Initializing => self.initialize()?,
            Phase::Autonomous => self.start_autonomous()?,
            Phase::Teleop => self.start_teleop()?,
            Phase::Idle | Phase::Disabled => (),
        }

        self.phase = next;
        Ok(next)
    }

    /// Stop the phase task and the telemetry task.
    pub fn shutdown(mut self) -> Result<(), PhaseError> {
        let result = self.end_task();

        if let Some(t) = self.telemetry.take() {
            t.stop();
        }

        info!("Phase manager shut down in {:?}", self.phase);
        result
    }

    fn initialize(&mut self) -> Result<(), PhaseError> {
        if let Some(setup) = self.telemetry_setup.take() {
            self.telemetry = Some(Telemetry::spawn(
                self.drive.clone(),
                setup.display,
                setup.health,
                setup.archiver,
                &setup.params,
            )?);
        }

        self.drive.calibrate().map_err(|e| {
            error!("Calibration failed: {}", e);
            PhaseError::from(e)
        })
    }

    fn start_autonomous(&mut self) -> Result<(), PhaseError> {
        let drive = self.drive.clone();
        let routine = self.routine.clone();

        self.spawn_task("autonomous", move |mut hw, cancel| {
            let report = hw.auto_seq.run(&routine, drive.as_ref(), &mut hw.acts, &cancel);
            (hw, TaskReport::Autonomous(report))
        })
    }

    fn start_teleop(&mut self) -> Result<(), PhaseError> {
        let drive = self.drive.clone();

        self.spawn_task("teleop", move |mut hw, cancel| {
            let PhaseHw {
                ref mut acts,
                ref mut input,
                ref mut teleop,
                ..
            } = hw;
            let report = teleop.run(input.as_mut(), drive.as_ref(), acts, &cancel);
            (hw, TaskReport::Teleop(report))
        })
    }

    /// Move the hardware into a new named thread running `f`.
    fn spawn_task<F>(&mut self, name: &'static str, f: F) -> Result<(), PhaseError>
    where
        F: FnOnce(PhaseHw, Arc<AtomicBool>) -> (PhaseHw, TaskReport) + Send + 'static,
    {
        let hw = self.hw.take().ok_or(PhaseError::HardwareUnavailable)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = cancel.clone();

        // The closure is only run if the thread starts, on failure the hardware is lost with it
        let handle = thread::Builder::new()
            .name(String::from(name))
            .spawn(move || f(hw, task_cancel))
            .map_err(|e| PhaseError::SpawnFailed(name, e))?;

        debug!("{} task started", name);
        self.task = Some(PhaseTask {
            name,
            cancel,
            handle,
        });

        Ok(())
    }

    /// Cancel and join the running phase task, then bring every output to a stop.
    fn end_task(&mut self) -> Result<(), PhaseError> {
        if let Some(task) = self.task.take() {
            task.cancel.store(true, Ordering::Relaxed);

            match task.handle.join() {
                Ok((hw, report)) => {
                    info!("{} task ended: {:?}", task.name, report);
                    self.hw = Some(hw);
                }
                Err(_) => return Err(PhaseError::TaskPanicked(task.name)),
            }
        }

        self.drive.cancel_motion();
        self.drive.tank(0, 0);

        match self.hw {
            Some(ref mut hw) => hw.acts.stop_all(),
            None => warn!("No actuators to stop"),
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        act_ctrl::test::test_act_ctrl,
        auto_seq::{AutoSeqParams, Step},
        motion::mock::RecordingFacade,
        telemetry::{LogDisplay, SimHealth},
        teleop::{InputFeed, Params, ScriptedInput},
    };
    use comms_if::{
        act::{ActCmd, ActId, BinaryState},
        input::{Button, ControllerState},
        motion::{MotionCmd, MotionOpts, Pose},
    };
    use std::time::Duration;

    fn phase_mgr() -> (PhaseMgr, Arc<RecordingFacade>, InputFeed) {
        let drive = Arc::new(RecordingFacade::default());
        let (input, feed) = ScriptedInput::new();

        let robot = Robot {
            drive: drive.clone(),
            acts: test_act_ctrl(),
            input: Box::new(input),
            display: Box::new(LogDisplay),
            health: Box::new(SimHealth::new()),
        };

        let modes = Modes {
            routine: Routine {
                name: String::from("test"),
                start: Pose::default(),
                steps: vec![
                    Step::Motion(MotionCmd::MoveToPoint {
                        x: 0.0,
                        y: 18.248,
                        timeout_ms: 2000,
                        opts: MotionOpts::default(),
                    }),
                    Step::Act(ActCmd::SetBinary {
                        id: ActId::MainPistons,
                        extended: true,
                    }),
                ],
            },
            auto_seq: AutoSeq::new(AutoSeqParams::default()),
            teleop: TeleopCtrl::with_params(Params::default()),
        };

        let telem_params = TelemetryParams {
            period_ms: 5,
            archive: false,
        };

        (PhaseMgr::new(robot, modes, telem_params, None), drive, feed)
    }

    #[test]
    fn test_transitions() {
        use Phase::*;
        use PhaseEvent as E;

        assert_eq!(next_phase(Idle, E::Initialize).unwrap(), Initializing);
        assert_eq!(next_phase(Initializing, E::Autonomous).unwrap(), Autonomous);
        assert_eq!(next_phase(Autonomous, E::Opcontrol).unwrap(), Teleop);
        assert_eq!(next_phase(Teleop, E::Disable).unwrap(), Disabled);
        assert_eq!(next_phase(Disabled, E::Autonomous).unwrap(), Autonomous);
        assert_eq!(next_phase(Disabled, E::Opcontrol).unwrap(), Teleop);

        let invalid = [
            (Idle, E::Autonomous),
            (Idle, E::Opcontrol),
            (Idle, E::Disable),
            (Initializing, E::Initialize),
            (Autonomous, E::Autonomous),
            (Teleop, E::Autonomous),
            (Teleop, E::Opcontrol),
            (Disabled, E::Disable),
        ];
        for (from, event) in invalid.iter() {
            assert!(matches!(
                next_phase(*from, *event),
                Err(PhaseError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_event_keeps_phase() {
        let (mut mgr, drive, _) = phase_mgr();

        assert!(mgr.handle_event(PhaseEvent::Opcontrol).is_err());
        assert_eq!(mgr.phase(), Phase::Idle);
        assert_eq!(*drive.num_calibrations.lock().unwrap(), 0);

        mgr.shutdown().unwrap();
    }

    #[test]
    fn test_match() {
        let (mut mgr, drive, feed) = phase_mgr();

        mgr.handle_event(PhaseEvent::Initialize).unwrap();
        assert_eq!(*drive.num_calibrations.lock().unwrap(), 1);

        // Routine runs in the task, the actuators are handed back on the next event
        mgr.handle_event(PhaseEvent::Autonomous).unwrap();
        assert!(mgr.acts().is_none());
        thread::sleep(Duration::from_millis(50));

        mgr.handle_event(PhaseEvent::Opcontrol).unwrap();
        assert_eq!(drive.motions.lock().unwrap().len(), 1);
        assert_eq!(*drive.pose.lock().unwrap(), Pose::default());

        feed.set(
            ControllerState::neutral()
                .with_axes(50, 50)
                .with_button(Button::R1, true),
        );
        thread::sleep(Duration::from_millis(50));

        assert_eq!(mgr.handle_event(PhaseEvent::Disable).unwrap(), Phase::Disabled);

        let acts = mgr.acts().unwrap();
        assert_eq!(
            acts.binary_state(ActId::MainPistons).unwrap(),
            BinaryState::Extended
        );
        assert_eq!(acts.binary_state(ActId::Hood).unwrap(), BinaryState::Retracted);
        assert_eq!(acts.velocity(ActId::IoMiddle).unwrap(), 0);
        assert!(drive.tank.lock().unwrap().contains(&(50, 50)));
        assert_eq!(drive.last_tank(), Some((0, 0)));

        mgr.shutdown().unwrap();
    }
}
