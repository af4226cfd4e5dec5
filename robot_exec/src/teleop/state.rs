//! Implementations for the TeleopCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use super::{InputSource, Params, Trigger};
use crate::{act_ctrl::ActCtrl, motion::MotionFacade};
use comms_if::{
    act::ActCmd,
    input::{ControllerState, AXIS_MAX},
};
use util::{module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Teleoperation control module state
#[derive(Default)]
pub struct TeleopCtrl {
    pub(crate) params: Params,

    report: StatusReport,
}

/// Output of one teleop tick.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputData {
    /// Stick values for `tank(left, right)`, -127 to 127.
    pub tank: (i32, i32),

    /// Actuator commands of the branch taken this tick.
    pub actions: Vec<ActCmd>,
}

/// Status report for TeleopCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Index of the binding applied this tick, `None` for the default
    /// branch.
    pub binding: Option<usize>,

    /// The stick values were outside of the axis range and were clamped.
    pub axes_clamped: bool,
}

/// Report of a complete teleop run.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct LoopReport {
    pub num_ticks: u64,

    pub num_overruns: u64,

    /// Ticks on which the input could not be read and a neutral snapshot was
    /// used instead.
    pub num_input_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TeleopCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = ControllerState;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the TeleopCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        debug!(
            "TeleopCtrl loaded {} bindings from {}",
            self.params.bindings.len(),
            init_data
        );

        Ok(())
    }

    /// Evaluate one controller snapshot.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();

        let left = input_data.left_y.clamp(-AXIS_MAX, AXIS_MAX);
        let right = input_data.right_y.clamp(-AXIS_MAX, AXIS_MAX);
        self.report.axes_clamped = left != input_data.left_y || right != input_data.right_y;

        // First match wins
        self.report.binding = self.params.bindings.iter().position(|b| match b.trigger {
            Trigger::Held(button) => input_data.button(button).held,
            Trigger::NewPress(button) => input_data.button(button).new_press,
        });

        let actions = match self.report.binding {
            Some(i) => self.params.bindings[i].actions.clone(),
            None => self.params.default_actions.clone(),
        };

        Ok((
            OutputData {
                tank: (left, right),
                actions,
            },
            self.report,
        ))
    }
}

impl TeleopCtrl {
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            report: StatusReport::default(),
        }
    }

    /// Run the teleop loop until `stop` is raised.
    ///
    /// A failed input read is replaced by a neutral snapshot, so the drive
    /// stops and the default branch runs. Failures are warned about once per
    /// streak.
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        drive: &dyn MotionFacade,
        acts: &mut ActCtrl,
        stop: &AtomicBool,
    ) -> LoopReport {
        let tick_period = Duration::from_millis(self.params.tick_period_ms);
        let mut report = LoopReport::default();
        let mut input_failing = false;

        info!("Teleop loop started");

        while !stop.load(Ordering::Relaxed) {
            let tick_start = Instant::now();

            // ---- INPUT ----

            let snapshot = match input.read() {
                Ok(s) => {
                    if input_failing {
                        info!("Controller input restored");
                        input_failing = false;
                    }
                    s
                }
                Err(e) => {
                    if !input_failing {
                        warn!("{}, using a neutral snapshot", e);
                        input_failing = true;
                    }
                    report.num_input_errors += 1;
                    ControllerState::neutral()
                }
            };

            // ---- PROCESSING ----

            let (output, status) = match self.proc(&snapshot) {
                Ok(o) => o,
                Err(e) => match e {},
            };

            if status.axes_clamped {
                trace!("Stick values clamped to the axis range");
            }

            // ---- OUTPUT ----

            drive.tank(output.tank.0, output.tank.1);

            for action in output.actions.iter() {
                if let Err(e) = acts.apply(action) {
                    warn!("Could not apply {:?}: {}", action, e);
                }
            }

            // ---- CYCLE MANAGEMENT ----

            report.num_ticks += 1;

            let tick_dur = Instant::now() - tick_start;
            match tick_period.checked_sub(tick_dur) {
                Some(d) => thread::sleep(d),
                None => {
                    warn!(
                        "Teleop tick overran by {:.06} s",
                        tick_dur.as_secs_f64() - tick_period.as_secs_f64()
                    );
                    report.num_overruns += 1;
                }
            }
        }

        info!(
            "Teleop loop stopped after {} ticks ({} overruns)",
            report.num_ticks, report.num_overruns
        );

        report
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        act_ctrl::test::test_act_ctrl, motion::mock::RecordingFacade, teleop::ScriptedInput,
    };
    use comms_if::{
        act::{ActId, BinaryState, GroupId},
        input::Button,
    };
    use std::sync::Arc;

    fn outtake(rpms: &[i32]) -> ActCmd {
        ActCmd::SetGroupVelocities {
            group: GroupId::Outtake,
            rpms: rpms.to_vec(),
        }
    }

    fn proc(state: ControllerState) -> (OutputData, StatusReport) {
        TeleopCtrl::with_params(Params::default())
            .proc(&state)
            .unwrap()
    }

    #[test]
    fn test_top_outtake() {
        let (output, report) = proc(ControllerState::neutral().with_button(Button::R1, false));

        assert_eq!(report.binding, Some(0));

        let mut acts = test_act_ctrl();
        for a in output.actions.iter() {
            acts.apply(a).unwrap();
        }
        assert_eq!(acts.velocity(ActId::IoLower).unwrap(), 200);
        assert_eq!(acts.velocity(ActId::IoMiddle).unwrap(), -300);
        assert_eq!(acts.velocity(ActId::IoUpper).unwrap(), 200);
        assert_eq!(acts.binary_state(ActId::Hood).unwrap(), BinaryState::Retracted);
    }

    #[test]
    fn test_no_input_stops_outtake() {
        let (output, report) = proc(ControllerState::neutral().with_axes(64, -64));

        assert_eq!(report.binding, None);
        assert_eq!(output.tank, (64, -64));
        assert_eq!(output.actions, vec![outtake(&[0, 0, 0])]);
    }

    #[test]
    fn test_priority_exclusive() {
        let everything = [
            Button::R1,
            Button::R2,
            Button::L1,
            Button::L2,
            Button::B,
            Button::X,
            Button::A,
        ]
        .iter()
        .fold(ControllerState::neutral(), |s, b| s.with_button(*b, true));

        let (output, report) = proc(everything);
        assert_eq!(report.binding, Some(0));
        assert_eq!(output.actions, Params::default().bindings[0].actions);

        // Lower priority branches only when the higher ones are released
        let (output, _) = proc(
            ControllerState::neutral()
                .with_button(Button::L1, false)
                .with_button(Button::B, false),
        );
        assert_eq!(output.actions, vec![outtake(&[200, 200, 200])]);

        let (output, _) = proc(ControllerState::neutral().with_button(Button::X, false));
        assert_eq!(
            output.actions,
            vec![ActCmd::SetBinary {
                id: ActId::MainPistons,
                extended: false
            }]
        );
    }

    #[test]
    fn test_hood_toggle_on_new_press_only() {
        let (_, report) = proc(ControllerState::neutral().with_button(Button::A, true));
        assert_eq!(report.binding, Some(6));

        let (output, report) = proc(ControllerState::neutral().with_button(Button::A, false));
        assert_eq!(report.binding, None);
        assert_eq!(output.actions, vec![outtake(&[0, 0, 0])]);
    }

    #[test]
    fn test_axes_clamped() {
        let (output, report) = proc(ControllerState::neutral().with_axes(200, -300));

        assert!(report.axes_clamped);
        assert_eq!(output.tank, (127, -127));
    }

    #[test]
    fn test_run_loop() {
        let (mut input, feed) = ScriptedInput::new();
        let drive = RecordingFacade::default();
        let mut acts = test_act_ctrl();
        let stop = Arc::new(AtomicBool::new(false));

        feed.set(
            ControllerState::neutral()
                .with_axes(100, 90)
                .with_button(Button::B, false),
        );

        let stopper = {
            let stop = stop.clone();
            let feed = feed.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                feed.disconnect();
                thread::sleep(Duration::from_millis(50));
                stop.store(true, Ordering::Relaxed);
            })
        };

        let mut ctrl = TeleopCtrl::with_params(Params::default());
        let report = ctrl.run(&mut input, &drive, &mut acts, &stop);
        stopper.join().unwrap();

        assert!(report.num_ticks > 2);
        assert!(report.num_input_errors > 0);
        assert!(drive.tank.lock().unwrap().contains(&(100, 90)));

        // Disconnected, so neutral
        assert_eq!(drive.last_tank(), Some((0, 0)));
        assert_eq!(
            acts.binary_state(ActId::MainPistons).unwrap(),
            BinaryState::Extended
        );
        assert_eq!(acts.velocity(ActId::IoUpper).unwrap(), 0);
    }
}
