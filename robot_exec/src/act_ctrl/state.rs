//! Implementations for the ActCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

// Internal
use super::{ActCtrlError, ActuatorDriver, Params};
use comms_if::act::{ActCmd, ActId, BinaryState, GroupId};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator control module state.
///
/// Owns the last commanded state of every configured actuator. Exactly one
/// component (the sequencer or the teleop loop) holds the `ActCtrl` at a
/// time.
pub struct ActCtrl {
    states: BTreeMap<ActId, ActuatorState>,

    groups: HashMap<GroupId, Vec<ActId>>,

    /// Free speed of each motor's cartridge, velocities sent to the driver
    /// saturate at this value.
    max_rpms: HashMap<ActId, i32>,

    driver: Box<dyn ActuatorDriver>,

    report: StatusReport,
}

/// Status report for ActCtrl.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Number of commands applied.
    pub num_cmds: u64,

    /// Number of writes the driver failed to perform.
    pub num_driver_errors: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The last commanded state of an actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ActuatorState {
    /// Pneumatic actuator
    Binary(BinaryState),

    /// Motor velocity in rpm
    Velocity(i32),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActCtrl {
    /// Create the actuator controller, validating the parameters and driving
    /// every actuator to its initial state.
    pub fn new(params: &Params, driver: Box<dyn ActuatorDriver>) -> Result<Self, ActCtrlError> {
        let mut states = BTreeMap::new();

        for p in params.pneumatics.iter() {
            let valid_port = p.adi_port.len() == 1
                && p.adi_port.chars().all(|c| ('a'..='h').contains(&c.to_ascii_lowercase()));
            if !valid_port {
                return Err(ActCtrlError::InvalidParams(format!(
                    "{:?} has an invalid ADI port \"{}\"",
                    p.id, p.adi_port
                )));
            }

            let initial = ActuatorState::Binary(BinaryState::from_extended(p.initially_extended));
            if states.insert(p.id, initial).is_some() {
                return Err(ActCtrlError::InvalidParams(format!(
                    "{:?} is configured more than once",
                    p.id
                )));
            }
        }

        let mut ports = HashSet::new();
        let mut max_rpms = HashMap::new();
        for m in params.motors.iter() {
            if m.port == 0 || m.port.unsigned_abs() > 21 || !ports.insert(m.port.unsigned_abs()) {
                return Err(ActCtrlError::InvalidParams(format!(
                    "{:?} has an invalid or duplicate port {}",
                    m.id, m.port
                )));
            }

            if states.insert(m.id, ActuatorState::Velocity(0)).is_some() {
                return Err(ActCtrlError::InvalidParams(format!(
                    "{:?} is configured more than once",
                    m.id
                )));
            }
            max_rpms.insert(m.id, m.gearset.max_rpm());
        }

        let mut groups = HashMap::new();
        for g in params.groups.iter() {
            for member in g.members.iter() {
                match states.get(member) {
                    Some(ActuatorState::Velocity(_)) => (),
                    Some(ActuatorState::Binary(_)) => return Err(ActCtrlError::NotMotor(*member)),
                    None => return Err(ActCtrlError::UnknownActuator(*member)),
                }
            }
            groups.insert(g.id, g.members.clone());
        }

        let mut act_ctrl = Self {
            states,
            groups,
            max_rpms,
            driver,
            report: StatusReport::default(),
        };

        // Push the initial states out to the hardware
        let initial: Vec<(ActId, ActuatorState)> =
            act_ctrl.states.iter().map(|(id, s)| (*id, *s)).collect();
        for (id, state) in initial {
            act_ctrl.write(id, state);
        }

        debug!("ActCtrl created with {} actuators", act_ctrl.states.len());

        Ok(act_ctrl)
    }

    /// Extend or retract a pneumatic actuator.
    ///
    /// Commanding the state the actuator is already in is not an error.
    pub fn set_binary(&mut self, id: ActId, extended: bool) -> Result<(), ActCtrlError> {
        self.binary_state(id)?;
        self.command(id, ActuatorState::Binary(BinaryState::from_extended(extended)));
        Ok(())
    }

    /// Flip a pneumatic actuator relative to its last commanded state,
    /// returning the new state.
    pub fn toggle_binary(&mut self, id: ActId) -> Result<BinaryState, ActCtrlError> {
        let new_state = self.binary_state(id)?.toggled();
        self.command(id, ActuatorState::Binary(new_state));
        Ok(new_state)
    }

    /// Set the velocity of a single motor, replacing any previous command.
    pub fn set_velocity(&mut self, id: ActId, rpm: i32) -> Result<(), ActCtrlError> {
        self.velocity(id)?;
        self.command(id, ActuatorState::Velocity(rpm));
        Ok(())
    }

    /// Set every motor in a group to the same velocity.
    pub fn set_group_velocity(&mut self, group: GroupId, rpm: i32) -> Result<(), ActCtrlError> {
        let members = self.group(group)?;
        for id in members {
            self.command(id, ActuatorState::Velocity(rpm));
        }
        Ok(())
    }

    /// Set a distinct velocity for each motor of a group, in member order.
    pub fn set_group_velocities(
        &mut self,
        group: GroupId,
        rpms: &[i32],
    ) -> Result<(), ActCtrlError> {
        let members = self.group(group)?;
        if members.len() != rpms.len() {
            return Err(ActCtrlError::GroupSizeMismatch {
                group,
                expected: members.len(),
                found: rpms.len(),
            });
        }

        for (id, rpm) in members.into_iter().zip(rpms.iter()) {
            self.command(id, ActuatorState::Velocity(*rpm));
        }
        Ok(())
    }

    /// Apply an actuator command.
    pub fn apply(&mut self, cmd: &ActCmd) -> Result<(), ActCtrlError> {
        match cmd {
            ActCmd::SetBinary { id, extended } => self.set_binary(*id, *extended),
            ActCmd::ToggleBinary { id } => self.toggle_binary(*id).map(|_| ()),
            ActCmd::SetVelocity { id, rpm } => self.set_velocity(*id, *rpm),
            ActCmd::SetGroupVelocity { group, rpm } => self.set_group_velocity(*group, *rpm),
            ActCmd::SetGroupVelocities { group, rpms } => self.set_group_velocities(*group, rpms),
        }
    }

    /// Command every motor to stop. Pneumatics keep their state.
    pub fn stop_all(&mut self) {
        let motors: Vec<ActId> = self
            .states
            .iter()
            .filter(|(_, s)| matches!(s, ActuatorState::Velocity(_)))
            .map(|(id, _)| *id)
            .collect();

        for id in motors {
            self.command(id, ActuatorState::Velocity(0));
        }
    }

    /// The last commanded state of an actuator, or `None` if not configured.
    pub fn state(&self, id: ActId) -> Option<ActuatorState> {
        self.states.get(&id).copied()
    }

    /// The last commanded state of a pneumatic actuator.
    pub fn binary_state(&self, id: ActId) -> Result<BinaryState, ActCtrlError> {
        match self.states.get(&id) {
            Some(ActuatorState::Binary(b)) => Ok(*b),
            Some(ActuatorState::Velocity(_)) => Err(ActCtrlError::NotBinary(id)),
            None => Err(ActCtrlError::UnknownActuator(id)),
        }
    }

    /// The last commanded velocity of a motor.
    pub fn velocity(&self, id: ActId) -> Result<i32, ActCtrlError> {
        match self.states.get(&id) {
            Some(ActuatorState::Velocity(v)) => Ok(*v),
            Some(ActuatorState::Binary(_)) => Err(ActCtrlError::NotMotor(id)),
            None => Err(ActCtrlError::UnknownActuator(id)),
        }
    }

    /// Members of a motor group in order.
    pub fn group(&self, group: GroupId) -> Result<Vec<ActId>, ActCtrlError> {
        self.groups
            .get(&group)
            .cloned()
            .ok_or(ActCtrlError::UnknownGroup(group))
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Record the commanded state and write it to the hardware.
    fn command(&mut self, id: ActId, state: ActuatorState) {
        self.report.num_cmds += 1;
        self.states.insert(id, state);
        self.write(id, state);
    }

    /// Write a state to the driver. Failures are reported but the commanded
    /// state is kept, the next command will try again.
    fn write(&mut self, id: ActId, state: ActuatorState) {
        let result = match state {
            ActuatorState::Binary(b) => self.driver.write_binary(id, b.is_extended()),
            ActuatorState::Velocity(rpm) => {
                let limit = self.max_rpms.get(&id).copied().unwrap_or(i32::MAX);
                let output = rpm.clamp(-limit, limit);
                if output != rpm {
                    trace!("{:?} saturated at {} rpm", id, output);
                }
                self.driver.write_velocity(id, output)
            }
        };

        if let Err(e) = result {
            self.report.num_driver_errors += 1;
            warn!("Actuator write failed: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::act_ctrl::{DriverError, GroupParams, MotorParams, PneumaticParams, SimActDriver};
    use comms_if::act::Gearset;
    use std::sync::{Arc, Mutex};

    /// Driver recording every write, shared with the test through an `Arc`.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingDriver {
        pub writes: Arc<Mutex<Vec<(ActId, ActuatorState)>>>,
        pub fail: bool,
    }

    impl ActuatorDriver for RecordingDriver {
        fn write_binary(&mut self, id: ActId, extended: bool) -> Result<(), DriverError> {
            if self.fail {
                return Err(DriverError::Disconnected(id));
            }
            self.writes.lock().unwrap().push((
                id,
                ActuatorState::Binary(BinaryState::from_extended(extended)),
            ));
            Ok(())
        }

        fn write_velocity(&mut self, id: ActId, rpm: i32) -> Result<(), DriverError> {
            if self.fail {
                return Err(DriverError::Disconnected(id));
            }
            self.writes.lock().unwrap().push((id, ActuatorState::Velocity(rpm)));
            Ok(())
        }
    }

    /// The competition robot's actuator layout.
    pub(crate) fn test_params() -> Params {
        Params {
            pneumatics: vec![
                PneumaticParams {
                    id: ActId::MainPistons,
                    adi_port: String::from("a"),
                    initially_extended: false,
                },
                PneumaticParams {
                    id: ActId::Hood,
                    adi_port: String::from("b"),
                    initially_extended: true,
                },
            ],
            motors: vec![
                MotorParams {
                    id: ActId::IoLower,
                    port: 4,
                    gearset: Gearset::Green,
                },
                MotorParams {
                    id: ActId::IoMiddle,
                    port: 5,
                    gearset: Gearset::Green,
                },
                MotorParams {
                    id: ActId::IoUpper,
                    port: 7,
                    gearset: Gearset::Green,
                },
            ],
            groups: vec![
                GroupParams {
                    id: GroupId::Outtake,
                    members: vec![ActId::IoLower, ActId::IoMiddle, ActId::IoUpper],
                },
                GroupParams {
                    id: GroupId::Intake,
                    members: vec![ActId::IoLower, ActId::IoMiddle],
                },
            ],
        }
    }

    pub(crate) fn test_act_ctrl() -> ActCtrl {
        ActCtrl::new(&test_params(), Box::new(SimActDriver)).unwrap()
    }

    #[test]
    fn test_initial_states_written() {
        let driver = RecordingDriver::default();
        let act_ctrl = ActCtrl::new(&test_params(), Box::new(driver.clone())).unwrap();

        assert_eq!(driver.writes.lock().unwrap().len(), 5);
        assert_eq!(act_ctrl.binary_state(ActId::Hood).unwrap(), BinaryState::Extended);
        assert_eq!(act_ctrl.velocity(ActId::IoUpper).unwrap(), 0);
    }

    #[test]
    fn test_set_binary_last_write_wins() {
        let mut act_ctrl = test_act_ctrl();

        let sequence = [true, true, false, true, false, false, true];
        for extended in sequence.iter() {
            act_ctrl.set_binary(ActId::MainPistons, *extended).unwrap();
        }

        assert_eq!(
            act_ctrl.state(ActId::MainPistons),
            Some(ActuatorState::Binary(BinaryState::Extended))
        );

        act_ctrl.set_binary(ActId::MainPistons, false).unwrap();
        act_ctrl.set_binary(ActId::MainPistons, false).unwrap();
        assert_eq!(
            act_ctrl.binary_state(ActId::MainPistons).unwrap(),
            BinaryState::Retracted
        );
    }

    #[test]
    fn test_toggle_involution() {
        let mut act_ctrl = test_act_ctrl();

        for initial in [false, true].iter() {
            act_ctrl.set_binary(ActId::Hood, *initial).unwrap();
            let before = act_ctrl.binary_state(ActId::Hood).unwrap();

            assert_eq!(act_ctrl.toggle_binary(ActId::Hood).unwrap(), before.toggled());
            assert_eq!(act_ctrl.toggle_binary(ActId::Hood).unwrap(), before);
            assert_eq!(act_ctrl.binary_state(ActId::Hood).unwrap(), before);
        }
    }

    #[test]
    fn test_group_velocities() {
        let mut act_ctrl = test_act_ctrl();

        act_ctrl
            .set_group_velocities(GroupId::Outtake, &[200, -300, 200])
            .unwrap();
        assert_eq!(act_ctrl.velocity(ActId::IoLower).unwrap(), 200);
        assert_eq!(act_ctrl.velocity(ActId::IoMiddle).unwrap(), -300);
        assert_eq!(act_ctrl.velocity(ActId::IoUpper).unwrap(), 200);

        act_ctrl.set_group_velocity(GroupId::Intake, -100).unwrap();
        assert_eq!(act_ctrl.velocity(ActId::IoLower).unwrap(), -100);
        assert_eq!(act_ctrl.velocity(ActId::IoMiddle).unwrap(), -100);
        assert_eq!(act_ctrl.velocity(ActId::IoUpper).unwrap(), 200);

        assert!(matches!(
            act_ctrl.set_group_velocities(GroupId::Intake, &[1, 2, 3]),
            Err(ActCtrlError::GroupSizeMismatch { expected: 2, found: 3, .. })
        ));

        act_ctrl.stop_all();
        for id in act_ctrl.group(GroupId::Outtake).unwrap() {
            assert_eq!(act_ctrl.velocity(id).unwrap(), 0);
        }
    }

    #[test]
    fn test_wrong_kind() {
        let mut act_ctrl = test_act_ctrl();

        assert!(matches!(
            act_ctrl.set_velocity(ActId::Hood, 10),
            Err(ActCtrlError::NotMotor(ActId::Hood))
        ));
        assert!(matches!(
            act_ctrl.toggle_binary(ActId::IoLower),
            Err(ActCtrlError::NotBinary(ActId::IoLower))
        ));
    }

    #[test]
    fn test_driver_failure_keeps_commanded_state() {
        let driver = RecordingDriver {
            fail: true,
            ..Default::default()
        };
        let mut act_ctrl = ActCtrl::new(&test_params(), Box::new(driver)).unwrap();

        act_ctrl.set_velocity(ActId::IoMiddle, 150).unwrap();

        assert_eq!(act_ctrl.velocity(ActId::IoMiddle).unwrap(), 150);
        assert_eq!(act_ctrl.report().num_driver_errors, 6);
    }

    #[test]
    fn test_driver_output_saturates_at_gearset() {
        let driver = RecordingDriver::default();
        let mut act_ctrl = ActCtrl::new(&test_params(), Box::new(driver.clone())).unwrap();
        driver.writes.lock().unwrap().clear();

        act_ctrl
            .set_group_velocities(GroupId::Outtake, &[200, -300, 150])
            .unwrap();

        // The commanded state is kept, only the output is limited to the green cartridge
        assert_eq!(act_ctrl.velocity(ActId::IoMiddle).unwrap(), -300);
        assert_eq!(
            *driver.writes.lock().unwrap(),
            vec![
                (ActId::IoLower, ActuatorState::Velocity(200)),
                (ActId::IoMiddle, ActuatorState::Velocity(-200)),
                (ActId::IoUpper, ActuatorState::Velocity(150)),
            ]
        );
    }

    #[test]
    fn test_invalid_params() {
        let mut params = test_params();
        params.motors[1].port = 4;
        assert!(ActCtrl::new(&params, Box::new(SimActDriver)).is_err());

        let mut params = test_params();
        params.motors[0].port = -128;
        assert!(matches!(
            ActCtrl::new(&params, Box::new(SimActDriver)),
            Err(ActCtrlError::InvalidParams(_))
        ));

        let mut params = test_params();
        params.motors[0].port = -5;
        assert!(ActCtrl::new(&params, Box::new(SimActDriver)).is_err());

        let mut params = test_params();
        params.pneumatics[0].adi_port = String::from("z");
        assert!(ActCtrl::new(&params, Box::new(SimActDriver)).is_err());

        let mut params = test_params();
        params.groups[0].members.push(ActId::Hood);
        assert!(matches!(
            ActCtrl::new(&params, Box::new(SimActDriver)),
            Err(ActCtrlError::NotMotor(ActId::Hood))
        ));
    }
}
