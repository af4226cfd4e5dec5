//! # Routine steps

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    act::ActCmd,
    motion::{mirror_heading, MotionCmd, Pose},
};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A named autonomous routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,

    /// Pose the robot is placed in before the routine starts.
    pub start: Pose,

    pub steps: Vec<Step>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One step of a routine. Steps are executed strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Issue a motion and wait for it to end.
    Motion(MotionCmd),

    /// Issue a motion, apply `actions` once the robot has covered
    /// `distance`, then wait for the motion to end.
    ///
    /// If `truncate` is set the motion is cancelled straight after the
    /// actions are applied.
    PartialMotion {
        motion: MotionCmd,
        distance: f64,
        actions: Vec<ActCmd>,
        #[serde(default)]
        truncate: bool,
    },

    /// Apply an actuator command without waiting.
    Act(ActCmd),

    /// Reset the estimated pose. Only used where the robot is known to be
    /// against a field element.
    SetPose(Pose),

    /// Pause for a fixed time.
    Delay { ms: u64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Routine {
    /// The same routine run from the opposite side of the field, mirrored
    /// about the field Y axis.
    pub fn mirrored(&self, name: &str) -> Self {
        Self {
            name: String::from(name),
            start: mirror_pose(&self.start),
            steps: self.steps.iter().map(Step::mirrored).collect(),
        }
    }

    /// Number of motions the routine issues.
    pub fn num_motions(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Motion(_) | Step::PartialMotion { .. }))
            .count()
    }
}

impl Step {
    pub fn mirrored(&self) -> Self {
        match self {
            Step::Motion(m) => Step::Motion(m.mirrored()),
            Step::PartialMotion {
                motion,
                distance,
                actions,
                truncate,
            } => Step::PartialMotion {
                motion: motion.mirrored(),
                distance: *distance,
                actions: actions.clone(),
                truncate: *truncate,
            },
            Step::SetPose(p) => Step::SetPose(mirror_pose(p)),
            s => s.clone(),
        }
    }
}

fn mirror_pose(pose: &Pose) -> Pose {
    Pose::new(-pose.x, pose.y, mirror_heading(pose.theta))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        act::{ActId, GroupId},
        motion::{AngularDirection, MotionOpts},
    };

    #[test]
    fn test_mirror() {
        let routine = Routine {
            name: String::from("left"),
            start: Pose::new(-10.0, 5.0, 90.0),
            steps: vec![
                Step::Motion(MotionCmd::TurnToHeading {
                    heading: 45.0,
                    timeout_ms: 1000,
                    opts: MotionOpts::default().direction(AngularDirection::Cw),
                }),
                Step::SetPose(Pose::new(-30.7, 14.53, 270.0)),
                Step::Act(ActCmd::SetGroupVelocity {
                    group: GroupId::Intake,
                    rpm: 200,
                }),
            ],
        };

        let mirrored = routine.mirrored("right");

        assert_eq!(mirrored.name, "right");
        assert_eq!(mirrored.start, Pose::new(10.0, 5.0, 270.0));
        assert_eq!(
            mirrored.steps[0],
            Step::Motion(MotionCmd::TurnToHeading {
                heading: 315.0,
                timeout_ms: 1000,
                opts: MotionOpts::default().direction(AngularDirection::Ccw),
            })
        );
        assert_eq!(mirrored.steps[1], Step::SetPose(Pose::new(30.7, 14.53, 90.0)));
        assert_eq!(mirrored.steps[2], routine.steps[2]);

        // Mirroring twice gives back the original steps
        assert_eq!(mirrored.mirrored("left"), routine);
    }

    #[test]
    fn test_deserialise_step() {
        let step: Step = serde_json::from_str(
            r#"{"PartialMotion": {
                "motion": {"MoveToPoint": {"x": 0.0, "y": 24.0, "timeout_ms": 1500}},
                "distance": 10.0,
                "actions": [{"ToggleBinary": {"id": "Hood"}}]
            }}"#,
        )
        .unwrap();

        match step {
            Step::PartialMotion {
                motion,
                distance,
                actions,
                truncate,
            } => {
                assert_eq!(motion.timeout_ms(), 1500);
                assert_eq!(*motion.opts(), MotionOpts::default());
                assert_eq!(distance, 10.0);
                assert_eq!(actions, vec![ActCmd::ToggleBinary { id: ActId::Hood }]);
                assert!(!truncate);
            }
            s => panic!("Unexpected step {:?}", s),
        }
    }
}
