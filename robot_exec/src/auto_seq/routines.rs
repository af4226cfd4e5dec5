//! # Autonomous routines
//!
//! Field coordinates are in inches with the origin at the robot's starting position. The routine
//! run in the autonomous phase is chosen at build time with the `left_side`, `right_side` and
//! `skills` features.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{Routine, Step};
use comms_if::{
    act::{ActCmd, ActId, GroupId},
    motion::{AngularDirection, MotionCmd, MotionOpts, Pose},
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// The routine selected by the enabled features.
pub fn selected() -> Routine {
    if cfg!(feature = "skills") {
        skills()
    } else if cfg!(feature = "right_side") {
        right_side()
    } else {
        left_side()
    }
}

/// Every routine, for listing and dumping.
pub fn all() -> Vec<Routine> {
    vec![left_side(), right_side(), skills()]
}

/// Starts on the left of the field: collects from the loader, scores in the long goal, then in the
/// centre goal.
pub fn left_side() -> Routine {
    Routine {
        name: String::from("left_side"),
        start: Pose::new(0.0, 0.0, 0.0),
        steps: vec![
            motion(move_to_point(0.0, 18.248, 2000, MotionOpts::default())),
            motion(turn_to_heading(270.0, 1000, MotionOpts::default())),
            Step::Act(intake(200)),
            // Drop the loader arm on the way in
            Step::PartialMotion {
                motion: move_to_point(-24.0, 18.248, 1500, MotionOpts::default()),
                distance: 12.0,
                actions: vec![pistons(true)],
                truncate: false,
            },
            motion(move_to_point(
                -30.7,
                18.248,
                1000,
                MotionOpts::default().max_speed(60),
            )),
            Step::Delay { ms: 600 },
            // Against the loader
            Step::SetPose(Pose::new(-30.7, 14.53, 270.0)),
            Step::Act(pistons(false)),
            motion(move_to_point(
                -6.0,
                14.53,
                1500,
                MotionOpts::default().backwards(),
            )),
            Step::Act(outtake(&[200, -300, 200])),
            Step::Delay { ms: 1200 },
            // Leave the goal and flip the hood before reaching the centre
            Step::PartialMotion {
                motion: move_to_pose(
                    -20.0,
                    36.0,
                    45.0,
                    2000,
                    MotionOpts::default().lead(0.4),
                ),
                distance: 6.0,
                actions: vec![
                    outtake(&[0, 0, 0]),
                    ActCmd::ToggleBinary { id: ActId::Hood },
                ],
                truncate: false,
            },
            motion(turn_to_heading(
                45.0,
                800,
                MotionOpts::default().direction(AngularDirection::Cw),
            )),
            Step::Act(outtake(&[-200, -200, 200])),
            Step::Delay { ms: 800 },
            Step::Act(outtake(&[0, 0, 0])),
        ],
    }
}

/// Mirror of [`left_side`].
pub fn right_side() -> Routine {
    left_side().mirrored("right_side")
}

/// One minute skills run: clears both loaders and scores at both ends of the long goal.
pub fn skills() -> Routine {
    let mut steps = vec![
        motion(move_to_point(0.0, 18.248, 2000, MotionOpts::default())),
        motion(turn_to_heading(270.0, 1000, MotionOpts::default())),
        Step::Act(intake(200)),
        Step::Act(pistons(true)),
        motion(move_to_point(-30.7, 18.248, 2000, MotionOpts::default().max_speed(60))),
        Step::Delay { ms: 1500 },
        Step::SetPose(Pose::new(-30.7, 14.53, 270.0)),
        Step::Act(pistons(false)),
        // Cross the field backwards, cut short at the far end of the goal
        Step::PartialMotion {
            motion: move_to_point(
                70.0,
                14.53,
                4000,
                MotionOpts::default().backwards().early_exit_range(2.0),
            ),
            distance: 60.0,
            actions: vec![ActCmd::SetBinary {
                id: ActId::Hood,
                extended: true,
            }],
            truncate: true,
        },
        Step::Act(outtake(&[200, -300, 200])),
        Step::Delay { ms: 1500 },
    ];

    // Second loader on the far side
    steps.extend(vec![
        Step::Act(outtake(&[0, 0, 0])),
        motion(move_to_point(96.0, 14.53, 2000, MotionOpts::default().backwards())),
        motion(turn_to_heading(
            90.0,
            1200,
            MotionOpts::default().direction(AngularDirection::Ccw),
        )),
        Step::Act(intake(200)),
        Step::Act(pistons(true)),
        motion(move_to_point(
            110.0,
            14.53,
            1500,
            MotionOpts::default().max_speed(60),
        )),
        Step::Delay { ms: 1500 },
        Step::SetPose(Pose::new(110.0, 14.53, 90.0)),
        Step::Act(pistons(false)),
        motion(move_to_point(
            78.0,
            14.53,
            2000,
            MotionOpts::default().backwards(),
        )),
        Step::Act(outtake(&[200, -300, 200])),
        Step::Delay { ms: 1500 },
        // Park
        Step::PartialMotion {
            motion: move_to_pose(40.0, -6.0, 180.0, 3000, MotionOpts::default()),
            distance: 10.0,
            actions: vec![outtake(&[0, 0, 0])],
            truncate: false,
        },
    ]);

    Routine {
        name: String::from("skills"),
        start: Pose::new(0.0, 0.0, 0.0),
        steps,
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn motion(cmd: MotionCmd) -> Step {
    Step::Motion(cmd)
}

fn move_to_point(x: f64, y: f64, timeout_ms: u32, opts: MotionOpts) -> MotionCmd {
    MotionCmd::MoveToPoint {
        x,
        y,
        timeout_ms,
        opts,
    }
}

fn move_to_pose(x: f64, y: f64, heading: f64, timeout_ms: u32, opts: MotionOpts) -> MotionCmd {
    MotionCmd::MoveToPose {
        x,
        y,
        heading,
        timeout_ms,
        opts,
    }
}

fn turn_to_heading(heading: f64, timeout_ms: u32, opts: MotionOpts) -> MotionCmd {
    MotionCmd::TurnToHeading {
        heading,
        timeout_ms,
        opts,
    }
}

fn intake(rpm: i32) -> ActCmd {
    ActCmd::SetGroupVelocity {
        group: GroupId::Intake,
        rpm,
    }
}

fn outtake(rpms: &[i32]) -> ActCmd {
    ActCmd::SetGroupVelocities {
        group: GroupId::Outtake,
        rpms: rpms.to_vec(),
    }
}

fn pistons(extended: bool) -> ActCmd {
    ActCmd::SetBinary {
        id: ActId::MainPistons,
        extended,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_left_side_opening() {
        let r = left_side();

        assert_eq!(
            r.steps[0],
            Step::Motion(MotionCmd::MoveToPoint {
                x: 0.0,
                y: 18.248,
                timeout_ms: 2000,
                opts: MotionOpts::default(),
            })
        );
        assert!(matches!(
            r.steps[1],
            Step::Motion(MotionCmd::TurnToHeading { heading, .. }) if heading == 270.0
        ));
        assert!(r
            .steps
            .contains(&Step::SetPose(Pose::new(-30.7, 14.53, 270.0))));
    }

    #[test]
    fn test_skills_truncates_crossing() {
        let routine = skills();
        let truncated: Vec<&Step> = routine
            .steps
            .iter()
            .filter(|s| matches!(s, Step::PartialMotion { truncate: true, .. }))
            .collect();

        assert_eq!(truncated.len(), 1);
        match truncated[0] {
            Step::PartialMotion {
                motion, distance, ..
            } => {
                assert_eq!(*distance, 60.0);
                assert!(!motion.opts().forwards);
            }
            s => panic!("Unexpected step {:?}", s),
        }
    }

    #[test]
    fn test_routines_dump() {
        for r in all() {
            let json = serde_json::to_value(&r).unwrap();
            assert_eq!(json["name"], r.name.as_str());
            assert_eq!(json["steps"].as_array().unwrap().len(), r.steps.len());
        }
    }

    #[test]
    fn test_selected() {
        let name = selected().name;

        if cfg!(feature = "skills") {
            assert_eq!(name, "skills");
        } else if cfg!(feature = "right_side") {
            assert_eq!(name, "right_side");
        } else {
            assert_eq!(name, "left_side");
        }
    }
}
