//! # Motion data
//!
//! Types consumed by the motion facade: the robot pose, the options accepted by every motion
//! primitive and the motion commands issued by the autonomous sequencer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum magnitude of a raw motor command.
pub const MAX_SPEED: f64 = 127.0;

/// [`MAX_SPEED`] as the integer used by [`MotionOpts`].
pub const MAX_SPEED_RAW: i32 = 127;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The pose (position and heading in the field frame) of the robot.
///
/// Heading 0 faces the field +Y axis, positive headings rotate clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Units: inches
    pub x: f64,

    /// Units: inches
    pub y: f64,

    /// Units: degrees
    pub theta: f64,
}

/// Options accepted by the motion primitives.
///
/// Fields missing from a serialised form take their default value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionOpts {
    /// Travel direction, `false` drives with the back of the robot.
    pub forwards: bool,

    /// Curvature bias used when approaching a pose, between 0 and 1.
    pub lead: f64,

    /// Output clamp in raw units (0 to 127).
    pub max_speed: i32,

    /// Minimum output in raw units (0 to 127).
    pub min_speed: i32,

    /// Distance (inches) or angle (degrees) at which the motion is declared complete early.
    pub early_exit_range: f64,

    /// Horizontal drift override, 0 uses the drivetrain default.
    pub horizontal_drift: f64,

    /// Preferred rotation direction for turns.
    pub direction: AngularDirection,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Rotation direction of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngularDirection {
    /// Clockwise
    Cw,
    /// Counter-clockwise
    Ccw,
    /// Whichever direction is shortest
    Either,
}

/// A single motion issued to the motion facade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionCmd {
    /// Drive to a point, ignoring the final heading.
    MoveToPoint {
        x: f64,
        y: f64,
        timeout_ms: u32,
        #[serde(default)]
        opts: MotionOpts,
    },

    /// Drive to a point and arrive with the given heading.
    MoveToPose {
        x: f64,
        y: f64,
        heading: f64,
        timeout_ms: u32,
        #[serde(default)]
        opts: MotionOpts,
    },

    /// Turn in place to a heading.
    TurnToHeading {
        heading: f64,
        timeout_ms: u32,
        #[serde(default)]
        opts: MotionOpts,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    /// Euclidian distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: {:.3}, y: {:.3}, theta: {:.3}", self.x, self.y, self.theta)
    }
}

impl Default for MotionOpts {
    fn default() -> Self {
        Self {
            forwards: true,
            lead: 0.6,
            max_speed: MAX_SPEED_RAW,
            min_speed: 0,
            early_exit_range: 0.0,
            horizontal_drift: 0.0,
            direction: AngularDirection::Either,
        }
    }
}

impl MotionOpts {
    /// Drive with the back of the robot.
    pub fn backwards(mut self) -> Self {
        self.forwards = false;
        self
    }

    pub fn lead(mut self, lead: f64) -> Self {
        self.lead = lead;
        self
    }

    pub fn max_speed(mut self, max_speed: i32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn min_speed(mut self, min_speed: i32) -> Self {
        self.min_speed = min_speed;
        self
    }

    pub fn early_exit_range(mut self, range: f64) -> Self {
        self.early_exit_range = range;
        self
    }

    pub fn horizontal_drift(mut self, drift: f64) -> Self {
        self.horizontal_drift = drift;
        self
    }

    pub fn direction(mut self, direction: AngularDirection) -> Self {
        self.direction = direction;
        self
    }
}

impl Default for AngularDirection {
    fn default() -> Self {
        AngularDirection::Either
    }
}

impl AngularDirection {
    /// The direction seen in a mirror about the field Y axis.
    pub fn mirrored(self) -> Self {
        match self {
            AngularDirection::Cw => AngularDirection::Ccw,
            AngularDirection::Ccw => AngularDirection::Cw,
            AngularDirection::Either => AngularDirection::Either,
        }
    }
}

impl MotionCmd {
    /// Time after which the facade abandons the motion.
    pub fn timeout_ms(&self) -> u32 {
        match self {
            MotionCmd::MoveToPoint { timeout_ms, .. }
            | MotionCmd::MoveToPose { timeout_ms, .. }
            | MotionCmd::TurnToHeading { timeout_ms, .. } => *timeout_ms,
        }
    }

    pub fn opts(&self) -> &MotionOpts {
        match self {
            MotionCmd::MoveToPoint { opts, .. }
            | MotionCmd::MoveToPose { opts, .. }
            | MotionCmd::TurnToHeading { opts, .. } => opts,
        }
    }

    /// The same motion seen in a mirror about the field Y axis.
    ///
    /// X coordinates are negated, headings are reflected and turn directions are swapped.
    pub fn mirrored(&self) -> Self {
        let mirror_opts = |o: &MotionOpts| MotionOpts {
            direction: o.direction.mirrored(),
            ..*o
        };

        match *self {
            MotionCmd::MoveToPoint { x, y, timeout_ms, ref opts } => MotionCmd::MoveToPoint {
                x: -x,
                y,
                timeout_ms,
                opts: mirror_opts(opts),
            },
            MotionCmd::MoveToPose { x, y, heading, timeout_ms, ref opts } => {
                MotionCmd::MoveToPose {
                    x: -x,
                    y,
                    heading: mirror_heading(heading),
                    timeout_ms,
                    opts: mirror_opts(opts),
                }
            }
            MotionCmd::TurnToHeading { heading, timeout_ms, ref opts } => {
                MotionCmd::TurnToHeading {
                    heading: mirror_heading(heading),
                    timeout_ms,
                    opts: mirror_opts(opts),
                }
            }
        }
    }
}

/// Reflect a heading in degrees about the field Y axis, returning a value in [0, 360).
pub fn mirror_heading(heading: f64) -> f64 {
    (360.0 - heading).rem_euclid(360.0)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_opts_default_from_partial_json() {
        let opts: MotionOpts =
            serde_json::from_str(r#"{"forwards": false, "min_speed": 30}"#).unwrap();

        assert!(!opts.forwards);
        assert_eq!(opts.max_speed, MAX_SPEED_RAW);
        assert_eq!(opts.min_speed, 30);
        assert_eq!(opts.direction, AngularDirection::Either);
    }

    #[test]
    fn test_mirror() {
        let cmd = MotionCmd::TurnToHeading {
            heading: 90.0,
            timeout_ms: 1000,
            opts: MotionOpts::default().direction(AngularDirection::Cw),
        };

        match cmd.mirrored() {
            MotionCmd::TurnToHeading { heading, opts, .. } => {
                assert_eq!(heading, 270.0);
                assert_eq!(opts.direction, AngularDirection::Ccw);
            }
            c => panic!("Unexpected mirrored command {:?}", c),
        }

        assert_eq!(mirror_heading(0.0), 0.0);
        assert_eq!(mirror_heading(270.0), 90.0);
    }
}
