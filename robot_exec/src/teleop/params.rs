//! Parameters structure for TeleopCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use comms_if::{
    act::{ActCmd, ActId, GroupId},
    input::Button,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for teleoperation, loaded from `teleop.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// Target period of one teleop tick.
    pub tick_period_ms: u64,

    /// Button bindings in priority order, the first matching binding is the
    /// only one applied.
    pub bindings: Vec<Binding>,

    /// Actions applied when no binding matches.
    pub default_actions: Vec<ActCmd>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Binding {
    pub name: String,

    pub trigger: Trigger,

    pub actions: Vec<ActCmd>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Trigger {
    /// Matches on every tick the button is down.
    Held(Button),

    /// Matches only on the tick the button goes down.
    NewPress(Button),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            bindings: vec![
                Binding {
                    name: String::from("top_outtake"),
                    trigger: Trigger::Held(Button::R1),
                    actions: vec![
                        outtake(&[200, -300, 200]),
                        ActCmd::SetBinary {
                            id: ActId::Hood,
                            extended: false,
                        },
                    ],
                },
                Binding {
                    name: String::from("middle_outtake"),
                    trigger: Trigger::Held(Button::R2),
                    actions: vec![outtake(&[-200, -200, 200])],
                },
                Binding {
                    name: String::from("bottom_outtake"),
                    trigger: Trigger::Held(Button::L1),
                    actions: vec![outtake(&[200, 200, 200])],
                },
                Binding {
                    name: String::from("reverse_intake"),
                    trigger: Trigger::Held(Button::L2),
                    actions: vec![outtake(&[-200, -200, -200])],
                },
                Binding {
                    name: String::from("extend_pistons"),
                    trigger: Trigger::Held(Button::B),
                    actions: vec![ActCmd::SetBinary {
                        id: ActId::MainPistons,
                        extended: true,
                    }],
                },
                Binding {
                    name: String::from("retract_pistons"),
                    trigger: Trigger::Held(Button::X),
                    actions: vec![ActCmd::SetBinary {
                        id: ActId::MainPistons,
                        extended: false,
                    }],
                },
                Binding {
                    name: String::from("toggle_hood"),
                    trigger: Trigger::NewPress(Button::A),
                    actions: vec![ActCmd::ToggleBinary { id: ActId::Hood }],
                },
            ],
            default_actions: vec![outtake(&[0, 0, 0])],
        }
    }
}

fn outtake(rpms: &[i32]) -> ActCmd {
    ActCmd::SetGroupVelocities {
        group: GroupId::Outtake,
        rpms: rpms.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bindings() {
        let p: Params = util::params::from_str(
            r#"
            tick_period_ms = 20

            default_actions = [
                { SetGroupVelocity = { group = "Outtake", rpm = 0 } },
            ]

            [[bindings]]
            name = "intake"
            trigger = { Held = "L1" }
            actions = [
                { SetGroupVelocities = { group = "Outtake", rpms = [200, 200, 200] } },
            ]

            [[bindings]]
            name = "hood"
            trigger = { NewPress = "A" }
            actions = [{ ToggleBinary = { id = "Hood" } }]
            "#,
        )
        .unwrap();

        assert_eq!(p.tick_period_ms, 20);
        assert_eq!(p.bindings.len(), 2);
        assert_eq!(p.bindings[1].trigger, Trigger::NewPress(Button::A));
        assert_eq!(
            p.default_actions,
            vec![ActCmd::SetGroupVelocity {
                group: GroupId::Outtake,
                rpm: 0
            }]
        );
    }
}
