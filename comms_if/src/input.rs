//! # Operator controller input
//!
//! A [`ControllerState`] is a snapshot of the operator controller taken once per control tick.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum magnitude of an analog axis.
pub const AXIS_MAX: i32 = 127;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of a digital button during one tick.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ButtonState {
    /// The button is currently held down.
    pub held: bool,

    /// The button went from released to pressed since the previous snapshot.
    pub new_press: bool,
}

/// Snapshot of the operator controller.
///
/// Buttons missing from `buttons` are released.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerState {
    /// Left stick vertical axis, -127 to 127.
    pub left_y: i32,

    /// Right stick vertical axis, -127 to 127.
    pub right_y: i32,

    pub buttons: HashMap<Button, ButtonState>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Digital buttons of the controller.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    L1,
    L2,
    R1,
    R2,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControllerState {
    /// A snapshot with centred sticks and no buttons pressed.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// State of the given button, released if not present.
    pub fn button(&self, button: Button) -> ButtonState {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    /// Mark the given button as held (and newly pressed if `new_press`).
    pub fn with_button(mut self, button: Button, new_press: bool) -> Self {
        self.buttons.insert(
            button,
            ButtonState {
                held: true,
                new_press,
            },
        );
        self
    }

    pub fn with_axes(mut self, left_y: i32, right_y: i32) -> Self {
        self.left_y = left_y;
        self.right_y = right_y;
        self
    }
}
