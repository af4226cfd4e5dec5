//! Operator input sources

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use comms_if::input::ControllerState;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of controller snapshots, read once per teleop tick.
pub trait InputSource: Send {
    fn read(&mut self) -> Result<ControllerState, InputError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Input source fed from outside, by the event script on the host.
///
/// New press edges are reported by the first read after a snapshot is fed
/// and cleared afterwards.
pub struct ScriptedInput {
    latest: Arc<Mutex<Option<ControllerState>>>,
}

/// Handle used to feed a [`ScriptedInput`].
#[derive(Clone)]
pub struct InputFeed {
    latest: Arc<Mutex<Option<ControllerState>>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("The controller is disconnected")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptedInput {
    /// Create a disconnected input and the feed used to drive it.
    pub fn new() -> (Self, InputFeed) {
        let latest = Arc::new(Mutex::new(None));

        (
            Self {
                latest: latest.clone(),
            },
            InputFeed { latest },
        )
    }
}

impl InputSource for ScriptedInput {
    fn read(&mut self) -> Result<ControllerState, InputError> {
        let mut latest = lock(&self.latest);

        match latest.as_mut() {
            Some(state) => {
                let snapshot = state.clone();
                for button in state.buttons.values_mut() {
                    button.new_press = false;
                }
                Ok(snapshot)
            }
            None => Err(InputError::Disconnected),
        }
    }
}

impl InputFeed {
    /// Replace the current snapshot.
    pub fn set(&self, state: ControllerState) {
        *lock(&self.latest) = Some(state);
    }

    /// Make every following read fail until a new snapshot is fed.
    pub fn disconnect(&self) {
        *lock(&self.latest) = None;
    }
}

fn lock(latest: &Mutex<Option<ControllerState>>) -> MutexGuard<Option<ControllerState>> {
    latest.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::input::Button;

    #[test]
    fn test_scripted_input() {
        let (mut input, feed) = ScriptedInput::new();

        assert!(matches!(input.read(), Err(InputError::Disconnected)));

        feed.set(ControllerState::neutral().with_button(Button::A, true));

        // Edge seen once, level kept
        let first = input.read().unwrap();
        assert!(first.button(Button::A).new_press);
        let second = input.read().unwrap();
        assert!(!second.button(Button::A).new_press);
        assert!(second.button(Button::A).held);

        feed.disconnect();
        assert!(input.read().is_err());
    }
}
