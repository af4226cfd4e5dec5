//! # Event script interpreter module
//!
//! This module provides an interpreter for event scripts, which stand in for
//! the field controller when the robot software runs on the host. A script
//! is a list of `time_s: {json};` entries, for example:
//!
//! ```text
//! 0.0: {"type": "PHASE", "payload": "INITIALIZE"};
//! 1.0: {"type": "PHASE", "payload": "AUTONOMOUS"};
//! 16.0: {"type": "INPUT", "payload": {"left_y": 100, "right_y": 100}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::Path;
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_tcs` to
/// acquire a list of commands that need executing.
pub struct ScriptInterpreter {
    cmds: VecDeque<Command>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError)
}

#[derive(Debug, PartialEq)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = script_path.as_ref();
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(path)
            .map_err(ScriptError::ScriptLoadError)?;

        Self::from_script(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {

        // Empty queue of commands
        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Every `<time>: <payload>;` entry, the time is checked below so
        // that a malformed one is reported rather than skipped.
        let re = RegexBuilder::
            new(r"^\s*([^:;\s][^:;\n]*?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        let mut last_time_s = 0f64;

        for cap in re.captures_iter(script) {
            // Parse the exec time
            let exec_time_s: f64 = cap[1].parse()
                .map_err(|e| ScriptError::InvalidTimestamp(
                    format!("\"{}\" ({})", &cap[1], e)))?;

            if !exec_time_s.is_finite() || exec_time_s < 0.0 {
                return Err(ScriptError::InvalidTimestamp(String::from(&cap[1])))
            }

            if exec_time_s < last_time_s {
                return Err(ScriptError::OutOfOrder(last_time_s, exec_time_s))
            }
            last_time_s = exec_time_s;

            // Parse the TC from the payload. The scripts contain JSON only.
            let tc = Tc::from_json(&cap[2])
                .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            // Build command from the match
            tc_queue.push_back(Command {
                exec_time_s,
                tc
            });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            cmds: tc_queue
        })
    }

    /// Return the TCs which are due at the current session time.
    pub fn get_pending_tcs(&mut self) -> PendingTcs {
        self.get_pending_tcs_at(get_elapsed_seconds())
    }

    /// Return a vector of TCs due at `current_time_s`, `None` if no TCs need
    /// executing yet, or `EndOfScript` once every TC has been returned.
    pub fn get_pending_tcs_at(&mut self, current_time_s: f64) -> PendingTcs {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript
        }

        let mut tc_vec: Vec<Tc> = vec![];

        // Pop items from the queue while the head's exec time has passed.
        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break;
            }
            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        // If the vector is longer than 0 return Some, otherwise None
        if !tc_vec.is_empty() {
            PendingTcs::Some(tc_vec)
        }
        else {
            PendingTcs::None
        }
    }

    /// Get the number of TCs in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::PhaseEvent;

    const SCRIPT: &str = r#"
        0.0: {"type": "PHASE", "payload": "INITIALIZE"};
        0.5: {"type": "PHASE", "payload": "AUTONOMOUS"};
        15.5: {"type": "PHASE", "payload": "OPCONTROL"};
        15.5: {"type": "INPUT", "payload": {"left_y": 127, "right_y": 127}};
    "#;

    #[test]
    fn test_pending_tcs() {
        let mut si = ScriptInterpreter::from_script(SCRIPT).unwrap();

        assert_eq!(si.get_num_tcs(), 4);
        assert_eq!(si.get_duration(), 15.5);

        assert_eq!(
            si.get_pending_tcs_at(0.1),
            PendingTcs::Some(vec![Tc::Phase(PhaseEvent::Initialize)])
        );
        assert_eq!(si.get_pending_tcs_at(0.2), PendingTcs::None);

        match si.get_pending_tcs_at(20.0) {
            PendingTcs::Some(v) => {
                assert_eq!(v.len(), 3);
                assert_eq!(v[1], Tc::Phase(PhaseEvent::Opcontrol));
            },
            p => panic!("Expected pending TCs, got {:?}", p)
        }

        assert_eq!(si.get_pending_tcs_at(21.0), PendingTcs::EndOfScript);
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::from_script("no commands here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_script(r#"1.0: {"type": "BOGUS"};"#),
            Err(ScriptError::InvalidTc(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::from_script(
                "2.0: {\"type\": \"DISCONNECT\"};\n1.0: {\"type\": \"DISCONNECT\"};"
            ),
            Err(ScriptError::OutOfOrder(_, _))
        ));

        // Malformed times are errors, not skipped lines
        let bad_times = [
            "2,5: {\"type\": \"PHASE\", \"payload\": \"DISABLE\"};",
            "-3: {\"type\": \"DISCONNECT\"};",
            "1.0.2: {\"type\": \"DISCONNECT\"};",
            "inf: {\"type\": \"DISCONNECT\"};",
        ];
        for line in bad_times.iter() {
            let script = format!("1.0: {{\"type\": \"DISCONNECT\"}};\n{}", line);
            assert!(
                matches!(
                    ScriptInterpreter::from_script(&script),
                    Err(ScriptError::InvalidTimestamp(_))
                ),
                "accepted {}",
                line
            );
        }
    }
}
