//! Utility library for the robot control software
//!
//! Logging, parameter files, sessions and archives, the event script
//! interpreter and a few maths helpers shared by the executables.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod script_interpreter;
pub mod time;

// ---------------------------------------------------------------------------
// MACROS
// ---------------------------------------------------------------------------

/// Log an error and panic.
///
/// Only for states the program cannot continue from, such as reading the
/// session clock before a session exists. Anything a caller could recover
/// from is returned as a `Result` instead.
#[macro_export]
macro_rules! raise_error {
    () => ({
        log::error!("Unrecoverable error raised");
        std::panic!("Unrecoverable error");
    });
    ($msg:expr) => ({
        log::error!("{}", $msg);
        std::panic!("Unrecoverable error: {}", $msg);
    });
    ($fmt:expr, $($arg:tt)+) => ({
        let msg = std::format!($fmt, $($arg)+);
        log::error!("{}", msg);
        std::panic!("Unrecoverable error: {}", msg);
    });
}

#[cfg(test)]
mod test {
    #[test]
    #[should_panic(expected = "Unrecoverable error: port 22 out of range")]
    fn test_raise_error_panics() {
        crate::raise_error!("port {} out of range", 22);
    }
}
