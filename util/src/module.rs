//! Module interfaces
//!
//! Modules of `robot_exec` which are stepped once per control tick (such as
//! the teleop controller) implement [`State`], so that they are initialised
//! from their parameter file and processed the same way.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A module stepped once per tick.
pub trait State {
    /// Data needed to initialise the module, usually its parameter file.
    type InitData;
    type InitError;

    /// Data sampled at the start of each tick.
    type InputData;
    /// Commands produced by a tick.
    type OutputData;
    /// What happened during a tick, for logging and archiving.
    type StatusReport;
    type ProcError;

    /// Initialise the module, replacing any previous configuration.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Process one tick.
    ///
    /// Returns the commands to apply and the status report of the tick.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
