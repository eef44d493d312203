//! Cyclic module interface
//!
//! Every processing stage run by the control loop is a module: it is initialised once from a
//! parameter file and then processed once per control cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state, persisting between cycles.
pub trait State {
    /// Data required during initialisation, usually the parameter file name
    type InitData;
    type InitError;

    /// Inputs gathered for one cycle
    type InputData;
    /// Results of one cycle
    type OutputData;
    /// Summary of what happened during the cycle, suitable for archiving
    type StatusReport;
    type ProcError;

    /// Initialise the module, creating any archives it keeps in the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one control cycle.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
