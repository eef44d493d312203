//! # Control Executable Parameters
//!
//! This module provides parameters for the control executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtrlExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Stop after this many cycles. If not set the executable runs until the scenario ends.
    #[serde(default)]
    pub max_cycles: Option<u64>,

    /// Scenario replayed when none is given on the command line, relative to the software root
    pub default_scenario: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum CtrlExecParamsError {
    #[error("The cycle period must be a positive number of seconds, found {0}")]
    InvalidCyclePeriod(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CtrlExecParams {
    /// Check the parameters can be used to run the main loop.
    pub fn validate(&self) -> Result<(), CtrlExecParamsError> {
        if !(self.cycle_period_s > 0.0 && self.cycle_period_s.is_finite()) {
            return Err(CtrlExecParamsError::InvalidCyclePeriod(self.cycle_period_s));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
