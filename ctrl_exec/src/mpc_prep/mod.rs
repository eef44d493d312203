//! # MPC Preprocessing
//!
//! Prepares the inputs of the model predictive controller each control cycle. The global reference
//! path is cut down to a short, evenly spaced horizon of reference states starting at the robot,
//! and the tracked obstacles are reduced (or padded) to the fixed number the optimiser expects.
//!
//! Optionally the reference path is re-centred on the local point cloud where it is straight,
//! which corrects for drift between the map the path was planned in and the robot's surroundings.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod horizon;
pub mod interp;
mod locator;
mod model;
mod obstacle;
mod params;
mod recentre;
mod state;
pub mod viz;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use horizon::*;
pub use locator::*;
pub use model::*;
pub use obstacle::*;
pub use params::*;
pub use recentre::*;
pub use state::*;

use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MPC preprocessing.
#[derive(Debug, thiserror::Error)]
pub enum MpcPrepError {
    #[error("Could not load the MpcPrep parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid MPC parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("Could not initialise the MpcPrep archives: {0}")]
    ArchiveError(ArchiveError),

    #[error("The reference path is empty")]
    EmptyTrajectory,

    #[error("The robot pose contains a NaN or infinite value")]
    InvalidPose,

    #[error("The reference path must contain at least 2 poses, found {0}")]
    TrajectoryTooShort(usize),

    #[error("The look ahead distance must be finite, found {0}")]
    InvalidLookAhead(f64),

    #[error("Interpolator returned the wrong number of points (expected {0}, found {1})")]
    InterpolationCountMismatch(usize, usize),

    #[error("There is no robot pose and no previous horizon to fall back on")]
    NoPoseOrHorizon,
}
