//! # Scenario
//!
//! A scenario is a recording of the inputs to the controller: the reference path and, for each
//! control cycle, the robot's pose, tracked objects, the point cloud and the commanded velocity.
//! Scenarios are stored as JSON.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{convert::TryFrom, fs::read_to_string, path::Path};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::mpc_prep::VelocityCmd;
use comms_if::eqpt::perloc::{CloudFrame, NavPath, Object, PointCloud, PoseStamped};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// The global reference path
    pub reference_path: NavPath,

    /// Inputs for each cycle, in order
    pub frames: Vec<ScenarioFrame>,
}

/// Inputs for a single control cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScenarioFrame {
    #[serde(default)]
    pub robot_pose: Option<PoseStamped>,

    #[serde(default)]
    pub objects: Vec<Object>,

    #[serde(default)]
    pub cloud: Option<CloudFrame>,

    /// Velocity demanded of the robot during this cycle
    #[serde(default)]
    pub velocity_cmd: Option<VelocityCmd>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Could not read the scenario file: {0}")]
    FileError(std::io::Error),

    #[error("Could not parse the scenario: {0}")]
    ParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let s = read_to_string(path).map_err(ScenarioError::FileError)?;

        Self::from_str(&s)
    }

    /// Parse a scenario from a JSON string.
    pub fn from_str(s: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(s).map_err(ScenarioError::ParseError)
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

impl ScenarioFrame {
    /// Decode the frame's point cloud.
    ///
    /// A cloud which cannot be decoded is dropped with a warning, as if none had been received.
    pub fn decode_cloud(&self) -> Option<PointCloud> {
        let frame = self.cloud.clone()?;

        match PointCloud::try_from(frame) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Could not decode scenario point cloud: {}", e);
                None
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
