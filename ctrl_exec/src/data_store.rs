//! # Data Store

use std::sync::Arc;

use log::info;

use comms_if::eqpt::perloc::NavPath;

use crate::mpc_prep::{self, VelocityCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    // Reference path
    /// The reference path currently being followed. Re-centering replaces the whole path.
    pub reference_path: Option<Arc<NavPath>>,

    /// Number of times the reference path has been re-centred
    pub num_recentrings: u64,

    // MpcPrep
    pub mpc_prep: mpc_prep::MpcPrep,
    pub mpc_prep_input: mpc_prep::InputData,
    pub mpc_prep_output: mpc_prep::OutputData,
    pub mpc_prep_status_rpt: mpc_prep::StatusReport,

    // Velocity regulation
    /// The velocity demanded this cycle, after regulation
    pub velocity_cmd: Option<VelocityCmd>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive cycles on which MpcPrep failed
    pub num_consec_mpc_prep_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.mpc_prep_input = mpc_prep::InputData::default();
        self.mpc_prep_output = mpc_prep::OutputData::default();
        self.mpc_prep_status_rpt = mpc_prep::StatusReport::default();
        self.velocity_cmd = None;
    }

    /// Replace the reference path with a new one.
    ///
    /// Anything still holding the previous path keeps it unchanged.
    pub fn swap_reference_path(&mut self, path: Arc<NavPath>) {
        if self.reference_path.is_some() {
            self.num_recentrings += 1;
            info!(
                "Reference path replaced ({} replacements so far)",
                self.num_recentrings
            );
        }

        self.reference_path = Some(path);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::perloc::PoseStamped;

    #[test]
    fn test_swap_reference_path() {
        let mut ds = DataStore::default();

        let first = Arc::new(NavPath::new(vec![PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0)]));
        ds.swap_reference_path(first.clone());
        assert_eq!(ds.num_recentrings, 0);

        // A reader holding the old snapshot is unaffected by the swap
        let reader = ds.reference_path.clone().unwrap();
        let second = Arc::new(NavPath::new(vec![PoseStamped::from_xyz_yaw(0.0, 1.0, 0.0, 0.0)]));
        ds.swap_reference_path(second);

        assert_eq!(ds.num_recentrings, 1);
        assert_eq!(reader.poses[0].position_m.y, 0.0);
        assert_eq!(ds.reference_path.as_ref().unwrap().poses[0].position_m.y, 1.0);
        assert!(Arc::ptr_eq(&reader, &first));
    }
}
