//! Implementations for the MpcPrep state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{
    ellipsoids_from_objects, get_local_interpolated_reference_states, goal_index,
    interp::{interpolator_from_params, PathInterpolator},
    is_ghost,
    nearest_state_index, readjust_global_plan_locally, trim_obstacles_to_n,
    viz::{traj_states_markers, BufferSink, HORIZON_NS},
    Ellipsoid, MpcPrepError, MpcPrepParams, Recentring, SkipReason, State,
};
use comms_if::{
    eqpt::perloc::{NavPath, Object, PointCloud, PoseStamped},
    viz::{ColorRgba, MarkerArray},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State as ModuleState,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// MPC preprocessing module state
#[derive(Default)]
pub struct MpcPrep {
    params: MpcPrepParams,

    interpolator: Option<Box<dyn PathInterpolator>>,

    /// The last horizon built from valid inputs
    last_horizon: Option<Vec<State>>,

    report: StatusReport,
    arch_report: Archiver,
}

/// Input data to MpcPrep.
#[derive(Default, Clone)]
pub struct InputData {
    /// Current pose of the robot, or `None` if localisation isn't available
    pub robot_pose: Option<PoseStamped>,

    /// The global reference path
    pub reference_path: Option<Arc<NavPath>>,

    /// All objects currently tracked by perception
    pub objects: Vec<Object>,

    /// The live point cloud, used for re-centering
    pub cloud: Option<PointCloud>,
}

/// Output of MpcPrep, ready for the optimiser.
#[derive(Debug, Clone, Default)]
pub struct OutputData {
    /// Reference states for the horizon, always `horizon_len` long
    pub horizon: Vec<State>,

    /// The closest objects, always `max_obstacles` long
    pub obstacles: Vec<Object>,

    /// `obstacles` in the ellipsoid model
    pub ellipsoids: Vec<Ellipsoid>,

    /// The re-centred reference path, which replaces the current one, if re-centering was
    /// applied.
    pub recentred_path: Option<Arc<NavPath>>,

    /// Markers to be published
    pub markers: Vec<MarkerArray>,
}

/// Status report for MpcPrep processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Index of the path pose nearest the robot
    pub nearest_index: Option<usize>,

    /// Index of the path pose at the end of the horizon
    pub goal_index: Option<usize>,

    /// The horizon could not be built so the last good one was used
    pub horizon_fallback: bool,

    /// The horizon could not be built and there was no previous one, so the robot's current pose
    /// was held
    pub horizon_stationary: bool,

    /// Number of objects being tracked by perception
    pub num_objects_observed: usize,

    /// Number of ghosts added to the obstacles
    pub num_ghosts: usize,

    pub recentre: RecentreStatus,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What happened to the reference path during re-centering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecentreStatus {
    Disabled,
    MissingInput,
    Applied,
    EmptyTrajectory,
    InvalidPose,
    NotStraight,
    EmptyCrop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RecentreStatus {
    fn default() -> Self {
        RecentreStatus::Disabled
    }
}

impl From<SkipReason> for RecentreStatus {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::EmptyTrajectory => RecentreStatus::EmptyTrajectory,
            SkipReason::InvalidPose => RecentreStatus::InvalidPose,
            SkipReason::NotStraight => RecentreStatus::NotStraight,
            SkipReason::EmptyCrop => RecentreStatus::EmptyCrop,
        }
    }
}

impl MpcPrep {
    /// Create a new instance from parameters, without archiving.
    pub fn from_params(params: MpcPrepParams) -> Result<Self, MpcPrepError> {
        params
            .mpc
            .validate()
            .map_err(MpcPrepError::InvalidParams)?;

        if !params.look_ahead_distance_m.is_finite() {
            return Err(MpcPrepError::InvalidLookAhead(
                params.look_ahead_distance_m,
            ));
        }

        Ok(Self {
            interpolator: Some(interpolator_from_params(params.interp, &params.mpc)),
            params,
            ..Default::default()
        })
    }

    pub fn params(&self) -> &MpcPrepParams {
        &self.params
    }

    /// Build the horizon, falling back on the last good horizon or the robot's pose.
    ///
    /// `robot_pose` must already have had any non-finite pose removed.
    fn build_horizon(
        &mut self,
        robot_pose: Option<PoseStamped>,
        input_data: &InputData,
    ) -> Result<Vec<State>, MpcPrepError> {
        let mpc = &self.params.mpc;

        let built = match (
            &robot_pose,
            &input_data.reference_path,
            &self.interpolator,
        ) {
            (Some(pose), Some(path), Some(interp)) => {
                let nearest = nearest_state_index(path, pose);
                self.report.nearest_index = nearest;
                self.report.goal_index =
                    nearest.map(|n| goal_index(path, n, self.params.look_ahead_distance_m));

                get_local_interpolated_reference_states(
                    pose,
                    mpc,
                    path,
                    self.params.look_ahead_distance_m,
                    interp.as_ref(),
                )
            }
            (None, _, _) => Err(MpcPrepError::NoPoseOrHorizon),
            (_, None, _) => Err(MpcPrepError::EmptyTrajectory),
            (_, _, None) => Err(MpcPrepError::InvalidParams(
                super::ParamsError::NotConfigured,
            )),
        };

        match built {
            Ok(horizon) => {
                self.last_horizon = Some(horizon.clone());
                Ok(horizon)
            }
            Err(e) => {
                if let Some(ref last) = self.last_horizon {
                    warn!("Could not build horizon ({}), using last good horizon", e);
                    self.report.horizon_fallback = true;
                    return Ok(last.clone());
                }

                match robot_pose {
                    Some(pose) => {
                        warn!(
                            "Could not build horizon ({}) and there is no previous horizon, \
                            holding current pose",
                            e
                        );
                        self.report.horizon_stationary = true;
                        Ok(vec![
                            State {
                                x: pose.position_m.x,
                                y: pose.position_m.y,
                                z: 0.0,
                                psi: pose.yaw(),
                                v: 0.0,
                            };
                            mpc.horizon_len
                        ])
                    }
                    None => Err(MpcPrepError::NoPoseOrHorizon),
                }
            }
        }
    }
}

impl ModuleState for MpcPrep {
    type InitData = &'static str;
    type InitError = MpcPrepError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MpcPrepError;

    /// Initialise the MpcPrep module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: MpcPrepParams = params::load(init_data).map_err(MpcPrepError::ParamLoadError)?;

        *self = Self::from_params(params)?;

        self.arch_report = Archiver::from_path(session, "mpc_prep/status_report.csv")
            .map_err(MpcPrepError::ArchiveError)?;

        Ok(())
    }

    /// Perform cyclic processing of MpcPrep.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let mut output = OutputData::default();

        // A pose with NaNs in it is no better than no pose at all
        let robot_pose = input_data.robot_pose.filter(PoseStamped::is_finite);
        if input_data.robot_pose.is_some() && robot_pose.is_none() {
            warn!(
                "Robot pose {:?} is not finite, treating it as missing",
                input_data.robot_pose
            );
        }

        output.horizon = self.build_horizon(robot_pose, input_data)?;

        // Obstacles, all ghosts if we don't know where the robot is
        let n_obs = self.params.mpc.max_obstacles;
        self.report.num_objects_observed = input_data.objects.len();
        output.obstacles = match robot_pose {
            Some(ref pose) => trim_obstacles_to_n(&input_data.objects, pose, n_obs),
            None => trim_obstacles_to_n(&[], &PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0), n_obs),
        };
        self.report.num_ghosts = output.obstacles.iter().filter(|o| is_ghost(o)).count();
        output.ellipsoids = match robot_pose {
            Some(ref pose) => ellipsoids_from_objects(&output.obstacles, pose),
            None => vec![Ellipsoid::default(); n_obs],
        };

        // Re-centering, the new path is used from the next cycle
        if self.params.recentre.enabled {
            self.report.recentre = match (
                &input_data.reference_path,
                &input_data.robot_pose,
                &input_data.cloud,
            ) {
                (Some(path), Some(pose), Some(cloud)) => {
                    let mut sink = BufferSink::default();
                    let status = match readjust_global_plan_locally(
                        path,
                        pose,
                        cloud,
                        &self.params.recentre,
                        &mut sink,
                    ) {
                        Recentring::Applied { trajectory, .. } => {
                            output.recentred_path = Some(Arc::new(trajectory));
                            RecentreStatus::Applied
                        }
                        Recentring::Skipped(reason) => reason.into(),
                    };
                    output.markers.append(&mut sink.published);
                    status
                }
                _ => RecentreStatus::MissingInput,
            };
        }

        if self.params.mpc.debug_mode {
            output.markers.push(traj_states_markers(
                &output.horizon,
                ColorRgba::green(),
                HORIZON_NS,
            ));
        }

        trace!("MpcPrep output horizon: {:?}", output.horizon);
        debug!("MpcPrep status: {:?}", self.report);

        Ok((output, self.report))
    }
}

impl Archived for MpcPrep {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if self.arch_report.is_init() {
            self.arch_report.serialise(self.report)?;
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc_prep::{viz::CROPPED_CLOUD_NS, InterpKind, MpcParams, RecentreParams};
    use nalgebra::{Point3, UnitQuaternion};
    use comms_if::eqpt::perloc::SolidPrimitive;

    fn prep(recentre: bool) -> MpcPrep {
        MpcPrep::from_params(MpcPrepParams {
            look_ahead_distance_m: 2.0,
            interp: InterpKind::Dubins,
            mpc: MpcParams {
                horizon_len: 3,
                max_obstacles: 2,
                params_configured: true,
                ..Default::default()
            },
            recentre: RecentreParams {
                enabled: recentre,
                look_ahead_waypoints: 3,
                ..Default::default()
            },
        })
        .unwrap()
    }

    fn input() -> InputData {
        let path = NavPath::new(
            (0..5)
                .map(|i| PoseStamped::from_xyz_yaw(i as f64, 0.0, 0.0, 0.0))
                .collect(),
        );

        InputData {
            robot_pose: Some(PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0)),
            reference_path: Some(Arc::new(path)),
            objects: vec![Object {
                id: 4,
                position_m: Point3::new(1.0, 1.0, 0.0),
                attitude_q: UnitQuaternion::identity(),
                shape: SolidPrimitive::new_box(0.4, 0.4, 0.4),
                is_dynamic: false,
            }],
            cloud: Some(PointCloud::new(vec![
                Point3::new(0.5, 0.2, 0.0),
                Point3::new(1.5, 0.2, 0.2),
            ])),
        }
    }

    #[test]
    fn test_unconfigured() {
        match MpcPrep::from_params(MpcPrepParams::default()) {
            Err(MpcPrepError::InvalidParams(_)) => (),
            Err(e) => panic!("Expected InvalidParams, got {:?}", e),
            Ok(_) => panic!("Expected InvalidParams"),
        }
    }

    #[test]
    fn test_proc() {
        let mut prep = prep(false);
        let (output, report) = prep.proc(&input()).unwrap();

        assert_eq!(output.horizon.len(), 3);
        assert!((output.horizon[2].x - 2.0).abs() < 1e-6);
        assert_eq!(report.nearest_index, Some(0));
        assert_eq!(report.goal_index, Some(2));
        assert!(!report.horizon_fallback && !report.horizon_stationary);

        assert_eq!(output.obstacles.len(), 2);
        assert_eq!(output.obstacles[0].id, 4);
        assert!(is_ghost(&output.obstacles[1]));
        assert_eq!(output.ellipsoids.len(), 2);
        assert_eq!(output.ellipsoids[1], Ellipsoid::default());
        assert_eq!(report.num_ghosts, 1);

        assert_eq!(report.recentre, RecentreStatus::Disabled);
        assert!(output.recentred_path.is_none());

        // Debug mode is on by default so the horizon is drawn
        assert_eq!(output.markers.len(), 1);
        assert_eq!(output.markers[0].markers[0].ns, HORIZON_NS);

        prep.write().unwrap();
    }

    #[test]
    fn test_fallback() {
        let mut prep = prep(false);

        // Nothing to go on at all
        let mut no_data = input();
        no_data.robot_pose = None;
        no_data.reference_path = None;
        match prep.proc(&no_data) {
            Err(MpcPrepError::NoPoseOrHorizon) => (),
            r => panic!("Expected NoPoseOrHorizon, got {:?}", r.map(|(_, r)| r)),
        }

        // Pose but no path holds the pose
        let mut no_path = input();
        no_path.reference_path = None;
        no_path.robot_pose = Some(PoseStamped::from_xyz_yaw(3.0, 1.0, 0.0, 0.2));
        let (output, report) = prep.proc(&no_path).unwrap();
        assert!(report.horizon_stationary);
        assert_eq!(output.horizon.len(), 3);
        assert!(output
            .horizon
            .iter()
            .all(|s| s.x == 3.0 && s.y == 1.0 && s.v == 0.0));

        // Once a horizon has been built it is reused
        let (good, _) = prep.proc(&input()).unwrap();
        let mut short_path = input();
        short_path.reference_path = Some(Arc::new(NavPath::new(vec![
            PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0),
        ])));
        let (output, report) = prep.proc(&short_path).unwrap();
        assert!(report.horizon_fallback);
        assert_eq!(output.horizon, good.horizon);

        // Without a pose the tracked object can't be placed so every obstacle is a ghost
        let (output, report) = prep.proc(&no_data).unwrap();
        assert!(report.horizon_fallback);
        assert_eq!(output.horizon, good.horizon);
        assert!(output.obstacles.iter().all(is_ghost));
        assert_eq!(report.num_objects_observed, 1);
        assert_eq!(report.num_ghosts, 2);
    }

    #[test]
    fn test_nan_pose() {
        let mut nan_pose = input();
        nan_pose.robot_pose = Some(PoseStamped::from_xyz_yaw(std::f64::NAN, 0.0, 0.0, 0.0));

        // Nothing to fall back on yet
        let mut prep = prep(false);
        match prep.proc(&nan_pose) {
            Err(MpcPrepError::NoPoseOrHorizon) => (),
            r => panic!("Expected NoPoseOrHorizon, got {:?}", r.map(|(_, r)| r)),
        }

        let (good, _) = prep.proc(&input()).unwrap();

        let (output, report) = prep.proc(&nan_pose).unwrap();
        assert!(report.horizon_fallback);
        assert_eq!(output.horizon, good.horizon);
        assert!(output
            .horizon
            .iter()
            .all(|s| s.x.is_finite() && s.y.is_finite() && s.psi.is_finite()));
        assert!(output.obstacles.iter().all(is_ghost));
        assert_eq!(report.num_ghosts, 2);
        assert_eq!(output.ellipsoids, vec![Ellipsoid::default(); 2]);

        // Re-centring reports the bad pose rather than a missing one
        let mut recentring = self::prep(true);
        recentring.proc(&input()).unwrap();
        let (output, report) = recentring.proc(&nan_pose).unwrap();
        assert_eq!(report.recentre, RecentreStatus::InvalidPose);
        assert!(output.recentred_path.is_none());
    }

    #[test]
    fn test_recentre() {
        let mut prep = prep(true);
        let input_data = input();

        let (output, report) = prep.proc(&input_data).unwrap();
        assert_eq!(report.recentre, RecentreStatus::Applied);

        let path = output.recentred_path.unwrap();
        assert!((path.poses[0].position_m.y - 0.2).abs() < 1e-9);
        assert!((path.poses[3].position_m.z - 0.1).abs() < 1e-9);
        assert_eq!(path.poses[4].position_m.y, 0.0);

        // The held path is untouched
        let held = input_data.reference_path.unwrap();
        assert_eq!(held.poses[0].position_m.y, 0.0);

        // Re-centred segment, the cropped cloud and the horizon
        assert_eq!(output.markers.len(), 3);
        assert_eq!(output.markers[1].markers[0].ns, CROPPED_CLOUD_NS);

        let mut no_cloud = input();
        no_cloud.cloud = None;
        let (_, report) = prep.proc(&no_cloud).unwrap();
        assert_eq!(report.recentre, RecentreStatus::MissingInput);
    }
}
