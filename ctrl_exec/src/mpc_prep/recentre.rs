//! Local re-centering of the reference path
//!
//! Where the path ahead of the robot is straight and aligned with the map X axis (such as along a
//! row) the point cloud around that section is cropped, and the section is moved onto the centroid
//! of the cropped points in Y and Z.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Point3;

// Internal
use super::{
    nearest_state_index,
    viz::{cloud_markers, publish_traj_states, MarkerSink, CROPPED_CLOUD_NS, READJUSTED_NS},
    RecentreParams, State,
};
use comms_if::{
    eqpt::perloc::{NavPath, PointCloud, PoseStamped},
    viz::ColorRgba,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Outcome of attempting to re-centre the path.
#[derive(Debug, Clone, PartialEq)]
pub enum Recentring {
    /// The section ahead of the robot was re-centred.
    Applied {
        /// A copy of the input path with the section moved
        trajectory: NavPath,

        /// The moved section as states
        states: Vec<State>,

        /// The points the section was centred on
        cropped_cloud: PointCloud,
    },

    /// The path was left as it was.
    Skipped(SkipReason),
}

/// Why the path was not re-centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The path has no poses
    EmptyTrajectory,

    /// The robot pose contains a NaN or infinite value
    InvalidPose,

    /// Some pose in the section ahead is not aligned with the X axis
    NotStraight,

    /// There are no points around the section ahead
    EmptyCrop,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Re-centre the section of the path ahead of the robot on the surrounding point cloud.
///
/// The section runs from the pose nearest the robot to `params.look_ahead_waypoints` poses past
/// it. The input path is not modified, a re-centred copy is returned in `Recentring::Applied`.
/// The re-centred section is published to the sink as yellow arrows.
pub fn readjust_global_plan_locally(
    path: &NavPath,
    robot_pose: &PoseStamped,
    cloud: &PointCloud,
    params: &RecentreParams,
    sink: &mut dyn MarkerSink,
) -> Recentring {
    if !robot_pose.is_finite() {
        return Recentring::Skipped(SkipReason::InvalidPose);
    }

    let nearest = match nearest_state_index(path, robot_pose) {
        Some(i) => i,
        None => return Recentring::Skipped(SkipReason::EmptyTrajectory),
    };
    let goal = nearest
        .saturating_add(params.look_ahead_waypoints)
        .min(path.len() - 1);

    let section = &path.poses[nearest..=goal];

    // Compare against the X axis in either direction. `%` on floats keeps the sign of the
    // dividend, the same as C's fmod.
    let threshold = params.straightness_threshold_rad;
    if section
        .iter()
        .any(|p| (p.yaw() % std::f64::consts::PI).abs() > threshold)
    {
        debug!("Path section {} to {} is not straight", nearest, goal);
        return Recentring::Skipped(SkipReason::NotStraight);
    }

    let near_pos = path.poses[nearest].position_m;
    let goal_pos = path.poses[goal].position_m;

    // The section runs from the nearest pose to the goal in the direction the robot faces
    let (from, to) = if robot_pose.yaw().abs() < threshold {
        (near_pos, goal_pos)
    } else {
        (goal_pos, near_pos)
    };
    let min = Point3::new(
        from.x,
        from.y - params.inflate_y_m,
        from.z - params.inflate_z_m,
    );
    let max = Point3::new(to.x, to.y + params.inflate_y_m, to.z + params.inflate_z_m);

    let cropped_cloud = cloud.crop_box(&min, &max);
    let centroid = match cropped_cloud.centroid() {
        Some(c) => c,
        None => {
            debug!(
                "No points between {:?} and {:?}, path not re-centred",
                min, max
            );
            return Recentring::Skipped(SkipReason::EmptyCrop);
        }
    };

    let mut trajectory = path.clone();
    let mut states = Vec::with_capacity(goal - nearest + 1);

    for pose in trajectory.poses[nearest..=goal].iter_mut() {
        pose.position_m.y = centroid.y;
        pose.position_m.z = centroid.z;

        states.push(State {
            x: pose.position_m.x,
            y: pose.position_m.y,
            z: pose.position_m.z,
            psi: pose.yaw(),
            v: 0.0,
        });
    }

    publish_traj_states(sink, &states, ColorRgba::yellow(), READJUSTED_NS);
    sink.publish(cloud_markers(
        &cropped_cloud,
        ColorRgba::yellow(),
        CROPPED_CLOUD_NS,
    ));

    info!(
        "Re-centred {} poses (indices {} to {}) on ({:.3}, {:.3})",
        states.len(),
        nearest,
        goal,
        centroid.y,
        centroid.z
    );

    Recentring::Applied {
        trajectory,
        states,
        cropped_cloud,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc_prep::viz::BufferSink;

    fn row_path(n: usize, yaw: f64) -> NavPath {
        NavPath::new(
            (0..n)
                .map(|i| PoseStamped::from_xyz_yaw(i as f64, 0.0, 0.0, yaw))
                .collect(),
        )
    }

    fn row_cloud() -> PointCloud {
        // Points either side of a row centred at y = 0.1, z = 0.05
        let mut points = Vec::new();
        for i in 0..20 {
            let x = i as f64 * 0.5;
            points.push(Point3::new(x, 0.0, 0.0));
            points.push(Point3::new(x, 0.2, 0.1));
        }
        // Far away clutter which must be cropped out
        points.push(Point3::new(3.0, 5.0, 0.0));
        PointCloud::new(points)
    }

    fn params() -> RecentreParams {
        RecentreParams {
            enabled: true,
            look_ahead_waypoints: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_recentre_applied() {
        let path = row_path(10, 0.0);
        let original = path.clone();
        let robot = PoseStamped::from_xyz_yaw(1.1, 0.0, 0.0, 0.0);
        let mut sink = BufferSink::default();

        match readjust_global_plan_locally(&path, &robot, &row_cloud(), &params(), &mut sink) {
            Recentring::Applied {
                trajectory,
                states,
                cropped_cloud,
            } => {
                // Section is poses 1 to 5
                assert_eq!(states.len(), 5);
                assert!(cropped_cloud.points.iter().all(|p| p.y < 1.0));

                for (i, pose) in trajectory.poses.iter().enumerate() {
                    if (1..=5).contains(&i) {
                        assert!((pose.position_m.y - 0.1).abs() < 1e-9);
                        assert!((pose.position_m.z - 0.05).abs() < 1e-9);
                    } else {
                        assert_eq!(pose.position_m.y, 0.0);
                    }
                    // X and orientation are untouched
                    assert_eq!(pose.position_m.x, i as f64);
                    assert_eq!(pose.attitude_q, original.poses[i].attitude_q);
                }

                assert_eq!(states[0].x, 1.0);
                assert!((states[0].y - 0.1).abs() < 1e-9);
            }
            r => panic!("Expected re-centring to be applied, got {:?}", r),
        }

        // Input is never modified
        assert_eq!(path, original);

        // The section then the points it was centred on
        assert_eq!(sink.published.len(), 2);
        let markers = &sink.published[0];
        assert_eq!(markers.len(), 5);
        assert!(markers.markers.iter().all(|m| m.ns == READJUSTED_NS));
        assert_eq!(markers.markers[0].color, ColorRgba::yellow());

        let cloud_arr = &sink.published[1];
        assert!(!cloud_arr.is_empty());
        assert!(cloud_arr.markers.iter().all(|m| m.ns == CROPPED_CLOUD_NS));
        assert!(cloud_arr.markers.iter().all(|m| m.position_m.y < 1.0));
    }

    #[test]
    fn test_recentre_not_straight() {
        let mut path = row_path(10, 0.0);
        path.poses[3] = PoseStamped::from_xyz_yaw(3.0, 0.0, 0.0, 0.8);
        let robot = PoseStamped::from_xyz_yaw(1.0, 0.0, 0.0, 0.0);
        let mut sink = BufferSink::default();

        assert_eq!(
            readjust_global_plan_locally(&path, &robot, &row_cloud(), &params(), &mut sink),
            Recentring::Skipped(SkipReason::NotStraight)
        );
        assert!(sink.published.is_empty());

        // A bend outside the section doesn't matter
        let robot = PoseStamped::from_xyz_yaw(4.0, 0.0, 0.0, 0.0);
        let params = RecentreParams {
            look_ahead_waypoints: 2,
            ..params()
        };
        match readjust_global_plan_locally(&path, &robot, &row_cloud(), &params, &mut sink) {
            Recentring::Applied { .. } => (),
            r => panic!("Expected re-centring to be applied, got {:?}", r),
        }
    }

    #[test]
    fn test_recentre_empty_crop() {
        let path = row_path(10, 0.0);
        let robot = PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0);
        let cloud = PointCloud::new(vec![Point3::new(50.0, 50.0, 50.0)]);
        let mut sink = BufferSink::default();

        assert_eq!(
            readjust_global_plan_locally(&path, &robot, &cloud, &params(), &mut sink),
            Recentring::Skipped(SkipReason::EmptyCrop)
        );

        // Robot facing away from +X reverses the box, which is then empty for a path running
        // along +X
        let robot = PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 3.0);
        assert_eq!(
            readjust_global_plan_locally(&path, &robot, &row_cloud(), &params(), &mut sink),
            Recentring::Skipped(SkipReason::EmptyCrop)
        );

        assert_eq!(
            readjust_global_plan_locally(
                &NavPath::new(vec![]),
                &robot,
                &row_cloud(),
                &params(),
                &mut sink
            ),
            Recentring::Skipped(SkipReason::EmptyTrajectory)
        );
        assert!(sink.published.is_empty());
    }

    #[test]
    fn test_recentre_nan_pose() {
        let path = row_path(10, 0.0);
        let robot = PoseStamped::from_xyz_yaw(std::f64::NAN, 0.0, 0.0, 0.0);
        let mut sink = BufferSink::default();

        assert_eq!(
            readjust_global_plan_locally(&path, &robot, &row_cloud(), &params(), &mut sink),
            Recentring::Skipped(SkipReason::InvalidPose)
        );
        assert!(sink.published.is_empty());
    }
}
