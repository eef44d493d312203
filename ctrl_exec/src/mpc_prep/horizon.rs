//! Construction of the local reference horizon

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{
    interp::{ControlPoint, PathInterpolator},
    nearest_state_index, MpcParams, MpcPrepError, State,
};
use comms_if::eqpt::perloc::{NavPath, PoseStamped};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the reference states for the next horizon.
///
/// A short path is interpolated from the robot (or the nearest pose on the path, if the goal is
/// far enough away) to the goal pose lying `look_ahead_distance_m` further along the path. This is
/// then resampled into exactly `params.horizon_len` states, all with the maximum velocity.
///
/// # Errors
/// - The parameters are not valid
/// - The path has fewer than 2 poses
/// - The look ahead distance is not finite
/// - The robot pose is not finite
/// - The interpolator did not return the requested number of points
pub fn get_local_interpolated_reference_states(
    robot_pose: &PoseStamped,
    params: &MpcParams,
    path: &NavPath,
    look_ahead_distance_m: f64,
    interpolator: &dyn PathInterpolator,
) -> Result<Vec<State>, MpcPrepError> {
    params.validate().map_err(MpcPrepError::InvalidParams)?;

    if path.len() < 2 {
        return Err(MpcPrepError::TrajectoryTooShort(path.len()));
    }

    if !look_ahead_distance_m.is_finite() {
        return Err(MpcPrepError::InvalidLookAhead(look_ahead_distance_m));
    }

    if !robot_pose.is_finite() {
        return Err(MpcPrepError::InvalidPose);
    }

    let nearest = nearest_state_index(path, robot_pose).ok_or(MpcPrepError::EmptyTrajectory)?;
    let goal = goal_index(path, nearest, look_ahead_distance_m);

    // Close to the goal the horizon starts from the robot itself, otherwise the robot may be
    // pulled back onto the path
    let start = if goal - nearest < params.horizon_len {
        ControlPoint::from_pose(robot_pose)
    } else {
        ControlPoint::from_pose(&path.poses[nearest])
    };
    let end = ControlPoint::from_pose(&path.poses[goal]);

    trace!(
        "Horizon from index {} to {}, control points {:?} -> {:?}",
        nearest,
        goal,
        start,
        end
    );

    let points = interpolator.interpolate(&[start, end], params.horizon_len);

    if points.len() != params.horizon_len {
        return Err(MpcPrepError::InterpolationCountMismatch(
            params.horizon_len,
            points.len(),
        ));
    }

    Ok(points
        .iter()
        .map(|p| State {
            x: p.x,
            y: p.y,
            z: 0.0,
            psi: p.yaw,
            v: params.v_max_ms,
        })
        .collect())
}

/// Index of the pose `look_ahead_distance_m` along the path from `nearest`, using the average
/// spacing of the path's poses, clamped to the last pose.
pub fn goal_index(path: &NavPath, nearest: usize, look_ahead_distance_m: f64) -> usize {
    let last = path.len().saturating_sub(1);
    let span = waypoint_span(path, look_ahead_distance_m);

    nearest.saturating_add(span).min(last)
}

/// Number of poses covering the given distance along the path.
///
/// Paths of zero length have a span of zero.
fn waypoint_span(path: &NavPath, distance_m: f64) -> usize {
    if path.is_empty() {
        return 0;
    }

    let spacing = path.length_m() / path.len() as f64;

    if !(spacing > 0.0) {
        return 0;
    }

    let span = distance_m / spacing;

    if span > 0.0 {
        // Casting from float to int saturates
        span as usize
    } else {
        0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc_prep::{
        interp::{DubinsInterpolator, LinearInterpolator},
        ParamsError,
    };

    const EPS: f64 = 1e-6;

    fn params(n: usize) -> MpcParams {
        MpcParams {
            horizon_len: n,
            params_configured: true,
            ..Default::default()
        }
    }

    fn x_path(n: usize, spacing: f64) -> NavPath {
        NavPath::new(
            (0..n)
                .map(|i| PoseStamped::from_xyz_yaw(i as f64 * spacing, 0.0, 0.0, 0.0))
                .collect(),
        )
    }

    #[test]
    fn test_colinear_horizon() {
        let params = params(3);
        let path = x_path(5, 1.0);
        let robot = PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0);
        let interp = DubinsInterpolator::from_params(&params);

        assert_eq!(goal_index(&path, 0, 2.0), 2);

        let states =
            get_local_interpolated_reference_states(&robot, &params, &path, 2.0, &interp).unwrap();

        assert_eq!(states.len(), 3);
        for (i, s) in states.iter().enumerate() {
            assert!((s.x - i as f64).abs() < EPS, "{:?}", s);
            assert!(s.y.abs() < EPS, "{:?}", s);
            assert!(s.psi.abs() < EPS, "{:?}", s);
            assert_eq!(s.z, 0.0);
            assert_eq!(s.v, params.v_max_ms);
        }
    }

    #[test]
    fn test_horizon_length() {
        let path = NavPath::new(vec![
            PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0),
            PoseStamped::from_xyz_yaw(2.0, 1.0, 0.0, 0.4),
            PoseStamped::from_xyz_yaw(4.0, 3.0, 0.0, 0.9),
            PoseStamped::from_xyz_yaw(5.0, 6.0, 0.0, 1.4),
        ]);
        let robot = PoseStamped::from_xyz_yaw(0.3, -0.2, 0.0, 0.1);

        for n in 1..25 {
            let params = params(n);
            let dubins = DubinsInterpolator::from_params(&params);

            for &look_ahead in [0.0, 1.0, 3.5, 100.0, -2.0].iter() {
                let states = get_local_interpolated_reference_states(
                    &robot, &params, &path, look_ahead, &dubins,
                )
                .unwrap();
                assert_eq!(states.len(), n);

                let states = get_local_interpolated_reference_states(
                    &robot,
                    &params,
                    &path,
                    look_ahead,
                    &LinearInterpolator,
                )
                .unwrap();
                assert_eq!(states.len(), n);
            }
        }
    }

    #[test]
    fn test_single_state_horizon() {
        let params = params(1);
        let path = x_path(5, 1.0);
        let robot = PoseStamped::from_xyz_yaw(0.2, 0.1, 0.0, 0.3);

        let states = get_local_interpolated_reference_states(
            &robot,
            &params,
            &path,
            2.0,
            &DubinsInterpolator::from_params(&params),
        )
        .unwrap();

        // Goal is 2 poses ahead, which isn't less than N, so the nearest pose is the start
        assert_eq!(states.len(), 1);
        assert!(states[0].x.abs() < EPS && states[0].y.abs() < EPS);
    }

    #[test]
    fn test_degenerate_horizon() {
        let params = params(4);
        let path = x_path(5, 1.0);

        // Robot sits on the final pose so the goal and nearest pose coincide with it
        let robot = PoseStamped::from_xyz_yaw(4.0, 0.0, 0.0, 0.0);
        let states = get_local_interpolated_reference_states(
            &robot,
            &params,
            &path,
            2.0,
            &DubinsInterpolator::from_params(&params),
        )
        .unwrap();

        assert_eq!(states.len(), 4);
        for s in states.iter() {
            assert!((s.x - 4.0).abs() < EPS && s.y.abs() < EPS && s.psi.abs() < EPS);
            assert!(s.x.is_finite() && s.y.is_finite());
        }

        // All poses coincident
        let path = NavPath::new(vec![robot, robot, robot]);
        assert_eq!(goal_index(&path, 0, 5.0), 0);
        let states = get_local_interpolated_reference_states(
            &robot,
            &params,
            &path,
            5.0,
            &LinearInterpolator,
        )
        .unwrap();
        assert_eq!(states.len(), 4);
        assert!(states.iter().all(|s| s.x == 4.0 && s.y == 0.0));
    }

    #[test]
    fn test_preconditions() {
        let robot = PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.0);
        let path = x_path(5, 1.0);

        match get_local_interpolated_reference_states(
            &robot,
            &MpcParams::default(),
            &path,
            2.0,
            &LinearInterpolator,
        ) {
            Err(MpcPrepError::InvalidParams(ParamsError::NotConfigured)) => (),
            r => panic!("Expected NotConfigured, got {:?}", r),
        }

        match get_local_interpolated_reference_states(
            &robot,
            &params(3),
            &x_path(1, 1.0),
            2.0,
            &LinearInterpolator,
        ) {
            Err(MpcPrepError::TrajectoryTooShort(1)) => (),
            r => panic!("Expected TrajectoryTooShort, got {:?}", r),
        }

        match get_local_interpolated_reference_states(
            &robot,
            &params(3),
            &path,
            std::f64::NAN,
            &LinearInterpolator,
        ) {
            Err(MpcPrepError::InvalidLookAhead(_)) => (),
            r => panic!("Expected InvalidLookAhead, got {:?}", r),
        }
    }

    #[test]
    fn test_nan_pose() {
        let path = x_path(5, 1.0);

        for robot in [
            PoseStamped::from_xyz_yaw(std::f64::NAN, 0.0, 0.0, 0.0),
            PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, std::f64::NAN),
        ]
        .iter()
        {
            match get_local_interpolated_reference_states(
                robot,
                &params(3),
                &path,
                2.0,
                &LinearInterpolator,
            ) {
                Err(MpcPrepError::InvalidPose) => (),
                r => panic!("Expected InvalidPose, got {:?}", r),
            }
        }
    }

    #[test]
    fn test_far_goal_starts_on_path() {
        // With the goal N or more poses ahead the nearest pose, not the robot, starts the horizon
        let params = params(2);
        let path = x_path(10, 1.0);
        let robot = PoseStamped::from_xyz_yaw(1.1, 0.4, 0.0, 0.0);

        let states =
            get_local_interpolated_reference_states(&robot, &params, &path, 5.0, &LinearInterpolator)
                .unwrap();

        assert_eq!(states.len(), 2);
        assert!((states[0].x - 1.0).abs() < EPS && states[0].y.abs() < EPS);
        assert!((states[1].x - 6.0).abs() < EPS);
    }
}
