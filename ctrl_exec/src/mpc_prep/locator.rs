//! Location of the robot along the reference path

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::perloc::{NavPath, PoseStamped};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the index of the pose in the path closest to the robot.
///
/// Closeness is the 3D Euclidean distance between positions. If several poses are equally close
/// the first one is returned. An empty path has no nearest pose so `None` is returned.
pub fn nearest_state_index(path: &NavPath, robot_pose: &PoseStamped) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;

    for (i, pose) in path.poses.iter().enumerate() {
        let dist = pose.distance(robot_pose);

        match nearest {
            _ if dist.is_nan() => (),
            Some((_, min_dist)) if !(dist < min_dist) => (),
            _ => nearest = Some((i, dist)),
        }
    }

    nearest.map(|(i, _)| i)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
