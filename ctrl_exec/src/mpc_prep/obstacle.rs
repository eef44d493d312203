//! Obstacle normalisation
//!
//! The optimiser is built for a fixed number of obstacles, so the tracked objects are sorted by
//! distance to the robot and cut down to that number. If there are too few, far away "ghost"
//! obstacles fill the remaining slots. These are so distant they never affect the avoidance cost.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Point2, Point3, UnitQuaternion, Vector2};
use ordered_float::OrderedFloat;
use serde::Serialize;

// Internal
use comms_if::eqpt::perloc::{Object, PoseStamped, SolidPrimitive};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Coordinate (on every axis) of ghost objects.
///
/// Units: meters
pub const GHOST_POSITION_M: f64 = 20000.0;

/// Side length of the ghost object's box.
///
/// Units: meters
pub const GHOST_SIZE_M: f64 = 0.1;

/// Track ID given to ghost objects.
pub const GHOST_ID: u32 = u32::MAX;

/// Centre of the default (ghost) ellipsoid on both axes.
///
/// Units: meters
const GHOST_ELLIPSOID_CENTRE_M: f64 = 1000.0;

/// Semi-axis length of the default ellipsoid, also used for objects with malformed shapes.
///
/// Units: meters
const DEFAULT_SEMI_AXIS_M: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An obstacle modelled as an ellipse on the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ellipsoid {
    /// Units: meters
    pub centre_m: Point2<f64>,

    /// Semi-axis lengths along the obstacle's own X and Y axes.
    ///
    /// Units: meters
    pub axes_m: Vector2<f64>,

    pub is_dynamic: bool,

    /// Heading of the obstacle from the map X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Bearing of the robot from the obstacle centre, relative to the obstacle's heading.
    ///
    /// Units: radians
    pub heading_to_robot_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Ellipsoid {
    fn default() -> Self {
        Self {
            centre_m: Point2::new(GHOST_ELLIPSOID_CENTRE_M, GHOST_ELLIPSOID_CENTRE_M),
            axes_m: Vector2::new(DEFAULT_SEMI_AXIS_M, DEFAULT_SEMI_AXIS_M),
            is_dynamic: false,
            heading_rad: 0.0,
            heading_to_robot_rad: 0.0,
        }
    }
}

impl Ellipsoid {
    /// Model a tracked object as an ellipsoid, as seen from the robot.
    ///
    /// Ghost objects become the default ellipsoid.
    pub fn from_object(object: &Object, robot_pose: &PoseStamped) -> Self {
        if is_ghost(object) {
            return Self::default();
        }

        let centre_m = Point2::new(object.position_m.x, object.position_m.y);
        let heading_rad = object.yaw();

        let bearing = (robot_pose.position_m.y - centre_m.y)
            .atan2(robot_pose.position_m.x - centre_m.x);

        Self {
            centre_m,
            axes_m: object
                .shape
                .footprint_half_extents()
                .unwrap_or_else(|| Vector2::new(DEFAULT_SEMI_AXIS_M, DEFAULT_SEMI_AXIS_M)),
            is_dynamic: object.is_dynamic,
            heading_rad,
            heading_to_robot_rad: wrap_pi(bearing - heading_rad),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a ghost object, which is too far away to affect the robot.
pub fn ghost_object() -> Object {
    Object {
        id: GHOST_ID,
        position_m: Point3::new(GHOST_POSITION_M, GHOST_POSITION_M, GHOST_POSITION_M),
        attitude_q: UnitQuaternion::identity(),
        shape: SolidPrimitive::new_box(GHOST_SIZE_M, GHOST_SIZE_M, GHOST_SIZE_M),
        is_dynamic: false,
    }
}

/// Returns true if the object is a ghost.
pub fn is_ghost(object: &Object) -> bool {
    object.id == GHOST_ID && object.position_m.x == GHOST_POSITION_M
}

/// Reduce the objects to exactly `n`, closest to the robot first.
///
/// Objects are sorted by distance from the robot, those at the same distance keeping their
/// original order. If there are fewer than `n` objects ghosts are appended.
pub fn trim_obstacles_to_n(objects: &[Object], robot_pose: &PoseStamped, n: usize) -> Vec<Object> {
    let mut ranked: Vec<(OrderedFloat<f64>, &Object)> = objects
        .iter()
        .map(|o| {
            (
                OrderedFloat(nalgebra::distance(&o.position_m, &robot_pose.position_m)),
                o,
            )
        })
        .collect();

    // Stable, and NaN is ordered greatest by OrderedFloat so unmeasurable objects go last
    ranked.sort_by_key(|(d, _)| *d);

    let mut trimmed: Vec<Object> = ranked.into_iter().take(n).map(|(_, o)| o.clone()).collect();

    while trimmed.len() < n {
        trimmed.push(ghost_object());
    }

    trimmed
}

/// Convert normalised objects into the ellipsoids passed to the optimiser.
pub fn ellipsoids_from_objects(objects: &[Object], robot_pose: &PoseStamped) -> Vec<Ellipsoid> {
    objects
        .iter()
        .map(|o| Ellipsoid::from_object(o, robot_pose))
        .collect()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
