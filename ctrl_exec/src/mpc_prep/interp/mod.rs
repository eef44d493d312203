//! # Path interpolation
//!
//! Strategies for building a short path through a set of control points and resampling it at
//! evenly spaced points along its length.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dubins;
mod linear;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use dubins::*;
pub use linear::*;

use super::{InterpKind, MpcParams};
use comms_if::eqpt::perloc::PoseStamped;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on the XY plane with a heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControlPoint {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Units: radians
    pub yaw: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A method of interpolating a path through control points.
pub trait PathInterpolator {
    /// Build a path through the control points and resample it into exactly `count` points.
    ///
    /// The returned points shall be evenly spaced by arc length along the path. When `count` is
    /// at least 2 the first and last points are the first and last control points. A `count` of 1
    /// returns the first control point only, and a `count` of 0 or no control points returns an
    /// empty vector. Headings are in the range (-pi, pi].
    fn interpolate(&self, control_points: &[ControlPoint], count: usize) -> Vec<ControlPoint>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlPoint {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Project a pose onto the XY plane.
    pub fn from_pose(pose: &PoseStamped) -> Self {
        Self {
            x: pose.position_m.x,
            y: pose.position_m.y,
            yaw: pose.yaw(),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the interpolator selected by the given kind.
pub fn interpolator_from_params(kind: InterpKind, params: &MpcParams) -> Box<dyn PathInterpolator> {
    match kind {
        InterpKind::Dubins => Box::new(DubinsInterpolator::from_params(params)),
        InterpKind::Linear => Box::new(LinearInterpolator),
    }
}
