//! Visualisation of reference states
//!
//! Markers are fire and forget, a sink which fails to deliver them shall log the failure itself
//! rather than interrupt preprocessing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Utc;
use nalgebra::{Point3, UnitQuaternion, Vector3};

use super::State;
use comms_if::eqpt::perloc::PointCloud;
use comms_if::viz::{ColorRgba, Marker, MarkerAction, MarkerArray, MarkerKind};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frame in which all markers are expressed.
pub const MARKER_FRAME: &str = "map";

/// Namespace of the interpolated horizon markers.
pub const HORIZON_NS: &str = "interpolated_reference_states";

/// Namespace of the re-centred path markers.
pub const READJUSTED_NS: &str = "readjusted_segment";

/// Namespace of the cropped point cloud markers.
pub const CROPPED_CLOUD_NS: &str = "cropped_cloud";

/// States on the ground plane (z of zero) are drawn at this height so they are visible above the
/// robot.
///
/// Units: meters
const GROUND_STATE_DRAW_HEIGHT_M: f64 = 1.3;

/// Arrow length, shaft width and head height.
///
/// Units: meters
const ARROW_SCALE_M: [f64; 3] = [0.25, 0.1, 0.1];

/// Side length of the cube drawn for each cloud point.
///
/// Units: meters
const CLOUD_POINT_SIZE_M: f64 = 0.05;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which markers can be published to.
pub trait MarkerSink {
    /// Publish the markers.
    fn publish(&mut self, markers: MarkerArray);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sink which discards all markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

/// A sink which keeps every marker array published to it.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    pub published: Vec<MarkerArray>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MarkerSink for NullSink {
    fn publish(&mut self, _markers: MarkerArray) {}
}

impl MarkerSink for BufferSink {
    fn publish(&mut self, markers: MarkerArray) {
        self.published.push(markers);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Draw each state as an arrow, numbered in order within the namespace `ns`.
pub fn traj_states_markers(states: &[State], color: ColorRgba, ns: &str) -> MarkerArray {
    let timestamp = Utc::now();

    let markers = states
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let z = if s.z == 0.0 {
                GROUND_STATE_DRAW_HEIGHT_M
            } else {
                s.z
            };

            Marker {
                frame_id: String::from(MARKER_FRAME),
                timestamp,
                ns: String::from(ns),
                id: i as u32,
                kind: MarkerKind::Arrow,
                action: MarkerAction::Add,
                position_m: Point3::new(s.x, s.y, z),
                orientation_q: UnitQuaternion::from_euler_angles(0.0, 0.0, s.psi),
                scale: Vector3::new(ARROW_SCALE_M[0], ARROW_SCALE_M[1], ARROW_SCALE_M[2]),
                color,
                lifetime_s: 0.0,
            }
        })
        .collect();

    MarkerArray { markers }
}

/// Draw each point of the cloud as a small cube.
pub fn cloud_markers(cloud: &PointCloud, color: ColorRgba, ns: &str) -> MarkerArray {
    let timestamp = Utc::now();

    let markers = cloud
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| Marker {
            frame_id: String::from(MARKER_FRAME),
            timestamp,
            ns: String::from(ns),
            id: i as u32,
            kind: MarkerKind::Cube,
            action: MarkerAction::Add,
            position_m: *p,
            orientation_q: UnitQuaternion::identity(),
            scale: Vector3::repeat(CLOUD_POINT_SIZE_M),
            color,
            lifetime_s: 0.0,
        })
        .collect();

    MarkerArray { markers }
}

/// Publish the states as markers to the sink.
pub fn publish_traj_states(
    sink: &mut dyn MarkerSink,
    states: &[State],
    color: ColorRgba,
    ns: &str,
) {
    sink.publish(traj_states_markers(states, color, ns));
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
