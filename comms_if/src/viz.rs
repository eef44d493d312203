//! # Visualisation Messages
//!
//! Markers which are published for display by external visualisation tools. Publishing is fire
//! and forget, no acknowledgement is ever sent back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An RGBA colour, each channel in the range [0, 1].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A single marker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Marker {
    /// Frame the marker is expressed in
    pub frame_id: String,

    /// UTC timestamp of the marker
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Namespace of the marker, together with `id` this uniquely identifies the marker
    pub ns: String,

    pub id: u32,

    pub kind: MarkerKind,

    pub action: MarkerAction,

    /// Position of the marker
    pub position_m: Point3<f64>,

    /// Orientation of the marker
    pub orientation_q: UnitQuaternion<f64>,

    /// Scale of the marker along each of it's axes
    pub scale: Vector3<f64>,

    pub color: ColorRgba,

    /// How long the marker should be displayed for, zero means forever
    pub lifetime_s: f64,
}

/// A group of markers published together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Arrow,
    Cube,
    Sphere,
    Cylinder,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    Add,
    Delete,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ColorRgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn yellow() -> Self {
        Self::new(1.0, 1.0, 0.0, 1.0)
    }

    pub const fn green() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }
}

impl MarkerArray {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
