//! # Perloc Equipment Communications Module
//!
//! Messages produced by the perception and localisation (perloc) equipment: the robot pose, the
//! global reference path, tracked obstacles and the live point cloud.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use base64::DecodeError;
use byteorder::{BigEndian, ByteOrder};
use chrono::{serde::ts_milliseconds, DateTime, Utc};
use nalgebra::{Point3, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of bytes used to encode a single point in a [`CloudFrame`] (3 big endian `f32`s).
const BYTES_PER_POINT: usize = 12;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pose (position and attitude in the map frame) with the time it was valid at.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PoseStamped {
    /// UTC timestamp of the pose
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Position in the map frame
    pub position_m: Point3<f64>,

    /// Attitude in the map frame
    #[serde(default = "UnitQuaternion::identity")]
    pub attitude_q: UnitQuaternion<f64>,
}

/// A path made of an ordered sequence of stamped poses, as provided by the global planner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NavPath {
    /// UTC timestamp at which the path was planned
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// The poses making up the path, in order of traversal.
    pub poses: Vec<PoseStamped>,
}

/// The shape of a tracked object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SolidPrimitive {
    /// The kind of primitive
    pub kind: PrimitiveKind,

    /// Dimensions of the primitive, meaning depends on `kind`:
    ///  - `Box`: `[x, y, z]` side lengths
    ///  - `Sphere`: `[radius]`
    ///  - `Cylinder`: `[height, radius]`
    pub dimensions_m: Vec<f64>,
}

/// An object tracked by perception.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Object {
    /// Track ID of the object
    pub id: u32,

    /// Position of the object's centre in the map frame
    pub position_m: Point3<f64>,

    /// Attitude of the object in the map frame
    #[serde(default = "UnitQuaternion::identity")]
    pub attitude_q: UnitQuaternion<f64>,

    /// Bounding shape of the object
    pub shape: SolidPrimitive,

    /// If true the object is moving
    #[serde(default)]
    pub is_dynamic: bool,
}

/// An unordered set of 3D points in the map frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PointCloud {
    /// UTC timestamp at which the cloud was acquired
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// The points in the cloud
    pub points: Vec<Point3<f64>>,
}

/// A serialisable point cloud frame.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloudFrame {
    /// UTC timestamp at which the cloud was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Number of points in the frame
    pub num_points: u32,

    /// The point data, encoded in base64, by first flattening the points into `[x, y, z, ...]`
    /// `f32`s, then converting to a bigendian Vec<u8>, then encoding in base64.
    pub b64_data: String,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Kinds of primitive shape an object may have.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Box,
    Sphere,
    Cylinder,
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum PerlocError {
    #[error("Failed to decode point cloud from base64: {0}")]
    CloudDecodeError(DecodeError),

    #[error("The encoded frame data was the wrong size")]
    FrameWrongSize,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl PoseStamped {
    /// Create a new pose stamped with the current time.
    pub fn new(position_m: Point3<f64>, attitude_q: UnitQuaternion<f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            position_m,
            attitude_q,
        }
    }

    /// Create a new level pose at the given position and yaw.
    pub fn from_xyz_yaw(x: f64, y: f64, z: f64, yaw_rad: f64) -> Self {
        Self::new(
            Point3::new(x, y, z),
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad),
        )
    }

    /// Return the (roll, pitch, yaw) of the pose in radians.
    pub fn rpy(&self) -> (f64, f64, f64) {
        self.attitude_q.euler_angles()
    }

    /// Return the yaw (angle to the positive map X axis) of the pose in radians, in the range
    /// [-pi, pi].
    pub fn yaw(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance(&self, other: &PoseStamped) -> f64 {
        nalgebra::distance(&self.position_m, &other.position_m)
    }

    /// True if neither the position nor the attitude contain a NaN or infinite value.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|c| c.is_finite())
            && self.attitude_q.coords.iter().all(|c| c.is_finite())
    }
}

impl NavPath {
    /// Create a new path from a sequence of poses.
    pub fn new(poses: Vec<PoseStamped>) -> Self {
        Self {
            timestamp: Utc::now(),
            poses,
        }
    }

    /// Number of poses in the path.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Sum of the distances between consecutive poses.
    pub fn length_m(&self) -> f64 {
        self.poses
            .windows(2)
            .map(|w| w[1].distance(&w[0]))
            .sum()
    }
}

impl SolidPrimitive {
    /// Create a box primitive with the given side lengths.
    pub fn new_box(x_m: f64, y_m: f64, z_m: f64) -> Self {
        Self {
            kind: PrimitiveKind::Box,
            dimensions_m: vec![x_m, y_m, z_m],
        }
    }

    /// Half extents of the primitive's footprint on the XY plane.
    ///
    /// If the primitive does not have enough dimensions for its kind `None` is returned.
    pub fn footprint_half_extents(&self) -> Option<Vector2<f64>> {
        let d = &self.dimensions_m;
        match self.kind {
            PrimitiveKind::Box if d.len() >= 2 => Some(Vector2::new(d[0] * 0.5, d[1] * 0.5)),
            PrimitiveKind::Sphere if !d.is_empty() => Some(Vector2::new(d[0], d[0])),
            PrimitiveKind::Cylinder if d.len() >= 2 => Some(Vector2::new(d[1], d[1])),
            _ => None,
        }
    }
}

impl Object {
    /// Yaw of the object in the map frame.
    pub fn yaw(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }
}

impl PointCloud {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            timestamp: Utc::now(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return a new cloud containing only those points inside the axis aligned box with the given
    /// corners, bounds inclusive.
    ///
    /// The corners are not reordered, a box with any `min` component greater than the matching
    /// `max` component contains no points.
    pub fn crop_box(&self, min: &Point3<f64>, max: &Point3<f64>) -> PointCloud {
        let points = self
            .points
            .iter()
            .filter(|p| {
                p.x >= min.x
                    && p.x <= max.x
                    && p.y >= min.y
                    && p.y <= max.y
                    && p.z >= min.z
                    && p.z <= max.z
            })
            .copied()
            .collect();

        PointCloud {
            timestamp: self.timestamp,
            points,
        }
    }

    /// Mean position of the points in the cloud, or `None` if the cloud is empty.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }

        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);

        Some(Point3::from(sum / self.points.len() as f64))
    }
}

impl TryFrom<CloudFrame> for PointCloud {
    type Error = PerlocError;

    fn try_from(frame: CloudFrame) -> Result<Self, Self::Error> {
        // Decode the bytes from the base64 string
        let bytes = base64::decode(frame.b64_data).map_err(PerlocError::CloudDecodeError)?;

        if bytes.len() != frame.num_points as usize * BYTES_PER_POINT {
            return Err(PerlocError::FrameWrongSize);
        }

        // Put those bytes (which are bigendian) into a buffer
        let mut buff = vec![0f32; bytes.len() / 4];
        BigEndian::read_f32_into(&bytes, &mut buff);

        let points = buff
            .chunks(3)
            .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect();

        Ok(Self {
            timestamp: frame.timestamp,
            points,
        })
    }
}

impl From<&PointCloud> for CloudFrame {
    fn from(cloud: &PointCloud) -> Self {
        let flat: Vec<f32> = cloud
            .points
            .iter()
            .flat_map(|p| vec![p.x as f32, p.y as f32, p.z as f32])
            .collect();

        let mut bytes = vec![0u8; flat.len() * 4];
        BigEndian::write_f32_into(&flat, &mut bytes);

        Self {
            timestamp: cloud.timestamp,
            num_points: cloud.points.len() as u32,
            b64_data: base64::encode(&bytes),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_yaw_and_distance() {
        let a = PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, 0.5);
        let b = PoseStamped::from_xyz_yaw(3.0, 4.0, 0.0, -2.0);

        assert!((a.yaw() - 0.5).abs() < 1e-9);
        assert!((b.yaw() + 2.0).abs() < 1e-9);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);

        let path = NavPath::new(vec![a, b, a]);
        assert_eq!(path.len(), 3);
        assert!((path.length_m() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_pose_is_finite() {
        assert!(PoseStamped::from_xyz_yaw(1.0, -2.0, 0.5, 3.0).is_finite());

        assert!(!PoseStamped::from_xyz_yaw(std::f64::NAN, 0.0, 0.0, 0.0).is_finite());
        assert!(!PoseStamped::from_xyz_yaw(0.0, std::f64::INFINITY, 0.0, 0.0).is_finite());
        assert!(!PoseStamped::from_xyz_yaw(0.0, 0.0, 0.0, std::f64::NAN).is_finite());
    }

    #[test]
    fn test_footprint() {
        let cube = SolidPrimitive::new_box(2.0, 1.0, 0.5);
        assert_eq!(cube.footprint_half_extents(), Some(Vector2::new(1.0, 0.5)));

        let cyl = SolidPrimitive {
            kind: PrimitiveKind::Cylinder,
            dimensions_m: vec![1.8, 0.3],
        };
        assert_eq!(cyl.footprint_half_extents(), Some(Vector2::new(0.3, 0.3)));

        let bad = SolidPrimitive {
            kind: PrimitiveKind::Box,
            dimensions_m: vec![1.0],
        };
        assert_eq!(bad.footprint_half_extents(), None);
    }

    #[test]
    fn test_crop_and_centroid() {
        let cloud = PointCloud::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, -1.0, 0.5),
            Point3::new(5.0, 0.0, 0.0),
        ]);

        // Bounds are inclusive
        let cropped = cloud.crop_box(&Point3::new(0.0, -1.0, 0.0), &Point3::new(2.0, 1.0, 1.0));
        assert_eq!(cropped.len(), 3);
        assert_eq!(cropped.centroid(), Some(Point3::new(1.0, 0.0, 0.5)));

        // An inverted box contains nothing
        let inverted = cloud.crop_box(&Point3::new(2.0, -1.0, 0.0), &Point3::new(0.0, 1.0, 1.0));
        assert!(inverted.is_empty());
        assert_eq!(inverted.centroid(), None);
    }

    #[test]
    fn test_cloud_frame() {
        let cloud = PointCloud::new(vec![
            Point3::new(1.0, -2.5, 0.25),
            Point3::new(0.0, 3.0, -1.0),
        ]);

        let frame = CloudFrame::from(&cloud);
        assert_eq!(frame.num_points, 2);

        let decoded = PointCloud::try_from(frame.clone()).unwrap();
        assert_eq!(decoded.points, cloud.points);

        // Claiming more points than are encoded must be rejected
        let bad_frame = CloudFrame {
            num_points: 3,
            ..frame
        };
        match PointCloud::try_from(bad_frame) {
            Err(PerlocError::FrameWrongSize) => (),
            r => panic!("Expected FrameWrongSize, got {:?}", r),
        }
    }
}
