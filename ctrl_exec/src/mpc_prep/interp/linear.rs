//! Straight segment interpolation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{ControlPoint, PathInterpolator};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Joins the control points with straight lines.
///
/// Interior samples take the heading of the segment they lie on, the end samples keep the heading
/// of their control points.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathInterpolator for LinearInterpolator {
    fn interpolate(&self, control_points: &[ControlPoint], count: usize) -> Vec<ControlPoint> {
        let first = match control_points.first() {
            Some(f) => wrapped(f),
            None => return Vec::new(),
        };

        // A single control point is both ends of the path
        if count <= 1 || control_points.len() < 2 {
            return vec![first; count];
        }

        let seg_lengths: Vec<f64> = control_points
            .windows(2)
            .map(|w| (w[1].x - w[0].x).hypot(w[1].y - w[0].y))
            .collect();
        let total: f64 = seg_lengths.iter().sum();

        let mut points = Vec::with_capacity(count);
        points.push(first);

        // Index of the current segment and the distance along the path at which it starts
        let mut seg = 0;
        let mut seg_start = 0.0;

        for i in 1..(count - 1) {
            let s = total * (i as f64) / ((count - 1) as f64);

            while seg + 1 < seg_lengths.len() && s > seg_start + seg_lengths[seg] {
                seg_start += seg_lengths[seg];
                seg += 1;
            }

            let a = &control_points[seg];
            let b = &control_points[seg + 1];
            let len = seg_lengths[seg];

            if len > 0.0 {
                let frac = (s - seg_start) / len;
                points.push(ControlPoint {
                    x: a.x + frac * (b.x - a.x),
                    y: a.y + frac * (b.y - a.y),
                    yaw: wrap_pi((b.y - a.y).atan2(b.x - a.x)),
                });
            } else {
                points.push(wrapped(a));
            }
        }

        // There is always a last control point since the first one exists
        if let Some(last) = control_points.last() {
            points.push(wrapped(last));
        }

        points
    }
}

fn wrapped(point: &ControlPoint) -> ControlPoint {
    ControlPoint {
        yaw: wrap_pi(point.yaw),
        ..*point
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linear_spacing() {
        let cps = [
            ControlPoint::new(0.0, 0.0, 0.0),
            ControlPoint::new(2.0, 0.0, 0.0),
            ControlPoint::new(2.0, 2.0, 1.0),
        ];

        let pts = LinearInterpolator.interpolate(&cps, 5);
        assert_eq!(pts.len(), 5);

        let expected = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)];
        for (p, e) in pts.iter().zip(expected.iter()) {
            assert!((p.x - e.0).abs() < 1e-9, "{:?} != {:?}", p, e);
            assert!((p.y - e.1).abs() < 1e-9, "{:?} != {:?}", p, e);
        }

        // The interior point on the second segment faces along it
        assert!((pts[3].yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(pts[4].yaw, 1.0);
    }

    #[test]
    fn test_linear_counts() {
        let cps = [
            ControlPoint::new(1.0, 1.0, 7.0),
            ControlPoint::new(1.0, 1.0, 0.0),
        ];

        assert!(LinearInterpolator.interpolate(&cps, 0).is_empty());
        assert!(LinearInterpolator.interpolate(&[], 4).is_empty());

        let one = LinearInterpolator.interpolate(&cps, 1);
        assert_eq!(one.len(), 1);
        assert!((one[0].yaw - wrap_pi(7.0)).abs() < 1e-12);

        // Coincident points give copies of the same position
        let pts = LinearInterpolator.interpolate(&cps, 4);
        assert_eq!(pts.len(), 4);
        assert!(pts.iter().all(|p| p.x == 1.0 && p.y == 1.0));
    }

    #[test]
    fn test_single_control_point() {
        let a = ControlPoint::new(1.0, 2.0, 0.0);

        let pts = LinearInterpolator.interpolate(&[a], 3);
        assert_eq!(pts, vec![a; 3]);
    }
}
