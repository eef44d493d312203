//! Dubins path interpolation
//!
//! A Dubins path is the shortest path between two headed points for a vehicle which can only move
//! forwards and has a minimum turning radius. It is made of three segments, each either a turn at
//! the minimum radius (left or right) or a straight line. Only six combinations ("words") can be
//! optimal, the shortest of which is chosen.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::TAU;

use log::warn;

use super::{ControlPoint, LinearInterpolator, PathInterpolator};
use crate::mpc_prep::MpcParams;
use util::maths::{mod_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Control points closer than this (in both position and heading) are treated as coincident.
const COINCIDENT_EPS: f64 = 1e-9;

/// Tolerance on the existence conditions of each word, so that round-off on a boundary case does
/// not discard an otherwise valid solution.
const SOLVE_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Interpolates control points with a chain of Dubins paths.
#[derive(Debug, Clone, Copy)]
pub struct DubinsInterpolator {
    turning_radius_m: f64,
}

/// The shortest Dubins path between two control points.
#[derive(Debug, Clone, Copy)]
pub struct DubinsPath {
    start: ControlPoint,

    /// Turning radius
    ///
    /// Units: meters
    rho: f64,

    word: DubinsWord,

    /// Lengths of the three segments, normalised by the turning radius.
    seg_lengths: [f64; 3],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Left,
    Straight,
    Right,
}

/// The six possible Dubins path words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DubinsWord {
    Lsl,
    Rsr,
    Lsr,
    Rsl,
    Rlr,
    Lrl,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DubinsInterpolator {
    /// Create a new interpolator with the given minimum turning radius, in meters.
    pub fn new(turning_radius_m: f64) -> Self {
        Self { turning_radius_m }
    }

    /// Create a new interpolator using the turning radius of the vehicle at full steering lock.
    pub fn from_params(params: &MpcParams) -> Self {
        Self::new(params.min_turning_radius_m())
    }

    pub fn turning_radius_m(&self) -> f64 {
        self.turning_radius_m
    }
}

impl PathInterpolator for DubinsInterpolator {
    fn interpolate(&self, control_points: &[ControlPoint], count: usize) -> Vec<ControlPoint> {
        if count <= 1 || control_points.len() < 2 {
            return LinearInterpolator.interpolate(control_points, count);
        }

        let mut paths = Vec::with_capacity(control_points.len() - 1);
        for w in control_points.windows(2) {
            match DubinsPath::shortest(&w[0], &w[1], self.turning_radius_m) {
                Some(p) => paths.push(p),
                None => {
                    warn!(
                        "No Dubins path between {:?} and {:?} (radius {} m), using straight lines",
                        w[0], w[1], self.turning_radius_m
                    );
                    return LinearInterpolator.interpolate(control_points, count);
                }
            }
        }

        let total: f64 = paths.iter().map(|p| p.length()).sum();

        let mut points = Vec::with_capacity(count);

        let mut path_idx = 0;
        let mut path_start = 0.0;

        for i in 0..(count - 1) {
            let s = total * (i as f64) / ((count - 1) as f64);

            while path_idx + 1 < paths.len() && s > path_start + paths[path_idx].length() {
                path_start += paths[path_idx].length();
                path_idx += 1;
            }

            points.push(paths[path_idx].sample(s - path_start));
        }

        if let Some(last) = control_points.last() {
            points.push(ControlPoint {
                yaw: wrap_pi(last.yaw),
                ..*last
            });
        }

        points
    }
}

impl DubinsPath {
    /// Find the shortest path between `start` and `end` for the turning radius `rho` (meters).
    ///
    /// Returns `None` if the radius is not positive or no word has a solution.
    pub fn shortest(start: &ControlPoint, end: &ControlPoint, rho: f64) -> Option<Self> {
        if !(rho > 0.0 && rho.is_finite()) {
            return None;
        }

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let dist = dx.hypot(dy);

        // Coincident points have a zero length path rather than a full loop
        if dist < COINCIDENT_EPS && wrap_pi(end.yaw - start.yaw).abs() < COINCIDENT_EPS {
            return Some(Self {
                start: *start,
                rho,
                word: DubinsWord::Lsl,
                seg_lengths: [0.0; 3],
            });
        }

        let theta = mod_2pi(dy.atan2(dx));
        let alpha = mod_2pi(start.yaw - theta);
        let beta = mod_2pi(end.yaw - theta);
        let d = dist / rho;

        let mut best: Option<(DubinsWord, [f64; 3])> = None;

        for &word in DubinsWord::ALL.iter() {
            if let Some(lengths) = word.solve(alpha, beta, d) {
                let cost: f64 = lengths.iter().sum();
                match best {
                    Some((_, b)) if !(cost < b.iter().sum::<f64>()) => (),
                    _ => best = Some((word, lengths)),
                }
            }
        }

        best.map(|(word, seg_lengths)| Self {
            start: *start,
            rho,
            word,
            seg_lengths,
        })
    }

    pub fn word(&self) -> DubinsWord {
        self.word
    }

    /// Total length of the path.
    ///
    /// Units: meters
    pub fn length(&self) -> f64 {
        self.seg_lengths.iter().sum::<f64>() * self.rho
    }

    /// Get the point at distance `s` (meters) along the path.
    ///
    /// `s` is clamped into the path's length.
    pub fn sample(&self, s: f64) -> ControlPoint {
        let t = (s / self.rho).max(0.0).min(self.seg_lengths.iter().sum::<f64>());
        let segs = self.word.segments();
        let [p1, p2, _] = self.seg_lengths;

        let q0 = (0.0, 0.0, self.start.yaw);

        let q = if t < p1 {
            step(segs[0], t, q0)
        } else if t < p1 + p2 {
            let q1 = step(segs[0], p1, q0);
            step(segs[1], t - p1, q1)
        } else {
            let q1 = step(segs[0], p1, q0);
            let q2 = step(segs[1], p2, q1);
            step(segs[2], t - p1 - p2, q2)
        };

        ControlPoint {
            x: q.0 * self.rho + self.start.x,
            y: q.1 * self.rho + self.start.y,
            yaw: wrap_pi(q.2),
        }
    }
}

impl DubinsWord {
    const ALL: [DubinsWord; 6] = [
        DubinsWord::Lsl,
        DubinsWord::Rsr,
        DubinsWord::Lsr,
        DubinsWord::Rsl,
        DubinsWord::Rlr,
        DubinsWord::Lrl,
    ];

    fn segments(self) -> [Segment; 3] {
        use Segment::*;
        match self {
            DubinsWord::Lsl => [Left, Straight, Left],
            DubinsWord::Rsr => [Right, Straight, Right],
            DubinsWord::Lsr => [Left, Straight, Right],
            DubinsWord::Rsl => [Right, Straight, Left],
            DubinsWord::Rlr => [Right, Left, Right],
            DubinsWord::Lrl => [Left, Right, Left],
        }
    }

    /// Normalised segment lengths of this word for the given normalised problem, in which the
    /// start is at the origin, the end on the positive X axis at distance `d`, and `alpha` and
    /// `beta` are the start and end headings relative to the line between them.
    fn solve(self, alpha: f64, beta: f64, d: f64) -> Option<[f64; 3]> {
        let (sa, sb) = (alpha.sin(), beta.sin());
        let (ca, cb) = (alpha.cos(), beta.cos());
        let c_ab = (alpha - beta).cos();

        match self {
            DubinsWord::Lsl => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sa - sb);
                if p_sq < -SOLVE_EPS {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let tmp = (cb - ca).atan2(d + sa - sb);
                Some([mod_2pi(tmp - alpha), p_sq.sqrt(), mod_2pi(beta - tmp)])
            }
            DubinsWord::Rsr => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sb - sa);
                if p_sq < -SOLVE_EPS {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let tmp = (ca - cb).atan2(d - sa + sb);
                Some([mod_2pi(alpha - tmp), p_sq.sqrt(), mod_2pi(tmp - beta)])
            }
            DubinsWord::Lsr => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab + 2.0 * d * (sa + sb);
                if p_sq < -SOLVE_EPS {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let p = p_sq.sqrt();
                let tmp = (-ca - cb).atan2(d + sa + sb) - (-2.0f64).atan2(p);
                Some([mod_2pi(tmp - alpha), p, mod_2pi(tmp - mod_2pi(beta))])
            }
            DubinsWord::Rsl => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab - 2.0 * d * (sa + sb);
                if p_sq < -SOLVE_EPS {
                    return None;
                }
                let p_sq = p_sq.max(0.0);
                let p = p_sq.sqrt();
                let tmp = (ca + cb).atan2(d - sa - sb) - 2.0f64.atan2(p);
                Some([mod_2pi(alpha - tmp), p, mod_2pi(beta - tmp)])
            }
            DubinsWord::Rlr => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sa - sb)) / 8.0;
                if tmp.abs() > 1.0 + SOLVE_EPS {
                    return None;
                }
                let tmp = tmp.max(-1.0).min(1.0);
                let phi = (ca - cb).atan2(d - sa + sb);
                let p = mod_2pi(TAU - tmp.acos());
                let t = mod_2pi(alpha - phi + mod_2pi(p / 2.0));
                Some([t, p, mod_2pi(alpha - beta - t + mod_2pi(p))])
            }
            DubinsWord::Lrl => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sb - sa)) / 8.0;
                if tmp.abs() > 1.0 + SOLVE_EPS {
                    return None;
                }
                let tmp = tmp.max(-1.0).min(1.0);
                let phi = (ca - cb).atan2(d + sa - sb);
                let p = mod_2pi(TAU - tmp.acos());
                let t = mod_2pi(-alpha - phi + p / 2.0);
                Some([t, p, mod_2pi(mod_2pi(beta) - alpha - t + mod_2pi(p))])
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance the normalised configuration `q` (x, y, heading) by `t` along a segment.
fn step(seg: Segment, t: f64, q: (f64, f64, f64)) -> (f64, f64, f64) {
    let (x, y, th) = q;
    match seg {
        Segment::Left => (x + (th + t).sin() - th.sin(), y - (th + t).cos() + th.cos(), th + t),
        Segment::Right => (x - (th - t).sin() + th.sin(), y + (th - t).cos() - th.cos(), th - t),
        Segment::Straight => (x + th.cos() * t, y + th.sin() * t, th),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
