//! Controller state and input model, plus velocity regulation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

// Internal
use super::MpcParams;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Index of the X position in the optimiser's state vector.
pub const STATE_X: usize = 0;

/// Index of the Y position in the optimiser's state vector.
pub const STATE_Y: usize = 1;

/// Index of the heading in the optimiser's state vector.
pub const STATE_PSI: usize = 2;

/// Index of the velocity in the optimiser's state vector.
pub const STATE_V: usize = 3;

/// Index of the first obstacle slot in the optimiser's state vector.
pub const STATE_OBS: usize = 4;

/// Index of the acceleration in the optimiser's input vector.
pub const INPUT_ACC: usize = 0;

/// Index of the front steer angle in the optimiser's input vector.
pub const INPUT_DF: usize = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single reference state of the vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Units: meters
    pub x: f64,

    /// Units: meters
    pub y: f64,

    /// Units: meters
    pub z: f64,

    /// Heading of the vehicle from the map X axis.
    ///
    /// Units: radians
    pub psi: f64,

    /// Forward velocity.
    ///
    /// Units: meters/second
    pub v: f64,
}

/// Control input computed by the optimiser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Units: meters/second^2
    pub acc: f64,

    /// Front steer angle
    ///
    /// Units: radians
    pub df: f64,
}

/// A commanded velocity, as sent to the vehicle's drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// Forward (linear) velocity
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Units: radians/second
    pub angular_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State {
    pub fn new(x: f64, y: f64, z: f64, psi: f64, v: f64) -> Self {
        Self { x, y, z, psi, v }
    }

    /// The state as the optimiser sees it, `[x, y, psi, v]`.
    pub fn to_vector(&self) -> Vector4<f64> {
        let mut vec = Vector4::zeros();
        vec[STATE_X] = self.x;
        vec[STATE_Y] = self.y;
        vec[STATE_PSI] = self.psi;
        vec[STATE_V] = self.v;
        vec
    }
}

impl ControlInput {
    pub fn to_array(&self) -> [f64; 2] {
        let mut arr = [0f64; 2];
        arr[INPUT_ACC] = self.acc;
        arr[INPUT_DF] = self.df;
        arr
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a velocity into the range allowed by the parameters.
pub fn regulate(v_ms: f64, params: &MpcParams) -> f64 {
    clamp(&v_ms, &params.v_min_ms, &params.v_max_ms)
}

/// Limit the linear velocity of the command to the allowed range. Only the linear velocity is
/// modified.
pub fn regulate_max_speed(cmd: &mut VelocityCmd, params: &MpcParams) {
    cmd.linear_ms = regulate(cmd.linear_ms, params);
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_regulate() {
        let params = MpcParams::default();

        assert_eq!(regulate(12.0, &params), 10.0);
        assert_eq!(regulate(-15.0, &params), -10.0);
        assert_eq!(regulate(3.5, &params), 3.5);
        assert_eq!(regulate(10.0, &params), 10.0);

        let mut cmd = VelocityCmd {
            linear_ms: 12.0,
            angular_rads: 0.7,
        };
        regulate_max_speed(&mut cmd, &params);
        assert_eq!(cmd.linear_ms, 10.0);
        assert_eq!(cmd.angular_rads, 0.7);

        cmd.linear_ms = -15.0;
        regulate_max_speed(&mut cmd, &params);
        assert_eq!(cmd.linear_ms, -10.0);
    }

    #[test]
    fn test_regulate_in_bounds() {
        let params = MpcParams {
            v_min_ms: -0.5,
            v_max_ms: 2.0,
            ..Default::default()
        };

        let mut v = -3.0;
        while v < 3.0 {
            let r = regulate(v, &params);
            assert!(r >= params.v_min_ms && r <= params.v_max_ms);
            if v >= params.v_min_ms && v <= params.v_max_ms {
                assert_eq!(r, v);
            }
            v += 0.05;
        }
    }

    #[test]
    fn test_state_vector() {
        let s = State::new(1.0, 2.0, 7.0, 0.3, 4.0);
        let vec = s.to_vector();
        assert_eq!(vec[STATE_X], 1.0);
        assert_eq!(vec[STATE_Y], 2.0);
        assert_eq!(vec[STATE_PSI], 0.3);
        assert_eq!(vec[STATE_V], 4.0);
        assert_eq!(State::default(), State::new(0.0, 0.0, 0.0, 0.0, 0.0));

        let u = ControlInput { acc: 0.5, df: -0.1 };
        assert_eq!(u.to_array(), [0.5, -0.1]);
    }
}
