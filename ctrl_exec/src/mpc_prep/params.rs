//! MPC preprocessing parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the preprocessing module, loaded from `mpc_prep.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MpcPrepParams {
    /// Distance along the reference path at which the horizon's goal lies.
    ///
    /// Units: meters
    pub look_ahead_distance_m: f64,

    /// The interpolation model used to build the horizon
    #[serde(default)]
    pub interp: InterpKind,

    /// Controller parameters
    pub mpc: MpcParams,

    /// Local re-centering of the reference path
    #[serde(default)]
    pub recentre: RecentreParams,
}

/// Parameters of the model predictive controller.
///
/// These are shared with the external optimiser, the preprocessing stage only
/// reads a subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcParams {
    /// Number of timesteps in the horizon (N)
    pub horizon_len: usize,

    /// Discretisation time between timesteps
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// Distance from the centre of gravity to the front axle
    ///
    /// Units: meters
    pub l_f_m: f64,

    /// Distance from the centre of gravity to the rear axle
    ///
    /// Units: meters
    pub l_r_m: f64,

    /// Velocity limits
    ///
    /// Units: meters/second
    pub v_min_ms: f64,
    pub v_max_ms: f64,

    /// Acceleration limits
    ///
    /// Units: meters/second^2
    pub a_min_mss: f64,
    pub a_max_mss: f64,

    /// Front steer angle limits
    ///
    /// Units: radians
    pub df_min_rad: f64,
    pub df_max_rad: f64,

    /// Jerk limits
    ///
    /// Units: meters/second^3
    pub a_dot_min_msss: f64,
    pub a_dot_max_msss: f64,

    /// Front steer angle rate limits
    ///
    /// Units: radians/second
    pub df_dot_min_rads: f64,
    pub df_dot_max_rads: f64,

    /// State cost weights on x, y, psi and v
    pub q: [f64; 4],

    /// Control cost weights on jerk and steer rate
    pub r: [f64; 2],

    /// Enable debug output (horizon markers)
    pub debug_mode: bool,

    /// Must be set true once the parameters have been configured for the
    /// robot. Unconfigured parameters are rejected by `validate`.
    pub params_configured: bool,

    /// Number of obstacles passed to the optimiser
    pub max_obstacles: usize,

    /// Units: meters
    pub robot_radius_m: f64,

    /// Weight of the obstacle avoidance cost
    pub obstacle_cost: f64,

    pub full_ackerman: bool,
}

/// Parameters for local re-centering of the reference path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentreParams {
    /// If false re-centering is never attempted
    pub enabled: bool,

    /// Margin added either side of the path in Y when cropping the cloud
    ///
    /// Units: meters
    pub inflate_y_m: f64,

    /// Margin added either side of the path in Z when cropping the cloud
    ///
    /// Units: meters
    pub inflate_z_m: f64,

    /// Number of waypoints past the nearest one which are re-centred
    pub look_ahead_waypoints: usize,

    /// Segments whose heading (modulo pi) exceeds this are not straight and
    /// will not be re-centred.
    ///
    /// Units: radians
    pub straightness_threshold_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Interpolation model for the horizon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InterpKind {
    /// Shortest forward path with a minimum turning radius
    Dubins,

    /// Straight segments between control points
    Linear,
}

/// Reasons the controller parameters can be rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameters have not been configured (params_configured is false)")]
    NotConfigured,

    #[error("The horizon length must be at least 1")]
    ZeroHorizon,

    #[error("Limit {0} has min ({1}) greater than max ({2})")]
    InvalidLimit(&'static str, f64, f64),

    #[error("Cost weight {0} is negative")]
    NegativeWeight(&'static str),

    #[error("Parameter {0} must be positive and finite, found {1}")]
    NotPositive(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MpcParams {
    fn default() -> Self {
        Self {
            horizon_len: 10,
            dt_s: 0.1,
            l_f_m: 0.65,
            l_r_m: 0.65,
            v_min_ms: -10.0,
            v_max_ms: 10.0,
            a_min_mss: -1.0,
            a_max_mss: 1.0,
            df_min_rad: -0.5,
            df_max_rad: 0.5,
            a_dot_min_msss: -1.0,
            a_dot_max_msss: 1.0,
            df_dot_min_rads: -0.5,
            df_dot_max_rads: 0.5,
            q: [100.0, 100.0, 10.0, 0.1],
            r: [10.0, 10.0],
            debug_mode: true,
            params_configured: false,
            max_obstacles: 1,
            robot_radius_m: 0.5,
            obstacle_cost: 1.0,
            full_ackerman: false,
        }
    }
}

impl Default for RecentreParams {
    fn default() -> Self {
        Self {
            enabled: false,
            inflate_y_m: 0.3,
            inflate_z_m: 0.3,
            look_ahead_waypoints: 10,
            straightness_threshold_rad: 0.4,
        }
    }
}

impl Default for InterpKind {
    fn default() -> Self {
        InterpKind::Dubins
    }
}

impl MpcParams {
    /// Check the parameters are usable.
    ///
    /// This must pass before the parameters are handed to any preprocessing
    /// function.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.params_configured {
            return Err(ParamsError::NotConfigured);
        }

        if self.horizon_len < 1 {
            return Err(ParamsError::ZeroHorizon);
        }

        let limits = [
            ("v", self.v_min_ms, self.v_max_ms),
            ("a", self.a_min_mss, self.a_max_mss),
            ("df", self.df_min_rad, self.df_max_rad),
            ("a_dot", self.a_dot_min_msss, self.a_dot_max_msss),
            ("df_dot", self.df_dot_min_rads, self.df_dot_max_rads),
        ];
        for &(name, min, max) in limits.iter() {
            // Written so that NaN limits are also rejected
            if !(min <= max) {
                return Err(ParamsError::InvalidLimit(name, min, max));
            }
        }

        if self.q.iter().any(|w| !(*w >= 0.0)) {
            return Err(ParamsError::NegativeWeight("q"));
        }
        if self.r.iter().any(|w| !(*w >= 0.0)) {
            return Err(ParamsError::NegativeWeight("r"));
        }
        if !(self.obstacle_cost >= 0.0) {
            return Err(ParamsError::NegativeWeight("obstacle_cost"));
        }

        let positive = [
            ("dt_s", self.dt_s),
            ("df_max_rad", self.df_max_rad),
            ("wheelbase", self.l_f_m + self.l_r_m),
            ("min_turning_radius", self.min_turning_radius_m()),
        ];
        for &(name, value) in positive.iter() {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        Ok(())
    }

    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub fn wheelbase_m(&self) -> f64 {
        self.l_f_m + self.l_r_m
    }

    /// Minimum turning radius of the robot at full steering lock.
    ///
    /// Units: meters
    pub fn min_turning_radius_m(&self) -> f64 {
        self.wheelbase_m() / self.df_max_rad.tan()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn configured() -> MpcParams {
        MpcParams {
            params_configured: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(MpcParams::default().validate(), Err(ParamsError::NotConfigured));
        assert_eq!(configured().validate(), Ok(()));

        let p = MpcParams {
            horizon_len: 0,
            ..configured()
        };
        assert_eq!(p.validate(), Err(ParamsError::ZeroHorizon));

        let p = MpcParams {
            v_min_ms: 2.0,
            v_max_ms: 1.0,
            ..configured()
        };
        assert_eq!(p.validate(), Err(ParamsError::InvalidLimit("v", 2.0, 1.0)));

        let p = MpcParams {
            r: [1.0, -0.1],
            ..configured()
        };
        assert_eq!(p.validate(), Err(ParamsError::NegativeWeight("r")));

        let p = MpcParams {
            a_dot_min_msss: 1.0,
            a_dot_max_msss: -1.0,
            ..configured()
        };
        assert_eq!(p.validate(), Err(ParamsError::InvalidLimit("a_dot", 1.0, -1.0)));

        let p = MpcParams {
            df_min_rad: -0.5,
            df_max_rad: 0.0,
            ..configured()
        };
        assert_eq!(p.validate(), Err(ParamsError::NotPositive("df_max_rad", 0.0)));
    }

    #[test]
    fn test_turning_radius() {
        let p = configured();
        assert!((p.wheelbase_m() - 1.3).abs() < 1e-12);
        assert!((p.min_turning_radius_m() - 1.3 / 0.5f64.tan()).abs() < 1e-12);
    }

    #[test]
    fn test_load_from_toml() {
        let p: MpcPrepParams = util::params::from_str(
            r#"
            look_ahead_distance_m = 4.0
            interp = "Linear"

            [mpc]
            horizon_len = 8
            params_configured = true
            max_obstacles = 3
            a_dot_min_msss = -2.0
            a_dot_max_msss = 2.0

            [recentre]
            enabled = true
            look_ahead_waypoints = 5
            "#,
        )
        .unwrap();

        assert_eq!(p.interp, InterpKind::Linear);
        assert_eq!(p.mpc.horizon_len, 8);
        assert_eq!(p.mpc.max_obstacles, 3);
        assert_eq!(p.mpc.a_dot_min_msss, -2.0);
        assert_eq!(p.mpc.a_dot_max_msss, 2.0);
        // Unspecified values keep their defaults
        assert_eq!(p.mpc.v_max_ms, 10.0);
        assert!(p.recentre.enabled);
        assert_eq!(p.recentre.look_ahead_waypoints, 5);
        assert_eq!(p.recentre.straightness_threshold_rad, 0.4);
        assert_eq!(p.mpc.validate(), Ok(()));
    }
}
