//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Values of a `mod_2pi` result within this distance of 2pi are snapped to
/// zero, so that round-off on a zero angle does not produce a full turn.
const MOD_2PI_SNAP: f64 = 1e-10;

/// Clamp a value into the closed interval `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Map an angle into the range [0, 2pi).
pub fn mod_2pi<T>(value: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();
    let snap_t: T = T::from(MOD_2PI_SNAP).unwrap();

    let r = rem_euclid(value, tau_t);

    if tau_t - r < snap_t {
        T::zero()
    }
    else {
        r
    }
}

/// Map an angle into the range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();

    let r = mod_2pi(value);

    if r > pi_t {
        r - pi_t - pi_t
    }
    else {
        r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5.0, &-1.0, &1.0), 1.0);
        assert_eq!(clamp(&-5.0, &-1.0, &1.0), -1.0);
        assert_eq!(clamp(&0.25, &-1.0, &1.0), 0.25);
        assert_eq!(clamp(&1.0, &-1.0, &1.0), 1.0);
    }

    #[test]
    fn test_mod_2pi() {
        assert_eq!(mod_2pi(0f64), 0f64);
        assert_eq!(mod_2pi(TAU), 0f64);
        assert_eq!(mod_2pi(-1e-17f64), 0f64);
        assert!((mod_2pi(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
        assert!((mod_2pi(5.0 * PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
        assert!((wrap_pi(PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(0.3f64) - 0.3).abs() < 1e-12);
        assert!((wrap_pi(-0.3f64) + 0.3).abs() < 1e-12);
    }
}
