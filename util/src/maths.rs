//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

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

/// Sign of a value as -1, 0 or +1.
pub fn sgn<T>(value: T) -> T
where
    T: Float
{
    if value > T::zero() {
        T::one()
    }
    else if value < T::zero() {
        -T::one()
    }
    else {
        T::zero()
    }
}

/// Get the signed angular distance in degrees to go from heading `a` to
/// heading `b`.
///
/// This function will return the shortest signed distance between a and b
/// accounting for wrapping at 360 degrees. Positive distances are clockwise.
pub fn get_ang_dist_deg<T>(a: T, b: T) -> T
where
    T: Float
{
    let full_t: T = T::from(360.0).unwrap();
    
    let c = rem_euclid(a - b, full_t);
    let d = rem_euclid(b - a, full_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Wrap a heading in degrees into [0, 360).
pub fn wrap_deg<T>(value: T) -> T
where
    T: Float
{
    rem_euclid(value, T::from(360.0).unwrap())
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist_deg() {
        assert_eq!(get_ang_dist_deg(10f64, 20f64), 10f64);
        assert_eq!(get_ang_dist_deg(20f64, 10f64), -10f64);
        assert_eq!(get_ang_dist_deg(0f64, 360f64), 0f64);
        assert_eq!(get_ang_dist_deg(350f64, 10f64), 20f64);
        assert_eq!(get_ang_dist_deg(10f64, 350f64), -20f64);
        assert_eq!(get_ang_dist_deg(0f64, 270f64), -90f64);
    }

    #[test]
    fn test_wrap_clamp_sgn() {
        assert_eq!(wrap_deg(-90f64), 270f64);
        assert_eq!(wrap_deg(450f64), 90f64);
        assert_eq!(clamp(&200f64, &-127f64, &127f64), 127f64);
        assert_eq!(sgn(-3f64), -1f64);
    }
}
