//! Lanczos kernel evaluation
//!
//! Pure functions for the windowed sinc used to build resampling weight tables.

use std::f64::consts::PI;

/// Number of lobes on each side of the kernel
pub const LANCZOS_RADIUS: f64 = 3.0;

/// Unnormalised sinc, `sin(x) / x`
///
/// Near zero the division is replaced by `1 - |x|`, which stays continuous
/// at the origin and avoids dividing by a denormal.
#[inline]
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-6 { 1.0 - x.abs() } else { x.sin() / x }
}

/// Lanczos window of width `a` evaluated at `x` (in source pixels)
///
/// # Arguments
/// * `x` - Distance from the kernel centre
/// * `a` - Kernel radius; the kernel is zero outside `[-a, a]`
///
/// # Returns
/// `sinc(πx) · sinc(πx / a)`, or `0.0` outside the window
#[inline]
pub fn lanczos(x: f64, a: f64) -> f64 {
    if x.abs() > a {
        0.0
    } else {
        sinc(PI * x) * sinc(PI * x / a)
    }
}
