//! Automation Curves
//!
//! Time-varying scalar parameters defined by sparse keyframes in source
//! (clip-local) time, interpolated through cubic-bezier easing.

mod curve;
mod easing;

pub use curve::{Curve, Keyframe, CURVE_LINEAR, SPAN_EPSILON};
pub use easing::CubicBezier;

/// Replace NaN with zero, the way loosely-typed project data is coerced
#[inline]
pub(crate) fn coerce(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Replace any non-finite value with `fallback`
#[inline]
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
