//! Curve functions mapping elapsed stage time to a physical quantity.
//!
//! Both curves are pure: the same `(start, end, duration, elapsed)` always
//! yields the same value, and no timer is involved. At full progress they
//! return `end` exactly, so a stage always lands on its target.

use std::time::Duration;

/// Exponent of the concentration decay. Values below 1 front-load the
/// progress and decelerate near the target.
pub const DECAY_EXPONENT: f64 = 0.7;

/// Fraction of `duration` covered by `elapsed`, clamped to `[0, 1]`.
///
/// A zero duration counts as complete.
pub fn progress_fraction(duration: Duration, elapsed: Duration) -> f64 {
    if duration.is_zero() || elapsed >= duration {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

/// Linear ramp from `start` to `end`. Used for pH.
pub fn linear_ramp(start: f64, end: f64, duration: Duration, elapsed: Duration) -> f64 {
    let fraction = progress_fraction(duration, elapsed);
    interpolate(start, end, fraction)
}

/// Non-linear decay from `start` to `end` following `fraction^0.7`.
/// Used for contaminant concentration.
pub fn decay(start: f64, end: f64, duration: Duration, elapsed: Duration) -> f64 {
    let fraction = progress_fraction(duration, elapsed);
    interpolate(start, end, fraction.powf(DECAY_EXPONENT))
}

fn interpolate(start: f64, end: f64, weight: f64) -> f64 {
    if weight >= 1.0 {
        return end;
    }
    (end - start).mul_add(weight, start)
}
