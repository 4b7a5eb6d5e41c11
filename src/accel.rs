//! Acceleration characteristics shape how a value moves from its start to its end over a run of
//! frames.
//!
//! A characteristic `c` is an integer in `-100..=100`. `0`, `1` and `-1` mean constant speed;
//! `c > 1` starts slow and speeds up, `c < -1` starts fast and slows down. Larger magnitudes give
//! stronger curves.

use crate::foundation::error::{GapError, GapResult};

/// Smallest supported characteristic.
pub const ACCEL_MIN: i32 = -100;
/// Largest supported characteristic.
pub const ACCEL_MAX: i32 = 100;

/// Map a linear progress `factor` (`0.0..=1.0`) through the characteristic curve.
pub fn accel_mix_factor(factor: f64, characteristic: i32) -> f64 {
    let f = factor.clamp(0.0, 1.0);
    match characteristic {
        -1..=1 => f,
        c if c > 1 => f.powf(1.0 + f64::from(c - 1) / 100.0),
        c => 1.0 - (1.0 - f).powf(1.0 + f64::from(-c - 1) / 100.0),
    }
}

/// Sample the curve at `samples` evenly spaced points from 0 to 1 inclusive.
pub fn accel_curve(characteristic: i32, samples: usize) -> GapResult<Vec<f64>> {
    check_characteristic(characteristic)?;
    if samples < 2 {
        return Err(GapError::validation("accel curve needs at least 2 samples"));
    }
    let last = (samples - 1) as f64;
    Ok((0..samples)
        .map(|i| accel_mix_factor(i as f64 / last, characteristic))
        .collect())
}

/// Value of a parameter moving from `from` to `to` at `step` of `total_steps`.
///
/// Step 0 yields `from`, step `total_steps` yields `to`. With `total_steps == 0` the value stays at
/// `from`.
pub fn iterate_value(
    from: f64,
    to: f64,
    step: u32,
    total_steps: u32,
    characteristic: i32,
) -> GapResult<f64> {
    check_characteristic(characteristic)?;
    if step > total_steps {
        return Err(GapError::validation(format!(
            "step {step} is past the last step {total_steps}"
        )));
    }
    if total_steps == 0 {
        return Ok(from);
    }
    let mix = accel_mix_factor(f64::from(step) / f64::from(total_steps), characteristic);
    Ok(from + (to - from) * mix)
}

fn check_characteristic(c: i32) -> GapResult<()> {
    if !(ACCEL_MIN..=ACCEL_MAX).contains(&c) {
        return Err(GapError::validation(format!(
            "acceleration characteristic must be within {ACCEL_MIN}..={ACCEL_MAX}, got {c}"
        )));
    }
    Ok(())
}
