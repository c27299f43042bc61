//! Slope unit conversions
//!
//! Slopes are gradients (rise over run, >= 0) unless stated otherwise.
//! NaN passes through every conversion.

use burnflow_core::{validate, Result};
use ndarray::{Array, ArrayBase, Data, Dimension};
use std::f64::consts::FRAC_PI_2;

/// Gradient to percent slope
pub fn to_percent<S, D>(slopes: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::positive("slopes", slopes, true, None)?;
    Ok(slopes.mapv(|g| g * 100.0))
}

/// Percent slope to gradient
pub fn from_percent<S, D>(percents: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::positive("percents", percents, true, None)?;
    Ok(percents.mapv(|p| p / 100.0))
}

/// Gradient to slope angle in radians
pub fn to_radians<S, D>(slopes: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::positive("slopes", slopes, true, None)?;
    Ok(slopes.mapv(f64::atan))
}

/// Slope angle in radians, within [0, pi/2], to gradient
pub fn from_radians<S, D>(angles: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::inrange("angles", angles, 0.0, FRAC_PI_2, None)?;
    Ok(angles.mapv(f64::tan))
}

/// Gradient to slope angle in degrees
pub fn to_degrees<S, D>(slopes: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::positive("slopes", slopes, true, None)?;
    Ok(slopes.mapv(|g| g.atan().to_degrees()))
}

/// Slope angle in degrees, within [0, 90], to gradient
pub fn from_degrees<S, D>(angles: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::inrange("angles", angles, 0.0, 90.0, None)?;
    Ok(angles.mapv(|a| a.to_radians().tan()))
}

/// Gradient to the sine of the slope angle
pub fn to_sine<S, D>(slopes: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::positive("slopes", slopes, true, None)?;
    Ok(slopes.mapv(|g| g.atan().sin()))
}

/// Sine of the slope angle, within [0, 1], to gradient
pub fn from_sine<S, D>(sines: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::inrange("sines", sines, 0.0, 1.0, None)?;
    Ok(sines.mapv(|s| s.asin().tan()))
}
