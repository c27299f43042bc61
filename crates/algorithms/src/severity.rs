//! Burn severity classes
//!
//! BARC4 rasters hold four classes: 1 unburned, 2 low, 3 moderate, 4 high.
//! 0 is NoData in estimated rasters.

use crate::maybe_rayon::*;
use burnflow_core::raster::{Raster, RasterElement};
use burnflow_core::{validate, Error, Result};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default dNBR thresholds between low/moderate/high classes
pub const DEFAULT_THRESHOLDS: [f64; 3] = [125.0, 250.0, 500.0];

/// A burn severity level. `Burned` stands for low, moderate and high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Unburned,
    Low,
    Moderate,
    High,
    Burned,
}

impl Level {
    /// BARC4 class values matched by this level
    pub fn classes(self) -> &'static [u8] {
        match self {
            Level::Unburned => &[1],
            Level::Low => &[2],
            Level::Moderate => &[3],
            Level::High => &[4],
            Level::Burned => &[2, 3, 4],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Unburned => "unburned",
            Level::Low => "low",
            Level::Moderate => "moderate",
            Level::High => "high",
            Level::Burned => "burned",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "unburned" => Ok(Level::Unburned),
            "low" => Ok(Level::Low),
            "moderate" => Ok(Level::Moderate),
            "high" => Ok(Level::High),
            "burned" => Ok(Level::Burned),
            _ => Err(Error::InvalidParameter {
                name: "severity level",
                value: s.to_string(),
                reason: "supported levels are unburned, low, moderate, high, burned".into(),
            }),
        }
    }
}

/// Boolean raster of pixels whose BARC4 class matches any of `levels`.
///
/// Data pixels must hold classes 1 through 4. NoData pixels are false.
pub fn mask<T: RasterElement>(barc4: &Raster<T>, levels: &[Level]) -> Result<Raster<bool>> {
    let values = barc4.to_f64().into_array();
    validate::integers("barc4", &values, None)?;
    validate::inrange("barc4", &values, 1.0, 4.0, None)?;

    let mut wanted = [false; 5];
    for level in levels {
        for &class in level.classes() {
            wanted[class as usize] = true;
        }
    }

    let out = values.mapv(|v| !v.is_nan() && wanted[v as usize]);
    debug!(levels = levels.len(), "built severity mask");
    barc4.derive(out, None)
}

/// Classify a continuous burn measure (such as dNBR) into BARC4 classes.
///
/// # Arguments
/// * `values` - Burn measure raster
/// * `thresholds` - Strictly increasing lower bounds of the low, moderate
///   and high classes; see [`DEFAULT_THRESHOLDS`]
///
/// # Returns
/// Raster<u8> of classes 1-4, with 0 (NoData) where the input is NoData,
/// NaN or infinite
pub fn estimate<T: RasterElement>(values: &Raster<T>, thresholds: [f64; 3]) -> Result<Raster<u8>> {
    for (k, &t) in thresholds.iter().enumerate() {
        if !t.is_finite() {
            return Err(Error::value("thresholds", "must be finite", k, t));
        }
    }
    validate::sorted("thresholds", &thresholds)?;

    let (rows, cols) = values.shape();
    let data = values.to_f64().into_array();
    let classes: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| classify(data[(row, col)], &thresholds))
                .collect::<Vec<_>>()
        })
        .collect();

    let out = Array2::from_shape_vec((rows, cols), classes).map_err(|_| Error::Shape {
        name: "barc4".into(),
        expected: vec![rows, cols],
        actual: vec![rows * cols],
    })?;
    values.derive(out, Some(0))
}

fn classify(value: f64, thresholds: &[f64; 3]) -> u8 {
    if !value.is_finite() {
        0
    } else {
        1 + thresholds.iter().filter(|&&t| value >= t).count() as u8
    }
}
