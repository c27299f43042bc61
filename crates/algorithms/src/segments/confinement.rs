//! Confinement angles
//!
//! For each stream pixel, the terrain is sampled along the two directions
//! perpendicular to the flow. Each side slope is the rise from the pixel to
//! the highest sample within `neighborhood` pixels, over the run of
//! `neighborhood` steps. The confinement angle is
//!
//! ```text
//! theta = 180 - (atan(s_left) + atan(s_right)) * 180 / pi
//! ```
//!
//! so an unconfined channel on a flat plain measures 180 degrees and a deep
//! slot approaches 0.

use super::summary::Statistic;
use super::Segments;
use crate::maybe_rayon::*;
use burnflow_core::d8;
use burnflow_core::raster::{GeoTransform, Raster};
use burnflow_core::{Error, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for confinement angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfinementParams {
    /// Number of pixels sampled on each side of the channel
    pub neighborhood: usize,
    /// DEM units per map unit, for DEMs not in map units
    pub dem_per_unit: f64,
}

impl Default for ConfinementParams {
    fn default() -> Self {
        Self {
            neighborhood: 4,
            dem_per_unit: 1.0,
        }
    }
}

impl Segments {
    /// Mean confinement angle (degrees) over each segment's pixels.
    ///
    /// Pixels with no valid sample on either side are skipped; a segment
    /// with no usable pixel is NaN.
    pub fn confinement(&self, dem: &Raster<f64>, params: ConfinementParams) -> Result<Array1<f64>> {
        if params.neighborhood == 0 {
            return Err(Error::InvalidParameter {
                name: "neighborhood",
                value: "0".into(),
                reason: "must be at least 1 pixel".into(),
            });
        }
        if !(params.dem_per_unit.is_finite() && params.dem_per_unit > 0.0) {
            return Err(Error::value("dem_per_unit", "must be positive", 0, params.dem_per_unit));
        }
        self.check_raster(dem, "dem")?;

        let z = dem.to_f64().into_array();
        let transform = *self.transform();
        let out: Vec<f64> = (0..self.len())
            .into_par_iter()
            .map(|i| {
                let angles: Vec<f64> = self.pixels[i]
                    .iter()
                    .map(|&(row, col)| {
                        let dir = self.graph.code(row, col);
                        pixel_angle(&z, &transform, row, col, dir, &params)
                    })
                    .collect();
                Statistic::NanMean.apply(&angles)
            })
            .collect();
        debug!(segments = self.len(), neighborhood = params.neighborhood, "computed confinement");
        Ok(Array1::from(out))
    }
}

fn pixel_angle(
    z: &Array2<f64>,
    transform: &GeoTransform,
    row: usize,
    col: usize,
    dir: u8,
    params: &ConfinementParams,
) -> f64 {
    let center = z[(row, col)];
    if center.is_nan() || !d8::is_valid(dir) {
        return f64::NAN;
    }
    let left = side_slope(z, transform, row, col, d8::rotate(dir, 2), center, params);
    let right = side_slope(z, transform, row, col, d8::rotate(dir, -2), center, params);
    180.0 - (left.atan() + right.atan()).to_degrees()
}

fn side_slope(
    z: &Array2<f64>,
    transform: &GeoTransform,
    row: usize,
    col: usize,
    side: u8,
    center: f64,
    params: &ConfinementParams,
) -> f64 {
    let n = params.neighborhood;
    let highest = (1..=n)
        .filter_map(|k| d8::offset(row, col, side, k, z.dim()))
        .map(|p| z[p])
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max);
    let rise = (highest - center) / params.dem_per_unit;
    rise / (n as f64 * d8::distance(side, transform))
}
