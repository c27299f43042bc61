//! D8 flow direction algorithm
//!
//! Calculates the direction of flow from each cell to its steepest
//! downslope neighbor using the D8 (deterministic eight-node) method.
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = NoData or unresolved (pit/flat), 1-8 = direction to steepest neighbor
//!
//! A border cell with no lower neighbor drains off the grid.

use crate::maybe_rayon::*;
use burnflow_core::d8;
use burnflow_core::raster::Raster;
use burnflow_core::{Algorithm, Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a conditioned DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// The input DEM should be conditioned first for meaningful results.
/// Drops are measured per map unit, using the pixel width, height or
/// diagonal from the transform. Ties go to the lowest direction code.
/// Border cells with no lower neighbor point off the grid, corners along
/// the diagonal.
///
/// # Arguments
/// * `dem` - Input DEM (ideally conditioned)
///
/// # Returns
/// Raster<u8> with flow direction codes and NoData 0
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let nodata = dem.nodata();
    let transform = *dem.transform();
    let z = dem.view();
    let is_data = |v: f64| !v.is_nan() && !nodata.is_some_and(|nd| v == nd);

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];

            for col in 0..cols {
                let center = z[(row, col)];
                if !is_data(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                let mut best_dir: u8 = 0;

                for dir in 1..=8u8 {
                    let Some((nr, nc)) = d8::step(row, col, dir, (rows, cols)) else {
                        continue;
                    };
                    let neighbor = z[(nr, nc)];
                    if !is_data(neighbor) {
                        continue;
                    }

                    let drop = (center - neighbor) / d8::distance(dir, &transform);
                    if drop > max_drop {
                        max_drop = drop;
                        best_dir = dir;
                    }
                }

                if best_dir == 0 {
                    best_dir = d8::outward(row, col, (rows, cols)).unwrap_or(0);
                }
                row_data[col] = best_dir;
            }

            row_data
        })
        .collect();

    let data = Array2::from_shape_vec((rows, cols), output_data).map_err(|_| Error::Shape {
        name: "flow".into(),
        expected: vec![rows, cols],
        actual: vec![rows * cols],
    })?;
    debug!(
        rows,
        cols,
        unresolved = data.iter().filter(|&&d| d == 0).count(),
        "computed D8 flow directions"
    );
    dem.derive(data, Some(0))
}
