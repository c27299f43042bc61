//! Catchment delineation for a single outlet

use super::FlowGraph;
use burnflow_core::raster::Raster;
use burnflow_core::{Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Boolean raster of every pixel whose D8 path passes through (row, col).
///
/// Traces upstream from the outlet with a breadth-first search over the
/// inverted flow graph. The outlet itself is always included.
///
/// # Arguments
/// * `flow` - D8 flow direction raster
/// * `row`, `col` - Outlet pixel
pub fn catchment(flow: &Raster<u8>, row: usize, col: usize) -> Result<Raster<bool>> {
    let (rows, cols) = flow.shape();
    if row >= rows || col >= cols {
        return Err(Error::IndexOutOfBounds { row, col, rows, cols });
    }

    let graph = FlowGraph::new(flow)?;
    let pixels = graph.upstream_pixels((row, col), |_, _| false);

    let mut mask = Array2::from_elem((rows, cols), false);
    for &p in &pixels {
        mask[p] = true;
    }
    debug!(row, col, pixels = pixels.len(), "delineated catchment");
    flow.derive(mask, None)
}
