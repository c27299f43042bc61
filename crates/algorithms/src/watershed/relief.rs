//! Vertical relief
//!
//! Ridge cells are data cells with no inflow. Ridge elevations are carried
//! downstream in topological order, keeping the highest ridge at every
//! confluence, and relief is that ridge elevation minus the cell's own.

use super::FlowGraph;
use burnflow_core::raster::Raster;
use burnflow_core::Result;
use ndarray::Array2;
use tracing::debug;

/// Elevation drop from the highest upstream ridge cell to each pixel.
///
/// Ridge cells have relief 0. NoData in either raster is NaN.
///
/// # Arguments
/// * `dem` - DEM aligned with `flow`
/// * `flow` - D8 flow directions
pub fn relief(dem: &Raster<f64>, flow: &Raster<u8>) -> Result<Raster<f64>> {
    dem.align_with(flow, "flow")?;
    let graph = FlowGraph::new(flow)?;
    let z = dem.to_f64().into_array();

    let mut ridge = Array2::from_elem(dem.shape(), f64::NEG_INFINITY);
    let in_degree = graph.in_degree();
    let order = graph.topological_order();
    for &(row, col) in &order {
        if in_degree[(row, col)] == 0 {
            ridge[(row, col)] = z[(row, col)];
        }
        if let Some(next) = graph.downstream(row, col) {
            let top = ridge[(row, col)];
            if top > ridge[next] || ridge[next].is_nan() {
                ridge[next] = top;
            }
        }
    }

    let mut out = Array2::from_elem(dem.shape(), f64::NAN);
    for &(row, col) in &order {
        out[(row, col)] = ridge[(row, col)] - z[(row, col)];
    }
    debug!(pixels = order.len(), "computed relief");
    dem.derive(out, Some(f64::NAN))
}
