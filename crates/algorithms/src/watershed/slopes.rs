//! Slopes along D8 flow paths

use super::FlowGraph;
use burnflow_core::d8;
use burnflow_core::raster::Raster;
use burnflow_core::Result;
use ndarray::Array2;

/// Gradient (rise/run) from each pixel to its downstream neighbor.
///
/// The run is the distance between pixel centers in map units. Pixels with
/// no downstream data neighbor, or NoData in either raster, are NaN.
///
/// # Arguments
/// * `dem` - DEM aligned with `flow`
/// * `flow` - D8 flow directions
pub fn slopes(dem: &Raster<f64>, flow: &Raster<u8>) -> Result<Raster<f64>> {
    dem.align_with(flow, "flow")?;
    let graph = FlowGraph::new(flow)?;
    let z = dem.to_f64().into_array();
    let transform = dem.transform();

    let mut out = Array2::from_elem(dem.shape(), f64::NAN);
    for ((row, col), value) in out.indexed_iter_mut() {
        if let Some(next) = graph.downstream(row, col) {
            let dir = graph.code(row, col);
            *value = (z[(row, col)] - z[next]) / d8::distance(dir, transform);
        }
    }
    dem.derive(out, Some(f64::NAN))
}
