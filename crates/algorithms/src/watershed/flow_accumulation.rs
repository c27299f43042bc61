//! Flow accumulation algorithm
//!
//! Sums per-pixel weights over every pixel's upstream contributing area,
//! the pixel itself included. With unit weights this is the upstream pixel
//! count.

use super::FlowGraph;
use burnflow_core::raster::Raster;
use burnflow_core::{Algorithm, Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Flow accumulation algorithm (unit weights, no mask)
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Calculate upstream contributing pixels from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input, None, None)
    }
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// # Algorithm
/// 1. Count incoming flows for each cell (in-degree)
/// 2. Start from cells with in-degree 0 (headwaters)
/// 3. Propagate downstream, adding each cell's total to its receiver
///
/// # Arguments
/// * `flow` - D8 flow direction raster
/// * `weights` - Per-pixel weights (default 1). NoData weights count as 0.
/// * `mask` - Pixels that contribute (default all). Masked-out pixels still
///   pass flow through; NoData mask pixels count as false.
///
/// # Returns
/// Raster<f64> of accumulated weights, NaN where `flow` is NoData
pub fn flow_accumulation(
    flow: &Raster<u8>,
    weights: Option<&Raster<f64>>,
    mask: Option<&Raster<bool>>,
) -> Result<Raster<f64>> {
    let graph = FlowGraph::new(flow)?;

    let mut w = match weights {
        Some(weights) => {
            flow.align_with(weights, "weights")?;
            let nodata = weights.nodata_mask();
            let mut w = weights.data().clone();
            w.zip_mut_with(&nodata, |v, &nd| {
                if nd {
                    *v = 0.0;
                }
            });
            w
        }
        None => Array2::from_elem(flow.shape(), 1.0),
    };

    if let Some(mask) = mask {
        flow.align_with(mask, "mask")?;
        let nodata = mask.nodata_mask();
        for ((v, &keep), &nd) in w.iter_mut().zip(mask.data().iter()).zip(nodata.iter()) {
            if !keep || nd {
                *v = 0.0;
            }
        }
    }

    let acc = graph.accumulate(&w);
    debug!(rows = flow.rows(), cols = flow.cols(), "computed flow accumulation");
    flow.derive(acc, Some(f64::NAN))
}
