//! Watershed analysis over D8 flow directions
//!
//! Pure raster kernels, leaves first:
//! - Condition: fill pits and depressions, resolve flats
//! - Flow direction: D8 steepest descent
//! - Slopes and relief along flow paths
//! - Flow accumulation: basic, weighted and masked
//! - Catchment: every pixel draining through an outlet
//! - Network: stream channels as linestrings

mod catchment;
mod condition;
mod flow_accumulation;
mod flow_direction;
mod relief;
mod slopes;
pub(crate) mod stream_network;

pub use catchment::catchment;
pub use condition::{condition, Condition, ConditionParams};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};
pub use relief::relief;
pub use slopes::slopes;
pub use stream_network::{network, NetworkParams};

use burnflow_core::d8;
use burnflow_core::raster::Raster;
use burnflow_core::{validate, RasterElement, Result};
use ndarray::Array2;
use std::collections::VecDeque;

/// A validated D8 flow raster viewed as a graph.
///
/// Every data pixel has one outgoing edge to the neighbor its code points
/// at, unless that neighbor is off the grid or NoData. NoData pixels hold
/// code 0 and have no edges.
#[derive(Debug, Clone)]
pub(crate) struct FlowGraph {
    flow: Raster<u8>,
}

impl FlowGraph {
    /// Validate a flow raster. A NoData value other than 0 is rewritten to 0.
    pub fn new(flow: &Raster<u8>) -> Result<Self> {
        let nodata = flow.nodata();
        let codes = flow.data().mapv(|v| if v.is_nodata(nodata) { 0 } else { v });
        validate::flow("flow", &codes)?;
        Ok(Self {
            flow: flow.derive(codes, Some(0))?,
        })
    }

    /// Flow raster with NoData 0
    pub fn raster(&self) -> &Raster<u8> {
        &self.flow
    }

    pub fn shape(&self) -> (usize, usize) {
        self.flow.shape()
    }

    /// Flow code at a pixel
    pub fn code(&self, row: usize, col: usize) -> u8 {
        self.flow.data()[(row, col)]
    }

    /// Whether a pixel carries a flow direction
    pub fn is_data(&self, row: usize, col: usize) -> bool {
        self.code(row, col) != 0
    }

    /// Downstream neighbor of a pixel, if it is an in-grid data pixel
    pub fn downstream(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        let next = d8::step(row, col, self.code(row, col), self.shape())?;
        self.is_data(next.0, next.1).then_some(next)
    }

    /// Neighbors that drain directly into (row, col)
    pub fn upstream(&self, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let shape = self.shape();
        (1..=8u8).filter_map(move |dir| {
            let (nr, nc) = d8::step(row, col, dir, shape)?;
            (self.code(nr, nc) == d8::opposite(dir)).then_some((nr, nc))
        })
    }

    /// Number of data pixels draining into each pixel
    pub fn in_degree(&self) -> Array2<u32> {
        let (rows, cols) = self.shape();
        let mut in_degree = Array2::<u32>::zeros((rows, cols));
        for row in 0..rows {
            for col in 0..cols {
                if let Some(next) = self.downstream(row, col) {
                    in_degree[next] += 1;
                }
            }
        }
        in_degree
    }

    /// Data pixels ordered so every pixel follows all of its upstream pixels.
    ///
    /// Pixels on a flow cycle never become ready and are left out.
    pub fn topological_order(&self) -> Vec<(usize, usize)> {
        let (rows, cols) = self.shape();
        let mut in_degree = self.in_degree();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        for row in 0..rows {
            for col in 0..cols {
                if self.is_data(row, col) && in_degree[(row, col)] == 0 {
                    queue.push_back((row, col));
                }
            }
        }

        let mut order = Vec::with_capacity(rows * cols);
        while let Some((row, col)) = queue.pop_front() {
            order.push((row, col));
            if let Some(next) = self.downstream(row, col) {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Sum `weights` over every pixel's upstream area, itself included.
    ///
    /// NoData flow pixels are NaN in the result.
    pub fn accumulate(&self, weights: &Array2<f64>) -> Array2<f64> {
        let mut acc = weights.clone();
        for (row, col) in self.topological_order() {
            if let Some(next) = self.downstream(row, col) {
                let value = acc[(row, col)];
                acc[next] += value;
            }
        }
        for ((row, col), value) in acc.indexed_iter_mut() {
            if !self.is_data(row, col) {
                *value = f64::NAN;
            }
        }
        acc
    }

    /// Every pixel draining through `outlet`, found by reverse BFS.
    ///
    /// Pixels for which `barrier` returns true are not entered. The outlet
    /// itself is always included.
    pub fn upstream_pixels(
        &self,
        outlet: (usize, usize),
        barrier: impl Fn(usize, usize) -> bool,
    ) -> Vec<(usize, usize)> {
        let mut pixels = vec![outlet];
        let mut queue = VecDeque::from([outlet]);
        while let Some((row, col)) = queue.pop_front() {
            for (nr, nc) in self.upstream(row, col) {
                if (nr, nc) != outlet && !barrier(nr, nc) {
                    pixels.push((nr, nc));
                    queue.push_back((nr, nc));
                }
            }
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_flow_graph_edges() {
        // 1 -> 1 -> off-grid, bottom row drains north
        let flow = Raster::from_array(array![[1u8, 1, 1], [3, 3, 0]]).unwrap();
        let graph = FlowGraph::new(&flow).unwrap();

        assert_eq!(graph.downstream(0, 0), Some((0, 1)));
        assert_eq!(graph.downstream(0, 2), None);
        assert_eq!(graph.downstream(1, 2), None);

        let mut up: Vec<_> = graph.upstream(0, 1).collect();
        up.sort();
        assert_eq!(up, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_nodata_code_rewritten() {
        let flow = Raster::from_parts(array![[1u8, 255]], Some(255.0), None, None).unwrap();
        let graph = FlowGraph::new(&flow).unwrap();
        assert!(!graph.is_data(0, 1));
        assert_eq!(graph.downstream(0, 0), None);
    }

    #[test]
    fn test_invalid_codes_rejected() {
        let flow = Raster::from_array(array![[1u8, 9]]).unwrap();
        assert!(FlowGraph::new(&flow).is_err());
    }

    #[test]
    fn test_cycle_left_out_of_order() {
        // Two pixels pointing at each other
        let flow = Raster::from_array(array![[1u8, 5, 7]]).unwrap();
        let graph = FlowGraph::new(&flow).unwrap();
        let order = graph.topological_order();
        assert_eq!(order, vec![(0, 2)]);
    }
}
