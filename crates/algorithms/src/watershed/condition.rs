//! DEM conditioning
//!
//! Three optional passes, run in order:
//! 1. Fill pits: single cells lower than all eight neighbors are raised to
//!    the lowest neighbor.
//! 2. Fill depressions: Priority-Flood (Barnes et al. 2014) raises every
//!    cell that cannot drain to its spill elevation.
//! 3. Resolve flats: cells with no lower neighbor receive tiny elevation
//!    increments combining a gradient towards lower terrain and a gradient
//!    away from higher terrain (Barnes et al. 2014b), so D8 routing drains
//!    every flat that touches an outlet.
//!
//! Cells on the grid edge or next to NoData are treated as drains and are
//! never modified. NoData cells pass through unchanged.
//!
//! References:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.
//!
//! Barnes, R., Lehman, C., & Mulla, D. (2014b). An efficient assignment of
//! drainage direction over flat surfaces in raster digital elevation models.
//! *Computers & Geosciences*, 62, 128–135.

use burnflow_core::d8;
use burnflow_core::raster::Raster;
use burnflow_core::{Algorithm, Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use tracing::debug;

/// Elevation gap assumed when no flat touches higher terrain
const DEFAULT_GAP: f64 = 1e-5;

/// Parameters for DEM conditioning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionParams {
    /// Raise single-cell pits to their lowest neighbor
    pub fill_pits: bool,
    /// Fill multi-cell depressions to their spill elevation.
    /// Off by default: filled depressions become broad flats.
    pub fill_depressions: bool,
    /// Perturb flats so that every drainable flat cell gets a direction
    pub resolve_flats: bool,
}

impl Default for ConditionParams {
    fn default() -> Self {
        Self {
            fill_pits: true,
            fill_depressions: false,
            resolve_flats: true,
        }
    }
}

/// DEM conditioning algorithm
#[derive(Debug, Clone, Default)]
pub struct Condition;

impl Algorithm for Condition {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ConditionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Condition DEM"
    }

    fn description(&self) -> &'static str {
        "Fill pits and depressions and resolve flats in a DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        condition(&input, params)
    }
}

/// Condition a DEM for D8 routing.
///
/// # Arguments
/// * `dem` - Input DEM
/// * `params` - Which passes to run
///
/// # Returns
/// A new DEM aligned with the input, NoData preserved
pub fn condition(dem: &Raster<f64>, params: ConditionParams) -> Result<Raster<f64>> {
    let valid = dem.data().mapv(|v| !v.is_nan()) & dem.data_mask();
    let mut z = dem.data().clone();

    if params.fill_pits {
        let n = fill_pits(&mut z, &valid);
        debug!(filled = n, "filled pits");
    }
    if params.fill_depressions {
        let n = fill_depressions(&mut z, &valid);
        debug!(raised = n, "filled depressions");
    }
    if params.resolve_flats {
        let n = resolve_flats(&mut z, &valid);
        debug!(adjusted = n, "resolved flats");
    }

    dem.derive(z, dem.nodata())
}

/// In-grid neighbors of a cell
fn neighbors(row: usize, col: usize, shape: (usize, usize)) -> impl Iterator<Item = (usize, usize)> {
    (1..=8u8).filter_map(move |dir| d8::step(row, col, dir, shape))
}

/// A valid cell away from the edge whose eight neighbors are all valid
fn is_interior(row: usize, col: usize, valid: &Array2<bool>) -> bool {
    let (rows, cols) = valid.dim();
    valid[(row, col)]
        && row > 0
        && col > 0
        && row + 1 < rows
        && col + 1 < cols
        && neighbors(row, col, (rows, cols)).all(|p| valid[p])
}

fn fill_pits(z: &mut Array2<f64>, valid: &Array2<bool>) -> usize {
    let shape = z.dim();
    let mut filled = 0;
    for row in 0..shape.0 {
        for col in 0..shape.1 {
            if !is_interior(row, col, valid) {
                continue;
            }
            let lowest = neighbors(row, col, shape)
                .map(|p| z[p])
                .fold(f64::INFINITY, f64::min);
            if z[(row, col)] < lowest {
                z[(row, col)] = lowest;
                filled += 1;
            }
        }
    }
    filled
}

/// A cell in the priority queue, ordered by elevation (min-heap).
#[derive(Debug, Clone)]
struct Cell {
    elevation: f64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reverse ordering so BinaryHeap (max-heap) pops the lowest cell first,
// ties in row-major order
impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then_with(|| (other.row, other.col).cmp(&(self.row, self.col)))
    }
}

fn fill_depressions(z: &mut Array2<f64>, valid: &Array2<bool>) -> usize {
    let shape = z.dim();
    let mut closed = Array2::from_elem(shape, false);
    let mut heap = BinaryHeap::new();

    // Seed with cells that drain off the grid or into NoData
    for row in 0..shape.0 {
        for col in 0..shape.1 {
            if valid[(row, col)] && !is_interior(row, col, valid) {
                closed[(row, col)] = true;
                heap.push(Cell {
                    elevation: z[(row, col)],
                    row,
                    col,
                });
            }
        }
    }

    let mut raised = 0;
    while let Some(cell) = heap.pop() {
        for (nr, nc) in neighbors(cell.row, cell.col, shape) {
            if !valid[(nr, nc)] || closed[(nr, nc)] {
                continue;
            }
            closed[(nr, nc)] = true;
            if z[(nr, nc)] < cell.elevation {
                z[(nr, nc)] = cell.elevation;
                raised += 1;
            }
            heap.push(Cell {
                elevation: z[(nr, nc)],
                row: nr,
                col: nc,
            });
        }
    }
    raised
}

/// Breadth-first distance (starting at 1) from `seeds` through cells of
/// the same flat label.
fn flat_gradient(seeds: &[(usize, usize)], labels: &Array2<usize>) -> Array2<u32> {
    let shape = labels.dim();
    let mut dist = Array2::<u32>::zeros(shape);
    let mut queue = VecDeque::new();
    for &seed in seeds {
        dist[seed] = 1;
        queue.push_back(seed);
    }
    while let Some((row, col)) = queue.pop_front() {
        let label = labels[(row, col)];
        let next = dist[(row, col)] + 1;
        for p in neighbors(row, col, shape) {
            if labels[p] == label && dist[p] == 0 {
                dist[p] = next;
                queue.push_back(p);
            }
        }
    }
    dist
}

fn resolve_flats(z: &mut Array2<f64>, valid: &Array2<bool>) -> usize {
    let shape = z.dim();

    let mut flat = Array2::from_elem(shape, false);
    for ((row, col), is_flat) in flat.indexed_iter_mut() {
        *is_flat = is_interior(row, col, valid)
            && neighbors(row, col, shape).all(|p| z[p] >= z[(row, col)]);
    }

    // Label connected flats of equal elevation
    let mut labels = Array2::<usize>::zeros(shape);
    let mut nlabels = 0;
    for row in 0..shape.0 {
        for col in 0..shape.1 {
            if !flat[(row, col)] || labels[(row, col)] != 0 {
                continue;
            }
            nlabels += 1;
            labels[(row, col)] = nlabels;
            let mut queue = VecDeque::from([(row, col)]);
            while let Some(c) = queue.pop_front() {
                for p in neighbors(c.0, c.1, shape) {
                    if flat[p] && labels[p] == 0 && z[p] == z[c] {
                        labels[p] = nlabels;
                        queue.push_back(p);
                    }
                }
            }
        }
    }
    if nlabels == 0 {
        return 0;
    }

    // Low edges touch a draining cell of the same elevation, high edges
    // touch higher terrain
    let mut low = Vec::new();
    let mut high = Vec::new();
    let mut has_low = vec![false; nlabels + 1];
    let mut min_gap = f64::INFINITY;
    for row in 0..shape.0 {
        for col in 0..shape.1 {
            if !flat[(row, col)] {
                continue;
            }
            let zc = z[(row, col)];
            let mut is_low = false;
            let mut is_high = false;
            for p in neighbors(row, col, shape) {
                if !flat[p] && z[p] == zc {
                    is_low = true;
                } else if z[p] > zc {
                    is_high = true;
                    min_gap = min_gap.min(z[p] - zc);
                }
            }
            if is_low {
                low.push((row, col));
                has_low[labels[(row, col)]] = true;
            }
            if is_high {
                high.push((row, col));
            }
        }
    }

    // Flats with no outlet stay as they are
    for label in labels.iter_mut() {
        if !has_low[*label] {
            *label = 0;
        }
    }
    high.retain(|&c| labels[c] != 0);

    let towards = flat_gradient(&low, &labels);
    let away = flat_gradient(&high, &labels);

    let mut max_away = vec![0u32; nlabels + 1];
    for (c, &a) in away.indexed_iter() {
        let label = labels[c];
        max_away[label] = max_away[label].max(a);
    }

    let mut increments = Array2::<u32>::zeros(shape);
    let mut max_g = 0;
    for (c, g) in increments.indexed_iter_mut() {
        let label = labels[c];
        if label == 0 {
            continue;
        }
        let away_term = if away[c] > 0 { max_away[label] - away[c] } else { 0 };
        *g = 2 * towards[c] + away_term;
        max_g = max_g.max(*g);
    }

    if !min_gap.is_finite() {
        min_gap = DEFAULT_GAP;
    }
    let delta = min_gap / (2.0 * (max_g as f64 + 1.0));

    let mut adjusted = 0;
    for (c, &g) in increments.indexed_iter() {
        if g > 0 {
            z[c] += g as f64 * delta;
            adjusted += 1;
        }
    }
    adjusted
}
