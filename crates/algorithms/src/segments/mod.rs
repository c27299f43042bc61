//! Stream segment networks
//!
//! `Segments` holds the channels of a drainage network together with their
//! topology and the flow raster they came from. Each segment:
//! - is a polyline of pixel centers ordered upstream to downstream,
//! - owns the pixels it was traced through,
//! - has a stable id (1..N at construction, preserved by filtering),
//! - drains into at most one child segment,
//! - has at most two parent segments.
//!
//! A confluence of more than two segments is split into a chain of two-way
//! junctions. Each extra junction is a zero-length segment on the
//! confluence pixel.
//!
//! Per-segment values (summaries, catchment statistics, confinement) are
//! returned as arrays in segment order. Basins and exported features are
//! built on demand.

mod basins;
mod confinement;
mod export;
mod polygonize;
mod summary;
mod topology;
mod upslope;

pub use confinement::ConfinementParams;
pub use export::{FeatureType, Property};
pub use summary::Statistic;

use crate::watershed::stream_network::channels;
use crate::watershed::FlowGraph;
use burnflow_core::raster::{GeoTransform, Raster, RasterElement};
use burnflow_core::{Error, Result, CRS};
use geo::{Coord, Euclidean, Length, LineString};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

/// A stream segment network derived from D8 flow directions.
///
/// # Example
///
/// ```ignore
/// let mut segments = Segments::new(&flow, &mask, Some(500.0))?;
/// let area = segments.area(None)?;
/// let basins = segments.locate_basins(true)?;
/// ```
#[derive(Debug, Clone)]
pub struct Segments {
    graph: FlowGraph,
    /// Pixels of each segment, upstream to downstream
    pixels: Vec<Vec<(usize, usize)>>,
    lines: Vec<LineString<f64>>,
    ids: Vec<u32>,
    /// Id given to the next junction segment
    next_id: u32,
    /// Index of the downstream segment, or -1
    child: Vec<isize>,
    /// Indices of the (at most two) segments draining into each segment
    parents: Vec<Vec<usize>>,
    /// Cached terminal basins
    basins: Option<Raster<u32>>,
}

impl Segments {
    /// Build the network from a flow raster and a stream mask.
    ///
    /// # Arguments
    /// * `flow` - D8 flow directions
    /// * `mask` - Pixels that may hold streams, aligned with `flow`
    /// * `max_length` - Split longer segments into equal pieces. Must be at
    ///   least twice the pixel diagonal.
    pub fn new(flow: &Raster<u8>, mask: &Raster<bool>, max_length: Option<f64>) -> Result<Self> {
        flow.align_with(mask, "mask")?;
        let graph = FlowGraph::new(flow)?;
        let stream = mask.data_mask() & mask.data();
        let channels = channels(&graph, &stream, max_length)?;

        let n = channels.len();
        let mut child = Vec::with_capacity(n);
        let mut parents = vec![Vec::new(); n];
        for (i, channel) in channels.iter().enumerate() {
            match channel.child {
                Some(k) => {
                    child.push(k as isize);
                    parents[k].push(i);
                }
                None => child.push(-1),
            }
        }

        let (pixels, lines) = channels.into_iter().map(|c| (c.pixels, c.line)).unzip();
        let mut segments = Self {
            graph,
            pixels,
            lines,
            ids: (1..=n as u32).collect(),
            next_id: n as u32 + 1,
            child,
            parents,
            basins: None,
        };
        segments.split_confluences();
        info!(
            segments = n,
            terminal = segments.terminal_ids().len(),
            "built stream segment network"
        );
        Ok(segments)
    }

    // Basic accessors

    /// Number of segments
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Segment ids, stable across filtering
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Index of the segment with the given id
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }

    /// Segment polylines in map coordinates
    pub fn segments(&self) -> &[LineString<f64>] {
        &self.lines
    }

    /// Polyline length of every segment
    pub fn lengths(&self) -> Array1<f64> {
        self.lines.iter().map(|l| l.length::<Euclidean>()).collect()
    }

    /// Pixel indices (row, col) of every segment
    pub fn indices(&self) -> &[Vec<(usize, usize)>] {
        &self.pixels
    }

    /// Number of pixels in every segment
    pub fn npixels(&self) -> Vec<usize> {
        self.pixels.iter().map(Vec::len).collect()
    }

    /// Downstream segment index of every segment, -1 for terminal segments
    pub fn child(&self) -> &[isize] {
        &self.child
    }

    /// Upstream segment indices, one (N, 2) row per segment, padded with -1
    pub fn parents(&self) -> Array2<isize> {
        let mut out = Array2::from_elem((self.len(), 2), -1);
        for (i, parents) in self.parents.iter().enumerate() {
            for (k, &p) in parents.iter().enumerate() {
                out[(i, k)] = p as isize;
            }
        }
        out
    }

    /// Flow raster the network was built from (NoData 0)
    pub fn flow(&self) -> &Raster<u8> {
        self.graph.raster()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.flow().transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.flow().crs()
    }

    /// Raster shape of the network
    pub fn raster_shape(&self) -> (usize, usize) {
        self.graph.shape()
    }

    // Topology

    /// Whether each segment is a terminal outlet
    pub fn is_terminal(&self) -> Vec<bool> {
        self.child.iter().map(|&c| c < 0).collect()
    }

    /// Ids of the terminal segments
    pub fn terminal_ids(&self) -> Vec<u32> {
        self.ids
            .iter()
            .zip(&self.child)
            .filter(|(_, &c)| c < 0)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Give every segment at most two parents.
    ///
    /// A segment with parents p1, p2, ..., pm keeps p1 and drains the rest
    /// through a new junction segment, repeated until each junction joins
    /// two segments. Junctions sit on the segment's first pixel, have zero
    /// length and take fresh ids.
    pub(crate) fn split_confluences(&mut self) {
        let transform = *self.transform();
        let mut junctions = 0;
        let mut k = 0;
        while k < self.len() {
            if self.parents[k].len() > 2 {
                let junction = self.len();
                let upstream = self.parents[k].split_off(1);
                for &p in &upstream {
                    self.child[p] = junction as isize;
                }
                self.parents[k].push(junction);

                let pixel = self.pixels[k][0];
                let (x, y) = transform.pixel_to_geo(pixel.1, pixel.0);
                self.pixels.push(vec![pixel]);
                self.lines.push(LineString::new(vec![Coord { x, y }; 2]));
                self.ids.push(self.next_id);
                self.next_id += 1;
                self.child.push(k as isize);
                self.parents.push(upstream);
                junctions += 1;
            }
            k += 1;
        }
        if junctions > 0 {
            debug!(junctions, "split wide confluences");
        }
    }

    /// Downstream-most pixel of a segment
    pub(crate) fn outlet(&self, index: usize) -> (usize, usize) {
        let pixels = &self.pixels[index];
        pixels[pixels.len() - 1]
    }

    /// Outlet pixel (row, col) of every segment, or of terminal segments only
    pub fn outlets(&self, terminal_only: bool) -> Vec<(usize, usize)> {
        (0..self.len())
            .filter(|&i| !terminal_only || self.child[i] < 0)
            .map(|i| self.outlet(i))
            .collect()
    }

    // Rasters

    /// Raster of segment ids painted over segment pixels (NoData 0)
    pub fn raster(&self) -> Result<Raster<u32>> {
        let mut ids = Array2::<u32>::zeros(self.raster_shape());
        // Junctions share their pixel with the segment below, which wins
        for (pixels, &id) in self.pixels.iter().zip(&self.ids).rev() {
            for &p in pixels {
                ids[p] = id;
            }
        }
        self.flow().derive(ids, Some(0))
    }

    /// Boolean raster of the full catchment of one segment
    pub fn catchment(&self, index: usize) -> Result<Raster<bool>> {
        self.check_index(index)?;
        let mut mask = Array2::from_elem(self.raster_shape(), false);
        for p in self.graph.upstream_pixels(self.outlet(index), |_, _| false) {
            mask[p] = true;
        }
        self.flow().derive(mask, None)
    }

    // Validation helpers

    pub(crate) fn check_index(&self, index: usize) -> Result<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(Error::value(
                "segment index",
                &format!("must be less than the number of segments ({})", self.len()),
                0,
                index as f64,
            ))
        }
    }

    /// Require a raster aligned with the flow raster
    pub(crate) fn check_raster<T: RasterElement>(&self, raster: &Raster<T>, name: &str) -> Result<()> {
        self.flow().align_with(raster, name)
    }

    /// Require one value per segment
    pub(crate) fn check_length(&self, name: &str, len: usize) -> Result<()> {
        burnflow_core::validate::shape(name, &[len], &[self.len()])
    }
}
