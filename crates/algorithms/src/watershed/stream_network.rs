//! Stream network extraction
//!
//! Stream pixels are data pixels inside the delineation mask. A channel
//! starts at every head (no stream pixel drains into it) and every junction
//! (two or more stream pixels drain into it), then follows the flow until
//! the next pixel leaves the mask or starts another channel.

use super::FlowGraph;
use burnflow_core::raster::{GeoTransform, Raster};
use burnflow_core::{Error, Result};
use geo::{Coord, Euclidean, Length, LineString};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Parameters for network extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Split channels longer than this (map units) into equal pieces.
    /// Must be at least twice the pixel diagonal.
    pub max_length: Option<f64>,
}

/// One stream channel of the network
#[derive(Debug, Clone)]
pub(crate) struct Channel {
    /// Pixels from upstream to downstream
    pub pixels: Vec<(usize, usize)>,
    /// Pixel centers, ending at the child's first pixel when there is one
    pub line: LineString<f64>,
    /// Index of the downstream channel
    pub child: Option<usize>,
}

/// Extract the stream network as polylines ordered upstream to downstream.
///
/// # Arguments
/// * `flow` - D8 flow direction raster
/// * `mask` - Pixels that may hold streams, aligned with `flow`
/// * `params` - Optional maximum segment length
///
/// # Returns
/// One linestring per segment, in map coordinates of pixel centers
pub fn network(
    flow: &Raster<u8>,
    mask: &Raster<bool>,
    params: NetworkParams,
) -> Result<Vec<LineString<f64>>> {
    flow.align_with(mask, "mask")?;
    let graph = FlowGraph::new(flow)?;
    let stream = mask.data_mask() & mask.data();
    let channels = channels(&graph, &stream, params.max_length)?;
    Ok(channels.into_iter().map(|c| c.line).collect())
}

/// Delineate channels over the pixels flagged in `stream`
pub(crate) fn channels(
    graph: &FlowGraph,
    stream: &Array2<bool>,
    max_length: Option<f64>,
) -> Result<Vec<Channel>> {
    let (rows, cols) = graph.shape();
    let transform = *graph.raster().transform();
    let stream = Array2::from_shape_fn((rows, cols), |(r, c)| stream[(r, c)] && graph.is_data(r, c));

    // Stream pixels draining into each stream pixel
    let mut inflow = Array2::<u8>::zeros((rows, cols));
    for ((row, col), &s) in stream.indexed_iter() {
        if !s {
            continue;
        }
        if let Some(next) = graph.downstream(row, col) {
            if stream[next] {
                inflow[next] += 1;
            }
        }
    }

    let mut starts: HashMap<(usize, usize), usize> = HashMap::new();
    let mut order = Vec::new();
    for ((row, col), &s) in stream.indexed_iter() {
        if s && inflow[(row, col)] != 1 {
            starts.insert((row, col), order.len());
            order.push((row, col));
        }
    }

    let limit = rows * cols;
    let mut channels = Vec::with_capacity(order.len());
    for &start in &order {
        let mut pixels = vec![start];
        let mut current = start;
        let mut child = None;
        while let Some(next) = graph.downstream(current.0, current.1) {
            if !stream[next] {
                break;
            }
            if let Some(&k) = starts.get(&next) {
                child = Some(k);
                break;
            }
            // Flow cycles never reach a start pixel
            if pixels.len() > limit {
                break;
            }
            pixels.push(next);
            current = next;
        }

        let mut coords: Vec<Coord<f64>> = pixels.iter().map(|&p| center(&transform, p)).collect();
        if let Some(k) = child {
            coords.push(center(&transform, order[k]));
        }
        channels.push(Channel {
            pixels,
            line: LineString::new(coords),
            child,
        });
    }
    debug!(channels = channels.len(), "delineated stream channels");

    match max_length {
        Some(max_length) => split(channels, max_length, &transform),
        None => Ok(channels),
    }
}

fn center(transform: &GeoTransform, (row, col): (usize, usize)) -> Coord<f64> {
    let (x, y) = transform.pixel_to_geo(col, row);
    Coord { x, y }
}

/// Cumulative distance along a polyline at each vertex
fn distances(line: &LineString<f64>) -> Vec<f64> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(line.0.len());
    for (k, c) in line.0.iter().enumerate() {
        if k > 0 {
            let p = line.0[k - 1];
            total += (c.x - p.x).hypot(c.y - p.y);
        }
        out.push(total);
    }
    out
}

/// Point at arc length `t` along a polyline
fn point_at(line: &LineString<f64>, cum: &[f64], t: f64) -> Coord<f64> {
    let coords = &line.0;
    let k = cum.partition_point(|&d| d < t).clamp(1, coords.len() - 1);
    let (a, b) = (coords[k - 1], coords[k]);
    let span = cum[k] - cum[k - 1];
    let f = if span > 0.0 { ((t - cum[k - 1]) / span).clamp(0.0, 1.0) } else { 0.0 };
    Coord {
        x: a.x + f * (b.x - a.x),
        y: a.y + f * (b.y - a.y),
    }
}

/// Split channels longer than `max_length` into equal-length pieces.
///
/// Each pixel goes to the piece covering its distance along the channel.
/// Piece geometries are cut at the split distances, and each piece drains
/// into the next; the last piece keeps the original child.
fn split(channels: Vec<Channel>, max_length: f64, transform: &GeoTransform) -> Result<Vec<Channel>> {
    let min_length = 2.0 * transform.pixel_diagonal();
    if !max_length.is_finite() || max_length < min_length {
        return Err(Error::value(
            "max_length",
            &format!("must be at least twice the pixel diagonal ({min_length})"),
            0,
            max_length,
        ));
    }

    let npieces: Vec<usize> = channels
        .iter()
        .map(|c| {
            let length = c.line.length::<Euclidean>();
            if length > max_length {
                (length / max_length).ceil() as usize
            } else {
                1
            }
        })
        .collect();
    let mut offsets = Vec::with_capacity(channels.len());
    let mut total = 0;
    for &n in &npieces {
        offsets.push(total);
        total += n;
    }

    let mut out = Vec::with_capacity(total);
    for (channel, &n) in channels.into_iter().zip(&npieces) {
        let child = channel.child.map(|k| offsets[k]);
        if n == 1 {
            out.push(Channel { child, ..channel });
            continue;
        }

        let base = out.len();
        let cum = distances(&channel.line);
        let length = cum[cum.len() - 1];
        let step = length / n as f64;
        let tol = 1e-9 * length;

        let mut pieces: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
        for (k, &p) in channel.pixels.iter().enumerate() {
            let j = ((cum[k] / step + 1e-9).floor() as usize).min(n - 1);
            pieces[j].push(p);
        }

        for (j, pixels) in pieces.into_iter().enumerate() {
            let (a, b) = (j as f64 * step, (j + 1) as f64 * step);
            let mut coords = vec![point_at(&channel.line, &cum, a)];
            for (k, c) in channel.line.0.iter().enumerate() {
                if cum[k] > a + tol && cum[k] < b - tol {
                    coords.push(*c);
                }
            }
            coords.push(point_at(&channel.line, &cum, b));
            out.push(Channel {
                pixels,
                line: LineString::new(coords),
                child: if j + 1 < n { Some(base + j + 1) } else { child },
            });
        }
    }
    debug!(before = npieces.len(), after = out.len(), max_length, "split long channels");
    Ok(out)
}
