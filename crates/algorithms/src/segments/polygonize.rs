//! Raster to polygon conversion
//!
//! Regions of equal value are outlined by tracing the pixel edges that
//! separate them from other values. Edges run clockwise on screen (rows
//! downward) with the region on their right, so shells come out clockwise
//! and holes counter-clockwise. At a vertex shared by two diagonal pixels
//! the trace turns right first, which keeps regions 4-connected.

use burnflow_core::raster::{GeoTransform, Raster, RasterElement};
use geo::{Area, Contains, Coord, LineString, MapCoords, MultiPolygon, Point, Polygon};
use std::collections::{BTreeMap, HashMap};

/// Corner of the pixel lattice as (row, col)
type Vertex = (usize, usize);

/// Edge directions in clockwise screen order: E, S, W, N
const STEPS: [(isize, isize); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    dir: usize,
}

impl Edge {
    fn end(&self) -> Vertex {
        let (dr, dc) = STEPS[self.dir];
        (
            (self.start.0 as isize + dr) as usize,
            (self.start.1 as isize + dc) as usize,
        )
    }
}

/// Outline every region of a raster, grouped by value.
///
/// NoData pixels are skipped. Coordinates are pixel corners in map units.
pub(crate) fn polygonize<T>(raster: &Raster<T>) -> BTreeMap<T, MultiPolygon<f64>>
where
    T: RasterElement + Ord,
{
    let data = raster.data();
    let (rows, cols) = raster.shape();
    let differs = |v: T, row: isize, col: isize| {
        row < 0
            || col < 0
            || row >= rows as isize
            || col >= cols as isize
            || data[(row as usize, col as usize)] != v
    };

    let mut edges: BTreeMap<T, Vec<Edge>> = BTreeMap::new();
    for ((row, col), &v) in data.indexed_iter() {
        if raster.is_nodata(v) {
            continue;
        }
        let list = edges.entry(v).or_default();
        let (r, c) = (row as isize, col as isize);
        if differs(v, r - 1, c) {
            list.push(Edge { start: (row, col), dir: 0 });
        }
        if differs(v, r, c + 1) {
            list.push(Edge { start: (row, col + 1), dir: 1 });
        }
        if differs(v, r + 1, c) {
            list.push(Edge { start: (row + 1, col + 1), dir: 2 });
        }
        if differs(v, r, c - 1) {
            list.push(Edge { start: (row + 1, col), dir: 3 });
        }
    }

    let transform = *raster.transform();
    edges
        .into_iter()
        .map(|(value, edges)| (value, assemble(trace(&edges), &transform)))
        .collect()
}

/// Follow edges into closed rings of corner vertices
fn trace(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (k, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.start).or_default().push(k);
    }

    let next = |edge: &Edge| -> Option<usize> {
        let candidates = outgoing.get(&edge.end())?;
        // Right, straight, then left
        [(edge.dir + 1) % 4, edge.dir, (edge.dir + 3) % 4]
            .into_iter()
            .find_map(|dir| candidates.iter().copied().find(|&k| edges[k].dir == dir))
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let mut ring = Vec::new();
        let mut k = first;
        loop {
            used[k] = true;
            let Some(n) = next(&edges[k]) else { break };
            // Keep corners only
            if edges[n].dir != edges[k].dir {
                ring.push(edges[k].end());
            }
            if n == first || used[n] {
                break;
            }
            k = n;
        }
        if ring.len() >= 4 {
            rings.push(ring);
        }
    }
    rings
}

/// Twice the signed area in (x = col, y = row) space; shells are positive
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (r0, c0) = ring[i];
            let (r1, c1) = ring[(i + 1) % n];
            c0 as i64 * r1 as i64 - c1 as i64 * r0 as i64
        })
        .sum()
}

fn lattice_ring(ring: &[Vertex]) -> LineString<f64> {
    ring.iter()
        .map(|&(r, c)| Coord {
            x: c as f64,
            y: r as f64,
        })
        .collect()
}

/// Assign holes to the smallest shell containing them
fn assemble(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> MultiPolygon<f64> {
    let (shells, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|r| signed_area2(r) > 0);

    let shells: Vec<Polygon<f64>> = shells
        .iter()
        .map(|r| Polygon::new(lattice_ring(r), vec![]))
        .collect();
    let areas: Vec<f64> = shells.iter().map(|p| p.unsigned_area()).collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];

    for hole in &holes {
        let (a, b) = (hole[0], hole[1]);
        let midpoint = Point::new(
            (a.1 + b.1) as f64 / 2.0,
            (a.0 + b.0) as f64 / 2.0,
        );
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.contains(&midpoint))
            .min_by(|(i, _), (j, _)| areas[*i].total_cmp(&areas[*j]))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            interiors[i].push(lattice_ring(hole));
        }
    }

    let polygons: Vec<Polygon<f64>> = shells
        .into_iter()
        .zip(interiors)
        .map(|(shell, interiors)| Polygon::new(shell.exterior().clone(), interiors))
        .map(|polygon| {
            polygon.map_coords(|c| {
                let (x, y) = transform.pixel_to_geo_f(c.x, c.y);
                Coord { x, y }
            })
        })
        .collect();
    MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn raster(data: ndarray::Array2<u32>) -> Raster<u32> {
        let mut r = Raster::from_array(data).unwrap();
        r.set_nodata(Some(0));
        r
    }

    #[test]
    fn test_single_pixel() {
        let r = raster(array![[0, 0, 0], [0, 5, 0], [0, 0, 0]]);
        let polygons = polygonize(&r);
        assert_eq!(polygons.len(), 1);
        let mp = &polygons[&5];
        assert_eq!(mp.0.len(), 1);
        // Four corners plus the closing vertex
        assert_eq!(mp.0[0].exterior().0.len(), 5);
        assert_relative_eq!(mp.unsigned_area(), 1.0);
        // Default transform: top-left at origin, rows going south
        assert!(mp.0[0].exterior().0.contains(&Coord { x: 1.0, y: -1.0 }));
        assert!(mp.0[0].exterior().0.contains(&Coord { x: 2.0, y: -2.0 }));
    }

    #[test]
    fn test_collinear_vertices_dropped() {
        // L shape: six corners
        let r = raster(array![[1, 1], [1, 0]]);
        let mp = &polygonize(&r)[&1];
        assert_eq!(mp.0[0].exterior().0.len(), 7);
        assert_relative_eq!(mp.unsigned_area(), 3.0);
    }

    #[test]
    fn test_hole_assigned_to_shell() {
        let r = raster(array![[1, 1, 1], [1, 0, 1], [1, 1, 1]]);
        let mp = &polygonize(&r)[&1];
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_relative_eq!(mp.unsigned_area(), 8.0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate() {
        let r = raster(array![[2, 0], [0, 2]]);
        let mp = &polygonize(&r)[&2];
        assert_eq!(mp.0.len(), 2);
        assert_relative_eq!(mp.unsigned_area(), 2.0);
    }

    #[test]
    fn test_island_inside_hole() {
        let r = raster(array![
            [1, 1, 1, 1, 1],
            [1, 3, 3, 3, 1],
            [1, 3, 1, 3, 1],
            [1, 3, 3, 3, 1],
            [1, 1, 1, 1, 1],
        ]);
        let polygons = polygonize(&r);
        let ones = &polygons[&1];
        assert_eq!(ones.0.len(), 2);
        assert_eq!(ones.0[0].interiors().len(), 1);
        assert_eq!(ones.0[1].interiors().len(), 0);
        assert_relative_eq!(ones.unsigned_area(), 17.0);

        let threes = &polygons[&3];
        assert_eq!(threes.0.len(), 1);
        assert_eq!(threes.0[0].interiors().len(), 1);
        assert_relative_eq!(threes.unsigned_area(), 8.0);
    }

    #[test]
    fn test_map_coordinates() {
        let mut r = raster(array![[4, 4]]);
        r.set_transform(GeoTransform::new(100.0, 500.0, 10.0, -10.0));
        let mp = &polygonize(&r)[&4];
        let ring = &mp.0[0].exterior().0;
        assert_eq!(ring.len(), 5);
        assert!(ring.contains(&Coord { x: 100.0, y: 500.0 }));
        assert!(ring.contains(&Coord { x: 120.0, y: 490.0 }));
        assert_relative_eq!(mp.unsigned_area(), 200.0);
    }
}
