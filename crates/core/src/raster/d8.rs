//! D8 flow directions
//!
//! Directions are numbered counter-clockwise starting at the east neighbor
//! (TauDEM convention):
//! ```text
//!   4  3  2
//!   5  .  1
//!   6  7  8
//! ```
//! 0 means "no resolved direction" and is the NoData value of flow rasters.
//! Rasters using another numbering must be renumbered before use.

use super::GeoTransform;

/// Direction offsets: (row_offset, col_offset)
/// Indexed by direction code (1-8), 0 is unused
pub const OFFSETS: [(isize, isize); 9] = [
    (0, 0),   // 0: no flow
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Whether a flow code is a resolved direction
pub fn is_valid(dir: u8) -> bool {
    (1..=8).contains(&dir)
}

/// Whether a direction points along a diagonal
pub fn is_diagonal(dir: u8) -> bool {
    is_valid(dir) && dir % 2 == 0
}

/// Get the opposite direction
pub fn opposite(dir: u8) -> u8 {
    if dir == 0 {
        0
    } else {
        ((dir - 1 + 4) % 8) + 1
    }
}

/// Rotate a direction by `steps` eighth-turns (positive is counter-clockwise)
pub fn rotate(dir: u8, steps: i32) -> u8 {
    if !is_valid(dir) {
        return 0;
    }
    ((dir as i32 - 1 + steps).rem_euclid(8) + 1) as u8
}

/// Cell reached by taking `dir` from (row, col), or `None` off the grid
pub fn step(row: usize, col: usize, dir: u8, shape: (usize, usize)) -> Option<(usize, usize)> {
    offset(row, col, dir, 1, shape)
}

/// Cell `k` steps away along `dir`, or `None` off the grid
pub fn offset(
    row: usize,
    col: usize,
    dir: u8,
    k: usize,
    shape: (usize, usize),
) -> Option<(usize, usize)> {
    if !is_valid(dir) {
        return None;
    }
    let (dr, dc) = OFFSETS[dir as usize];
    let nr = row as isize + dr * k as isize;
    let nc = col as isize + dc * k as isize;
    if nr < 0 || nc < 0 || nr >= shape.0 as isize || nc >= shape.1 as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

/// Map-unit distance between pixel centers one step apart along `dir`
pub fn distance(dir: u8, transform: &GeoTransform) -> f64 {
    match dir {
        1 | 5 => transform.pixel_width(),
        3 | 7 => transform.pixel_height(),
        2 | 4 | 6 | 8 => transform.pixel_diagonal(),
        _ => 0.0,
    }
}

/// Direction code for a unit offset, if it is one of the eight neighbors
pub fn from_offset(dr: isize, dc: isize) -> Option<u8> {
    OFFSETS
        .iter()
        .skip(1)
        .position(|&o| o == (dr, dc))
        .map(|i| (i + 1) as u8)
}

/// Direction pointing off the grid from a border cell, or `None` inside.
///
/// Corners point along the diagonal.
pub fn outward(row: usize, col: usize, shape: (usize, usize)) -> Option<u8> {
    let side = |i: usize, n: usize| {
        if i == 0 {
            -1
        } else if i + 1 == n {
            1
        } else {
            0
        }
    };
    from_offset(side(row, shape.0), side(col, shape.1))
}
