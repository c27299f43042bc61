//! Affine geotransformation for rasters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Shear-free affine transformation for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = left + col * dx
/// y = top  + row * dy
/// ```
///
/// For north-up rasters `dy` is negative. Rotated or sheared transforms are
/// rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub left: f64,
    /// Y coordinate of the upper-left corner
    pub top: f64,
    /// Pixel spacing along a row (signed)
    pub dx: f64,
    /// Pixel spacing along a column (signed, usually negative)
    pub dy: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform
    pub fn new(left: f64, top: f64, dx: f64, dy: f64) -> Self {
        Self { left, top, dx, dy }
    }

    /// Create from affine coefficients `[dx, b, left, d, dy, top]`.
    ///
    /// Fails if the shear terms `b` or `d` are non-zero, or if a pixel has
    /// zero or non-finite size.
    pub fn from_affine(coeffs: [f64; 6]) -> Result<Self> {
        let [dx, b, left, d, dy, top] = coeffs;
        if b != 0.0 || d != 0.0 {
            return Err(Error::Transform(format!(
                "affine transform must be shear-free, got shear terms ({b}, {d})"
            )));
        }
        if coeffs.iter().any(|c| !c.is_finite()) {
            return Err(Error::Transform("affine coefficients must be finite".into()));
        }
        if dx == 0.0 || dy == 0.0 {
            return Err(Error::Transform(format!(
                "pixel size must be non-zero, got dx={dx}, dy={dy}"
            )));
        }
        Ok(Self::new(left, top, dx, dy))
    }

    /// Create from GDAL-style coefficients `[left, dx, b, top, d, dy]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Result<Self> {
        Self::from_affine([coeffs[1], coeffs[2], coeffs[0], coeffs[4], coeffs[5], coeffs[3]])
    }

    /// Affine coefficients `[dx, 0, left, 0, dy, top]`
    pub fn to_affine(&self) -> [f64; 6] {
        [self.dx, 0.0, self.left, 0.0, self.dy, self.top]
    }

    /// Convert pixel coordinates to map coordinates
    ///
    /// Returns the coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_f(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Convert pixel coordinates to map coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_geo_f(col as f64, row as f64)
    }

    /// Convert fractional pixel coordinates to map coordinates
    pub fn pixel_to_geo_f(&self, col: f64, row: f64) -> (f64, f64) {
        (self.left + col * self.dx, self.top + row * self.dy)
    }

    /// Convert map coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.left) / self.dx, (y - self.top) / self.dy)
    }

    /// Pixel width in map units (always positive)
    pub fn pixel_width(&self) -> f64 {
        self.dx.abs()
    }

    /// Pixel height in map units (always positive)
    pub fn pixel_height(&self) -> f64 {
        self.dy.abs()
    }

    /// Area of a single pixel in squared map units
    pub fn pixel_area(&self) -> f64 {
        self.pixel_width() * self.pixel_height()
    }

    /// Length of a pixel diagonal in map units
    pub fn pixel_diagonal(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Check if this is a north-up transform
    pub fn is_north_up(&self) -> bool {
        self.dy < 0.0
    }

    /// Calculate the bounding box for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, height);

        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 100);

        assert_relative_eq!(min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, 0.0, epsilon = 1e-10);
        assert_relative_eq!(max_x, 100.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_shear_rejected() {
        assert!(matches!(
            GeoTransform::from_affine([10.0, 0.5, 0.0, 0.0, -10.0, 0.0]),
            Err(Error::Transform(_))
        ));
        let gt = GeoTransform::from_affine([10.0, 0.0, 5.0, 0.0, -20.0, 50.0]).unwrap();
        assert_eq!(gt.to_affine(), [10.0, 0.0, 5.0, 0.0, -20.0, 50.0]);
        assert_relative_eq!(gt.pixel_area(), 200.0);
    }

    #[test]
    fn test_from_gdal() {
        let gt = GeoTransform::from_gdal([5.0, 10.0, 0.0, 50.0, 0.0, -10.0]).unwrap();
        assert_eq!(gt, GeoTransform::new(5.0, 50.0, 10.0, -10.0));
    }
}
