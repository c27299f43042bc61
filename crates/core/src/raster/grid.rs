//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{nodata, DataType, GeoTransform, RasterElement};
use crate::validate;
use ndarray::{Array2, ArrayView2};
use std::path::Path;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform, CRS and NoData sentinel). Algorithms never
/// modify their inputs; every derived raster is a new value.
///
/// # Example
///
/// ```ignore
/// use burnflow_core::{GeoTransform, Raster, CRS};
/// use ndarray::array;
///
/// let dem = Raster::from_parts(
///     array![[10.0, 9.0], [8.0, 7.0]],
///     Some(-9999.0),
///     Some(GeoTransform::new(0.0, 20.0, 10.0, -10.0)),
///     Some(CRS::from_epsg(26911)),
/// )?;
/// assert_eq!(dem.pixel_area(), 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::zero())
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        let array = Array2::from_shape_vec((rows, cols), data).map_err(|_| Error::Shape {
            name: "raster values".into(),
            expected: vec![rows, cols],
            actual: vec![rows * cols],
        })?;
        Self::from_parts(array, None, None, None)
    }

    /// Create a raster from an ndarray with default metadata
    pub fn from_array(data: Array2<T>) -> Result<Self> {
        Self::from_parts(data, None, None, None)
    }

    /// Build a raster from values plus optional metadata.
    ///
    /// The NoData value arrives as an `f64` and must be castable to `T`
    /// (integral and in range for integers, 0/1 for booleans).
    pub fn from_parts(
        data: Array2<T>,
        nodata: Option<f64>,
        transform: Option<GeoTransform>,
        crs: Option<CRS>,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyArray {
                name: "raster values".into(),
            });
        }

        let nodata = nodata.map(validate::nodata::<T>).transpose()?;

        Ok(Self {
            data,
            transform: transform.unwrap_or_default(),
            crs,
            nodata,
        })
    }

    /// Create a raster with the same metadata but different data type
    ///
    /// The result is zero-filled and has no NoData value.
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::from_elem((rows, cols), U::zero()),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Wrap new values in this raster's transform and CRS
    pub fn derive<U: RasterElement>(&self, data: Array2<U>, nodata: Option<U>) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            return Err(Error::RasterShape {
                name: "derived values".into(),
                er: self.rows(),
                ec: self.cols(),
                ar: data.nrows(),
                ac: data.ncols(),
            });
        }
        Ok(Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata,
        })
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    /// Apply `f` to every value, keeping metadata
    pub fn map<U: RasterElement>(&self, nodata: Option<U>, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            data: self.data.mapv(f),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata,
        }
    }

    /// Convert to a float raster; NoData pixels become NaN
    pub fn to_f64(&self) -> Raster<f64> {
        let nodata = self.nodata;
        self.map(Some(f64::NAN), |v| {
            if v.is_nodata(nodata) {
                f64::NAN
            } else {
                v.to_f64()
            }
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Storage type of the values
    pub fn dtype(&self) -> DataType {
        T::dtype()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Pixel width in map units
    pub fn pixel_width(&self) -> f64 {
        self.transform.pixel_width()
    }

    /// Pixel height in map units
    pub fn pixel_height(&self) -> f64 {
        self.transform.pixel_height()
    }

    /// Area of one pixel in squared map units
    pub fn pixel_area(&self) -> f64 {
        self.transform.pixel_area()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Map coordinates of a pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    /// Boolean grid of NoData pixels
    pub fn nodata_mask(&self) -> Array2<bool> {
        nodata::mask(self.view(), self.nodata)
    }

    /// Boolean grid of data pixels
    pub fn data_mask(&self) -> Array2<bool> {
        self.nodata_mask().mapv(|nd| !nd)
    }

    /// Require a NoData value
    pub fn require_nodata(&self, name: &str) -> Result<T> {
        self.nodata.ok_or_else(|| Error::MissingNoData(name.to_string()))
    }

    // Alignment

    /// Check that `other` shares this raster's shape, transform and CRS.
    ///
    /// `name` identifies `other` in the error. A missing CRS on either side
    /// is treated as compatible.
    pub fn align_with<U: RasterElement>(&self, other: &Raster<U>, name: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::RasterShape {
                name: name.to_string(),
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }

        if !transforms_match(&self.transform, &other.transform) {
            return Err(Error::RasterTransform {
                name: name.to_string(),
            });
        }

        if let (Some(a), Some(b)) = (&self.crs, &other.crs) {
            if !a.is_equivalent(b) {
                return Err(Error::RasterCrs {
                    name: name.to_string(),
                    expected: a.identifier(),
                    actual: b.identifier(),
                });
            }
        }
        Ok(())
    }

    /// Save as a single-band GeoTIFF.
    ///
    /// Fails with `FileExists` when the path exists and `overwrite` is false.
    pub fn save<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<()> {
        crate::io::write_geotiff(self, path, overwrite)
    }
}

/// Transforms match when every coefficient agrees to within a tiny
/// relative tolerance.
fn transforms_match(a: &GeoTransform, b: &GeoTransform) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0);
    close(a.left, b.left) && close(a.top, b.top) && close(a.dx, b.dx) && close(a.dy, b.dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert_eq!(raster.dtype(), DataType::F32);
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn test_from_parts_validates() {
        let empty: Array2<f64> = Array2::zeros((0, 3));
        assert!(matches!(
            Raster::from_parts(empty, None, None, None),
            Err(Error::EmptyArray { .. })
        ));

        let ints = array![[1u8, 2], [3, 4]];
        assert!(matches!(
            Raster::from_parts(ints.clone(), Some(-1.0), None, None),
            Err(Error::Value { .. })
        ));
        assert!(matches!(
            Raster::from_parts(ints.clone(), Some(2.5), None, None),
            Err(Error::Value { .. })
        ));
        let r = Raster::from_parts(ints, Some(255.0), None, None).unwrap();
        assert_eq!(r.nodata(), Some(255));

        let bools = array![[true, false]];
        let r = Raster::from_parts(bools, Some(1.0), None, None).unwrap();
        assert_eq!(r.nodata(), Some(true));
    }

    #[test]
    fn test_metadata() {
        let r = Raster::from_parts(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            Some(f64::NAN),
            Some(GeoTransform::new(100.0, 500.0, 10.0, -20.0)),
            Some(CRS::from_epsg(26911)),
        )
        .unwrap();
        assert_eq!(r.len(), 6);
        assert_eq!(r.pixel_width(), 10.0);
        assert_eq!(r.pixel_height(), 20.0);
        assert_eq!(r.pixel_area(), 200.0);
        assert_eq!(r.bounds(), (100.0, 460.0, 130.0, 500.0));
        assert_eq!(r.crs().and_then(|c| c.epsg()), Some(26911));
    }

    #[test]
    fn test_nodata_masks() {
        let r = Raster::from_parts(array![[1.0, -9999.0]], Some(-9999.0), None, None).unwrap();
        assert_eq!(r.nodata_mask(), array![[false, true]]);
        assert_eq!(r.data_mask(), array![[true, false]]);
        let f = r.to_f64();
        assert!(f.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_align_with() {
        let a: Raster<f64> = Raster::new(3, 3);
        let b: Raster<u8> = Raster::new(3, 4);
        assert!(matches!(a.align_with(&b, "b"), Err(Error::RasterShape { .. })));

        let mut c: Raster<u8> = Raster::new(3, 3);
        c.set_transform(GeoTransform::new(1.0, 0.0, 1.0, -1.0));
        assert!(matches!(a.align_with(&c, "c"), Err(Error::RasterTransform { .. })));

        let mut d: Raster<f64> = a.clone();
        d.set_crs(Some(CRS::from_epsg(4326)));
        let mut e: Raster<bool> = Raster::new(3, 3);
        e.set_crs(Some(CRS::from_epsg(3857)));
        assert!(matches!(d.align_with(&e, "e"), Err(Error::RasterCrs { .. })));

        assert!(a.align_with(&Raster::<bool>::new(3, 3), "mask").is_ok());
    }

    #[test]
    fn test_require_nodata() {
        let r: Raster<f64> = Raster::new(2, 2);
        assert!(matches!(r.require_nodata("dem"), Err(Error::MissingNoData(_))));
    }
}
