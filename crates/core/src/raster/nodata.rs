//! NoData helpers

use super::RasterElement;
use ndarray::{Array2, ArrayView2};

/// Default NoData sentinel for a raster element type.
///
/// NaN for floats, the minimum value for signed integers, 0 for unsigned
/// integers and `false` for booleans.
pub fn default<T: RasterElement>() -> T {
    T::default_nodata()
}

/// Boolean grid that is true wherever `values` equals `nodata`.
///
/// A NaN sentinel matches NaN values. With no sentinel, every pixel is data.
pub fn mask<T: RasterElement>(values: ArrayView2<'_, T>, nodata: Option<T>) -> Array2<bool> {
    match nodata {
        Some(_) => values.mapv(|v| v.is_nodata(nodata)),
        None => Array2::from_elem(values.dim(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mask_nan_sentinel() {
        let values = array![[1.0, f64::NAN], [f64::NAN, 4.0]];
        let m = mask(values.view(), Some(f64::NAN));
        assert_eq!(m, array![[false, true], [true, false]]);
    }

    #[test]
    fn test_mask_numeric_sentinel() {
        let values = array![[-9999i32, 2], [3, -9999]];
        let m = mask(values.view(), Some(-9999));
        assert_eq!(m, array![[true, false], [false, true]]);
        assert!(!mask(values.view(), None).iter().any(|&b| b));
    }

    #[test]
    fn test_defaults() {
        assert!(default::<f32>().is_nan());
        assert_eq!(default::<i16>(), i16::MIN);
        assert_eq!(default::<u8>(), 0);
        assert!(!default::<bool>());
    }
}
