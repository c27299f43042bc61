//! Input validation shared by every public entry point.
//!
//! Element predicates report the first offending flat index (row-major) and
//! value. When a NoData value is supplied, matching elements are skipped.
//! NaN elements are skipped by the numeric predicates (`positive`,
//! `inrange`, `integers`, `boolean`); use `defined` to reject them.

use crate::error::{Error, Result};
use crate::raster::{DataType, RasterElement};
use ndarray::{Array1, Array2, ArrayBase, ArrayD, Data, Dimension, IxDyn};
use std::path::{Path, PathBuf};

/// First (index, value) in `values` that is data and fails `ok`
fn first_failure<'a, I>(values: I, nodata: Option<f64>, ok: impl Fn(f64) -> bool) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .copied()
        .enumerate()
        .filter(|&(_, v)| !v.is_nodata(nodata))
        .find(|&(_, v)| !ok(v))
}

fn check<S, D>(
    name: &str,
    values: &ArrayBase<S, D>,
    nodata: Option<f64>,
    requirement: &str,
    ok: impl Fn(f64) -> bool,
) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match first_failure(values.iter(), nodata, ok) {
        Some((index, value)) => Err(Error::value(name, requirement, index, value)),
        None => Ok(()),
    }
}

// Types and shapes

/// Require `actual` to be one of the `allowed` dtypes
pub fn dtype(name: &str, actual: DataType, allowed: &[DataType]) -> Result<()> {
    if allowed.contains(&actual) {
        return Ok(());
    }
    let allowed = allowed
        .iter()
        .map(|d| d.name())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::Type {
        name: name.to_string(),
        actual: actual.to_string(),
        allowed,
    })
}

/// Require an exact shape
pub fn shape(name: &str, actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Shape {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}

/// Require at least one element
pub fn nonempty(name: &str, len: usize) -> Result<()> {
    if len == 0 {
        Err(Error::EmptyArray {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Number of axes with more than one element
fn non_singleton(shape: &[usize]) -> Vec<usize> {
    shape.iter().copied().filter(|&n| n != 1).collect()
}

/// Extract a scalar from an array holding exactly one element
pub fn scalar(name: &str, values: &ArrayD<f64>) -> Result<f64> {
    nonempty(name, values.len())?;
    if values.len() != 1 {
        return Err(Error::Dimension {
            name: name.to_string(),
            expected: "exactly 1 element".into(),
            actual: values.len(),
        });
    }
    Ok(values.iter().copied().next().unwrap_or(f64::NAN))
}

/// Flatten an array with at most one non-singleton axis into a vector.
///
/// With `length` set, the vector must have that many elements.
pub fn vector(name: &str, values: &ArrayD<f64>, length: Option<usize>) -> Result<Array1<f64>> {
    nonempty(name, values.len())?;
    let axes = non_singleton(values.shape());
    if axes.len() > 1 {
        return Err(Error::Dimension {
            name: name.to_string(),
            expected: "1 (non-singleton)".into(),
            actual: axes.len(),
        });
    }
    let out: Array1<f64> = values.iter().copied().collect();
    if let Some(expected) = length {
        shape(name, &[out.len()], &[expected])?;
    }
    Ok(out)
}

/// Convert an array to a matrix.
///
/// Scalars become 1×1 and vectors become columns. Arrays with more than
/// two axes are accepted only when the extra axes are singleton. `rows`
/// and `cols` constrain the result when set.
pub fn matrix(
    name: &str,
    values: &ArrayD<f64>,
    rows: Option<usize>,
    cols: Option<usize>,
) -> Result<Array2<f64>> {
    nonempty(name, values.len())?;
    let (nr, nc) = match values.ndim() {
        0 => (1, 1),
        1 => (values.len(), 1),
        _ => {
            let shape = values.shape();
            if shape[2..].iter().any(|&n| n != 1) {
                return Err(Error::Dimension {
                    name: name.to_string(),
                    expected: "at most 2".into(),
                    actual: values.ndim(),
                });
            }
            (shape[0], shape[1])
        }
    };
    let out = Array2::from_shape_vec((nr, nc), values.iter().copied().collect()).map_err(|_| {
        Error::Shape {
            name: name.to_string(),
            expected: vec![nr, nc],
            actual: values.shape().to_vec(),
        }
    })?;
    if let Some(r) = rows {
        if nr != r {
            return Err(Error::Shape {
                name: name.to_string(),
                expected: vec![r, nc],
                actual: vec![nr, nc],
            });
        }
    }
    if let Some(c) = cols {
        if nc != c {
            return Err(Error::Shape {
                name: name.to_string(),
                expected: vec![nr, c],
                actual: vec![nr, nc],
            });
        }
    }
    Ok(out)
}

/// Broadcast shape of two arrays under numpy-style rules
pub fn broadcast_shapes(a_name: &str, a: &[usize], b_name: &str, b: &[usize]) -> Result<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0; ndim];
    for k in 0..ndim {
        let da = if k < ndim - a.len() { 1 } else { a[k - (ndim - a.len())] };
        let db = if k < ndim - b.len() { 1 } else { b[k - (ndim - b.len())] };
        out[k] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(Error::Shape {
                    name: format!("{a_name} and {b_name}"),
                    expected: a.to_vec(),
                    actual: b.to_vec(),
                })
            }
        };
    }
    Ok(out)
}

/// Broadcast `values` to `shape`, returning an owned array
pub fn broadcast(name: &str, values: &ArrayD<f64>, shape: &[usize]) -> Result<ArrayD<f64>> {
    values
        .broadcast(IxDyn(shape))
        .map(|v| v.to_owned())
        .ok_or_else(|| Error::Shape {
            name: name.to_string(),
            expected: shape.to_vec(),
            actual: values.shape().to_vec(),
        })
}

// Element predicates

/// Reject NaN elements
pub fn defined<S, D>(name: &str, values: &ArrayBase<S, D>, nodata: Option<f64>) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    check(name, values, nodata, "must not contain NaN", |v| !v.is_nan())
}

/// Require every element to be 0 or 1
pub fn boolean<S, D>(name: &str, values: &ArrayBase<S, D>, nodata: Option<f64>) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    check(name, values, nodata, "must contain only 0 and 1", |v| {
        v.is_nan() || v == 0.0 || v == 1.0
    })
}

/// Require integral elements
pub fn integers<S, D>(name: &str, values: &ArrayBase<S, D>, nodata: Option<f64>) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    check(name, values, nodata, "must contain only integers", |v| {
        v.is_nan() || (v.is_finite() && v.fract() == 0.0)
    })
}

/// Require elements > 0 (or >= 0 when `allow_zero`)
pub fn positive<S, D>(
    name: &str,
    values: &ArrayBase<S, D>,
    allow_zero: bool,
    nodata: Option<f64>,
) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    if allow_zero {
        check(name, values, nodata, "must be >= 0", |v| v.is_nan() || v >= 0.0)
    } else {
        check(name, values, nodata, "must be > 0", |v| v.is_nan() || v > 0.0)
    }
}

/// Require elements within the closed interval [min, max]
pub fn inrange<S, D>(
    name: &str,
    values: &ArrayBase<S, D>,
    min: f64,
    max: f64,
    nodata: Option<f64>,
) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let requirement = format!("must be within [{min}, {max}]");
    check(name, values, nodata, &requirement, |v| {
        v.is_nan() || (v >= min && v <= max)
    })
}

/// Require a strictly increasing sequence
pub fn sorted(name: &str, values: &[f64]) -> Result<()> {
    for (k, pair) in values.windows(2).enumerate() {
        if !(pair[1] > pair[0]) {
            return Err(Error::value(name, "must be strictly increasing", k + 1, pair[1]));
        }
    }
    Ok(())
}

/// Require D8 flow codes 1..=8 at every data pixel (0 is NoData)
pub fn flow<S, D>(name: &str, values: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = u8>,
    D: Dimension,
{
    match values.iter().position(|&v| v > 8) {
        Some(index) => {
            let value = values.iter().nth(index).copied().unwrap_or_default();
            Err(Error::value(
                name,
                "must contain D8 flow directions (1 to 8, or 0 for NoData)",
                index,
                value as f64,
            ))
        }
        None => Ok(()),
    }
}

/// Cast a NoData value to the raster element type
pub fn nodata<T: RasterElement>(value: f64) -> Result<T> {
    T::from_f64(value).ok_or_else(|| {
        Error::value("nodata", &format!("must be castable to {}", T::dtype()), 0, value)
    })
}

/// Resolve an output path and apply the overwrite policy
pub fn output_path<P: AsRef<Path>>(path: P, overwrite: bool) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidParameter {
            name: "path",
            value: String::new(),
            reason: "output path must not be empty".into(),
        });
    }
    if path.exists() && !overwrite {
        return Err(Error::FileExists(path.display().to_string()));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, arr0, Array};

    #[test]
    fn test_dtype() {
        assert!(dtype("flow", DataType::U8, &[DataType::U8, DataType::I16]).is_ok());
        let err = dtype("flow", DataType::F32, &[DataType::U8]).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn test_scalar_and_vector() {
        assert_eq!(scalar("x", &arr0(2.5).into_dyn()).unwrap(), 2.5);
        assert!(matches!(
            scalar("x", &array![1.0, 2.0].into_dyn()),
            Err(Error::Dimension { .. })
        ));

        let v = vector("v", &array![[1.0], [2.0], [3.0]].into_dyn(), Some(3)).unwrap();
        assert_eq!(v, array![1.0, 2.0, 3.0]);
        assert!(matches!(
            vector("v", &array![[1.0, 2.0], [3.0, 4.0]].into_dyn(), None),
            Err(Error::Dimension { .. })
        ));
        assert!(matches!(
            vector("v", &array![1.0, 2.0].into_dyn(), Some(3)),
            Err(Error::Shape { .. })
        ));
        let empty: ArrayD<f64> = Array::zeros(IxDyn(&[0]));
        assert!(matches!(vector("v", &empty, None), Err(Error::EmptyArray { .. })));
    }

    #[test]
    fn test_matrix() {
        let m = matrix("m", &array![1.0, 2.0].into_dyn(), None, Some(1)).unwrap();
        assert_eq!(m.dim(), (2, 1));
        assert!(matches!(
            matrix("m", &array![[1.0, 2.0]].into_dyn(), Some(3), None),
            Err(Error::Shape { .. })
        ));
    }

    #[test]
    fn test_predicates_report_first_failure() {
        let values = array![1.0, -2.0, -3.0];
        match positive("area", &values, false, None) {
            Err(Error::Value { index, value, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(value, -2.0);
            }
            other => panic!("expected value error, got {:?}", other),
        }
        assert!(positive("area", &array![0.0, f64::NAN], true, None).is_ok());
        assert!(positive("area", &array![0.0], false, None).is_err());
    }

    #[test]
    fn test_predicates_skip_nodata() {
        let values = array![0.5, -9999.0, 0.25];
        assert!(inrange("p", &values, 0.0, 1.0, Some(-9999.0)).is_ok());
        assert!(inrange("p", &values, 0.0, 1.0, None).is_err());
        assert!(defined("x", &array![1.0, f64::NAN], Some(f64::NAN)).is_ok());
        assert!(defined("x", &array![1.0, f64::NAN], None).is_err());
    }

    #[test]
    fn test_boolean_and_integers() {
        assert!(boolean("mask", &array![0.0, 1.0, 1.0], None).is_ok());
        assert!(boolean("mask", &array![0.0, 2.0], None).is_err());
        assert!(integers("n", &array![1.0, 4.0], None).is_ok());
        assert!(integers("n", &array![1.5], None).is_err());
    }

    #[test]
    fn test_sorted() {
        assert!(sorted("t", &[1.0, 2.0, 3.0]).is_ok());
        match sorted("t", &[1.0, 3.0, 3.0]) {
            Err(Error::Value { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected value error, got {:?}", other),
        }
    }

    #[test]
    fn test_flow_codes() {
        assert!(flow("flow", &array![[0u8, 1], [8, 4]]).is_ok());
        assert!(matches!(flow("flow", &array![[1u8, 9]]), Err(Error::Value { index: 1, .. })));
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes("a", &[3, 1], "b", &[4]).unwrap(), vec![3, 4]);
        assert_eq!(broadcast_shapes("a", &[], "b", &[2, 2]).unwrap(), vec![2, 2]);
        assert!(broadcast_shapes("a", &[3], "b", &[4]).is_err());
    }

    #[test]
    fn test_nodata_cast() {
        assert_eq!(nodata::<i16>(-9999.0).unwrap(), -9999);
        assert!(nodata::<u8>(-1.0).is_err());
    }

    #[test]
    fn test_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        assert!(output_path(&path, false).is_ok());
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(output_path(&path, false), Err(Error::FileExists(_))));
        assert!(output_path(&path, true).is_ok());
    }
}
