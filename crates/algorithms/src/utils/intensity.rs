//! Rainfall intensity and accumulation
//!
//! accumulation (mm over the duration) = intensity (mm/h) * duration (min) / 60
//!
//! Durations hold one value, or one per entry along the duration axis.

use burnflow_core::{validate, Error, Result};
use ndarray::{Array, Array1, ArrayBase, Axis, Data, Dimension};

/// Which axis carries durations when none is given
#[derive(Clone, Copy)]
enum DefaultAxis {
    First,
    Last,
}

fn convert<S, D>(
    name: &str,
    values: &ArrayBase<S, D>,
    durations: &[f64],
    axis: Option<usize>,
    default: DefaultAxis,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    validate::nonempty("durations", durations.len())?;
    let durations = Array1::from(durations.to_vec());
    validate::defined("durations", &durations, None)?;
    validate::positive("durations", &durations, false, None)?;
    validate::positive(name, values, true, None)?;

    let mut out = values.to_owned();
    if out.ndim() == 0 || (durations.len() == 1 && axis.is_none()) {
        validate::shape("durations", &[durations.len()], &[1])?;
        let d = durations[0];
        out.mapv_inplace(|v| f(v, d));
        return Ok(out);
    }

    let axis = match (axis, default) {
        (Some(axis), _) => axis,
        (None, DefaultAxis::First) => 0,
        (None, DefaultAxis::Last) => out.ndim() - 1,
    };
    if axis >= out.ndim() {
        return Err(Error::InvalidParameter {
            name: "axis",
            value: axis.to_string(),
            reason: format!("{name} have {} axes", out.ndim()),
        });
    }
    let n = out.len_of(Axis(axis));
    if durations.len() != 1 && durations.len() != n {
        return Err(Error::Shape {
            name: "durations".into(),
            expected: vec![n],
            actual: vec![durations.len()],
        });
    }

    // `D` may be 0-d, which has no lanes, so iterate a dynamic array
    let ndim = out.ndim();
    let mut out = out.into_dyn();
    for (k, mut lane) in out.axis_iter_mut(Axis(axis)).enumerate() {
        let d = if durations.len() == 1 { durations[0] } else { durations[k] };
        lane.mapv_inplace(|v| f(v, d));
    }
    out.into_dimensionality::<D>().map_err(|_| Error::Dimension {
        name: name.to_string(),
        expected: ndim.to_string(),
        actual: ndim,
    })
}

/// Convert intensities (mm/h) to accumulations (mm).
///
/// Durations (minutes) run along axis 0 unless `axis` is set.
pub fn to_accumulation<S, D>(
    intensities: &ArrayBase<S, D>,
    durations: &[f64],
    axis: Option<usize>,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    convert("intensities", intensities, durations, axis, DefaultAxis::First, |i, d| {
        i * d / 60.0
    })
}

/// Convert accumulations (mm) to intensities (mm/h).
///
/// Durations (minutes) run along the last axis unless `axis` is set.
pub fn from_accumulation<S, D>(
    accumulations: &ArrayBase<S, D>,
    durations: &[f64],
    axis: Option<usize>,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    convert("accumulations", accumulations, durations, axis, DefaultAxis::Last, |r, d| {
        r * 60.0 / d
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr0, array};

    #[test]
    fn test_scalar_duration() {
        let r = to_accumulation(&array![20.0, 40.0], &[15.0], None).unwrap();
        assert_eq!(r, array![5.0, 10.0]);
        let i = from_accumulation(&arr0(5.0), &[15.0], None).unwrap();
        assert_eq!(i.into_scalar(), 20.0);
    }

    #[test]
    fn test_durations_along_axes() {
        let intensities = array![[60.0, 60.0], [30.0, 30.0], [12.0, 12.0]];
        let r = to_accumulation(&intensities, &[15.0, 30.0, 60.0], None).unwrap();
        assert_eq!(r, array![[15.0, 15.0], [15.0, 15.0], [12.0, 12.0]]);

        // Accumulations from a likelihood model: (segments, durations)
        let acc = array![[15.0, 15.0, 12.0]];
        let i = from_accumulation(&acc, &[15.0, 30.0, 60.0], None).unwrap();
        assert_eq!(i, array![[60.0, 30.0, 12.0]]);

        let cols = to_accumulation(&intensities, &[60.0, 30.0], Some(1)).unwrap();
        assert_eq!(cols[(0, 1)], 30.0);
    }

    #[test]
    fn test_durations_on_middle_axis() {
        // (segments, durations, runs)
        let intensities = ndarray::Array3::<f64>::from_elem((2, 3, 4), 12.0);
        let r = to_accumulation(&intensities, &[15.0, 30.0, 60.0], Some(1)).unwrap();
        assert_eq!(r.dim(), (2, 3, 4));
        assert_eq!(r[(1, 0, 3)], 3.0);
        assert_eq!(r[(0, 1, 0)], 6.0);
        assert_eq!(r[(1, 2, 2)], 12.0);
    }

    #[test]
    fn test_round_trip() {
        let intensities = array![[3.5, 80.25], [0.5, 17.0], [44.0, 1.0]];
        let durations = [15.0, 30.0, 60.0];
        let acc = to_accumulation(&intensities, &durations, None).unwrap();
        let back = from_accumulation(&acc, &durations, Some(0)).unwrap();
        for (a, b) in intensities.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_invalid() {
        let x = array![[1.0, 2.0]];
        assert!(to_accumulation(&x, &[0.0], None).is_err());
        assert!(to_accumulation(&x, &[15.0, 30.0], None).is_err());
        assert!(to_accumulation(&x, &[15.0, 30.0], Some(2)).is_err());
        assert!(to_accumulation(&array![-1.0], &[15.0], None).is_err());
        assert!(from_accumulation(&arr0(1.0), &[15.0, 30.0], None).is_err());
    }
}
