//! Gartner et al. (2014) debris-flow volume models
//!
//! Emergency assessment (first year after the fire):
//!
//! ```text
//! ln V = B + Ci*sqrt(i15) + Cb*ln(Bmh) + Cr*sqrt(R)
//! ```
//!
//! Long-term assessment:
//!
//! ```text
//! ln V = B + Ci*ln(i60) + Cb*ln(Bt) + Ct*ln(T) + Ca*ln(A) + Cr*sqrt(R)
//! ```
//!
//! with peak 15/60 minute intensities (mm/h), moderate/high or total burned
//! area (km²), years since the fire T, total area A (km²) and relief R (m).
//! Volumes are in m³ and come with a 95% interval exp(ln V ± 2*RSE).
//!
//! Variables may be scalars, vectors (one value per segment) or
//! (segments x runs) matrices. Each coefficient holds one value or one
//! per run; the number of runs is the longest coefficient vector.
//!
//! Reference: Gartner, J. E., Cannon, S. H., & Santi, P. M. (2014).
//! Empirical models for predicting volumes of sediment deposited by
//! debris flows and sediment-laden floods in the transverse ranges of
//! southern California. Engineering Geology, 176, 45-56.

use burnflow_core::{validate, Error, Result};
use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Emergency model coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyParams {
    pub b: Vec<f64>,
    pub ci: Vec<f64>,
    pub cb: Vec<f64>,
    pub cr: Vec<f64>,
    /// Residual standard error
    pub rse: Vec<f64>,
}

impl Default for EmergencyParams {
    fn default() -> Self {
        Self {
            b: vec![4.22],
            ci: vec![0.39],
            cb: vec![0.36],
            cr: vec![0.13],
            rse: vec![1.04],
        }
    }
}

/// Long-term model coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongtermParams {
    pub b: Vec<f64>,
    pub ci: Vec<f64>,
    pub cb: Vec<f64>,
    pub ct: Vec<f64>,
    pub ca: Vec<f64>,
    pub cr: Vec<f64>,
    /// Residual standard error
    pub rse: Vec<f64>,
}

impl Default for LongtermParams {
    fn default() -> Self {
        Self {
            b: vec![6.07],
            ci: vec![0.71],
            cb: vec![0.22],
            ct: vec![-0.24],
            ca: vec![0.49],
            cr: vec![0.03],
            rse: vec![1.25],
        }
    }
}

/// Predicted volumes and their 95% interval, each (segments x runs)
#[derive(Debug, Clone, PartialEq)]
pub struct Volumes {
    pub volume: Array2<f64>,
    pub vmin: Array2<f64>,
    pub vmax: Array2<f64>,
}

/// One coefficient, repeated across runs when it holds a single value
struct Coefficient(Array1<f64>);

impl Coefficient {
    fn at(&self, run: usize) -> f64 {
        if self.0.len() == 1 {
            self.0[0]
        } else {
            self.0[run]
        }
    }
}

/// Validate coefficients and return them with the number of runs
fn coefficients(params: &[(&str, &[f64])]) -> Result<(Vec<Coefficient>, usize)> {
    let nruns = params.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let mut out = Vec::with_capacity(params.len());
    for &(name, values) in params {
        validate::nonempty(name, values.len())?;
        if values.len() != 1 && values.len() != nruns {
            return Err(Error::Shape {
                name: name.to_string(),
                expected: vec![nruns],
                actual: vec![values.len()],
            });
        }
        let values = Array1::from(values.to_vec());
        validate::defined(name, &values, None)?;
        out.push(Coefficient(values));
    }
    Ok((out, nruns))
}

/// Validate variables and broadcast them to a shared (segments x runs) shape.
///
/// Each entry is (name, values, allow_zero).
fn variables(vars: &[(&str, &ArrayD<f64>, bool)], nruns: usize) -> Result<Vec<Array2<f64>>> {
    let mut matrices = Vec::with_capacity(vars.len());
    for &(name, values, allow_zero) in vars {
        let m = validate::matrix(name, values, None, None)?;
        if m.ncols() != 1 && m.ncols() != nruns {
            return Err(Error::Shape {
                name: name.to_string(),
                expected: vec![m.nrows(), nruns],
                actual: vec![m.nrows(), m.ncols()],
            });
        }
        validate::defined(name, &m, None)?;
        validate::positive(name, &m, allow_zero, None)?;
        matrices.push((name, m));
    }

    let nsegments = matrices.iter().map(|(_, m)| m.nrows()).max().unwrap_or(1);
    matrices
        .into_iter()
        .map(|(name, m)| {
            m.broadcast((nsegments, nruns))
                .map(|v| v.to_owned())
                .ok_or_else(|| Error::Shape {
                    name: name.to_string(),
                    expected: vec![nsegments, nruns],
                    actual: m.shape().to_vec(),
                })
        })
        .collect()
}

fn volumes(lnv: Array2<f64>, rse: &Coefficient) -> Volumes {
    let interval = |sign: f64| {
        let mut out = lnv.clone();
        for (run, mut column) in out.columns_mut().into_iter().enumerate() {
            let offset = sign * 2.0 * rse.at(run);
            column.mapv_inplace(|v| (v + offset).exp());
        }
        out
    };
    Volumes {
        vmin: interval(-1.0),
        vmax: interval(1.0),
        volume: lnv.mapv(f64::exp),
    }
}

/// Emergency assessment volumes.
///
/// # Arguments
/// * `i15` - Peak 15-minute rainfall intensity (mm/h), >= 0
/// * `bmh` - Catchment area burned at moderate/high severity (km²), >= 0
/// * `relief` - Vertical relief (m), >= 0
/// * `params` - Model coefficients; see [`EmergencyParams::default`]
pub fn emergency(
    i15: &ArrayD<f64>,
    bmh: &ArrayD<f64>,
    relief: &ArrayD<f64>,
    params: &EmergencyParams,
) -> Result<Volumes> {
    let (c, nruns) = coefficients(&[
        ("B", params.b.as_slice()),
        ("Ci", params.ci.as_slice()),
        ("Cb", params.cb.as_slice()),
        ("Cr", params.cr.as_slice()),
        ("RSE", params.rse.as_slice()),
    ])?;
    let v = variables(
        &[("i15", i15, true), ("Bmh", bmh, true), ("R", relief, true)],
        nruns,
    )?;
    let (i15, bmh, relief) = (&v[0], &v[1], &v[2]);

    let lnv = Array2::from_shape_fn(i15.dim(), |(i, r)| {
        c[0].at(r) + c[1].at(r) * i15[(i, r)].sqrt() + c[2].at(r) * bmh[(i, r)].ln()
            + c[3].at(r) * relief[(i, r)].sqrt()
    });
    debug!(shape = ?lnv.dim(), "computed emergency volumes");
    Ok(volumes(lnv, &c[4]))
}

/// Long-term assessment volumes.
///
/// # Arguments
/// * `i60` - Peak 60-minute rainfall intensity (mm/h), >= 0
/// * `bt` - Total burned catchment area (km²), >= 0
/// * `years` - Time since the fire (years), > 0
/// * `area` - Total catchment area (km²), > 0
/// * `relief` - Vertical relief (m), >= 0
/// * `params` - Model coefficients; see [`LongtermParams::default`]
pub fn longterm(
    i60: &ArrayD<f64>,
    bt: &ArrayD<f64>,
    years: &ArrayD<f64>,
    area: &ArrayD<f64>,
    relief: &ArrayD<f64>,
    params: &LongtermParams,
) -> Result<Volumes> {
    let (c, nruns) = coefficients(&[
        ("B", params.b.as_slice()),
        ("Ci", params.ci.as_slice()),
        ("Cb", params.cb.as_slice()),
        ("Ct", params.ct.as_slice()),
        ("Ca", params.ca.as_slice()),
        ("Cr", params.cr.as_slice()),
        ("RSE", params.rse.as_slice()),
    ])?;
    let v = variables(
        &[
            ("i60", i60, true),
            ("Bt", bt, true),
            ("T", years, false),
            ("A", area, false),
            ("R", relief, true),
        ],
        nruns,
    )?;
    let (i60, bt, years, area, relief) = (&v[0], &v[1], &v[2], &v[3], &v[4]);

    let lnv = Array2::from_shape_fn(i60.dim(), |(i, r)| {
        c[0].at(r)
            + c[1].at(r) * i60[(i, r)].ln()
            + c[2].at(r) * bt[(i, r)].ln()
            + c[3].at(r) * years[(i, r)].ln()
            + c[4].at(r) * area[(i, r)].ln()
            + c[5].at(r) * relief[(i, r)].sqrt()
    });
    debug!(shape = ?lnv.dim(), "computed long-term volumes");
    Ok(volumes(lnv, &c[6]))
}
