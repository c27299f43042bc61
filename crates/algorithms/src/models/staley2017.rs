//! Staley et al. (2017) logistic debris-flow likelihood models
//!
//! The likelihood of a debris flow given a rainfall accumulation R (mm over
//! the design duration) is
//!
//! ```text
//! X = B + (Ct*T + Cf*F + Cs*S) * R
//! p = 1 / (1 + exp(-X))
//! ```
//!
//! where T, F and S are the terrain, fire and soil variables of a segment.
//! Solving for R gives the accumulation needed to reach likelihood p.
//!
//! Results are indexed (segment, parameter run, p or R). The four published
//! models M1 to M4 differ in how T, F and S are measured; each exposes its
//! calibrated parameters and computes its variables from a [`Segments`]
//! network.
//!
//! Reference: Staley, D. M., et al. (2017). Prediction of spatially explicit
//! rainfall intensity-duration thresholds for post-fire debris-flow
//! generation in the western United States. Geomorphology, 278, 149-162.

use crate::segments::Segments;
use crate::utils::slope;
use burnflow_core::raster::Raster;
use burnflow_core::{validate, Error, Result};
use ndarray::{Array1, Array2, Array3, ArrayD, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rainfall durations (minutes) the published models were calibrated for
pub const DURATIONS: [f64; 3] = [15.0, 30.0, 60.0];

/// Slope angle threshold (degrees) used by the M1 and M4 terrain variables
pub const STEEP_SLOPE_DEGREES: f64 = 23.0;

/// Logistic coefficients, one entry per parameter run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub b: Vec<f64>,
    pub ct: Vec<f64>,
    pub cf: Vec<f64>,
    pub cs: Vec<f64>,
}

impl Parameters {
    /// Build a parameter set. All four vectors need the same, non-zero length.
    pub fn new(b: Vec<f64>, ct: Vec<f64>, cf: Vec<f64>, cs: Vec<f64>) -> Result<Self> {
        let params = Self { b, ct, cf, cs };
        params.validate()?;
        Ok(params)
    }

    /// Number of parameter runs
    pub fn nruns(&self) -> usize {
        self.b.len()
    }

    fn validate(&self) -> Result<()> {
        let nruns = self.nruns();
        validate::nonempty("B", nruns)?;
        for (name, values) in [("B", &self.b), ("Ct", &self.ct), ("Cf", &self.cf), ("Cs", &self.cs)] {
            validate::shape(name, &[values.len()], &[nruns])?;
            validate::defined(name, &Array1::from(values.clone()), None)?;
        }
        Ok(())
    }

    /// Combined coefficient Ct*T + Cf*F + Cs*S for segment i and run r
    fn coefficient(&self, vars: &Variables, i: usize, r: usize) -> f64 {
        let col = if vars.t.ncols() == 1 { 0 } else { r };
        self.ct[r] * vars.t[(i, col)] + self.cf[r] * vars.f[(i, col)] + self.cs[r] * vars.s[(i, col)]
    }
}

/// Terrain, fire and soil variables.
///
/// Each is a (segments x runs) matrix, or (segments x 1) when the same
/// values apply to every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Variables {
    pub t: Array2<f64>,
    pub f: Array2<f64>,
    pub s: Array2<f64>,
}

impl Variables {
    /// Variables shared by every parameter run
    pub fn from_vectors(t: Array1<f64>, f: Array1<f64>, s: Array1<f64>) -> Result<Self> {
        let column = |v: Array1<f64>| v.insert_axis(Axis(1));
        let vars = Self {
            t: column(t),
            f: column(f),
            s: column(s),
        };
        vars.validate(None)?;
        Ok(vars)
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.t.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    fn validate(&self, nruns: Option<usize>) -> Result<()> {
        let shape = self.t.shape().to_vec();
        validate::shape("F", self.f.shape(), &shape)?;
        validate::shape("S", self.s.shape(), &shape)?;
        if let Some(nruns) = nruns {
            if shape[1] != 1 && shape[1] != nruns {
                return Err(Error::Shape {
                    name: "T".into(),
                    expected: vec![shape[0], nruns],
                    actual: shape,
                });
            }
        }
        Ok(())
    }
}

/// Rainfall accumulations (mm) needed to reach each likelihood.
///
/// # Arguments
/// * `p` - Likelihoods in [0, 1]
/// * `params` - Logistic coefficients
/// * `vars` - Segment variables
///
/// # Returns
/// Array of shape (segments, runs, likelihoods)
pub fn accumulation(p: &[f64], params: &Parameters, vars: &Variables) -> Result<Array3<f64>> {
    let p = Array1::from(p.to_vec());
    validate::nonempty("p", p.len())?;
    validate::inrange("p", &p, 0.0, 1.0, None)?;
    params.validate()?;
    vars.validate(Some(params.nruns()))?;

    let shape = (vars.len(), params.nruns(), p.len());
    let out = Array3::from_shape_fn(shape, |(i, r, k)| {
        let logit = (p[k] / (1.0 - p[k])).ln();
        (logit - params.b[r]) / params.coefficient(vars, i, r)
    });
    debug!(?shape, "solved rainfall accumulations");
    Ok(out)
}

/// Debris-flow likelihoods for each rainfall accumulation.
///
/// # Arguments
/// * `r` - Rainfall accumulations (mm), >= 0
/// * `params` - Logistic coefficients
/// * `vars` - Segment variables
///
/// # Returns
/// Array of shape (segments, runs, accumulations)
pub fn likelihood(r: &[f64], params: &Parameters, vars: &Variables) -> Result<Array3<f64>> {
    let r = Array1::from(r.to_vec());
    validate::nonempty("R", r.len())?;
    validate::positive("R", &r, true, None)?;
    params.validate()?;
    vars.validate(Some(params.nruns()))?;

    let shape = (vars.len(), params.nruns(), r.len());
    let out = Array3::from_shape_fn(shape, |(i, run, k)| {
        let x = params.b[run] + params.coefficient(vars, i, run) * r[k];
        1.0 / (1.0 + (-x).exp())
    });
    debug!(?shape, "computed likelihoods");
    Ok(out)
}

/// Drop trailing singleton axes, keeping the segment axis
pub fn squeeze(values: Array3<f64>) -> ArrayD<f64> {
    let mut out = values.into_dyn();
    while out.ndim() > 1 && out.shape()[out.ndim() - 1] == 1 {
        let last = out.ndim() - 1;
        out = out.index_axis_move(Axis(last), 0);
    }
    out
}

/// A published Staley (2017) model with calibrated coefficients
pub trait StaleyModel {
    const NAME: &'static str;
    /// Coefficients at 15, 30 and 60 minute durations
    const B: [f64; 3];
    const CT: [f64; 3];
    const CF: [f64; 3];
    const CS: [f64; 3];

    /// Calibrated coefficients for the requested durations (minutes).
    ///
    /// Each duration becomes one parameter run. Durations other than 15,
    /// 30 and 60 fail with a Durations error.
    fn parameters(durations: &[f64]) -> Result<Parameters> {
        validate::nonempty("durations", durations.len())?;
        let mut params = Parameters {
            b: Vec::with_capacity(durations.len()),
            ct: Vec::with_capacity(durations.len()),
            cf: Vec::with_capacity(durations.len()),
            cs: Vec::with_capacity(durations.len()),
        };
        for &duration in durations {
            let k = DURATIONS
                .iter()
                .position(|&d| d == duration)
                .ok_or_else(|| Error::Durations {
                    duration,
                    supported: "15, 30, 60".into(),
                })?;
            params.b.push(Self::B[k]);
            params.ct.push(Self::CT[k]);
            params.cf.push(Self::CF[k]);
            params.cs.push(Self::CS[k]);
        }
        Ok(params)
    }
}

/// M1: steep burned terrain, dNBR and soil erodibility
#[derive(Debug, Clone, Copy, Default)]
pub struct M1;

/// M2: slope of burned terrain, dNBR and soil erodibility
#[derive(Debug, Clone, Copy, Default)]
pub struct M2;

/// M3: ruggedness, burned proportion and soil thickness
#[derive(Debug, Clone, Copy, Default)]
pub struct M3;

/// M4: steep burned terrain, dNBR and soil thickness
#[derive(Debug, Clone, Copy, Default)]
pub struct M4;

impl StaleyModel for M1 {
    const NAME: &'static str = "M1";
    const B: [f64; 3] = [-3.63, -3.61, -3.21];
    const CT: [f64; 3] = [0.41, 0.26, 0.17];
    const CF: [f64; 3] = [0.67, 0.39, 0.20];
    const CS: [f64; 3] = [0.70, 0.50, 0.22];
}

impl StaleyModel for M2 {
    const NAME: &'static str = "M2";
    const B: [f64; 3] = [-3.62, -3.61, -3.22];
    const CT: [f64; 3] = [0.64, 0.42, 0.27];
    const CF: [f64; 3] = [0.65, 0.38, 0.19];
    const CS: [f64; 3] = [0.68, 0.49, 0.22];
}

impl StaleyModel for M3 {
    const NAME: &'static str = "M3";
    const B: [f64; 3] = [-3.71, -3.79, -3.46];
    const CT: [f64; 3] = [0.32, 0.21, 0.14];
    const CF: [f64; 3] = [0.33, 0.19, 0.10];
    const CS: [f64; 3] = [0.47, 0.36, 0.18];
}

impl StaleyModel for M4 {
    const NAME: &'static str = "M4";
    const B: [f64; 3] = [-3.60, -3.64, -3.30];
    const CT: [f64; 3] = [0.51, 0.33, 0.20];
    const CF: [f64; 3] = [0.82, 0.46, 0.24];
    const CS: [f64; 3] = [0.27, 0.26, 0.13];
}

/// Pixels that are in `burned` and at least 23 degrees steep
fn steep_and_burned(burned: &Raster<bool>, slopes: &Raster<f64>) -> Result<Raster<bool>> {
    burned.align_with(slopes, "slopes")?;
    let threshold = STEEP_SLOPE_DEGREES.to_radians().tan();
    let valid = burned.data_mask();
    let gradient = slopes.to_f64().into_array();
    let mut out = burned.data().clone();
    ndarray::Zip::from(&mut out)
        .and(&valid)
        .and(&gradient)
        .for_each(|b, &v, &g| *b = *b && v && g >= threshold);
    burned.derive(out, None)
}

/// Catchment mean of dNBR divided by 1000
fn scaled_dnbr(segments: &Segments, dnbr: &Raster<f64>) -> Result<Array1<f64>> {
    Ok(segments.catchment_mean(dnbr, None, None)? / 1000.0)
}

impl M1 {
    /// T: proportion of catchment burned at moderate/high severity with
    /// slopes of at least 23 degrees. F: mean dNBR / 1000. S: mean KF-factor.
    ///
    /// `slopes` are gradients (rise over run).
    pub fn variables(
        segments: &Segments,
        moderate_high: &Raster<bool>,
        slopes: &Raster<f64>,
        dnbr: &Raster<f64>,
        kf_factor: &Raster<f64>,
    ) -> Result<Variables> {
        let steep = steep_and_burned(moderate_high, slopes)?;
        Variables::from_vectors(
            segments.upslope_ratio(&steep)?,
            scaled_dnbr(segments, dnbr)?,
            segments.catchment_mean(kf_factor, None, None)?,
        )
    }
}

impl M2 {
    /// T: mean sine of the slope angle over moderate/high burned catchment
    /// pixels. F: mean dNBR / 1000. S: mean KF-factor.
    ///
    /// `slopes` are gradients (rise over run).
    pub fn variables(
        segments: &Segments,
        moderate_high: &Raster<bool>,
        slopes: &Raster<f64>,
        dnbr: &Raster<f64>,
        kf_factor: &Raster<f64>,
    ) -> Result<Variables> {
        moderate_high.align_with(slopes, "slopes")?;
        let sines = slope::to_sine(&slopes.to_f64().into_array())?;
        let sines = slopes.derive(sines, Some(f64::NAN))?;
        Variables::from_vectors(
            segments.catchment_mean(&sines, Some(moderate_high), None)?,
            scaled_dnbr(segments, dnbr)?,
            segments.catchment_mean(kf_factor, None, None)?,
        )
    }
}

impl M3 {
    /// T: ruggedness (relief / sqrt(area)). F: proportion of catchment
    /// burned at moderate/high severity. S: mean soil thickness / 100.
    pub fn variables(
        segments: &Segments,
        moderate_high: &Raster<bool>,
        relief: &Raster<f64>,
        soil_thickness: &Raster<f64>,
    ) -> Result<Variables> {
        Variables::from_vectors(
            segments.ruggedness(relief, None)?,
            segments.upslope_ratio(moderate_high)?,
            segments.catchment_mean(soil_thickness, None, None)? / 100.0,
        )
    }
}

impl M4 {
    /// T: proportion of catchment burned at any severity with slopes of at
    /// least 23 degrees. F: mean dNBR / 1000. S: mean soil thickness / 100.
    pub fn variables(
        segments: &Segments,
        burned: &Raster<bool>,
        slopes: &Raster<f64>,
        dnbr: &Raster<f64>,
        soil_thickness: &Raster<f64>,
    ) -> Result<Variables> {
        let steep = steep_and_burned(burned, slopes)?;
        Variables::from_vectors(
            segments.upslope_ratio(&steep)?,
            scaled_dnbr(segments, dnbr)?,
            segments.catchment_mean(soil_thickness, None, None)? / 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn ones(n: usize) -> Variables {
        Variables::from_vectors(Array1::ones(n), Array1::ones(n), Array1::ones(n)).unwrap()
    }

    #[test]
    fn test_accumulation_m1_15min() {
        let params = M1::parameters(&[15.0]).unwrap();
        let r = accumulation(&[0.5], &params, &ones(1)).unwrap();
        assert_eq!(r.shape(), &[1, 1, 1]);
        assert_relative_eq!(r[(0, 0, 0)], 3.63 / 1.78, epsilon = 1e-12);
        assert_relative_eq!(r[(0, 0, 0)], 2.04, epsilon = 0.01);
    }

    #[test]
    fn test_likelihood_inverts_accumulation() {
        let params = M2::parameters(&DURATIONS).unwrap();
        let vars = Variables::from_vectors(array![0.2, 0.8], array![0.3, 0.5], array![0.1, 0.4]).unwrap();
        let p = [0.25, 0.5, 0.75];
        let r = accumulation(&p, &params, &vars).unwrap();
        assert_eq!(r.shape(), &[2, 3, 3]);

        for i in 0..2 {
            for run in 0..3 {
                let acc: Vec<f64> = r.slice(ndarray::s![i, run, ..]).to_vec();
                let back = likelihood(&acc, &params, &vars).unwrap();
                for k in 0..3 {
                    assert_relative_eq!(back[(i, run, k)], p[k], epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_per_run_variables() {
        let params = M3::parameters(&[15.0, 60.0]).unwrap();
        let vars = Variables {
            t: array![[1.0, 2.0]],
            f: array![[1.0, 2.0]],
            s: array![[1.0, 2.0]],
        };
        let p = likelihood(&[0.0], &params, &vars).unwrap();
        assert_relative_eq!(p[(0, 1, 0)], 1.0 / (1.0 + 3.46f64.exp()));

        let bad = Variables {
            t: array![[1.0, 2.0, 3.0]],
            f: array![[1.0, 2.0, 3.0]],
            s: array![[1.0, 2.0, 3.0]],
        };
        assert!(likelihood(&[0.0], &params, &bad).is_err());
    }

    #[test]
    fn test_unsupported_duration() {
        assert!(matches!(
            M4::parameters(&[15.0, 45.0]),
            Err(Error::Durations { duration, .. }) if duration == 45.0
        ));
        let params = M4::parameters(&[60.0]).unwrap();
        assert_eq!(params.b, vec![-3.30]);
        assert_eq!(M4::NAME, "M4");
    }

    #[test]
    fn test_invalid_inputs() {
        let params = M1::parameters(&[15.0]).unwrap();
        assert!(accumulation(&[1.5], &params, &ones(1)).is_err());
        assert!(likelihood(&[-1.0], &params, &ones(1)).is_err());
        assert!(Parameters::new(vec![1.0], vec![1.0, 2.0], vec![1.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_squeeze() {
        let a = Array3::<f64>::zeros((4, 1, 1));
        assert_eq!(squeeze(a).shape(), &[4]);
        let a = Array3::<f64>::zeros((4, 3, 1));
        assert_eq!(squeeze(a).shape(), &[4, 3]);
        let a = Array3::<f64>::zeros((4, 1, 2));
        assert_eq!(squeeze(a).shape(), &[4, 1, 2]);
    }
}
