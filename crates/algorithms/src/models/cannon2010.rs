//! Cannon et al. (2010) combined hazard classification
//!
//! Likelihoods and volumes are each scored into classes by thresholds,
//! then the summed score is classified as low (1), moderate (2) or high (3)
//! hazard. A value on a threshold falls in the lower class.
//!
//! Reference: Cannon, S. H., et al. (2010). Predicting the probability and
//! volume of postwildfire debris flows in the intermountain western United
//! States. GSA Bulletin, 122(1-2), 127-144.

use burnflow_core::{validate, Error, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default likelihood thresholds
pub const P_THRESHOLDS: [f64; 3] = [0.25, 0.5, 0.75];

/// Default volume thresholds (m³)
pub const V_THRESHOLDS: [f64; 3] = [1e3, 1e4, 1e5];

/// Default combined-score thresholds
pub const H_THRESHOLDS: [f64; 2] = [3.0, 6.0];

/// Thresholds for [`hazard`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub p: Vec<f64>,
    pub v: Vec<f64>,
    pub h: Vec<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            p: P_THRESHOLDS.to_vec(),
            v: V_THRESHOLDS.to_vec(),
            h: H_THRESHOLDS.to_vec(),
        }
    }
}

fn check_thresholds(name: &str, thresholds: &[f64]) -> Result<()> {
    validate::nonempty(name, thresholds.len())?;
    for (k, &t) in thresholds.iter().enumerate() {
        if !t.is_finite() {
            return Err(Error::value(name, "must be finite", k, t));
        }
    }
    validate::sorted(name, thresholds)
}

/// Class 1 for values at or below the first threshold, K+1 above the last
fn classify(values: &ArrayD<f64>, thresholds: &[f64]) -> ArrayD<f64> {
    values.mapv(|v| {
        if v.is_nan() {
            f64::NAN
        } else {
            1.0 + thresholds.iter().filter(|&&t| t < v).count() as f64
        }
    })
}

/// Score likelihoods in [0, 1]
pub fn pscore(probabilities: &ArrayD<f64>, thresholds: &[f64]) -> Result<ArrayD<f64>> {
    check_thresholds("p_thresholds", thresholds)?;
    let threshold_values = ndarray::ArrayView1::from(thresholds);
    validate::inrange("p_thresholds", &threshold_values, 0.0, 1.0, None)?;
    validate::inrange("probabilities", probabilities, 0.0, 1.0, None)?;
    Ok(classify(probabilities, thresholds))
}

/// Score volumes (m³), >= 0
pub fn vscore(volumes: &ArrayD<f64>, thresholds: &[f64]) -> Result<ArrayD<f64>> {
    check_thresholds("v_thresholds", thresholds)?;
    let threshold_values = ndarray::ArrayView1::from(thresholds);
    validate::positive("v_thresholds", &threshold_values, true, None)?;
    validate::positive("volumes", volumes, true, None)?;
    Ok(classify(volumes, thresholds))
}

/// Classify combined scores into hazard classes
pub fn hscore(scores: &ArrayD<f64>, thresholds: &[f64]) -> Result<ArrayD<f64>> {
    check_thresholds("h_thresholds", thresholds)?;
    let threshold_values = ndarray::ArrayView1::from(thresholds);
    validate::integers("h_thresholds", &threshold_values, None)?;
    validate::positive("h_thresholds", &threshold_values, false, None)?;
    Ok(classify(scores, thresholds))
}

/// Combined hazard classes for likelihoods and volumes.
///
/// `probabilities` and `volumes` are broadcast against each other; NaN in
/// either input gives NaN.
pub fn hazard(probabilities: &ArrayD<f64>, volumes: &ArrayD<f64>, thresholds: &Thresholds) -> Result<ArrayD<f64>> {
    let shape = validate::broadcast_shapes("probabilities", probabilities.shape(), "volumes", volumes.shape())?;
    let p = pscore(&validate::broadcast("probabilities", probabilities, &shape)?, &thresholds.p)?;
    let v = vscore(&validate::broadcast("volumes", volumes, &shape)?, &thresholds.v)?;
    let h = hscore(&(p + v), &thresholds.h)?;
    debug!(?shape, "classified combined hazard");
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr0, array};

    #[test]
    fn test_pscore_defaults() {
        let p = array![0.0, 0.25, 0.5, 0.75, 1.0].into_dyn();
        let scores = pscore(&p, &P_THRESHOLDS).unwrap();
        assert_eq!(scores, array![1.0, 1.0, 2.0, 3.0, 4.0].into_dyn());
    }

    #[test]
    fn test_vscore_defaults() {
        let v = array![0.0, 1e3, 1e4, 1e5, 1e6].into_dyn();
        let scores = vscore(&v, &V_THRESHOLDS).unwrap();
        assert_eq!(scores, array![1.0, 1.0, 2.0, 3.0, 4.0].into_dyn());
    }

    #[test]
    fn test_hazard_scalar() {
        let h = hazard(&arr0(0.5).into_dyn(), &arr0(1e4).into_dyn(), &Thresholds::default()).unwrap();
        assert_eq!(h.ndim(), 0);
        assert_eq!(h.sum(), 2.0);
    }

    #[test]
    fn test_hazard_broadcast() {
        let p = array![[0.1], [0.9]].into_dyn();
        let v = array![10.0, 1e6].into_dyn();
        let h = hazard(&p, &v, &Thresholds::default()).unwrap();
        // Scores: (1+1, 1+4) and (4+1, 4+4)
        assert_eq!(h, array![[1.0, 2.0], [2.0, 3.0]].into_dyn());

        let wrong = array![1.0, 2.0, 3.0].into_dyn();
        assert!(hazard(&array![0.1, 0.2].into_dyn(), &wrong, &Thresholds::default()).is_err());
    }

    #[test]
    fn test_nan_propagates() {
        let p = array![f64::NAN, 0.3].into_dyn();
        let scores: Vec<f64> = pscore(&p, &P_THRESHOLDS).unwrap().iter().copied().collect();
        assert!(scores[0].is_nan());
        assert_eq!(scores[1], 2.0);
    }

    #[test]
    fn test_invalid_thresholds() {
        let p = array![0.5].into_dyn();
        assert!(pscore(&p, &[0.5, 0.25]).is_err());
        assert!(pscore(&p, &[0.5, 1.5]).is_err());
        assert!(pscore(&p, &[]).is_err());
        assert!(vscore(&p, &[-1.0, 1.0]).is_err());
        assert!(hscore(&p, &[2.5, 6.0]).is_err());
        assert!(hscore(&p, &[0.0, 6.0]).is_err());
        assert!(pscore(&array![1.2].into_dyn(), &P_THRESHOLDS).is_err());
        assert!(vscore(&array![-5.0].into_dyn(), &V_THRESHOLDS).is_err());
    }
}
