//! Summaries over the pixels of each segment

use super::Segments;
use crate::maybe_rayon::*;
use burnflow_core::raster::{Raster, RasterElement};
use burnflow_core::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statistic applied over a group of pixel values.
///
/// The plain variants return NaN when any value is NaN or NoData. The
/// `Nan*` variants ignore those values instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Median,
    Std,
    Sum,
    NanMin,
    NanMax,
    NanMean,
    NanMedian,
    NanStd,
    NanSum,
}

impl Statistic {
    pub const ALL: [Statistic; 12] = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Std,
        Statistic::Sum,
        Statistic::NanMin,
        Statistic::NanMax,
        Statistic::NanMean,
        Statistic::NanMedian,
        Statistic::NanStd,
        Statistic::NanSum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Std => "std",
            Statistic::Sum => "sum",
            Statistic::NanMin => "nanmin",
            Statistic::NanMax => "nanmax",
            Statistic::NanMean => "nanmean",
            Statistic::NanMedian => "nanmedian",
            Statistic::NanStd => "nanstd",
            Statistic::NanSum => "nansum",
        }
    }

    /// Whether NaN values are skipped rather than propagated
    pub fn ignores_nan(self) -> bool {
        matches!(
            self,
            Statistic::NanMin
                | Statistic::NanMax
                | Statistic::NanMean
                | Statistic::NanMedian
                | Statistic::NanStd
                | Statistic::NanSum
        )
    }

    /// Apply the statistic. Empty input gives NaN, except sums which give 0.
    pub fn apply(self, values: &[f64]) -> f64 {
        let has_nan = values.iter().any(|v| v.is_nan());
        if has_nan && !self.ignores_nan() {
            return f64::NAN;
        }
        let mut values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return match self {
                Statistic::Sum | Statistic::NanSum => 0.0,
                _ => f64::NAN,
            };
        }

        let n = values.len() as f64;
        match self {
            Statistic::Min | Statistic::NanMin => values.iter().copied().fold(f64::INFINITY, f64::min),
            Statistic::Max | Statistic::NanMax => {
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
            Statistic::Sum | Statistic::NanSum => values.iter().sum(),
            Statistic::Mean | Statistic::NanMean => values.iter().sum::<f64>() / n,
            Statistic::Median | Statistic::NanMedian => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            Statistic::Std | Statistic::NanStd => {
                let mean = values.iter().sum::<f64>() / n;
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Statistic::ALL
            .into_iter()
            .find(|stat| stat.name() == lower)
            .ok_or_else(|| Error::InvalidParameter {
                name: "statistic",
                value: s.to_string(),
                reason: format!(
                    "supported statistics are {}",
                    Statistic::ALL.map(Statistic::name).join(", ")
                ),
            })
    }
}

impl Segments {
    /// Summarize raster values over each segment's own pixels.
    ///
    /// # Arguments
    /// * `statistic` - Statistic to apply
    /// * `raster` - Values aligned with the flow raster. NoData counts as NaN.
    ///
    /// # Returns
    /// One value per segment
    pub fn summary<T: RasterElement>(&self, statistic: Statistic, raster: &Raster<T>) -> Result<Array1<f64>> {
        self.check_raster(raster, "raster")?;
        let values = raster.to_f64().into_array();
        let out: Vec<f64> = (0..self.len())
            .into_par_iter()
            .map(|i| {
                let group: Vec<f64> = self.pixels[i].iter().map(|&p| values[p]).collect();
                statistic.apply(&group)
            })
            .collect();
        Ok(Array1::from(out))
    }

    /// Mean slope over each segment's pixels
    pub fn slope(&self, slopes: &Raster<f64>) -> Result<Array1<f64>> {
        self.summary(Statistic::Mean, slopes)
    }

    /// Whether any pixel of each segment lies inside the perimeter.
    ///
    /// NoData perimeter pixels count as outside.
    pub fn in_perimeter(&self, perimeter: &Raster<bool>) -> Result<Vec<bool>> {
        let max = self.summary(Statistic::NanMax, perimeter)?;
        Ok(max.iter().map(|&v| v > 0.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::y_network;
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_statistics() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Statistic::Min.apply(&values), 1.0);
        assert_eq!(Statistic::Max.apply(&values), 4.0);
        assert_eq!(Statistic::Sum.apply(&values), 10.0);
        assert_eq!(Statistic::Mean.apply(&values), 2.5);
        assert_eq!(Statistic::Median.apply(&values), 2.5);
        assert_relative_eq!(Statistic::Std.apply(&values), 1.25f64.sqrt());
    }

    #[test]
    fn test_nan_handling() {
        let values = [1.0, f64::NAN, 3.0];
        assert!(Statistic::Mean.apply(&values).is_nan());
        assert_eq!(Statistic::NanMean.apply(&values), 2.0);
        assert_eq!(Statistic::NanMedian.apply(&values), 2.0);
        assert!(Statistic::NanMax.apply(&[f64::NAN]).is_nan());
        assert_eq!(Statistic::NanSum.apply(&[f64::NAN]), 0.0);
    }

    #[test]
    fn test_parse_statistic() {
        assert_eq!("NanMean".parse::<Statistic>().unwrap(), Statistic::NanMean);
        assert_eq!("max".parse::<Statistic>().unwrap(), Statistic::Max);
        assert!("mode".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_segment_summary() {
        let (flow, mask) = y_network();
        let s = Segments::new(&flow, &mask, None).unwrap();
        let mut values = Raster::from_array(array![
            [1.0, 0.0, 2.0],
            [0.0, 3.0, 0.0],
            [0.0, 5.0, 0.0],
            [0.0, -9.0, 0.0],
        ])
        .unwrap();
        values.set_transform(*flow.transform());

        let mean = s.summary(Statistic::Mean, &values).unwrap();
        assert_eq!(mean.to_vec(), vec![1.0, 2.0, -1.0 / 3.0]);

        values.set_nodata(Some(-9.0));
        let max = s.summary(Statistic::Max, &values).unwrap();
        assert!(max[2].is_nan());
        let max = s.summary(Statistic::NanMax, &values).unwrap();
        assert_eq!(max[2], 5.0);
    }

    #[test]
    fn test_in_perimeter() {
        let (flow, mask) = y_network();
        let s = Segments::new(&flow, &mask, None).unwrap();
        let mut perimeter = flow.map(None, |_| false);
        perimeter.set(3, 1, true).unwrap();
        assert_eq!(s.in_perimeter(&perimeter).unwrap(), vec![false, false, true]);
    }

    #[test]
    fn test_summary_misaligned() {
        let (flow, mask) = y_network();
        let s = Segments::new(&flow, &mask, None).unwrap();
        let values: Raster<f64> = Raster::new(2, 2);
        assert!(s.summary(Statistic::Mean, &values).is_err());
    }
}
