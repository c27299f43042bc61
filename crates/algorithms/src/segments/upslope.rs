//! Statistics over the full upslope catchment of each segment
//!
//! Every statistic is one flow accumulation pass over the raster, read at
//! each segment's outlet pixel. The outlet accumulates every pixel that
//! drains through the segment, upstream segments included.

use super::Segments;
use burnflow_core::raster::{Raster, RasterElement};
use burnflow_core::{validate, Result};
use ndarray::{Array1, Array2};
use tracing::debug;

impl Segments {
    /// Accumulate per-pixel weights and read the total at every outlet
    fn accumulate_at_outlets(&self, weights: &Array2<f64>) -> Array1<f64> {
        let acc = self.graph.accumulate(weights);
        (0..self.len()).map(|i| acc[self.outlet(i)]).collect()
    }

    /// 1 where the mask is true and not NoData, 0 elsewhere
    fn mask_weights(&self, mask: Option<&Raster<bool>>) -> Result<Array2<f64>> {
        match mask {
            Some(mask) => {
                self.check_raster(mask, "mask")?;
                let valid = mask.data_mask();
                Ok(Array2::from_shape_fn(mask.shape(), |p| {
                    if valid[p] && mask.data()[p] {
                        1.0
                    } else {
                        0.0
                    }
                }))
            }
            None => Ok(Array2::from_elem(self.raster_shape(), 1.0)),
        }
    }

    /// Number of catchment pixels of every segment, optionally within a mask
    pub fn catchment_pixels(&self, mask: Option<&Raster<bool>>) -> Result<Array1<f64>> {
        let weights = self.mask_weights(mask)?;
        Ok(self.accumulate_at_outlets(&weights))
    }

    /// Catchment area of every segment in squared map units.
    ///
    /// With a mask, only catchment pixels inside the mask count.
    pub fn area(&self, mask: Option<&Raster<bool>>) -> Result<Array1<f64>> {
        let pixel_area = self.transform().pixel_area();
        Ok(self.catchment_pixels(mask)? * pixel_area)
    }

    /// Proportion of each catchment inside the mask
    pub fn upslope_ratio(&self, mask: &Raster<bool>) -> Result<Array1<f64>> {
        let inside = self.catchment_pixels(Some(mask))?;
        let total = self.catchment_pixels(None)?;
        Ok(inside / total)
    }

    /// Proportion of each catchment that is burned
    pub fn burn_ratio(&self, isburned: &Raster<bool>) -> Result<Array1<f64>> {
        self.upslope_ratio(isburned)
    }

    /// Burned catchment area of every segment
    pub fn burned_area(&self, isburned: &Raster<bool>) -> Result<Array1<f64>> {
        self.area(Some(isburned))
    }

    /// Developed catchment area of every segment
    pub fn developed_area(&self, isdeveloped: &Raster<bool>) -> Result<Array1<f64>> {
        self.area(Some(isdeveloped))
    }

    /// Mean of `values` over each segment's catchment.
    ///
    /// # Arguments
    /// * `values` - Values aligned with the flow raster. NoData and NaN
    ///   pixels are left out of the sum.
    /// * `mask` - Restrict the mean to catchment pixels inside the mask
    /// * `npixels` - Precomputed denominators, one per segment. When absent,
    ///   the number of valid catchment pixels is accumulated.
    pub fn catchment_mean<T: RasterElement>(
        &self,
        values: &Raster<T>,
        mask: Option<&Raster<bool>>,
        npixels: Option<&[f64]>,
    ) -> Result<Array1<f64>> {
        self.check_raster(values, "values")?;
        let mut weights = self.mask_weights(mask)?;
        let values = values.to_f64().into_array();
        weights.zip_mut_with(&values, |w, v| {
            if v.is_nan() {
                *w = 0.0;
            }
        });

        let mut sums = weights.clone();
        sums.zip_mut_with(&values, |w, &v| {
            if *w != 0.0 {
                *w = v;
            }
        });
        let sums = self.accumulate_at_outlets(&sums);

        let counts = match npixels {
            Some(npixels) => {
                self.check_length("npixels", npixels.len())?;
                let npixels = Array1::from(npixels.to_vec());
                validate::positive("npixels", &npixels, false, None)?;
                npixels
            }
            None => self.accumulate_at_outlets(&weights),
        };
        debug!(segments = self.len(), "computed catchment means");
        Ok(sums / counts)
    }

    /// Catchment relief of every segment: the relief value at its outlet
    pub fn relief(&self, relief: &Raster<f64>) -> Result<Array1<f64>> {
        self.check_raster(relief, "relief")?;
        let values = relief.to_f64().into_array();
        Ok((0..self.len()).map(|i| values[self.outlet(i)]).collect())
    }

    /// Topographic ruggedness: relief / sqrt(catchment area).
    ///
    /// # Arguments
    /// * `relief` - Vertical relief raster
    /// * `areas` - Catchment areas, one per segment. Computed when absent.
    pub fn ruggedness(&self, relief: &Raster<f64>, areas: Option<&[f64]>) -> Result<Array1<f64>> {
        let areas = match areas {
            Some(areas) => {
                self.check_length("areas", areas.len())?;
                Array1::from(areas.to_vec())
            }
            None => self.area(None)?,
        };
        validate::positive("areas", &areas, false, None)?;
        Ok(self.relief(relief)? / areas.mapv(f64::sqrt))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::y_network;
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn y_segments() -> (Segments, Raster<u8>) {
        let (flow, mask) = y_network();
        (Segments::new(&flow, &mask, None).unwrap(), flow)
    }

    #[test]
    fn test_area_uses_accumulation() {
        let (s, _) = y_segments();
        let pixels = s.catchment_pixels(None).unwrap();
        // The top row and the middle column drain through (3, 1)
        assert_eq!(pixels.to_vec(), vec![1.0, 1.0, 6.0]);
        let area = s.area(None).unwrap();
        assert_eq!(area[2], 600.0);
    }

    #[test]
    fn test_burn_ratio_and_area() {
        let (s, flow) = y_segments();
        let mut burned = flow.map(None, |_| false);
        for col in 0..3 {
            burned.set(0, col, true).unwrap();
        }
        let ratio = s.burn_ratio(&burned).unwrap();
        assert_eq!(ratio[0], 1.0);
        assert_relative_eq!(ratio[2], 0.5);
        assert_eq!(s.burned_area(&burned).unwrap()[2], 300.0);
        assert_eq!(s.developed_area(&burned).unwrap()[1], 100.0);
    }

    #[test]
    fn test_catchment_mean() {
        let (s, flow) = y_segments();
        let mut values = flow.map(None, |_| 2.0f64);
        values.set(0, 0, 8.0).unwrap();
        values.set(2, 1, -1.0).unwrap();
        values.set_nodata(Some(-1.0));

        let mean = s.catchment_mean(&values, None, None).unwrap();
        assert_eq!(mean[0], 8.0);
        // Five valid pixels: four at 2 and one at 8
        assert_relative_eq!(mean[2], 16.0 / 5.0);

        let npixels = [1.0, 1.0, 8.0];
        let mean = s.catchment_mean(&values, None, Some(&npixels)).unwrap();
        assert_relative_eq!(mean[2], 2.0);
        assert!(s.catchment_mean(&values, None, Some(&[1.0])).is_err());
    }

    #[test]
    fn test_relief_and_ruggedness() {
        let (s, flow) = y_segments();
        let mut relief = flow.map(None, |_| 0.0f64);
        relief.set(3, 1, 60.0).unwrap();
        relief.set(0, 0, 5.0).unwrap();

        let r = s.relief(&relief).unwrap();
        assert_eq!(r.to_vec(), vec![5.0, 0.0, 60.0]);

        let rug = s.ruggedness(&relief, Some(&[25.0, 1.0, 3600.0])).unwrap();
        assert_eq!(rug.to_vec(), vec![1.0, 0.0, 1.0]);
        assert!(s.ruggedness(&relief, Some(&[0.0, 1.0, 1.0])).is_err());
    }

    #[test]
    fn test_upslope_ratio_matches_full_catchment() {
        let (s, flow) = y_segments();
        let all = flow.map(None, |_| true);
        assert_eq!(s.upslope_ratio(&all).unwrap(), array![1.0, 1.0, 1.0]);
    }
}
