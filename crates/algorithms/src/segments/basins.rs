//! Terminal outlet basins

use super::Segments;
use crate::maybe_rayon::*;
use burnflow_core::raster::Raster;
use burnflow_core::Result;
use ndarray::Array2;
use tracing::info;

impl Segments {
    /// Locate the drainage basin of every terminal outlet.
    ///
    /// Each pixel is assigned the id of the first terminal outlet on its
    /// downstream path; pixels draining into no terminal outlet are 0
    /// (NoData). Basins are traced independently, so `parallel` only changes
    /// how the work is scheduled: both modes paint identical rasters.
    ///
    /// The result is cached until filtering changes the terminal outlets.
    pub fn locate_basins(&mut self, parallel: bool) -> Result<&Raster<u32>> {
        let basins = match self.basins.take() {
            Some(basins) => basins,
            None => self.trace_basins(parallel)?,
        };
        let basins: &Raster<u32> = self.basins.insert(basins);
        Ok(basins)
    }

    /// Cached basin raster, if [`Segments::locate_basins`] has run
    pub fn basins(&self) -> Option<&Raster<u32>> {
        self.basins.as_ref()
    }

    fn trace_basins(&self, parallel: bool) -> Result<Raster<u32>> {
        let terminals: Vec<usize> = (0..self.len()).filter(|&i| self.child[i] < 0).collect();
        let mut is_outlet = Array2::from_elem(self.raster_shape(), false);
        for &i in &terminals {
            is_outlet[self.outlet(i)] = true;
        }

        // Other terminal outlets stop the upstream search
        let trace = |i: usize| {
            let pixels = self
                .graph
                .upstream_pixels(self.outlet(i), |r, c| is_outlet[(r, c)]);
            (self.ids[i], pixels)
        };
        let nbasins = terminals.len();
        let basins: Vec<(u32, Vec<(usize, usize)>)> = if parallel {
            terminals.into_par_iter().map(trace).collect()
        } else {
            terminals.into_iter().map(trace).collect()
        };

        let mut raster = Array2::<u32>::zeros(self.raster_shape());
        for (id, pixels) in basins {
            for p in pixels {
                raster[p] = id;
            }
        }
        info!(basins = nbasins, parallel, "located terminal basins");
        self.flow().derive(raster, Some(0))
    }
}
