//! # Burnflow Core
//!
//! Core types, traits and validation for the burnflow debris-flow hazard
//! library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform`: Shear-free affine transformation
//! - `CRS`: Coordinate Reference System identifier
//! - D8 flow-direction tables and NoData helpers
//! - Validation checks shared by every algorithm
//! - Algorithm traits for consistent API
//! - A single-band GeoTIFF writer behind `Raster::save`

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod validate;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{d8, nodata, DataType, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{d8, DataType, GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for raster algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
