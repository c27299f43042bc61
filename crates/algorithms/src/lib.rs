//! # Burnflow Algorithms
//!
//! Post-wildfire debris-flow hazard assessment over gridded terrain.
//!
//! ## Modules
//!
//! - **watershed**: DEM conditioning, D8 flow, slopes, relief, accumulation, catchments
//! - **severity**: BARC4 burn severity masks and dNBR classification
//! - **segments**: Stream segment networks, per-segment statistics, basins, export
//! - **models**: Staley (2017) likelihoods, Gartner (2014) volumes, Cannon (2010) hazard
//! - **utils**: Slope unit conversions and rainfall intensity/accumulation

pub(crate) mod maybe_rayon;

pub mod models;
pub mod segments;
pub mod severity;
pub mod utils;
pub mod watershed;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::models::{cannon2010, gartner2014, staley2017};
    pub use crate::segments::{ConfinementParams, FeatureType, Property, Segments, Statistic};
    pub use crate::severity::{Level, DEFAULT_THRESHOLDS};
    pub use crate::watershed::{
        catchment, condition, flow_accumulation, flow_direction, network, relief, slopes,
        Condition, ConditionParams, FlowAccumulation, FlowDirection, NetworkParams,
    };
    pub use burnflow_core::prelude::*;
}
