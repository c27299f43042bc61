//! Debris-flow hazard models
//!
//! - **staley2017**: Logistic likelihood and rainfall thresholds
//! - **gartner2014**: Potential sediment volumes
//! - **cannon2010**: Combined likelihood/volume hazard classes

pub mod cannon2010;
pub mod gartner2014;
pub mod staley2017;
