//! Unit conversions
//!
//! - **slope**: Gradients to and from percent, angles and sines
//! - **intensity**: Rainfall intensities to and from accumulations

pub mod intensity;
pub mod slope;
