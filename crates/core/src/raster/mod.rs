//! Raster data structures and operations

pub mod d8;
mod element;
mod geotransform;
mod grid;
pub mod nodata;

pub use element::{DataType, RasterElement};
pub use geotransform::GeoTransform;
pub use grid::Raster;
