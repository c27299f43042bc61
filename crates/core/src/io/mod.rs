//! GeoTIFF output for rasters

mod native;

pub use native::{write_geotiff, write_geotiff_to_buffer};
