//! Error types for burnflow

use thiserror::Error;

/// Main error type for burnflow operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{name} must have shape {expected:?}, but it has shape {actual:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{name} must have {expected} dimension(s), but it has {actual}")]
    Dimension {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("{name} must not be empty")]
    EmptyArray { name: String },

    #[error("{name} has dtype {actual}, which is not allowed (allowed: {allowed})")]
    Type {
        name: String,
        actual: String,
        allowed: String,
    },

    #[error("{name} {requirement}, but element {index} ({value}) is not")]
    Value {
        name: String,
        requirement: String,
        index: usize,
        value: f64,
    },

    #[error("Invalid transform: {0}")]
    Transform(String),

    #[error("Invalid CRS: {0}")]
    Crs(String),

    #[error("Raster shape mismatch: {name} has shape ({ar}, {ac}), expected ({er}, {ec})")]
    RasterShape {
        name: String,
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Raster transform mismatch: {name} does not share the transform of the reference raster")]
    RasterTransform { name: String },

    #[error("Raster CRS mismatch: {name} has CRS {actual}, expected {expected}")]
    RasterCrs {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("{0} does not have a NoData value")]
    MissingNoData(String),

    #[error("Unsupported rainfall duration {duration} minutes (supported: {supported})")]
    Durations { duration: f64, supported: String },

    #[error("Output file already exists: {0}")]
    FileExists(String),

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Builds an element-predicate error for the first offending element
    pub fn value(name: &str, requirement: &str, index: usize, value: f64) -> Self {
        Error::Value {
            name: name.to_string(),
            requirement: requirement.to_string(),
            index,
            value,
        }
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for burnflow operations
pub type Result<T> = std::result::Result<T, Error>;
