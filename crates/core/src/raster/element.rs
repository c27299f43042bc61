//! Raster element trait for generic cell values

use num_traits::NumCast;
use std::fmt::{self, Debug};

/// Storage type of a raster's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DataType {
    pub fn is_bool(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_bool() && !self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64 | DataType::F32 | DataType::F64
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::U64 => "uint64",
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for types that can be stored in a raster cell.
///
/// Booleans, integers and floats are all valid raster values. Every
/// element converts losslessly-enough to `f64` for summaries, and
/// `from_f64` is the castability test used when a NoData value arrives
/// as a plain number.
pub trait RasterElement: Copy + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Storage type tag
    fn dtype() -> DataType;

    /// Default NoData sentinel for this type
    fn default_nodata() -> Self;

    /// The additive identity (`false` for booleans)
    fn zero() -> Self;

    /// Convert self to f64
    fn to_f64(self) -> f64;

    /// Cast an f64 into this type, or `None` when the value is not
    /// representable (fractional for integers, out of range, NaN for
    /// non-floats, anything but 0/1 for booleans).
    fn from_f64(value: f64) -> Option<Self>;

    /// Check if this value represents NoData.
    ///
    /// NaN compares equal to a NaN sentinel.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;
}

macro_rules! impl_raster_element_int {
    ($t:ty, $dtype:expr, $nodata:expr) => {
        impl RasterElement for $t {
            fn dtype() -> DataType {
                $dtype
            }

            fn default_nodata() -> Self {
                $nodata
            }

            fn zero() -> Self {
                0
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Option<Self> {
                if !value.is_finite() || value.fract() != 0.0 {
                    return None;
                }
                <$t as NumCast>::from(value)
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $dtype:expr) => {
        impl RasterElement for $t {
            fn dtype() -> DataType {
                $dtype
            }

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn zero() -> Self {
                0.0
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Option<Self> {
                if value.is_finite() && value.abs() > <$t>::MAX as f64 {
                    return None;
                }
                Some(value as $t)
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) if nd.is_nan() => self.is_nan(),
                    Some(nd) => *self == nd,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(i8, DataType::I8, i8::MIN);
impl_raster_element_int!(i16, DataType::I16, i16::MIN);
impl_raster_element_int!(i32, DataType::I32, i32::MIN);
impl_raster_element_int!(i64, DataType::I64, i64::MIN);
impl_raster_element_int!(u8, DataType::U8, 0);
impl_raster_element_int!(u16, DataType::U16, 0);
impl_raster_element_int!(u32, DataType::U32, 0);
impl_raster_element_int!(u64, DataType::U64, 0);
impl_raster_element_float!(f32, DataType::F32);
impl_raster_element_float!(f64, DataType::F64);

impl RasterElement for bool {
    fn dtype() -> DataType {
        DataType::Bool
    }

    fn default_nodata() -> Self {
        false
    }

    fn zero() -> Self {
        false
    }

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn from_f64(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(false)
        } else if value == 1.0 {
            Some(true)
        } else {
            None
        }
    }

    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        nodata == Some(*self)
    }
}
