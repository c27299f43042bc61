//! Native GeoTIFF writing
//!
//! Uses the `tiff` crate. Each raster becomes a single-band, uncompressed
//! GeoTIFF in its own storage type; booleans are widened to 8-bit integers.

use crate::error::Result;
use crate::raster::{DataType, Raster, RasterElement};
use crate::validate;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use tiff::encoder::colortype::{
    ColorType, Gray16, Gray32, Gray32Float, Gray64, Gray64Float, Gray8, GrayI16, GrayI32,
    GrayI64, GrayI8,
};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Write a Raster to a GeoTIFF file.
///
/// Fails with `FileExists` if the path exists and `overwrite` is false.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, overwrite: bool) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = validate::output_path(path, overwrite)?;
    let file = BufWriter::new(File::create(&path)?);
    encode_geotiff(raster, file)?;
    debug!(path = %path.display(), rows = raster.rows(), cols = raster.cols(), "saved raster");
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let values: Vec<f64> = raster.data().iter().map(|v| v.to_f64()).collect();

    match T::dtype() {
        DataType::Bool | DataType::U8 => write_band::<Gray8, _, T>(&mut encoder, raster, &values, |v| v as u8),
        DataType::U16 => write_band::<Gray16, _, T>(&mut encoder, raster, &values, |v| v as u16),
        DataType::U32 => write_band::<Gray32, _, T>(&mut encoder, raster, &values, |v| v as u32),
        DataType::U64 => write_band::<Gray64, _, T>(&mut encoder, raster, &values, |v| v as u64),
        DataType::I8 => write_band::<GrayI8, _, T>(&mut encoder, raster, &values, |v| v as i8),
        DataType::I16 => write_band::<GrayI16, _, T>(&mut encoder, raster, &values, |v| v as i16),
        DataType::I32 => write_band::<GrayI32, _, T>(&mut encoder, raster, &values, |v| v as i32),
        DataType::I64 => write_band::<GrayI64, _, T>(&mut encoder, raster, &values, |v| v as i64),
        DataType::F32 => write_band::<Gray32Float, _, T>(&mut encoder, raster, &values, |v| v as f32),
        DataType::F64 => write_band::<Gray64Float, _, T>(&mut encoder, raster, &values, |v| v),
    }
}

fn write_band<C, W, T>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    values: &[f64],
    cast: impl Fn(f64) -> C::Inner,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
    T: RasterElement,
{
    let (rows, cols) = raster.shape();
    let data: Vec<C::Inner> = values.iter().map(|&v| cast(v)).collect();
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    let scale = [gt.dx, -gt.dy, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.left, gt.top, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geokey_directory(raster.crs().and_then(|c| c.epsg()));
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])?;

    if let Some(nodata) = raster.nodata() {
        let text = nodata_text(nodata.to_f64());
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())?;
    }

    image.write_data(&data)?;
    Ok(())
}

/// GeoKeyDirectory entries: model type, raster-is-area and the EPSG code
/// when one is known.
fn geokey_directory(epsg: Option<u32>) -> Vec<u16> {
    // Version 1.1.0
    let mut keys: Vec<u16> = vec![1, 1, 0, 0];
    let mut push = |key: u16, value: u16| keys.extend_from_slice(&[key, 0, 1, value]);

    match epsg.and_then(|code| u16::try_from(code).ok()) {
        Some(code) if (4000..5000).contains(&code) => {
            push(1024, 2); // ModelTypeGeographic
            push(1025, 1); // RasterPixelIsArea
            push(2048, code);
        }
        Some(code) => {
            push(1024, 1); // ModelTypeProjected
            push(1025, 1);
            push(3072, code);
        }
        None => {
            push(1024, 1);
            push(1025, 1);
        }
    }
    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

/// GDAL writes the NoData value as ASCII text
fn nodata_text(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value}")
    }
}
