use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::debug;

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::types::RawImageData;

/// Reads a single-channel 16-bit TIFF as an already linear mosaic.
pub fn read_grey16<P: AsRef<Path>>(path: P) -> Result<RawImageData> {
    let file = BufReader::new(File::open(path.as_ref())?);
    let mut decoder = Decoder::new(file).map_err(|e| DngError::UnsupportedFormat(e.to_string()))?;
    let (width, height) = decoder.dimensions().map_err(|e| DngError::UnsupportedFormat(e.to_string()))?;
    let color_type = decoder.colortype().map_err(|e| DngError::UnsupportedFormat(e.to_string()))?;
    if color_type != ColorType::Gray(16) {
        return Err(DngError::UnsupportedFormat(format!("expected 16-bit greyscale TIFF, found {color_type:?}")));
    }

    let data = match decoder.read_image().map_err(|e| DngError::UnsupportedFormat(e.to_string()))? {
        DecodingResult::U16(data) => data,
        _ => return Err(DngError::UnsupportedFormat("expected 16-bit samples".to_string())),
    };
    debug!(width, height, "Read greyscale TIFF");
    Ok(RawImageData::new(width as usize, height as usize, data, 16))
}
