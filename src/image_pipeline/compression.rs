//! Strip and tile decompression
//!
//! Decoders turn the compressed bytes of one strip or tile into integer
//! samples, given the sample geometry declared by the directory.

mod huffman;
mod lossless_jpeg;
mod uncompressed;

#[cfg(test)]
mod tests;

pub use huffman::HuffmanTable;
pub use lossless_jpeg::LosslessJpegDecoder;
pub use uncompressed::UncompressedDecoder;

use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::reader::byte_reader::ByteOrder;
use crate::image_pipeline::reader::tags::{COMPRESSION_LOSSLESS_JPEG, COMPRESSION_UNCOMPRESSED};

/// Shape of the samples contained in one strip or tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleGeometry {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub bits_per_sample: u16,
    pub byte_order: ByteOrder,
}

impl SampleGeometry {
    pub fn sample_count(&self) -> usize {
        self.width * self.height * self.samples_per_pixel
    }
}

pub trait CompressionDecoder: Send + Sync {
    fn decode(&self, data: &[u8], geometry: &SampleGeometry) -> Result<Vec<u16>>;
}

/// Picks the decoder for a TIFF compression id.
pub fn decoder_for(compression: u16) -> Result<Box<dyn CompressionDecoder>> {
    match compression {
        COMPRESSION_UNCOMPRESSED => Ok(Box::new(UncompressedDecoder)),
        COMPRESSION_LOSSLESS_JPEG => Ok(Box::new(LosslessJpegDecoder)),
        other => Err(DngError::UnsupportedFormat(format!("compression {other}"))),
    }
}
