//! TIFF output module
//!
//! Writes the processed RGB raster as a 16-bit TIFF and reads plain
//! greyscale TIFFs for demosaicing without a DNG container.

mod reader;
mod standard_tiff_writer;
pub mod types;
mod writer;

#[cfg(test)]
mod tests;

pub use reader::read_grey16;
pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{OutputConfig, OutputConfigBuilder, TiffCompression};
pub use writer::TiffWriter;
