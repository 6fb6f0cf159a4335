use std::io::Write;

use crate::image_pipeline::common::Result;
use crate::image_pipeline::tiff::types::OutputConfig;
use crate::image_pipeline::types::RgbImageData;

pub trait TiffWriter {
    fn write_rgb_tiff(&self, image: &RgbImageData, output: &mut dyn Write, config: &OutputConfig) -> Result<()>;
}
