//! Default crop of the demosaiced image

use tracing::{debug, info_span};

use crate::image_pipeline::common::{DngError, Result, RunTimer};
use crate::image_pipeline::reader::ImageFileDirectory;
use crate::image_pipeline::types::RgbImageData;

/// Cuts the DefaultCrop rectangle, positioned relative to the ActiveArea,
/// out of a full-size image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCropper {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl ImageCropper {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Missing tags default to the whole image.
    pub fn from_directory(raw: &ImageFileDirectory) -> Result<Self> {
        let (image_width, image_height) = (raw.width()?, raw.height()?);
        let [top, left, ..] = raw.active_area()?.unwrap_or([0, 0, image_height, image_width]);
        let (origin_x, origin_y) = raw.default_crop_origin()?.unwrap_or((0.0, 0.0));
        let (width, height) = raw
            .default_crop_size()?
            .unwrap_or((image_width as f64, image_height as f64));
        let cropper = Self::new(
            left + origin_x.max(0.0) as usize,
            top + origin_y.max(0.0) as usize,
            width.max(0.0) as usize,
            height.max(0.0) as usize,
        );
        debug!(?cropper, "Default crop");
        Ok(cropper)
    }

    pub fn rect(&self) -> (usize, usize, usize, usize) {
        (self.x, self.y, self.width, self.height)
    }

    /// An odd cropped width, which device textures do not survive.
    pub fn is_non_pot_crop(&self) -> bool {
        self.width % 2 != 0
    }

    pub fn crop(&self, image: &RgbImageData) -> Result<RgbImageData> {
        if self.x + self.width > image.width || self.y + self.height > image.height {
            return Err(DngError::UnsupportedFormat(format!(
                "crop {}x{}+{}+{} exceeds the {}x{} image",
                self.width, self.height, self.x, self.y, image.width, image.height
            )));
        }
        Ok(image.region(self.x, self.y, self.width, self.height))
    }

    /// Crops under the "ImageCroppingProcessor" timer task.
    pub fn process(&self, image: &RgbImageData, detail: &str, timer: &mut RunTimer) -> Result<RgbImageData> {
        let _span = info_span!("crop", width = self.width, height = self.height).entered();
        timer.time("ImageCroppingProcessor", detail, || self.crop(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::reader::tag;
    use crate::image_pipeline::testing::{directory, rationals, FixtureIfd, FixtureValue};

    #[test]
    fn test_crop_defaults_to_whole_image() {
        let cropper = ImageCropper::from_directory(&directory(FixtureIfd::cfa_raw(6, 4, 16, [0, 1, 1, 2]))).unwrap();
        assert_eq!(cropper.rect(), (0, 0, 6, 4));
        assert!(!cropper.is_non_pot_crop());
    }

    #[test]
    fn test_crop_origin_is_relative_to_active_area() {
        let ifd = FixtureIfd::cfa_raw(10, 8, 16, [0, 1, 1, 2])
            .with(tag::ACTIVE_AREA, FixtureValue::Long(vec![1, 2, 8, 10]))
            .with(tag::DEFAULT_CROP_ORIGIN, rationals(&[1.0, 2.0]))
            .with(tag::DEFAULT_CROP_SIZE, rationals(&[5.0, 3.0]));
        let cropper = ImageCropper::from_directory(&directory(ifd)).unwrap();
        assert_eq!(cropper.rect(), (3, 3, 5, 3));
        assert!(cropper.is_non_pot_crop());

        let data: Vec<u16> = (0..10 * 8 * 3).map(|v| v as u16).collect();
        let image = RgbImageData::from_data(10, 8, data);
        let mut timer = RunTimer::new();
        let cropped = cropper.process(&image, "before GPU", &mut timer).unwrap();
        assert_eq!((cropped.width, cropped.height), (5, 3));
        assert_eq!(cropped.pixel(0, 0), image.pixel(3, 3));
        assert_eq!(cropped.pixel(4, 2), image.pixel(7, 5));
        assert!(timer.get_task("ImageCroppingProcessor").is_some());
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let image = RgbImageData::new(4, 4);
        let result = ImageCropper::new(2, 0, 3, 4).crop(&image);
        assert!(matches!(result, Err(DngError::UnsupportedFormat(_))));
    }
}
