use tracing::debug;

use crate::image_pipeline::reader::ImageFileDirectory;
use super::PostProcessorOperation;

/// Linear gain of `2^ev`, with `ev` taken from BaselineExposure plus
/// BaselineExposureOffset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureCorrection {
    scale: f64,
}

impl ExposureCorrection {
    pub fn new(ev: f64) -> Self {
        Self { scale: ev.exp2() }
    }

    /// `None` when neither exposure tag is present.
    pub fn from_directory(ifd0: &ImageFileDirectory) -> Option<Self> {
        let (baseline, offset) = (ifd0.baseline_exposure(), ifd0.baseline_exposure_offset());
        if baseline.is_none() && offset.is_none() {
            return None;
        }
        let ev = baseline.unwrap_or(0.0) + offset.unwrap_or(0.0);
        debug!(ev, "Exposure correction");
        Some(Self::new(ev))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl PostProcessorOperation for ExposureCorrection {
    fn name(&self) -> &'static str {
        "ExposureCorrection"
    }

    fn process(&self, rgb: [f64; 3]) -> [f64; 3] {
        rgb.map(|v| v * self.scale)
    }
}
