//! Colour and tone post-processing of the demosaiced image
//!
//! Operations map one normalised RGB triple at a time. The chain starts in
//! camera space, works in XYZ(D50) and ends with the sRGB encoding; which
//! stages take part is decided from the profile tags of the 0th directory.

pub mod color;
mod color_space;
mod exposure;
mod hue_sat;
mod illuminant;
mod srgb;
mod tone_curve;


pub use color_space::ColorSpaceTransformation;
pub use exposure::ExposureCorrection;
pub use hue_sat::{HsvMapping, HueSatTable, ProfileLookTableMapping};
pub use illuminant::{CalibrationIlluminant, ColorContext};
pub use srgb::XyzD50ToSrgb;
pub use tone_curve::{CubicSpline, ProfileToneCurveMapping};

use tracing::info_span;

use crate::image_pipeline::acceleration::executor::for_each_pixel;
use crate::image_pipeline::acceleration::strategy::{AccelerationStrategy, ChunkSchedule};
use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::common::RunTimer;
use crate::image_pipeline::types::RgbImageData;

const FULL_SCALE: f64 = u16::MAX as f64;

/// A per-pixel colour transform on values where 1.0 is full scale.
pub trait PostProcessorOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, rgb: [f64; 3]) -> [f64; 3];
}

/// Ordered chain of colour operations.
///
/// Samples are normalised once, passed through every operation in double
/// precision and clamped back to 16 bits at the end.
pub struct PostProcessor {
    operations: Vec<Box<dyn PostProcessorOperation>>,
    strategy: AccelerationStrategy,
    schedule: ChunkSchedule,
}

impl PostProcessor {
    pub fn new(strategy: AccelerationStrategy, chunk_edge: Option<usize>) -> Self {
        Self {
            operations: Vec::new(),
            strategy,
            schedule: ChunkSchedule::pointwise(strategy, chunk_edge),
        }
    }

    pub fn with_operation(mut self, operation: impl PostProcessorOperation + 'static) -> Self {
        self.add_operation(Box::new(operation));
        self
    }

    pub fn add_operation(&mut self, operation: Box<dyn PostProcessorOperation>) {
        self.operations.push(operation);
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|op| op.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Maps a single normalised triple through the chain.
    pub fn map(&self, rgb: [f64; 3]) -> [f64; 3] {
        self.operations.iter().fold(rgb, |value, op| op.process(value))
    }

    pub fn process(&self, image: &mut RgbImageData, timer: &mut RunTimer) {
        let _span = info_span!("postprocess", strategy = %self.strategy, ops = self.operations.len()).entered();
        let pixels = image.width * image.height;
        let detail = match self.schedule.chunk_len {
            Some(len) => format!("{} tiles of size {}", pixels.div_ceil(len), len),
            None => self.strategy.label().to_string(),
        };
        timer.time("Postprocessing", detail, || {
            for_each_pixel(self.schedule, &mut image.data, 3, |_, pixel| {
                let rgb = self.map([0, 1, 2].map(|c| pixel[c] as f64 / FULL_SCALE));
                for (out, value) in pixel.iter_mut().zip(rgb) {
                    *out = clamp_u16(value * FULL_SCALE);
                }
            });
        });
    }
}
