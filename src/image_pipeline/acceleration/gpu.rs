//! Device abstraction for the GPU strategies
//!
//! A [`GpuPipeline`] is a list of [`GpuKernel`]s run against any
//! [`GpuContext`]. Textures hold normalised `f32` samples (1.0 is full
//! scale). A pipeline either starts from the single-channel mosaic, in which
//! case its first kernel demosaics, or from an RGB image demosaiced on the
//! CPU, in which case it holds colour kernels only.

use tracing::{debug, info_span};

use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::common::{DngError, Result, RunTimer};
use crate::image_pipeline::demosaic::{InterpolationMethod, SubStep};
use crate::image_pipeline::reader::CfaPattern;
use crate::image_pipeline::types::{RawImageData, RgbImageData};
use super::strategy::AccelerationStrategy;
use super::tile_executor::TileExecutor;

const FULL_SCALE: f32 = u16::MAX as f32;

/// Operations a device knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuKernel {
    BilinearMean { pattern: CfaPattern },
    Rcd { pattern: CfaPattern, stop: SubStep },
    /// Row-major 3x3 matrix applied to every pixel
    ColorMatrix { matrix: [f32; 9] },
    Exposure { scale: f32 },
    /// Matrix followed by the sRGB transfer curve
    XyzD50ToSrgb { matrix: [f32; 9] },
}

impl GpuKernel {
    /// Demosaicing kernel for `method`, if the device has one.
    pub fn demosaic(method: InterpolationMethod, pattern: &CfaPattern, stop: Option<SubStep>) -> Result<Self> {
        match method {
            InterpolationMethod::BilinearMean => Ok(Self::BilinearMean { pattern: pattern.clone() }),
            InterpolationMethod::Rcd => Ok(Self::Rcd {
                pattern: pattern.clone(),
                stop: stop.unwrap_or(SubStep::Done),
            }),
            other => Err(DngError::configuration(
                "demosaicing",
                format!("{other} has no GPU implementation"),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BilinearMean { .. } => "BilinearMean",
            Self::Rcd { .. } => "RCD",
            Self::ColorMatrix { .. } => "ColorMatrix",
            Self::Exposure { .. } => "Exposure",
            Self::XyzD50ToSrgb { .. } => "XYZD50ToSRGB",
        }
    }

    pub fn is_demosaic(&self) -> bool {
        matches!(self, Self::BilinearMean { .. } | Self::Rcd { .. })
    }

    /// The kernel as seen by a region whose origin is `(dx, dy)` in the
    /// full image. Only the CFA phase depends on the position.
    pub fn shifted(&self, dx: usize, dy: usize) -> Self {
        match self {
            Self::BilinearMean { pattern } => Self::BilinearMean { pattern: pattern.shifted(dx, dy) },
            Self::Rcd { pattern, stop } => Self::Rcd { pattern: pattern.shifted(dx, dy), stop: *stop },
            other => other.clone(),
        }
    }
}

/// A device able to hold textures and run [`GpuKernel`]s on them.
///
/// A context is not reentrant: callers run one kernel at a time. Dropping a
/// texture releases its device memory and dropping the context releases the
/// device.
pub trait GpuContext {
    type Texture;

    fn name(&self) -> &'static str;

    /// Largest texture `(width, height)` the device accepts.
    fn max_texture_dimensions(&self) -> (usize, usize);

    fn upload(&mut self, width: usize, height: usize, channels: usize, data: &[f32]) -> Result<Self::Texture>;

    fn apply(&mut self, kernel: &GpuKernel, input: &Self::Texture) -> Result<Self::Texture>;

    fn download(&mut self, texture: &Self::Texture) -> Result<Vec<f32>>;
}

/// Uploads `samples`, runs every kernel and downloads the result.
///
/// `origin` is the position of the region in the full image.
pub(crate) fn run_region<C: GpuContext>(
    context: &mut C,
    kernels: &[GpuKernel],
    samples: &[f32],
    (width, height, channels): (usize, usize, usize),
    origin: (usize, usize),
) -> Result<Vec<f32>> {
    let mut texture = context.upload(width, height, channels, samples)?;
    for kernel in kernels {
        texture = context.apply(&kernel.shifted(origin.0, origin.1), &texture)?;
    }
    context.download(&texture)
}

/// Ordered device kernels for one of the GPU strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuPipeline {
    kernels: Vec<GpuKernel>,
    strategy: AccelerationStrategy,
    margin: usize,
}

impl GpuPipeline {
    /// `margin` is the tile overlap used by [`AccelerationStrategy::GpuTileWise`].
    pub fn new(strategy: AccelerationStrategy, margin: usize) -> Self {
        Self { kernels: Vec::new(), strategy, margin }
    }

    pub fn with_kernel(mut self, kernel: GpuKernel) -> Self {
        self.kernels.push(kernel);
        self
    }

    pub fn kernels(&self) -> &[GpuKernel] {
        &self.kernels
    }

    pub fn kernel_names(&self) -> Vec<&'static str> {
        self.kernels.iter().map(GpuKernel::name).collect()
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Runs the kernels over a pre-processed mosaic.
    pub fn run<C: GpuContext>(&self, context: &mut C, raw: &RawImageData, timer: &mut RunTimer) -> Result<RgbImageData> {
        if !self.kernels.first().is_some_and(GpuKernel::is_demosaic) {
            return Err(DngError::configuration("gpu", "the first kernel must demosaic"));
        }
        let samples: Vec<f32> = raw.data.iter().map(|&v| v as f32 / FULL_SCALE).collect();
        self.execute(context, &samples, (raw.width, raw.height, 1), timer)
    }

    /// Runs colour kernels over an image demosaiced on the CPU.
    pub fn run_rgb<C: GpuContext>(&self, context: &mut C, image: &RgbImageData, timer: &mut RunTimer) -> Result<RgbImageData> {
        if let Some(kernel) = self.kernels.iter().find(|k| k.is_demosaic()) {
            return Err(DngError::configuration("gpu", format!("{} needs a mosaic input", kernel.name())));
        }
        let samples: Vec<f32> = image.data.iter().map(|&v| v as f32 / FULL_SCALE).collect();
        self.execute(context, &samples, (image.width, image.height, 3), timer)
    }

    fn execute<C: GpuContext>(
        &self,
        context: &mut C,
        samples: &[f32],
        (width, height, channels): (usize, usize, usize),
        timer: &mut RunTimer,
    ) -> Result<RgbImageData> {
        let _span = info_span!(
            "gpu",
            device = context.name(),
            strategy = %self.strategy,
            width,
            height,
            channels
        )
        .entered();
        let rgb = match self.strategy {
            AccelerationStrategy::GpuTileWise => {
                let executor = TileExecutor::new(self.margin);
                executor.run(context, &self.kernels, samples, (width, height, channels), timer)?
            }
            _ => self.run_whole(context, samples, (width, height, channels), timer)?,
        };
        Ok(RgbImageData::from_data(
            width,
            height,
            rgb.iter().map(|&v| clamp_u16(v as f64 * FULL_SCALE as f64)).collect(),
        ))
    }

    fn run_whole<C: GpuContext>(
        &self,
        context: &mut C,
        samples: &[f32],
        (width, height, channels): (usize, usize, usize),
        timer: &mut RunTimer,
    ) -> Result<Vec<f32>> {
        let (max_width, max_height) = context.max_texture_dimensions();
        if width > max_width || height > max_height {
            return Err(DngError::Device(format!(
                "{width}x{height} image exceeds the maximum texture size {max_width}x{max_height}"
            )));
        }

        let mut texture = timer.time("GPU upload", context.name(), || context.upload(width, height, channels, samples))?;
        for kernel in &self.kernels {
            debug!(kernel = kernel.name(), "Running kernel");
            texture = timer.time(kernel.name(), self.strategy.label(), || context.apply(kernel, &texture))?;
        }
        timer.time("GPU download", context.name(), || context.download(&texture))
    }
}
