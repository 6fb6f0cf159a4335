use tracing::trace;

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::demosaic::{interpolate, InterpolationMethod, Mosaic, SubStep};
use crate::image_pipeline::postprocess::color::srgb_encode;
use crate::image_pipeline::reader::CfaPattern;
use super::gpu::{GpuContext, GpuKernel};
use super::strategy::Dispatch;

/// Texture of the software device.
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedTexture {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

/// Software stand-in for a GPU.
///
/// Kernels run in single precision on normalised samples, like a float
/// texture pipeline would, and demosaic output is clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatedGpu {
    max_dimensions: (usize, usize),
}

impl EmulatedGpu {
    pub const DEFAULT_MAX_TEXTURE_SIZE: usize = 4096;

    pub fn new(max_texture_size: usize) -> Self {
        Self { max_dimensions: (max_texture_size, max_texture_size) }
    }
}

impl Default for EmulatedGpu {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_TEXTURE_SIZE)
    }
}

fn expect_channels(kernel: &GpuKernel, texture: &EmulatedTexture, channels: usize) -> Result<()> {
    if texture.channels != channels {
        return Err(DngError::Device(format!(
            "{} expects {channels} channel texture, got {}",
            kernel.name(),
            texture.channels
        )));
    }
    Ok(())
}

fn map_pixels(input: &EmulatedTexture, op: impl Fn([f32; 3]) -> [f32; 3]) -> EmulatedTexture {
    let data = input
        .data
        .chunks_exact(3)
        .flat_map(|px| op([px[0], px[1], px[2]]))
        .collect();
    EmulatedTexture { data, ..*input }
}

fn demosaic(
    kernel: &GpuKernel,
    input: &EmulatedTexture,
    method: InterpolationMethod,
    pattern: &CfaPattern,
    stop: Option<SubStep>,
) -> Result<EmulatedTexture> {
    expect_channels(kernel, input, 1)?;
    let mosaic = Mosaic::new(&input.data, input.width, input.height, pattern.bayer_layout()?, 1.0);
    let data = interpolate(method, &mosaic, Dispatch::Parallel, stop)
        .into_iter()
        .map(|v| v.clamp(0.0, 1.0))
        .collect();
    Ok(EmulatedTexture { width: input.width, height: input.height, channels: 3, data })
}

fn mul(matrix: &[f32; 9], [r, g, b]: [f32; 3]) -> [f32; 3] {
    std::array::from_fn(|row| matrix[row * 3] * r + matrix[row * 3 + 1] * g + matrix[row * 3 + 2] * b)
}

impl GpuContext for EmulatedGpu {
    type Texture = EmulatedTexture;

    fn name(&self) -> &'static str {
        "emulated"
    }

    fn max_texture_dimensions(&self) -> (usize, usize) {
        self.max_dimensions
    }

    fn upload(&mut self, width: usize, height: usize, channels: usize, data: &[f32]) -> Result<EmulatedTexture> {
        let (max_width, max_height) = self.max_dimensions;
        if width > max_width || height > max_height {
            return Err(DngError::Device(format!(
                "{width}x{height} texture exceeds {max_width}x{max_height}"
            )));
        }
        if data.len() != width * height * channels {
            return Err(DngError::Device(format!(
                "{} values uploaded for a {width}x{height}x{channels} texture",
                data.len()
            )));
        }
        trace!(width, height, channels, "Upload");
        Ok(EmulatedTexture { width, height, channels, data: data.to_vec() })
    }

    fn apply(&mut self, kernel: &GpuKernel, input: &EmulatedTexture) -> Result<EmulatedTexture> {
        match kernel {
            GpuKernel::BilinearMean { pattern } => demosaic(kernel, input, InterpolationMethod::BilinearMean, pattern, None),
            GpuKernel::Rcd { pattern, stop } => demosaic(kernel, input, InterpolationMethod::Rcd, pattern, Some(*stop)),
            GpuKernel::ColorMatrix { matrix } => {
                expect_channels(kernel, input, 3)?;
                Ok(map_pixels(input, |rgb| mul(matrix, rgb)))
            }
            GpuKernel::Exposure { scale } => {
                expect_channels(kernel, input, 3)?;
                Ok(map_pixels(input, |rgb| rgb.map(|v| v * scale)))
            }
            GpuKernel::XyzD50ToSrgb { matrix } => {
                expect_channels(kernel, input, 3)?;
                Ok(map_pixels(input, |xyz| {
                    mul(matrix, xyz).map(|v| srgb_encode(v.clamp(0.0, 1.0) as f64) as f32)
                }))
            }
        }
    }

    fn download(&mut self, texture: &EmulatedTexture) -> Result<Vec<f32>> {
        trace!(width = texture.width, height = texture.height, "Download");
        Ok(texture.data.clone())
    }
}
