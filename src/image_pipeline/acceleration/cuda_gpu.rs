use std::sync::Arc;

use cudarc::driver::safe::*;
use cudarc::nvrtc::Ptx;
use tracing::{debug, trace};

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::demosaic::SubStep;
use crate::image_pipeline::reader::CfaPattern;
use super::gpu::{GpuContext, GpuKernel};

const BLOCK_2D: u32 = 32;
const BLOCK_1D: u32 = 256;

/// Largest texture edge accepted by the CUDA device.
const MAX_TEXTURE_SIZE: usize = 16384;

fn device_error(err: impl std::fmt::Display) -> DngError {
    DngError::Device(err.to_string())
}

/// Buffer on the CUDA device, freed when dropped.
pub struct CudaTexture {
    buffer: CudaSlice<f32>,
    width: usize,
    height: usize,
    channels: usize,
}

struct DemosaicFunctions {
    bilinear_mean: CudaFunction,
    xy_gradient: CudaFunction,
    low_pass: CudaFunction,
    greens: CudaFunction,
    pq_gradient: CudaFunction,
    rb_at_br: CudaFunction,
    rb_at_g: CudaFunction,
    plane_to_rgb: CudaFunction,
}

struct ColorFunctions {
    color_matrix: CudaFunction,
    exposure: CudaFunction,
    xyz_d50_to_srgb: CudaFunction,
}

/// CUDA device running the kernels compiled by `build.rs`.
pub struct CudaGpu {
    stream: Arc<CudaStream>,
    demosaic: DemosaicFunctions,
    color: ColorFunctions,
}

/// Bayer phase as passed to the kernels: tile indices of red, blue and the
/// red-row green.
fn phase(pattern: &CfaPattern) -> Result<(i32, i32, i32)> {
    let layout = pattern.bayer_layout()?;
    Ok((layout.red as i32, layout.blue as i32, layout.green_red_row as i32))
}

fn grid_2d(width: usize, height: usize) -> LaunchConfig {
    LaunchConfig {
        grid_dim: ((width as u32).div_ceil(BLOCK_2D), (height as u32).div_ceil(BLOCK_2D), 1),
        block_dim: (BLOCK_2D, BLOCK_2D, 1),
        shared_mem_bytes: 0,
    }
}

fn grid_1d(count: usize) -> LaunchConfig {
    LaunchConfig {
        grid_dim: ((count as u32).div_ceil(BLOCK_1D), 1, 1),
        block_dim: (BLOCK_1D, 1, 1),
        shared_mem_bytes: 0,
    }
}

impl CudaGpu {
    /// Initialize the CUDA context on device 0 and load both kernel modules.
    pub fn new() -> Result<Self> {
        let ctx = CudaContext::new(0).map_err(device_error)?;
        let stream = ctx.default_stream();

        let demosaic_ptx = include_str!(concat!(env!("OUT_DIR"), "/demosaic.ptx"));
        let module = ctx.load_module(Ptx::from_src(demosaic_ptx)).map_err(device_error)?;
        let load = |name: &str| module.load_function(name).map_err(device_error);
        let demosaic = DemosaicFunctions {
            bilinear_mean: load("bilinear_mean")?,
            xy_gradient: load("rcd_xy_gradient")?,
            low_pass: load("rcd_low_pass")?,
            greens: load("rcd_greens")?,
            pq_gradient: load("rcd_pq_gradient")?,
            rb_at_br: load("rcd_rb_at_br")?,
            rb_at_g: load("rcd_rb_at_g")?,
            plane_to_rgb: load("plane_to_rgb")?,
        };

        let color_ptx = include_str!(concat!(env!("OUT_DIR"), "/color.ptx"));
        let module = ctx.load_module(Ptx::from_src(color_ptx)).map_err(device_error)?;
        let load = |name: &str| module.load_function(name).map_err(device_error);
        let color = ColorFunctions {
            color_matrix: load("color_matrix")?,
            exposure: load("exposure")?,
            xyz_d50_to_srgb: load("xyz_d50_to_srgb")?,
        };

        debug!("CUDA device initialized");
        Ok(Self { stream, demosaic, color })
    }

    fn alloc(&self, len: usize) -> Result<CudaSlice<f32>> {
        self.stream.alloc_zeros::<f32>(len).map_err(device_error)
    }

    fn texture(&self, width: usize, height: usize, channels: usize) -> Result<CudaTexture> {
        Ok(CudaTexture { buffer: self.alloc(width * height * channels)?, width, height, channels })
    }

    fn bilinear_mean(&self, input: &CudaTexture, pattern: &CfaPattern) -> Result<CudaTexture> {
        let (red, blue, green_red) = phase(pattern)?;
        let (w, h) = (input.width as i32, input.height as i32);
        let mut out = self.texture(input.width, input.height, 3)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.bilinear_mean);
        launch.arg(&input.buffer);
        launch.arg(&mut out.buffer);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        launch.arg(&green_red);
        unsafe { launch.launch(grid_2d(input.width, input.height)) }.map_err(device_error)?;
        Ok(out)
    }

    /// Replicates a single plane into an RGB texture.
    fn view(
        &self,
        plane: &CudaSlice<f32>,
        width: usize,
        height: usize,
        red_blue_only: bool,
        phase: (i32, i32, i32),
    ) -> Result<CudaTexture> {
        let (w, h) = (width as i32, height as i32);
        let (scale, red_blue_only) = (1.0f32, red_blue_only as i32);
        let mut out = self.texture(width, height, 3)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.plane_to_rgb);
        launch.arg(plane);
        launch.arg(&mut out.buffer);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&scale);
        launch.arg(&red_blue_only);
        launch.arg(&phase.0);
        launch.arg(&phase.1);
        unsafe { launch.launch(grid_2d(width, height)) }.map_err(device_error)?;
        Ok(out)
    }

    fn rcd(&self, input: &CudaTexture, pattern: &CfaPattern, stop: SubStep) -> Result<CudaTexture> {
        let bayer = phase(pattern)?;
        let (red, blue, _) = bayer;
        let (width, height) = (input.width, input.height);
        let (w, h) = (width as i32, height as i32);
        let cfg = grid_2d(width, height);
        if stop == SubStep::RawData {
            return self.view(&input.buffer, width, height, false, bayer);
        }

        let mut xy = self.alloc(width * height)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.xy_gradient);
        launch.arg(&input.buffer);
        launch.arg(&mut xy);
        launch.arg(&w);
        launch.arg(&h);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        if stop == SubStep::XyGradient {
            return self.view(&xy, width, height, false, bayer);
        }

        let mut lpf = self.alloc(width * height)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.low_pass);
        launch.arg(&input.buffer);
        launch.arg(&mut lpf);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        if stop == SubStep::LowPass {
            return self.view(&lpf, width, height, true, bayer);
        }

        let mut greens = self.alloc(width * height)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.greens);
        launch.arg(&input.buffer);
        launch.arg(&xy);
        launch.arg(&lpf);
        launch.arg(&mut greens);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        if stop == SubStep::Greens {
            return self.view(&greens, width, height, false, bayer);
        }

        let mut pq = self.alloc(width * height)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.pq_gradient);
        launch.arg(&input.buffer);
        launch.arg(&mut pq);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        if stop == SubStep::PqGradient {
            return self.view(&pq, width, height, true, bayer);
        }

        let mut rgb = self.texture(width, height, 3)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.rb_at_br);
        launch.arg(&input.buffer);
        launch.arg(&greens);
        launch.arg(&pq);
        launch.arg(&mut rgb.buffer);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        if stop == SubStep::RbAtBr {
            return Ok(rgb);
        }

        let mut out = self.texture(width, height, 3)?;
        let mut launch = self.stream.launch_builder(&self.demosaic.rb_at_g);
        launch.arg(&xy);
        launch.arg(&rgb.buffer);
        launch.arg(&mut out.buffer);
        launch.arg(&w);
        launch.arg(&h);
        launch.arg(&red);
        launch.arg(&blue);
        unsafe { launch.launch(cfg) }.map_err(device_error)?;
        Ok(out)
    }

    fn pointwise(&self, function: &CudaFunction, input: &CudaTexture, matrix: Option<&[f32; 9]>, scale: f32) -> Result<CudaTexture> {
        let n = (input.width * input.height) as i32;
        let mut out = self.texture(input.width, input.height, 3)?;
        let matrix = match matrix {
            Some(m) => Some(self.stream.clone_htod(m.as_slice()).map_err(device_error)?),
            None => None,
        };
        let mut launch = self.stream.launch_builder(function);
        launch.arg(&input.buffer);
        launch.arg(&mut out.buffer);
        match &matrix {
            Some(m) => launch.arg(m),
            None => launch.arg(&scale),
        };
        launch.arg(&n);
        unsafe { launch.launch(grid_1d(input.width * input.height)) }.map_err(device_error)?;
        Ok(out)
    }
}

impl GpuContext for CudaGpu {
    type Texture = CudaTexture;

    fn name(&self) -> &'static str {
        "cuda"
    }

    fn max_texture_dimensions(&self) -> (usize, usize) {
        (MAX_TEXTURE_SIZE, MAX_TEXTURE_SIZE)
    }

    fn upload(&mut self, width: usize, height: usize, channels: usize, data: &[f32]) -> Result<CudaTexture> {
        if data.len() != width * height * channels {
            return Err(DngError::Device(format!(
                "{} values uploaded for a {width}x{height}x{channels} texture",
                data.len()
            )));
        }
        trace!(width, height, channels, "Upload");
        let buffer = self.stream.clone_htod(data).map_err(device_error)?;
        Ok(CudaTexture { buffer, width, height, channels })
    }

    fn apply(&mut self, kernel: &GpuKernel, input: &CudaTexture) -> Result<CudaTexture> {
        let expected = if kernel.is_demosaic() { 1 } else { 3 };
        if input.channels != expected {
            return Err(DngError::Device(format!(
                "{} expects {expected} channel texture, got {}",
                kernel.name(),
                input.channels
            )));
        }
        match kernel {
            GpuKernel::BilinearMean { pattern } => self.bilinear_mean(input, pattern),
            GpuKernel::Rcd { pattern, stop } => self.rcd(input, pattern, *stop),
            GpuKernel::ColorMatrix { matrix } => self.pointwise(&self.color.color_matrix, input, Some(matrix), 1.0),
            GpuKernel::Exposure { scale } => self.pointwise(&self.color.exposure, input, None, *scale),
            GpuKernel::XyzD50ToSrgb { matrix } => self.pointwise(&self.color.xyz_d50_to_srgb, input, Some(matrix), 1.0),
        }
    }

    fn download(&mut self, texture: &CudaTexture) -> Result<Vec<f32>> {
        trace!(width = texture.width, height = texture.height, "Download");
        self.stream.clone_dtoh(&texture.buffer).map_err(device_error)
    }
}
