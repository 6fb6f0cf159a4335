//! Processor configuration types

use tracing::debug;

use crate::image_pipeline::acceleration::strategy::{tile_size_from_env, AccelerationStrategy};
use crate::image_pipeline::acceleration::EmulatedGpu;
use crate::image_pipeline::demosaic::{InterpolationMethod, SubStep};

/// Sub-steps that can be inspected for a (method, strategy) pair.
///
/// The list does not depend on the strategy: the device kernels stop at the
/// same stages as the CPU implementation.
pub fn available_substeps(method: InterpolationMethod, _strategy: AccelerationStrategy) -> &'static [SubStep] {
    method.sub_steps()
}

/// Overlap in pixels that a tile needs for `method` to be exact.
pub fn margin_for(method: InterpolationMethod) -> usize {
    method.margin()
}

/// What the pipeline runs. Any change rebuilds the stage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineConfiguration {
    pub interpolation_method: InterpolationMethod,
    pub acceleration_strategy: AccelerationStrategy,
    pub sub_step: Option<SubStep>,
}

impl PipelineConfiguration {
    /// A sub-step the method does not have is dropped.
    pub fn new(method: InterpolationMethod, strategy: AccelerationStrategy, sub_step: Option<SubStep>) -> Self {
        let sub_step = sub_step.filter(|step| {
            let available = available_substeps(method, strategy).contains(step);
            if !available {
                debug!(%method, step = %step, "Sub-step not available, running the full method");
            }
            available
        });
        Self { interpolation_method: method, acceleration_strategy: strategy, sub_step }
    }

    /// Whether demosaicing runs on the device. The colour stages run there
    /// whenever the strategy is a GPU one.
    pub fn uses_gpu(&self) -> bool {
        self.acceleration_strategy.is_gpu() && self.interpolation_method.supports_gpu()
    }
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self::new(InterpolationMethod::Rcd, AccelerationStrategy::None, None)
    }
}

/// Device used by the GPU strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuDevice {
    #[default]
    Emulated,
    #[cfg(jetson_cuda)]
    Cuda,
}

/// Options of a [`DngProcessor`](super::DngProcessor) that are not part of
/// the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorOptions {
    /// Apply AnalogBalance and AsShotNeutral gains before demosaicing
    pub white_balance: bool,
    /// Apply the point-wise opcodes of OpcodeList1 and OpcodeList2
    pub apply_opcodes: bool,
    /// Largest texture edge of the emulated device
    pub max_texture_size: usize,
    /// Tile edge (including overlap) for demosaicing, chunk edge for the
    /// point-wise stages
    pub tile_size: Option<usize>,
    pub device: GpuDevice,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            white_balance: true,
            apply_opcodes: true,
            max_texture_size: EmulatedGpu::DEFAULT_MAX_TEXTURE_SIZE,
            tile_size: None,
            device: GpuDevice::default(),
        }
    }
}

impl ProcessorOptions {
    pub fn builder() -> ProcessorOptionsBuilder {
        ProcessorOptionsBuilder::default()
    }

    /// Tile size override, falling back to the `TILE_SIZE` environment
    /// variable.
    pub fn effective_tile_size(&self) -> Option<usize> {
        self.tile_size.or_else(tile_size_from_env)
    }
}

/// Builder for ProcessorOptions
#[derive(Default)]
pub struct ProcessorOptionsBuilder {
    white_balance: Option<bool>,
    apply_opcodes: Option<bool>,
    max_texture_size: Option<usize>,
    tile_size: Option<Option<usize>>,
    device: Option<GpuDevice>,
}

impl ProcessorOptionsBuilder {
    pub fn white_balance(mut self, enable: bool) -> Self {
        self.white_balance = Some(enable);
        self
    }

    pub fn apply_opcodes(mut self, enable: bool) -> Self {
        self.apply_opcodes = Some(enable);
        self
    }

    pub fn max_texture_size(mut self, size: usize) -> Self {
        self.max_texture_size = Some(size);
        self
    }

    pub fn tile_size(mut self, size: Option<usize>) -> Self {
        self.tile_size = Some(size);
        self
    }

    pub fn device(mut self, device: GpuDevice) -> Self {
        self.device = Some(device);
        self
    }

    pub fn build(self) -> ProcessorOptions {
        let default = ProcessorOptions::default();
        ProcessorOptions {
            white_balance: self.white_balance.unwrap_or(default.white_balance),
            apply_opcodes: self.apply_opcodes.unwrap_or(default.apply_opcodes),
            max_texture_size: self.max_texture_size.unwrap_or(default.max_texture_size),
            tile_size: self.tile_size.unwrap_or(default.tile_size),
            device: self.device.unwrap_or(default.device),
        }
    }
}
