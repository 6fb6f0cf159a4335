use std::path::Path;

use tracing::{debug, info, info_span, instrument, warn};

use crate::image_pipeline::acceleration::strategy::AccelerationStrategy;
use crate::image_pipeline::acceleration::{EmulatedGpu, GpuContext, GpuKernel, GpuPipeline};
use crate::image_pipeline::common::{DngError, Result, RunTimer};
use crate::image_pipeline::crop::ImageCropper;
use crate::image_pipeline::demosaic::{Demosaicer, InterpolationMethod, SubStep};
use crate::image_pipeline::opcodes::{apply_opcodes, parse_opcode_list};
use crate::image_pipeline::postprocess::{
    ColorSpaceTransformation, ExposureCorrection, HsvMapping, PostProcessor, ProfileLookTableMapping,
    ProfileToneCurveMapping, XyzD50ToSrgb,
};
use crate::image_pipeline::preprocess::{PreProcessor, RawMapping, WhiteBalance};
use crate::image_pipeline::reader::{tag, CfaPattern, DngFile, ImageFileDirectory};
use crate::image_pipeline::types::{RawImageData, RgbImageData};

use super::config::{available_substeps, margin_for, GpuDevice, PipelineConfiguration, ProcessorOptions};

/// Demosaicing part of the stage list, derived from the configuration only.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DemosaicStage {
    Cpu(Demosaicer),
    Gpu { method: InterpolationMethod, sub_step: Option<SubStep> },
}

/// Colour stages for one container, decided from its profile tags.
struct ColorStages {
    color_space: ColorSpaceTransformation,
    exposure: Option<ExposureCorrection>,
    hsv: Option<HsvMapping>,
    look_table: Option<ProfileLookTableMapping>,
    tone_curve: Option<ProfileToneCurveMapping>,
}

impl ColorStages {
    fn from_directory(ifd0: &ImageFileDirectory) -> Result<Self> {
        let color_space = ColorSpaceTransformation::from_directory(ifd0)?;
        let context = color_space.context();
        let hsv = if ifd0.has(tag::PROFILE_HUE_SAT_MAP_DATA_1) || ifd0.has(tag::PROFILE_HUE_SAT_MAP_DATA_2) {
            HsvMapping::from_directory(ifd0, &context)?
        } else {
            None
        };
        Ok(Self {
            color_space,
            exposure: ExposureCorrection::from_directory(ifd0),
            hsv,
            look_table: ProfileLookTableMapping::from_directory(ifd0)?,
            tone_curve: ProfileToneCurveMapping::from_directory(ifd0)?,
        })
    }

    /// Stages without a device kernel.
    fn cpu_only(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.hsv.is_some() {
            names.push("HSVMapping");
        }
        if self.look_table.is_some() {
            names.push("ProfileLookTableMapping");
        }
        if self.tone_curve.is_some() {
            names.push("ProfileToneCurveMapping");
        }
        names
    }

    fn into_post_processor(self, strategy: AccelerationStrategy, chunk_edge: Option<usize>) -> PostProcessor {
        let mut post = PostProcessor::new(strategy, chunk_edge).with_operation(self.color_space);
        if let Some(hsv) = self.hsv {
            post = post.with_operation(hsv);
        }
        if let Some(exposure) = self.exposure {
            post = post.with_operation(exposure);
        }
        if let Some(look_table) = self.look_table {
            post = post.with_operation(look_table);
        }
        if let Some(tone_curve) = self.tone_curve {
            post = post.with_operation(tone_curve);
        }
        post.with_operation(XyzD50ToSrgb::new())
    }

    fn gpu_kernels(&self) -> Vec<GpuKernel> {
        let to_f32 = |m: &[f64; 9]| m.map(|v| v as f32);
        let mut kernels = vec![GpuKernel::ColorMatrix { matrix: to_f32(self.color_space.matrix()) }];
        if let Some(exposure) = &self.exposure {
            kernels.push(GpuKernel::Exposure { scale: exposure.scale() as f32 });
        }
        kernels.push(GpuKernel::XyzD50ToSrgb { matrix: to_f32(XyzD50ToSrgb::new().matrix()) });
        kernels
    }
}

/// Runs the whole DNG pipeline: decode, pre-process, demosaic, crop and
/// post-process, under the configured acceleration strategy.
///
/// The stage list is rebuilt whenever [`DngProcessor::configure`] changes
/// the configuration. Timings of the last run are kept in
/// [`DngProcessor::timer`].
pub struct DngProcessor {
    options: ProcessorOptions,
    configuration: PipelineConfiguration,
    demosaic: DemosaicStage,
    timer: RunTimer,
}

impl DngProcessor {
    pub fn new(options: ProcessorOptions, configuration: PipelineConfiguration) -> Result<Self> {
        let demosaic = Self::build(&options, &configuration)?;
        Ok(Self { options, configuration, demosaic, timer: RunTimer::new() })
    }

    /// Opens and parses a container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DngFile> {
        DngFile::open(path)
    }

    pub fn available_substeps(method: InterpolationMethod, strategy: AccelerationStrategy) -> &'static [SubStep] {
        available_substeps(method, strategy)
    }

    pub fn margin_for(method: InterpolationMethod) -> usize {
        margin_for(method)
    }

    pub fn configuration(&self) -> &PipelineConfiguration {
        &self.configuration
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn timer(&self) -> &RunTimer {
        &self.timer
    }

    /// Sets method, strategy and sub-step. An unavailable sub-step falls back
    /// to none. Nothing is rebuilt when the configuration does not change.
    pub fn configure(
        &mut self,
        method: InterpolationMethod,
        strategy: AccelerationStrategy,
        sub_step: Option<SubStep>,
    ) -> Result<()> {
        let configuration = PipelineConfiguration::new(method, strategy, sub_step);
        if configuration == self.configuration {
            return Ok(());
        }
        self.demosaic = Self::build(&self.options, &configuration)?;
        self.configuration = configuration;
        Ok(())
    }

    fn build(options: &ProcessorOptions, configuration: &PipelineConfiguration) -> Result<DemosaicStage> {
        let method = configuration.interpolation_method;
        let stage = if configuration.uses_gpu() {
            DemosaicStage::Gpu { method, sub_step: configuration.sub_step }
        } else {
            let demosaicer = Demosaicer::new(method, configuration.acceleration_strategy, options.effective_tile_size())?
                .with_sub_step(configuration.sub_step);
            DemosaicStage::Cpu(demosaicer)
        };
        debug!(?configuration, gpu = configuration.uses_gpu(), "Rebuilt stage list");
        Ok(stage)
    }

    /// Runs the pipeline once on `file`.
    #[instrument(skip_all, fields(method = %self.configuration.interpolation_method, strategy = %self.configuration.acceleration_strategy))]
    pub fn process(&mut self, file: &DngFile) -> Result<RgbImageData> {
        let configuration = self.configuration;
        self.timer.start_run(format!("{} / {}", configuration.interpolation_method, configuration.acceleration_strategy));
        match self.run_stages(file) {
            Ok(image) => {
                self.timer.end_run();
                info!(width = image.width, height = image.height, "Processing complete");
                Ok(image)
            }
            Err(err) => {
                self.timer.abort_run(&err);
                Err(err)
            }
        }
    }

    fn run_stages(&mut self, file: &DngFile) -> Result<RgbImageData> {
        let configuration = self.configuration;
        let strategy = configuration.acceleration_strategy;
        let chunk_edge = self.options.effective_tile_size();

        let ifd0 = file.zeroth()?.clone();
        debug!(
            make = ?ifd0.string(tag::MAKE),
            model = ?ifd0.string(tag::UNIQUE_CAMERA_MODEL).or_else(|| ifd0.string(tag::MODEL)),
            dng_version = ?ifd0.bytes(tag::DNG_VERSION),
            "Opened container"
        );
        let raw_ifd = file.raw_directory()?;
        let pattern = raw_ifd.cfa_pattern()?.ok_or(DngError::MissingTag(tag::CFA_PATTERN))?;
        let cropper = ImageCropper::from_directory(&raw_ifd)?;

        // decided before any samples are touched
        let colors = match configuration.sub_step {
            Some(step) => {
                debug!(step = %step, "Stopping at sub-step, post-processing disabled");
                None
            }
            None => Some(ColorStages::from_directory(&ifd0)?),
        };
        // the colour stages follow the strategy even when demosaicing falls back to the CPU
        if let Some(colors) = colors.as_ref().filter(|_| strategy.is_gpu()) {
            if let Some(stage) = colors.cpu_only().first() {
                return Err(DngError::configuration(*stage, format!("not supported with {strategy}")));
            }
        }

        let mut raw = {
            let _span = info_span!("decode").entered();
            let parallel = strategy != AccelerationStrategy::None;
            self.timer.time("Decoding", format!("compression {}", raw_ifd.compression()), || {
                file.raw_image(parallel)
            })?
        };
        self.apply_opcode_list(&raw_ifd, tag::OPCODE_LIST_1, &mut raw)?;

        let mut pre = PreProcessor::new(strategy, chunk_edge).with_operation(RawMapping::from_directory(&raw_ifd)?);
        if self.options.white_balance {
            pre = pre.with_operation(WhiteBalance::from_directories(&ifd0, &raw_ifd)?);
        }
        pre.process(&mut raw, &mut self.timer);
        self.apply_opcode_list(&raw_ifd, tag::OPCODE_LIST_2, &mut raw)?;
        if raw_ifd.has(tag::OPCODE_LIST_3) {
            debug!("OpcodeList3 is not applied");
        }

        let crop_after = matches!(self.demosaic, DemosaicStage::Gpu { .. })
            || (cropper.is_non_pot_crop() && strategy.is_gpu());

        let image = match self.demosaic {
            DemosaicStage::Gpu { method, sub_step } => {
                let mut pipeline = GpuPipeline::new(strategy, method.gpu_margin().unwrap_or(0))
                    .with_kernel(GpuKernel::demosaic(method, &pattern, sub_step)?);
                for kernel in colors.as_ref().map(ColorStages::gpu_kernels).unwrap_or_default() {
                    pipeline = pipeline.with_kernel(kernel);
                }
                self.run_gpu(&pipeline, GpuInput::Mosaic(&raw))?
            }
            DemosaicStage::Cpu(demosaicer) => {
                let mut image = demosaicer.process(&raw, &pattern, &mut self.timer)?;
                if !crop_after {
                    image = cropper.process(&image, "before postprocessing", &mut self.timer)?;
                }
                match colors {
                    Some(colors) if strategy.is_gpu() => {
                        let mut pipeline = GpuPipeline::new(strategy, 0);
                        for kernel in colors.gpu_kernels() {
                            pipeline = pipeline.with_kernel(kernel);
                        }
                        self.run_gpu(&pipeline, GpuInput::Rgb(&image))?
                    }
                    Some(colors) => {
                        let post = colors.into_post_processor(strategy, chunk_edge);
                        debug!(operations = ?post.operation_names(), "Post-processing");
                        post.process(&mut image, &mut self.timer);
                        image
                    }
                    None => image,
                }
            }
        };

        if crop_after {
            debug!(odd_width = cropper.is_non_pot_crop(), "Cropping after GPU readback");
            return cropper.process(&image, "after GPU", &mut self.timer);
        }
        Ok(image)
    }

    fn apply_opcode_list(&mut self, raw_ifd: &ImageFileDirectory, list: u16, raw: &mut RawImageData) -> Result<()> {
        if !self.options.apply_opcodes {
            return Ok(());
        }
        let Some(bytes) = raw_ifd.opcode_list_bytes(list) else {
            return Ok(());
        };
        let records = parse_opcode_list(bytes)?;
        let applied = self.timer.time("Opcodes", format!("tag {list}"), || apply_opcodes(&records, raw))?;
        if applied < records.len() {
            warn!(list, applied, total = records.len(), "Some opcodes were not applied");
        }
        Ok(())
    }

    /// Acquires the device for the duration of one run.
    fn run_gpu(&mut self, pipeline: &GpuPipeline, input: GpuInput<'_>) -> Result<RgbImageData> {
        debug!(kernels = ?pipeline.kernel_names(), "GPU pipeline");
        match self.options.device {
            GpuDevice::Emulated => {
                let mut device = EmulatedGpu::new(self.options.max_texture_size);
                run_on(pipeline, &mut device, input, &mut self.timer)
            }
            #[cfg(jetson_cuda)]
            GpuDevice::Cuda => {
                let mut device = crate::image_pipeline::acceleration::CudaGpu::new()?;
                run_on(pipeline, &mut device, input, &mut self.timer)
            }
        }
    }
}

/// What a GPU pipeline starts from.
enum GpuInput<'a> {
    Mosaic(&'a RawImageData),
    /// Demosaiced on the CPU, for methods without a device kernel.
    Rgb(&'a RgbImageData),
}

fn run_on<C: GpuContext>(pipeline: &GpuPipeline, device: &mut C, input: GpuInput<'_>, timer: &mut RunTimer) -> Result<RgbImageData> {
    debug!(device = device.name(), max = ?device.max_texture_dimensions(), "Acquired GPU");
    match input {
        GpuInput::Mosaic(raw) => pipeline.run(device, raw, timer),
        GpuInput::Rgb(image) => pipeline.run_rgb(device, image, timer),
    }
}

/// Demosaics an already linear single-channel image, without a container
/// and without colour processing.
pub fn demosaic_only(
    raw: &RawImageData,
    pattern: &CfaPattern,
    method: InterpolationMethod,
    strategy: AccelerationStrategy,
    timer: &mut RunTimer,
) -> Result<RgbImageData> {
    if strategy.is_gpu() && method.supports_gpu() {
        let pipeline = GpuPipeline::new(strategy, margin_for(method)).with_kernel(GpuKernel::demosaic(method, pattern, None)?);
        return pipeline.run(&mut EmulatedGpu::default(), raw, timer);
    }
    let tile_size = ProcessorOptions::default().effective_tile_size();
    Demosaicer::new(method, strategy, tile_size)?.process(raw, pattern, timer)
}
