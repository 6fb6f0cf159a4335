use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dng_pipeline_rs::image_pipeline::tiff::read_grey16;
use dng_pipeline_rs::image_pipeline::{
    demosaic_only, AccelerationStrategy, CfaPattern, DngProcessor, GpuDevice, InterpolationMethod, OutputConfig,
    PipelineConfiguration, ProcessorOptions, RgbImageData, RunTimer, StandardTiffWriter, SubStep, TiffCompression,
    TiffWriter,
};
use dng_pipeline_rs::logger;

use tracing::info;

/// Develops a DNG raw file into a 16-bit RGB TIFF.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input DNG, or a 16-bit greyscale TIFF holding a linear mosaic
    input: PathBuf,

    /// Output TIFF
    output: PathBuf,

    /// Interpolation method
    #[arg(short, long, default_value = "rcd")]
    method: InterpolationMethod,

    /// Acceleration strategy
    #[arg(short, long, default_value = "none")]
    strategy: AccelerationStrategy,

    /// Stop demosaicing after this sub-step and skip colour processing
    #[arg(long)]
    substep: Option<SubStep>,

    /// Output compression: none, lzw, deflate-fast, deflate, deflate-best
    #[arg(short, long, default_value = "none", value_parser = parse_compression)]
    compression: TiffCompression,

    /// Tile edge including overlap, overrides TILE_SIZE
    #[arg(long)]
    tile_size: Option<usize>,

    /// Skip AnalogBalance and AsShotNeutral gains
    #[arg(long)]
    no_white_balance: bool,

    /// CFA layout of a greyscale TIFF input
    #[arg(long, default_value = "rggb")]
    pattern: String,

    /// Run the GPU strategies on the CUDA device
    #[cfg(jetson_cuda)]
    #[arg(long)]
    cuda: bool,

    /// Print the per-stage timing table
    #[arg(long)]
    summary: bool,
}

fn parse_compression(name: &str) -> std::result::Result<TiffCompression, String> {
    TiffCompression::from_name(name).ok_or_else(|| format!("unknown compression '{name}'"))
}

fn is_plain_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

fn device(args: &Args) -> GpuDevice {
    #[cfg(jetson_cuda)]
    if args.cuda {
        return GpuDevice::Cuda;
    }
    let _ = args;
    GpuDevice::Emulated
}

fn develop(args: &Args) -> Result<(RgbImageData, RunTimer)> {
    if is_plain_tiff(&args.input) {
        let pattern = CfaPattern::from_name(&args.pattern).ok_or_else(|| anyhow!("unknown CFA pattern '{}'", args.pattern))?;
        let raw = read_grey16(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
        let mut timer = RunTimer::new();
        timer.start_run(format!("{} / {}", args.method, args.strategy));
        let image = demosaic_only(&raw, &pattern, args.method, args.strategy, &mut timer)?;
        timer.end_run();
        return Ok((image, timer));
    }

    let options = ProcessorOptions::builder()
        .white_balance(!args.no_white_balance)
        .tile_size(args.tile_size)
        .device(device(args))
        .build();
    let configuration = PipelineConfiguration::new(args.method, args.strategy, args.substep);
    let mut processor = DngProcessor::new(options, configuration)?;

    let file = DngProcessor::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let image = processor.process(&file).context("processing failed")?;
    Ok((image, processor.timer().clone()))
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    info!("Starting dng_pipeline...");
    info!("Interpolation: {}", args.method);
    info!("Acceleration: {}", args.strategy);
    info!("Compression: {:?}", args.compression);

    let (image, timer) = develop(&args)?;

    let config = OutputConfig::builder().compression(args.compression).build();
    let mut output = BufWriter::new(
        File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?,
    );
    StandardTiffWriter.write_rgb_tiff(&image, &mut output, &config)?;

    info!("Wrote {}x{} image to {}", image.width, image.height, args.output.display());
    if args.summary {
        timer.print_summary();
    }
    Ok(())
}
