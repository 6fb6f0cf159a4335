//! Image processing pipeline module
//!
//! This module provides a structured approach to DNG development, with
//! separate modules for container reading, decompression, the raw and colour
//! stages, the acceleration strategies and the TIFF output.

pub mod common;
pub mod reader;
pub mod compression;
pub mod opcodes;
pub mod preprocess;
pub mod demosaic;
pub mod crop;
pub mod postprocess;
pub mod acceleration;
pub mod conversions;
pub mod tiff;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use common::{
    DngError,
    Result,
    RunTimer,
};

pub use reader::{
    CfaPattern,
    DngFile,
    ImageFileDirectory,
};

pub use types::{
    RawImageData,
    RgbImageData,
};

pub use demosaic::{
    InterpolationMethod,
    SubStep,
};

pub use acceleration::AccelerationStrategy;

pub use conversions::{
    demosaic_only,
    DngProcessor,
    GpuDevice,
    PipelineConfiguration,
    ProcessorOptions,
};

pub use tiff::{
    OutputConfig,
    StandardTiffWriter,
    TiffCompression,
    TiffWriter,
};
