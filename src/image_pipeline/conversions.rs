//! Pipeline conversions module
//!
//! Orchestration of the full DNG pipeline, from the opened container to
//! the final RGB raster.

mod config;
mod processor;

#[cfg(test)]
mod tests;

pub use config::{
    available_substeps, margin_for, GpuDevice, PipelineConfiguration, ProcessorOptions, ProcessorOptionsBuilder,
};
pub use processor::{demosaic_only, DngProcessor};
