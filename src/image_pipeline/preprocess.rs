//! Pre-processing of the single-channel sensor raster
//!
//! Every operation is a pure function of `(sample, x, y)`, so the stage can
//! run under any CPU schedule and still produce the same samples.

mod raw_mapping;
mod white_balance;

#[cfg(test)]
mod tests;

pub use raw_mapping::RawMapping;
pub use white_balance::WhiteBalance;

use tracing::info_span;

use crate::image_pipeline::acceleration::executor::for_each_pixel;
use crate::image_pipeline::acceleration::strategy::{AccelerationStrategy, ChunkSchedule};
use crate::image_pipeline::common::RunTimer;
use crate::image_pipeline::types::RawImageData;

/// A position-aware per-sample transform.
pub trait PreProcessorOperation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Maps one sample. The result is already clamped to `0..=65535`.
    fn process(&self, sample: u16, x: usize, y: usize) -> u16;
}

/// Ordered list of pre-processing operations plus the schedule to run them
/// with.
pub struct PreProcessor {
    operations: Vec<Box<dyn PreProcessorOperation>>,
    strategy: AccelerationStrategy,
    schedule: ChunkSchedule,
}

impl PreProcessor {
    /// `chunk_edge` overrides the edge of the square chunks used by the
    /// tiled strategies.
    pub fn new(strategy: AccelerationStrategy, chunk_edge: Option<usize>) -> Self {
        Self {
            operations: Vec::new(),
            strategy,
            schedule: ChunkSchedule::pointwise(strategy, chunk_edge),
        }
    }

    pub fn with_operation(mut self, operation: impl PreProcessorOperation + 'static) -> Self {
        self.add_operation(Box::new(operation));
        self
    }

    pub fn add_operation(&mut self, operation: Box<dyn PreProcessorOperation>) {
        self.operations.push(operation);
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|op| op.name()).collect()
    }

    pub fn schedule(&self) -> ChunkSchedule {
        self.schedule
    }

    /// Runs all operations over `image` in place.
    pub fn process(&self, image: &mut RawImageData, timer: &mut RunTimer) {
        let _span = info_span!("preprocess", strategy = %self.strategy, ops = self.operations.len()).entered();
        let width = image.width.max(1);
        let detail = match self.schedule.chunk_len {
            Some(len) => format!("{} chunks of {}", image.data.len().div_ceil(len), len),
            None => self.strategy.label().to_string(),
        };
        let operations = &self.operations;
        timer.time("Preprocessing", detail, || {
            for_each_pixel(self.schedule, &mut image.data, 1, |index, sample| {
                let (x, y) = (index % width, index / width);
                let mut value = sample[0];
                for operation in operations {
                    value = operation.process(value, x, y);
                }
                sample[0] = value;
            });
        });
    }
}
