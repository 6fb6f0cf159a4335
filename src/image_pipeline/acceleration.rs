//! Acceleration strategies
//!
//! CPU strategies split the sample index space into chunks (point-wise
//! stages) or overlapping tiles (demosaicing) and run them on the rayon
//! pool. GPU strategies hand a kernel list to a [`GpuContext`]: either the
//! software [`EmulatedGpu`] or, on Jetson builds, a CUDA device.

pub mod executor;
pub mod strategy;
pub mod gpu;
pub mod emulated_gpu;
pub mod tile_executor;

#[cfg(jetson_cuda)]
pub mod cuda_gpu;


pub use emulated_gpu::{EmulatedGpu, EmulatedTexture};
pub use gpu::{GpuContext, GpuKernel, GpuPipeline};
pub use strategy::{AccelerationStrategy, ChunkSchedule, DemosaicPlan, Dispatch};
pub use tile_executor::TileExecutor;

#[cfg(jetson_cuda)]
pub use cuda_gpu::CudaGpu;
