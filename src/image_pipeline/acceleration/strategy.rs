use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::demosaic::InterpolationMethod;

/// Environment variable overriding the tile edge of the tiled strategies.
pub const TILE_SIZE_ENV: &str = "TILE_SIZE";

const POINTWISE_CHUNK_EDGE: usize = 256;
const POINTWISE_CHUNK_EDGE_SMALL: usize = 1024;

/// How a stage spreads its work over the CPU (or hands it to a device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccelerationStrategy {
    #[default]
    None,
    AutoSmall,
    AutoBig,
    Multithreading,
    CpuTiling,
    CpuTilingMt,
    CpuMtTiling,
    CpuMtTilingMt,
    GpuOperationWise,
    GpuTileWise,
}

impl AccelerationStrategy {
    pub const ALL: [AccelerationStrategy; 10] = [
        Self::None,
        Self::AutoSmall,
        Self::AutoBig,
        Self::Multithreading,
        Self::CpuTiling,
        Self::CpuTilingMt,
        Self::CpuMtTiling,
        Self::CpuMtTilingMt,
        Self::GpuOperationWise,
        Self::GpuTileWise,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::AutoSmall => "Optimal for small image",
            Self::AutoBig => "Optimal for big image",
            Self::Multithreading => "Multithreading",
            Self::CpuTiling => "CPU Tiling",
            Self::CpuTilingMt => "Thread-distributed CPU Tiling",
            Self::CpuMtTiling => "CPU Tiling with MT",
            Self::CpuMtTilingMt => "Thread-distributed CPU Tiling with MT",
            Self::GpuOperationWise => "GPU (Operation Wise)",
            Self::GpuTileWise => "GPU (Tile by Tile)",
        }
    }

    /// Short identifier used on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AutoSmall => "auto-small",
            Self::AutoBig => "auto-big",
            Self::Multithreading => "multithreading",
            Self::CpuTiling => "cpu-tiling",
            Self::CpuTilingMt => "cpu-tiling-mt",
            Self::CpuMtTiling => "cpu-mt-tiling",
            Self::CpuMtTilingMt => "cpu-mt-tiling-mt",
            Self::GpuOperationWise => "gpu-operation-wise",
            Self::GpuTileWise => "gpu-tile-wise",
        }
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Self::GpuOperationWise | Self::GpuTileWise)
    }
}

impl fmt::Display for AccelerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccelerationStrategy {
    type Err = DngError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.id().eq_ignore_ascii_case(s) || strategy.label() == s)
            .ok_or_else(|| DngError::configuration("acceleration", format!("unknown strategy '{s}'")))
    }
}

/// Whether a level of the work split runs on the calling thread or on the
/// rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    Sequential,
    Parallel,
}

impl Dispatch {
    fn from_flag(parallel: bool) -> Self {
        if parallel { Self::Parallel } else { Self::Sequential }
    }
}

/// Work split for point-wise stages.
///
/// `chunk_len` is the number of pixels per chunk; `None` treats the whole
/// buffer as a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSchedule {
    pub chunk_len: Option<usize>,
    pub outer: Dispatch,
    pub inner: Dispatch,
}

impl ChunkSchedule {
    pub const SEQUENTIAL: ChunkSchedule =
        ChunkSchedule { chunk_len: None, outer: Dispatch::Sequential, inner: Dispatch::Sequential };
    pub const PARALLEL: ChunkSchedule =
        ChunkSchedule { chunk_len: None, outer: Dispatch::Sequential, inner: Dispatch::Parallel };

    /// Schedule used by pre- and post-processing. Chunks are squares of the
    /// tile edge flattened onto the sample index space.
    pub fn pointwise(strategy: AccelerationStrategy, edge_override: Option<usize>) -> Self {
        let chunked = |edge: usize, outer: bool, inner: bool| ChunkSchedule {
            chunk_len: Some(edge.max(1) * edge.max(1)),
            outer: Dispatch::from_flag(outer),
            inner: Dispatch::from_flag(inner),
        };
        let edge = edge_override.unwrap_or(POINTWISE_CHUNK_EDGE);
        match strategy {
            AccelerationStrategy::None => Self::SEQUENTIAL,
            AccelerationStrategy::AutoSmall => chunked(POINTWISE_CHUNK_EDGE_SMALL, true, false),
            AccelerationStrategy::CpuTiling => chunked(edge, false, false),
            AccelerationStrategy::CpuTilingMt => chunked(edge, true, false),
            AccelerationStrategy::CpuMtTiling => chunked(edge, false, true),
            AccelerationStrategy::CpuMtTilingMt => chunked(edge, true, true),
            AccelerationStrategy::AutoBig
            | AccelerationStrategy::Multithreading
            | AccelerationStrategy::GpuOperationWise
            | AccelerationStrategy::GpuTileWise => Self::PARALLEL,
        }
    }
}

/// Execution of the CPU demosaicing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemosaicExecution {
    /// One pass over the whole image.
    Whole { inner: Dispatch },
    /// Overlapping tiles of `tile` interior pixels and `overlap` pixels of
    /// context on each side.
    Tiled { tile: usize, overlap: usize, outer: Dispatch, inner: Dispatch },
}

/// Resolved demosaicing plan for one (method, strategy) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DemosaicPlan {
    pub requested: AccelerationStrategy,
    pub resolved: AccelerationStrategy,
    pub execution: DemosaicExecution,
}

impl DemosaicPlan {
    /// Looks up the CPU execution for `method` under `strategy`.
    ///
    /// The automatic strategies resolve to a concrete one depending on the
    /// algorithm, and GPU strategies fall back to thread-distributed tiling.
    /// `tile_override` is the full tile edge including the overlap on both
    /// sides.
    pub fn new(
        method: InterpolationMethod,
        strategy: AccelerationStrategy,
        tile_override: Option<usize>,
    ) -> Result<Self> {
        let overlap = method.margin();
        let base = tile_override.unwrap_or_else(|| method.tile_base(strategy));
        let tile = base.saturating_sub(2 * overlap);

        let resolved = match strategy {
            AccelerationStrategy::AutoSmall if method.is_multi_pass() => AccelerationStrategy::CpuMtTilingMt,
            AccelerationStrategy::AutoSmall => AccelerationStrategy::Multithreading,
            AccelerationStrategy::AutoBig if method.prefers_inner_threads() => AccelerationStrategy::CpuMtTilingMt,
            AccelerationStrategy::AutoBig => AccelerationStrategy::CpuTilingMt,
            AccelerationStrategy::GpuOperationWise | AccelerationStrategy::GpuTileWise => {
                debug!(method = %method, "No GPU kernel for method, tiling on CPU");
                AccelerationStrategy::CpuTilingMt
            }
            other => other,
        };

        let tiled = |outer: bool, inner: bool| DemosaicExecution::Tiled {
            tile,
            overlap,
            outer: Dispatch::from_flag(outer),
            inner: Dispatch::from_flag(inner),
        };
        let execution = match resolved {
            AccelerationStrategy::None => DemosaicExecution::Whole { inner: Dispatch::Sequential },
            AccelerationStrategy::CpuTiling => tiled(false, false),
            AccelerationStrategy::CpuTilingMt => tiled(true, false),
            AccelerationStrategy::CpuMtTiling => tiled(false, true),
            AccelerationStrategy::CpuMtTilingMt => tiled(true, true),
            _ => DemosaicExecution::Whole { inner: Dispatch::Parallel },
        };

        // only a tiled execution ever splits the image
        if matches!(execution, DemosaicExecution::Tiled { .. }) && (tile == 0 || tile < overlap) {
            return Err(DngError::configuration(
                "demosaicing",
                format!("computed tile size {tile} is smaller than overlap {overlap} (tile edge {base})"),
            ));
        }
        Ok(Self { requested: strategy, resolved, execution })
    }

    /// Full tile edge, for reporting.
    pub fn tile_edge(&self) -> Option<usize> {
        match self.execution {
            DemosaicExecution::Tiled { tile, overlap, .. } => Some(tile + 2 * overlap),
            DemosaicExecution::Whole { .. } => None,
        }
    }
}

/// Tile edge from the `TILE_SIZE` environment variable, if set and numeric.
pub fn tile_size_from_env() -> Option<usize> {
    std::env::var(TILE_SIZE_ENV).ok().and_then(|v| v.trim().parse().ok())
}
