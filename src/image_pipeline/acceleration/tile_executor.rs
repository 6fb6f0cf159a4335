use tracing::{info_span, trace};

use crate::image_pipeline::common::{DngError, Result, RunTimer};
use crate::image_pipeline::demosaic::{tile_regions, TileRegion};
use super::gpu::{run_region, GpuContext, GpuKernel};

/// Runs device kernels tile by tile.
///
/// Tiles are as large as the device allows: each is read with `margin`
/// pixels of context on every side (clipped at the image border) so that
/// only the interior is kept when stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileExecutor {
    margin: usize,
}

impl TileExecutor {
    pub fn new(margin: usize) -> Self {
        Self { margin }
    }

    /// Interior tile edge for a device with the given texture limits.
    pub fn tile_edge(&self, max_dimensions: (usize, usize)) -> Result<usize> {
        let limit = max_dimensions.0.min(max_dimensions.1);
        let tile = limit.saturating_sub(2 * self.margin);
        if tile == 0 {
            return Err(DngError::Device(format!(
                "maximum texture size {limit} leaves no room inside an overlap of {}",
                self.margin
            )));
        }
        Ok(tile)
    }

    pub fn regions(&self, width: usize, height: usize, max_dimensions: (usize, usize)) -> Result<Vec<TileRegion>> {
        Ok(tile_regions(width, height, self.tile_edge(max_dimensions)?, self.margin))
    }

    /// Processes the normalised `samples` (`channels` per pixel) and returns
    /// the stitched RGB result.
    pub fn run<C: GpuContext>(
        &self,
        context: &mut C,
        kernels: &[GpuKernel],
        samples: &[f32],
        (width, height, channels): (usize, usize, usize),
        timer: &mut RunTimer,
    ) -> Result<Vec<f32>> {
        let regions = self.regions(width, height, context.max_texture_dimensions())?;
        let _span = info_span!("gpu_tiles", tiles = regions.len(), margin = self.margin).entered();
        let detail = format!("{} tiles, {}px overlap", regions.len(), self.margin);

        timer.time("GPU tile processing", detail, || {
            let mut out = vec![0.0f32; width * height * 3];
            for region in &regions {
                let (rx, ry, rw, rh) = region.read;
                trace!(x = region.x, y = region.y, width = region.width, height = region.height, "Tile");
                let mut padded = Vec::with_capacity(rw * rh * channels);
                for row in ry..ry + rh {
                    let start = (row * width + rx) * channels;
                    padded.extend_from_slice(&samples[start..start + rw * channels]);
                }
                let rgb = run_region(context, kernels, &padded, (rw, rh, channels), (rx, ry))?;

                let (ox, oy) = (region.x - rx, region.y - ry);
                for row in 0..region.height {
                    let src = ((oy + row) * rw + ox) * 3;
                    let dst = ((region.y + row) * width + region.x) * 3;
                    out[dst..dst + region.width * 3].copy_from_slice(&rgb[src..src + region.width * 3]);
                }
            }
            Ok(out)
        })
    }
}
