use rayon::prelude::*;
use tracing::trace;

use crate::image_pipeline::acceleration::strategy::{DemosaicExecution, Dispatch};
use crate::image_pipeline::common::Result;
use crate::image_pipeline::reader::CfaPattern;
use crate::image_pipeline::types::RawImageData;
use super::method::{InterpolationMethod, SubStep};
use super::mosaic::Mosaic;
use super::interpolate;

/// Interior rectangle of a tile and the region read to compute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// (x, y, width, height) of the interior grown by the overlap and
    /// clipped to the image
    pub read: (usize, usize, usize, usize),
}

/// Splits a `width x height` image into tiles of `tile` interior pixels,
/// each read with `overlap` pixels of context where the image has them.
pub fn tile_regions(width: usize, height: usize, tile: usize, overlap: usize) -> Vec<TileRegion> {
    let tile = tile.max(1);
    let mut regions = Vec::with_capacity(width.div_ceil(tile) * height.div_ceil(tile));
    for y in (0..height).step_by(tile) {
        for x in (0..width).step_by(tile) {
            let w = tile.min(width - x);
            let h = tile.min(height - y);
            let rx = x.saturating_sub(overlap);
            let ry = y.saturating_sub(overlap);
            let rw = (x + w + overlap).min(width) - rx;
            let rh = (y + h + overlap).min(height) - ry;
            regions.push(TileRegion { x, y, width: w, height: h, read: (rx, ry, rw, rh) });
        }
    }
    regions
}

fn to_f32(samples: &[u16]) -> Vec<f32> {
    samples.iter().map(|&v| v as f32).collect()
}

/// Demosaics `raw` into interleaved RGB in the 0..=65535 range, before
/// clamping.
pub(super) fn run(
    method: InterpolationMethod,
    raw: &RawImageData,
    pattern: &CfaPattern,
    execution: DemosaicExecution,
    stop: Option<SubStep>,
) -> Result<Vec<f32>> {
    let (width, height) = (raw.width, raw.height);
    let layout = pattern.bayer_layout()?;

    let (tile, overlap, outer, inner) = match execution {
        DemosaicExecution::Whole { inner } => {
            let samples = to_f32(&raw.data);
            let mosaic = Mosaic::new(&samples, width, height, layout, u16::MAX as f32);
            return Ok(interpolate(method, &mosaic, inner, stop));
        }
        DemosaicExecution::Tiled { tile, overlap, outer, inner } => (tile, overlap, outer, inner),
    };

    let regions = tile_regions(width, height, tile, overlap);
    trace!(tiles = regions.len(), tile, overlap, "Demosaicing tiles");

    let compute = |region: &TileRegion| -> Result<Vec<f32>> {
        let (rx, ry, rw, rh) = region.read;
        let samples = to_f32(&raw.region(rx, ry, rw, rh).data);
        let layout = pattern.shifted(rx, ry).bayer_layout()?;
        let mosaic = Mosaic::new(&samples, rw, rh, layout, u16::MAX as f32);
        Ok(interpolate(method, &mosaic, inner, stop))
    };
    let results: Vec<Vec<f32>> = match outer {
        Dispatch::Sequential => regions.iter().map(compute).collect::<Result<_>>()?,
        Dispatch::Parallel => regions.par_iter().map(compute).collect::<Result<_>>()?,
    };

    let mut out = vec![0.0f32; width * height * 3];
    for (region, rgb) in regions.iter().zip(&results) {
        let (rx, ry, rw, _) = region.read;
        let (ox, oy) = (region.x - rx, region.y - ry);
        for row in 0..region.height {
            let src = ((oy + row) * rw + ox) * 3;
            let dst = ((region.y + row) * width + region.x) * 3;
            out[dst..dst + region.width * 3].copy_from_slice(&rgb[src..src + region.width * 3]);
        }
    }
    Ok(out)
}
