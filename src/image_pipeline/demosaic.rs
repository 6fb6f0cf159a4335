//! Demosaicing module for converting Bayer mosaics to RGB
//!
//! Every algorithm works on an `f32` view of the mosaic with clamped
//! border reads and declares its support radius as
//! [`InterpolationMethod::margin`]. Tiles grown by that margin therefore
//! reproduce the whole-image result exactly, which is what lets the CPU
//! strategies and the tile-wise device path split the work freely.

mod bicubic;
mod bilinear;
mod dlmmse;
mod hamilton_adams;
mod malvar_he_cutler;
mod method;
mod mosaic;
mod ppg;
mod rcd;
mod simple;
mod tiling;


pub use method::{InterpolationMethod, SubStep};
pub use mosaic::{Mosaic, Plane, Site};
pub use tiling::{tile_regions, TileRegion};

use tracing::{debug, info_span};

use crate::image_pipeline::acceleration::strategy::{AccelerationStrategy, DemosaicPlan, Dispatch};
use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::common::{Result, RunTimer};
use crate::image_pipeline::reader::CfaPattern;
use crate::image_pipeline::types::{RawImageData, RgbImageData};
use dlmmse::MeanEstimate;

/// Runs `method` over the whole of `mosaic`.
///
/// `stop` only affects methods that have sub-steps.
pub fn interpolate(method: InterpolationMethod, mosaic: &Mosaic, dispatch: Dispatch, stop: Option<SubStep>) -> Vec<f32> {
    use InterpolationMethod as M;
    match method {
        M::None => simple::none(mosaic, dispatch),
        M::NearestNeighbor => simple::nearest_neighbor(mosaic, dispatch),
        M::BilinearMean => bilinear::mean(mosaic, dispatch),
        M::BilinearMedian => bilinear::median(mosaic, dispatch),
        M::BiCubic => bicubic::interpolate(mosaic, dispatch),
        M::MalvarHeCutler => malvar_he_cutler::interpolate(mosaic, dispatch),
        M::HamiltonAdams => hamilton_adams::interpolate(mosaic, dispatch),
        M::Ppg => ppg::interpolate(mosaic, dispatch),
        M::Rcd => rcd::interpolate(mosaic, dispatch, stop.unwrap_or(SubStep::Done)),
        M::DlmmseCodeEstimate => dlmmse::interpolate(mosaic, dispatch, MeanEstimate::Code),
        M::DlmmsePaperEstimate => dlmmse::interpolate(mosaic, dispatch, MeanEstimate::Paper),
        M::DlmmseRcdCodeEstimate => dlmmse::interpolate_with_rcd(mosaic, dispatch, MeanEstimate::Code),
        M::DlmmseRcdPaperEstimate => dlmmse::interpolate_with_rcd(mosaic, dispatch, MeanEstimate::Paper),
    }
}

/// Converts interleaved `f32` RGB in the 0..=65535 range to a 16-bit image.
pub fn to_rgb16(width: usize, height: usize, rgb: &[f32]) -> RgbImageData {
    RgbImageData::from_data(width, height, rgb.iter().map(|&v| clamp_u16(v as f64)).collect())
}

/// CPU demosaicing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demosaicer {
    method: InterpolationMethod,
    plan: DemosaicPlan,
    sub_step: Option<SubStep>,
}

impl Demosaicer {
    /// `tile_override` is the full tile edge including the overlap.
    pub fn new(method: InterpolationMethod, strategy: AccelerationStrategy, tile_override: Option<usize>) -> Result<Self> {
        let plan = DemosaicPlan::new(method, strategy, tile_override)?;
        debug!(
            method = %method,
            requested = %plan.requested,
            resolved = %plan.resolved,
            tile_edge = ?plan.tile_edge(),
            "Demosaicing plan"
        );
        Ok(Self { method, plan, sub_step: None })
    }

    pub fn with_sub_step(mut self, sub_step: Option<SubStep>) -> Self {
        self.sub_step = sub_step;
        self
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    pub fn plan(&self) -> &DemosaicPlan {
        &self.plan
    }

    pub fn process(&self, raw: &RawImageData, pattern: &CfaPattern, timer: &mut RunTimer) -> Result<RgbImageData> {
        let _span = info_span!(
            "demosaic",
            method = %self.method,
            strategy = %self.plan.resolved,
            width = raw.width,
            height = raw.height
        )
        .entered();
        let detail = match self.plan.tile_edge() {
            Some(edge) => format!("{} ({edge}px tiles)", self.plan.resolved),
            None => self.plan.resolved.to_string(),
        };
        let rgb = timer.time("Demosaicing", detail, || {
            tiling::run(self.method, raw, pattern, self.plan.execution, self.sub_step)
        })?;
        Ok(to_rgb16(raw.width, raw.height, &rgb))
    }
}
