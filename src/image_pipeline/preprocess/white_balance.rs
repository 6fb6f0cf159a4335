use tracing::debug;

use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::reader::{tag, CfaPattern, ImageFileDirectory};
use super::PreProcessorOperation;

/// Per-CFA-channel gain from AnalogBalance and AsShotNeutral.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteBalance {
    pattern: CfaPattern,
    factors: [f64; 3],
}

impl WhiteBalance {
    pub fn new(pattern: CfaPattern, factors: [f64; 3]) -> Self {
        Self { pattern, factors }
    }

    /// Reads the balance tags from the 0th directory and the CFA layout from
    /// the raw directory. Without AsShotNeutral the gains stay at one.
    pub fn from_directories(ifd0: &ImageFileDirectory, raw: &ImageFileDirectory) -> Result<Self> {
        let pattern = raw.cfa_pattern()?.ok_or(DngError::MissingTag(tag::CFA_PATTERN))?;
        let mut factors = [1.0; 3];
        if let Some(balance) = ifd0.analog_balance()? {
            for (f, b) in factors.iter_mut().zip(balance) {
                *f *= reciprocal(b);
            }
        }
        match ifd0.as_shot_neutral()? {
            Some(neutral) => {
                for (f, n) in factors.iter_mut().zip(neutral) {
                    *f *= reciprocal(n);
                }
            }
            None => debug!("No AsShotNeutral, white balance gains left at analog balance"),
        }
        debug!(?factors, %pattern, "White balance");
        Ok(Self::new(pattern, factors))
    }

    pub fn factors(&self) -> [f64; 3] {
        self.factors
    }
}

fn reciprocal(value: f64) -> f64 {
    if value.is_finite() && value != 0.0 { 1.0 / value } else { 1.0 }
}

impl PreProcessorOperation for WhiteBalance {
    fn name(&self) -> &'static str {
        "WhiteBalance"
    }

    fn process(&self, sample: u16, x: usize, y: usize) -> u16 {
        let channel = self.pattern.color_at(x, y).min(2) as usize;
        clamp_u16(self.factors[channel] * sample as f64)
    }
}
