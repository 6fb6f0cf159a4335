use tracing::debug;

use crate::image_pipeline::common::error::{DngError, Result};
use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::reader::ImageFileDirectory;
use super::PreProcessorOperation;

/// Linearisation, black level subtraction and normalisation to 16 bits.
///
/// The black level pattern, the row deltas and the column deltas are all
/// anchored at the top-left corner of the active area and only apply inside
/// it; outside the active area the first black level entry is used.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMapping {
    linearization: Option<Vec<u16>>,
    black_level: Vec<f64>,
    /// (rows, columns) of the black level pattern
    black_repeat: (usize, usize),
    delta_h: Vec<f64>,
    delta_v: Vec<f64>,
    white_level: f64,
    /// (top, left, bottom, right)
    active_area: Option<[usize; 4]>,
}

impl RawMapping {
    /// Identity linearisation, black level zero.
    pub fn new(white_level: f64) -> Self {
        Self {
            linearization: None,
            black_level: vec![0.0],
            black_repeat: (1, 1),
            delta_h: Vec::new(),
            delta_v: Vec::new(),
            white_level,
            active_area: None,
        }
    }

    pub fn from_directory(raw: &ImageFileDirectory) -> Result<Self> {
        let samples_per_pixel = raw.samples_per_pixel();
        if samples_per_pixel > 1 {
            return Err(DngError::UnsupportedFormat(format!(
                "raw mapping of {samples_per_pixel} samples per pixel (Linear DNG) is not supported"
            )));
        }
        let white_level = raw.white_level().first().copied().unwrap_or(u16::MAX as u32) as f64;
        let mut mapping = Self::new(white_level)
            .with_black_level(raw.black_level(), raw.black_level_repeat_dim()?)
            .with_deltas(
                raw.black_level_delta_h().unwrap_or_default(),
                raw.black_level_delta_v().unwrap_or_default(),
            );
        if let Some(table) = raw.linearization_table() {
            mapping = mapping.with_linearization(table);
        }
        if let Some(area) = raw.active_area()? {
            mapping = mapping.with_active_area(area);
        }
        debug!(
            white = mapping.white_level,
            black = ?mapping.black_level,
            linearized = mapping.linearization.is_some(),
            "Raw mapping"
        );
        Ok(mapping)
    }

    pub fn with_linearization(mut self, table: Vec<u16>) -> Self {
        self.linearization = (!table.is_empty()).then_some(table);
        self
    }

    /// `repeat` is (rows, columns); levels are stored row-major.
    pub fn with_black_level(mut self, levels: Vec<f64>, repeat: (usize, usize)) -> Self {
        self.black_level = if levels.is_empty() { vec![0.0] } else { levels };
        self.black_repeat = (repeat.0.max(1), repeat.1.max(1));
        self
    }

    pub fn with_deltas(mut self, delta_h: Vec<f64>, delta_v: Vec<f64>) -> Self {
        self.delta_h = delta_h;
        self.delta_v = delta_v;
        self
    }

    pub fn with_active_area(mut self, area: [usize; 4]) -> Self {
        self.active_area = Some(area);
        self
    }

    #[inline]
    fn linearize(&self, sample: u16) -> f64 {
        match &self.linearization {
            Some(table) => table.get(sample as usize).or(table.last()).copied().unwrap_or(sample) as f64,
            None => sample as f64,
        }
    }

    /// Black level at `(x, y)` in raster coordinates.
    pub fn black_level_at(&self, x: usize, y: usize) -> f64 {
        let [top, left, bottom, right] = self.active_area.unwrap_or([0, 0, usize::MAX, usize::MAX]);
        if x < left || y < top || x >= right || y >= bottom {
            return self.black_level[0];
        }
        let (ax, ay) = (x - left, y - top);
        let (rows, cols) = self.black_repeat;
        let idx = (ay % rows) * cols + ax % cols;
        let base = self.black_level.get(idx).copied().unwrap_or(self.black_level[0]);
        base + self.delta_v.get(ay).copied().unwrap_or(0.0) + self.delta_h.get(ax).copied().unwrap_or(0.0)
    }
}

impl PreProcessorOperation for RawMapping {
    fn name(&self) -> &'static str {
        "RawMapping"
    }

    fn process(&self, sample: u16, x: usize, y: usize) -> u16 {
        let black = self.black_level_at(x, y);
        let range = self.white_level - black;
        if range <= 0.0 {
            return 0;
        }
        clamp_u16((self.linearize(sample) - black) / range * 65535.0)
    }
}
