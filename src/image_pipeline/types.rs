//! Image buffer types shared by the pipeline stages

/// Single-channel sensor samples, row-major.
///
/// Samples occupy the logical 0..=65535 range regardless of the sensor's
/// native bit depth once they have been through raw mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Raw pixel data (single channel CFA mosaic)
    pub data: Vec<u16>,
    /// Bits per sample as declared by the container (e.g. 12, 14 or 16)
    pub bits_per_sample: u32,
}

impl RawImageData {
    pub fn new(width: usize, height: usize, data: Vec<u16>, bits_per_sample: u32) -> Self {
        Self { width, height, data, bits_per_sample }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }

    /// Copies the rectangle `(x, y, width, height)` into a new buffer.
    pub fn region(&self, x: usize, y: usize, width: usize, height: usize) -> RawImageData {
        let mut data = Vec::with_capacity(width * height);
        for row in y..y + height {
            let start = row * self.width + x;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        RawImageData { width, height, data, bits_per_sample: self.bits_per_sample }
    }
}

/// RGB image data after demosaicing
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImageData {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// RGB pixel data interleaved [R, G, B, R, G, B, ...]
    pub data: Vec<u16>,
    pub bits_per_sample: u32,
}

impl RgbImageData {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0; width * height * 3], bits_per_sample: 16 }
    }

    pub fn from_data(width: usize, height: usize, data: Vec<u16>) -> Self {
        Self { width, height, data, bits_per_sample: 16 }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn region(&self, x: usize, y: usize, width: usize, height: usize) -> RgbImageData {
        let mut data = Vec::with_capacity(width * height * 3);
        for row in y..y + height {
            let start = (row * self.width + x) * 3;
            data.extend_from_slice(&self.data[start..start + width * 3]);
        }
        RgbImageData::from_data(width, height, data)
    }

    /// Mean absolute per-sample difference against another image of the same size.
    pub fn mean_abs_diff(&self, other: &RgbImageData) -> f64 {
        if self.data.is_empty() || self.data.len() != other.data.len() {
            return f64::INFINITY;
        }
        let sum: u64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| (a as i64 - b as i64).unsigned_abs())
            .sum();
        sum as f64 / self.data.len() as f64
    }
}
