use std::fmt;

use crate::image_pipeline::common::error::{DngError, Result};

pub const RED: u8 = 0;
pub const GREEN: u8 = 1;
pub const BLUE: u8 = 2;

/// Colour filter layout of the sensor, `colors[x + y * width]` with
/// 0 = red, 1 = green, 2 = blue.
///
/// Lookups wrap with modular indexing so any repeat size works.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CfaPattern {
    width: usize,
    height: usize,
    colors: Vec<u8>,
}

impl CfaPattern {
    pub const RGGB: [u8; 4] = [RED, GREEN, GREEN, BLUE];
    pub const BGGR: [u8; 4] = [BLUE, GREEN, GREEN, RED];
    pub const GRBG: [u8; 4] = [GREEN, RED, BLUE, GREEN];
    pub const GBRG: [u8; 4] = [GREEN, BLUE, RED, GREEN];

    pub fn new(width: usize, height: usize, colors: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || colors.len() != width * height {
            return Err(DngError::CountMismatch {
                tag: super::tags::tag::CFA_PATTERN,
                expected: width * height,
                actual: colors.len(),
            });
        }
        if let Some(&bad) = colors.iter().find(|&&c| c > BLUE) {
            return Err(DngError::UnsupportedFormat(format!("CFA colour index {bad}")));
        }
        Ok(Self { width, height, colors })
    }

    pub fn rggb() -> Self {
        Self::bayer(Self::RGGB)
    }

    pub fn bggr() -> Self {
        Self::bayer(Self::BGGR)
    }

    pub fn grbg() -> Self {
        Self::bayer(Self::GRBG)
    }

    pub fn gbrg() -> Self {
        Self::bayer(Self::GBRG)
    }

    fn bayer(colors: [u8; 4]) -> Self {
        Self { width: 2, height: 2, colors: colors.to_vec() }
    }

    /// Parses one of the four named 2x2 layouts, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "RGGB" => Some(Self::rggb()),
            "BGGR" => Some(Self::bggr()),
            "GRBG" => Some(Self::grbg()),
            "GBRG" => Some(Self::gbrg()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        if self.width != 2 || self.height != 2 {
            return None;
        }
        match self.colors.as_slice() {
            c if c == Self::RGGB => Some("RGGB"),
            c if c == Self::BGGR => Some("BGGR"),
            c if c == Self::GRBG => Some("GRBG"),
            c if c == Self::GBRG => Some("GBRG"),
            _ => None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    #[inline]
    pub fn color_at(&self, x: usize, y: usize) -> u8 {
        self.colors[(x % self.width) + (y % self.height) * self.width]
    }

    /// The pattern as seen from a window whose origin is `(dx, dy)` in the
    /// original image.
    pub fn shifted(&self, dx: usize, dy: usize) -> Self {
        let mut colors = Vec::with_capacity(self.colors.len());
        for y in 0..self.height {
            for x in 0..self.width {
                colors.push(self.color_at(x + dx, y + dy));
            }
        }
        Self { width: self.width, height: self.height, colors }
    }

    /// Index layout used by the 2x2 Bayer algorithms. Fails for any pattern
    /// that is not one of the four Bayer variants.
    pub fn bayer_layout(&self) -> Result<BayerLayout> {
        let name = self.name().ok_or_else(|| {
            DngError::UnsupportedFormat(format!(
                "{}x{} CFA pattern {:?} is not a Bayer layout",
                self.width, self.height, self.colors
            ))
        })?;
        // positions in the 2x2 tile:
        // +---+---+
        // | 0 | 1 |
        // +---+---+
        // | 2 | 3 |
        // +---+---+
        let layout = match name {
            "GBRG" => BayerLayout { green_blue_row: 0, blue: 1, red: 2, green_red_row: 3 },
            "BGGR" => BayerLayout { blue: 0, green_blue_row: 1, green_red_row: 2, red: 3 },
            "RGGB" => BayerLayout { red: 0, green_red_row: 1, green_blue_row: 2, blue: 3 },
            _ => BayerLayout { green_red_row: 0, red: 1, blue: 2, green_blue_row: 3 },
        };
        Ok(layout)
    }
}

impl fmt::Display for CfaPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}x{} {:?}", self.width, self.height, self.colors),
        }
    }
}

/// Positions (0..4) of each colour inside a 2x2 Bayer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BayerLayout {
    pub red: usize,
    pub green_red_row: usize,
    pub green_blue_row: usize,
    pub blue: usize,
}

impl BayerLayout {
    #[inline]
    pub fn index(x: usize, y: usize) -> usize {
        (x & 1) + 2 * (y & 1)
    }

    #[inline]
    pub fn is_green(&self, idx: usize) -> bool {
        idx == self.green_red_row || idx == self.green_blue_row
    }
}
