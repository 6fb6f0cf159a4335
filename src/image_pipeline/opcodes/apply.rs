use tracing::{debug, warn};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::math::clamp_u16;
use crate::image_pipeline::types::RawImageData;
use super::types::*;

const FULL_SCALE: f64 = 65535.0;

/// Capability of an opcode to modify a single-channel raster in place.
pub trait ApplyOpcode {
    /// Returns `false` when the opcode was left unapplied.
    fn apply(&self, image: &mut RawImageData) -> Result<bool>;
}

/// Applies every record of a list in order and returns how many took effect.
pub fn apply_opcodes(records: &[OpcodeRecord], image: &mut RawImageData) -> Result<usize> {
    let mut applied = 0;
    for record in records {
        if record.opcode.apply(image)? {
            applied += 1;
        } else if record.is_optional() {
            debug!(name = record.opcode.name(), "Skipping optional opcode");
        } else {
            warn!(name = record.opcode.name(), "Opcode is not supported and was not applied");
        }
    }
    Ok(applied)
}

impl ApplyOpcode for Opcode {
    fn apply(&self, image: &mut RawImageData) -> Result<bool> {
        match self {
            Opcode::FixBadPixelsConstant(op) => op.apply(image),
            Opcode::MapTable(op) => op.apply(image),
            Opcode::MapPolynomial(op) => op.apply(image),
            Opcode::GainMap(op) => op.apply(image),
            Opcode::DeltaPerRow(op) => Ok(op.apply_lines(image, Line::Row, Kind::Delta)),
            Opcode::DeltaPerColumn(op) => Ok(op.apply_lines(image, Line::Column, Kind::Delta)),
            Opcode::ScalePerRow(op) => Ok(op.apply_lines(image, Line::Row, Kind::Scale)),
            Opcode::ScalePerColumn(op) => Ok(op.apply_lines(image, Line::Column, Kind::Scale)),
            // geometric corrections need resampling
            Opcode::WarpRectilinear(_)
            | Opcode::WarpFisheye(_)
            | Opcode::FixVignetteRadial(_)
            | Opcode::FixBadPixelsList(_)
            | Opcode::TrimBounds(_) => Ok(false),
        }
    }
}

/// Visits every sample of `area` that lies inside the image.
fn for_each_in_area(image: &mut RawImageData, area: &OpcodeArea, mut f: impl FnMut(usize, usize, &mut u16)) {
    let bottom = (area.bottom as usize).min(image.height);
    let right = (area.right as usize).min(image.width);
    let row_step = area.row_pitch.max(1) as usize;
    let col_step = area.col_pitch.max(1) as usize;
    for y in (area.top as usize..bottom).step_by(row_step) {
        for x in (area.left as usize..right).step_by(col_step) {
            let i = y * image.width + x;
            f(x, y, &mut image.data[i]);
        }
    }
}

impl ApplyOpcode for FixBadPixelsConstant {
    /// Samples equal to the constant are replaced by the mean of their
    /// same-colour neighbours two pixels away.
    fn apply(&self, image: &mut RawImageData) -> Result<bool> {
        let source = image.data.clone();
        let (w, h) = (image.width as isize, image.height as isize);
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                if source[i] as u32 != self.constant {
                    continue;
                }
                let mut sum = 0u32;
                let mut n = 0u32;
                for (dx, dy) in [(-2, 0), (2, 0), (0, -2), (0, 2)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let v = source[(ny * w + nx) as usize];
                    if v as u32 != self.constant {
                        sum += v as u32;
                        n += 1;
                    }
                }
                if n > 0 {
                    image.data[i] = ((sum + n / 2) / n) as u16;
                }
            }
        }
        Ok(true)
    }
}

impl ApplyOpcode for MapTable {
    fn apply(&self, image: &mut RawImageData) -> Result<bool> {
        if self.table.is_empty() || !self.area.covers_plane_zero() {
            return Ok(false);
        }
        let last = self.table.len() - 1;
        for_each_in_area(image, &self.area, |_, _, v| {
            *v = self.table[(*v as usize).min(last)];
        });
        Ok(true)
    }
}

impl ApplyOpcode for MapPolynomial {
    fn apply(&self, image: &mut RawImageData) -> Result<bool> {
        if !self.area.covers_plane_zero() {
            return Ok(false);
        }
        for_each_in_area(image, &self.area, |_, _, v| {
            let x = *v as f64 / FULL_SCALE;
            // Horner, highest degree first
            let y = self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c);
            *v = clamp_u16(y * FULL_SCALE);
        });
        Ok(true)
    }
}

impl ApplyOpcode for GainMap {
    /// Bilinear interpolation of the gain grid; positions are relative to
    /// the opcode area (0 = top/left edge, 1 = bottom/right edge).
    fn apply(&self, image: &mut RawImageData) -> Result<bool> {
        if self.points_v == 0 || self.points_h == 0 || !self.area.covers_plane_zero() {
            return Ok(false);
        }
        let height = (self.area.bottom.saturating_sub(self.area.top)).max(1) as f64;
        let width = (self.area.right.saturating_sub(self.area.left)).max(1) as f64;
        let max_v = (self.points_v - 1) as f64;
        let max_h = (self.points_h - 1) as f64;
        let grid = |rel: f64, origin: f64, spacing: f64, max: f64| -> (usize, usize, f64) {
            let pos = if spacing > 0.0 { (rel - origin) / spacing } else { 0.0 };
            let pos = pos.clamp(0.0, max);
            let lo = pos.floor();
            let hi = (lo + 1.0).min(max);
            (lo as usize, hi as usize, pos - lo)
        };

        let (top, left) = (self.area.top as f64, self.area.left as f64);
        for_each_in_area(image, &self.area, |x, y, v| {
            let (v0, v1, fv) = grid((y as f64 - top) / height, self.origin_v, self.spacing_v, max_v);
            let (h0, h1, fh) = grid((x as f64 - left) / width, self.origin_h, self.spacing_h, max_h);
            let top_gain = self.gain(v0, h0, 0) as f64 * (1.0 - fh) + self.gain(v0, h1, 0) as f64 * fh;
            let bottom_gain = self.gain(v1, h0, 0) as f64 * (1.0 - fh) + self.gain(v1, h1, 0) as f64 * fh;
            let gain = top_gain * (1.0 - fv) + bottom_gain * fv;
            *v = clamp_u16(*v as f64 * gain);
        });
        Ok(true)
    }
}

#[derive(Clone, Copy)]
enum Line {
    Row,
    Column,
}

#[derive(Clone, Copy)]
enum Kind {
    Delta,
    Scale,
}

impl PerLineOpcode {
    fn apply_lines(&self, image: &mut RawImageData, line: Line, kind: Kind) -> bool {
        if !self.area.covers_plane_zero() {
            return false;
        }
        let area = self.area;
        let row_step = area.row_pitch.max(1) as usize;
        let col_step = area.col_pitch.max(1) as usize;
        for_each_in_area(image, &area, |x, y, v| {
            let index = match line {
                Line::Row => (y - area.top as usize) / row_step,
                Line::Column => (x - area.left as usize) / col_step,
            };
            let Some(&value) = self.values.get(index) else {
                return;
            };
            *v = match kind {
                Kind::Delta => clamp_u16(*v as f64 + value as f64 * FULL_SCALE),
                Kind::Scale => clamp_u16(*v as f64 * value as f64),
            };
        });
        true
    }
}
