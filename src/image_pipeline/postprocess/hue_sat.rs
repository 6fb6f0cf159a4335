//! Hue/saturation/value tables of a DNG camera profile
//!
//! ProfileHueSatMap and ProfileLookTable share the same layout: for every
//! (value, hue, saturation) grid node a hue shift in degrees, a saturation
//! scale and a value scale. Lookups are done in RIMM RGB, interpolating
//! linearly between the nodes.

use tracing::debug;

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::reader::{tag, ImageFileDirectory};
use super::color::{hsv_to_rgb, mul_vec, rgb_to_hsv, rimm_to_xyz_d50, xyz_d50_to_rimm, Matrix3};
use super::illuminant::ColorContext;
use super::PostProcessorOperation;

#[derive(Debug, Clone, PartialEq)]
pub struct HueSatTable {
    hue_divisions: usize,
    sat_divisions: usize,
    value_divisions: usize,
    entries: Vec<[f32; 3]>,
    to_rimm: Matrix3,
    from_rimm: Matrix3,
}

impl HueSatTable {
    /// `dims` is `[hue, saturation, value]` divisions; `data` holds three
    /// floats per node, value-major then hue then saturation.
    pub fn new(dims: [usize; 3], data: &[f32]) -> Result<Self> {
        let [hue_divisions, sat_divisions, value_divisions] = dims;
        if hue_divisions < 1 || sat_divisions < 2 || value_divisions < 1 {
            return Err(DngError::UnsupportedFormat(format!("hue/sat table dimensions {dims:?}")));
        }
        let nodes = hue_divisions * sat_divisions * value_divisions;
        if data.len() != nodes * 3 {
            return Err(DngError::UnsupportedFormat(format!(
                "hue/sat table with dimensions {dims:?} needs {} values, found {}",
                nodes * 3,
                data.len()
            )));
        }
        Ok(Self {
            hue_divisions,
            sat_divisions,
            value_divisions,
            entries: data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            to_rimm: xyz_d50_to_rimm(),
            from_rimm: rimm_to_xyz_d50(),
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.hue_divisions, self.sat_divisions, self.value_divisions]
    }

    /// Node-wise `weight * self + (1 - weight) * other`.
    pub fn blend(&self, other: &HueSatTable, weight: f64) -> Result<Self> {
        if self.dims() != other.dims() {
            return Err(DngError::UnsupportedFormat(format!(
                "cannot blend hue/sat tables of dimensions {:?} and {:?}",
                self.dims(),
                other.dims()
            )));
        }
        let weight = weight as f32;
        let entries = self
            .entries
            .iter()
            .zip(&other.entries)
            .map(|(a, b)| [0, 1, 2].map(|i| weight * a[i] + (1.0 - weight) * b[i]))
            .collect();
        Ok(Self { entries, ..self.clone() })
    }

    #[inline]
    fn node(&self, value: usize, hue: usize, sat: usize) -> [f32; 3] {
        self.entries[(value * self.hue_divisions + hue) * self.sat_divisions + sat]
    }

    /// Interpolated `(hue shift, saturation scale, value scale)` for a colour
    /// with hue in degrees and saturation and value in `0..=1`.
    pub fn lookup(&self, hue: f64, sat: f64, value: f64) -> [f64; 3] {
        let hue_pos = (hue / 360.0).rem_euclid(1.0) * self.hue_divisions as f64;
        let h0 = (hue_pos as usize).min(self.hue_divisions - 1);
        let h1 = (h0 + 1) % self.hue_divisions;
        let hf = hue_pos - h0 as f64;

        let (s0, sf) = grid(sat, self.sat_divisions);
        let (v0, vf) = if self.value_divisions > 1 { grid(value, self.value_divisions) } else { (0, 0.0) };
        let v1 = (v0 + 1).min(self.value_divisions - 1);

        let mut out = [0.0f64; 3];
        for (v, wv) in [(v0, 1.0 - vf), (v1, vf)] {
            for (h, wh) in [(h0, 1.0 - hf), (h1, hf)] {
                for (s, ws) in [(s0, 1.0 - sf), (s0 + 1, sf)] {
                    let weight = wv * wh * ws;
                    if weight == 0.0 {
                        continue;
                    }
                    let node = self.node(v, h, s);
                    for (o, n) in out.iter_mut().zip(node) {
                        *o += weight * n as f64;
                    }
                }
            }
        }
        out
    }

    /// Maps an XYZ(D50) colour through the table.
    pub fn apply(&self, xyz: [f64; 3]) -> [f64; 3] {
        let [h, s, v] = rgb_to_hsv(mul_vec(&self.to_rimm, xyz));
        let [shift, sat_scale, value_scale] = self.lookup(h, s, v.min(1.0));
        let hsv = [h + shift, (s * sat_scale).min(1.0), (v * value_scale).min(1.0)];
        mul_vec(&self.from_rimm, hsv_to_rgb(hsv))
    }
}

/// Lower grid index and fraction of `x` in `0..=1` on `divisions` nodes.
fn grid(x: f64, divisions: usize) -> (usize, f64) {
    let pos = x.clamp(0.0, 1.0) * (divisions - 1) as f64;
    let index = (pos as usize).min(divisions - 2);
    (index, (pos - index as f64).clamp(0.0, 1.0))
}

/// ProfileHueSatMap, blended between its two illuminants.
#[derive(Debug, Clone, PartialEq)]
pub struct HsvMapping {
    table: HueSatTable,
}

impl HsvMapping {
    pub fn new(table: HueSatTable) -> Self {
        Self { table }
    }

    /// `None` when the profile carries no hue/sat map.
    pub fn from_directory(ifd0: &ImageFileDirectory, context: &ColorContext) -> Result<Option<Self>> {
        let (first, second) = (ifd0.hue_sat_map_data_1(), ifd0.hue_sat_map_data_2());
        if first.is_none() && second.is_none() {
            return Ok(None);
        }
        let dims = ifd0.hue_sat_map_dims()?.ok_or(DngError::MissingTag(tag::PROFILE_HUE_SAT_MAP_DIMS))?;
        let table = match (first, second) {
            (Some(a), Some(b)) => {
                let weight = context.weight();
                debug!(weight, cct = context.cct, "Blending hue/sat maps");
                HueSatTable::new(dims, &a)?.blend(&HueSatTable::new(dims, &b)?, weight)?
            }
            (Some(data), None) | (None, Some(data)) => HueSatTable::new(dims, &data)?,
            (None, None) => return Ok(None),
        };
        Ok(Some(Self::new(table)))
    }
}

impl PostProcessorOperation for HsvMapping {
    fn name(&self) -> &'static str {
        "HSVMapping"
    }

    fn process(&self, rgb: [f64; 3]) -> [f64; 3] {
        self.table.apply(rgb)
    }
}

/// ProfileLookTable.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileLookTableMapping {
    table: HueSatTable,
}

impl ProfileLookTableMapping {
    pub fn new(table: HueSatTable) -> Self {
        Self { table }
    }

    pub fn from_directory(ifd0: &ImageFileDirectory) -> Result<Option<Self>> {
        let Some(data) = ifd0.look_table_data() else {
            return Ok(None);
        };
        let dims = ifd0.look_table_dims()?.ok_or(DngError::MissingTag(tag::PROFILE_LOOK_TABLE_DIMS))?;
        Ok(Some(Self::new(HueSatTable::new(dims, &data)?)))
    }
}

impl PostProcessorOperation for ProfileLookTableMapping {
    fn name(&self) -> &'static str {
        "ProfileLookTableMapping"
    }

    fn process(&self, rgb: [f64; 3]) -> [f64; 3] {
        self.table.apply(rgb)
    }
}
