use std::collections::BTreeMap;

use crate::image_pipeline::common::error::{DngError, Result};
use super::byte_reader::ByteReader;
use super::cfa::CfaPattern;
use super::field_type::FieldType;
use super::tags::{tag, TagEntry, TagValue};

/// Bytes available for an inline value in a classic TIFF entry.
const INLINE_VALUE_SIZE: u64 = 4;

/// Where a directory was found in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Member of the top-level linked list.
    Baseline,
    /// Referenced by a SubIFDs entry.
    Sub,
    /// Referenced by the EXIF pointer.
    Exif,
}

/// One parsed image file directory. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct ImageFileDirectory {
    pub offset: u64,
    pub kind: DirectoryKind,
    entries: BTreeMap<u16, TagEntry>,
    next_offset: u32,
}

impl ImageFileDirectory {
    /// Parses the directory at `offset`. The reader's cursor is left behind
    /// the trailing next-directory offset.
    pub fn parse(reader: &mut ByteReader<'_>, offset: u64, kind: DirectoryKind) -> Result<Self> {
        reader.seek(offset)?;
        let entry_count = reader.read_u16()?;
        let mut entries = BTreeMap::new();

        for _ in 0..entry_count {
            let tag_id = reader.read_u16()?;
            let raw_type = reader.read_u16()?;
            let count = reader.read_u32()?;
            let field_type = FieldType::from_u16(raw_type)
                .ok_or(DngError::UnknownFieldType { tag: tag_id, field_type: raw_type })?;

            let value_field = reader.position() as u64;
            let size = field_type.byte_size() as u64 * count as u64;
            let value_offset = if size > INLINE_VALUE_SIZE {
                reader.read_u32()? as u64
            } else {
                value_field
            };

            // the whole span must exist before anything is allocated for it
            let span = usize::try_from(size)
                .map_err(|_| DngError::EndOfData { offset: value_offset, requested: usize::MAX })?;
            reader.slice_at(value_offset, span)?;

            let mut values = reader.clone();
            values.seek(value_offset)?;
            let value = read_values(&mut values, field_type, count as usize)?;
            entries.insert(tag_id, TagEntry { tag: tag_id, field_type, count, value });

            reader.seek(value_field + INLINE_VALUE_SIZE)?;
        }

        let next_offset = reader.read_u32()?;
        Ok(Self { offset, kind, entries, next_offset })
    }

    /// Offset of the next directory in the chain; zero ends the chain.
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    pub fn entries(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, tag_id: u16) -> Option<&TagEntry> {
        self.entries.get(&tag_id)
    }

    pub fn has(&self, tag_id: u16) -> bool {
        self.entries.contains_key(&tag_id)
    }

    fn value(&self, tag_id: u16) -> Option<&TagValue> {
        self.entry(tag_id).map(|e| &e.value)
    }

    pub fn u32_values(&self, tag_id: u16) -> Option<Vec<u32>> {
        self.value(tag_id).and_then(TagValue::as_u32_vec)
    }

    pub fn u32_value(&self, tag_id: u16) -> Option<u32> {
        self.value(tag_id).and_then(TagValue::as_u32)
    }

    pub fn f64_values(&self, tag_id: u16) -> Option<Vec<f64>> {
        self.value(tag_id).and_then(TagValue::as_f64_vec)
    }

    pub fn f64_value(&self, tag_id: u16) -> Option<f64> {
        self.value(tag_id).and_then(TagValue::as_f64)
    }

    pub fn string(&self, tag_id: u16) -> Option<String> {
        self.value(tag_id).and_then(TagValue::as_str).map(|s| s.trim().to_string())
    }

    pub fn bytes(&self, tag_id: u16) -> Option<&[u8]> {
        self.value(tag_id).and_then(TagValue::as_bytes)
    }

    fn required_u32(&self, tag_id: u16) -> Result<u32> {
        self.u32_value(tag_id).ok_or(DngError::MissingTag(tag_id))
    }

    /// Values of `tag_id`, which must hold exactly `expected` of them.
    fn exact_f64(&self, tag_id: u16, expected: usize) -> Result<Option<Vec<f64>>> {
        match self.f64_values(tag_id) {
            None => Ok(None),
            Some(v) if v.len() == expected => Ok(Some(v)),
            Some(v) => Err(DngError::CountMismatch { tag: tag_id, expected, actual: v.len() }),
        }
    }

    fn exact_u32(&self, tag_id: u16, expected: usize) -> Result<Option<Vec<u32>>> {
        match self.u32_values(tag_id) {
            None => Ok(None),
            Some(v) if v.len() == expected => Ok(Some(v)),
            Some(v) => Err(DngError::CountMismatch { tag: tag_id, expected, actual: v.len() }),
        }
    }

    fn f32_values(&self, tag_id: u16) -> Option<Vec<f32>> {
        self.f64_values(tag_id).map(|v| v.into_iter().map(|x| x as f32).collect())
    }

    // ---- baseline geometry ----

    pub fn new_subfile_type(&self) -> Option<u32> {
        self.u32_value(tag::NEW_SUBFILE_TYPE)
    }

    pub fn width(&self) -> Result<usize> {
        Ok(self.required_u32(tag::IMAGE_WIDTH)? as usize)
    }

    pub fn height(&self) -> Result<usize> {
        Ok(self.required_u32(tag::IMAGE_LENGTH)? as usize)
    }

    /// First BitsPerSample value; TIFF defaults to 1.
    pub fn bits_per_sample(&self) -> u16 {
        self.u32_value(tag::BITS_PER_SAMPLE).unwrap_or(1) as u16
    }

    pub fn compression(&self) -> u16 {
        self.u32_value(tag::COMPRESSION).unwrap_or(1) as u16
    }

    pub fn photometric_interpretation(&self) -> Option<u16> {
        self.u32_value(tag::PHOTOMETRIC_INTERPRETATION).map(|v| v as u16)
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.u32_value(tag::SAMPLES_PER_PIXEL).unwrap_or(1) as usize
    }

    pub fn planar_configuration(&self) -> u16 {
        self.u32_value(tag::PLANAR_CONFIGURATION).unwrap_or(1) as u16
    }

    pub fn strip_offsets(&self) -> Option<Vec<u32>> {
        self.u32_values(tag::STRIP_OFFSETS)
    }

    pub fn strip_byte_counts(&self) -> Option<Vec<u32>> {
        self.u32_values(tag::STRIP_BYTE_COUNTS)
    }

    pub fn rows_per_strip(&self) -> Option<u32> {
        self.u32_value(tag::ROWS_PER_STRIP)
    }

    pub fn tile_width(&self) -> Option<usize> {
        self.u32_value(tag::TILE_WIDTH).map(|v| v as usize)
    }

    pub fn tile_length(&self) -> Option<usize> {
        self.u32_value(tag::TILE_LENGTH).map(|v| v as usize)
    }

    pub fn tile_offsets(&self) -> Option<Vec<u32>> {
        self.u32_values(tag::TILE_OFFSETS)
    }

    pub fn tile_byte_counts(&self) -> Option<Vec<u32>> {
        self.u32_values(tag::TILE_BYTE_COUNTS)
    }

    pub fn sub_ifd_offsets(&self) -> Vec<u32> {
        self.u32_values(tag::SUB_IFDS).unwrap_or_default()
    }

    pub fn exif_offset(&self) -> Option<u32> {
        self.u32_value(tag::EXIF_IFD)
    }

    // ---- CFA layout ----

    pub fn cfa_repeat_pattern_dim(&self) -> Result<Option<(usize, usize)>> {
        Ok(self
            .exact_u32(tag::CFA_REPEAT_PATTERN_DIM, 2)?
            .map(|v| (v[0] as usize, v[1] as usize)))
    }

    /// CFA pattern of this directory; repeat dims default to 2x2.
    pub fn cfa_pattern(&self) -> Result<Option<CfaPattern>> {
        let Some(colors) = self.u32_values(tag::CFA_PATTERN) else {
            return Ok(None);
        };
        let (rows, cols) = self.cfa_repeat_pattern_dim()?.unwrap_or((2, 2));
        let colors = colors.into_iter().map(|c| c as u8).collect();
        CfaPattern::new(cols, rows, colors).map(Some)
    }

    // ---- levels and linearisation ----

    pub fn linearization_table(&self) -> Option<Vec<u16>> {
        self.u32_values(tag::LINEARIZATION_TABLE)
            .map(|v| v.into_iter().map(|x| x.min(u16::MAX as u32) as u16).collect())
    }

    /// (rows, columns) of the black level repeat pattern, default 1x1.
    pub fn black_level_repeat_dim(&self) -> Result<(usize, usize)> {
        Ok(self
            .exact_u32(tag::BLACK_LEVEL_REPEAT_DIM, 2)?
            .map(|v| (v[0].max(1) as usize, v[1].max(1) as usize))
            .unwrap_or((1, 1)))
    }

    pub fn black_level(&self) -> Vec<f64> {
        self.f64_values(tag::BLACK_LEVEL).unwrap_or_else(|| vec![0.0])
    }

    pub fn black_level_delta_h(&self) -> Option<Vec<f64>> {
        self.f64_values(tag::BLACK_LEVEL_DELTA_H)
    }

    pub fn black_level_delta_v(&self) -> Option<Vec<f64>> {
        self.f64_values(tag::BLACK_LEVEL_DELTA_V)
    }

    /// White level per sample; defaults to `2^bits - 1`.
    pub fn white_level(&self) -> Vec<u32> {
        self.u32_values(tag::WHITE_LEVEL).unwrap_or_else(|| {
            let bits = self.bits_per_sample().clamp(1, 16) as u32;
            vec![(1u32 << bits) - 1]
        })
    }

    /// Active area as (top, left, bottom, right).
    pub fn active_area(&self) -> Result<Option<[usize; 4]>> {
        Ok(self
            .exact_u32(tag::ACTIVE_AREA, 4)?
            .map(|v| [v[0] as usize, v[1] as usize, v[2] as usize, v[3] as usize]))
    }

    pub fn default_crop_origin(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.exact_f64(tag::DEFAULT_CROP_ORIGIN, 2)?.map(|v| (v[0], v[1])))
    }

    pub fn default_crop_size(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.exact_f64(tag::DEFAULT_CROP_SIZE, 2)?.map(|v| (v[0], v[1])))
    }

    // ---- colour ----

    fn matrix3(&self, tag_id: u16) -> Result<Option<[f64; 9]>> {
        Ok(self.exact_f64(tag_id, 9)?.map(|v| {
            let mut m = [0.0; 9];
            m.copy_from_slice(&v);
            m
        }))
    }

    fn vector3(&self, tag_id: u16) -> Result<Option<[f64; 3]>> {
        Ok(self.exact_f64(tag_id, 3)?.map(|v| [v[0], v[1], v[2]]))
    }

    pub fn color_matrix_1(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::COLOR_MATRIX_1)
    }

    pub fn color_matrix_2(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::COLOR_MATRIX_2)
    }

    pub fn camera_calibration_1(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::CAMERA_CALIBRATION_1)
    }

    pub fn camera_calibration_2(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::CAMERA_CALIBRATION_2)
    }

    pub fn forward_matrix_1(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::FORWARD_MATRIX_1)
    }

    pub fn forward_matrix_2(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::FORWARD_MATRIX_2)
    }

    pub fn reduction_matrix_1(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::REDUCTION_MATRIX_1)
    }

    pub fn reduction_matrix_2(&self) -> Result<Option<[f64; 9]>> {
        self.matrix3(tag::REDUCTION_MATRIX_2)
    }

    pub fn camera_calibration_signature(&self) -> Option<String> {
        self.string(tag::CAMERA_CALIBRATION_SIGNATURE)
    }

    pub fn profile_calibration_signature(&self) -> Option<String> {
        self.string(tag::PROFILE_CALIBRATION_SIGNATURE)
    }

    pub fn analog_balance(&self) -> Result<Option<[f64; 3]>> {
        self.vector3(tag::ANALOG_BALANCE)
    }

    pub fn as_shot_neutral(&self) -> Result<Option<[f64; 3]>> {
        self.vector3(tag::AS_SHOT_NEUTRAL)
    }

    pub fn as_shot_white_xy(&self) -> Result<Option<(f64, f64)>> {
        Ok(self.exact_f64(tag::AS_SHOT_WHITE_XY, 2)?.map(|v| (v[0], v[1])))
    }

    pub fn calibration_illuminant_1(&self) -> Option<u16> {
        self.u32_value(tag::CALIBRATION_ILLUMINANT_1).map(|v| v as u16)
    }

    pub fn calibration_illuminant_2(&self) -> Option<u16> {
        self.u32_value(tag::CALIBRATION_ILLUMINANT_2).map(|v| v as u16)
    }

    pub fn baseline_exposure(&self) -> Option<f64> {
        self.f64_value(tag::BASELINE_EXPOSURE)
    }

    /// Stored as RATIONAL by DNG, but some writers use
    /// SRATIONAL; both are accepted.
    pub fn baseline_exposure_offset(&self) -> Option<f64> {
        self.f64_value(tag::BASELINE_EXPOSURE_OFFSET)
    }

    // ---- camera profile tables ----

    pub fn hue_sat_map_dims(&self) -> Result<Option<[usize; 3]>> {
        Ok(self
            .exact_u32(tag::PROFILE_HUE_SAT_MAP_DIMS, 3)?
            .map(|v| [v[0] as usize, v[1] as usize, v[2] as usize]))
    }

    pub fn hue_sat_map_data_1(&self) -> Option<Vec<f32>> {
        self.f32_values(tag::PROFILE_HUE_SAT_MAP_DATA_1)
    }

    pub fn hue_sat_map_data_2(&self) -> Option<Vec<f32>> {
        self.f32_values(tag::PROFILE_HUE_SAT_MAP_DATA_2)
    }

    pub fn look_table_dims(&self) -> Result<Option<[usize; 3]>> {
        Ok(self
            .exact_u32(tag::PROFILE_LOOK_TABLE_DIMS, 3)?
            .map(|v| [v[0] as usize, v[1] as usize, v[2] as usize]))
    }

    pub fn look_table_data(&self) -> Option<Vec<f32>> {
        self.f32_values(tag::PROFILE_LOOK_TABLE_DATA)
    }

    pub fn profile_tone_curve(&self) -> Option<Vec<f32>> {
        self.f32_values(tag::PROFILE_TONE_CURVE)
    }

    /// Raw bytes of OpcodeList1, 2 or 3.
    pub fn opcode_list_bytes(&self, tag_id: u16) -> Option<&[u8]> {
        self.bytes(tag_id)
    }
}

fn read_values(reader: &mut ByteReader<'_>, field_type: FieldType, count: usize) -> Result<TagValue> {
    fn collect<T>(count: usize, mut read: impl FnMut() -> Result<T>) -> Result<Vec<T>> {
        (0..count).map(|_| read()).collect()
    }

    Ok(match field_type {
        FieldType::Byte => TagValue::Byte(reader.read_bytes(count)?.to_vec()),
        FieldType::Undefined => TagValue::Undefined(reader.read_bytes(count)?.to_vec()),
        FieldType::Ascii => TagValue::Ascii(reader.read_ascii(count)?),
        FieldType::Short => TagValue::Short(collect(count, || reader.read_u16())?),
        FieldType::Long => TagValue::Long(collect(count, || reader.read_u32())?),
        FieldType::Rational => TagValue::Rational(collect(count, || reader.read_rational())?),
        FieldType::SByte => TagValue::SByte(collect(count, || reader.read_i8())?),
        FieldType::SShort => TagValue::SShort(collect(count, || reader.read_i16())?),
        FieldType::SLong => TagValue::SLong(collect(count, || reader.read_i32())?),
        FieldType::SRational => TagValue::SRational(collect(count, || reader.read_signed_rational())?),
        FieldType::Float => TagValue::Float(collect(count, || reader.read_f32())?),
        FieldType::Double => TagValue::Double(collect(count, || reader.read_f64())?),
    })
}
