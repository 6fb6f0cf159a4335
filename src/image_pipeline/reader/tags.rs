//! Tag ids and decoded tag values

use super::field_type::FieldType;
use super::rational::{Rational, SignedRational};

/// TIFF, EXIF and DNG tag ids understood by the decoder.
pub mod tag {
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const MAKE: u16 = 271;
    pub const MODEL: u16 = 272;
    pub const STRIP_OFFSETS: u16 = 273;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const ROWS_PER_STRIP: u16 = 278;
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    pub const PLANAR_CONFIGURATION: u16 = 284;
    pub const SOFTWARE: u16 = 305;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SUB_IFDS: u16 = 330;
    pub const CFA_REPEAT_PATTERN_DIM: u16 = 33421;
    pub const CFA_PATTERN: u16 = 33422;
    pub const EXPOSURE_TIME: u16 = 33434;
    pub const EXIF_IFD: u16 = 34665;
    pub const DNG_VERSION: u16 = 50706;
    pub const UNIQUE_CAMERA_MODEL: u16 = 50708;
    pub const LINEARIZATION_TABLE: u16 = 50712;
    pub const BLACK_LEVEL_REPEAT_DIM: u16 = 50713;
    pub const BLACK_LEVEL: u16 = 50714;
    pub const BLACK_LEVEL_DELTA_H: u16 = 50715;
    pub const BLACK_LEVEL_DELTA_V: u16 = 50716;
    pub const WHITE_LEVEL: u16 = 50717;
    pub const DEFAULT_CROP_ORIGIN: u16 = 50719;
    pub const DEFAULT_CROP_SIZE: u16 = 50720;
    pub const COLOR_MATRIX_1: u16 = 50721;
    pub const COLOR_MATRIX_2: u16 = 50722;
    pub const CAMERA_CALIBRATION_1: u16 = 50723;
    pub const CAMERA_CALIBRATION_2: u16 = 50724;
    pub const REDUCTION_MATRIX_1: u16 = 50725;
    pub const REDUCTION_MATRIX_2: u16 = 50726;
    pub const ANALOG_BALANCE: u16 = 50727;
    pub const AS_SHOT_NEUTRAL: u16 = 50728;
    pub const AS_SHOT_WHITE_XY: u16 = 50729;
    pub const BASELINE_EXPOSURE: u16 = 50730;
    pub const CALIBRATION_ILLUMINANT_1: u16 = 50778;
    pub const CALIBRATION_ILLUMINANT_2: u16 = 50779;
    pub const ACTIVE_AREA: u16 = 50829;
    pub const CAMERA_CALIBRATION_SIGNATURE: u16 = 50931;
    pub const PROFILE_CALIBRATION_SIGNATURE: u16 = 50932;
    pub const PROFILE_HUE_SAT_MAP_DIMS: u16 = 50937;
    pub const PROFILE_HUE_SAT_MAP_DATA_1: u16 = 50938;
    pub const PROFILE_HUE_SAT_MAP_DATA_2: u16 = 50939;
    pub const PROFILE_TONE_CURVE: u16 = 50940;
    pub const FORWARD_MATRIX_1: u16 = 50964;
    pub const FORWARD_MATRIX_2: u16 = 50965;
    pub const PROFILE_LOOK_TABLE_DIMS: u16 = 50981;
    pub const PROFILE_LOOK_TABLE_DATA: u16 = 50982;
    pub const OPCODE_LIST_1: u16 = 51008;
    pub const OPCODE_LIST_2: u16 = 51009;
    pub const OPCODE_LIST_3: u16 = 51022;
    pub const BASELINE_EXPOSURE_OFFSET: u16 = 51109;
}

pub const COMPRESSION_UNCOMPRESSED: u16 = 1;
pub const COMPRESSION_LOSSLESS_JPEG: u16 = 7;

pub const PHOTOMETRIC_RGB: u16 = 2;
pub const PHOTOMETRIC_CFA: u16 = 32803;
pub const PHOTOMETRIC_LINEAR_RAW: u16 = 34892;

pub const PLANAR_CONFIGURATION_CHUNKY: u16 = 1;

pub const NEW_SUBFILE_TYPE_HIGH_RESOLUTION: u32 = 0;

/// Decoded values of one directory entry, one variant per field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SignedRational>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    pub fn len(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => v.len(),
            TagValue::Ascii(s) => s.len(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer view of BYTE, SHORT, LONG and their signed variants.
    pub fn as_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => Some(v.iter().map(|&x| x as u32).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&x| x as u32).collect()),
            TagValue::Long(v) => Some(v.clone()),
            TagValue::SByte(v) => Some(v.iter().map(|&x| x as u32).collect()),
            TagValue::SShort(v) => Some(v.iter().map(|&x| x as u32).collect()),
            TagValue::SLong(v) => Some(v.iter().map(|&x| x as u32).collect()),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_u32_vec().and_then(|v| v.first().copied())
    }

    /// Numeric view of every non-ASCII type; rationals are divided.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Rational(v) => Some(v.iter().map(Rational::value).collect()),
            TagValue::SRational(v) => Some(v.iter().map(SignedRational::value).collect()),
            TagValue::Float(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::Double(v) => Some(v.clone()),
            TagValue::SByte(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::SShort(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::SLong(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::Ascii(_) => None,
            other => other.as_u32_vec().map(|v| v.into_iter().map(|x| x as f64).collect()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_f64_vec().and_then(|v| v.first().copied())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Raw bytes of BYTE and UNDEFINED entries (opcode lists, CFA patterns).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => Some(v),
            _ => None,
        }
    }
}

/// One parsed directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    pub value: TagValue,
}
