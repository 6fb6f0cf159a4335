use super::color::{mul_vec, normalize_rows, srgb_encode, Matrix3, XYZ_D50_TO_SRGB};
use super::PostProcessorOperation;

/// XYZ(D50) to gamma-encoded sRGB. Always the last stage.
///
/// The matrix is row-normalised so that XYZ `[1, 1, 1]` stays neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyzD50ToSrgb {
    matrix: Matrix3,
}

impl XyzD50ToSrgb {
    pub fn new() -> Self {
        Self { matrix: normalize_rows(XYZ_D50_TO_SRGB) }
    }

    pub fn matrix(&self) -> &Matrix3 {
        &self.matrix
    }
}

impl Default for XyzD50ToSrgb {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessorOperation for XyzD50ToSrgb {
    fn name(&self) -> &'static str {
        "XYZD50ToSRGBMapping"
    }

    fn process(&self, xyz: [f64; 3]) -> [f64; 3] {
        mul_vec(&self.matrix, xyz).map(|v| srgb_encode(v.clamp(0.0, 1.0)))
    }
}
