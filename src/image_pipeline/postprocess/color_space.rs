use tracing::debug;

use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::reader::{tag, ImageFileDirectory};
use super::color::{
    chromatic_adaptation, correlated_color_temperature, diagonal, inverse, lerp, mul, mul_vec, normalize_rows,
    xy_to_xyz, xyz_to_xy, Matrix3, IDENTITY, XYZ_D50,
};
use super::illuminant::{CalibrationIlluminant, ColorContext};
use super::PostProcessorOperation;

const MAX_WHITE_ITERATIONS: usize = 128;
const WHITE_TOLERANCE: f64 = 1e-7;

/// Camera profile matrices of the two calibration illuminants.
#[derive(Debug, Clone, PartialEq)]
struct Profile {
    color_matrix: (Option<Matrix3>, Option<Matrix3>),
    camera_calibration: (Option<Matrix3>, Option<Matrix3>),
    forward_matrix: (Option<Matrix3>, Option<Matrix3>),
    analog_balance: Matrix3,
    illuminants: (Option<CalibrationIlluminant>, Option<CalibrationIlluminant>),
}

fn blend(pair: (Option<Matrix3>, Option<Matrix3>), weight: f64) -> Option<Matrix3> {
    match pair {
        (Some(a), Some(b)) => Some(lerp(&a, &b, weight)),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

fn invert(m: &Matrix3, what: &str) -> Result<Matrix3> {
    inverse(m).ok_or_else(|| DngError::UnsupportedFormat(format!("{what} is singular")))
}

impl Profile {
    fn context(&self, xy: (f64, f64)) -> ColorContext {
        ColorContext::new(correlated_color_temperature(xy), self.illuminants.0, self.illuminants.1)
    }

    fn camera_calibration(&self, weight: f64) -> Matrix3 {
        blend(self.camera_calibration, weight).unwrap_or(IDENTITY)
    }

    /// `AB * CC * CM` for the given blend weight.
    fn xyz_to_camera(&self, weight: f64) -> Result<Matrix3> {
        let color_matrix = blend(self.color_matrix, weight).ok_or(DngError::MissingTag(tag::COLOR_MATRIX_1))?;
        Ok(mul(&mul(&self.analog_balance, &self.camera_calibration(weight)), &color_matrix))
    }

    /// Finds the white chromaticity whose XYZ maps onto `neutral`.
    fn neutral_to_xy(&self, neutral: [f64; 3]) -> Result<(f64, f64)> {
        let mut xy = xyz_to_xy(XYZ_D50);
        for iteration in 0..MAX_WHITE_ITERATIONS {
            let xyz_to_camera = self.xyz_to_camera(self.context(xy).weight())?;
            let next = xyz_to_xy(mul_vec(&invert(&xyz_to_camera, "XYZ to camera matrix")?, neutral));
            let converged = (next.0 - xy.0).abs() < WHITE_TOLERANCE && (next.1 - xy.1).abs() < WHITE_TOLERANCE;
            xy = next;
            if converged {
                debug!(iteration, x = xy.0, y = xy.1, "White point converged");
                break;
            }
        }
        Ok(xy)
    }

    fn camera_to_xyz_d50(&self, neutral: [f64; 3], weight: f64) -> Result<Matrix3> {
        match blend(self.forward_matrix, weight) {
            Some(forward) => {
                let to_reference = invert(&mul(&self.analog_balance, &self.camera_calibration(weight)), "AB * CC")?;
                let reference_neutral = mul_vec(&to_reference, neutral);
                let white = invert(&diagonal(reference_neutral), "reference neutral")?;
                Ok(mul(&mul(&forward, &white), &to_reference))
            }
            None => {
                let camera_to_xyz = invert(&self.xyz_to_camera(weight)?, "XYZ to camera matrix")?;
                let white = mul_vec(&camera_to_xyz, neutral);
                let adaptation = chromatic_adaptation(white, XYZ_D50)
                    .ok_or_else(|| DngError::UnsupportedFormat("camera white has no cone response".into()))?;
                Ok(mul(&adaptation, &camera_to_xyz))
            }
        }
    }
}

/// Camera RGB to XYZ(D50) through the DNG camera profile.
///
/// The resulting matrix maps white-balanced camera white `[1, 1, 1]` onto
/// `[1, 1, 1]`, matching the row-normalised XYZ to sRGB matrix at the end
/// of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSpaceTransformation {
    matrix: Matrix3,
    context: ColorContext,
}

impl ColorSpaceTransformation {
    pub fn new(matrix: Matrix3, context: ColorContext) -> Self {
        Self { matrix, context }
    }

    pub fn from_directory(ifd0: &ImageFileDirectory) -> Result<Self> {
        let illuminants = (
            ifd0.calibration_illuminant_1().map(CalibrationIlluminant::from_id).transpose()?,
            ifd0.calibration_illuminant_2().map(CalibrationIlluminant::from_id).transpose()?,
        );
        let color_matrix = (ifd0.color_matrix_1()?, ifd0.color_matrix_2()?);
        if color_matrix == (None, None) {
            return Err(DngError::MissingTag(tag::COLOR_MATRIX_1));
        }
        // camera calibration only applies to the profile it was measured for
        let signatures_match = matches!(
            (ifd0.camera_calibration_signature(), ifd0.profile_calibration_signature()),
            (Some(camera), Some(profile)) if camera == profile
        );
        let camera_calibration = if signatures_match {
            (ifd0.camera_calibration_1()?, ifd0.camera_calibration_2()?)
        } else {
            (None, None)
        };
        // only defined for cameras with more than three colour planes
        if ifd0.reduction_matrix_1()?.is_some() || ifd0.reduction_matrix_2()?.is_some() {
            debug!("ReductionMatrix ignored for a three-colour CFA");
        }
        let profile = Profile {
            color_matrix,
            camera_calibration,
            forward_matrix: (ifd0.forward_matrix_1()?, ifd0.forward_matrix_2()?),
            analog_balance: diagonal(ifd0.analog_balance()?.unwrap_or([1.0; 3])),
            illuminants,
        };

        let (neutral, xy) = match ifd0.as_shot_white_xy()? {
            Some(xy) => {
                let xyz_to_camera = profile.xyz_to_camera(profile.context(xy).weight())?;
                (mul_vec(&xyz_to_camera, xy_to_xyz(xy)), xy)
            }
            None => {
                let neutral = ifd0.as_shot_neutral()?.unwrap_or([1.0; 3]);
                (neutral, profile.neutral_to_xy(neutral)?)
            }
        };

        let context = profile.context(xy);
        let camera_to_xyz = profile.camera_to_xyz_d50(neutral, context.weight())?;
        let xyz_to_camera = normalize_rows(invert(&camera_to_xyz, "camera to XYZ(D50) matrix")?);
        let matrix = invert(&xyz_to_camera, "normalised XYZ(D50) to camera matrix")?;
        debug!(
            cct = context.cct,
            weight = context.weight(),
            forward = profile.forward_matrix != (None, None),
            ?matrix,
            "Colour space transformation"
        );
        Ok(Self { matrix, context })
    }

    pub fn matrix(&self) -> &Matrix3 {
        &self.matrix
    }

    /// Scene white temperature and illuminants, for later stages.
    pub fn context(&self) -> ColorContext {
        self.context
    }
}

impl PostProcessorOperation for ColorSpaceTransformation {
    fn name(&self) -> &'static str {
        "ColorSpaceTransformation"
    }

    fn process(&self, rgb: [f64; 3]) -> [f64; 3] {
        mul_vec(&self.matrix, rgb)
    }
}
