use crate::image_pipeline::common::{DngError, Result};
use crate::image_pipeline::reader::ImageFileDirectory;
use super::PostProcessorOperation;

/// Natural cubic spline through a set of knots.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    knots: Vec<f64>,
    /// `[a, b, c, d]` of `a + b t + c t^2 + d t^3` per segment
    segments: Vec<[f64; 4]>,
}

impl CubicSpline {
    /// Fits a spline with zero curvature at both ends. `xs` must be strictly
    /// increasing.
    pub fn natural(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(DngError::UnsupportedFormat(format!(
                "spline needs at least two (x, y) pairs, got {} x and {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(DngError::UnsupportedFormat("spline knots are not strictly increasing".into()));
        }

        let n = xs.len() - 1;
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let mut mu = vec![0.0; n + 1];
        let mut z = vec![0.0; n + 1];
        for i in 1..n {
            let g = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / g;
            z[i] = (3.0 * (ys[i + 1] * h[i - 1] - ys[i] * (xs[i + 1] - xs[i - 1]) + ys[i - 1] * h[i])
                / (h[i - 1] * h[i])
                - h[i - 1] * z[i - 1])
                / g;
        }

        let mut c = vec![0.0; n + 1];
        let mut segments = vec![[0.0; 4]; n];
        for j in (0..n).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            let b = (ys[j + 1] - ys[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            let d = (c[j + 1] - c[j]) / (3.0 * h[j]);
            segments[j] = [ys[j], b, c[j], d];
        }
        Ok(Self { knots: xs.to_vec(), segments })
    }

    /// Value at `x`, which is clamped onto the knot range.
    pub fn value(&self, x: f64) -> f64 {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        let x = x.clamp(first, last);
        let segment = self.knots[1..].partition_point(|&k| k < x).min(self.segments.len() - 1);
        let t = x - self.knots[segment];
        let [a, b, c, d] = self.segments[segment];
        a + t * (b + t * (c + t * d))
    }
}

/// ProfileToneCurve applied to each channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileToneCurveMapping {
    curve: CubicSpline,
}

impl ProfileToneCurveMapping {
    /// `points` are interleaved `(input, output)` pairs.
    pub fn new(points: &[f32]) -> Result<Self> {
        if points.len() % 2 != 0 {
            return Err(DngError::UnsupportedFormat(format!("tone curve with {} values", points.len())));
        }
        let xs: Vec<f64> = points.iter().step_by(2).map(|&v| v as f64).collect();
        let ys: Vec<f64> = points.iter().skip(1).step_by(2).map(|&v| v as f64).collect();
        Ok(Self { curve: CubicSpline::natural(&xs, &ys)? })
    }

    pub fn from_directory(ifd0: &ImageFileDirectory) -> Result<Option<Self>> {
        ifd0.profile_tone_curve().map(|points| Self::new(&points)).transpose()
    }
}

impl PostProcessorOperation for ProfileToneCurveMapping {
    fn name(&self) -> &'static str {
        "ProfileToneCurveMapping"
    }

    fn process(&self, rgb: [f64; 3]) -> [f64; 3] {
        rgb.map(|v| self.curve.value(v))
    }
}
