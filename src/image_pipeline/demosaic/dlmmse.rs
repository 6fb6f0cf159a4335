//! Directional linear minimum mean square-error estimation (DLMMSE)
//!
//! Greens come from fusing a horizontal and a vertical LMMSE estimate of
//! the green/colour difference. Red and blue are then filled in from the
//! colour differences, either bilinearly or, for the hybrid variant, with
//! the last two RCD stages.

use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_plane, fill_rgb, Mosaic, Plane, Site};
use super::rcd;

/// How the directional mean is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeanEstimate {
    /// The smoothed difference at the centre sample
    Code,
    /// The mean of the smoothed differences over the window
    Paper,
}

/// Half width of the window the LMMSE statistics are taken over.
const WINDOW: isize = 4;
const DIV_EPSILON: f32 = 0.1 / (255.0 * 255.0);
const INTERPOLATION_TAPS: [f32; 5] = [-0.25, 0.5, 0.5, 0.5, -0.25];
/// Approximately gaussian.
const SMOOTHING_TAPS: [f32; 9] =
    [0.03125, 0.0703125, 0.1171875, 0.1796875, 0.203125, 0.1796875, 0.1171875, 0.0703125, 0.03125];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    #[inline]
    fn offset(self, x: isize, y: isize, k: isize) -> (isize, isize) {
        match self {
            Axis::Horizontal => (x + k, y),
            Axis::Vertical => (x, y + k),
        }
    }
}

/// One-dimensional convolution with clamped borders.
fn convolve(plane: &Plane, width: usize, height: usize, taps: &[f32], axis: Axis, dispatch: Dispatch) -> Vec<f32> {
    let half = (taps.len() / 2) as isize;
    fill_plane(width, height, dispatch, |x, y| {
        taps.iter()
            .enumerate()
            .map(|(i, w)| {
                let (sx, sy) = axis.offset(x, y, i as isize - half);
                w * plane.at(sx, sy)
            })
            .sum()
    })
}

/// LMMSE estimate of the difference signal along one axis together with its
/// estimated variance.
fn directional_estimate(
    smoothed: &Plane,
    noisy: &Plane,
    x: isize,
    y: isize,
    axis: Axis,
    mean: MeanEstimate,
) -> (f32, f32) {
    let n = (2 * WINDOW + 1) as f32;
    let (mut mom1, mut p, mut r) = (0.0f32, 0.0f32, 0.0f32);
    for k in -WINDOW..=WINDOW {
        let (sx, sy) = axis.offset(x, y, k);
        let t = smoothed.at(sx, sy);
        mom1 += t;
        p += t * t;
        let residual = t - noisy.at(sx, sy);
        r += residual * residual;
    }
    let m = match mean {
        MeanEstimate::Paper => mom1 / n,
        MeanEstimate::Code => smoothed.at(x, y),
    };
    let two_w = (2 * WINDOW) as f32;
    let p = p / two_w - mom1 * mom1 / (two_w * n);
    let r = r / n + DIV_EPSILON;
    let gain = p / (p + r);
    let estimate = m + gain * (noisy.at(x, y) - m);
    let variance = p - gain * p + DIV_EPSILON;
    (estimate, variance)
}

/// Full green plane.
pub(super) fn greens(m: &Mosaic, dispatch: Dispatch, mean: MeanEstimate) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let samples = m.plane;

    let difference = |axis: Axis| {
        let filtered = convolve(&samples, width, height, &INTERPOLATION_TAPS, axis, dispatch);
        let filtered = Plane::new(&filtered, width, height);
        fill_plane(width, height, dispatch, |x, y| {
            let (s, f) = (m.at(x, y), filtered.at(x, y));
            if m.site(x as usize, y as usize).is_green() { s - f } else { f - s }
        })
    };
    let diff_h = difference(Axis::Horizontal);
    let diff_v = difference(Axis::Vertical);
    let diff_h = Plane::new(&diff_h, width, height);
    let diff_v = Plane::new(&diff_v, width, height);

    let smooth_h = convolve(&diff_h, width, height, &SMOOTHING_TAPS, Axis::Horizontal, dispatch);
    let smooth_v = convolve(&diff_v, width, height, &SMOOTHING_TAPS, Axis::Vertical, dispatch);
    let smooth_h = Plane::new(&smooth_h, width, height);
    let smooth_v = Plane::new(&smooth_v, width, height);

    fill_plane(width, height, dispatch, |x, y| {
        let sample = m.at(x, y);
        if m.site(x as usize, y as usize).is_green() {
            return sample;
        }
        let (h, h_var) = directional_estimate(&smooth_h, &diff_h, x, y, Axis::Horizontal, mean);
        let (v, v_var) = directional_estimate(&smooth_v, &diff_v, x, y, Axis::Vertical, mean);
        sample + (v_var * h + h_var * v) / (h_var + v_var)
    })
}

/// DLMMSE with bilinear interpolation of the colour differences.
pub fn interpolate(m: &Mosaic, dispatch: Dispatch, mean: MeanEstimate) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let greens = greens(m, dispatch, mean);
    let g = Plane::new(&greens, width, height);

    // green minus red at red sites, green minus blue at blue sites
    let known = |site: Site| {
        fill_plane(width, height, dispatch, |x, y| {
            if m.site(x as usize, y as usize) == site { g.at(x, y) - m.at(x, y) } else { 0.0 }
        })
    };
    let known_gr = known(Site::Red);
    let known_gb = known(Site::Blue);
    let known_gr = Plane::new(&known_gr, width, height);
    let known_gb = Plane::new(&known_gb, width, height);

    // extend each difference to the opposite colour's sites
    let extend = |own: &Plane, own_site: Site| {
        fill_plane(width, height, dispatch, |x, y| match m.site(x as usize, y as usize) {
            site if site == own_site => own.at(x, y),
            Site::Red | Site::Blue => diagonal_mean(own, x, y),
            _ => 0.0,
        })
    };
    let diff_gr = extend(&known_gr, Site::Red);
    let diff_gb = extend(&known_gb, Site::Blue);
    let diff_gr = Plane::new(&diff_gr, width, height);
    let diff_gb = Plane::new(&diff_gb, width, height);

    fill_rgb(width, height, dispatch, |x, y| {
        let green = g.at(x, y);
        let (gr, gb) = if m.site(x as usize, y as usize).is_green() {
            (axial_mean(&diff_gr, x, y), axial_mean(&diff_gb, x, y))
        } else {
            (diff_gr.at(x, y), diff_gb.at(x, y))
        };
        [green - gr, green, green - gb]
    })
}

// Borders are reflected so that every neighbour has the expected colour.
#[inline]
fn diagonal_mean(p: &Plane, x: isize, y: isize) -> f32 {
    0.25 * (p.reflected(x - 1, y - 1) + p.reflected(x + 1, y - 1) + p.reflected(x - 1, y + 1) + p.reflected(x + 1, y + 1))
}

#[inline]
fn axial_mean(p: &Plane, x: isize, y: isize) -> f32 {
    0.25 * (p.reflected(x, y - 1) + p.reflected(x + 1, y) + p.reflected(x, y + 1) + p.reflected(x - 1, y))
}

/// DLMMSE greens followed by the RCD red/blue stages.
pub fn interpolate_with_rcd(m: &Mosaic, dispatch: Dispatch, mean: MeanEstimate) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let greens = greens(m, dispatch, mean);
    let greens = Plane::new(&greens, width, height);
    let xy = rcd::xy_gradient(m, dispatch);
    let xy = Plane::new(&xy, width, height);
    let pq = rcd::pq_gradient(m, dispatch);
    let pq = Plane::new(&pq, width, height);
    let rgb = rcd::red_blue_at_red_blue(m, &greens, &pq, dispatch);
    rcd::red_blue_at_green(m, &xy, &rgb, dispatch)
}
