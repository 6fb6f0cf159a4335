//! Gradient-corrected linear interpolation (Malvar, He and Cutler)
//!
//! Each missing value is a fixed 5x5 linear filter over the mosaic. The
//! kernels are stored as `(dx, dy, weight)` taps.

use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_rgb, Mosaic, Site};

type Tap = (isize, isize, f32);

/// Green at red and blue sites, divided by 8.
const GREEN: [Tap; 9] = [
    (0, -2, -1.0),
    (0, -1, 2.0),
    (-2, 0, -1.0),
    (-1, 0, 2.0),
    (0, 0, 4.0),
    (1, 0, 2.0),
    (2, 0, -1.0),
    (0, 1, 2.0),
    (0, 2, -1.0),
];

/// Colour of the current row at a green site, divided by 16.
const ROW_COLOUR: [Tap; 11] = [
    (0, -2, 1.0),
    (-1, -1, -2.0),
    (1, -1, -2.0),
    (-2, 0, -2.0),
    (-1, 0, 8.0),
    (0, 0, 10.0),
    (1, 0, 8.0),
    (2, 0, -2.0),
    (-1, 1, -2.0),
    (1, 1, -2.0),
    (0, 2, 1.0),
];

/// Colour of the current column at a green site, divided by 16.
const COLUMN_COLOUR: [Tap; 11] = [
    (0, -2, -2.0),
    (-1, -1, -2.0),
    (0, -1, 8.0),
    (1, -1, -2.0),
    (-2, 0, 1.0),
    (0, 0, 10.0),
    (2, 0, 1.0),
    (-1, 1, -2.0),
    (0, 1, 8.0),
    (1, 1, -2.0),
    (0, 2, -2.0),
];

/// Red at blue sites and blue at red sites, divided by 16.
const OPPOSITE: [Tap; 9] = [
    (0, -2, -3.0),
    (-1, -1, 4.0),
    (1, -1, 4.0),
    (-2, 0, -3.0),
    (0, 0, 12.0),
    (2, 0, -3.0),
    (-1, 1, 4.0),
    (1, 1, 4.0),
    (0, 2, -3.0),
];

#[inline]
fn apply(m: &Mosaic, x: isize, y: isize, taps: &[Tap], divisor: f32) -> f32 {
    taps.iter().map(|&(dx, dy, w)| w * m.at(x + dx, y + dy)).sum::<f32>() / divisor
}

pub fn interpolate(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [apply(m, x, y, &ROW_COLOUR, 16.0), c, apply(m, x, y, &COLUMN_COLOUR, 16.0)],
            Site::GreenBlue => [apply(m, x, y, &COLUMN_COLOUR, 16.0), c, apply(m, x, y, &ROW_COLOUR, 16.0)],
            Site::Red => [c, apply(m, x, y, &GREEN, 8.0), apply(m, x, y, &OPPOSITE, 16.0)],
            Site::Blue => [apply(m, x, y, &OPPOSITE, 16.0), apply(m, x, y, &GREEN, 8.0), c],
        }
    })
}
