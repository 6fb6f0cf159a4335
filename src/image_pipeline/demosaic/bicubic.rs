use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_rgb, Mosaic, Site};

/// Cubic through four equidistant points, evaluated halfway between the
/// middle two.
#[inline]
fn cubic([v0, v1, n0, n1]: [f32; 4]) -> f32 {
    let p = (n1 - n0) - (v0 - v1);
    let q = (v0 - v1) - p;
    let r = n0 - v0;
    0.125 * p + 0.25 * q + 0.5 * r + v1
}

#[inline]
fn horizontal(m: &Mosaic, x: isize, y: isize) -> f32 {
    cubic([m.at(x - 3, y), m.at(x - 1, y), m.at(x + 1, y), m.at(x + 3, y)])
}

#[inline]
fn vertical(m: &Mosaic, x: isize, y: isize) -> f32 {
    cubic([m.at(x, y - 3), m.at(x, y - 1), m.at(x, y + 1), m.at(x, y + 3)])
}

/// Green at a red or blue site from four anti-diagonal lines of greens.
fn green_at(m: &Mosaic, x: isize, y: isize) -> f32 {
    let line = |points: [(isize, isize); 4]| cubic(points.map(|(dx, dy)| m.at(x + dx, y + dy)));
    cubic([
        line([(-3, 0), (-2, -1), (-1, -2), (0, -3)]),
        line([(1, -2), (0, -1), (-1, 0), (-2, 1)]),
        line([(2, -1), (1, 0), (0, 1), (-1, 2)]),
        line([(3, 0), (2, 1), (1, 2), (0, 3)]),
    ])
}

/// The opposite colour at a red or blue site from the four surrounding
/// diagonal rows.
fn opposite_at(m: &Mosaic, x: isize, y: isize) -> f32 {
    cubic([-3, -1, 1, 3].map(|dy| horizontal(m, x, y + dy)))
}

pub fn interpolate(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [horizontal(m, x, y), c, vertical(m, x, y)],
            Site::GreenBlue => [vertical(m, x, y), c, horizontal(m, x, y)],
            Site::Red => [c, green_at(m, x, y), opposite_at(m, x, y)],
            Site::Blue => [opposite_at(m, x, y), green_at(m, x, y), c],
        }
    })
}
