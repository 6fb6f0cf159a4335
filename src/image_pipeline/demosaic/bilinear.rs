use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_rgb, Mosaic, Site};

/// Averages of the nearest same-coloured neighbours.
pub fn mean(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        let horizontal = (m.at(x - 1, y) + m.at(x + 1, y)) * 0.5;
        let vertical = (m.at(x, y - 1) + m.at(x, y + 1)) * 0.5;
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [horizontal, c, vertical],
            Site::GreenBlue => [vertical, c, horizontal],
            Site::Red => [c, mean4(axial(m, x, y)), mean4(diagonal(m, x, y))],
            Site::Blue => [mean4(diagonal(m, x, y)), mean4(axial(m, x, y)), c],
        }
    })
}

#[inline]
fn mean4(values: [f32; 4]) -> f32 {
    (values[0] + values[1] + values[2] + values[3]) * 0.25
}

/// Like [`mean`], but the four-neighbour averages at red and blue sites are
/// replaced by medians.
pub fn median(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        let horizontal = (m.at(x - 1, y) + m.at(x + 1, y)) * 0.5;
        let vertical = (m.at(x, y - 1) + m.at(x, y + 1)) * 0.5;
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [horizontal, c, vertical],
            Site::GreenBlue => [vertical, c, horizontal],
            Site::Red => [c, median4(axial(m, x, y)), median4(diagonal(m, x, y))],
            Site::Blue => [median4(diagonal(m, x, y)), median4(axial(m, x, y)), c],
        }
    })
}

#[inline]
fn axial(m: &Mosaic, x: isize, y: isize) -> [f32; 4] {
    [m.at(x, y - 1), m.at(x + 1, y), m.at(x, y + 1), m.at(x - 1, y)]
}

#[inline]
fn diagonal(m: &Mosaic, x: isize, y: isize) -> [f32; 4] {
    [m.at(x - 1, y - 1), m.at(x + 1, y - 1), m.at(x - 1, y + 1), m.at(x + 1, y + 1)]
}

/// Mean of the two middle values.
#[inline]
pub(super) fn median4(mut values: [f32; 4]) -> f32 {
    values.sort_by(f32::total_cmp);
    (values[1] + values[2]) * 0.5
}
