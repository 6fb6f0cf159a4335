use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_rgb, Mosaic, Site};

/// Places each sample in its own channel and leaves the others at zero.
pub fn none(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        match m.site(x as usize, y as usize) {
            Site::Red => [c, 0.0, 0.0],
            Site::GreenRed | Site::GreenBlue => [0.0, c, 0.0],
            Site::Blue => [0.0, 0.0, c],
        }
    })
}

/// Copies the missing colours from the right, lower and lower-right
/// neighbours. On the last column or row the left or upper neighbour is
/// used instead, which carries the same colour.
pub fn nearest_neighbor(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    let (width, height) = (m.width() as isize, m.height() as isize);
    let next = |c: isize, len: isize| if c + 1 < len { c + 1 } else { c - 1 };
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let c = m.at(x, y);
        let (nx, ny) = (next(x, width), next(y, height));
        let right = m.at(nx, y);
        let below = m.at(x, ny);
        let diagonal = m.at(nx, ny);
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [right, c, below],
            Site::GreenBlue => [below, c, right],
            Site::Red => [c, right, diagonal],
            Site::Blue => [diagonal, right, c],
        }
    })
}
