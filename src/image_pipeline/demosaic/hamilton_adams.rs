use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_plane, fill_rgb, Mosaic, Plane, Site};

/// Variation difference below which both directions are blended, as a
/// fraction of full scale.
const DIRECTION_THRESHOLD: f32 = 2.0 / 255.0;

/// Green at red and blue sites along the direction of lower variation,
/// with a second-order correction from the centre colour.
fn green_at(m: &Mosaic, x: isize, y: isize) -> f32 {
    let c = m.at(x, y);
    let (n1, n2) = (m.at(x, y - 1), m.at(x, y - 2));
    let (s1, s2) = (m.at(x, y + 1), m.at(x, y + 2));
    let (w1, w2) = (m.at(x - 1, y), m.at(x - 2, y));
    let (e1, e2) = (m.at(x + 1, y), m.at(x + 2, y));

    let variation_h = (w2 - 2.0 * c + e2).abs() + (w1 - e1).abs();
    let variation_v = (n2 - 2.0 * c + s2).abs() + (n1 - s1).abs();

    if (variation_h - variation_v).abs() < DIRECTION_THRESHOLD * m.full_scale {
        (4.0 * c + 2.0 * (n1 + s1 + w1 + e1) - n2 - s2 - w2 - e2) / 8.0
    } else if variation_h < variation_v {
        (2.0 * (w1 + c + e1) - w2 - e2) / 4.0
    } else {
        (2.0 * (n1 + c + s1) - n2 - s2) / 4.0
    }
}

pub fn interpolate(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let greens = fill_plane(width, height, dispatch, |x, y| {
        if m.site(x as usize, y as usize).is_green() { m.at(x, y) } else { green_at(m, x, y) }
    });
    let greens = Plane::new(&greens, width, height);
    let diff = |x: isize, y: isize| m.at(x, y) - greens.at(x, y);

    fill_rgb(width, height, dispatch, |x, y| {
        let c = m.at(x, y);
        let g = greens.at(x, y);
        let row = (diff(x - 1, y) + diff(x + 1, y)) / 2.0;
        let column = (diff(x, y - 1) + diff(x, y + 1)) / 2.0;
        let diagonal = (diff(x - 1, y - 1) + diff(x - 1, y + 1) + diff(x + 1, y - 1) + diff(x + 1, y + 1)) / 4.0;
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [c + row, g, c + column],
            Site::GreenBlue => [c + column, g, c + row],
            Site::Red => [c, g, g + diagonal],
            Site::Blue => [g + diagonal, g, c],
        }
    })
}
