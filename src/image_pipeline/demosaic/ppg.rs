//! Patterned pixel grouping
//!
//! Greens are estimated along the smoothest of the four axial directions,
//! then red and blue follow the local hue through [`hue_transit`].

use crate::image_pipeline::acceleration::strategy::Dispatch;
use super::mosaic::{fill_plane, fill_rgb, Mosaic, Plane, Site};

fn green_at(m: &Mosaic, x: isize, y: isize) -> f32 {
    let c = m.at(x, y);
    let (n1, n2) = (m.at(x, y - 1), m.at(x, y - 2));
    let (s1, s2) = (m.at(x, y + 1), m.at(x, y + 2));
    let (w1, w2) = (m.at(x - 1, y), m.at(x - 2, y));
    let (e1, e2) = (m.at(x + 1, y), m.at(x + 2, y));

    // checked in this order, ties keep the earlier direction
    let candidates = [
        (2.0 * (c - n2).abs() + (s1 - n1).abs(), (s1 + c + 3.0 * n1 - n2) / 4.0),
        (2.0 * (c - e2).abs() + (w1 - e1).abs(), (w1 + c + 3.0 * e1 - e2) / 4.0),
        (2.0 * (c - w2).abs() + (e1 - w1).abs(), (e1 + c + 3.0 * w1 - w2) / 4.0),
        (2.0 * (c - s2).abs() + (n1 - s1).abs(), (n1 + c + 3.0 * s1 - s2) / 4.0),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.0 < best.0 {
            best = *candidate;
        }
    }
    best.1
}

/// Interpolates `v1..v3` at the position of `l2` on the luminance ramp
/// `l1..l3`, or falls back to a corrected average when the ramp is not
/// monotone.
#[inline]
fn hue_transit(l1: f32, l2: f32, l3: f32, v1: f32, v3: f32) -> f32 {
    if (l1 < l2 && l2 < l3) || (l1 > l2 && l2 > l3) {
        v1 + (v3 - v1) * (l2 - l1) / (l3 - l1)
    } else {
        (v1 + v3) / 2.0 + (2.0 * l2 - l1 - l3) / 4.0
    }
}

pub fn interpolate(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let greens = fill_plane(width, height, dispatch, |x, y| {
        if m.site(x as usize, y as usize).is_green() { m.at(x, y) } else { green_at(m, x, y) }
    });
    let g = Plane::new(&greens, width, height);

    fill_rgb(width, height, dispatch, |x, y| {
        let c = m.at(x, y);
        let horizontal = || hue_transit(g.at(x - 1, y), c, g.at(x + 1, y), m.at(x - 1, y), m.at(x + 1, y));
        let vertical = || hue_transit(g.at(x, y - 1), c, g.at(x, y + 1), m.at(x, y - 1), m.at(x, y + 1));
        match m.site(x as usize, y as usize) {
            Site::GreenRed => [horizontal(), c, vertical()],
            Site::GreenBlue => [vertical(), c, horizontal()],
            site => {
                let cg = g.at(x, y);
                let nw_grad = (m.at(x - 1, y - 1) - m.at(x + 1, y + 1)).abs()
                    + (m.at(x - 2, y - 2) - c).abs()
                    + (c - m.at(x + 2, y + 2)).abs()
                    + (g.at(x - 1, y - 1) - cg).abs()
                    + (cg - g.at(x + 1, y + 1)).abs();
                let ne_grad = (m.at(x + 1, y - 1) - m.at(x - 1, y + 1)).abs()
                    + (m.at(x + 2, y - 2) - c).abs()
                    + (c - m.at(x - 2, y + 2)).abs()
                    + (g.at(x + 1, y - 1) - cg).abs()
                    + (cg - g.at(x - 1, y + 1)).abs();
                let opposite = if nw_grad < ne_grad {
                    hue_transit(g.at(x - 1, y - 1), cg, g.at(x + 1, y + 1), m.at(x - 1, y - 1), m.at(x + 1, y + 1))
                } else {
                    hue_transit(g.at(x + 1, y - 1), cg, g.at(x - 1, y + 1), m.at(x + 1, y - 1), m.at(x - 1, y + 1))
                };
                if site == Site::Red { [c, cg, opposite] } else { [opposite, cg, c] }
            }
        }
    })
}
