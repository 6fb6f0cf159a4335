//! Ratio corrected demosaicing (RCD)
//!
//! Dataflow:
//!
//! ```text
//! samples -> xy gradient ---------------------------------+
//!         -> low pass at R/B -> greens --+                 |
//!         -> pq gradient ----------------+-> R/B at B/R ---+-> R/B at G
//! ```
//!
//! Every stage can be stopped after to inspect its output; see
//! [`SubStep`]. Several planes are only defined at some CFA sites, so all
//! neighbour reads reflect at the border instead of clamping.

use crate::image_pipeline::acceleration::strategy::Dispatch;
use crate::image_pipeline::common::math::translate;
use super::method::SubStep;
use super::mosaic::{fill_plane, fill_rgb, grey_to_rgb, reflect, Mosaic, Plane, Site};

/// Added to every denominator and used as the lower bound of the
/// directional statistics.
const EPS: f32 = 0.1 / (255.0 * 255.0);

/// Quadratic form over nine samples taken along one line, centred on the
/// fifth. Measures how strongly the line deviates from a smooth curve.
#[rustfmt::skip]
#[inline]
fn directional_statistic([m4, m3, m2, m1, c, p1, p2, p3, p4]: [f32; 9]) -> f32 {
    let form =
          1.0 * m4 * m4
        - 6.0 * m4 * m3 + 10.0 * m3 * m3
        - 2.0 * m4 * m2                  + 11.0 * m2 * m2
        + 12.0 * m4 * m1 - 38.0 * m3 * m1 - 12.0 * m2 * m1 + 46.0 * m1 * m1
        - 2.0 * m4 * c  + 18.0 * m3 * c  - 36.0 * m2 * c  - 18.0 * m1 * c  + 38.0 * c * c
        - 6.0 * m4 * p1 + 16.0 * m3 * p1 + 24.0 * m2 * p1 - 70.0 * m1 * p1 - 18.0 * c * p1 + 46.0 * p1 * p1
        + 2.0 * m4 * p2 - 12.0 * m3 * p2 + 14.0 * m2 * p2 + 24.0 * m1 * p2 - 36.0 * c * p2 - 12.0 * p1 * p2 + 11.0 * p2 * p2
                        +  2.0 * m3 * p3 - 12.0 * m2 * p3 + 16.0 * m1 * p3 + 18.0 * c * p3 - 38.0 * p1 * p3 + 10.0 * p3 * p3
                                         +  2.0 * m2 * p4 -  6.0 * m1 * p4 -  2.0 * c * p4 + 12.0 * p1 * p4 - 2.0 * p2 * p4 - 6.0 * p3 * p4 + 1.0 * p4 * p4;
    form.max(EPS)
}

/// Nine samples along the direction `(dx, dy)` through `(x, y)`.
#[inline]
fn line(m: &Mosaic, x: isize, y: isize, dx: isize, dy: isize) -> [f32; 9] {
    std::array::from_fn(|i| {
        let k = i as isize - 4;
        m.reflected(x + k * dx, y + k * dy)
    })
}

/// Share of the vertical statistic: values near 1 mean the vertical
/// direction is rough and interpolation should run horizontally.
pub(super) fn xy_gradient(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_plane(m.width(), m.height(), dispatch, |x, y| {
        let dy = directional_statistic(line(m, x, y, 0, 1));
        let dx = directional_statistic(line(m, x, y, 1, 0));
        dy / (dy + dx)
    })
}

/// 3x3 low pass at red and blue sites, zero at green sites.
fn low_pass(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_plane(m.width(), m.height(), dispatch, |x, y| {
        if m.site(x as usize, y as usize).is_green() {
            return 0.0;
        }
        0.25 * m.reflected(x, y)
            + 0.125 * (m.reflected(x, y - 1) + m.reflected(x, y + 1) + m.reflected(x - 1, y) + m.reflected(x + 1, y))
            + 0.0625 * (m.reflected(x - 1, y - 1) + m.reflected(x + 1, y - 1) + m.reflected(x - 1, y + 1) + m.reflected(x + 1, y + 1))
    })
}

/// Picks between the centre ratio and the mean of its diagonal neighbours,
/// whichever is further from an undecided 0.5.
#[inline]
fn discriminator(ratios: &Plane, x: isize, y: isize) -> f32 {
    let centre = ratios.reflected(x, y);
    let neighbourhood = 0.25
        * (ratios.reflected(x - 1, y - 1) + ratios.reflected(x + 1, y - 1) + ratios.reflected(x - 1, y + 1) + ratios.reflected(x + 1, y + 1));
    if (centre - 0.5).abs() < (neighbourhood - 0.5).abs() { neighbourhood } else { centre }
}

fn greens(m: &Mosaic, xy: &Plane, lpf: &Plane, dispatch: Dispatch) -> Vec<f32> {
    fill_plane(m.width(), m.height(), dispatch, |x, y| {
        let cur = m.reflected(x, y);
        if m.site(x as usize, y as usize).is_green() {
            return cur;
        }
        let vh_disc = discriminator(xy, x, y);

        // grad[d], est[d] for d in north, south, west, east
        let directions: [(isize, isize); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        let lpf_cur = lpf.reflected(x, y);
        let mut grad = [0.0f32; 4];
        let mut est = [0.0f32; 4];
        for (d, &(dx, dy)) in directions.iter().enumerate() {
            let s = |k: isize| m.reflected(x + k * dx, y + k * dy);
            grad[d] = EPS + (s(1) - s(-1)).abs() + (cur - s(2)).abs() + (s(1) - s(3)).abs() + (s(2) - s(4)).abs();
            let lpf_d = lpf.reflected(x + 2 * dx, y + 2 * dy);
            est[d] = s(1) * (1.0 + (lpf_cur - lpf_d) / (EPS + lpf_cur + lpf_d));
        }
        let [n_grad, s_grad, w_grad, e_grad] = grad;
        let [n_est, s_est, w_est, e_est] = est;

        let v_est = (s_grad * n_est + n_grad * s_est) / (n_grad + s_grad);
        let h_est = (w_grad * e_est + e_grad * w_est) / (e_grad + w_grad);
        vh_disc * h_est + (1.0 - vh_disc) * v_est
    })
}

/// Share of the diagonal statistic at red and blue sites, zero at green
/// sites.
pub(super) fn pq_gradient(m: &Mosaic, dispatch: Dispatch) -> Vec<f32> {
    fill_plane(m.width(), m.height(), dispatch, |x, y| {
        if m.site(x as usize, y as usize).is_green() {
            return 0.0;
        }
        let p = directional_statistic(line(m, x, y, 1, 1));
        let q = directional_statistic(line(m, x, y, 1, -1));
        p / (p + q)
    })
}

/// Fills in red at blue sites and blue at red sites. Green sites carry only
/// their green value afterwards.
pub(super) fn red_blue_at_red_blue(m: &Mosaic, greens: &Plane, pq: &Plane, dispatch: Dispatch) -> Vec<f32> {
    fill_rgb(m.width(), m.height(), dispatch, |x, y| {
        let site = m.site(x as usize, y as usize);
        let centre = greens.reflected(x, y);
        if site.is_green() {
            return [0.0, centre, 0.0];
        }
        let pq_disc = discriminator(pq, x, y);

        // order: north-west, north-east, south-west, south-east
        let diagonals: [(isize, isize); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
        let mut grad = [0.0f32; 4];
        let mut est = [0.0f32; 4];
        for (d, &(dx, dy)) in diagonals.iter().enumerate() {
            let near = m.reflected(x + dx, y + dy);
            let opposite = m.reflected(x - dx, y - dy);
            grad[d] = EPS
                + (near - opposite).abs()
                + (near - m.reflected(x + 3 * dx, y + 3 * dy)).abs()
                + (centre - greens.reflected(x + 2 * dx, y + 2 * dy)).abs();
            est[d] = near - greens.reflected(x + dx, y + dy);
        }
        let [nw_grad, ne_grad, sw_grad, se_grad] = grad;
        let [nw_est, ne_est, sw_est, se_est] = est;

        let p_est = (nw_grad * se_est + se_grad * nw_est) / (nw_grad + se_grad);
        let q_est = (ne_grad * sw_est + sw_grad * ne_est) / (ne_grad + sw_grad);
        let interp = centre + (1.0 - pq_disc) * p_est + pq_disc * q_est;
        let cur = m.reflected(x, y);
        if site == Site::Red { [cur, centre, interp] } else { [interp, centre, cur] }
    })
}

/// Fills in red and blue at green sites from the result of
/// [`red_blue_at_red_blue`].
pub(super) fn red_blue_at_green(m: &Mosaic, xy: &Plane, rgb: &[f32], dispatch: Dispatch) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    let channel = |c: usize, x: isize, y: isize| {
        let (x, y) = (reflect(x, width), reflect(y, height));
        rgb[(translate(y, height) * width + translate(x, width)) * 3 + c]
    };
    fill_rgb(width, height, dispatch, |x, y| {
        let g = channel(1, x, y);
        if !m.site(x as usize, y as usize).is_green() {
            return [channel(0, x, y), g, channel(2, x, y)];
        }
        let vh_disc = discriminator(xy, x, y);

        // estimate for channel c along (dx, dy) as (grad toward +d, est at +d)
        let towards = |c: usize, dx: isize, dy: isize| {
            let near = channel(c, x + dx, y + dy);
            let grad = EPS
                + (g - channel(1, x + 2 * dx, y + 2 * dy)).abs()
                + (near - channel(c, x - dx, y - dy)).abs()
                + (near - channel(c, x + 3 * dx, y + 3 * dy)).abs();
            (grad, near - channel(1, x + dx, y + dy))
        };
        let interpolate = |c: usize| {
            let (n_grad, n_est) = towards(c, 0, -1);
            let (s_grad, s_est) = towards(c, 0, 1);
            let (w_grad, w_est) = towards(c, -1, 0);
            let (e_grad, e_est) = towards(c, 1, 0);
            let v_est = (n_grad * s_est + s_grad * n_est) / (n_grad + s_grad);
            let h_est = (e_grad * w_est + w_grad * e_est) / (e_grad + w_grad);
            g + (1.0 - vh_disc) * v_est + vh_disc * h_est
        };
        [interpolate(0), g, interpolate(2)]
    })
}

/// At green sites, the mean of the axial neighbours; elsewhere the value.
/// Used to view planes that are only defined at red and blue sites.
fn red_blue_view(m: &Mosaic, plane: &Plane, scale: f32) -> Vec<f32> {
    let values = fill_plane(m.width(), m.height(), Dispatch::Sequential, |x, y| {
        let v = if m.site(x as usize, y as usize).is_green() {
            0.25 * (plane.reflected(x, y - 1) + plane.reflected(x + 1, y) + plane.reflected(x, y + 1) + plane.reflected(x - 1, y))
        } else {
            plane.reflected(x, y)
        };
        v * scale
    });
    grey_to_rgb(&values)
}

/// Runs RCD up to and including `stop`.
///
/// Single planes are replicated to all three channels; ratio planes are
/// scaled to the mosaic's full scale.
pub fn interpolate(m: &Mosaic, dispatch: Dispatch, stop: SubStep) -> Vec<f32> {
    let (width, height) = (m.width(), m.height());
    if stop == SubStep::RawData {
        return grey_to_rgb(&fill_plane(width, height, dispatch, |x, y| m.reflected(x, y)));
    }

    let xy = xy_gradient(m, dispatch);
    let xy = Plane::new(&xy, width, height);
    if stop == SubStep::XyGradient {
        return grey_to_rgb(&fill_plane(width, height, dispatch, |x, y| xy.reflected(x, y) * m.full_scale));
    }

    let lpf = low_pass(m, dispatch);
    let lpf = Plane::new(&lpf, width, height);
    if stop == SubStep::LowPass {
        return red_blue_view(m, &lpf, 1.0);
    }

    let greens = greens(m, &xy, &lpf, dispatch);
    if stop == SubStep::Greens {
        return grey_to_rgb(&greens);
    }
    let greens = Plane::new(&greens, width, height);

    let pq = pq_gradient(m, dispatch);
    let pq = Plane::new(&pq, width, height);
    if stop == SubStep::PqGradient {
        return red_blue_view(m, &pq, m.full_scale);
    }

    let rgb = red_blue_at_red_blue(m, &greens, &pq, dispatch);
    if stop == SubStep::RbAtBr {
        return rgb;
    }
    red_blue_at_green(m, &xy, &rgb, dispatch)
}
