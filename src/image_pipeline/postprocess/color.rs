//! Colour maths shared by the post-processing stages
//!
//! Matrices are row-major `[f64; 9]`, vectors are `[f64; 3]`.

pub type Matrix3 = [f64; 9];

pub const IDENTITY: Matrix3 = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Linear sRGB (D50-adapted) to XYZ(D50), Lindbloom.
pub const SRGB_TO_XYZ_D50: Matrix3 = [
    0.4360747, 0.3850649, 0.1430804, //
    0.2225045, 0.7168786, 0.0606169, //
    0.0139322, 0.0971045, 0.7141733,
];

/// XYZ(D50) to linear sRGB, the inverse of [`SRGB_TO_XYZ_D50`].
pub const XYZ_D50_TO_SRGB: Matrix3 = [
    3.1338561, -1.6168667, -0.4906146, //
    -0.9787684, 1.9161415, 0.0334540, //
    0.0719453, -0.2289914, 1.4052427,
];

/// Linear Bradford cone response matrix.
pub const BRADFORD: Matrix3 = [
    0.8951, 0.2664, -0.1614, //
    -0.7502, 1.7135, 0.0367, //
    0.0389, -0.0685, 1.0296,
];

const RIMM_TO_XYZ_D50_RAW: Matrix3 = [
    0.7977, 0.1352, 0.0313, //
    0.2880, 0.7119, 0.0001, //
    0.0000, 0.0000, 0.8249,
];

const XYZ_D50_TO_RIMM_RAW: Matrix3 = [
    1.3460, -0.2556, -0.0511, //
    -0.5446, 1.5082, 0.0205, //
    0.0, 0.0, 1.2123,
];

/// XYZ of the D50 white point.
pub const XYZ_D50: [f64; 3] = [0.9642, 1.0000, 0.8251];

/// Exact inverse of [`xyz_d50_to_rimm`], so that an identity table maps a
/// colour onto itself.
pub fn rimm_to_xyz_d50() -> Matrix3 {
    inverse(&xyz_d50_to_rimm()).unwrap_or_else(|| normalize_rows(RIMM_TO_XYZ_D50_RAW))
}

pub fn xyz_d50_to_rimm() -> Matrix3 {
    normalize_rows(XYZ_D50_TO_RIMM_RAW)
}

#[inline]
pub fn mul_vec(m: &Matrix3, v: [f64; 3]) -> [f64; 3] {
    [
        m[0] * v[0] + m[1] * v[1] + m[2] * v[2],
        m[3] * v[0] + m[4] * v[1] + m[5] * v[2],
        m[6] * v[0] + m[7] * v[1] + m[8] * v[2],
    ]
}

pub fn mul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [0.0; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] = (0..3).map(|k| a[row * 3 + k] * b[k * 3 + col]).sum();
        }
    }
    out
}

pub fn diagonal(d: [f64; 3]) -> Matrix3 {
    [d[0], 0.0, 0.0, 0.0, d[1], 0.0, 0.0, 0.0, d[2]]
}

/// `weight * a + (1 - weight) * b`
pub fn lerp(a: &Matrix3, b: &Matrix3, weight: f64) -> Matrix3 {
    let mut out = [0.0; 9];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = weight * x + (1.0 - weight) * y;
    }
    out
}

/// Inverse by cofactors, `None` for a singular matrix.
pub fn inverse(m: &Matrix3) -> Option<Matrix3> {
    let c00 = m[4] * m[8] - m[5] * m[7];
    let c01 = m[5] * m[6] - m[3] * m[8];
    let c02 = m[3] * m[7] - m[4] * m[6];
    let det = m[0] * c00 + m[1] * c01 + m[2] * c02;
    if det.abs() < 1e-12 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        c00 * inv_det,
        (m[2] * m[7] - m[1] * m[8]) * inv_det,
        (m[1] * m[5] - m[2] * m[4]) * inv_det,
        c01 * inv_det,
        (m[0] * m[8] - m[2] * m[6]) * inv_det,
        (m[2] * m[3] - m[0] * m[5]) * inv_det,
        c02 * inv_det,
        (m[1] * m[6] - m[0] * m[7]) * inv_det,
        (m[0] * m[4] - m[1] * m[3]) * inv_det,
    ])
}

/// Scales each row so that it sums to one.
pub fn normalize_rows(mut m: Matrix3) -> Matrix3 {
    for row in m.chunks_exact_mut(3) {
        let sum: f64 = row.iter().sum();
        if sum != 0.0 {
            row.iter_mut().for_each(|v| *v /= sum);
        }
    }
    m
}

/// Chromaticity `(x, y)` of an XYZ triple.
pub fn xyz_to_xy(xyz: [f64; 3]) -> (f64, f64) {
    let sum = xyz[0] + xyz[1] + xyz[2];
    if sum == 0.0 {
        return (0.0, 0.0);
    }
    (xyz[0] / sum, xyz[1] / sum)
}

/// XYZ with unit luminance for a chromaticity.
pub fn xy_to_xyz((x, y): (f64, f64)) -> [f64; 3] {
    if y == 0.0 {
        return [0.0; 3];
    }
    [x / y, 1.0, (1.0 - x - y) / y]
}

/// Correlated colour temperature of a chromaticity (cubic approximation in
/// McCamy's form).
pub fn correlated_color_temperature((x, y): (f64, f64)) -> f64 {
    let n = (x - 0.3320) / (0.1858 - y);
    437.0 * n.powi(3) + 3601.0 * n.powi(2) + 6861.0 * n + 5517.0
}

/// Linear Bradford adaptation from the `source` white to the `target` white.
pub fn chromatic_adaptation(source: [f64; 3], target: [f64; 3]) -> Option<Matrix3> {
    let src = mul_vec(&BRADFORD, source).map(|v| v.max(0.0));
    let dst = mul_vec(&BRADFORD, target).map(|v| v.max(0.0));
    if src.iter().any(|&v| v == 0.0) {
        return None;
    }
    let scale = diagonal([dst[0] / src[0], dst[1] / src[1], dst[2] / src[2]]);
    Some(mul(&mul(&inverse(&BRADFORD)?, &scale), &BRADFORD))
}

/// RGB to `(hue in degrees, saturation, value)`.
pub fn rgb_to_hsv([r, g, b]: [f64; 3]) -> [f64; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta <= 0.0 || max <= 0.0 {
        return [0.0, 0.0, max];
    }
    let mut h = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * (2.0 + (b - r) / delta)
    } else {
        60.0 * (4.0 + (r - g) / delta)
    };
    if h < 0.0 {
        h += 360.0;
    }
    [h, delta / max, max]
}

pub fn hsv_to_rgb([h, s, v]: [f64; 3]) -> [f64; 3] {
    if s <= 0.0 {
        return [v, v, v];
    }
    let h = (h / 60.0).rem_euclid(6.0);
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// sRGB transfer function on a linear value in `0..=1`.
#[inline]
pub fn srgb_encode(linear: f64) -> f64 {
    if linear < 0.0031308 { 12.92 * linear } else { 1.055 * linear.powf(1.0 / 2.4) - 0.055 }
}
