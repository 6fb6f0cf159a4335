/// Greatest common divisor (Euclid, iterative).
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple; zero when either argument is zero.
pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// Mirrors a coordinate onto `0..len` by clamping.
#[inline]
pub fn translate(coord: isize, len: usize) -> usize {
    coord.clamp(0, len as isize - 1) as usize
}

#[inline]
pub fn clamp_u16(value: f64) -> u16 {
    value.clamp(0.0, 65535.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(7, 0), 7);
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(2, 3), 6);
        assert_eq!(lcm(0, 5), 0);
    }

    #[test]
    fn test_translate_clamps() {
        assert_eq!(translate(-3, 10), 0);
        assert_eq!(translate(4, 10), 4);
        assert_eq!(translate(12, 10), 9);
    }
}
