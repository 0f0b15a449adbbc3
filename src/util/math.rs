//! Mathematical helpers for planar geometry.

use std::f64::consts::TAU;

/// Computes sine and cosine of the angle of ray `k` out of `n_rays`.
pub(crate) fn ray_sin_cos(k: usize, n_rays: usize) -> (f64, f64) {
    let theta = TAU * k as f64 / n_rays as f64;
    theta.sin_cos()
}

/// Z component of the cross product `a x b`.
#[inline]
pub(crate) fn cross(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

#[inline]
pub(crate) fn sub(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
pub(crate) fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// Point at parameter `t` on the segment `a -> b`.
#[inline]
pub(crate) fn lerp(a: [f64; 2], b: [f64; 2], t: f64) -> [f64; 2] {
    [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])]
}

/// Squared distance from `p` to the closed segment `a -> b`.
pub(crate) fn dist2_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = sub(b, a);
    let ap = sub(p, a);
    let len2 = dot(ab, ab);
    let t = if len2 > 0.0 {
        (dot(ap, ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let q = lerp(a, b, t);
    let d = sub(p, q);
    dot(d, d)
}

/// Returns `true` when `value` is finite and within `[0, 1]`.
pub(crate) fn is_unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::{cross, dist2_to_segment, is_unit_interval, ray_sin_cos};

    #[test]
    fn ray_angles_cover_quadrants() {
        let (sin, cos) = ray_sin_cos(0, 4);
        assert!(sin.abs() < 1e-12 && (cos - 1.0).abs() < 1e-12);
        let (sin, cos) = ray_sin_cos(1, 4);
        assert!((sin - 1.0).abs() < 1e-12 && cos.abs() < 1e-12);
        let (sin, cos) = ray_sin_cos(2, 4);
        assert!(sin.abs() < 1e-12 && (cos + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_sign_follows_orientation() {
        assert!(cross([1.0, 0.0], [0.0, 1.0]) > 0.0);
        assert!(cross([0.0, 1.0], [1.0, 0.0]) < 0.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d2 = dist2_to_segment([3.0, 0.0], [0.0, 0.0], [1.0, 0.0]);
        assert!((d2 - 4.0).abs() < 1e-12);
        let d2 = dist2_to_segment([0.5, 2.0], [0.0, 0.0], [1.0, 0.0]);
        assert!((d2 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn unit_interval_rejects_nan() {
        assert!(is_unit_interval(0.0));
        assert!(is_unit_interval(1.0));
        assert!(!is_unit_interval(f32::NAN));
        assert!(!is_unit_interval(1.01));
    }
}
