//! Hash and fractal value-noise functions shared by the fragment shader and
//! its CPU reference.
//!
//! Every function here mirrors a GLSL counterpart in [`crate::gpu::shaders`]
//! operation for operation, so the CPU path produces the same field the GPU
//! does (modulo float precision). All of them are pure.

/// Octave count used by the lightning field.
pub const OCTAVE_COUNT: u32 = 10;
/// Rotation applied to the sampling point between octaves, in radians.
pub const OCTAVE_ROTATION: f32 = 0.45;

/// GLSL `fract`, folded into `[0, 1)`.
///
/// `x - floor(x)` can round up to exactly `1.0` for tiny negative inputs;
/// that value is congruent to `0.0` and is reported as such.
#[inline]
pub fn fract(x: f32) -> f32 {
    let r = x - x.floor();
    if r >= 1.0 {
        0.0
    } else {
        r
    }
}

/// Scalar hash into `[0, 1)`.
pub fn hash1(p: f32) -> f32 {
    let mut p = fract(p * 0.1031);
    p *= p + 33.33;
    p *= p + p;
    fract(p)
}

/// 2D hash into `[0, 1)`.
pub fn hash2(p: [f32; 2]) -> f32 {
    let mut p3 = [
        fract(p[0] * 0.1031),
        fract(p[1] * 0.1031),
        fract(p[0] * 0.1031),
    ];
    let d = p3[0] * (p3[1] + 33.33) + p3[1] * (p3[2] + 33.33) + p3[2] * (p3[0] + 33.33);
    for c in &mut p3 {
        *c += d;
    }
    fract((p3[0] + p3[1]) * p3[2])
}

/// Hermite `3t² - 2t³` on a value already in `[0, 1]`.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Value noise: smoothstep-weighted bilinear blend of [`hash2`] at the four
/// lattice corners around `p`.
pub fn value_noise(p: [f32; 2]) -> f32 {
    let ip = [p[0].floor(), p[1].floor()];
    let fp = [p[0] - ip[0], p[1] - ip[1]];
    let a = hash2(ip);
    let b = hash2([ip[0] + 1.0, ip[1]]);
    let c = hash2([ip[0], ip[1] + 1.0]);
    let d = hash2([ip[0] + 1.0, ip[1] + 1.0]);
    let tx = smoothstep(fp[0].clamp(0.0, 1.0));
    let ty = smoothstep(fp[1].clamp(0.0, 1.0));
    mix(mix(a, b, tx), mix(c, d, tx), ty)
}

/// Fractal sum of [`value_noise`]. Each octave rotates the sampling point by
/// [`OCTAVE_ROTATION`], then doubles it, then halves the amplitude.
pub fn fbm(p: [f32; 2], octaves: u32) -> f32 {
    let (s, c) = OCTAVE_ROTATION.sin_cos();
    let mut p = p;
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..octaves {
        value += amplitude * value_noise(p);
        p = [c * p[0] - s * p[1], s * p[0] + c * p[1]];
        p = [p[0] * 2.0, p[1] * 2.0];
        amplitude *= 0.5;
    }
    value
}

/// Upper bound of [`fbm`] for `octaves` passes: `Σ 0.5^(i+1)`.
pub fn fbm_amplitude_sum(octaves: u32) -> f32 {
    (0..octaves).map(|i| 0.5_f32.powi(i as i32 + 1)).sum()
}

/// HSV to RGB with all components in `[0, 1]`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let channel = |offset: f32| {
        let x = h * 6.0 + offset;
        let m = x - 6.0 * (x / 6.0).floor();
        let rgb = ((m - 3.0).abs() - 1.0).clamp(0.0, 1.0);
        v * mix(1.0, rgb, s)
    };
    [channel(0.0), channel(4.0), channel(2.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn hashes_are_deterministic_and_in_range() {
        for i in -500..500 {
            let x = i as f32 * 0.731;
            let h = hash1(x);
            assert_eq!(h.to_bits(), hash1(x).to_bits());
            assert!((0.0..1.0).contains(&h), "hash1({x}) = {h}");

            let p = [x, x * -1.37 + 4.0];
            let h2 = hash2(p);
            assert_eq!(h2.to_bits(), hash2(p).to_bits());
            assert!((0.0..1.0).contains(&h2), "hash2({p:?}) = {h2}");
        }
    }

    #[test]
    fn neighbouring_lattice_points_decorrelate() {
        let samples: Vec<f32> = (0..64).map(|i| hash2([i as f32, 3.0])).collect();
        let distinct = samples
            .windows(2)
            .filter(|pair| (pair[0] - pair[1]).abs() > 1e-3)
            .count();
        assert!(distinct > 56, "only {distinct} neighbouring pairs differ");
    }

    #[test]
    fn value_noise_hits_lattice_hashes_exactly() {
        let corner = [3.0, -2.0];
        assert_eq!(value_noise(corner), hash2(corner));
    }

    #[test]
    fn value_noise_is_deterministic_and_bounded() {
        for i in 0..200 {
            let p = [i as f32 * 0.173 - 10.0, i as f32 * 0.091 + 2.5];
            let n = value_noise(p);
            assert_eq!(n.to_bits(), value_noise(p).to_bits());
            assert!((0.0..=1.0).contains(&n), "value_noise({p:?}) = {n}");
        }
    }

    #[test]
    fn fbm_is_deterministic_and_bounded_by_amplitude_sum() {
        let bound = fbm_amplitude_sum(OCTAVE_COUNT);
        assert!((bound - (1.0 - 0.5_f32.powi(10))).abs() < 1e-6);
        for i in 0..200 {
            let p = [i as f32 * 0.37 - 20.0, (i as f32 * 0.21).sin() * 9.0];
            let value = fbm(p, OCTAVE_COUNT);
            assert_eq!(value.to_bits(), fbm(p, OCTAVE_COUNT).to_bits());
            assert!(value >= 0.0 && value <= bound + 1e-6, "fbm({p:?}) = {value}");
        }
    }

    #[test]
    fn single_octave_fbm_is_half_value_noise() {
        let p = [1.25, 7.5];
        assert!((fbm(p, 1) - 0.5 * value_noise(p)).abs() < 1e-7);
    }

    #[test]
    fn fbm_rotates_before_doubling() {
        let p = [0.3, 0.9];
        let (s, c) = OCTAVE_ROTATION.sin_cos();
        let second = [2.0 * (c * p[0] - s * p[1]), 2.0 * (s * p[0] + c * p[1])];
        let expected = 0.5 * value_noise(p) + 0.25 * value_noise(second);
        assert!((fbm(p, 2) - expected).abs() < 1e-6);
    }

    #[test]
    fn hsv_conversion_matches_known_hues() {
        assert!(approx(hsv_to_rgb(0.0, 0.7, 0.8), [0.8, 0.24, 0.24]));
        assert!(approx(hsv_to_rgb(120.0 / 360.0, 0.7, 0.8), [0.24, 0.8, 0.24]));
        assert!(approx(hsv_to_rgb(240.0 / 360.0, 0.7, 0.8), [0.24, 0.24, 0.8]));
        let teal = hsv_to_rgb(190.0 / 360.0, 0.7, 0.8);
        assert!(approx(teal, [0.24, 0.8 * (0.3 + 0.7 * (5.0 / 6.0)), 0.8]));
        assert_eq!(teal, hsv_to_rgb(190.0 / 360.0, 0.7, 0.8));
    }
}
