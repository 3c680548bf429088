//! Analytic ambient wave term
//!
//! A disturbance-independent background oscillation added to the pressure of
//! every cell on each step of the pressure/velocity formulation: three
//! travelling sine waves plus three decaying circular ripples around fixed
//! centers. The WGSL step shader evaluates the same expression.

/// Travelling sine waves: `(time rate, u rate, v rate, amplitude)`
const SINE_WAVES: [(f32, f32, f32, f32); 3] = [
    (0.5, 6.0, 2.0, 0.15),
    (0.6, 1.5, 5.5, 0.13),
    (0.7, 4.5, 4.5, 0.11),
];

/// Circular ripples: `(center u, center v, spatial freq, time rate, decay, amplitude)`
const CIRCULAR_RIPPLES: [(f32, f32, f32, f32, f32, f32); 3] = [
    (0.3, 0.4, 8.0, 1.2, 3.0, 0.08),
    (0.7, 0.6, 7.0, 1.0, 3.5, 0.07),
    (0.5, 0.2, 9.0, 1.4, 2.8, 0.09),
];

/// Unscaled ambient displacement at normalized position `(u, v)` and time `t` (seconds)
///
/// The result lies in roughly `[-0.63, 0.63]`; callers scale it by the
/// configured ambient intensity.
#[must_use]
pub fn ambient_wave(u: f32, v: f32, t: f32) -> f32 {
    let waves: f32 = SINE_WAVES
        .iter()
        .map(|&(rate, ku, kv, amplitude)| (t * rate + u * ku + v * kv).sin() * amplitude)
        .sum();

    let ripples: f32 = CIRCULAR_RIPPLES
        .iter()
        .map(|&(cu, cv, freq, rate, decay, amplitude)| {
            let dist = ((u - cu) * (u - cu) + (v - cv) * (v - cv)).sqrt();
            (dist * freq - t * rate).sin() * (-dist * decay).exp() * amplitude
        })
        .sum();

    waves + ripples
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounded() {
        let bound: f32 = SINE_WAVES.iter().map(|w| w.3).sum::<f32>()
            + CIRCULAR_RIPPLES.iter().map(|r| r.5).sum::<f32>();
        for i in 0..=20 {
            for j in 0..=20 {
                let value = ambient_wave(i as f32 / 20.0, j as f32 / 20.0, 3.7);
                assert!(value.abs() <= bound + 1e-6);
            }
        }
    }

    #[test]
    fn test_varies_over_time() {
        let a = ambient_wave(0.25, 0.75, 0.0);
        let b = ambient_wave(0.25, 0.75, 1.0);
        assert!((a - b).abs() > 1e-3);
    }

    #[test]
    fn test_known_value_at_origin() {
        // At t = 0 and (0, 0) the sine waves vanish; only the ripples contribute
        let expected: f32 = CIRCULAR_RIPPLES
            .iter()
            .map(|&(cu, cv, freq, _, decay, amplitude)| {
                let dist = (cu * cu + cv * cv).sqrt();
                (dist * freq).sin() * (-dist * decay).exp() * amplitude
            })
            .sum();
        assert_relative_eq!(ambient_wave(0.0, 0.0, 0.0), expected, epsilon = 1e-6);
    }
}
