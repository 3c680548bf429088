//! Gradient compositor for the pressure/velocity formulation
//!
//! Each output pixel samples the reference raster at a position displaced by
//! the cell's stored pressure gradient, blends in two softer re-samples, and
//! adds Phong-style highlights from a synthetic surface normal plus a small
//! brightness ripple. The WGSL composite shader mirrors this function.
//!
//! # Rest identity
//!
//! Highlights are measured relative to the flat-surface normal and the
//! brightness ripple is `sin(0) = 0` at rest, so a zero gradient reproduces
//! the reference raster byte for byte. Sampling is nearest-texel and clamped
//! in texel space, which keeps the at-rest lookup exact at every grid size.

use crate::config::ParallelTuning;
use crate::grid::{Raster, BYTES_PER_PIXEL};
use nalgebra::Vector3;
use rayon::prelude::*;

/// Fraction of the distortion used by the first softening re-sample
pub const SOFTEN_PRIMARY: f32 = 0.5;
/// Fraction of the distortion used by the second softening re-sample
pub const SOFTEN_SECONDARY: f32 = 0.3;
/// Phong exponent of the first light lobe
pub const EXPONENT_PRIMARY: f32 = 60.0;
/// Phong exponent of the second light lobe
pub const EXPONENT_SECONDARY: f32 = 80.0;
/// Gradient tilt applied when building the surface normal
pub const NORMAL_TILT: f32 = 2.0;
/// Vertical component of the unnormalized surface normal
pub const NORMAL_UP: f32 = 0.5;
/// Amplitude of the gradient brightness ripple
pub const BRIGHTNESS_AMPLITUDE: f32 = 0.03;
/// Spatial frequency of the gradient brightness ripple
pub const BRIGHTNESS_FREQUENCY: f32 = 30.0;

/// Fixed light directions and their flat-surface baselines
#[derive(Debug, Clone, Copy)]
pub struct Lighting {
    primary: Vector3<f32>,
    secondary: Vector3<f32>,
    flat_primary: f32,
    flat_secondary: f32,
}

impl Lighting {
    /// The two fixed lights of the compositor
    #[must_use]
    pub fn new() -> Self {
        let primary = Vector3::new(-3.0, 10.0, 3.0).normalize();
        let secondary = Vector3::new(5.0, 8.0, -2.0).normalize();
        let flat = Vector3::y();
        Self {
            primary,
            secondary,
            flat_primary: lobe(&flat, &primary, EXPONENT_PRIMARY),
            flat_secondary: lobe(&flat, &secondary, EXPONENT_SECONDARY),
        }
    }

    /// Lobe values of a flat surface, subtracted from every highlight
    #[must_use]
    pub fn flat_baselines(&self) -> (f32, f32) {
        (self.flat_primary, self.flat_secondary)
    }

    /// Unit direction of the first light
    #[must_use]
    pub fn primary_light(&self) -> Vector3<f32> {
        self.primary
    }

    /// Unit direction of the second light
    #[must_use]
    pub fn secondary_light(&self) -> Vector3<f32> {
        self.secondary
    }

    /// Highlight contribution of a surface with gradient `(gx, gy)`
    ///
    /// Zero for a flat surface.
    #[must_use]
    pub fn specular(&self, gx: f32, gy: f32, tuning: &ParallelTuning) -> f32 {
        let normal = Vector3::new(-gx * NORMAL_TILT, NORMAL_UP, -gy * NORMAL_TILT).normalize();
        let primary =
            (lobe(&normal, &self.primary, EXPONENT_PRIMARY) - self.flat_primary).max(0.0);
        let secondary =
            (lobe(&normal, &self.secondary, EXPONENT_SECONDARY) - self.flat_secondary).max(0.0);
        (primary * tuning.specular_primary + secondary * tuning.specular_secondary)
            * tuning.specular_intensity
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn lobe(normal: &Vector3<f32>, light: &Vector3<f32>, exponent: f32) -> f32 {
    normal.dot(light).max(0.0).powf(exponent)
}

/// Nearest reference texel at `(x, y)` displaced by `offset` (UV units)
#[inline]
fn sample(reference: &Raster, x: u32, y: u32, offset: (f32, f32)) -> [u8; 4] {
    let size = reference.size();
    let width = size.width() as f32;
    let height = size.height() as f32;
    let sx = (x as f32 + 0.5 + offset.0 * width)
        .floor()
        .clamp(0.0, width - 1.0);
    let sy = (y as f32 + 0.5 + offset.1 * height)
        .floor()
        .clamp(0.0, height - 1.0);
    reference.pixel(sx as u32, sy as u32)
}

/// Shade one output pixel from its gradient
#[must_use]
pub fn shade_pixel(
    reference: &Raster,
    lighting: &Lighting,
    tuning: &ParallelTuning,
    x: u32,
    y: u32,
    gradient: (f32, f32),
) -> [u8; 4] {
    let (gx, gy) = gradient;
    let dx = gx * tuning.distortion_strength;
    let dy = gy * tuning.distortion_strength;

    let base = sample(reference, x, y, (dx, dy));
    let soft_a = sample(reference, x, y, (dx * SOFTEN_PRIMARY, dy * SOFTEN_PRIMARY));
    let soft_b = sample(reference, x, y, (dx * SOFTEN_SECONDARY, dy * SOFTEN_SECONDARY));

    let highlight = lighting.specular(gx, gy, tuning);
    let ripple = BRIGHTNESS_AMPLITUDE
        * ((gx * gx + gy * gy).sqrt() * BRIGHTNESS_FREQUENCY).sin()
        * tuning.brightness_variation;

    let mut out = base;
    for c in 0..3 {
        let mut value = f32::from(base[c]) / 255.0;
        value += (f32::from(soft_a[c]) / 255.0 - value) * tuning.refraction_mix_primary;
        value += (f32::from(soft_b[c]) / 255.0 - value) * tuning.refraction_mix_secondary;
        value += highlight + ripple;
        out[c] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out
}

/// Composite a whole frame from `(pressure, velocity, gx, gy)` cell states
///
/// Rows are shaded in parallel; each row writes only its own output bytes.
pub fn composite_gradient(
    state: &[[f32; 4]],
    reference: &Raster,
    output: &mut Raster,
    tuning: &ParallelTuning,
) {
    let width = reference.size().width() as usize;
    let lighting = Lighting::new();

    output
        .as_bytes_mut()
        .par_chunks_mut(width * BYTES_PER_PIXEL)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let cell = state[y * width + x];
                let rgba = shade_pixel(
                    reference,
                    &lighting,
                    tuning,
                    x as u32,
                    y as u32,
                    (cell[2], cell[3]),
                );
                pixel.copy_from_slice(&rgba);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RippleConfig;
    use crate::grid::GridSize;

    fn reference(size: GridSize) -> Raster {
        Raster::from_fn(size, |x, y| {
            [(x * 17) as u8, (y * 29) as u8, ((x + y) * 7) as u8, 200 + (x % 3) as u8]
        })
    }

    #[test]
    fn test_flat_surface_has_no_highlight() {
        let tuning = RippleConfig::default().parallel;
        let lighting = Lighting::new();
        assert_eq!(lighting.specular(0.0, 0.0, &tuning), 0.0);
        assert!(lighting.specular(0.3, -0.2, &tuning) >= 0.0);
    }

    #[test]
    fn test_rest_reproduces_reference() {
        let size = GridSize::new(1024, 6).unwrap();
        let reference = reference(size);
        let state = vec![[0.0_f32; 4]; size.cell_count()];
        let mut output = Raster::new(size);

        composite_gradient(&state, &reference, &mut output, &RippleConfig::default().parallel);
        assert_eq!(output, reference);
    }

    #[test]
    fn test_gradient_displaces_sample() {
        let size = GridSize::new(16, 16).unwrap();
        let reference = reference(size);
        let mut tuning = RippleConfig::default().parallel;
        tuning.specular_intensity = 0.0;
        tuning.brightness_variation = 0.0;
        tuning.refraction_mix_primary = 0.0;
        tuning.refraction_mix_secondary = 0.0;
        tuning.distortion_strength = 0.25;

        // gx = 0.5 → 0.125 of the width = 2 texels to the right
        let pixel = shade_pixel(&reference, &Lighting::new(), &tuning, 4, 4, (0.5, 0.0));
        assert_eq!(pixel, reference.pixel(6, 4));

        // Large displacements clamp to the border instead of wrapping
        let pixel = shade_pixel(&reference, &Lighting::new(), &tuning, 4, 4, (-40.0, 0.0));
        assert_eq!(pixel, reference.pixel(0, 4));
    }

    #[test]
    fn test_alpha_follows_displaced_sample() {
        let size = GridSize::new(8, 8).unwrap();
        let reference = reference(size);
        let tuning = RippleConfig::default().parallel;
        let pixel = shade_pixel(&reference, &Lighting::new(), &tuning, 2, 3, (0.0, 0.0));
        assert_eq!(pixel[3], reference.pixel(2, 3)[3]);
    }
}
