//! Fixed-point scalar backend
//!
//! Integrates the height field in `i16` fixed point and composites in the same
//! per-cell pass. Rows are processed in parallel with Rayon; every row reads
//! only the source generation and writes only its own destination, echo and
//! output rows, so the result is bit-identical to a serial pass.
//!
//! # Per-cell update
//!
//! ```text
//! lap     = (up + down + left + right) >> 1
//! next    = lap - dst
//! next   -= next >> damping_shift
//! dst     = next
//! display = baseline - next
//! ```
//!
//! Horizontal edges mirror (the missing neighbour is replaced by the one on
//! the opposite side); the padding rows supply zero above and below. When
//! `display` differs from the echo buffer, the output pixel is resampled with
//! a radial distortion about the grid center:
//!
//! ```text
//! wave = (display - baseline) / baseline
//! sx   = x + (x - cx) * wave * refraction_scale
//! ```
//!
//! Stores wrap to 16 bits. Damping bounds realistic accumulated force well
//! inside `i16`; force piled up faster than damping removes it wraps instead of
//! saturating.

use super::disturbance::Disturbance;
use super::RippleField;
use crate::config::ScalarTuning;
use crate::grid::{FieldStore, GridSize, Raster, BYTES_PER_PIXEL};
use rayon::prelude::*;
use std::time::Duration;

/// CPU backend over a [`FieldStore`]
#[derive(Debug, Clone)]
pub struct ScalarRippleField {
    store: FieldStore,
    tuning: ScalarTuning,
}

impl ScalarRippleField {
    /// Create a field at rest around a reference raster
    ///
    /// # Arguments
    ///
    /// * `reference` - Source image at grid resolution
    /// * `tuning` - Damping shift, baseline and refraction scale
    #[must_use]
    pub fn new(reference: Raster, tuning: ScalarTuning) -> Self {
        Self {
            store: FieldStore::new(reference),
            tuning,
        }
    }

    /// Underlying store (generations, echo buffer, rasters)
    #[must_use]
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Display value a pressure maps to
    #[inline]
    #[must_use]
    pub fn display_value(&self, pressure: i16) -> i32 {
        self.tuning.baseline - i32::from(pressure)
    }
}

impl RippleField for ScalarRippleField {
    fn step(&mut self, _now: Duration) {
        let size = self.store.size();
        let width = size.width() as usize;
        let (cx, cy) = size.center();
        let (cx, cy) = (cx as f32, cy as f32);
        let max_x = (size.width() - 1) as f32;
        let max_y = (size.height() - 1) as f32;
        let ScalarTuning {
            damping_shift,
            baseline,
            refraction_scale,
        } = self.tuning;

        let FieldStore {
            arena,
            echo,
            reference,
            output,
        } = &mut self.store;

        arena.swap();
        let (src, dst) = arena.split_mut();
        let reference = reference.as_bytes();

        // Skip the padding rows of the destination
        let interior = &mut dst[width..width * (size.height() as usize + 1)];

        interior
            .par_chunks_mut(width)
            .zip(echo.par_chunks_mut(width))
            .zip(output.as_bytes_mut().par_chunks_mut(width * BYTES_PER_PIXEL))
            .enumerate()
            .for_each(|(y, ((dst_row, echo_row), out_row))| {
                let above = &src[y * width..(y + 1) * width];
                let row = &src[(y + 1) * width..(y + 2) * width];
                let below = &src[(y + 2) * width..(y + 3) * width];

                for x in 0..width {
                    let left = if x == 0 { row[1] } else { row[x - 1] };
                    let right = if x == width - 1 { row[x - 1] } else { row[x + 1] };

                    let lap = (i32::from(above[x])
                        + i32::from(below[x])
                        + i32::from(left)
                        + i32::from(right))
                        >> 1;
                    let mut next = lap - i32::from(dst_row[x]);
                    next -= next >> damping_shift;
                    dst_row[x] = next as i16;

                    let display = baseline - next;
                    let echoed = display as i16;
                    if echo_row[x] == echoed {
                        continue;
                    }
                    echo_row[x] = echoed;

                    let wave = (display - baseline) as f32 / baseline as f32;
                    let sx = (x as f32 + (x as f32 - cx) * wave * refraction_scale)
                        .clamp(0.0, max_x);
                    let sy = (y as f32 + (y as f32 - cy) * wave * refraction_scale)
                        .clamp(0.0, max_y);

                    let src_px = (sy as usize * width + sx as usize) * BYTES_PER_PIXEL;
                    let dst_px = x * BYTES_PER_PIXEL;
                    out_row[dst_px..dst_px + BYTES_PER_PIXEL]
                        .copy_from_slice(&reference[src_px..src_px + BYTES_PER_PIXEL]);
                }
            });
    }

    fn inject(&mut self, disturbance: &Disturbance) {
        let size = self.store.size();
        let arena = &mut self.store.arena;
        disturbance.for_each_cell(size, |x, y, weight| {
            arena.add_pressure(x, y, (disturbance.force * weight) as i32);
        });
    }

    fn composite(&mut self) -> &Raster {
        // Compositing is fused into the step
        &self.store.output
    }

    fn output(&self) -> &Raster {
        &self.store.output
    }

    fn size(&self) -> GridSize {
        self.store.size()
    }

    fn is_gpu_accelerated(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "scalar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RippleConfig;
    use crate::core_types::Vec2;

    fn field(width: u32, height: u32) -> ScalarRippleField {
        let size = GridSize::new(width, height).unwrap();
        let reference = Raster::from_fn(size, |x, y| [x as u8, y as u8, (x ^ y) as u8, 255]);
        ScalarRippleField::new(reference, RippleConfig::default().scalar)
    }

    #[test]
    fn test_single_cell_step_matches_formula() {
        let mut field = field(8, 8);
        field.inject(&Disturbance::isotropic(Vec2::new(4.0, 4.0), 100.0, 2.0));
        assert_eq!(field.store().arena.pressure(4, 4), 100);

        field.step(Duration::ZERO);

        // All neighbours read zero from the source generation; the injected
        // force is the carry-over term subtracted from the Laplacian.
        let lap = 0_i32;
        let mut expected = lap - 100;
        expected -= expected >> 5;
        assert_eq!(i32::from(field.store().arena.latest(4, 4)), expected);
        assert_eq!(expected, -96);
        assert_eq!(field.display_value(field.store().arena.latest(4, 4)), 1120);
    }

    #[test]
    fn test_mirrored_edge_columns() {
        let mut field = field(8, 8);
        // A step swaps before reading, so seed the non-current generation
        field.store.arena.swap();
        field.store.arena.set_pressure(1, 3, 40);
        field.store.arena.swap();

        field.step(Duration::ZERO);

        // The edge cell sees its right neighbour on both sides: (40 + 40) >> 1
        let mut expected = 40_i32;
        expected -= expected >> 5;
        assert_eq!(i32::from(field.store().arena.latest(0, 3)), expected);
    }

    #[test]
    fn test_first_step_at_rest_writes_reference() {
        let mut field = field(16, 8);
        let reference = field.store().reference.clone();
        field.step(Duration::ZERO);
        assert_eq!(field.composite(), &reference);
        assert!(field.store().echo.iter().all(|&v| v == 1024));
    }

    /// Composite every pixel from the newest generation, ignoring the echo
    fn full_recompute(field: &ScalarRippleField) -> Raster {
        let size = field.size();
        let (cx, cy) = size.center();
        let ScalarTuning {
            baseline,
            refraction_scale,
            ..
        } = field.tuning;
        let store = field.store();
        Raster::from_fn(size, |x, y| {
            let display = field.display_value(store.arena.latest(x, y));
            let wave = (display - baseline) as f32 / baseline as f32;
            let sx = (x as f32 + (x as f32 - cx as f32) * wave * refraction_scale)
                .clamp(0.0, (size.width() - 1) as f32);
            let sy = (y as f32 + (y as f32 - cy as f32) * wave * refraction_scale)
                .clamp(0.0, (size.height() - 1) as f32);
            store.reference.pixel(sx as u32, sy as u32)
        })
    }

    #[test]
    fn test_echo_skip_matches_full_recompute() {
        let mut field = field(32, 24);
        let script = [
            (0, Disturbance::isotropic(Vec2::new(10.0, 12.0), 300.0, 3.0)),
            (4, Disturbance::isotropic(Vec2::new(22.0, 6.0), -180.0, 2.0)),
            (9, Disturbance::anisotropic(
                Vec2::new(16.0, 18.0),
                250.0,
                5.0,
                2.0,
                Vec2::new(1.0, 1.0),
            )),
            (15, Disturbance::isotropic(Vec2::new(0.0, 0.0), 120.0, 4.0)),
        ];

        let mut disturbed = false;
        for step in 0..60 {
            for (_, disturbance) in script.iter().filter(|(at, _)| *at == step) {
                field.inject(disturbance);
            }
            field.step(Duration::ZERO);

            let expected = full_recompute(&field);
            assert_eq!(field.composite(), &expected, "frame {step} diverged");
            disturbed |= (0..24).any(|y| (0..32).any(|x| field.store().arena.latest(x, y) != 0));
        }
        assert!(disturbed);
    }

    #[test]
    fn test_oversized_force_wraps_instead_of_panicking() {
        let mut field = field(8, 8);
        field.inject(&Disturbance::isotropic(Vec2::new(4.0, 4.0), 1.0, 2.0));
        field.inject(&Disturbance::isotropic(Vec2::new(4.0, 4.0), 3.0e9, 2.0));

        // The weighted force saturates to i32::MAX before the 16-bit store
        assert_eq!(field.store().arena.pressure(4, 4), 0);
        assert_eq!(field.store().arena.pressure(3, 4), -1);

        field.step(Duration::ZERO);
        assert_eq!(field.output().as_bytes().len(), 8 * 8 * BYTES_PER_PIXEL);
    }

    #[test]
    fn test_out_of_grid_injection_is_ignored() {
        let mut field = field(8, 8);
        field.inject(&Disturbance::isotropic(Vec2::new(-20.0, 4.0), 100.0, 3.0));
        field.inject(&Disturbance::isotropic(Vec2::new(f32::NAN, 4.0), 100.0, 3.0));
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(field.store().arena.pressure(x, y), 0);
            }
        }
    }
}
