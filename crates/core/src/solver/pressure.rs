//! Pressure/velocity formulation on the CPU
//!
//! Reference implementation of the parallel backend: every cell carries
//! `(pressure, velocity, gx, gy)` in `f32`, two state buffers ping-pong once
//! per step, and compositing uses the stored gradient (see [`super::shading`]).
//! The GPU backend runs the same update in WGSL; this backend lets the
//! formulation run and be validated without a GPU.
//!
//! # Per-cell update
//!
//! ```text
//! vel += k(-2p + pr + pl)/4
//! vel += k(-2p + pu + pd)/4
//! p   += k·vel
//! vel -= 0.005·k·p
//! vel *= 1 - 0.002·k
//! p   *= 0.999
//! p   += ambient(u, v, t)·intensity        (optional)
//! p   += Σ force·scale·weight               (splats queued since the last step)
//! gx   = (pr - pl)/2,  gy = (pd - pu)/2
//! ```
//!
//! Missing neighbours on all four edges mirror the opposite neighbour.

use super::ambient::ambient_wave;
use super::disturbance::Disturbance;
use super::shading::composite_gradient;
use super::RippleField;
use crate::config::ParallelTuning;
use crate::grid::{GridSize, Raster};
use rayon::prelude::*;
use std::time::Duration;

/// Velocity restoring term per unit of `k`
pub const VELOCITY_SPRING: f32 = 0.005;
/// Velocity decay per unit of `k`
pub const VELOCITY_DECAY: f32 = 0.002;
/// Pressure retained per step
pub const PRESSURE_RETENTION: f32 = 0.999;

/// Cell state: pressure, velocity, horizontal and vertical gradient
pub type CellState = [f32; 4];

/// Integrate one cell from the previous state
///
/// # Arguments
///
/// * `state` - Previous state, row-major
/// * `size` - Grid dimensions
/// * `x`, `y` - Cell coordinates
/// * `k` - Integration factor
#[inline]
#[must_use]
pub fn integrate_cell(
    state: &[CellState],
    size: GridSize,
    x: usize,
    y: usize,
    k: f32,
) -> CellState {
    let width = size.width() as usize;
    let height = size.height() as usize;
    let idx = y * width + x;
    let [mut pressure, mut velocity, _, _] = state[idx];

    let p_left = if x > 0 { state[idx - 1][0] } else { state[idx + 1][0] };
    let p_right = if x + 1 < width { state[idx + 1][0] } else { state[idx - 1][0] };
    let p_up = if y > 0 { state[idx - width][0] } else { state[idx + width][0] };
    let p_down = if y + 1 < height { state[idx + width][0] } else { state[idx - width][0] };

    velocity += k * (-2.0 * pressure + p_right + p_left) / 4.0;
    velocity += k * (-2.0 * pressure + p_up + p_down) / 4.0;
    pressure += k * velocity;
    velocity -= VELOCITY_SPRING * k * pressure;
    velocity *= 1.0 - VELOCITY_DECAY * k;
    pressure *= PRESSURE_RETENTION;

    [
        pressure,
        velocity,
        (p_right - p_left) / 2.0,
        (p_down - p_up) / 2.0,
    ]
}

/// CPU backend for the pressure/velocity formulation
#[derive(Debug, Clone)]
pub struct PressureRippleField {
    size: GridSize,
    state: Vec<CellState>,
    scratch: Vec<CellState>,
    pending: Vec<Disturbance>,
    reference: Raster,
    output: Raster,
    tuning: ParallelTuning,
    dirty: bool,
}

impl PressureRippleField {
    /// Create a field at rest around a reference raster
    #[must_use]
    pub fn new(reference: Raster, tuning: ParallelTuning) -> Self {
        let size = reference.size();
        Self {
            size,
            state: vec![[0.0; 4]; size.cell_count()],
            scratch: vec![[0.0; 4]; size.cell_count()],
            pending: Vec::new(),
            output: reference.clone(),
            reference,
            tuning,
            dirty: false,
        }
    }

    /// Current cell states, row-major
    #[must_use]
    pub fn state(&self) -> &[CellState] {
        &self.state
    }

    /// Number of splats waiting for the next step
    #[must_use]
    pub fn pending_splats(&self) -> usize {
        self.pending.len()
    }
}

impl RippleField for PressureRippleField {
    fn step(&mut self, now: Duration) {
        let size = self.size;
        let width = size.width() as usize;
        let (w, h) = (size.width() as f32, size.height() as f32);
        let k = self.tuning.delta;
        let ambient = if self.tuning.ambient_wave {
            self.tuning.ambient_intensity
        } else {
            0.0
        };
        let t = now.as_secs_f32();

        let src = &self.state;
        self.scratch
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    let mut next = integrate_cell(src, size, x, y, k);
                    if ambient != 0.0 {
                        let u = (x as f32 + 0.5) / w;
                        let v = (y as f32 + 0.5) / h;
                        next[0] += ambient_wave(u, v, t) * ambient;
                    }
                    *cell = next;
                }
            });

        let scale = self.tuning.force_scale;
        let scratch = &mut self.scratch;
        for splat in self.pending.drain(..) {
            splat.for_each_cell(size, |x, y, weight| {
                scratch[y as usize * width + x as usize][0] += splat.force * scale * weight;
            });
        }

        std::mem::swap(&mut self.state, &mut self.scratch);
        self.dirty = true;
    }

    fn inject(&mut self, disturbance: &Disturbance) {
        if disturbance.is_well_formed() {
            self.pending.push(*disturbance);
        }
    }

    fn composite(&mut self) -> &Raster {
        if self.dirty {
            composite_gradient(&self.state, &self.reference, &mut self.output, &self.tuning);
            self.dirty = false;
        }
        &self.output
    }

    fn output(&self) -> &Raster {
        &self.output
    }

    fn size(&self) -> GridSize {
        self.size
    }

    fn is_gpu_accelerated(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "pressure-reference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RippleConfig;
    use crate::core_types::Vec2;
    use approx::assert_relative_eq;

    fn quiet_tuning() -> ParallelTuning {
        let mut tuning = RippleConfig::default().parallel;
        tuning.ambient_wave = false;
        tuning
    }

    fn field(width: u32, height: u32, tuning: ParallelTuning) -> PressureRippleField {
        let size = GridSize::new(width, height).unwrap();
        let reference = Raster::from_fn(size, |x, y| [(x * 9) as u8, (y * 5) as u8, 90, 255]);
        PressureRippleField::new(reference, tuning)
    }

    #[test]
    fn test_splat_applies_on_next_step() {
        let tuning = quiet_tuning();
        let mut field = field(16, 16, tuning);
        field.inject(&Disturbance::isotropic(Vec2::new(8.0, 8.0), 100.0, 2.0));
        assert_eq!(field.pending_splats(), 1);
        assert!(field.state().iter().all(|c| c[0] == 0.0));

        field.step(Duration::ZERO);
        assert_eq!(field.pending_splats(), 0);
        assert_relative_eq!(field.state()[8 * 16 + 8][0], 100.0 * tuning.force_scale);
        // Outside the radius nothing was added
        assert_eq!(field.state()[8 * 16 + 12][0], 0.0);
    }

    #[test]
    fn test_single_cell_update() {
        let size = GridSize::new(4, 4).unwrap();
        let mut state = vec![[0.0_f32; 4]; 16];
        state[5][0] = 1.0; // (1, 1)

        let k = 1.4;
        let next = integrate_cell(&state, size, 1, 1, k);
        let mut velocity = k * -2.0 / 4.0 + k * -2.0 / 4.0;
        let mut pressure = 1.0 + k * velocity;
        velocity -= VELOCITY_SPRING * k * pressure;
        velocity *= 1.0 - VELOCITY_DECAY * k;
        pressure *= PRESSURE_RETENTION;
        assert_relative_eq!(next[0], pressure);
        assert_relative_eq!(next[1], velocity);

        // Left neighbour of (2, 1) is the raised cell
        let right_of = integrate_cell(&state, size, 2, 1, k);
        assert_relative_eq!(right_of[2], -0.5);
        assert_relative_eq!(right_of[3], 0.0);
    }

    #[test]
    fn test_edges_mirror() {
        let size = GridSize::new(4, 4).unwrap();
        let mut state = vec![[0.0_f32; 4]; 16];
        state[1][0] = 1.0; // (1, 0)

        // (0, 0): missing left neighbour mirrors the right one, gradient cancels
        let k = 1.4;
        let corner = integrate_cell(&state, size, 0, 0, k);
        assert_eq!(corner[2], 0.0);

        let mut velocity = k * 2.0 / 4.0;
        let pressure = k * velocity;
        velocity -= VELOCITY_SPRING * k * pressure;
        velocity *= 1.0 - VELOCITY_DECAY * k;
        assert_relative_eq!(corner[0], pressure * PRESSURE_RETENTION);
        assert_relative_eq!(corner[1], velocity);
    }

    #[test]
    fn test_rest_without_ambient_stays_reference() {
        let mut field = field(8, 8, quiet_tuning());
        let reference = field.output().clone();
        for _ in 0..5 {
            field.step(Duration::from_millis(16));
        }
        assert!(field.state().iter().all(|c| *c == [0.0; 4]));
        assert_eq!(field.composite(), &reference);
    }

    #[test]
    fn test_ambient_wave_moves_surface() {
        let mut field = field(8, 8, RippleConfig::default().parallel);
        field.step(Duration::from_secs(2));
        assert!(field.state().iter().any(|c| c[0] != 0.0));
    }
}
