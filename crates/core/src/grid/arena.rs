//! Two-slot generation arena for the fixed-point height field
//!
//! Each generation is a flat `Vec<i16>` of `(height + 2) * width` values: one
//! zero padding row above and below the interior so the vertical stencil never
//! needs a bounds check. The slot index toggles between 0 and 1 on every step;
//! generations are never copied.

use super::size::GridSize;

/// Double-buffered fixed-point pressure field
#[derive(Debug, Clone)]
pub struct GenerationArena {
    generations: [Vec<i16>; 2],
    current: usize,
    size: GridSize,
}

impl GenerationArena {
    /// Allocate both generations at rest (all zero)
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        let len = (size.height() as usize + 2) * size.width() as usize;
        Self {
            generations: [vec![0; len], vec![0; len]],
            current: 0,
            size,
        }
    }

    /// Grid dimensions
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Index (0 or 1) of the current generation
    ///
    /// Disturbances write into the current generation. The next step swaps
    /// first, so those values become the carry-over term it subtracts.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Toggle which slot is current
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Pressure at `(x, y)` in the current generation
    #[must_use]
    pub fn pressure(&self, x: u32, y: u32) -> i16 {
        self.generations[self.current][self.index(x, y)]
    }

    /// Overwrite the pressure at `(x, y)` in the current generation
    pub fn set_pressure(&mut self, x: u32, y: u32, value: i16) {
        let idx = self.index(x, y);
        self.generations[self.current][idx] = value;
    }

    /// Add `delta` to the pressure at `(x, y)` in the current generation
    ///
    /// The sum is stored with 16-bit wrapping, like a store into a signed
    /// 16-bit typed array. Accumulated force is not clamped.
    pub fn add_pressure(&mut self, x: u32, y: u32, delta: i32) {
        let idx = self.index(x, y);
        let cell = &mut self.generations[self.current][idx];
        *cell = i32::from(*cell).wrapping_add(delta) as i16;
    }

    /// Pressure at `(x, y)` in the non-current generation
    ///
    /// Right after a step this is the generation the step just produced.
    #[must_use]
    pub fn latest(&self, x: u32, y: u32) -> i16 {
        self.generations[self.current ^ 1][self.index(x, y)]
    }

    /// Stencil source (current) and destination (other) generations, padding included
    pub(crate) fn split_mut(&mut self) -> (&[i16], &mut [i16]) {
        let [first, second] = &mut self.generations;
        if self.current == 0 {
            (first.as_slice(), second.as_mut_slice())
        } else {
            (second.as_slice(), first.as_mut_slice())
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.size.width() && y < self.size.height(),
            "Coordinates out of bounds"
        );
        (y as usize + 1) * self.size.width() as usize + x as usize
    }
}
