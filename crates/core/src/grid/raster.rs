//! RGBA8 pixel buffers for the reference image and the composited output

use super::size::GridSize;
use crate::error::RippleError;

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Row-major RGBA8 pixel buffer with the same dimensions as the field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    size: GridSize,
    data: Vec<u8>,
}

impl Raster {
    /// Create a raster filled with transparent black
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            data: vec![0; size.cell_count() * BYTES_PER_PIXEL],
        }
    }

    /// Wrap an existing RGBA8 buffer
    ///
    /// # Errors
    ///
    /// Returns [`RippleError::RasterSizeMismatch`] if `data` is not exactly
    /// `width * height * 4` bytes long.
    pub fn from_rgba(size: GridSize, data: Vec<u8>) -> Result<Self, RippleError> {
        let expected = size.cell_count() * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(RippleError::RasterSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel
    pub fn from_fn(size: GridSize, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.cell_count() * BYTES_PER_PIXEL);
        for y in 0..size.height() {
            for x in 0..size.width() {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { size, data }
    }

    /// Raster dimensions
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Pixel at `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(
            x < self.size.width() && y < self.size.height(),
            "Coordinates out of bounds"
        );
        let offset = self.offset(x, y);
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Raw RGBA8 bytes, row-major
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA8 bytes, row-major
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the raster and return its bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.width() as usize + x as usize) * BYTES_PER_PIXEL
    }
}
