//! Grid dimensions and viewport-derived sizing

use crate::error::RippleError;
use serde::{Deserialize, Serialize};

/// Smallest grid side produced from a viewport
pub const MIN_GRID_DIMENSION: u32 = 256;

/// Largest grid side produced from a viewport
pub const MAX_GRID_DIMENSION: u32 = 16_384;

/// Host viewport in CSS pixels plus device pixel density
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Viewport width in CSS pixels
    pub width: f32,
    /// Viewport height in CSS pixels
    pub height: f32,
    /// Device pixels per CSS pixel
    pub density: f32,
}

impl Viewport {
    /// Create a viewport description
    #[must_use]
    pub const fn new(width: f32, height: f32, density: f32) -> Self {
        Self {
            width,
            height,
            density,
        }
    }
}

/// Dimensions of the simulation grid in cells
///
/// Both sides are always even and non-zero. Sizes derived from a viewport are
/// additionally at least [`MIN_GRID_DIMENSION`] per side. A grid only changes
/// size through a full rebuild of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Create a grid size from explicit dimensions
    ///
    /// # Errors
    ///
    /// Returns [`RippleError::InvalidGridSize`] if either side is zero or odd.
    pub fn new(width: u32, height: u32) -> Result<Self, RippleError> {
        if width == 0 || height == 0 || (width | height) & 1 != 0 {
            return Err(RippleError::InvalidGridSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Derive the grid size for a viewport showing an image of the given aspect ratio
    ///
    /// The image spans the full viewport width; its display height follows the
    /// aspect ratio. Both sides are scaled by the pixel density, raised to at
    /// least [`MIN_GRID_DIMENSION`] and bumped to the next even number.
    ///
    /// # Errors
    ///
    /// Returns [`RippleError::InvalidGridSize`] if the viewport width or the
    /// aspect ratio is not a positive finite number, or if a scaled side
    /// exceeds [`MAX_GRID_DIMENSION`].
    pub fn from_viewport(viewport: Viewport, aspect_ratio: f32) -> Result<Self, RippleError> {
        if !(viewport.width.is_finite() && viewport.width > 0.0)
            || !(aspect_ratio.is_finite() && aspect_ratio > 0.0)
        {
            return Err(RippleError::InvalidGridSize {
                width: 0,
                height: 0,
            });
        }

        let density = if viewport.density.is_finite() && viewport.density > 0.0 {
            viewport.density
        } else {
            1.0
        };

        let display_width = viewport.width;
        let display_height = (display_width / aspect_ratio).round();

        let scaled_width = (display_width * density).round();
        let scaled_height = (display_height * density).round();
        let fits = |side: f32| side.is_finite() && side <= MAX_GRID_DIMENSION as f32;
        if !fits(scaled_width) || !fits(scaled_height) {
            return Err(RippleError::InvalidGridSize {
                width: scaled_width as u32,
                height: scaled_height as u32,
            });
        }

        let width = (scaled_width as u32).max(MIN_GRID_DIMENSION);
        let height = (scaled_height as u32).max(MIN_GRID_DIMENSION);

        Self::new(width + (width & 1), height + (height & 1))
    }

    /// Grid width in cells
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Integer center of the grid (`width >> 1`, `height >> 1`)
    #[must_use]
    pub const fn center(&self) -> (u32, u32) {
        (self.width >> 1, self.height >> 1)
    }

    /// Length of the shorter side
    #[must_use]
    pub const fn shorter_side(&self) -> u32 {
        if self.width < self.height {
            self.width
        } else {
            self.height
        }
    }
}
