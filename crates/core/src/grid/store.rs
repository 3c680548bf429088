//! Field store for the scalar backend
//!
//! Owns the generation arena, the echo buffer and both rasters, all sized to
//! the same grid. A store is built whole and replaced whole on reinit.

use super::arena::GenerationArena;
use super::raster::Raster;
use super::size::GridSize;

/// Everything the scalar integrator reads and writes in one frame pass
#[derive(Debug, Clone)]
pub struct FieldStore {
    /// Double-buffered pressure generations
    pub arena: GenerationArena,
    /// Last emitted display value per cell, used to skip unchanged pixels
    pub echo: Vec<i16>,
    /// Static source image, read-only
    pub reference: Raster,
    /// Composited frame, rewritten every pass
    pub output: Raster,
}

impl FieldStore {
    /// Build a store at rest around a reference raster
    ///
    /// The output starts as a copy of the reference and the echo buffer is
    /// zeroed, so the first pass recomputes every pixel.
    #[must_use]
    pub fn new(reference: Raster) -> Self {
        let size = reference.size();
        Self {
            arena: GenerationArena::new(size),
            echo: vec![0; size.cell_count()],
            output: reference.clone(),
            reference,
        }
    }

    /// Grid dimensions
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.arena.size()
    }
}
