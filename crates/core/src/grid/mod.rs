//! Field store: grid sizing, generation arena and pixel rasters

pub mod arena;
pub mod raster;
pub mod size;
pub mod store;

// Re-export main types
pub use arena::GenerationArena;
pub use raster::{Raster, BYTES_PER_PIXEL};
pub use size::{GridSize, Viewport, MAX_GRID_DIMENSION, MIN_GRID_DIMENSION};
pub use store::FieldStore;
