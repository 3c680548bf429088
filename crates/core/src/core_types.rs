//! Vector type alias for field-space positions and directions.

use nalgebra::Vector2;

/// 2D vector type for field-space positions, pointer velocities and directions.
///
/// This is a simple alias for `nalgebra::Vector2<f32>`. Field space has its
/// origin at the top-left cell, x to the right and y downwards, one unit per cell.
pub type Vec2 = Vector2<f32>;
