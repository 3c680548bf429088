//! Pointer input and client-to-field coordinate mapping

pub mod pointer;

pub use pointer::{PointerEvent, PointerKind, PointerMotion, PointerTracker};

use crate::core_types::Vec2;
use crate::grid::GridSize;

/// Maps host client coordinates onto field cells
///
/// `field = (client - origin) × (field_size / viewport_size)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMapping {
    /// Top-left corner of the displayed surface in client coordinates
    pub origin: Vec2,
    /// Displayed surface size in client units
    pub viewport_size: Vec2,
    /// Grid the surface shows
    pub field_size: GridSize,
}

impl ViewportMapping {
    /// Create a mapping
    #[must_use]
    pub fn new(origin: Vec2, viewport_size: Vec2, field_size: GridSize) -> Self {
        Self {
            origin,
            viewport_size,
            field_size,
        }
    }

    /// Client position in field cells
    ///
    /// Positions outside the surface map outside the grid; injection clips them.
    /// A degenerate viewport maps everything to the origin cell.
    #[must_use]
    pub fn to_field(&self, client: Vec2) -> Vec2 {
        let scale = |field: u32, viewport: f32| {
            if viewport > 0.0 {
                field as f32 / viewport
            } else {
                0.0
            }
        };
        let offset = client - self.origin;
        Vec2::new(
            offset.x * scale(self.field_size.width(), self.viewport_size.x),
            offset.y * scale(self.field_size.height(), self.viewport_size.y),
        )
    }
}
