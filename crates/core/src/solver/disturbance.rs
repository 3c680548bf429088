//! Disturbance injection profiles
//!
//! A [`Disturbance`] describes a localized force addition: a center in field
//! space, a force, and either a circle or an ellipse aligned to a direction.
//! Every backend walks the same covered cells through
//! [`Disturbance::for_each_cell`], so the support of an injection is identical
//! on all of them.
//!
//! Profiles:
//! - [`Falloff::Flat`]: the full force is added to every covered cell
//! - [`Falloff::Smooth`]: force scaled by `(1 - d)²` where `d` is the
//!   normalized distance from the center (0 at the center, 1 on the edge)

use crate::config::{AnisotropyTuning, Stroke};
use crate::core_types::Vec2;
use crate::grid::GridSize;
use serde::{Deserialize, Serialize};

/// Radial weighting of a disturbance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Falloff {
    /// Constant weight inside the shape
    #[default]
    Flat,
    /// `(1 - d)²` weight inside the shape
    Smooth,
}

impl Falloff {
    /// Weight at normalized distance `d` (`0 <= d <= 1`)
    #[inline]
    #[must_use]
    pub fn weight(self, d: f32) -> f32 {
        match self {
            Self::Flat => 1.0,
            Self::Smooth => {
                let t = 1.0 - d;
                t * t
            }
        }
    }
}

/// Footprint of a disturbance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Disc of the given radius in cells
    Circle {
        /// Radius in cells
        radius: f32,
    },
    /// Ellipse whose major axis follows `direction`
    Ellipse {
        /// Semi-axis along `direction`, in cells
        major: f32,
        /// Semi-axis across `direction`, in cells
        minor: f32,
        /// Unit vector of the major axis
        direction: Vec2,
    },
}

/// A localized, instantaneous force addition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disturbance {
    /// Center in field space (cells)
    pub center: Vec2,
    /// Force at full weight
    pub force: f32,
    /// Footprint
    pub shape: Shape,
    /// Radial weighting
    pub falloff: Falloff,
}

impl Disturbance {
    /// Circular disturbance with a flat profile
    #[must_use]
    pub fn isotropic(center: Vec2, force: f32, radius: f32) -> Self {
        Self {
            center,
            force,
            shape: Shape::Circle { radius },
            falloff: Falloff::Flat,
        }
    }

    /// Elliptical disturbance aligned to `direction`
    ///
    /// `direction` is normalized here. A zero direction degrades to a circle
    /// with the larger of the two radii.
    #[must_use]
    pub fn anisotropic(center: Vec2, force: f32, major: f32, minor: f32, direction: Vec2) -> Self {
        let shape = match direction.try_normalize(f32::EPSILON) {
            Some(direction) => Shape::Ellipse {
                major,
                minor,
                direction,
            },
            None => Shape::Circle {
                radius: major.max(minor),
            },
        };
        Self {
            center,
            force,
            shape,
            falloff: Falloff::Smooth,
        }
    }

    /// Pointer disturbance shaped by the pointer's speed
    ///
    /// Below the noise speed, or without a known direction, the result is a
    /// circle of the stroke radius weighted by `round_falloff`. Faster motion
    /// produces a longer, narrower and stronger ellipse with a smooth profile;
    /// elongation saturates at `max_speed`.
    #[must_use]
    pub fn from_motion(
        center: Vec2,
        stroke: Stroke,
        speed: f32,
        direction: Option<Vec2>,
        tuning: &AnisotropyTuning,
        round_falloff: Falloff,
    ) -> Self {
        match direction {
            Some(direction) if speed > tuning.noise_speed && tuning.max_speed > 0.0 => {
                let s = (speed / tuning.max_speed).clamp(0.0, 1.0);
                let major = stroke.radius * (1.0 + tuning.stretch * s);
                let minor = stroke.radius * (1.0 - tuning.squash * s).max(tuning.min_minor_ratio);
                let force = stroke.force * (1.0 + tuning.boost * s);
                Self::anisotropic(center, force, major, minor, direction)
            }
            _ => Self::isotropic(center, stroke.force, stroke.radius).with_falloff(round_falloff),
        }
    }

    /// Replace the radial weighting
    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    /// Largest distance from the center a covered cell can have
    #[must_use]
    pub fn extent(&self) -> f32 {
        match self.shape {
            Shape::Circle { radius } => radius,
            Shape::Ellipse { major, minor, .. } => major.max(minor),
        }
    }

    /// Whether the disturbance can cover any cell at all
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let axes_ok = match self.shape {
            Shape::Circle { radius } => radius.is_finite() && radius > 0.0,
            Shape::Ellipse { major, minor, .. } => {
                major.is_finite() && minor.is_finite() && major > 0.0 && minor > 0.0
            }
        };
        axes_ok && self.center.x.is_finite() && self.center.y.is_finite() && self.force.is_finite()
    }

    /// Normalized distance of a point from the center, `None` outside the shape
    #[must_use]
    pub fn normalized_distance(&self, x: f32, y: f32) -> Option<f32> {
        let offset = Vec2::new(x, y) - self.center;
        let d_sq = match self.shape {
            Shape::Circle { radius } => offset.norm_squared() / (radius * radius),
            Shape::Ellipse {
                major,
                minor,
                direction,
            } => {
                let parallel = offset.dot(&direction);
                let perpendicular = offset.x * -direction.y + offset.y * direction.x;
                (parallel * parallel) / (major * major)
                    + (perpendicular * perpendicular) / (minor * minor)
            }
        };
        (d_sq <= 1.0).then(|| d_sq.sqrt())
    }

    /// Visit every covered cell inside the grid with its falloff weight
    ///
    /// The scan box is clipped to `[0, width) × [0, height)`; cells outside
    /// the grid are skipped, never wrapped or clamped in. Malformed
    /// disturbances (non-finite values, non-positive radii) visit nothing.
    pub fn for_each_cell(&self, size: GridSize, mut visit: impl FnMut(u32, u32, f32)) {
        if !self.is_well_formed() {
            return;
        }

        let extent = self.extent();
        let max_x = i64::from(size.width()) - 1;
        let max_y = i64::from(size.height()) - 1;
        let x0 = ((self.center.x - extent).floor() as i64).max(0);
        let x1 = ((self.center.x + extent).ceil() as i64).min(max_x);
        let y0 = ((self.center.y - extent).floor() as i64).max(0);
        let y1 = ((self.center.y + extent).ceil() as i64).min(max_y);

        for y in y0..=y1 {
            for x in x0..=x1 {
                if let Some(d) = self.normalized_distance(x as f32, y as f32) {
                    visit(x as u32, y as u32, self.falloff.weight(d));
                }
            }
        }
    }
}
