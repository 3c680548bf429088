//! Ripple field trait definition
//!
//! This module defines the `RippleField` trait, the backend-agnostic interface
//! to the height-field simulation. The scalar, pressure reference and GPU
//! backends all implement it.

use super::disturbance::Disturbance;
use crate::grid::{GridSize, Raster};
use std::time::Duration;

/// Backend-agnostic interface for the ripple simulation
///
/// A field owns its generations, its copy of the reference raster and its
/// output raster. Disturbances injected between two calls to [`step`] are
/// visible to the next step and never to one already completed.
///
/// [`step`]: RippleField::step
pub trait RippleField: Send + Sync {
    /// Advance the field by one generation
    ///
    /// # Arguments
    ///
    /// * `now` - Monotonic host time, used to parameterize the ambient wave
    fn step(&mut self, now: Duration);

    /// Add a disturbance to the field
    ///
    /// Cells outside the grid are skipped. Malformed disturbances are ignored.
    fn inject(&mut self, disturbance: &Disturbance);

    /// Bring the output raster up to date with the newest generation and return it
    ///
    /// A field that has never been stepped, or that is at exact rest, returns
    /// the reference raster unchanged.
    fn composite(&mut self) -> &Raster;

    /// Output raster as last composited
    fn output(&self) -> &Raster;

    /// Get grid dimensions
    fn size(&self) -> GridSize;

    /// Check if this is the GPU backend
    ///
    /// # Returns
    ///
    /// `true` if GPU-accelerated, `false` if CPU-only
    fn is_gpu_accelerated(&self) -> bool;

    /// Short backend name for logging
    fn name(&self) -> &'static str;
}
