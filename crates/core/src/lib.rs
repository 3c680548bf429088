//! Ripple Refraction Core Library
//!
//! A pointer-reactive water ripple effect over a static reference image. A
//! discretized 2D wave equation is integrated once per display frame, perturbed
//! by pointer, ambient and idle disturbances, and its height field distorts and
//! relights samples of the reference image.
//!
//! ## Backends
//!
//! - Scalar: fixed-point `i16` field, fused integrate and composite on the CPU
//! - Pressure reference: pressure/velocity formulation on the CPU
//! - GPU: the same formulation in wgpu compute shaders (`gpu` feature)
//!
//! ## Driving the effect
//!
//! Hosts own a [`Scheduler`], forward lifecycle and pointer events to it, and
//! call [`Scheduler::tick`] once per display frame to receive the composited
//! [`Raster`].

// Core types and utilities
pub mod core_types;

pub mod config;
pub mod error;
pub mod grid;
pub mod input;
pub mod scheduler;
pub mod solver;

// Re-export core types
pub use core_types::Vec2;

pub use config::{Backend, DeviceProfile, RippleConfig};
pub use error::RippleError;
pub use grid::{GridSize, Raster, Viewport};
pub use input::{PointerEvent, PointerKind, PointerTracker, ViewportMapping};
pub use scheduler::{LifecycleState, RasterReference, ReferenceSource, Scheduler};
pub use solver::{create_ripple_field, Disturbance, Falloff, RippleField};
