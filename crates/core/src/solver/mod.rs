//! Ripple field solvers
//!
//! This module provides the integrators behind the water surface. The core
//! abstraction is the [`RippleField`] trait with three implementations:
//!
//! - [`ScalarRippleField`] - fixed-point height field, fused integrate and composite
//! - [`PressureRippleField`] - pressure/velocity formulation on the CPU
//! - `GpuRippleField` - the same formulation in wgpu compute shaders
//!
//! # Feature Flags
//!
//! - `gpu` (default): builds `GpuRippleField` on wgpu. Without it only the
//!   two CPU backends exist and `Auto` always resolves to scalar.
//!
//! # Backend Selection
//!
//! [`create_ripple_field`] honours [`Backend`] from the configuration:
//! 1. `Scalar` and `PressureReference` are always available
//! 2. `Gpu` and `Auto` try the GPU (if `gpu` feature enabled and hardware available)
//! 3. Any GPU failure falls back to the scalar backend
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::solver::create_ripple_field;
//! use ripple_core::{GridSize, Raster, RippleConfig};
//!
//! let size = GridSize::new(640, 400)?;
//! let mut field = create_ripple_field(&RippleConfig::default(), Raster::new(size));
//! field.step(std::time::Duration::ZERO);
//! let frame = field.composite();
//! ```

pub mod ambient;
mod context;
pub mod disturbance;
pub mod pressure;
pub mod profiler;
pub mod scalar;
pub mod shading;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

#[cfg(feature = "gpu")]
mod gpu;

// Re-exports
pub use ambient::ambient_wave;
pub use context::{GpuInitResult, StateFormat};
pub use disturbance::{Disturbance, Falloff, Shape};
pub use pressure::PressureRippleField;
pub use profiler::{FrameTimer, ProfilerScope};
pub use r#trait::RippleField;
pub use scalar::ScalarRippleField;

#[cfg(feature = "gpu")]
pub use context::GpuContext;
#[cfg(feature = "gpu")]
pub use gpu::GpuRippleField;

use crate::config::{Backend, RippleConfig};
use crate::grid::Raster;
use tracing::info;

#[cfg(feature = "gpu")]
use tracing::warn;

/// Create a ripple field with the configured backend
///
/// `Backend::Gpu` and `Backend::Auto` try to use GPU acceleration, falling
/// back to the scalar backend otherwise. The selection process is:
/// 1. With the `gpu` feature, probe for an adapter and open a device
/// 2. If no state format is usable or the grid does not fit, use scalar
///
/// # Arguments
///
/// * `config` - Tunings and requested backend
/// * `reference` - Source image at grid resolution
///
/// # Returns
///
/// A boxed `RippleField` trait object at rest
pub fn create_ripple_field(config: &RippleConfig, reference: Raster) -> Box<dyn RippleField> {
    match config.backend {
        Backend::Scalar => {
            info!("Using scalar backend ({:?})", reference.size());
            return Box::new(ScalarRippleField::new(reference, config.scalar));
        }
        Backend::PressureReference => {
            info!("Using pressure reference backend ({:?})", reference.size());
            return Box::new(PressureRippleField::new(reference, config.parallel));
        }
        Backend::Gpu | Backend::Auto => {}
    }

    #[cfg(feature = "gpu")]
    {
        match GpuContext::new() {
            GpuInitResult::Success(gpu_context) => {
                let adapter_name = gpu_context.adapter_name().to_string();
                match GpuRippleField::new(gpu_context, reference.clone(), config.parallel) {
                    Ok(field) => {
                        info!("Using GPU backend: {}", adapter_name);
                        return Box::new(field);
                    }
                    Err(e) => {
                        warn!("{}. Falling back to scalar backend.", e);
                    }
                }
            }
            GpuInitResult::NoGpuFound => {
                info!("No GPU found, using scalar backend");
            }
            GpuInitResult::InitFailed {
                adapter_name,
                error,
            } => {
                warn!(
                    "GPU '{}' found but failed to initialize: {}. Falling back to scalar backend.",
                    adapter_name, error
                );
            }
        }
    }

    #[cfg(not(feature = "gpu"))]
    info!("GPU feature disabled, using scalar backend");

    Box::new(ScalarRippleField::new(reference, config.scalar))
}
