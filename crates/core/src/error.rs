//! Error types for field construction and backend setup
//!
//! Only setup paths return errors. The per-frame step, inject and composite
//! operations never fail; out-of-range disturbances are clipped silently.

use std::fmt;

/// Errors raised while building or rebuilding a ripple field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RippleError {
    /// Requested grid dimensions are zero or odd
    InvalidGridSize {
        /// Requested width in cells
        width: u32,
        /// Requested height in cells
        height: u32,
    },
    /// An RGBA buffer does not match the dimensions it was declared with
    RasterSizeMismatch {
        /// Expected byte length (`width * height * 4`)
        expected: usize,
        /// Actual byte length
        actual: usize,
    },
    /// The reference image could not be produced at the requested size
    ReferenceUnavailable(String),
    /// GPU adapter, device or storage format could not be obtained
    GpuUnavailable(String),
    /// Mapping a GPU buffer for readback failed
    GpuReadback(String),
}

impl fmt::Display for RippleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGridSize { width, height } => {
                write!(f, "Invalid grid size {width}x{height}: dimensions must be even and non-zero")
            }
            Self::RasterSizeMismatch { expected, actual } => {
                write!(f, "Raster holds {actual} bytes, expected {expected}")
            }
            Self::ReferenceUnavailable(reason) => {
                write!(f, "Reference image unavailable: {reason}")
            }
            Self::GpuUnavailable(reason) => write!(f, "GPU unavailable: {reason}"),
            Self::GpuReadback(reason) => write!(f, "GPU readback failed: {reason}"),
        }
    }
}

impl std::error::Error for RippleError {}
