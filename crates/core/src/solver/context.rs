//! GPU probing and state format negotiation
//!
//! [`GpuContext::new`] looks for an adapter and opens a compute device on it.
//! Once a context exists, the ripple state texture format is chosen by walking
//! [`StateFormat::FALLBACK_CHAIN`] until the adapter accepts one.

/// Outcome of probing for a GPU
///
/// A machine without any adapter is an ordinary case and only logged at
/// `info!`; an adapter that refuses to create a device is worth a `warn!`.
#[derive(Debug)]
pub enum GpuInitResult {
    /// Device and queue are ready
    #[cfg(feature = "gpu")]
    Success(GpuContext),
    /// No adapter matched the request
    NoGpuFound,
    /// An adapter exists but device creation failed
    InitFailed {
        /// Adapter that refused the device request
        adapter_name: String,
        /// Reason reported by wgpu
        error: String,
    },
}

/// Storage formats for the `(pressure, velocity, gx, gy)` state textures
///
/// Ordered from most to least precise. `Rgba8Snorm` clamps every component to
/// `[-1, 1]` and quantizes it to 8 bits, which flattens strong ripples but
/// keeps the surface moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateFormat {
    /// 32-bit float per component
    Rgba32Float,
    /// 16-bit float per component
    Rgba16Float,
    /// 8-bit signed normalized per component
    Rgba8Snorm,
}

impl StateFormat {
    /// Negotiation order, most precise first
    pub const FALLBACK_CHAIN: [Self; 3] = [Self::Rgba32Float, Self::Rgba16Float, Self::Rgba8Snorm];

    /// First format in the fallback chain accepted by `supports`
    ///
    /// # Returns
    ///
    /// `None` if no format of the chain is usable
    pub fn negotiate(mut supports: impl FnMut(Self) -> bool) -> Option<Self> {
        Self::FALLBACK_CHAIN.into_iter().find(|&format| supports(format))
    }

    /// Texel format name as written in WGSL storage texture declarations
    #[must_use]
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            Self::Rgba32Float => "rgba32float",
            Self::Rgba16Float => "rgba16float",
            Self::Rgba8Snorm => "rgba8snorm",
        }
    }

    /// Matching wgpu texture format
    #[cfg(feature = "gpu")]
    #[must_use]
    pub const fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba8Snorm => wgpu::TextureFormat::Rgba8Snorm,
        }
    }

    /// Bytes per texel
    #[must_use]
    pub const fn bytes_per_texel(self) -> u64 {
        match self {
            Self::Rgba32Float => 16,
            Self::Rgba16Float => 8,
            Self::Rgba8Snorm => 4,
        }
    }
}

#[cfg(feature = "gpu")]
mod gpu_impl {
    use super::{GpuInitResult, StateFormat};
    use tracing::{debug, info};

    /// PCI vendor ids whose compute units favour 16x16 workgroups
    const WIDE_WORKGROUP_VENDORS: [u32; 2] = [0x10DE, 0x1002];

    /// Open compute device plus the adapter it was created from
    #[derive(Debug)]
    pub struct GpuContext {
        adapter: wgpu::Adapter,
        adapter_info: wgpu::AdapterInfo,
        device: wgpu::Device,
        queue: wgpu::Queue,
    }

    fn request_adapter(instance: &wgpu::Instance) -> Option<wgpu::Adapter> {
        let options = wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        };
        pollster::block_on(instance.request_adapter(&options))
    }

    impl GpuContext {
        /// Probe for an adapter and open a device on it
        ///
        /// Never panics; every failure is reported through [`GpuInitResult`].
        #[allow(clippy::new_ret_no_self)]
        pub fn new() -> GpuInitResult {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });

            let Some(adapter) = request_adapter(&instance) else {
                debug!("wgpu returned no adapter");
                return GpuInitResult::NoGpuFound;
            };
            let adapter_info = adapter.get_info();
            debug!(
                "Adapter {} ({:?}, vendor {:#06x})",
                adapter_info.name, adapter_info.backend, adapter_info.vendor
            );

            let descriptor = wgpu::DeviceDescriptor {
                label: Some("Ripple Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            };
            match pollster::block_on(adapter.request_device(&descriptor, None)) {
                Ok((device, queue)) => {
                    info!("Opened ripple device on {}", adapter_info.name);
                    GpuInitResult::Success(Self {
                        adapter,
                        adapter_info,
                        device,
                        queue,
                    })
                }
                Err(e) => GpuInitResult::InitFailed {
                    adapter_name: adapter_info.name,
                    error: e.to_string(),
                },
            }
        }

        /// Human-readable adapter name
        #[must_use]
        pub fn adapter_name(&self) -> &str {
            &self.adapter_info.name
        }

        /// Compute workgroup dimensions for the step and composite shaders
        #[must_use]
        pub fn workgroup_size(&self) -> (u32, u32) {
            if WIDE_WORKGROUP_VENDORS.contains(&self.adapter_info.vendor) {
                (16, 16)
            } else {
                (8, 8)
            }
        }

        /// Whether the adapter can sample and storage-write `format`
        #[must_use]
        pub fn supports_state_format(&self, format: StateFormat) -> bool {
            let features = self
                .adapter
                .get_texture_format_features(format.texture_format());
            features
                .allowed_usages
                .contains(wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING)
        }

        /// Pick the state texture format, walking the fallback chain
        ///
        /// Logs the chosen format, and every format skipped on the way.
        #[must_use]
        pub fn negotiate_state_format(&self) -> Option<StateFormat> {
            let chosen = StateFormat::negotiate(|format| {
                let supported = self.supports_state_format(format);
                if !supported {
                    info!("State format {:?} unsupported on {}", format, self.adapter_name());
                }
                supported
            });
            if let Some(format) = chosen {
                info!("Using {:?} for ripple state textures", format);
            }
            chosen
        }

        /// Whether a `width` x `height` field fits the device limits
        ///
        /// Counts two state textures in `format`, the RGBA8 reference texture
        /// and the output plus staging buffers, and keeps half of the largest
        /// buffer size free for everything else.
        #[must_use]
        pub fn can_allocate(&self, width: u32, height: u32, format: StateFormat) -> bool {
            let limits = self.device.limits();
            let max_side = limits.max_texture_dimension_2d;
            if width > max_side || height > max_side {
                return false;
            }

            let cells = u64::from(width) * u64::from(height);
            let frame_bytes = cells * 4;
            let binding_limit = u64::from(limits.max_storage_buffer_binding_size);
            if frame_bytes > limits.max_buffer_size.min(binding_limit) {
                return false;
            }

            let total = cells * 2 * format.bytes_per_texel() + 3 * frame_bytes;
            total < limits.max_buffer_size / 2
        }

        /// Device used to build pipelines and buffers
        #[must_use]
        pub fn device(&self) -> &wgpu::Device {
            &self.device
        }

        /// Queue for uploads and command submission
        #[must_use]
        pub fn queue(&self) -> &wgpu::Queue {
            &self.queue
        }
    }

}

#[cfg(feature = "gpu")]
pub use gpu_impl::GpuContext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_prefers_precision() {
        assert_eq!(StateFormat::negotiate(|_| true), Some(StateFormat::Rgba32Float));
    }

    #[test]
    fn test_negotiation_walks_chain_in_order() {
        let mut asked = Vec::new();
        let chosen = StateFormat::negotiate(|format| {
            asked.push(format);
            format == StateFormat::Rgba8Snorm
        });
        assert_eq!(chosen, Some(StateFormat::Rgba8Snorm));
        assert_eq!(asked, StateFormat::FALLBACK_CHAIN.to_vec());

        let chosen = StateFormat::negotiate(|format| format != StateFormat::Rgba32Float);
        assert_eq!(chosen, Some(StateFormat::Rgba16Float));
    }

    #[test]
    fn test_negotiation_can_fail() {
        assert_eq!(StateFormat::negotiate(|_| false), None);
    }

    #[test]
    fn test_wgsl_names() {
        assert_eq!(StateFormat::Rgba32Float.wgsl_name(), "rgba32float");
        assert_eq!(StateFormat::Rgba16Float.wgsl_name(), "rgba16float");
        assert_eq!(StateFormat::Rgba8Snorm.wgsl_name(), "rgba8snorm");
    }
}
