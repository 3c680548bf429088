//! GPU ripple backend
//!
//! This module runs the pressure/velocity formulation with wgpu compute
//! shaders. It is only available when the `gpu` feature is enabled.
//!
//! # Shader Files
//!
//! - `shaders/ripple_step.wgsl` - stencil integration, ambient wave, splats
//! - `shaders/ripple_composite.wgsl` - gradient distortion and highlights
//!
//! # Implementation
//!
//! Cell state lives in two storage textures that ping-pong once per step. The
//! texel format is negotiated at construction (see [`StateFormat`]) and
//! substituted into the shader source. Disturbances are queued on the host
//! and uploaded as splats with the next step. Compositing writes packed RGBA8
//! into a storage buffer that is copied to a staging buffer for readback.

use super::context::{GpuContext, StateFormat};
use super::disturbance::{Disturbance, Falloff, Shape};
use super::shading::Lighting;
use super::RippleField;
use crate::config::ParallelTuning;
use crate::error::RippleError;
use crate::grid::{GridSize, Raster, BYTES_PER_PIXEL};
use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

/// Initial splat buffer capacity (splats per step)
const INITIAL_SPLAT_CAPACITY: usize = 64;

const FLAG_SMOOTH: u32 = 1;
const FLAG_ELLIPSE: u32 = 2;

/// Step shader parameters (must match WGSL struct layout)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct StepParams {
    width: u32,
    height: u32,
    splat_count: u32,
    ambient_enabled: u32,
    delta: f32,
    time: f32,
    ambient_intensity: f32,
    force_scale: f32,
}

/// Composite shader parameters (must match WGSL struct layout)
///
/// The two light vectors come first so the `vec4` members sit on 16-byte
/// boundaries; the struct is 80 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CompositeParams {
    light_primary: [f32; 4],
    light_secondary: [f32; 4],
    width: u32,
    height: u32,
    distortion_strength: f32,
    specular_intensity: f32,
    specular_primary: f32,
    specular_secondary: f32,
    refraction_mix_primary: f32,
    refraction_mix_secondary: f32,
    brightness_variation: f32,
    flat_primary: f32,
    flat_secondary: f32,
    _padding: f32,
}

/// One queued disturbance as the step shader reads it (32 bytes)
///
/// Circles store their radius in `major`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GpuSplat {
    center: [f32; 2],
    direction: [f32; 2],
    major: f32,
    minor: f32,
    force: f32,
    flags: u32,
}

impl From<&Disturbance> for GpuSplat {
    fn from(disturbance: &Disturbance) -> Self {
        let smooth = match disturbance.falloff {
            Falloff::Flat => 0,
            Falloff::Smooth => FLAG_SMOOTH,
        };
        let (direction, major, minor, shape) = match disturbance.shape {
            Shape::Circle { radius } => ([1.0, 0.0], radius, radius, 0),
            Shape::Ellipse {
                major,
                minor,
                direction,
            } => ([direction.x, direction.y], major, minor, FLAG_ELLIPSE),
        };
        Self {
            center: [disturbance.center.x, disturbance.center.y],
            direction,
            major,
            minor,
            force: disturbance.force,
            flags: smooth | shape,
        }
    }
}

/// Substitute format and workgroup size into a shader template
fn shader_source(template: &str, format: StateFormat, workgroup: (u32, u32)) -> String {
    template
        .replace("STATE_FORMAT", format.wgsl_name())
        .replace("WORKGROUP_X", &workgroup.0.to_string())
        .replace("WORKGROUP_Y", &workgroup.1.to_string())
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: String,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: "main",
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        cache: None,
    })
}

/// GPU backend for the pressure/velocity formulation
///
/// Uses compute pipelines for integration and compositing. State is held in
/// ping-pong storage textures; the composited frame is read back through a
/// staging buffer when [`RippleField::composite`] is called.
pub struct GpuRippleField {
    context: GpuContext,
    size: GridSize,
    format: StateFormat,
    workgroup: (u32, u32),
    tuning: ParallelTuning,

    // Needed again when the splat buffer grows
    state_views: [wgpu::TextureView; 2],

    splat_buffer: wgpu::Buffer,
    splat_capacity: usize,
    step_params_buffer: wgpu::Buffer,
    output_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,

    step_pipeline: wgpu::ComputePipeline,
    composite_pipeline: wgpu::ComputePipeline,
    step_layout: wgpu::BindGroupLayout,

    // Indexed by the slot holding the newest state
    step_bind_groups: [wgpu::BindGroup; 2],
    composite_bind_groups: [wgpu::BindGroup; 2],

    current: usize,
    pending: Vec<GpuSplat>,
    output: Raster,
    dirty: bool,
}

impl GpuRippleField {
    /// Create a GPU field at rest around a reference raster
    ///
    /// Negotiates the state texture format, uploads the reference and builds
    /// both compute pipelines.
    ///
    /// # Arguments
    ///
    /// * `context` - GPU context with device and queue
    /// * `reference` - Source image at grid resolution
    /// * `tuning` - Pressure/velocity and shading constants
    ///
    /// # Errors
    ///
    /// Returns [`RippleError::GpuUnavailable`] if no state format in the
    /// fallback chain is usable or the grid does not fit in GPU memory.
    pub fn new(
        context: GpuContext,
        reference: Raster,
        tuning: ParallelTuning,
    ) -> Result<Self, RippleError> {
        let size = reference.size();
        let (width, height) = (size.width(), size.height());

        let format = context.negotiate_state_format().ok_or_else(|| {
            RippleError::GpuUnavailable(format!(
                "{} supports none of the state texture formats",
                context.adapter_name()
            ))
        })?;
        if !context.can_allocate(width, height, format) {
            return Err(RippleError::GpuUnavailable(format!(
                "{} cannot allocate a {}x{} ripple field",
                context.adapter_name(),
                width,
                height
            )));
        }

        let workgroup = context.workgroup_size();
        let device = context.device();
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        // State textures start zeroed: the field is at rest
        let state_views = ["Ripple State A", "Ripple State B"].map(|label| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: format.texture_format(),
                    usage: wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::STORAGE_BINDING,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let reference_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Ripple Reference"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        context.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &reference_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            reference.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL as u32),
                rows_per_image: Some(height),
            },
            extent,
        );
        let reference_view = reference_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let splat_buffer = Self::create_splat_buffer(device, INITIAL_SPLAT_CAPACITY);

        let step_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ripple Step Params"),
            size: std::mem::size_of::<StepParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lighting = Lighting::new();
        let (flat_primary, flat_secondary) = lighting.flat_baselines();
        let primary = lighting.primary_light();
        let secondary = lighting.secondary_light();
        let composite_params = CompositeParams {
            light_primary: [primary.x, primary.y, primary.z, 0.0],
            light_secondary: [secondary.x, secondary.y, secondary.z, 0.0],
            width,
            height,
            distortion_strength: tuning.distortion_strength,
            specular_intensity: tuning.specular_intensity,
            specular_primary: tuning.specular_primary,
            specular_secondary: tuning.specular_secondary,
            refraction_mix_primary: tuning.refraction_mix_primary,
            refraction_mix_secondary: tuning.refraction_mix_secondary,
            brightness_variation: tuning.brightness_variation,
            flat_primary,
            flat_secondary,
            _padding: 0.0,
        };
        let composite_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ripple Composite Params"),
            contents: bytemuck::bytes_of(&composite_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let output_size = size.cell_count() as u64 * BYTES_PER_PIXEL as u64;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ripple Output"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ripple Output Staging"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let step_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ripple Step Layout"),
            entries: &[
                uniform_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: format.texture_format(),
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                storage_entry(3, true),
            ],
        });

        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ripple Composite Layout"),
            entries: &[
                uniform_entry(0),
                texture_entry(1),
                texture_entry(2),
                storage_entry(3, false),
            ],
        });

        let step_pipeline = compute_pipeline(
            device,
            "Ripple Step",
            shader_source(include_str!("shaders/ripple_step.wgsl"), format, workgroup),
            &step_layout,
        );
        let composite_pipeline = compute_pipeline(
            device,
            "Ripple Composite",
            shader_source(include_str!("shaders/ripple_composite.wgsl"), format, workgroup),
            &composite_layout,
        );

        let step_bind_groups = Self::create_step_bind_groups(
            device,
            &step_layout,
            &step_params_buffer,
            &state_views,
            &splat_buffer,
        );
        let composite_bind_groups = [0, 1].map(|slot| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Ripple Composite Bind Group"),
                layout: &composite_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: composite_params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&state_views[slot]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&reference_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: output_buffer.as_entire_binding(),
                    },
                ],
            })
        });

        info!(
            "GPU ripple field ready: {}x{} cells, {:?} state, {}x{} workgroups",
            width, height, format, workgroup.0, workgroup.1
        );

        Ok(Self {
            context,
            size,
            format,
            workgroup,
            tuning,
            state_views,
            splat_buffer,
            splat_capacity: INITIAL_SPLAT_CAPACITY,
            step_params_buffer,
            output_buffer,
            staging_buffer,
            step_pipeline,
            composite_pipeline,
            step_layout,
            step_bind_groups,
            composite_bind_groups,
            current: 0,
            pending: Vec::new(),
            output: reference,
            dirty: false,
        })
    }

    /// Negotiated state texture format
    #[must_use]
    pub fn state_format(&self) -> StateFormat {
        self.format
    }

    fn create_splat_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ripple Splats"),
            size: (capacity * std::mem::size_of::<GpuSplat>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Bind groups for both step directions: entry `i` reads slot `i`, writes the other
    fn create_step_bind_groups(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        params: &wgpu::Buffer,
        state_views: &[wgpu::TextureView; 2],
        splats: &wgpu::Buffer,
    ) -> [wgpu::BindGroup; 2] {
        [0, 1].map(|src| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Ripple Step Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&state_views[src]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&state_views[src ^ 1]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: splats.as_entire_binding(),
                    },
                ],
            })
        })
    }

    /// Grow the splat buffer so `count` splats fit in one step
    fn ensure_splat_capacity(&mut self, count: usize) {
        if count <= self.splat_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        debug!("Growing splat buffer from {} to {}", self.splat_capacity, capacity);

        let device = self.context.device();
        self.splat_buffer = Self::create_splat_buffer(device, capacity);
        self.step_bind_groups = Self::create_step_bind_groups(
            device,
            &self.step_layout,
            &self.step_params_buffer,
            &self.state_views,
            &self.splat_buffer,
        );
        self.splat_capacity = capacity;
    }

    fn workgroup_count(&self) -> (u32, u32) {
        (
            self.size.width().div_ceil(self.workgroup.0),
            self.size.height().div_ceil(self.workgroup.1),
        )
    }

    /// Map the staging buffer and copy the packed frame into the output raster
    fn read_output(&mut self) -> Result<(), RippleError> {
        let buffer_slice = self.staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        let _ = self.context.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| RippleError::GpuReadback(e.to_string()))?
            .map_err(|e| RippleError::GpuReadback(e.to_string()))?;

        {
            let data = buffer_slice.get_mapped_range();
            self.output.as_bytes_mut().copy_from_slice(&data);
        }
        self.staging_buffer.unmap();
        Ok(())
    }
}

impl RippleField for GpuRippleField {
    fn step(&mut self, now: Duration) {
        self.ensure_splat_capacity(self.pending.len());
        let queue = self.context.queue();

        if !self.pending.is_empty() {
            queue.write_buffer(&self.splat_buffer, 0, bytemuck::cast_slice(&self.pending));
        }

        let params = StepParams {
            width: self.size.width(),
            height: self.size.height(),
            splat_count: self.pending.len() as u32,
            ambient_enabled: u32::from(self.tuning.ambient_wave),
            delta: self.tuning.delta,
            time: now.as_secs_f32(),
            ambient_intensity: self.tuning.ambient_intensity,
            force_scale: self.tuning.force_scale,
        };
        queue.write_buffer(&self.step_params_buffer, 0, bytemuck::bytes_of(&params));

        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Ripple Step Encoder"),
                });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ripple Step Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.step_pipeline);
            compute_pass.set_bind_group(0, &self.step_bind_groups[self.current], &[]);

            let (wg_x, wg_y) = self.workgroup_count();
            compute_pass.dispatch_workgroups(wg_x, wg_y, 1);
        }

        queue.submit(std::iter::once(encoder.finish()));

        // Flip ping-pong
        self.current ^= 1;
        self.pending.clear();
        self.dirty = true;
    }

    fn inject(&mut self, disturbance: &Disturbance) {
        if disturbance.is_well_formed() {
            self.pending.push(GpuSplat::from(disturbance));
        }
    }

    fn composite(&mut self) -> &Raster {
        if !self.dirty {
            return &self.output;
        }

        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Ripple Composite Encoder"),
                });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ripple Composite Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.composite_pipeline);
            compute_pass.set_bind_group(0, &self.composite_bind_groups[self.current], &[]);

            let (wg_x, wg_y) = self.workgroup_count();
            compute_pass.dispatch_workgroups(wg_x, wg_y, 1);
        }

        let output_size = self.output.as_bytes().len() as u64;
        encoder.copy_buffer_to_buffer(&self.output_buffer, 0, &self.staging_buffer, 0, output_size);
        self.context.queue().submit(std::iter::once(encoder.finish()));

        // A failed readback keeps the previous frame
        if let Err(e) = self.read_output() {
            warn!("{}", e);
        }
        self.dirty = false;
        &self.output
    }

    fn output(&self) -> &Raster {
        &self.output
    }

    fn size(&self) -> GridSize {
        self.size
    }

    fn is_gpu_accelerated(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}
