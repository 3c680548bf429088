//! Tunings for the ripple simulation
//!
//! All constants the backends, pointer handling and scheduler read live in
//! [`RippleConfig`]. Two observed tunings are provided through
//! [`DeviceProfile`]; hosts pick one with their own device heuristics and may
//! adjust individual fields afterwards.

use crate::solver::disturbance::Falloff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Device class the tunings are chosen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceProfile {
    /// Mouse-driven desktop: hover ripples, idle echo, stronger clicks
    Desktop,
    /// Touch-driven handheld: stronger refraction, faster ambient ripples
    Mobile,
}

/// Which integrator backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    /// GPU when available, scalar otherwise
    #[default]
    Auto,
    /// Fixed-point array integrator on the CPU
    Scalar,
    /// Pressure/velocity formulation on the CPU
    PressureReference,
    /// Pressure/velocity formulation on the GPU (falls back to scalar)
    Gpu,
}

/// Force and radius of one kind of disturbance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Force added at the center (fixed-point units)
    pub force: f32,
    /// Radius in cells
    pub radius: f32,
}

impl Stroke {
    /// Create a stroke
    #[must_use]
    pub const fn new(force: f32, radius: f32) -> Self {
        Self { force, radius }
    }
}

/// Scalar backend constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarTuning {
    /// Right shift of the per-step damping (`next -= next >> shift`)
    pub damping_shift: u32,
    /// Display value of a cell at rest
    pub baseline: i32,
    /// Radial refraction strength
    pub refraction_scale: f32,
}

/// Pointer-driven disturbances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerTuning {
    /// Press with a mouse
    pub mouse_press: Stroke,
    /// Press with touch or pen
    pub touch_press: Stroke,
    /// Drag with a mouse button held
    pub mouse_drag: Stroke,
    /// Drag with touch or pen
    pub touch_drag: Stroke,
    /// Mouse movement with no button held
    pub hover: Stroke,
    /// Whether hover movement disturbs the field at all
    pub hover_enabled: bool,
    /// Minimum time between two hover disturbances
    pub hover_interval: Duration,
    /// Injection profile for pointer disturbances
    pub falloff: Falloff,
}

/// Speed-dependent elongation of pointer disturbances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnisotropyTuning {
    /// Speed (cells per second) below which direction is not refreshed and
    /// injections stay circular
    pub noise_speed: f32,
    /// Speed (cells per second) at which elongation saturates
    pub max_speed: f32,
    /// Extra major-axis length at full speed, as a fraction of the radius
    pub stretch: f32,
    /// Minor-axis reduction at full speed, as a fraction of the radius
    pub squash: f32,
    /// Lower bound of `minor / radius`
    pub min_minor_ratio: f32,
    /// Extra force at full speed, as a fraction of the base force
    pub boost: f32,
}

/// Periodic disturbance at a random cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientTuning {
    /// Whether the ambient timer runs
    pub enabled: bool,
    /// Time between two ambient disturbances
    pub interval: Duration,
    /// Force and radius of each disturbance
    pub stroke: Stroke,
}

/// Periodic replay of the last pointer position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdleEchoTuning {
    /// Whether the idle echo timer runs
    pub enabled: bool,
    /// Time between two echoes
    pub interval: Duration,
    /// Force and radius of each echo
    pub stroke: Stroke,
}

/// Pressure/velocity backend constants (CPU reference and GPU)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParallelTuning {
    /// Integration factor `k`
    pub delta: f32,
    /// Pressure added at a splat center per unit of scalar force
    pub force_scale: f32,
    /// Whether the analytic ambient wave is added every step
    pub ambient_wave: bool,
    /// Amplitude of the analytic ambient wave
    pub ambient_intensity: f32,
    /// UV displacement per unit of gradient
    pub distortion_strength: f32,
    /// Overall specular gain
    pub specular_intensity: f32,
    /// Gain of the first light lobe
    pub specular_primary: f32,
    /// Gain of the second light lobe
    pub specular_secondary: f32,
    /// Blend factor of the half-distortion re-sample
    pub refraction_mix_primary: f32,
    /// Blend factor of the 0.3-distortion re-sample
    pub refraction_mix_secondary: f32,
    /// Amplitude of the gradient brightness ripple
    pub brightness_variation: f32,
}

/// Complete tuning set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RippleConfig {
    /// Device class these values were derived from
    pub profile: DeviceProfile,
    /// Requested integrator backend
    pub backend: Backend,
    /// Scalar backend constants
    pub scalar: ScalarTuning,
    /// Pointer disturbances
    pub pointer: PointerTuning,
    /// Speed-dependent elongation
    pub anisotropy: AnisotropyTuning,
    /// Random ambient disturbances
    pub ambient: AmbientTuning,
    /// Idle pointer echo
    pub idle_echo: IdleEchoTuning,
    /// Pressure/velocity backend constants
    pub parallel: ParallelTuning,
    /// Quiet period before a resize rebuilds the field
    pub resize_debounce: Duration,
    /// Seed of the ambient disturbance RNG
    pub seed: u64,
}

/// Base pointer force for desktop
const DESKTOP_FORCE: f32 = 350.0;
/// Base pointer force for mobile
const MOBILE_FORCE: f32 = 320.0;
/// Base pointer radius in cells
const BASE_RADIUS: f32 = 18.0;

impl RippleConfig {
    /// Tunings observed for a device class
    #[must_use]
    pub fn for_profile(profile: DeviceProfile) -> Self {
        let mobile = profile == DeviceProfile::Mobile;
        let force = if mobile { MOBILE_FORCE } else { DESKTOP_FORCE };

        let hover = Stroke::new(force * 0.2, (BASE_RADIUS - 8.0).max(8.0));
        let touch_press = Stroke::new(force, BASE_RADIUS);
        let touch_drag = Stroke::new(force * 0.5, BASE_RADIUS);

        // On handheld devices a mouse is treated like any other pointer
        let (mouse_press, mouse_drag) = if mobile {
            (touch_press, touch_drag)
        } else {
            (
                Stroke::new(force * 1.35, BASE_RADIUS + 5.0),
                Stroke::new(force * 0.65, BASE_RADIUS + 2.0),
            )
        };

        let splat_intensity = if mobile { 2.0 } else { 1.2 };

        Self {
            profile,
            backend: Backend::Auto,
            scalar: ScalarTuning {
                damping_shift: 5,
                baseline: 1024,
                refraction_scale: if mobile { 0.55 } else { 0.5 },
            },
            pointer: PointerTuning {
                mouse_press,
                touch_press,
                mouse_drag,
                touch_drag,
                hover,
                hover_enabled: !mobile,
                hover_interval: Duration::from_millis(28),
                falloff: Falloff::Flat,
            },
            anisotropy: AnisotropyTuning {
                noise_speed: 30.0,
                max_speed: 3000.0,
                stretch: 1.5,
                squash: 0.5,
                min_minor_ratio: 0.4,
                boost: 0.5,
            },
            ambient: AmbientTuning {
                enabled: true,
                interval: Duration::from_millis(if mobile { 1000 } else { 1300 }),
                stroke: Stroke::new(force * 0.8, BASE_RADIUS + 2.0),
            },
            idle_echo: IdleEchoTuning {
                enabled: !mobile,
                interval: Duration::from_millis(250),
                stroke: Stroke::new(hover.force * 0.6, hover.radius + 1.0),
            },
            parallel: ParallelTuning {
                delta: 1.4,
                force_scale: splat_intensity / force,
                ambient_wave: true,
                ambient_intensity: if mobile { 0.55 } else { 0.35 },
                distortion_strength: if mobile { 0.5 } else { 0.35 },
                specular_intensity: if mobile { 0.6 } else { 0.4 },
                specular_primary: if mobile { 1.2 } else { 0.8 },
                specular_secondary: if mobile { 0.8 } else { 0.5 },
                refraction_mix_primary: if mobile { 0.12 } else { 0.08 },
                refraction_mix_secondary: if mobile { 0.08 } else { 0.05 },
                brightness_variation: if mobile { 0.35 } else { 0.2 },
            },
            resize_debounce: Duration::from_millis(120),
            seed: 0x5EED_D1CE,
        }
    }

    /// Use a different backend
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self::for_profile(DeviceProfile::Desktop)
    }
}
