//! Frame scheduling and lifecycle
//!
//! The [`Scheduler`] is the single owned context a host drives. It holds the
//! active [`RippleField`], turns pointer events and timers into disturbances,
//! debounces viewport changes into rebuilds, and runs one frame pass per
//! [`Scheduler::tick`].
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --begin_loading--> Loading --on_reference_loaded--> Running
//!                                     |                              ^   |
//!                       on_reference_failed (disabled)      visible  |   | hidden
//!                                                                    |   v
//!                                                                  Suspended
//! ```
//!
//! Rebuilding the field after a resize is a transition inside `Running`; the
//! previous field stays active until the new one is built.

pub mod timer;

pub use timer::{Debounce, RecurringTimer};

use crate::config::RippleConfig;
use crate::core_types::Vec2;
use crate::error::RippleError;
use crate::grid::{GridSize, Raster, Viewport};
use crate::input::{PointerEvent, PointerTracker};
use crate::solver::{create_ripple_field, Disturbance, FrameTimer, ProfilerScope, RippleField};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Provider of the reference image at a requested grid size
///
/// Implementations own decoding, rescaling and cropping.
pub trait ReferenceSource {
    /// Width and height of the original image in pixels
    fn dimensions(&self) -> (u32, u32);

    /// The image resampled to exactly `size`
    ///
    /// # Errors
    ///
    /// Returns [`RippleError::ReferenceUnavailable`] if the image cannot be
    /// produced at that size.
    fn raster_for(&self, size: GridSize) -> Result<Raster, RippleError>;

    /// Width over height of the original image
    fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.dimensions();
        if height == 0 {
            0.0
        } else {
            width as f32 / height as f32
        }
    }
}

/// In-memory reference resampled with nearest-neighbour lookup
#[derive(Debug, Clone)]
pub struct RasterReference {
    raster: Raster,
}

impl RasterReference {
    /// Wrap a decoded image
    #[must_use]
    pub fn new(raster: Raster) -> Self {
        Self { raster }
    }
}

impl ReferenceSource for RasterReference {
    fn dimensions(&self) -> (u32, u32) {
        let size = self.raster.size();
        (size.width(), size.height())
    }

    fn raster_for(&self, size: GridSize) -> Result<Raster, RippleError> {
        let source = self.raster.size();
        if source == size {
            return Ok(self.raster.clone());
        }

        let (src_w, src_h) = (u64::from(source.width()), u64::from(source.height()));
        let (dst_w, dst_h) = (u64::from(size.width()), u64::from(size.height()));
        Ok(Raster::from_fn(size, |x, y| {
            let sx = (u64::from(x) * src_w / dst_w) as u32;
            let sy = (u64::from(y) * src_h / dst_h) as u32;
            self.raster.pixel(sx, sy)
        }))
    }
}

/// Lifecycle state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing requested yet
    Uninitialized,
    /// Waiting for the reference image
    Loading,
    /// Frame passes and timers active
    Running,
    /// Hidden: no frame passes, no timers, field kept
    Suspended,
}

/// Owned simulation context driven by the host
pub struct Scheduler {
    config: RippleConfig,
    state: LifecycleState,
    disabled: bool,
    hidden: bool,
    source: Option<Box<dyn ReferenceSource>>,
    field: Option<Box<dyn RippleField>>,
    pointer: PointerTracker,
    ambient: RecurringTimer,
    idle_echo: RecurringTimer,
    resize: Debounce<Viewport>,
    rng: StdRng,
    frame_timer: FrameTimer,
}

impl Scheduler {
    /// Create an uninitialized scheduler
    #[must_use]
    pub fn new(config: RippleConfig) -> Self {
        Self {
            pointer: PointerTracker::new(config.pointer, config.anisotropy),
            ambient: RecurringTimer::new(config.ambient.interval),
            idle_echo: RecurringTimer::new(config.idle_echo.interval),
            resize: Debounce::new(config.resize_debounce),
            rng: StdRng::seed_from_u64(config.seed),
            frame_timer: FrameTimer::new(),
            state: LifecycleState::Uninitialized,
            disabled: false,
            hidden: false,
            source: None,
            field: None,
            config,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether the reference failed to load and the effect is off
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Tunings in use
    #[must_use]
    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    /// Active field, if one was built
    #[must_use]
    pub fn field(&self) -> Option<&dyn RippleField> {
        self.field.as_deref()
    }

    /// Grid size of the active field
    #[must_use]
    pub fn grid_size(&self) -> Option<GridSize> {
        self.field.as_ref().map(|field| field.size())
    }

    /// Pointer state
    #[must_use]
    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    /// Frame timings of recent passes
    #[must_use]
    pub fn frame_timer(&self) -> &FrameTimer {
        &self.frame_timer
    }

    /// Whether the ambient disturbance timer is running
    #[must_use]
    pub fn ambient_running(&self) -> bool {
        self.ambient.is_running()
    }

    /// Whether the idle echo timer is running
    #[must_use]
    pub fn idle_echo_running(&self) -> bool {
        self.idle_echo.is_running()
    }

    /// Start waiting for a reference image
    ///
    /// Drops any previous field and stops every timer.
    pub fn begin_loading(&mut self) {
        self.stop_timers();
        self.resize.cancel();
        self.field = None;
        self.source = None;
        self.disabled = false;
        self.state = LifecycleState::Loading;
        info!("Loading reference image");
    }

    /// The reference image is available
    ///
    /// Builds the field for `viewport` and starts running, or suspended if
    /// the surface is hidden.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid size cannot be derived or the reference
    /// cannot be produced at that size. The scheduler then stays in its
    /// current state.
    pub fn on_reference_loaded(
        &mut self,
        source: impl ReferenceSource + 'static,
        viewport: Viewport,
        now: Duration,
    ) -> Result<(), RippleError> {
        let field = self.build_field(&source, viewport)?;
        info!(
            "Reference loaded, {} field at {}x{}",
            field.name(),
            field.size().width(),
            field.size().height()
        );

        self.field = Some(field);
        self.source = Some(Box::new(source));
        self.disabled = false;
        self.resize.cancel();

        if self.hidden {
            self.state = LifecycleState::Suspended;
        } else {
            self.state = LifecycleState::Running;
            self.start_timers(now);
        }
        Ok(())
    }

    /// The reference image could not be loaded
    ///
    /// Leaves the scheduler loading but disabled; the failure is logged once
    /// and never retried.
    pub fn on_reference_failed(&mut self, reason: &str) {
        if !self.disabled {
            error!("Reference image failed to load: {}", reason);
        }
        self.stop_timers();
        self.field = None;
        self.disabled = true;
        self.state = LifecycleState::Loading;
    }

    /// The viewport changed size
    ///
    /// Only the last size of a burst is built, once the debounce delay has
    /// passed without another resize.
    pub fn on_viewport_resized(&mut self, viewport: Viewport, now: Duration) {
        if self.field.is_some() {
            debug!("Viewport resized to {}x{}", viewport.width, viewport.height);
            self.resize.schedule(viewport, now);
        }
    }

    /// The surface became hidden or visible
    ///
    /// Hiding stops the frame pass and both timers immediately; showing
    /// resumes from the kept field.
    pub fn on_visibility_changed(&mut self, hidden: bool, now: Duration) {
        self.hidden = hidden;
        match (self.state, hidden) {
            (LifecycleState::Running, true) => {
                self.stop_timers();
                self.state = LifecycleState::Suspended;
                info!("Suspended");
            }
            (LifecycleState::Suspended, false) => {
                self.start_timers(now);
                self.state = LifecycleState::Running;
                info!("Resumed");
            }
            _ => {}
        }
    }

    /// Pointer pressed
    pub fn on_pointer_down(&mut self, event: &PointerEvent, now: Duration) {
        if let Some(disturbance) = self.pointer.on_down(event, now) {
            self.inject(&disturbance);
        }
    }

    /// Pointer moved
    pub fn on_pointer_move(&mut self, event: &PointerEvent, now: Duration) {
        for disturbance in self.pointer.on_move(event, now) {
            self.inject(&disturbance);
        }
    }

    /// Pointer released or cancelled
    pub fn on_pointer_up(&mut self, id: u32) {
        self.pointer.on_up(id);
    }

    /// Pointer left the surface
    pub fn on_pointer_leave(&mut self) {
        self.pointer.on_leave();
    }

    /// Run due timers and one frame pass
    ///
    /// # Returns
    ///
    /// The composited frame, or `None` when not running
    pub fn tick(&mut self, now: Duration) -> Option<&Raster> {
        if self.disabled || self.state != LifecycleState::Running {
            return None;
        }

        if let Some(viewport) = self.resize.poll(now) {
            self.rebuild(viewport);
        }

        if self.ambient.poll(now) {
            if let Some(size) = self.grid_size() {
                let x = self.rng.random_range(0..size.width());
                let y = self.rng.random_range(0..size.height());
                let stroke = self.config.ambient.stroke;
                let disturbance =
                    Disturbance::isotropic(Vec2::new(x as f32, y as f32), stroke.force, stroke.radius);
                self.inject(&disturbance);
            }
        }

        if self.idle_echo.poll(now) {
            if let Some(position) = self.pointer.last_position() {
                let stroke = self.config.idle_echo.stroke;
                let disturbance = Disturbance::isotropic(position, stroke.force, stroke.radius)
                    .with_falloff(self.config.pointer.falloff);
                self.inject(&disturbance);
            }
        }

        let field = self.field.as_mut()?;
        let start = Instant::now();
        {
            let _scope = ProfilerScope::new("frame pass");
            field.step(now);
            field.composite();
        }
        self.frame_timer.record(start.elapsed());
        Some(field.output())
    }

    fn inject(&mut self, disturbance: &Disturbance) {
        if self.state != LifecycleState::Running {
            return;
        }
        if let Some(field) = self.field.as_mut() {
            field.inject(disturbance);
        }
    }

    fn start_timers(&mut self, now: Duration) {
        if self.config.ambient.enabled {
            self.ambient.start(now);
        }
        if self.config.idle_echo.enabled {
            self.idle_echo.start(now);
        }
    }

    fn stop_timers(&mut self) {
        self.ambient.stop();
        self.idle_echo.stop();
    }

    fn build_field(
        &self,
        source: &dyn ReferenceSource,
        viewport: Viewport,
    ) -> Result<Box<dyn RippleField>, RippleError> {
        let size = GridSize::from_viewport(viewport, source.aspect_ratio())?;
        let reference = source.raster_for(size)?;
        if reference.size() != size {
            return Err(RippleError::ReferenceUnavailable(format!(
                "source produced {}x{}, expected {}x{}",
                reference.size().width(),
                reference.size().height(),
                size.width(),
                size.height()
            )));
        }
        Ok(create_ripple_field(&self.config, reference))
    }

    /// Replace the field at the size `viewport` implies, keeping the old one on failure
    fn rebuild(&mut self, viewport: Viewport) {
        let Some(source) = self.source.as_deref() else {
            return;
        };
        match self.build_field(source, viewport) {
            Ok(field) => {
                info!(
                    "Rebuilt field at {}x{}",
                    field.size().width(),
                    field.size().height()
                );
                self.field = Some(field);
            }
            Err(e) => {
                warn!("Keeping previous field, rebuild failed: {}", e);
            }
        }
    }
}
