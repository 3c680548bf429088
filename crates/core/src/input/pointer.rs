//! Pointer-driven disturbances
//!
//! [`PointerTracker`] turns host pointer events into [`Disturbance`]s:
//!
//! - press of the primary pointer: one circular disturbance, starts a drag
//! - move of the dragging pointer: a disturbance elongated along the motion
//! - mouse move with no button held: a throttled, weaker hover disturbance
//! - up, cancel or leave: ends the drag
//!
//! The tracker also remembers the last known pointer position for the idle
//! echo. Positions arrive already in field space (see
//! [`super::ViewportMapping`]).

use crate::config::{AnisotropyTuning, PointerTuning, Stroke};
use crate::core_types::Vec2;
use crate::solver::Disturbance;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Kind of device behind a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    /// Mouse or trackpad
    Mouse,
    /// Finger on a touch screen
    Touch,
    /// Stylus
    Pen,
}

/// One pointer event in field space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Host pointer identifier
    pub id: u32,
    /// Position in field cells
    pub position: Vec2,
    /// Device kind
    pub kind: PointerKind,
    /// Whether this is the primary pointer of its kind
    pub is_primary: bool,
    /// Bit mask of held buttons (0 when none)
    pub buttons: u32,
}

/// Recent motion of one pointer
///
/// `direction` is only refreshed while the pointer moves faster than the
/// noise speed, so jitter at rest does not spin it around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMotion {
    /// Last sampled position
    pub position: Vec2,
    /// Host time of the last sample
    pub timestamp: Duration,
    /// Speed in cells per second between the last two samples
    pub speed: f32,
    /// Unit direction of the last fast movement, if any
    pub direction: Option<Vec2>,
}

impl PointerMotion {
    /// Start tracking at a position
    #[must_use]
    pub fn new(position: Vec2, timestamp: Duration) -> Self {
        Self {
            position,
            timestamp,
            speed: 0.0,
            direction: None,
        }
    }

    /// Add a sample
    ///
    /// Samples with no elapsed time keep the previous speed.
    pub fn update(&mut self, position: Vec2, timestamp: Duration, noise_speed: f32) {
        let delta = position - self.position;
        let elapsed = timestamp.saturating_sub(self.timestamp).as_secs_f32();

        if elapsed > 0.0 {
            self.speed = delta.norm() / elapsed;
            if self.speed > noise_speed {
                if let Some(direction) = delta.try_normalize(f32::EPSILON) {
                    self.direction = Some(direction);
                }
            }
            self.timestamp = timestamp;
        }
        self.position = position;
    }
}

/// Pointer state machine
#[derive(Debug, Clone)]
pub struct PointerTracker {
    tuning: PointerTuning,
    anisotropy: AnisotropyTuning,
    active: Option<u32>,
    motion: Option<(u32, PointerMotion)>,
    last_position: Option<Vec2>,
    last_hover: Option<Duration>,
}

impl PointerTracker {
    /// Create an idle tracker
    #[must_use]
    pub fn new(tuning: PointerTuning, anisotropy: AnisotropyTuning) -> Self {
        Self {
            tuning,
            anisotropy,
            active: None,
            motion: None,
            last_position: None,
            last_hover: None,
        }
    }

    /// Pointer id of the running drag
    #[must_use]
    pub fn active_pointer(&self) -> Option<u32> {
        self.active
    }

    /// Last known pointer position, cleared when the pointer leaves
    #[must_use]
    pub fn last_position(&self) -> Option<Vec2> {
        self.last_position
    }

    fn press_stroke(&self, kind: PointerKind) -> Stroke {
        match kind {
            PointerKind::Mouse => self.tuning.mouse_press,
            PointerKind::Touch | PointerKind::Pen => self.tuning.touch_press,
        }
    }

    fn drag_stroke(&self, kind: PointerKind) -> Stroke {
        match kind {
            PointerKind::Mouse => self.tuning.mouse_drag,
            PointerKind::Touch | PointerKind::Pen => self.tuning.touch_drag,
        }
    }

    fn track(&mut self, event: &PointerEvent, now: Duration) -> PointerMotion {
        let noise_speed = self.anisotropy.noise_speed;
        match &mut self.motion {
            Some((id, motion)) if *id == event.id => {
                motion.update(event.position, now, noise_speed);
                *motion
            }
            slot => {
                let motion = PointerMotion::new(event.position, now);
                *slot = Some((event.id, motion));
                motion
            }
        }
    }

    /// Pointer pressed
    ///
    /// Only the primary pointer starts a drag; other presses are ignored.
    pub fn on_down(&mut self, event: &PointerEvent, now: Duration) -> Option<Disturbance> {
        if !event.is_primary {
            return None;
        }

        self.active = Some(event.id);
        self.last_position = Some(event.position);
        self.motion = Some((event.id, PointerMotion::new(event.position, now)));
        trace!("Drag started by pointer {}", event.id);

        let stroke = self.press_stroke(event.kind);
        Some(
            Disturbance::isotropic(event.position, stroke.force, stroke.radius)
                .with_falloff(self.tuning.falloff),
        )
    }

    /// Pointer moved
    ///
    /// Returns the hover disturbance (mouse with no buttons, throttled) and
    /// the drag disturbance (active pointer only), in that order.
    pub fn on_move(&mut self, event: &PointerEvent, now: Duration) -> Vec<Disturbance> {
        let mut disturbances = Vec::new();
        self.last_position = Some(event.position);
        let motion = self.track(event, now);

        if self.tuning.hover_enabled && event.kind == PointerKind::Mouse && event.buttons == 0 {
            let due = match self.last_hover {
                Some(last) => now.saturating_sub(last) >= self.tuning.hover_interval,
                None => true,
            };
            if due {
                self.last_hover = Some(now);
                let hover = self.tuning.hover;
                disturbances.push(
                    Disturbance::isotropic(event.position, hover.force, hover.radius)
                        .with_falloff(self.tuning.falloff),
                );
            }
        }

        if self.active == Some(event.id) {
            disturbances.push(Disturbance::from_motion(
                event.position,
                self.drag_stroke(event.kind),
                motion.speed,
                motion.direction,
                &self.anisotropy,
                self.tuning.falloff,
            ));
        }

        disturbances
    }

    /// Pointer released or cancelled
    ///
    /// Ends the drag if `id` is the dragging pointer.
    pub fn on_up(&mut self, id: u32) {
        if self.active == Some(id) {
            trace!("Drag ended by pointer {}", id);
            self.active = None;
        }
    }

    /// Pointer left the surface
    ///
    /// Ends any drag and forgets the last position, which stops the idle echo.
    pub fn on_leave(&mut self) {
        self.active = None;
        self.last_position = None;
    }
}
