//! Host-clock timers polled from the frame loop
//!
//! Neither timer owns a thread or reads a clock; both are driven by the
//! monotonic `now` the host passes to every handler.

use std::time::Duration;

/// Fixed-interval timer with explicit start and stop
///
/// Starting a running timer or stopping a stopped one does nothing. Missed
/// intervals are not replayed: after a long gap the timer fires once and
/// reschedules from `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringTimer {
    interval: Duration,
    next_due: Option<Duration>,
}

impl RecurringTimer {
    /// Create a stopped timer
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Start the timer; first fire one interval after `now`
    pub fn start(&mut self, now: Duration) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    /// Stop the timer
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Whether the timer is running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Check whether the timer fired since the last poll
    ///
    /// Returns `true` at most once per call.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next > now { next } else { now + self.interval });
                true
            }
            _ => false,
        }
    }
}

/// One-shot delay where every new value restarts the wait
///
/// Only the last scheduled value is delivered, once the quiet period has
/// elapsed without a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(Duration, T)>,
}

impl<T> Debounce<T> {
    /// Create an idle debounce
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `value`, replacing anything pending
    pub fn schedule(&mut self, value: T, now: Duration) {
        self.pending = Some((now + self.delay, value));
    }

    /// Drop the pending value
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a value is waiting
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if its quiet period has elapsed
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        let due = self.pending.as_ref().map(|(due, _)| *due)?;
        if now < due {
            return None;
        }
        self.pending.take().map(|(_, value)| value)
    }
}
