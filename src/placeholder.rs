use crate::scheduler::{Scheduler, TimerHandle, Visibility};
use std::time::Duration;

/// Rotation period used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// Rotates through hint strings on a fixed interval.
///
/// Rotation stops while the host is hidden. Coming back restarts the interval from zero rather than
/// catching up on the ticks missed while hidden.
#[derive(Debug)]
pub struct PlaceholderCycle {
    items: Vec<String>,
    index: usize,
    interval: Duration,
    active: bool,
    timer: Option<TimerHandle>,
}

impl PlaceholderCycle {
    pub fn new(items: Vec<String>, interval: Duration) -> Self {
        Self { items, index: 0, interval, active: false, timer: None }
    }

    /// The hint currently on display, if there is any.
    pub fn current(&self) -> Option<&str> {
        self.items.get(self.index).map(String::as_str)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Start rotating. A no-op with fewer than two hints since there is nothing to rotate to.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        if self.active || self.items.len() < 2 {
            return;
        }
        self.active = true;
        self.timer = Some(scheduler.set_timer(self.interval));
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.active = false;
        if let Some(timer) = self.timer.take() {
            scheduler.cancel_timer(timer);
        }
    }

    /// Handle a fired timer. Returns whether the timer belonged to this cycle.
    pub fn on_timer(&mut self, handle: TimerHandle, scheduler: &mut dyn Scheduler) -> bool {
        if self.timer != Some(handle) {
            return false;
        }
        self.index = (self.index + 1) % self.items.len();
        self.timer = Some(scheduler.set_timer(self.interval));
        log::trace!("placeholder rotated to {}", self.index);
        true
    }

    pub fn on_visibility(&mut self, visibility: Visibility, scheduler: &mut dyn Scheduler) {
        match visibility {
            Visibility::Hidden => self.stop(scheduler),
            Visibility::Visible => self.start(scheduler),
        }
    }
}
