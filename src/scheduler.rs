//! The host's timing primitives.
//!
//! Widgets never sleep or spawn anything. They ask a [Scheduler] for frames and timers, get a handle back,
//! and later receive a [Wakeup] carrying that handle. A wakeup whose handle the widget no longer holds is
//! stale and ignored, so cancelling is always safe even if the host has already queued the wakeup.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Identifies a requested animation frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(u64);

/// Identifies a pending one-shot timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Whether the host is in the foreground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Something the scheduler delivers back to a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wakeup {
    Frame(FrameHandle),
    Timer(TimerHandle),
    Visibility(Visibility),
}

/// Timing capability injected into widgets.
pub trait Scheduler {
    /// Request one callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Request one callback once `delay` has elapsed.
    fn set_timer(&mut self, delay: Duration) -> TimerHandle;

    fn cancel_timer(&mut self, handle: TimerHandle);

    /// Start or stop delivering foreground/background transitions.
    fn watch_visibility(&mut self, watch: bool);
}

/// Handles plus pending requests, shared by both scheduler implementations.
#[derive(Debug, Default)]
struct Pending {
    next_id: u64,
    frames: Vec<FrameHandle>,
    timers: BTreeMap<(Duration, u64), TimerHandle>,
    watchers: usize,
}

impl Pending {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.frames.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|pending| *pending != handle);
    }

    fn set_timer(&mut self, deadline: Duration) -> TimerHandle {
        let id = self.next_id();
        let handle = TimerHandle(id);
        self.timers.insert((deadline, id), handle);
        handle
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.retain(|_, pending| *pending != handle);
    }

    fn watch_visibility(&mut self, watch: bool) {
        if watch {
            self.watchers += 1;
        } else {
            self.watchers = self.watchers.saturating_sub(1);
        }
    }

    /// Pop the earliest timer due at or before `now`.
    fn pop_due(&mut self, now: Duration) -> Option<(Duration, TimerHandle)> {
        let (&(deadline, id), _) = self.timers.iter().next()?;
        if deadline > now {
            return None;
        }
        self.timers.remove(&(deadline, id)).map(|handle| (deadline, handle))
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }
}

/// A scheduler driven entirely by its owner, one simulated frame or time step at a time.
///
/// Every `run_*`/`advance` method takes a delivery callback that receives each wakeup along with the
/// scheduler itself, so the receiver can request more frames and timers while being woken.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    pending: Pending,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire every frame requested before this call. Returns how many were delivered.
    pub fn run_frame<F>(&mut self, mut deliver: F) -> usize
    where
        F: FnMut(Wakeup, &mut Self),
    {
        let frames = std::mem::take(&mut self.pending.frames);
        let count = frames.len();
        for frame in frames {
            deliver(Wakeup::Frame(frame), self);
        }
        count
    }

    /// Run frames until none are requested anymore, up to `limit`. Returns how many frames ran.
    pub fn run_frames<F>(&mut self, limit: usize, mut deliver: F) -> usize
    where
        F: FnMut(Wakeup, &mut Self),
    {
        let mut frames = 0;
        while frames < limit && self.has_pending_frame() {
            self.run_frame(&mut deliver);
            frames += 1;
        }
        frames
    }

    /// Move simulated time forward, firing timers in deadline order as they come due.
    pub fn advance<F>(&mut self, by: Duration, mut deliver: F)
    where
        F: FnMut(Wakeup, &mut Self),
    {
        let target = self.now + by;
        while let Some((deadline, handle)) = self.pending.pop_due(target) {
            self.now = deadline;
            deliver(Wakeup::Timer(handle), self);
        }
        self.now = target;
    }

    /// Report a visibility transition to whoever is watching.
    pub fn set_visibility<F>(&mut self, visibility: Visibility, mut deliver: F)
    where
        F: FnMut(Wakeup, &mut Self),
    {
        if self.pending.watchers > 0 {
            deliver(Wakeup::Visibility(visibility), self);
        }
    }

    pub fn has_pending_frame(&self) -> bool {
        !self.pending.frames.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.pending.timers.len()
    }

    pub fn is_watching_visibility(&self) -> bool {
        self.pending.watchers > 0
    }
}

impl Scheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.pending.request_frame()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.cancel_frame(handle);
    }

    fn set_timer(&mut self, delay: Duration) -> TimerHandle {
        self.pending.set_timer(self.now + delay)
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.pending.cancel_timer(handle);
    }

    fn watch_visibility(&mut self, watch: bool) {
        self.pending.watch_visibility(watch);
    }
}

/// A scheduler backed by the wall clock, delivering frames at a fixed rate.
#[derive(Debug)]
pub struct ClockScheduler {
    started: Instant,
    frame_interval: Duration,
    last_frame: Option<Duration>,
    pending: Pending,
}

impl ClockScheduler {
    pub fn new(frames_per_second: u32) -> Self {
        let frame_interval = Duration::from_secs(1) / frames_per_second.max(1);
        Self { started: Instant::now(), frame_interval, last_frame: None, pending: Pending::default() }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn next_frame_at(&self) -> Option<Duration> {
        if self.pending.frames.is_empty() {
            return None;
        }
        Some(self.last_frame.map(|last| last + self.frame_interval).unwrap_or_default())
    }

    /// How long the host can block waiting for input before something is due.
    pub fn time_until_next(&self) -> Option<Duration> {
        let next = match (self.next_frame_at(), self.pending.next_deadline()) {
            (Some(frame), Some(timer)) => frame.min(timer),
            (frame, timer) => frame.or(timer)?,
        };
        Some(next.saturating_sub(self.elapsed()))
    }

    /// Collect every wakeup that is due right now. Frames requested while handling these wait for the next
    /// frame slot.
    pub fn poll(&mut self) -> Vec<Wakeup> {
        let now = self.elapsed();
        let mut due = Vec::new();
        while let Some((_, handle)) = self.pending.pop_due(now) {
            due.push(Wakeup::Timer(handle));
        }
        if self.next_frame_at().is_some_and(|at| at <= now) {
            self.last_frame = Some(now);
            due.extend(self.pending.frames.drain(..).map(Wakeup::Frame));
        }
        due
    }

    /// Turn a host focus change into a wakeup, if anyone is watching.
    pub fn visibility_changed(&self, visibility: Visibility) -> Option<Wakeup> {
        (self.pending.watchers > 0).then_some(Wakeup::Visibility(visibility))
    }
}

impl Scheduler for ClockScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.pending.request_frame()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.cancel_frame(handle);
    }

    fn set_timer(&mut self, delay: Duration) -> TimerHandle {
        let deadline = self.elapsed() + delay;
        self.pending.set_timer(deadline)
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.pending.cancel_timer(handle);
    }

    fn watch_visibility(&mut self, watch: bool) {
        self.pending.watch_visibility(watch);
    }
}
