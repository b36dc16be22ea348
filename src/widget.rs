use crate::dissolve::{Dissolve, DissolveOptions, DissolveState};
use crate::particle::{ParticleField, SamplingOptions};
use crate::placeholder::PlaceholderCycle;
use crate::raster::{LayoutMetrics, Rasterizer};
use crate::scheduler::{FrameHandle, Scheduler, TimerHandle, Visibility, Wakeup};
use image::RgbaImage;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// How long a delivered response stays on screen before it vanishes.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(2000);

/// Where the widget is in its interaction cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    /// Accepting keystrokes.
    Idle,
    /// Particles are in flight; input is locked.
    Animating,
    /// Showing a delivered response read-only until the dwell delay runs out.
    Receiving,
}

/// A keystroke as the widget understands it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    /// Erase the whole line.
    ClearLine,
    Enter,
}

/// Collaborator notified about what happens inside the widget.
pub trait InputListener {
    /// The held text changed because of an accepted keystroke.
    fn on_change(&mut self, _text: &str) {}

    /// A submission finished vanishing.
    fn on_submit(&mut self, _text: &str) {}

    /// A delivered response finished vanishing.
    fn on_response_consumed(&mut self) {}
}

impl InputListener for () {}

/// A widget notification, for hosts that prefer draining a channel over implementing [InputListener].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Changed(String),
    Submitted(String),
    ResponseConsumed,
}

impl InputListener for Sender<InputEvent> {
    fn on_change(&mut self, text: &str) {
        // a dropped receiver just means nobody cares anymore
        let _ = self.send(InputEvent::Changed(text.to_string()));
    }

    fn on_submit(&mut self, text: &str) {
        let _ = self.send(InputEvent::Submitted(text.to_string()));
    }

    fn on_response_consumed(&mut self) {
        let _ = self.send(InputEvent::ResponseConsumed);
    }
}

/// Everything the widget needs to know up front.
#[derive(Clone, Debug)]
pub struct InputOptions {
    pub placeholders: Vec<String>,
    pub placeholder_interval: Duration,
    pub dwell: Duration,
    pub metrics: LayoutMetrics,
    pub sampling: SamplingOptions,
    pub dissolve: DissolveOptions,
    /// Text comes from [VanishInput::deliver_response] instead of the keyboard.
    pub receiving_mode: bool,
    pub seed: u64,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            placeholders: Vec::new(),
            placeholder_interval: crate::placeholder::DEFAULT_INTERVAL,
            dwell: DEFAULT_DWELL,
            metrics: LayoutMetrics::default(),
            sampling: SamplingOptions::default(),
            dissolve: DissolveOptions::default(),
            receiving_mode: false,
            seed: 0,
        }
    }
}

/// What the in-flight dissolve was started for.
#[derive(Debug)]
enum Vanishing {
    Submission(String),
    Response,
}

#[derive(Debug)]
struct Flight {
    dissolve: Dissolve,
    purpose: Vanishing,
    frame: Option<FrameHandle>,
}

/// A single line text input whose content dissolves into particles when submitted.
///
/// All timing goes through the [Scheduler] passed into each call, and every wakeup the scheduler hands back
/// must be routed to [VanishInput::wake]. Only one dissolve is ever in flight: submissions and deliveries that
/// arrive while one is running are dropped.
pub struct VanishInput {
    value: String,
    state: AnimationState,
    disabled: bool,
    disposed: bool,
    options: InputOptions,
    placeholders: PlaceholderCycle,
    rasterizer: Box<dyn Rasterizer>,
    listener: Box<dyn InputListener>,
    rng: fastrand::Rng,
    flight: Option<Flight>,
    dwell_timer: Option<TimerHandle>,
}

impl VanishInput {
    /// The control grows to the rasterizer's line height so that sampled text matches what is drawn.
    pub fn new(mut options: InputOptions, rasterizer: Box<dyn Rasterizer>, listener: Box<dyn InputListener>) -> Self {
        let line_height = options.metrics.top_inset + rasterizer.line_height();
        if options.metrics.height < line_height {
            log::debug!("growing input from {} to {line_height} rows", options.metrics.height);
            options.metrics.height = line_height;
        }
        let placeholders = PlaceholderCycle::new(options.placeholders.clone(), options.placeholder_interval);
        let rng = fastrand::Rng::with_seed(options.seed);
        Self {
            value: String::new(),
            state: AnimationState::Idle,
            disabled: false,
            disposed: false,
            options,
            placeholders,
            rasterizer,
            listener,
            rng,
            flight: None,
            dwell_timer: None,
        }
    }

    /// Start placeholder rotation and begin following host visibility.
    pub fn mount(&mut self, scheduler: &mut dyn Scheduler) {
        if self.disposed {
            return;
        }
        scheduler.watch_visibility(true);
        self.placeholders.start(scheduler);
    }

    /// Tear down: cancel every pending frame and timer. Wakeups arriving afterwards are ignored.
    pub fn dispose(&mut self, scheduler: &mut dyn Scheduler) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.placeholders.stop(scheduler);
        scheduler.watch_visibility(false);
        if let Some(timer) = self.dwell_timer.take() {
            scheduler.cancel_timer(timer);
        }
        if let Some(frame) = self.flight.take().and_then(|flight| flight.frame) {
            scheduler.cancel_frame(frame);
        }
        log::debug!("input disposed in state {:?}", self.state);
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether the user can currently edit the text.
    pub fn is_read_only(&self) -> bool {
        self.options.receiving_mode || self.state != AnimationState::Idle
    }

    pub fn options(&self) -> &InputOptions {
        &self.options
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    /// Suppress new submissions, e.g. while a request is pending. Running cycles are not interrupted.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// The hint to show, only while the widget is idle and empty.
    pub fn placeholder(&self) -> Option<&str> {
        if self.state != AnimationState::Idle || !self.value.is_empty() {
            return None;
        }
        self.placeholders.current()
    }

    /// The particle surface of the dissolve in flight.
    pub fn surface(&self) -> Option<&RgbaImage> {
        self.flight.as_ref().map(|flight| flight.dissolve.surface())
    }

    fn accepts_edits(&self) -> bool {
        !self.disposed && !self.disabled && !self.is_read_only()
    }

    /// Handle a keystroke.
    pub fn handle_key(&mut self, key: Key, scheduler: &mut dyn Scheduler) {
        if key == Key::Enter {
            self.submit(scheduler);
            return;
        }
        if !self.accepts_edits() {
            return;
        }
        match key {
            Key::Char(ch) if !ch.is_control() => self.value.push(ch),
            Key::Backspace => {
                if self.value.pop().is_none() {
                    return;
                }
            }
            Key::ClearLine if !self.value.is_empty() => self.value.clear(),
            _ => return,
        }
        self.listener.on_change(&self.value);
    }

    /// Replace the whole held text, as a paste or an external edit would.
    pub fn replace_value(&mut self, text: &str) {
        if !self.accepts_edits() || self.value == text {
            return;
        }
        self.value = text.to_string();
        self.listener.on_change(&self.value);
    }

    /// Submit the held text: it dissolves, and once it is gone the listener gets the trimmed text.
    pub fn submit(&mut self, scheduler: &mut dyn Scheduler) {
        if self.disposed || self.disabled || self.options.receiving_mode || self.state != AnimationState::Idle {
            log::debug!("ignoring submit in state {:?}", self.state);
            return;
        }
        let captured = self.value.trim();
        if captured.is_empty() {
            return;
        }
        let captured = captured.to_string();
        self.vanish(Vanishing::Submission(captured), scheduler);
    }

    /// Show an externally delivered response, then vanish it after the dwell delay.
    ///
    /// Dropped unless the widget is in receiving mode and idle.
    pub fn deliver_response(&mut self, text: &str, scheduler: &mut dyn Scheduler) {
        if self.disposed || !self.options.receiving_mode || text.is_empty() {
            return;
        }
        if self.state != AnimationState::Idle {
            log::debug!("dropping delivered response while {:?}", self.state);
            return;
        }
        self.value = text.to_string();
        self.state = AnimationState::Receiving;
        self.dwell_timer = Some(scheduler.set_timer(self.options.dwell));
        log::debug!("receiving response of {} bytes", text.len());
    }

    /// Route a scheduler wakeup to the widget. Wakeups for handles this widget no longer holds are ignored.
    pub fn wake(&mut self, wakeup: Wakeup, scheduler: &mut dyn Scheduler) {
        if self.disposed {
            return;
        }
        match wakeup {
            Wakeup::Frame(handle) => self.on_frame(handle, scheduler),
            Wakeup::Timer(handle) if self.dwell_timer == Some(handle) => {
                self.dwell_timer = None;
                self.vanish(Vanishing::Response, scheduler);
            }
            Wakeup::Timer(handle) => {
                self.placeholders.on_timer(handle, scheduler);
            }
            Wakeup::Visibility(visibility) => self.on_visibility(visibility, scheduler),
        }
    }

    fn on_visibility(&mut self, visibility: Visibility, scheduler: &mut dyn Scheduler) {
        self.placeholders.on_visibility(visibility, scheduler);
    }

    fn vanish(&mut self, purpose: Vanishing, scheduler: &mut dyn Scheduler) {
        let text = match &purpose {
            Vanishing::Submission(captured) => captured.as_str(),
            Vanishing::Response => self.value.as_str(),
        };
        let metrics = &self.options.metrics;
        let field = ParticleField::sample(text, self.rasterizer.as_ref(), metrics, &self.options.sampling)
            .unwrap_or_else(|e| {
                log::warn!("could not rasterize text, vanishing without particles: {e}");
                let (width, height) = metrics.surface_size();
                ParticleField::empty(width, height)
            });
        log::debug!("vanishing {} particles over {} pixels", field.len(), field.bound());
        let dissolve = Dissolve::new(field, &self.options.dissolve, self.rng.u64(..));
        let frame = Some(scheduler.request_frame());
        self.flight = Some(Flight { dissolve, purpose, frame });
        self.state = AnimationState::Animating;
    }

    fn on_frame(&mut self, handle: FrameHandle, scheduler: &mut dyn Scheduler) {
        let Some(flight) = self.flight.as_mut() else {
            return;
        };
        if flight.frame != Some(handle) {
            return;
        }
        match flight.dissolve.step() {
            DissolveState::Running => {
                log::trace!("dissolve frame {}", flight.dissolve.frames());
                flight.frame = Some(scheduler.request_frame());
            }
            DissolveState::Done => self.finish(),
        }
    }

    fn finish(&mut self) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        self.value.clear();
        self.state = AnimationState::Idle;
        log::debug!("dissolve finished after {} frames", flight.dissolve.frames());
        match flight.purpose {
            Vanishing::Submission(text) => self.listener.on_submit(&text),
            Vanishing::Response => self.listener.on_response_consumed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{CellRasterizer, FigletRasterizer};
    use crate::scheduler::ManualScheduler;
    use rstest::rstest;
    use std::sync::mpsc::{channel, Receiver};

    const FRAME_LIMIT: usize = 10_000;

    struct Harness {
        input: VanishInput,
        scheduler: ManualScheduler,
        events: Receiver<InputEvent>,
    }

    impl Harness {
        fn new(options: InputOptions) -> Self {
            Self::with_rasterizer(options, Box::new(CellRasterizer))
        }

        fn with_rasterizer(options: InputOptions, rasterizer: Box<dyn Rasterizer>) -> Self {
            let (sender, events) = channel();
            let mut input = VanishInput::new(options, rasterizer, Box::new(sender));
            let mut scheduler = ManualScheduler::new();
            input.mount(&mut scheduler);
            Self { input, scheduler, events }
        }

        fn typing() -> Self {
            Self::new(InputOptions {
                placeholders: vec!["one".into(), "two".into(), "three".into()],
                metrics: LayoutMetrics { width: 40, ..Default::default() },
                seed: 17,
                ..Default::default()
            })
        }

        fn receiving() -> Self {
            Self::new(InputOptions { receiving_mode: true, seed: 23, ..Default::default() })
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.input.handle_key(Key::Char(ch), &mut self.scheduler);
            }
        }

        fn frame(&mut self) -> usize {
            let input = &mut self.input;
            self.scheduler.run_frame(|wakeup, scheduler| input.wake(wakeup, scheduler))
        }

        fn run_frames(&mut self) -> usize {
            let input = &mut self.input;
            self.scheduler.run_frames(FRAME_LIMIT, |wakeup, scheduler| input.wake(wakeup, scheduler))
        }

        fn advance(&mut self, by: Duration) {
            let input = &mut self.input;
            self.scheduler.advance(by, |wakeup, scheduler| input.wake(wakeup, scheduler));
        }

        fn set_visibility(&mut self, visibility: Visibility) {
            let input = &mut self.input;
            self.scheduler.set_visibility(visibility, |wakeup, scheduler| input.wake(wakeup, scheduler));
        }

        fn events(&self) -> Vec<InputEvent> {
            self.events.try_iter().collect()
        }

        fn submissions(&self) -> Vec<InputEvent> {
            self.events().into_iter().filter(|e| !matches!(e, InputEvent::Changed(_))).collect()
        }
    }

    #[test]
    fn keystrokes_update_value_and_notify() {
        let mut harness = Harness::typing();
        harness.type_text("hi");
        harness.input.handle_key(Key::Backspace, &mut harness.scheduler);
        assert_eq!(harness.input.value(), "h");
        assert_eq!(
            harness.events(),
            vec![
                InputEvent::Changed("h".into()),
                InputEvent::Changed("hi".into()),
                InputEvent::Changed("h".into()),
            ]
        );
    }

    #[test]
    fn backspace_on_empty_is_silent() {
        let mut harness = Harness::typing();
        harness.input.handle_key(Key::Backspace, &mut harness.scheduler);
        harness.input.handle_key(Key::ClearLine, &mut harness.scheduler);
        assert!(harness.events().is_empty());
    }

    #[rstest]
    #[case("hello", "hello")]
    #[case("  padded text \t", "padded text")]
    #[case("x", "x")]
    fn submit_vanishes_then_reports_trimmed_text(#[case] typed: &str, #[case] expected: &str) {
        let mut harness = Harness::typing();
        harness.type_text(typed);
        harness.events();

        harness.input.handle_key(Key::Enter, &mut harness.scheduler);
        assert_eq!(harness.input.state(), AnimationState::Animating);
        assert!(harness.events().is_empty());

        let frames = harness.run_frames();
        assert!(frames > 1);
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.input.value(), "");
        assert_eq!(harness.events(), vec![InputEvent::Submitted(expected.into())]);
        assert!(!harness.scheduler.has_pending_frame());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t")]
    fn blank_submit_is_a_no_op(#[case] typed: &str) {
        let mut harness = Harness::typing();
        harness.type_text(typed);
        harness.events();
        harness.input.submit(&mut harness.scheduler);
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert!(!harness.scheduler.has_pending_frame());
        assert_eq!(harness.run_frames(), 0);
        assert!(harness.events().is_empty());
    }

    #[test]
    fn input_is_locked_while_animating() {
        let mut harness = Harness::typing();
        harness.type_text("locked");
        harness.input.submit(&mut harness.scheduler);
        harness.frame();
        harness.events();

        harness.type_text("more");
        harness.input.handle_key(Key::Backspace, &mut harness.scheduler);
        harness.input.replace_value("pasted");
        assert_eq!(harness.input.value(), "locked");
        assert!(harness.events().is_empty());
    }

    #[test]
    fn resubmitting_mid_animation_is_ignored() {
        let mut harness = Harness::typing();
        harness.type_text("once");
        harness.input.submit(&mut harness.scheduler);
        harness.frame();
        harness.input.submit(&mut harness.scheduler);
        harness.input.handle_key(Key::Enter, &mut harness.scheduler);
        // a second dissolve would have queued a second frame request
        assert_eq!(harness.frame(), 1);
        harness.run_frames();
        assert_eq!(harness.submissions(), vec![InputEvent::Submitted("once".into())]);
    }

    #[test]
    fn consecutive_submissions_are_independent() {
        let mut harness = Harness::typing();
        for text in ["same", "same"] {
            harness.type_text(text);
            harness.input.submit(&mut harness.scheduler);
            assert!(harness.input.surface().is_some());
            harness.run_frames();
            assert!(harness.input.surface().is_none());
        }
        assert_eq!(
            harness.submissions(),
            vec![InputEvent::Submitted("same".into()), InputEvent::Submitted("same".into())]
        );
    }

    #[test]
    fn disabled_suppresses_submit_and_edits() {
        let mut harness = Harness::typing();
        harness.type_text("pending");
        harness.input.set_disabled(true);
        harness.input.handle_key(Key::Enter, &mut harness.scheduler);
        harness.type_text("!");
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.input.value(), "pending");

        harness.input.set_disabled(false);
        harness.input.submit(&mut harness.scheduler);
        assert_eq!(harness.input.state(), AnimationState::Animating);
    }

    #[test]
    fn disabling_mid_animation_does_not_interrupt() {
        let mut harness = Harness::typing();
        harness.type_text("go");
        harness.input.submit(&mut harness.scheduler);
        harness.input.set_disabled(true);
        harness.run_frames();
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.submissions(), vec![InputEvent::Submitted("go".into())]);
    }

    #[test]
    fn text_without_ink_completes_on_next_frame() {
        let mut harness = Harness::new(InputOptions {
            metrics: LayoutMetrics { width: 1, left_inset: 4, ..Default::default() },
            ..Default::default()
        });
        harness.type_text("clipped");
        harness.events();
        harness.input.submit(&mut harness.scheduler);
        assert_eq!(harness.frame(), 1);
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.events(), vec![InputEvent::Submitted("clipped".into())]);
    }

    #[test]
    fn placeholder_rotates_only_for_empty_idle_value() {
        let mut harness = Harness::typing();
        let interval = harness.input.options().placeholder_interval;
        assert_eq!(harness.input.placeholder(), Some("one"));
        harness.advance(interval * 2);
        assert_eq!(harness.input.placeholder(), Some("three"));
        harness.advance(interval);
        assert_eq!(harness.input.placeholder(), Some("one"));

        harness.type_text("x");
        assert_eq!(harness.input.placeholder(), None);
        harness.input.submit(&mut harness.scheduler);
        assert_eq!(harness.input.placeholder(), None);
        harness.run_frames();
        assert_eq!(harness.input.placeholder(), Some("one"));
    }

    #[test]
    fn placeholder_pauses_while_hidden() {
        let mut harness = Harness::typing();
        let interval = harness.input.options().placeholder_interval;
        harness.set_visibility(Visibility::Hidden);
        harness.advance(interval * 5);
        assert_eq!(harness.input.placeholder(), Some("one"));
        harness.set_visibility(Visibility::Visible);
        harness.advance(interval);
        assert_eq!(harness.input.placeholder(), Some("two"));
    }

    #[test]
    fn delivered_response_dwells_then_vanishes() {
        let mut harness = Harness::receiving();
        let dwell = harness.input.options().dwell;
        harness.input.deliver_response("Hello", &mut harness.scheduler);
        assert_eq!(harness.input.state(), AnimationState::Receiving);
        assert_eq!(harness.input.value(), "Hello");
        assert!(harness.input.is_read_only());

        harness.advance(dwell - Duration::from_millis(1));
        assert_eq!(harness.input.state(), AnimationState::Receiving);
        assert!(!harness.scheduler.has_pending_frame());

        harness.advance(Duration::from_millis(1));
        assert_eq!(harness.input.state(), AnimationState::Animating);
        assert!(harness.run_frames() > 1);
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.input.value(), "");
        assert_eq!(harness.events(), vec![InputEvent::ResponseConsumed]);
    }

    #[test]
    fn second_delivery_during_cycle_is_dropped() {
        let mut harness = Harness::receiving();
        let dwell = harness.input.options().dwell;
        harness.input.deliver_response("first", &mut harness.scheduler);
        harness.input.deliver_response("second", &mut harness.scheduler);
        assert_eq!(harness.input.value(), "first");

        harness.advance(dwell);
        harness.frame();
        harness.input.deliver_response("third", &mut harness.scheduler);
        assert_eq!(harness.input.value(), "first");

        harness.run_frames();
        assert_eq!(harness.events(), vec![InputEvent::ResponseConsumed]);
        assert_eq!(harness.scheduler.pending_timers(), 0);
    }

    #[test]
    fn receiving_mode_ignores_keyboard() {
        let mut harness = Harness::receiving();
        harness.type_text("typed");
        harness.input.submit(&mut harness.scheduler);
        assert_eq!(harness.input.value(), "");
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert!(harness.events().is_empty());
    }

    #[test]
    fn typing_mode_drops_deliveries() {
        let mut harness = Harness::typing();
        harness.input.deliver_response("ignored", &mut harness.scheduler);
        assert_eq!(harness.input.state(), AnimationState::Idle);
        assert_eq!(harness.input.value(), "");
    }

    #[test]
    fn dispose_mid_animation_silences_everything() {
        let mut harness = Harness::typing();
        harness.type_text("bye");
        harness.input.submit(&mut harness.scheduler);
        harness.frame();
        harness.events();

        harness.input.dispose(&mut harness.scheduler);
        assert!(!harness.scheduler.has_pending_frame());
        assert_eq!(harness.scheduler.pending_timers(), 0);
        assert!(!harness.scheduler.is_watching_visibility());

        let index = harness.input.placeholders.index();
        harness.run_frames();
        harness.advance(Duration::from_secs(60));
        assert!(harness.events().is_empty());
        assert_eq!(harness.input.placeholders.index(), index);
    }

    #[test]
    fn stale_wakeups_after_dispose_are_no_ops() {
        let mut harness = Harness::receiving();
        harness.input.deliver_response("pending", &mut harness.scheduler);
        let stale_timer = harness.scheduler.set_timer(Duration::ZERO);
        let stale_frame = harness.scheduler.request_frame();
        harness.input.dispose(&mut harness.scheduler);

        harness.input.wake(Wakeup::Timer(stale_timer), &mut harness.scheduler);
        harness.input.wake(Wakeup::Frame(stale_frame), &mut harness.scheduler);
        harness.advance(Duration::from_secs(10));
        assert_eq!(harness.input.state(), AnimationState::Receiving);
        assert!(harness.events().is_empty());
    }

    #[test]
    fn dispose_during_dwell_cancels_the_vanish() {
        let mut harness = Harness::receiving();
        harness.input.deliver_response("Hello", &mut harness.scheduler);
        harness.input.dispose(&mut harness.scheduler);
        harness.advance(Duration::from_secs(10));
        assert_eq!(harness.run_frames(), 0);
        assert!(harness.events().is_empty());
    }

    #[test]
    fn banner_font_grows_the_control_to_its_line_height() {
        let rasterizer = FigletRasterizer::new("standard").expect("standard font missing");
        let line_height = rasterizer.line_height();
        let metrics = LayoutMetrics { height: 1, top_inset: 1, ..Default::default() };
        let options = InputOptions { metrics, ..Default::default() };
        let harness = Harness::with_rasterizer(options, Box::new(rasterizer));
        assert_eq!(harness.input.options().metrics.height, line_height + 1);
    }

    #[test]
    fn banner_submission_samples_every_shaped_row() {
        let rasterizer = FigletRasterizer::new("standard").expect("standard font missing");
        let rows = rasterizer.shape("Hi").expect("conversion failed");
        let options = InputOptions {
            metrics: LayoutMetrics { width: 40, height: 1, ..Default::default() },
            dissolve: DissolveOptions { vertical_jitter: 0.0, ..Default::default() },
            seed: 5,
            ..Default::default()
        };
        let mut harness = Harness::with_rasterizer(options, Box::new(rasterizer));
        let metrics = harness.input.options().metrics.clone();
        assert!(metrics.height as usize >= rows.len());

        harness.type_text("Hi");
        harness.input.handle_key(Key::Enter, &mut harness.scheduler);
        harness.frame();
        let surface = harness.input.surface().expect("no dissolve in flight");
        assert_eq!(surface.height(), metrics.height * metrics.scale);
        for (index, row) in rows.iter().enumerate().filter(|(_, row)| !row.trim().is_empty()) {
            let top = (metrics.top_inset + index as u32) * metrics.scale;
            let band = top..top + metrics.scale;
            let inked = surface.enumerate_pixels().any(|(_, y, pixel)| band.contains(&y) && pixel[3] > 0);
            assert!(inked, "row {index} ({row:?}) has no particles");
        }
    }
}
