use crate::particle::{ParticleField, TextParticle};
use image::{Rgba, RgbaImage};

/// Tuning for how particles drift and fade.
#[derive(Clone, Debug, PartialEq)]
pub struct DissolveOptions {
    /// Smallest horizontal step, in pixels per frame. Must be positive so every animation ends.
    pub min_step: f32,
    pub max_step: f32,
    /// Vertical drift and per frame jitter are drawn from `-vertical_jitter..=vertical_jitter`.
    pub vertical_jitter: f32,
    /// Alpha is multiplied by a per particle factor in `min_decay..=max_decay` every frame.
    pub min_decay: f32,
    pub max_decay: f32,
}

impl Default for DissolveOptions {
    fn default() -> Self {
        Self { min_step: 1.0, max_step: 3.0, vertical_jitter: 0.5, min_decay: 0.90, max_decay: 0.97 }
    }
}

/// The outcome of advancing a dissolve by one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DissolveState {
    /// Particles are still in flight; schedule another frame.
    Running,
    /// Every particle has cleared the text.
    Done,
}

#[derive(Clone, Debug)]
struct DriftingParticle {
    origin: TextParticle,
    dx: f32,
    dy: f32,
    step: f32,
    drift: f32,
    alpha: f32,
    decay: f32,
}

/// A running dissolve over one sampled particle field.
///
/// Each call to [Dissolve::step] is one frame: particles move right by their own step, wander vertically,
/// fade, and the surface is redrawn. The dissolve is done once every particle has moved at least as far
/// as the field's rightmost particle, which clears the whole text area.
#[derive(Debug)]
pub struct Dissolve {
    particles: Vec<DriftingParticle>,
    bound: f32,
    surface: RgbaImage,
    rng: fastrand::Rng,
    jitter: f32,
    frames: u32,
    done: bool,
}

impl Dissolve {
    pub fn new(field: ParticleField, options: &DissolveOptions, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let min_step = if options.min_step.is_finite() && options.min_step > 0.0 {
            options.min_step
        } else {
            DissolveOptions::default().min_step
        };
        let max_step = options.max_step.max(min_step);
        // NaN falls back to the nearest bound
        let min_decay = options.min_decay.max(f32::EPSILON).min(1.0);
        let max_decay = options.max_decay.max(min_decay).min(1.0);
        let jitter = if options.vertical_jitter.is_finite() { options.vertical_jitter.abs() } else { 0.0 };
        let particles = field
            .particles()
            .iter()
            .map(|origin| DriftingParticle {
                origin: *origin,
                dx: 0.0,
                dy: 0.0,
                step: between(&mut rng, min_step, max_step),
                drift: between(&mut rng, -jitter, jitter),
                alpha: 1.0,
                decay: between(&mut rng, min_decay, max_decay),
            })
            .collect();
        let (width, height) = field.surface_size();
        Self {
            particles,
            bound: field.bound() as f32,
            surface: RgbaImage::new(width, height),
            rng,
            jitter,
            frames: 0,
            done: false,
        }
    }

    /// Advance one frame.
    pub fn step(&mut self) -> DissolveState {
        if self.done {
            return DissolveState::Done;
        }
        if self.particles.is_empty() {
            self.done = true;
            return DissolveState::Done;
        }
        for particle in &mut self.particles {
            particle.dx += particle.step;
            particle.dy += particle.drift + between(&mut self.rng, -self.jitter, self.jitter);
            particle.alpha *= particle.decay;
        }
        self.frames += 1;
        self.redraw();
        if self.particles.iter().all(|p| p.dx >= self.bound) {
            self.done = true;
            self.clear();
            DissolveState::Done
        } else {
            DissolveState::Running
        }
    }

    /// The surface as drawn by the last frame.
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// How many frames did actual work.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The horizontal distance every particle must cover.
    pub fn bound(&self) -> f32 {
        self.bound
    }

    /// The smallest distance traveled by any particle so far.
    pub fn min_displacement(&self) -> f32 {
        self.particles.iter().map(|p| p.dx).fold(f32::INFINITY, f32::min)
    }

    /// Current positions and colors of every particle, including those drifted off the surface.
    pub fn positions(&self) -> impl Iterator<Item = (f32, f32, Rgba<u8>)> + '_ {
        self.particles.iter().map(|p| {
            let (x, y) = p.position();
            (x, y, p.color())
        })
    }

    fn clear(&mut self) {
        self.surface.pixels_mut().for_each(|pixel| *pixel = Rgba([0, 0, 0, 0]));
    }

    fn redraw(&mut self) {
        self.clear();
        let (width, height) = self.surface.dimensions();
        for particle in &self.particles {
            let (x, y) = particle.position();
            let (x, y) = (x.round(), y.round());
            if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
                continue;
            }
            let color = particle.color();
            if color[3] > 0 {
                self.surface.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

impl DriftingParticle {
    fn position(&self) -> (f32, f32) {
        (self.origin.x as f32 + self.dx, self.origin.y as f32 + self.dy)
    }

    fn color(&self) -> Rgba<u8> {
        let alpha = (self.origin.a as f32 * self.alpha).round().clamp(0.0, 255.0) as u8;
        Rgba([self.origin.r, self.origin.g, self.origin.b, alpha])
    }
}

fn between(rng: &mut fastrand::Rng, low: f32, high: f32) -> f32 {
    low + rng.f32() * (high - low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::SamplingOptions;
    use crate::raster::{CellRasterizer, LayoutMetrics};
    use rstest::rstest;

    fn field(text: &str) -> ParticleField {
        let metrics = LayoutMetrics { width: 20, height: 1, ..Default::default() };
        ParticleField::sample(text, &CellRasterizer, &metrics, &SamplingOptions::default()).expect("sampling failed")
    }

    fn run(dissolve: &mut Dissolve) -> u32 {
        let mut guard = 0;
        while dissolve.step() == DissolveState::Running {
            guard += 1;
            assert!(guard < 10_000, "dissolve never finished");
        }
        dissolve.frames()
    }

    #[test]
    fn empty_field_finishes_without_frame_work() {
        let mut dissolve = Dissolve::new(ParticleField::empty(10, 2), &DissolveOptions::default(), 1);
        assert_eq!(dissolve.step(), DissolveState::Done);
        assert_eq!(dissolve.frames(), 0);
    }

    #[rstest]
    #[case("a")]
    #[case("hello")]
    #[case("a much longer line of text")]
    fn finishes_once_everything_cleared_the_text(#[case] text: &str) {
        let field = field(text);
        let bound = field.bound() as f32;
        let mut dissolve = Dissolve::new(field, &DissolveOptions::default(), 7);
        run(&mut dissolve);
        assert!(dissolve.min_displacement() >= bound);
        assert!(dissolve.is_done());
    }

    #[test]
    fn frame_count_follows_slowest_particle() {
        let options = DissolveOptions { min_step: 2.0, max_step: 2.0, ..Default::default() };
        let field = field("hello");
        let bound = field.bound();
        let mut dissolve = Dissolve::new(field, &options, 3);
        let frames = run(&mut dissolve);
        assert_eq!(frames, bound.div_ceil(2));
    }

    #[test]
    fn wider_text_takes_longer() {
        let options = DissolveOptions::default();
        let short = run(&mut Dissolve::new(field("ab"), &options, 5));
        let long = run(&mut Dissolve::new(field("abcdefghijkl"), &options, 5));
        assert!(long > short);
    }

    #[test]
    fn particles_fade_and_surface_is_redrawn() {
        let mut dissolve = Dissolve::new(field("hello"), &DissolveOptions::default(), 11);
        assert_eq!(dissolve.step(), DissolveState::Running);
        let drawn: Vec<_> = dissolve.surface().pixels().filter(|p| p[3] > 0).collect();
        assert!(!drawn.is_empty());
        assert!(drawn.iter().all(|p| p[3] < 255));
    }

    #[test]
    fn surface_is_cleared_when_done() {
        let mut dissolve = Dissolve::new(field("hey"), &DissolveOptions::default(), 2);
        run(&mut dissolve);
        assert!(dissolve.surface().pixels().all(|p| p[3] == 0));
        assert_eq!(dissolve.step(), DissolveState::Done);
    }

    #[test]
    fn same_seed_same_trajectories() {
        let options = DissolveOptions::default();
        let mut first = Dissolve::new(field("seeded"), &options, 42);
        let mut second = Dissolve::new(field("seeded"), &options, 42);
        for _ in 0..3 {
            first.step();
            second.step();
        }
        let first: Vec<_> = first.positions().collect();
        let second: Vec<_> = second.positions().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn particles_drift_independently() {
        let mut dissolve = Dissolve::new(field("drift"), &DissolveOptions::default(), 9);
        dissolve.step();
        let offsets: Vec<f32> = dissolve
            .positions()
            .zip(dissolve.particles.iter())
            .map(|((x, _, _), p)| x - p.origin.x as f32)
            .collect();
        assert!(offsets.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[rstest]
    #[case(DissolveOptions { min_decay: f32::NAN, ..Default::default() })]
    #[case(DissolveOptions { max_decay: f32::NAN, ..Default::default() })]
    #[case(DissolveOptions { min_step: f32::NAN, max_step: f32::NAN, ..Default::default() })]
    #[case(DissolveOptions { min_step: -1.0, vertical_jitter: f32::INFINITY, ..Default::default() })]
    fn unusable_options_still_finish(#[case] options: DissolveOptions) {
        let mut dissolve = Dissolve::new(field("hello"), &options, 9);
        run(&mut dissolve);
        assert!(dissolve.is_done());
        assert!(dissolve.surface().pixels().all(|p| p[3] == 0));
    }
}
