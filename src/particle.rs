use crate::raster::{LayoutMetrics, RasterError, Rasterizer};
use image::RgbaImage;

/// Pixels whose alpha is at or below this are treated as background.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 0;

/// Sample every pixel by default; the surface is already rendered at twice the control's resolution.
pub const DEFAULT_SAMPLE_STEP: u32 = 1;

/// A single sampled pixel of rendered text.
///
/// Coordinates are raster pixels relative to the control's top-left corner, so a particle sits exactly where
/// its glyph is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextParticle {
    pub x: u32,
    pub y: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Scan a raster surface every `step` pixels in both axes and keep the inked ones.
pub fn sample_pixels(buffer: &RgbaImage, step: u32, alpha_threshold: u8) -> Vec<TextParticle> {
    let step = step.max(1) as usize;
    let mut particles = Vec::new();
    for y in (0..buffer.height()).step_by(step) {
        for x in (0..buffer.width()).step_by(step) {
            let [r, g, b, a] = buffer.get_pixel(x, y).0;
            if a > alpha_threshold {
                particles.push(TextParticle { x, y, r, g, b, a });
            }
        }
    }
    particles
}

/// How text is turned into particles.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingOptions {
    pub step: u32,
    pub alpha_threshold: u8,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self { step: DEFAULT_SAMPLE_STEP, alpha_threshold: DEFAULT_ALPHA_THRESHOLD }
    }
}

/// The particles sampled from one piece of text, plus the horizontal distance they must travel to clear it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleField {
    particles: Vec<TextParticle>,
    bound: u32,
    width: u32,
    height: u32,
}

impl ParticleField {
    /// Rasterize and sample the given text.
    pub fn sample(
        text: &str,
        rasterizer: &dyn Rasterizer,
        metrics: &LayoutMetrics,
        options: &SamplingOptions,
    ) -> Result<Self, RasterError> {
        let buffer = rasterizer.rasterize(text, metrics)?;
        let particles = sample_pixels(&buffer, options.step, options.alpha_threshold);
        Ok(Self::from_particles(particles, buffer.width(), buffer.height()))
    }

    /// Wrap an already sampled set of particles living on a `width` x `height` surface.
    pub fn from_particles(particles: Vec<TextParticle>, width: u32, height: u32) -> Self {
        // the rightmost particle decides how far everything has to drift
        let bound = particles.iter().map(|p| p.x).max().unwrap_or(0);
        Self { particles, bound, width, height }
    }

    /// An empty field on a surface of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::from_particles(Vec::new(), width, height)
    }

    pub fn particles(&self) -> &[TextParticle] {
        &self.particles
    }

    /// The rightmost x coordinate among all particles.
    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::CellRasterizer;
    use image::Rgba;
    use rstest::rstest;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics { width: 16, height: 1, left_inset: 1, top_inset: 0, scale: 2, ..Default::default() }
    }

    #[test]
    fn keeps_only_inked_pixels() {
        let mut buffer = RgbaImage::new(4, 4);
        buffer.put_pixel(1, 2, Rgba([10, 20, 30, 200]));
        buffer.put_pixel(3, 3, Rgba([1, 1, 1, 0]));
        let particles = sample_pixels(&buffer, 1, 0);
        assert_eq!(particles, vec![TextParticle { x: 1, y: 2, r: 10, g: 20, b: 30, a: 200 }]);
    }

    #[rstest]
    #[case::faint_dropped(5, 0)]
    #[case::visible_kept(4, 1)]
    fn alpha_threshold(#[case] threshold: u8, #[case] expected: usize) {
        let mut buffer = RgbaImage::new(2, 2);
        buffer.put_pixel(0, 0, Rgba([255, 255, 255, 5]));
        assert_eq!(sample_pixels(&buffer, 1, threshold).len(), expected);
    }

    #[rstest]
    #[case(1, 64)]
    #[case(2, 16)]
    #[case(4, 4)]
    fn step_thins_the_grid(#[case] step: u32, #[case] expected: usize) {
        let mut buffer = RgbaImage::new(8, 8);
        buffer.pixels_mut().for_each(|p| *p = Rgba([255, 255, 255, 255]));
        assert_eq!(sample_pixels(&buffer, step, 0).len(), expected);
    }

    #[test]
    fn empty_text_yields_empty_field() {
        let field = ParticleField::sample("", &CellRasterizer, &metrics(), &SamplingOptions::default())
            .expect("sampling failed");
        assert!(field.is_empty());
        assert_eq!(field.bound(), 0);
        assert_eq!(field.surface_size(), (32, 2));
    }

    #[test]
    fn bound_is_rightmost_particle() {
        let field = ParticleField::sample("abc", &CellRasterizer, &metrics(), &SamplingOptions::default())
            .expect("sampling failed");
        // inset of one cell, three glyphs two pixels wide each
        assert_eq!(field.len(), 12);
        assert_eq!(field.bound(), 7);
        assert!(field.particles().iter().all(|p| p.x >= 2));
    }

    #[test]
    fn sampling_is_deterministic() {
        let options = SamplingOptions::default();
        let first = ParticleField::sample("hello", &CellRasterizer, &metrics(), &options).expect("sampling failed");
        let second = ParticleField::sample("hello", &CellRasterizer, &metrics(), &options).expect("sampling failed");
        assert_eq!(first, second);
    }
}
