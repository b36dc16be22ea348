//! A text input that dissolves its content into drifting particles when submitted.
//!
//! The pieces, bottom up: a [raster::Rasterizer] renders text into pixels, [particle::sample_pixels] turns
//! the inked pixels into particles, a [dissolve::Dissolve] animates them frame by frame, and
//! [widget::VanishInput] ties it together with keystrokes, placeholders and externally delivered responses.
//! Timing is injected through [scheduler::Scheduler].

pub mod config;
pub mod conversation;
pub mod dissolve;
pub mod particle;
pub mod placeholder;
pub mod raster;
pub mod scheduler;
pub mod terminal;
pub mod widget;

pub use crate::dissolve::{Dissolve, DissolveOptions, DissolveState};
pub use crate::particle::{sample_pixels, ParticleField, SamplingOptions, TextParticle};
pub use crate::raster::{LayoutMetrics, RasterError, Rasterizer};
pub use crate::scheduler::{ClockScheduler, ManualScheduler, Scheduler, Visibility, Wakeup};
pub use crate::widget::{AnimationState, InputEvent, InputListener, InputOptions, Key, VanishInput};
