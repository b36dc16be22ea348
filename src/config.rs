use crate::conversation::Webhook;
use crate::dissolve::DissolveOptions;
use crate::particle::SamplingOptions;
use crate::raster::{InkStyle, LayoutMetrics, CELL_FONT};
use crate::widget::InputOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PLACEHOLDERS: &[&str] = &[
    "What's the first rule of Fight Club?",
    "Who is Tyler Durden?",
    "Where is Andrew Laeddis Hiding?",
    "Write a Javascript method to reverse a string",
    "How to assemble your own PC?",
];

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub placeholders: Vec<String>,
    pub placeholder_interval_ms: u64,
    pub dwell_ms: u64,
    /// Seed for particle trajectories. Picked at random when unset.
    pub seed: Option<u64>,
    /// `cell` or the name of a FIGlet font.
    pub font: String,
    pub ink: InkStyle,
    pub layout: LayoutConfig,
    pub sampling: SamplingConfig,
    pub dissolve: DissolveConfig,
    /// Endpoints selectable with `/name`. The first one is the default.
    pub webhooks: Vec<Webhook>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            placeholder_interval_ms: 3000,
            dwell_ms: 2000,
            seed: None,
            font: CELL_FONT.to_string(),
            ink: InkStyle::default(),
            layout: LayoutConfig::default(),
            sampling: SamplingConfig::default(),
            dissolve: DissolveConfig::default(),
            webhooks: Vec::new(),
        }
    }
}

/// Control geometry, in terminal cells.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub left_inset: u32,
    pub top_inset: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { width: 72, height: 1, left_inset: 2, top_inset: 0 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    pub scale: u32,
    pub step: u32,
    pub alpha_threshold: u8,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let options = SamplingOptions::default();
        Self { scale: 2, step: options.step, alpha_threshold: options.alpha_threshold }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DissolveConfig {
    pub min_step: f32,
    pub max_step: f32,
    pub vertical_jitter: f32,
    pub min_decay: f32,
    pub max_decay: f32,
}

impl Default for DissolveConfig {
    fn default() -> Self {
        let DissolveOptions { min_step, max_step, vertical_jitter, min_decay, max_decay } = DissolveOptions::default();
        Self { min_step, max_step, vertical_jitter, min_decay, max_decay }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&contents)
    }

    /// Load the configuration from the default location, falling back to defaults when there is none.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/vanish/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vanish").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dissolve = &self.dissolve;
        if dissolve.min_step.is_nan() || dissolve.min_step <= 0.0 {
            return Err(ConfigError::Invalid("dissolve.min_step must be positive".into()));
        }
        if dissolve.max_step < dissolve.min_step {
            return Err(ConfigError::Invalid("dissolve.max_step must not be smaller than min_step".into()));
        }
        let decay_range = 0.0..=1.0;
        if !decay_range.contains(&dissolve.min_decay)
            || !decay_range.contains(&dissolve.max_decay)
            || dissolve.min_decay == 0.0
            || dissolve.max_decay < dissolve.min_decay
        {
            return Err(ConfigError::Invalid("dissolve decay must satisfy 0 < min_decay <= max_decay <= 1".into()));
        }
        if self.sampling.scale == 0 || self.sampling.step == 0 {
            return Err(ConfigError::Invalid("sampling.scale and sampling.step must be positive".into()));
        }
        if self.layout.width == 0 || self.layout.height == 0 {
            return Err(ConfigError::Invalid("layout.width and layout.height must be positive".into()));
        }
        if self.placeholder_interval_ms == 0 {
            return Err(ConfigError::Invalid("placeholder_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn metrics(&self) -> LayoutMetrics {
        let LayoutConfig { width, height, left_inset, top_inset } = self.layout;
        LayoutMetrics { width, height, left_inset, top_inset, scale: self.sampling.scale, ink: self.ink.clone() }
    }

    /// Widget options for this configuration.
    pub fn input_options(&self, receiving_mode: bool, seed: u64) -> InputOptions {
        let DissolveConfig { min_step, max_step, vertical_jitter, min_decay, max_decay } = self.dissolve;
        InputOptions {
            placeholders: if receiving_mode { Vec::new() } else { self.placeholders.clone() },
            placeholder_interval: Duration::from_millis(self.placeholder_interval_ms),
            dwell: Duration::from_millis(self.dwell_ms),
            metrics: self.metrics(),
            sampling: SamplingOptions { step: self.sampling.step, alpha_threshold: self.sampling.alpha_threshold },
            dissolve: DissolveOptions { min_step, max_step, vertical_jitter, min_decay, max_decay },
            receiving_mode,
            seed,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading '{0}': {1}")]
    Read(PathBuf, std::io::Error),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
