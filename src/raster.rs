use figlet_rs::FIGfont;
use image::{Rgba, RgbaImage};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::str::FromStr;
use unicode_width::UnicodeWidthChar;

/// The name used to select the one-glyph-per-cell rasterizer.
pub const CELL_FONT: &str = "cell";

/// Geometry of the visible control, in terminal cells.
///
/// The raster surface is `width * scale` by `height * scale` pixels and glyphs are painted starting at
/// `(left_inset, top_inset)` so that sampled particles line up with the text the user sees.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutMetrics {
    pub width: u32,
    pub height: u32,
    pub left_inset: u32,
    pub top_inset: u32,
    pub scale: u32,
    pub ink: InkStyle,
}

impl LayoutMetrics {
    /// The raster surface dimensions in pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        let scale = self.scale.max(1);
        (self.width * scale, self.height * scale)
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self { width: 64, height: 1, left_inset: 2, top_inset: 0, scale: 2, ink: InkStyle::default() }
    }
}

/// An RGB color, written as `#rrggbb` in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = RasterError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(RasterError::InvalidColor(input.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| RasterError::InvalidColor(input.to_string()))
        };
        Ok(Self(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = RasterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// How glyph ink is colored on the raster surface. Written as `rainbow` or `#rrggbb` in configuration files.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum InkStyle {
    Solid(Rgb),
    /// A hue gradient that sweeps once across the control's width.
    Rainbow,
}

impl InkStyle {
    /// The ink color for a glyph at the given column of a control `total_columns` wide.
    pub fn color_at(&self, column: u32, total_columns: u32) -> Rgb {
        match self {
            Self::Solid(color) => *color,
            Self::Rainbow => {
                let hue = (column as f32 / total_columns.max(1) as f32) * 360.0;
                hsl_to_rgb(hue, 100.0, 60.0)
            }
        }
    }
}

impl FromStr for InkStyle {
    type Err = RasterError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.eq_ignore_ascii_case("rainbow") {
            Ok(Self::Rainbow)
        } else {
            Ok(Self::Solid(input.parse()?))
        }
    }
}

impl TryFrom<String> for InkStyle {
    type Error = RasterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Default for InkStyle {
    fn default() -> Self {
        Self::Solid(Rgb(255, 255, 255))
    }
}

/// Convert HSL to RGB color
/// H: hue (0-360), S: saturation (0-100), L: lightness (0-100)
pub(crate) fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let s = s / 100.0;
    let l = l / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb(((r + m) * 255.0) as u8, ((g + m) * 255.0) as u8, ((b + m) * 255.0) as u8)
}

/// Renders text into pixels.
///
/// Implementors only need to shape text into a grid of glyph cells; painting that grid onto a surface is
/// shared so every rasterizer samples the same way.
pub trait Rasterizer {
    /// Shape the text into rows of glyph cells, exactly as the control displays them.
    fn shape(&self, text: &str) -> Result<Vec<String>, RasterError>;

    /// How many cell rows one line of text occupies.
    fn line_height(&self) -> u32 {
        1
    }

    /// Render the text into an offscreen surface sized to the control.
    fn rasterize(&self, text: &str, metrics: &LayoutMetrics) -> Result<RgbaImage, RasterError> {
        let rows = if text.is_empty() { Vec::new() } else { self.shape(text)? };
        Ok(paint_rows(&rows, metrics))
    }
}

/// Which part of a glyph cell carries ink.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Coverage {
    Full,
    Upper,
    Lower,
    None,
}

impl Coverage {
    fn of(ch: char) -> Self {
        match ch {
            c if c.is_whitespace() => Self::None,
            '_' | '.' | ',' => Self::Lower,
            '\'' | '"' | '`' | '^' | '~' | '-' => Self::Upper,
            _ => Self::Full,
        }
    }

    fn rows(&self, scale: u32) -> std::ops::Range<u32> {
        let half = (scale / 2).max(1);
        match self {
            Self::Full => 0..scale,
            Self::Upper => 0..half,
            Self::Lower => scale - half..scale,
            Self::None => 0..0,
        }
    }
}

/// Paint rows of glyph cells onto a transparent surface. Anything outside the control is clipped.
pub fn paint_rows(rows: &[String], metrics: &LayoutMetrics) -> RgbaImage {
    let (width, height) = metrics.surface_size();
    let scale = metrics.scale.max(1);
    let mut surface = RgbaImage::new(width, height);
    for (row_index, row) in rows.iter().enumerate() {
        let top = (metrics.top_inset + row_index as u32) * scale;
        let mut column = metrics.left_inset;
        for ch in row.chars() {
            let cells = ch.width().unwrap_or(0) as u32;
            let coverage = Coverage::of(ch);
            let Rgb(r, g, b) = metrics.ink.color_at(column, metrics.width);
            for y in coverage.rows(scale) {
                for x in 0..cells * scale {
                    let (px, py) = (column * scale + x, top + y);
                    if px < width && py < height {
                        surface.put_pixel(px, py, Rgba([r, g, b, u8::MAX]));
                    }
                }
            }
            column += cells;
        }
    }
    surface
}

/// Rasterizer that draws every character as one terminal cell, matching a plain single line input.
#[derive(Clone, Debug, Default)]
pub struct CellRasterizer;

impl Rasterizer for CellRasterizer {
    fn shape(&self, text: &str) -> Result<Vec<String>, RasterError> {
        Ok(vec![text.replace(['\n', '\r', '\t'], " ")])
    }
}

/// Rasterizer that renders text with a FIGlet banner font.
pub struct FigletRasterizer {
    font: FIGfont,
    line_height: u32,
}

impl FigletRasterizer {
    /// Load the given FIGlet font. Only the embedded `standard` font and validated system fonts are accepted.
    pub fn new(font_name: &str) -> Result<Self, RasterError> {
        let font = load_font(font_name)?;
        let reference = catch_unwind(AssertUnwindSafe(|| font.convert("M")));
        let line_height = match reference {
            Ok(Some(figure)) => figure.to_string().lines().count().max(1) as u32,
            Ok(None) | Err(_) => return Err(RasterError::ConversionFailed("M".to_string())),
        };
        Ok(Self { font, line_height })
    }
}

impl Rasterizer for FigletRasterizer {
    fn shape(&self, text: &str) -> Result<Vec<String>, RasterError> {
        // figlet-rs panics on a handful of inputs
        let converted = catch_unwind(AssertUnwindSafe(|| self.font.convert(text)));
        match converted {
            Ok(Some(figure)) => {
                let rendered = figure.to_string();
                let mut rows: Vec<String> = rendered.lines().map(|line| line.trim_end().to_string()).collect();
                while rows.last().is_some_and(|row| row.is_empty()) {
                    rows.pop();
                }
                Ok(rows)
            }
            Ok(None) | Err(_) => Err(RasterError::ConversionFailed(text.to_string())),
        }
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }
}

/// Build the rasterizer for a configured font name.
pub fn rasterizer_for(font_name: &str) -> Result<Box<dyn Rasterizer>, RasterError> {
    if font_name.eq_ignore_ascii_case(CELL_FONT) {
        Ok(Box::new(CellRasterizer))
    } else {
        Ok(Box::new(FigletRasterizer::new(font_name)?))
    }
}

/// Fonts that panic or render garbage with figlet-rs 0.1.5.
const BROKEN_FONTS: &[&str] = &[
    "banner", "big", "bubble", "digital", "dwhistled", "gradient", "ivrit", "l4me", "maxfour", "morse", "pyramid",
    "rot13", "term", "tsalagi",
];

const FONT_DIRS: &[&str] =
    &["/opt/homebrew/share/figlet/fonts", "/usr/local/share/figlet", "/usr/share/figlet", "/usr/share/figlet/fonts"];

/// Validated system fonts, keyed by lowercased name.
static SYSTEM_FONTS: OnceCell<HashMap<String, String>> = OnceCell::new();

fn validate_font_file(path: &str) -> bool {
    let loaded = catch_unwind(AssertUnwindSafe(|| FIGfont::from_file(path)));
    let Ok(Ok(font)) = loaded else {
        return false;
    };
    let converted = catch_unwind(AssertUnwindSafe(|| font.convert("TEST")));
    matches!(converted, Ok(Some(_)))
}

fn discover_system_fonts() -> HashMap<String, String> {
    let mut fonts = HashMap::new();
    let entries = FONT_DIRS
        .iter()
        .filter(|dir| Path::new(dir).is_dir())
        .filter_map(|dir| std::fs::read_dir(dir).ok())
        .flat_map(|entries| entries.flatten());
    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("flf") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let name = stem.to_lowercase();
        if BROKEN_FONTS.contains(&name.as_str()) || fonts.contains_key(&name) {
            continue;
        }
        let path = path.to_string_lossy().to_string();
        if validate_font_file(&path) {
            fonts.insert(name, path);
        }
    }
    log::info!("discovered {} usable FIGlet font(s)", fonts.len());
    fonts
}

/// The names of every font usable by [rasterizer_for], sorted.
pub fn available_fonts() -> Vec<String> {
    let mut names: Vec<String> = SYSTEM_FONTS.get_or_init(discover_system_fonts).keys().cloned().collect();
    names.extend([CELL_FONT.to_string(), "standard".to_string()]);
    names.sort();
    names.dedup();
    names
}

fn load_font(font_name: &str) -> Result<FIGfont, RasterError> {
    let name = font_name.to_lowercase();
    let loaded = if name == "standard" {
        catch_unwind(AssertUnwindSafe(FIGfont::standard))
    } else {
        let Some(path) = SYSTEM_FONTS.get_or_init(discover_system_fonts).get(&name) else {
            return Err(RasterError::FontUnavailable(font_name.to_string()));
        };
        catch_unwind(AssertUnwindSafe(|| FIGfont::from_file(path)))
    };
    match loaded {
        Ok(Ok(font)) => Ok(font),
        Ok(Err(e)) => Err(RasterError::FontLoadFailed(font_name.to_string(), e)),
        Err(_) => Err(RasterError::FontLoadFailed(font_name.to_string(), "panic during font loading".to_string())),
    }
}

/// Errors that can occur when rendering text into pixels.
#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("failed to load font '{0}': {1}")]
    FontLoadFailed(String, String),

    #[error("failed to convert text '{0}' to glyphs")]
    ConversionFailed(String),

    #[error("requested figlet font '{0}' is not available or not validated")]
    FontUnavailable(String),

    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),
}
