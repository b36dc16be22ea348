use crate::conversation::{ChatMessage, Webhook};
use crate::raster::Rgb;
use crate::widget::{AnimationState, VanishInput};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{DisableFocusChange, EnableFocusChange};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use image::RgbaImage;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

/// Puts the terminal in raw mode on an alternate screen and restores it when dropped.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableFocusChange, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, DisableFocusChange, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Everything drawn in one frame.
pub struct Screen<'a> {
    pub session_id: &'a str,
    pub messages: &'a [ChatMessage],
    pub palette: &'a [&'a Webhook],
    pub active_webhook: Option<&'a Webhook>,
    pub response: &'a VanishInput,
    pub input: &'a VanishInput,
}

/// Pick a shading glyph for a particle's opacity.
pub fn shade(alpha: u8) -> char {
    match alpha {
        192.. => '█',
        128..=191 => '▓',
        64..=127 => '▒',
        _ => '░',
    }
}

/// Collapse a particle surface into terminal cells: each `scale` x `scale` block becomes the most opaque
/// pixel in it.
pub fn surface_cells(surface: &RgbaImage, scale: u32) -> Vec<Vec<Option<(Rgb, u8)>>> {
    let scale = scale.max(1);
    let (width, height) = surface.dimensions();
    (0..height.div_ceil(scale))
        .map(|row| {
            (0..width.div_ceil(scale))
                .map(|column| {
                    let mut best: Option<(Rgb, u8)> = None;
                    for y in row * scale..((row + 1) * scale).min(height) {
                        for x in column * scale..((column + 1) * scale).min(width) {
                            let [r, g, b, a] = surface.get_pixel(x, y).0;
                            if a > 0 && best.map_or(true, |(_, current)| current < a) {
                                best = Some((Rgb(r, g, b), a));
                            }
                        }
                    }
                    best
                })
                .collect()
        })
        .collect()
}

fn fg(Rgb(r, g, b): Rgb) -> Color {
    Color::Rgb { r, g, b }
}

/// Clip a string to a number of terminal columns.
fn clip(text: &str, columns: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|ch| {
            used += ch.width().unwrap_or(0);
            used <= columns
        })
        .collect()
}

pub fn draw(out: &mut impl Write, screen: &Screen) -> io::Result<()> {
    let (columns, rows) = terminal::size()?;
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    let title = format!(
        "vanish  session {}  (Esc quit, Ctrl-N new conversation, Ctrl-X clear webhook)",
        screen.session_id
    );
    queue!(out, SetAttribute(Attribute::Bold), Print(clip(&title, columns as usize)), SetAttribute(Attribute::Reset))?;

    let input_height = screen.input.options().metrics.height as u16;
    let response_height = screen.response.options().metrics.height as u16;
    let input_top = rows.saturating_sub(input_height + 1);
    let response_top = input_top.saturating_sub(response_height + 2);

    draw_messages(out, screen.messages, 2, response_top.saturating_sub(1), columns)?;
    draw_widget(out, screen.response, response_top, columns)?;

    queue!(out, MoveTo(0, input_top.saturating_sub(1)), SetForegroundColor(Color::DarkGrey))?;
    let rule = match screen.active_webhook {
        Some(webhook) => format!("── to {} ", webhook.name),
        None => String::new(),
    };
    let rule = format!("{rule}{}", "─".repeat(columns as usize));
    queue!(out, Print(clip(&rule, columns as usize)), ResetColor)?;

    draw_palette(out, screen.palette, input_top.saturating_sub(1), columns)?;
    draw_widget(out, screen.input, input_top, columns)?;
    out.flush()
}

fn draw_messages(
    out: &mut impl Write,
    messages: &[ChatMessage],
    top: u16,
    bottom: u16,
    columns: u16,
) -> io::Result<()> {
    let available = bottom.saturating_sub(top) as usize;
    if messages.is_empty() {
        queue!(
            out,
            MoveTo(2, top),
            SetForegroundColor(Color::DarkGrey),
            Print("Start a conversation by typing a message below"),
            ResetColor
        )?;
        return Ok(());
    }
    let skip = messages.len().saturating_sub(available);
    for (offset, message) in messages.iter().skip(skip).enumerate() {
        let (prefix, color) = if message.is_user { ("you ", Color::Cyan) } else { ("bot ", Color::Magenta) };
        let line = format!("{prefix}{}", message.message.replace('\n', " "));
        queue!(
            out,
            MoveTo(2, top + offset as u16),
            SetForegroundColor(color),
            Print(clip(&line, columns.saturating_sub(4) as usize)),
            ResetColor
        )?;
    }
    Ok(())
}

fn draw_palette(out: &mut impl Write, palette: &[&Webhook], bottom: u16, columns: u16) -> io::Result<()> {
    for (offset, webhook) in palette.iter().rev().enumerate() {
        let row = bottom.saturating_sub(offset as u16 + 1);
        let line = format!(" /{}  {}", webhook.name, webhook.url);
        queue!(
            out,
            MoveTo(2, row),
            Clear(ClearType::UntilNewLine),
            SetAttribute(Attribute::Reverse),
            Print(clip(&line, columns.saturating_sub(4) as usize)),
            SetAttribute(Attribute::Reset)
        )?;
    }
    Ok(())
}

fn draw_widget(out: &mut impl Write, input: &VanishInput, top: u16, columns: u16) -> io::Result<()> {
    let metrics = &input.options().metrics;
    let width = (metrics.width as u16).min(columns);
    let left = metrics.left_inset as u16;

    if let Some(surface) = input.surface() {
        for (row, cells) in surface_cells(surface, metrics.scale).iter().enumerate() {
            for (column, cell) in cells.iter().enumerate().take(width as usize) {
                if let Some((color, alpha)) = cell {
                    queue!(
                        out,
                        MoveTo(column as u16, top + row as u16),
                        SetForegroundColor(fg(*color)),
                        Print(shade(*alpha))
                    )?;
                }
            }
        }
        return queue!(out, ResetColor);
    }

    if let Some(placeholder) = input.placeholder() {
        let visible = clip(placeholder, width.saturating_sub(left) as usize);
        queue!(
            out,
            MoveTo(left, top + metrics.top_inset as u16),
            SetForegroundColor(Color::DarkGrey),
            Print(visible),
            ResetColor
        )?;
        return Ok(());
    }

    // shaping a plain cell row never fails; a FIGlet font that cannot render the text shows nothing
    let rows = input.rasterizer().shape(input.value()).unwrap_or_default();
    let visible_rows = metrics.height.saturating_sub(metrics.top_inset) as usize;
    for (row_index, row) in rows.iter().enumerate().take(visible_rows) {
        let mut column = left;
        let y = top + metrics.top_inset as u16 + row_index as u16;
        queue!(out, MoveTo(left, y))?;
        for ch in row.chars() {
            let cells = ch.width().unwrap_or(0) as u16;
            if column + cells > width {
                break;
            }
            let color = metrics.ink.color_at(column as u32, metrics.width);
            queue!(out, MoveTo(column, y), SetForegroundColor(fg(color)), Print(ch))?;
            column += cells;
        }
    }
    if input.state() == AnimationState::Idle && !input.is_read_only() && !input.is_disabled() {
        queue!(out, SetAttribute(Attribute::SlowBlink), Print('▏'), SetAttribute(Attribute::Reset))?;
    }
    queue!(out, ResetColor)
}
