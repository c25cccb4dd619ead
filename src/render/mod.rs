mod compose;
mod halfblock;

pub use compose::{compose, filter_rgb, Canvas, Scene};
pub use halfblock::HalfBlockRenderer;

use std::io::Write;

/// Pseudo-pixels per terminal cell, so pixel thresholds read the same as on a touch screen.
pub const CELL_W_PX: f32 = 8.0;
pub const CELL_H_PX: f32 = 16.0;

/// Text drawn straight into a cell row, over the pixel layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub col: u16,
    pub row: u16,
    pub text: String,
    pub rgb: (u8, u8, u8),
    pub bold: bool,
}

/// A fake dialog centred on a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopupBox {
    pub col: u16,
    pub row: u16,
    pub title: &'static str,
    pub body: &'static str,
}

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub labels: &'a [Label],
    pub popups: &'a [PopupBox],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Writes labels clipped to the visual area.
pub fn draw_labels(out: &mut dyn Write, cols: u16, rows: u16, labels: &[Label]) -> anyhow::Result<()> {
    for label in labels {
        if label.row >= rows || label.col >= cols {
            continue;
        }
        let room = (cols - label.col) as usize;
        let text: String = label.text.chars().take(room).collect();
        let (r, g, b) = label.rgb;
        write!(
            out,
            "\x1b[{};{}H\x1b[0m{}\x1b[38;2;{};{};{}m{}",
            label.row + 1,
            label.col + 1,
            if label.bold { "\x1b[1m" } else { "" },
            r,
            g,
            b,
            text
        )?;
    }
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

/// Draws a small bordered dialog around `popup`'s cell, shifted to stay on screen.
pub fn draw_popup_box(out: &mut dyn Write, cols: u16, rows: u16, popup: &PopupBox) -> anyhow::Result<()> {
    let cols = cols as usize;
    let rows = rows as usize;
    let inner_w = popup
        .title
        .chars()
        .count()
        .max(popup.body.chars().count())
        .min(cols.saturating_sub(4));
    let box_w = inner_w + 4;
    let box_h = 5usize;
    if box_w > cols || box_h > rows || inner_w == 0 {
        return Ok(());
    }

    let start_col = (popup.col as usize)
        .saturating_sub(box_w / 2)
        .min(cols - box_w)
        + 1;
    let start_row = (popup.row as usize)
        .saturating_sub(box_h / 2)
        .min(rows - box_h)
        + 1;
    let fit = |s: &str| -> String {
        let mut t: String = s.chars().take(inner_w).collect();
        while t.chars().count() < inner_w {
            t.push(' ');
        }
        t
    };
    let horiz = "-".repeat(box_w - 2);

    out.write_all(b"\x1b[0m\x1b[38;2;20;20;20m\x1b[48;2;220;220;220m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;
    write!(
        out,
        "\x1b[{};{}H| \x1b[1m\x1b[38;2;200;0;0m{}\x1b[22m\x1b[38;2;20;20;20m |",
        start_row + 1,
        start_col,
        fit(popup.title)
    )?;
    write!(out, "\x1b[{};{}H| {} |", start_row + 2, start_col, fit(popup.body))?;
    write!(out, "\x1b[{};{}H| {} |", start_row + 3, start_col, fit("[ OK ]"))?;
    write!(out, "\x1b[{};{}H+{}+", start_row + 4, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}

/// Centred prompt box with its first line highlighted.
pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let chars: Vec<char> = raw.chars().collect();
        for chunk in chars.chunks(max_inner_w) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        return Ok(());
    }

    let inner_w = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(1, max_inner_w);
    let box_w = (inner_w + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = (cols.saturating_sub(box_w)) / 2 + 1;
    let start_row = (rows.saturating_sub(box_h)) / 2 + 1;
    let horiz = "=".repeat(box_w.saturating_sub(2));

    out.write_all(b"\x1b[0m\x1b[38;2;255;255;255m\x1b[48;2;20;0;30m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        let pad = inner_w.saturating_sub(line.chars().count());
        let left = pad / 2;
        write!(
            out,
            "\x1b[{};{}H| {}{}{}",
            row,
            start_col,
            " ".repeat(left),
            if i == 0 { "\x1b[1m\x1b[5m\x1b[38;2;255;236;80m" } else { "" },
            line
        )?;
        write!(
            out,
            "\x1b[0m\x1b[38;2;255;255;255m\x1b[48;2;20;0;30m{} |",
            " ".repeat(pad - left)
        )?;
    }
    write!(out, "\x1b[{};{}H+{}+", start_row + box_h - 1, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
