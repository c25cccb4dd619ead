use crate::render::{draw_labels, draw_overlay_popup, draw_popup_box, Frame, Renderer};
use std::io::Write;

const HALF_BLOCK: char = '\u{2580}';

/// Two pixels per cell: the top one as foreground of `▀`, the bottom one as background.
#[derive(Default)]
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

fn rgb_at(pixels: &[u8], i: usize) -> (u8, u8, u8) {
    (pixels[i], pixels[i + 1], pixels[i + 2])
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn paint_cells(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let w = frame.pixel_width;
        self.last_fg = None;
        self.last_bg = None;
        for row in 0..frame.visual_rows as usize {
            let top = row * 2 * w;
            let bottom = top + w;
            for x in 0..w {
                let fg = rgb_at(frame.pixels_rgba, (top + x) * 4);
                let bg = rgb_at(frame.pixels_rgba, (bottom + x) * 4);
                if self.last_fg != Some(fg) {
                    write!(out, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;
                    self.last_fg = Some(fg);
                }
                if self.last_bg != Some(bg) {
                    write!(out, "\x1b[48;2;{};{};{}m", bg.0, bg.1, bg.2)?;
                    self.last_bg = Some(bg);
                }
                write!(out, "{HALF_BLOCK}")?;
            }
            out.write_all(b"\r\n")?;
        }
        Ok(())
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let (w, h) = (frame.pixel_width, frame.pixel_height);
        if cols == 0 || visual_rows == 0 || w != cols || h != visual_rows * 2 {
            return Ok(());
        }
        if frame.pixels_rgba.len() < w * h * 4 {
            return Err(anyhow::anyhow!(
                "pixel buffer too small (need {}, got {})",
                w * h * 4,
                frame.pixels_rgba.len()
            ));
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        // Autowrap off while full-width rows are painted, or the last column wraps.
        out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;

        self.paint_cells(frame, out)?;
        draw_labels(out, frame.term_cols, frame.visual_rows, frame.labels)?;
        for popup in frame.popups {
            draw_popup_box(out, frame.term_cols, frame.visual_rows, popup)?;
        }

        let mut hud_lines = frame.hud.lines();
        for i in 0..frame.hud_rows as usize {
            write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
            if let Some(line) = hud_lines.next() {
                let line: String = line.chars().take(cols).collect();
                write!(out, "{line}")?;
            }
        }

        if let Some(text) = frame.overlay {
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
        }

        out.write_all(b"\x1b[?7h")?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}
