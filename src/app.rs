use crate::audio::{AudioEngine, SilentAudio, SynthAudio};
use crate::config::Config;
use crate::gesture::{Key, Point, RawInput};
use crate::media::ClockedMedia;
use crate::render::{compose, Canvas, Frame, HalfBlockRenderer, Renderer, CELL_H_PX, CELL_W_PX};
use crate::session::ChaosSession;
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::io::BufWriter;
use std::time::{Duration, Instant};

/// Length of every clip on the terminal media engine.
const CLIP_LENGTH_MS: u64 = 6_000;
/// How long a stinger "plays" when audio is muted.
const SILENT_SOUND_MS: u64 = 800;
/// Arrow-key swipes travel this far, well past the swipe threshold.
const KEY_SWIPE_PX: f32 = 200.0;

#[derive(Clone, Debug, PartialEq)]
enum KeyAction {
    Quit,
    ToggleHud,
    Inputs(Vec<RawInput>),
    None,
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let seed = cfg.seed_or_entropy();
    let audio = build_audio(&cfg);
    tracing::info!(seed, audio = audio.name(), fps = cfg.fps, "starting");

    let start = Instant::now();
    let mut session = ChaosSession::new(audio, Box::new(ClockedMedia::new(CLIP_LENGTH_MS)), seed, 0);

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = HalfBlockRenderer::new();
    let mut canvas = Canvas::default();

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut show_hud = cfg.hud;
    let mut fps = FpsCounter::new();
    let mut last_total_ms = 0.0f32;
    let budget = cfg.frame_budget();

    loop {
        let now = Instant::now();
        let now_ms = now.duration_since(start).as_millis() as u64;

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    match handle_key(k.code, k.modifiers, last_size) {
                        KeyAction::Quit => {
                            tracing::info!(level = ?session.level(), "quit");
                            return Ok(());
                        }
                        KeyAction::ToggleHud => show_hud = !show_hud,
                        KeyAction::Inputs(inputs) => {
                            for input in &inputs {
                                let _ = session.handle_input(input, now_ms);
                            }
                        }
                        KeyAction::None => {}
                    }
                }
                Event::Mouse(m) => {
                    if let Some(input) = mouse_input(m) {
                        let _ = session.handle_input(&input, now_ms);
                    }
                }
                Event::Resize(c, r) => last_size = (c, r),
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }

        session.advance(now_ms);

        let (term_cols, term_rows) = last_size;
        let hud = if show_hud {
            build_hud(term_cols as usize, &session, fps.fps(), last_total_ms)
        } else {
            String::new()
        };
        let hud_rows = hud_rows_for_text(term_rows, show_hud, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        canvas.resize(term_cols as usize, visual_rows as usize * 2);
        let scene = compose(&session, &mut canvas, term_cols, visual_rows);

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: canvas.width(),
            pixel_height: canvas.height(),
            pixels_rgba: canvas.pixels(),
            labels: &scene.labels,
            popups: &scene.popups,
            hud: &hud,
            hud_rows,
            overlay: scene.overlay,
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        fps.tick();
        last_total_ms = now.elapsed().as_secs_f32() * 1000.0;

        let elapsed = now.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        }
    }
}

fn build_audio(cfg: &Config) -> Box<dyn AudioEngine> {
    if cfg.mute {
        return Box::new(SilentAudio::new(SILENT_SOUND_MS));
    }
    match SynthAudio::new(cfg.device.as_deref()) {
        Ok(synth) => {
            tracing::info!(sample_rate = synth.sample_rate_hz, "audio output ready");
            Box::new(synth)
        }
        Err(err) => {
            tracing::warn!("audio output unavailable, continuing silent: {err:#}");
            Box::new(SilentAudio::new(SILENT_SOUND_MS))
        }
    }
}

/// Centre of a terminal cell in pseudo-pixels.
pub fn cell_to_point(col: u16, row: u16) -> Point {
    Point::new(
        (col as f32 + 0.5) * CELL_W_PX,
        (row as f32 + 0.5) * CELL_H_PX,
    )
}

fn mouse_input(m: MouseEvent) -> Option<RawInput> {
    let p = cell_to_point(m.column, m.row);
    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(RawInput::PointerDown(p)),
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
            Some(RawInput::PointerMove(p))
        }
        MouseEventKind::Up(MouseButton::Left) => Some(RawInput::PointerUp(p)),
        _ => None,
    }
}

fn handle_key(code: KeyCode, mods: KeyModifiers, size: (u16, u16)) -> KeyAction {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return KeyAction::Quit;
    }
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char('i') | KeyCode::Char('I') => KeyAction::ToggleHud,
        KeyCode::Enter => KeyAction::Inputs(vec![RawInput::Key(Key::Enter)]),
        KeyCode::Char(' ') => KeyAction::Inputs(vec![RawInput::Key(Key::Space)]),
        KeyCode::Up => KeyAction::Inputs(key_swipe(size, KEY_SWIPE_PX)),
        KeyCode::Down => KeyAction::Inputs(key_swipe(size, -KEY_SWIPE_PX)),
        KeyCode::Char(_) => KeyAction::Inputs(vec![RawInput::Key(Key::Other)]),
        _ => KeyAction::None,
    }
}

/// A synthetic drag from screen centre; positive `rise` moves up the screen.
fn key_swipe(size: (u16, u16), rise: f32) -> Vec<RawInput> {
    let from = cell_to_point(size.0 / 2, size.1 / 2);
    let to = Point::new(from.x, from.y - rise);
    vec![RawInput::PointerDown(from), RawInput::PointerUp(to)]
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn build_hud(cols: usize, session: &ChaosSession, fps: f32, total_ms: f32) -> String {
    let stage = session.stage();
    let audio = session.audio();
    let level = session
        .level()
        .map_or_else(|| "-".to_string(), |l| l.get().to_string());
    let logical_lines = vec![
        format!(
            "Level: {} | Media: {}/{} | Videos: {} | Entities: {} | Timers: {} | FPS: {:>4.1} | ms: {:>4.1}",
            level,
            session.media_index() + 1,
            session.deck().len(),
            stage.video_count(),
            stage.entities().count(),
            stage.pending_timers() + session.clock().pending_timers(),
            fps,
            total_ms,
        ),
        format!(
            "Audio: {} ({}) | Sounds: {} open, {} fading, {} deferred",
            audio.engine_name(),
            if audio.is_unlocked() { "unlocked" } else { "locked" },
            audio.open_count(),
            audio.fading_count(),
            audio.deferred_count(),
        ),
        "Keys: click/enter start | drag up/down or ↑/↓ switch video | i HUD | q quit".to_string(),
    ];
    wrap_hud_lines(cols, &logical_lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    out
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_become_swipes() {
        let KeyAction::Inputs(inputs) = handle_key(KeyCode::Up, KeyModifiers::NONE, (80, 24)) else {
            panic!("expected inputs");
        };
        let (RawInput::PointerDown(a), RawInput::PointerUp(b)) = (&inputs[0], &inputs[1]) else {
            panic!("expected a down/up pair");
        };
        assert_eq!(a.y - b.y, KEY_SWIPE_PX);
        assert_eq!(
            handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, (80, 24)),
            KeyAction::Quit
        );
    }

    #[test]
    fn hud_wraps_to_width() {
        let lines = wrap_hud_lines(4, &["abcdefghij".to_string(), String::new()]);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", ""]);
    }

    #[test]
    fn cells_map_to_pixel_centres() {
        let p = cell_to_point(2, 1);
        assert_eq!((p.x, p.y), (20.0, 24.0));
    }
}
