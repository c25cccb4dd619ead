use tap_chaos::audio::SilentAudio;
use tap_chaos::filters::GlobalFilterState;
use tap_chaos::gesture::{Key, RawInput};
use tap_chaos::media::ClockedMedia;
use tap_chaos::render::{
    compose, filter_rgb, Canvas, Frame, HalfBlockRenderer, Label, PopupBox, Renderer,
};
use tap_chaos::session::ChaosSession;

/// Build a gradient pixel buffer (varies across x).
fn gradient_pixels(w: usize, h: usize) -> Vec<u8> {
    let mut buf = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 4;
            let t = (x as f32 / w.max(1) as f32 * 255.0) as u8;
            buf[i] = t;
            buf[i + 1] = 128;
            buf[i + 2] = 255 - t;
            buf[i + 3] = 255;
        }
    }
    buf
}

fn make_frame<'a>(
    cols: u16,
    visual_rows: u16,
    pw: usize,
    ph: usize,
    pixels: &'a [u8],
    sync: bool,
) -> Frame<'a> {
    Frame {
        term_cols: cols,
        term_rows: visual_rows + 2,
        visual_rows,
        pixel_width: pw,
        pixel_height: ph,
        pixels_rgba: pixels,
        labels: &[],
        popups: &[],
        hud: "LVL 4 | clones 3",
        hud_rows: 1,
        overlay: None,
        sync_updates: sync,
    }
}

fn session() -> ChaosSession {
    ChaosSession::new(
        Box::new(SilentAudio::new(300)),
        Box::new(ClockedMedia::new(2_000)),
        21,
        0,
    )
}

fn render(frame: &Frame<'_>) -> String {
    let mut out = Vec::new();
    HalfBlockRenderer::new().render(frame, &mut out).unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

// ── HalfBlock renderer ─────────────────────────────────────────────────────

#[test]
fn halfblock_renders_gradient_frame() {
    let (cols, rows) = (8u16, 4u16);
    let pixels = gradient_pixels(cols as usize, rows as usize * 2);
    let frame = make_frame(cols, rows, cols as usize, rows as usize * 2, &pixels, true);
    let s = render(&frame);
    assert!(s.contains("\x1b[?2026h"), "missing sync-begin");
    assert!(s.contains("\x1b[?2026l"), "missing sync-end");
    assert!(s.contains("\x1b[?7l") && s.contains("\x1b[?7h"), "autowrap not restored");
    assert!(s.contains("\u{2580}"), "missing half-block char");
    assert!(s.contains("38;2;") && s.contains("48;2;"));
    assert!(s.contains("LVL 4"), "HUD text missing");
}

#[test]
fn halfblock_name() {
    assert_eq!(HalfBlockRenderer::new().name(), "halfblock");
}

#[test]
fn halfblock_skips_dimension_mismatch() {
    let pixels = gradient_pixels(4, 4);
    let frame = make_frame(4, 4, 4, 4, &pixels, false);
    assert!(render(&frame).is_empty());
}

#[test]
fn halfblock_rejects_short_buffer() {
    let pixels = vec![0u8; 16];
    let frame = make_frame(4, 2, 4, 4, &pixels, false);
    let mut out = Vec::new();
    assert!(HalfBlockRenderer::new().render(&frame, &mut out).is_err());
}

#[test]
fn labels_are_clipped_to_the_visual_area() {
    let pixels = gradient_pixels(10, 8);
    let labels = [
        Label {
            col: 6,
            row: 1,
            text: "SKIBIDI".into(),
            rgb: (255, 0, 255),
            bold: true,
        },
        Label {
            col: 0,
            row: 9,
            text: "OFFSCREEN".into(),
            rgb: (1, 2, 3),
            bold: false,
        },
    ];
    let mut frame = make_frame(10, 4, 10, 8, &pixels, false);
    frame.labels = &labels;
    let s = render(&frame);
    assert!(s.contains("\x1b[2;7H"));
    assert!(s.contains("38;2;255;0;255mSKIB"));
    assert!(!s.contains("SKIBI"), "label ran past the last column");
    assert!(!s.contains("OFFSCREEN"));
}

#[test]
fn popups_draw_title_and_ok_button() {
    let pixels = gradient_pixels(40, 24);
    let popups = [PopupBox {
        col: 20,
        row: 6,
        title: "VIRUS DETECTED",
        body: "your pc has 69 viruses",
    }];
    let mut frame = make_frame(40, 12, 40, 24, &pixels, false);
    frame.popups = &popups;
    let s = render(&frame);
    assert!(s.contains("VIRUS DETECTED"));
    assert!(s.contains("your pc has 69 viruses"));
    assert!(s.contains("[ OK ]"));
}

#[test]
fn halfblock_draws_overlay_popup() {
    let pixels = gradient_pixels(30, 16);
    let mut frame = make_frame(30, 8, 30, 16, &pixels, false);
    frame.overlay = Some("TAP HERE\n\npress Enter");
    let s = render(&frame);
    assert!(s.contains("TAP HERE"));
    assert!(s.contains("press Enter"));
    assert!(s.contains("+====="));
}

// ── Compositor ──────────────────────────────────────────────────────────────

#[test]
fn entry_screen_is_a_gradient_with_prompt() {
    let s = session();
    let mut canvas = Canvas::default();
    canvas.resize(20, 16);
    let scene = compose(&s, &mut canvas, 20, 8);
    assert!(scene.overlay.is_some_and(|o| o.contains("TAP HERE")));
    assert!(scene.labels.is_empty());
    assert!(scene.popups.is_empty());
    assert_ne!(canvas.pixel(0, 0), canvas.pixel(0, 15));
}

#[test]
fn started_session_draws_primary_video_without_prompt() {
    let mut s = session();
    let _ = s.handle_input(&RawInput::Key(Key::Enter), 0);
    s.advance(16);
    let mut canvas = Canvas::default();
    canvas.resize(40, 32);
    let scene = compose(&s, &mut canvas, 40, 16);
    assert!(scene.overlay.is_none());
    assert!(scene.popups.is_empty());
    assert!(s.stage().filters().is_neutral());
    let centre = canvas.pixel(20, 16);
    let corner = canvas.pixel(0, 0);
    assert!(centre.is_some());
    assert_ne!(centre, corner, "primary video should cover the centre");
    assert_eq!(canvas.pixels().len(), 40 * 32 * 4);
}

#[test]
fn full_chaos_frames_stay_in_bounds() {
    let mut s = session();
    let _ = s.handle_input(&RawInput::Key(Key::Space), 0);
    let mut canvas = Canvas::default();
    canvas.resize(32, 20);
    for t in (0..14_000).step_by(16) {
        s.advance(t);
        let scene = compose(&s, &mut canvas, 32, 10);
        for label in &scene.labels {
            assert!(label.col < 32 && label.row < 10);
        }
        for popup in &scene.popups {
            assert!(popup.col < 32 && popup.row < 10);
        }
    }
    let pixels = canvas.pixels().to_vec();
    let frame = make_frame(32, 10, 32, 20, &pixels, false);
    assert!(!render(&frame).is_empty());
}

#[test]
fn neutral_filters_leave_colours_alone() {
    let f = GlobalFilterState::default();
    for rgb in [(0, 0, 0), (255, 255, 255), (12, 200, 99)] {
        assert_eq!(filter_rgb(rgb, &f), rgb);
    }
}
