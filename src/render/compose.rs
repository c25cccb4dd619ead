//! Software compositor: paints a session into an RGBA canvas plus the cell-level overlays
//! (text and popups) the terminal renderer draws on top.

use super::{Label, PopupBox, CELL_W_PX};
use crate::assets::{Font, PALETTE};
use crate::entity::{Family, Payload};
use crate::filters::GlobalFilterState;
use crate::session::ChaosSession;

const ENTRY_PROMPT: &str = "TAP HERE\n\nclick, tap or press Enter";
const BACKGROUND: (u8, u8, u8) = (6, 4, 12);
const ENTRY_TOP: (u8, u8, u8) = (70, 0, 110);
const ENTRY_BOTTOM: (u8, u8, u8) = (200, 20, 90);
const FLASH: (u8, u8, u8) = (230, 30, 40);

/// Half extents of a video quad, as a fraction of the viewport.
const PRIMARY_EXTENT: f32 = 0.28;
const CLONE_EXTENT: f32 = 0.13;
const IMAGE_EXTENT: f32 = 0.07;
const LOGO_EXTENT: f32 = 0.16;

#[derive(Clone, Debug, Default)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width.saturating_mul(height).saturating_mul(4), 0);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some((self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    fn fill(&mut self, rgb: (u8, u8, u8)) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb.0, rgb.1, rgb.2, 255]);
        }
    }

    fn blend(&mut self, x: usize, y: usize, rgb: (u8, u8, u8), alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let i = (y * self.width + x) * 4;
        for (c, v) in [rgb.0, rgb.1, rgb.2].into_iter().enumerate() {
            let old = self.pixels[i + c] as f32;
            self.pixels[i + c] = (old + (v as f32 - old) * a).round() as u8;
        }
        self.pixels[i + 3] = 255;
    }

    /// Fills a rotated rectangle; `shade` maps local coordinates in `[-1, 1]` to colour and alpha.
    fn fill_quad(
        &mut self,
        center: (f32, f32),
        half: (f32, f32),
        rotation_deg: f32,
        mut shade: impl FnMut(f32, f32) -> ((u8, u8, u8), f32),
    ) {
        if half.0 <= 0.0 || half.1 <= 0.0 {
            return;
        }
        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        let reach = half.0.hypot(half.1);
        let x0 = (center.0 - reach).floor().max(0.0) as usize;
        let y0 = (center.1 - reach).floor().max(0.0) as usize;
        let x1 = ((center.0 + reach).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((center.1 + reach).ceil().max(0.0) as usize).min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.0;
                let dy = y as f32 + 0.5 - center.1;
                let lx = (dx * cos + dy * sin) / half.0;
                let ly = (-dx * sin + dy * cos) / half.1;
                if lx.abs() > 1.0 || ly.abs() > 1.0 {
                    continue;
                }
                let (rgb, alpha) = shade(lx, ly);
                self.blend(x, y, rgb, alpha);
            }
        }
    }
}

/// Cell-level output of one compose pass.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub labels: Vec<Label>,
    pub popups: Vec<PopupBox>,
    pub overlay: Option<&'static str>,
}

pub fn compose(session: &ChaosSession, canvas: &mut Canvas, cols: u16, rows: u16) -> Scene {
    if !session.started() {
        paint_entry(canvas);
        return Scene {
            overlay: Some(ENTRY_PROMPT),
            ..Scene::default()
        };
    }

    let stage = session.stage();
    let filters = *stage.filters();
    canvas.fill(if filters.brand_flash { FLASH } else { BACKGROUND });

    let w = canvas.width() as f32;
    let h = canvas.height() as f32;
    // Shake shares the percent units of entity positions.
    let shake = stage.shake_offset();
    let offset = (shake.x / 100.0 * w, shake.y / 100.0 * h);
    let now = stage.now_ms();

    let mut scene = Scene::default();
    for entity in stage.entities() {
        let center = (
            entity.pos.x / 100.0 * w + offset.0,
            entity.pos.y / 100.0 * h + offset.1,
        );
        let scale = stage.effective_scale(entity);
        match &entity.payload {
            Payload::Video {
                source_index,
                playback_rate,
            } => {
                let extent = if entity.family == Family::PrimaryVideo {
                    PRIMARY_EXTENT
                } else {
                    CLONE_EXTENT
                };
                let base = PALETTE[source_index % PALETTE.len()];
                let scroll = now as f32 * 0.004 * playback_rate;
                let half = (w * extent * scale, h * extent * scale);
                canvas.fill_quad(center, half, entity.rotation, |_, ly| {
                    let band = ((ly * 6.0 + scroll).floor() as i32).rem_euclid(2);
                    let rgb = if band == 0 { dim(base, 0.85) } else { dim(base, 0.45) };
                    (rgb, 1.0)
                });
            }
            Payload::Image { asset, opacity } => {
                let extent = if entity.family == Family::BrandLogo {
                    LOGO_EXTENT
                } else {
                    IMAGE_EXTENT
                };
                let half = (h * extent * scale, h * extent * scale);
                canvas.fill_quad(center, half, entity.rotation, |_, _| (asset.rgb(), *opacity));
                if entity.family == Family::BrandImage {
                    scene
                        .labels
                        .push(label_at(center, cols, rows, w, h, asset.glyph(), (0, 0, 0), true));
                }
            }
            Payload::Text { text, font, color } => {
                let bold = matches!(font, Font::Impact | Font::ArialBlack);
                scene.labels.push(label_at(
                    center,
                    cols,
                    rows,
                    w,
                    h,
                    text,
                    filter_rgb(*color, &filters),
                    bold,
                ));
            }
            Payload::Corruption {
                width,
                height,
                opacity,
            } => {
                let half = (width / 200.0 * w, height / 200.0 * h);
                let seed = entity.id.0.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ (now / 40);
                let origin = (center.0 + half.0, center.1 + half.1);
                canvas.fill_quad(origin, half, 0.0, |lx, ly| {
                    let n = noise(seed, (lx * 16.0) as i64, (ly * 4.0) as i64);
                    (PALETTE[(n % PALETTE.len() as u64) as usize], *opacity)
                });
            }
            Payload::Popup { variant } => {
                let (col, row) = cell_of(center, cols, rows, w, h);
                scene.popups.push(PopupBox {
                    col,
                    row,
                    title: variant.title(),
                    body: variant.body(),
                });
            }
        }
    }

    apply_filters(canvas, &filters);
    scene
}

fn paint_entry(canvas: &mut Canvas) {
    let h = canvas.height().max(1);
    for y in 0..canvas.height() {
        let t = y as f32 / h as f32;
        let rgb = mix(ENTRY_TOP, ENTRY_BOTTOM, t);
        for x in 0..canvas.width() {
            canvas.blend(x, y, rgb, 1.0);
        }
    }
}

fn cell_of(center: (f32, f32), cols: u16, rows: u16, w: f32, h: f32) -> (u16, u16) {
    let col = (center.0 / w.max(1.0) * cols as f32).clamp(0.0, cols.saturating_sub(1) as f32);
    let row = (center.1 / h.max(1.0) * rows as f32).clamp(0.0, rows.saturating_sub(1) as f32);
    (col as u16, row as u16)
}

#[allow(clippy::too_many_arguments)]
fn label_at(
    center: (f32, f32),
    cols: u16,
    rows: u16,
    w: f32,
    h: f32,
    text: &str,
    rgb: (u8, u8, u8),
    bold: bool,
) -> Label {
    let (col, row) = cell_of(center, cols, rows, w, h);
    let half = (text.chars().count() / 2) as u16;
    Label {
        col: col.saturating_sub(half),
        row,
        text: text.to_string(),
        rgb,
        bold,
    }
}

fn dim(rgb: (u8, u8, u8), k: f32) -> (u8, u8, u8) {
    (
        (rgb.0 as f32 * k) as u8,
        (rgb.1 as f32 * k) as u8,
        (rgb.2 as f32 * k) as u8,
    )
}

fn mix(a: (u8, u8, u8), b: (u8, u8, u8), t: f32) -> (u8, u8, u8) {
    let l = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    (l(a.0, b.0), l(a.1, b.1), l(a.2, b.2))
}

fn noise(seed: u64, x: i64, y: i64) -> u64 {
    let mut v = seed ^ (x as u64).wrapping_mul(0xff51_afd7_ed55_8ccd) ^ (y as u64).wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    v ^= v >> 33;
    v = v.wrapping_mul(0xff51_afd7_ed55_8ccd);
    v ^ (v >> 33)
}

/// Hue, saturation, inversion, contrast and brightness, in that order.
pub fn filter_rgb(rgb: (u8, u8, u8), f: &GlobalFilterState) -> (u8, u8, u8) {
    if f.color_is_neutral() && f.glitch_is_neutral() {
        return rgb;
    }
    let mut c = [rgb.0 as f32 / 255.0, rgb.1 as f32 / 255.0, rgb.2 as f32 / 255.0];

    if f.hue != 0.0 {
        let (sin, cos) = f.hue.to_radians().sin_cos();
        let m = [
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ];
        c = mat3(&m, c);
    }

    let s = f.saturation / 100.0;
    if s != 1.0 {
        let m = [
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
        ];
        c = mat3(&m, c);
    }

    let k = f.contrast / 100.0;
    let b = f.brightness / 100.0;
    let out = c.map(|v| {
        let mut v = v.clamp(0.0, 1.0);
        if f.inverted {
            v = 1.0 - v;
        }
        v = (v - 0.5) * k + 0.5;
        (v * b).clamp(0.0, 1.0)
    });
    (
        (out[0] * 255.0).round() as u8,
        (out[1] * 255.0).round() as u8,
        (out[2] * 255.0).round() as u8,
    )
}

fn mat3(m: &[[f32; 3]; 3], c: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * c[0] + m[0][1] * c[1] + m[0][2] * c[2],
        m[1][0] * c[0] + m[1][1] * c[1] + m[1][2] * c[2],
        m[2][0] * c[0] + m[2][1] * c[1] + m[2][2] * c[2],
    ]
}

/// Colour filters per pixel, then red and blue pulled apart by the aberration distance.
pub fn apply_filters(canvas: &mut Canvas, f: &GlobalFilterState) {
    if f.is_neutral() {
        return;
    }
    for px in canvas.pixels.chunks_exact_mut(4) {
        let (r, g, b) = filter_rgb((px[0], px[1], px[2]), f);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }

    let shift = if f.chromatic_aberration > 0.0 {
        ((f.chromatic_aberration / CELL_W_PX).round() as usize).max(1)
    } else {
        0
    };
    if shift == 0 || canvas.width <= shift {
        return;
    }
    let w = canvas.width;
    let src = canvas.pixels.clone();
    for y in 0..canvas.height {
        for x in 0..w {
            let i = (y * w + x) * 4;
            let red_from = (y * w + (x + shift).min(w - 1)) * 4;
            let blue_from = (y * w + x.saturating_sub(shift)) * 4;
            canvas.pixels[i] = src[red_from];
            canvas.pixels[i + 2] = src[blue_from + 2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_filters_leave_colours_alone() {
        let f = GlobalFilterState::default();
        assert_eq!(filter_rgb((12, 200, 99), &f), (12, 200, 99));
    }

    #[test]
    fn inversion_and_brightness() {
        let mut f = GlobalFilterState {
            inverted: true,
            ..GlobalFilterState::default()
        };
        assert_eq!(filter_rgb((0, 0, 0), &f), (255, 255, 255));
        f.inverted = false;
        f.brightness = 50.0;
        assert_eq!(filter_rgb((200, 100, 0), &f), (100, 50, 0));
    }

    #[test]
    fn full_hue_turn_is_identity() {
        let f = GlobalFilterState {
            hue: 360.0,
            ..GlobalFilterState::default()
        };
        let (r, g, b) = filter_rgb((200, 40, 90), &f);
        assert!((r as i32 - 200).abs() <= 1);
        assert!((g as i32 - 40).abs() <= 1);
        assert!((b as i32 - 90).abs() <= 1);
    }
}
