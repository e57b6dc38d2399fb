use std::path::Path;
use std::sync::Arc;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::{Rgba, RgbaImage};
use log::{debug, warn};

use crate::color::Color;
use crate::error::FontError;
use crate::grid::PixelGrid;
use crate::tools::tracker::{ChangeTracker, PixelChange};
use crate::tools::Tool;

pub const DEFAULT_FONT_SIZE: f32 = 12.0;
pub const MIN_FONT_SIZE: f32 = 1.0;
pub const MAX_FONT_SIZE: f32 = 50.0;

pub fn clamp_font_size(size: f32) -> f32 {
    if size.is_nan() {
        return DEFAULT_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

// ============================================================================
// RASTERIZER SEAM
// ============================================================================

/// Turns a string into coverage pixels. Hosts plug in their text stack here.
pub trait TextRasterizer {
    /// Size in pixels of the box `text` occupies at `size`.
    fn measure(&self, text: &str, size: f32) -> (u32, u32);

    /// Draw `text` with its top-left corner at `origin`, writing straight-alpha
    /// `color` with glyph coverage in the alpha channel. Cells outside
    /// `target` are skipped.
    fn draw(&self, text: &str, size: f32, color: Color, target: &mut RgbaImage, origin: (i32, i32));
}

/// `ab_glyph` backed rasterizer for a single TTF/OTF face.
#[derive(Clone)]
pub struct GlyphRasterizer {
    font: FontArc,
}

impl GlyphRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FontError> {
        Ok(Self { font: FontArc::try_from_vec(bytes)? })
    }

    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rasterizer = Self::from_bytes(bytes)?;
        debug!("Loaded font {}", path.display());
        Ok(rasterizer)
    }

    /// Pen positions for one line, left-aligned at x = 0. Returns the glyphs
    /// and the line's advance width.
    fn layout_line(&self, line: &str, size: f32) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = self.font.as_scaled(size);
        let mut glyphs = Vec::with_capacity(line.len());
        let mut cursor_x = 0.0f32;
        let mut last: Option<GlyphId> = None;

        for ch in line.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = last {
                cursor_x += scaled.kern(prev, id);
            }
            glyphs.push((id, cursor_x));
            cursor_x += scaled.h_advance(id);
            last = Some(id);
        }
        (glyphs, cursor_x)
    }
}

impl TextRasterizer for GlyphRasterizer {
    fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        let line_height = self.font.as_scaled(size).height();
        let mut width = 0.0f32;
        let mut lines = 0u32;
        for line in text.split('\n') {
            width = width.max(self.layout_line(line, size).1);
            lines += 1;
        }
        (width.ceil() as u32, (line_height * lines as f32).ceil() as u32)
    }

    fn draw(&self, text: &str, size: f32, color: Color, target: &mut RgbaImage, origin: (i32, i32)) {
        let scaled = self.font.as_scaled(size);
        let ascent = scaled.ascent();
        let line_height = scaled.height();
        let (tw, th) = (target.width() as i32, target.height() as i32);

        for (line_idx, line) in text.split('\n').enumerate() {
            let baseline = origin.1 as f32 + ascent + line_idx as f32 * line_height;
            let (glyphs, _) = self.layout_line(line, size);
            for (id, gx) in glyphs {
                let glyph = id.with_scale_and_position(size, point(origin.0 as f32 + gx, baseline));
                let Some(outlined) = self.font.outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|x, y, coverage| {
                    let px = bounds.min.x as i32 + x as i32;
                    let py = bounds.min.y as i32 + y as i32;
                    if px < 0 || py < 0 || px >= tw || py >= th {
                        return;
                    }
                    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
                    if alpha == 0 {
                        return;
                    }
                    let cell = target.get_pixel_mut(px as u32, py as u32);
                    let alpha = alpha.max(cell[3]);
                    *cell = Rgba([color[0], color[1], color[2], alpha]);
                });
            }
        }
    }
}

// ============================================================================
// TEXT TOOL
// ============================================================================

/// Stamps rasterized text into the grid.
///
/// Pressing only records where the text goes; the host gathers the string and
/// size and then calls `render_text_to_grid`.
pub struct TextTool {
    tracker: ChangeTracker,
    color: Color,
    font_size: f32,
    anchor: Option<(i32, i32)>,
}

impl TextTool {
    pub fn new(grid: Arc<PixelGrid>, color: Color, font_size: f32) -> Self {
        Self {
            tracker: ChangeTracker::new(grid),
            color,
            font_size: clamp_font_size(font_size),
            anchor: None,
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.font_size = clamp_font_size(size);
    }

    /// Where the last press asked for text, consumed on read.
    pub fn take_anchor(&mut self) -> Option<(i32, i32)> {
        self.anchor.take()
    }

    /// Rasterize `text` and copy every inked cell to the grid with its top-left
    /// at `(x, y)`. Returns the number of cells changed.
    pub fn render_text_to_grid(
        &mut self,
        rasterizer: &dyn TextRasterizer,
        x: i32,
        y: i32,
        text: &str,
        font_size: f32,
    ) -> usize {
        if text.is_empty() {
            return 0;
        }
        let size = clamp_font_size(font_size);
        let (w, h) = rasterizer.measure(text, size);
        if w == 0 || h == 0 {
            warn!("Text {:?} produced an empty bitmap at size {}", text, size);
            return 0;
        }

        let mut bitmap = RgbaImage::new(w + 2, h + 2);
        rasterizer.draw(text, size, self.color, &mut bitmap, (1, 1));

        let mut changed = 0;
        for (bx, by, px) in bitmap.enumerate_pixels() {
            if px[3] == 0 {
                continue;
            }
            let (Ok(gx), Ok(gy)) = (
                i32::try_from(x as i64 + bx as i64 - 1),
                i32::try_from(y as i64 + by as i64 - 1),
            ) else {
                continue;
            };
            if self.tracker.write(gx, gy, *px) {
                changed += 1;
            }
        }
        debug!("Text stamped {} pixels at ({}, {})", changed, x, y);
        changed
    }
}

impl Tool for TextTool {
    fn name(&self) -> &'static str {
        "text"
    }

    fn on_press(&mut self, x: i32, y: i32) {
        self.anchor = Some((x, y));
    }

    fn on_drag(&mut self, _x: i32, _y: i32) {}

    fn on_release(&mut self, _x: i32, _y: i32) {}

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn color(&self) -> Color {
        self.color
    }

    fn start_session(&mut self) {
        self.tracker.start_session();
    }

    fn end_session(&mut self) -> Vec<PixelChange> {
        self.tracker.end_session()
    }
}
