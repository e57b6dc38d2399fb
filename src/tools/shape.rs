use std::sync::Arc;

use crate::color::Color;
use crate::grid::{PixelGrid, PixelRect};
use crate::render::preview::PreviewLayer;
use crate::tools::raster;
use crate::tools::tracker::{ChangeTracker, PixelChange};
use crate::tools::Tool;

/// Outline primitives drawn by dragging from an anchor to a floating corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rectangle,
    Ellipse,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Line => "line",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Ellipse => "ellipse",
        }
    }

    /// Walk the outline between two corners, keeping only points inside `clip`.
    pub fn trace<F: FnMut(i32, i32)>(&self, from: (i32, i32), to: (i32, i32), clip: PixelRect, plot: F) {
        match self {
            ShapeKind::Line => raster::line(from.0, from.1, to.0, to.1, clip, plot),
            ShapeKind::Rectangle => raster::rect_outline(from.0, from.1, to.0, to.1, clip, plot),
            ShapeKind::Ellipse => raster::ellipse_outline(from.0, from.1, to.0, to.1, clip, plot),
        }
    }
}

/// Drag-to-size outline tool.
///
/// Dragging only moves the floating corner; the grid is untouched until
/// release, which makes the one tracked pass. While dragging, the outline is
/// shown through the preview layer.
pub struct ShapeTool {
    kind: ShapeKind,
    tracker: ChangeTracker,
    color: Color,
    anchor: Option<(i32, i32)>,
    current: (i32, i32),
}

impl ShapeTool {
    pub fn new(kind: ShapeKind, grid: Arc<PixelGrid>, color: Color) -> Self {
        Self {
            kind,
            tracker: ChangeTracker::new(grid),
            color,
            anchor: None,
            current: (0, 0),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }
}

impl Tool for ShapeTool {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn on_press(&mut self, x: i32, y: i32) {
        self.anchor = Some((x, y));
        self.current = (x, y);
    }

    fn on_drag(&mut self, x: i32, y: i32) {
        if self.anchor.is_some() {
            self.current = (x, y);
        }
    }

    fn on_release(&mut self, x: i32, y: i32) {
        let Some(anchor) = self.anchor.take() else {
            return;
        };
        self.current = (x, y);
        let color = self.color;
        let clip = self.tracker.grid().bounds();
        let tracker = &mut self.tracker;
        self.kind.trace(anchor, (x, y), clip, |px, py| {
            tracker.write(px, py, color);
        });
    }

    fn uses_preview(&self) -> bool {
        true
    }

    fn render_preview(&self, preview: &mut PreviewLayer) {
        preview.begin_frame();
        if let Some(anchor) = self.anchor {
            let color = self.color;
            let clip = preview.bounds();
            self.kind.trace(anchor, self.current, clip, |x, y| preview.put(x, y, color));
        }
    }

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
        self.anchor = None;
        self.tracker.end_session()
    }
}
