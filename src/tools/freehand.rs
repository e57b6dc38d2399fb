use std::sync::Arc;

use crate::color::Color;
use crate::grid::PixelGrid;
use crate::tools::raster;
use crate::tools::tracker::{ChangeTracker, PixelChange};
use crate::tools::Tool;

/// Pencil and eraser share one stroke engine; they differ only in name and
/// in which host color they are given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreehandMode {
    Pencil,
    Eraser,
}

/// One-pixel freehand stroke. Successive pointer positions are joined with
/// Bresenham segments so fast drags leave no gaps.
pub struct FreehandTool {
    mode: FreehandMode,
    tracker: ChangeTracker,
    color: Color,
    last: Option<(i32, i32)>,
}

impl FreehandTool {
    pub fn new(mode: FreehandMode, grid: Arc<PixelGrid>, color: Color) -> Self {
        Self {
            mode,
            tracker: ChangeTracker::new(grid),
            color,
            last: None,
        }
    }

    pub fn mode(&self) -> FreehandMode {
        self.mode
    }

    fn stroke_to(&mut self, x: i32, y: i32) {
        let (lx, ly) = self.last.unwrap_or((x, y));
        let color = self.color;
        let clip = self.tracker.grid().bounds();
        let tracker = &mut self.tracker;
        raster::line(lx, ly, x, y, clip, |px, py| {
            tracker.write(px, py, color);
        });
        self.last = Some((x, y));
    }
}

impl Tool for FreehandTool {
    fn name(&self) -> &'static str {
        match self.mode {
            FreehandMode::Pencil => "pencil",
            FreehandMode::Eraser => "eraser",
        }
    }

    fn on_press(&mut self, x: i32, y: i32) {
        self.tracker.write(x, y, self.color);
        self.last = Some((x, y));
    }

    fn on_drag(&mut self, x: i32, y: i32) {
        if self.last.is_none() {
            return;
        }
        self.stroke_to(x, y);
    }

    fn on_release(&mut self, x: i32, y: i32) {
        if let Some(last) = self.last {
            if last != (x, y) {
                self.stroke_to(x, y);
            }
        }
        self.last = None;
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
        self.last = None;
        self.tracker.end_session()
    }
}
