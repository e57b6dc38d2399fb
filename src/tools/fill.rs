use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use log::{debug, warn};

use crate::color::Color;
use crate::grid::PixelGrid;
use crate::tools::tracker::{ChangeTracker, PixelChange};
use crate::tools::Tool;

/// Upper bound on cells one fill may paint.
pub const DEFAULT_MAX_FILL_PIXELS: usize = 100_000;

/// Result of one flood fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillOutcome {
    pub filled: usize,
    /// The fill stopped at the pixel cap before exhausting the region.
    pub capped: bool,
}

/// 4-connected flood fill, applied on press.
pub struct FillTool {
    tracker: ChangeTracker,
    color: Color,
    max_pixels: usize,
    last_outcome: Option<FillOutcome>,
}

impl FillTool {
    pub fn new(grid: Arc<PixelGrid>, color: Color, max_pixels: usize) -> Self {
        Self {
            tracker: ChangeTracker::new(grid),
            color,
            max_pixels,
            last_outcome: None,
        }
    }

    pub fn max_pixels(&self) -> usize {
        self.max_pixels
    }

    pub fn last_outcome(&self) -> Option<FillOutcome> {
        self.last_outcome
    }

    /// Replace the connected region of the color under `(x, y)` with the fill color.
    pub fn flood(&mut self, x: i32, y: i32) -> FillOutcome {
        let grid = self.tracker.grid().clone();
        if !grid.in_bounds(x, y) {
            return FillOutcome::default();
        }
        let target = grid.get_pixel(x, y);
        let fill = self.color;
        if target == fill {
            return FillOutcome::default();
        }

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        queue.push_back((x, y));
        visited.insert((x, y));

        let mut outcome = FillOutcome::default();
        while let Some((cx, cy)) = queue.pop_front() {
            if outcome.filled >= self.max_pixels {
                outcome.capped = true;
                break;
            }
            // The cell may have changed since it was queued.
            if grid.get_pixel(cx, cy) != target {
                continue;
            }
            self.tracker.write(cx, cy, fill);
            outcome.filled += 1;

            for (nx, ny) in [(cx + 1, cy), (cx - 1, cy), (cx, cy + 1), (cx, cy - 1)] {
                if grid.in_bounds(nx, ny) && !visited.contains(&(nx, ny)) && grid.get_pixel(nx, ny) == target {
                    visited.insert((nx, ny));
                    queue.push_back((nx, ny));
                }
            }
        }

        if outcome.capped {
            warn!(
                "Fill stopped at {} pixels from ({}, {}); region left partially filled",
                outcome.filled, x, y
            );
        } else {
            debug!("Fill painted {} pixels from ({}, {})", outcome.filled, x, y);
        }
        outcome
    }
}

impl Tool for FillTool {
    fn name(&self) -> &'static str {
        "fill"
    }

    fn on_press(&mut self, x: i32, y: i32) {
        self.last_outcome = Some(self.flood(x, y));
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
        self.last_outcome = None;
        self.tracker.start_session();
    }

    fn end_session(&mut self) -> Vec<PixelChange> {
        self.tracker.end_session()
    }
}
