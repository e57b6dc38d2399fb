pub mod fill;
pub mod freehand;
pub mod raster;
pub mod shape;
pub mod text;
pub mod tracker;

use std::str::FromStr;
use std::sync::Arc;

use crate::color::Color;
use crate::grid::PixelGrid;
use crate::render::preview::PreviewLayer;

pub use fill::{FillOutcome, FillTool};
pub use freehand::{FreehandMode, FreehandTool};
pub use shape::{ShapeKind, ShapeTool};
pub use text::{GlyphRasterizer, TextRasterizer, TextTool};
pub use tracker::{ChangeTracker, PixelChange};

// ============================================================================
// TOOL TRAIT
// ============================================================================

/// Pointer-driven editing behaviour bound to one grid.
///
/// A session spans press to release; every cell a tool changes inside it is
/// recorded by the tool's `ChangeTracker` and handed over by `end_session`.
pub trait Tool {
    fn name(&self) -> &'static str;

    fn on_press(&mut self, x: i32, y: i32);
    fn on_drag(&mut self, x: i32, y: i32);
    fn on_release(&mut self, x: i32, y: i32);

    /// Whether the tool draws an overlay while dragging instead of writing
    /// to the grid.
    fn uses_preview(&self) -> bool {
        false
    }

    /// Draw the in-progress overlay. Tools without a preview leave it alone.
    fn render_preview(&self, _preview: &mut PreviewLayer) {}

    fn set_color(&mut self, color: Color);
    fn color(&self) -> Color;

    fn start_session(&mut self);
    fn end_session(&mut self) -> Vec<PixelChange>;
}

// ============================================================================
// TOOL CHOICE - which tool a host asked for
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ToolChoice {
    #[default]
    Pencil,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
    Fill,
    Text,
}

impl ToolChoice {
    pub const ALL: [ToolChoice; 7] = [
        ToolChoice::Pencil,
        ToolChoice::Eraser,
        ToolChoice::Line,
        ToolChoice::Rectangle,
        ToolChoice::Ellipse,
        ToolChoice::Fill,
        ToolChoice::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolChoice::Pencil => "pencil",
            ToolChoice::Eraser => "eraser",
            ToolChoice::Line => "line",
            ToolChoice::Rectangle => "rectangle",
            ToolChoice::Ellipse => "ellipse",
            ToolChoice::Fill => "fill",
            ToolChoice::Text => "text",
        }
    }

    /// The eraser paints with the secondary color; everything else with the primary.
    pub fn uses_secondary_color(&self) -> bool {
        matches!(self, ToolChoice::Eraser)
    }
}

impl FromStr for ToolChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "rect" => "rectangle",
            "bucket" => "fill",
            other => other,
        };
        ToolChoice::ALL
            .iter()
            .copied()
            .find(|t| t.name() == alias)
            .ok_or_else(|| format!("unknown tool `{}`", s))
    }
}

// ============================================================================
// TOOL KIND - the closed set of concrete tools
// ============================================================================

pub enum ToolKind {
    Pencil(FreehandTool),
    Eraser(FreehandTool),
    Line(ShapeTool),
    Rectangle(ShapeTool),
    Ellipse(ShapeTool),
    Fill(FillTool),
    Text(TextTool),
}

/// Per-tool construction parameters that come from configuration.
#[derive(Clone, Copy, Debug)]
pub struct ToolOptions {
    pub max_fill_pixels: usize,
    pub font_size: f32,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            max_fill_pixels: fill::DEFAULT_MAX_FILL_PIXELS,
            font_size: text::DEFAULT_FONT_SIZE,
        }
    }
}

impl ToolKind {
    pub fn build(choice: ToolChoice, grid: Arc<PixelGrid>, color: Color, options: &ToolOptions) -> Self {
        match choice {
            ToolChoice::Pencil => ToolKind::Pencil(FreehandTool::new(FreehandMode::Pencil, grid, color)),
            ToolChoice::Eraser => ToolKind::Eraser(FreehandTool::new(FreehandMode::Eraser, grid, color)),
            ToolChoice::Line => ToolKind::Line(ShapeTool::new(ShapeKind::Line, grid, color)),
            ToolChoice::Rectangle => ToolKind::Rectangle(ShapeTool::new(ShapeKind::Rectangle, grid, color)),
            ToolChoice::Ellipse => ToolKind::Ellipse(ShapeTool::new(ShapeKind::Ellipse, grid, color)),
            ToolChoice::Fill => ToolKind::Fill(FillTool::new(grid, color, options.max_fill_pixels)),
            ToolChoice::Text => ToolKind::Text(TextTool::new(grid, color, options.font_size)),
        }
    }

    pub fn choice(&self) -> ToolChoice {
        match self {
            ToolKind::Pencil(_) => ToolChoice::Pencil,
            ToolKind::Eraser(_) => ToolChoice::Eraser,
            ToolKind::Line(_) => ToolChoice::Line,
            ToolKind::Rectangle(_) => ToolChoice::Rectangle,
            ToolKind::Ellipse(_) => ToolChoice::Ellipse,
            ToolKind::Fill(_) => ToolChoice::Fill,
            ToolKind::Text(_) => ToolChoice::Text,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextTool> {
        match self {
            ToolKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_fill(&self) -> Option<&FillTool> {
        match self {
            ToolKind::Fill(t) => Some(t),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Tool {
        match self {
            ToolKind::Pencil(t) | ToolKind::Eraser(t) => t,
            ToolKind::Line(t) | ToolKind::Rectangle(t) | ToolKind::Ellipse(t) => t,
            ToolKind::Fill(t) => t,
            ToolKind::Text(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Tool {
        match self {
            ToolKind::Pencil(t) | ToolKind::Eraser(t) => t,
            ToolKind::Line(t) | ToolKind::Rectangle(t) | ToolKind::Ellipse(t) => t,
            ToolKind::Fill(t) => t,
            ToolKind::Text(t) => t,
        }
    }
}

impl Tool for ToolKind {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn on_press(&mut self, x: i32, y: i32) {
        self.inner_mut().on_press(x, y)
    }

    fn on_drag(&mut self, x: i32, y: i32) {
        self.inner_mut().on_drag(x, y)
    }

    fn on_release(&mut self, x: i32, y: i32) {
        self.inner_mut().on_release(x, y)
    }

    fn uses_preview(&self) -> bool {
        self.inner().uses_preview()
    }

    fn render_preview(&self, preview: &mut PreviewLayer) {
        self.inner().render_preview(preview)
    }

    fn set_color(&mut self, color: Color) {
        self.inner_mut().set_color(color)
    }

    fn color(&self) -> Color {
        self.inner().color()
    }

    fn start_session(&mut self) {
        self.inner_mut().start_session()
    }

    fn end_session(&mut self) -> Vec<PixelChange> {
        self.inner_mut().end_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, RED, WHITE};

    #[test]
    fn parses_tool_names_and_aliases() {
        assert_eq!("Pencil".parse::<ToolChoice>(), Ok(ToolChoice::Pencil));
        assert_eq!("rect".parse::<ToolChoice>(), Ok(ToolChoice::Rectangle));
        assert_eq!("bucket".parse::<ToolChoice>(), Ok(ToolChoice::Fill));
        assert!("airbrush".parse::<ToolChoice>().is_err());
    }

    #[test]
    fn kind_dispatch_reaches_inner_tool() {
        let grid = Arc::new(PixelGrid::filled(4, 4, WHITE).unwrap());
        for choice in ToolChoice::ALL {
            let mut tool = ToolKind::build(choice, grid.clone(), BLACK, &ToolOptions::default());
            assert_eq!(tool.choice(), choice);
            assert_eq!(tool.name(), choice.name());
            tool.set_color(RED);
            assert_eq!(tool.color(), RED);
        }
    }

    #[test]
    fn only_shape_tools_preview() {
        let grid = Arc::new(PixelGrid::new(2, 2).unwrap());
        let previewing: Vec<_> = ToolChoice::ALL
            .into_iter()
            .filter(|c| ToolKind::build(*c, grid.clone(), BLACK, &ToolOptions::default()).uses_preview())
            .collect();
        assert_eq!(previewing, vec![ToolChoice::Line, ToolChoice::Rectangle, ToolChoice::Ellipse]);
    }
}
