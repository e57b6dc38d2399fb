use std::sync::Arc;

use log::{debug, info, warn};

use crate::color::{self, Color};
use crate::config::PaintConfig;
use crate::error::GridError;
use crate::grid::PixelGrid;
use crate::history::{Command, HistoryManager, PixelChangeCommand};
use crate::render::preview::PreviewLayer;
use crate::render::target::DisplayBuffer;
use crate::render::{Flush, FrameStatus, PendingFrame, RenderService, RenderThrottle};
use crate::tools::text::TextTool;
use crate::tools::{GlyphRasterizer, TextRasterizer, Tool, ToolChoice, ToolKind, ToolOptions};

/// What a press started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// A press-to-release session is now open.
    Started,
    /// The text tool wants a string; answer with `commit_text`.
    TextRequested { x: i32, y: i32 },
    /// A session was already open.
    Ignored,
}

/// One open canvas: the grid plus everything that edits and displays it.
///
/// Hosts feed pointer events in grid coordinates and read frames from
/// `display()`. Each press-to-release session that changes pixels becomes
/// one undo step.
pub struct CanvasSession {
    grid: Arc<PixelGrid>,
    history: HistoryManager,
    renderer: RenderService,
    display: DisplayBuffer,
    display_stride: Option<usize>,
    preview: Option<PreviewLayer>,
    tool: ToolKind,
    tool_options: ToolOptions,
    primary: Color,
    secondary: Color,
    text_rasterizer: Option<Box<dyn TextRasterizer + Send>>,
    throttle: RenderThrottle,
    pending: Option<PendingFrame>,
    background_full_render: bool,
    last_pos: Option<(i32, i32)>,
    active: bool,
}

impl CanvasSession {
    /// Blank canvas sized and filled from `config`.
    pub fn new(config: &PaintConfig) -> Result<Self, GridError> {
        let canvas = &config.canvas;
        let grid = PixelGrid::filled(canvas.width, canvas.height, canvas.initial_fill())?;
        info!(
            "New canvas {}x{} background {}",
            canvas.width,
            canvas.height,
            color::format_color(canvas.initial_fill())
        );
        Ok(Self::from_grid(grid, config))
    }

    /// Wrap an existing grid, e.g. one loaded from disk.
    pub fn from_grid(grid: PixelGrid, config: &PaintConfig) -> Self {
        let grid = Arc::new(grid);
        let tool_options = ToolOptions {
            max_fill_pixels: config.fill.max_pixels,
            font_size: config.text.font_size,
        };
        let primary = color::BLACK;
        let secondary = color::WHITE;
        let tool = ToolKind::build(ToolChoice::Pencil, grid.clone(), primary, &tool_options);

        let text_rasterizer = config.text.font_path.as_deref().and_then(|path| {
            match GlyphRasterizer::from_path(path) {
                Ok(r) => Some(Box::new(r) as Box<dyn TextRasterizer + Send>),
                Err(e) => {
                    warn!("Text disabled: {}", e);
                    None
                }
            }
        });

        let mut session = Self {
            display: DisplayBuffer::new(grid.width(), grid.height()),
            display_stride: None,
            grid,
            history: HistoryManager::new(config.history.max_steps)
                .with_memory_limit(config.history.memory_limit_bytes()),
            renderer: RenderService::new(config.render.large_canvas_threshold),
            preview: None,
            tool,
            tool_options,
            primary,
            secondary,
            text_rasterizer,
            throttle: RenderThrottle::new(config.render.max_fps),
            pending: None,
            background_full_render: config.render.background_full_render,
            last_pos: None,
            active: false,
        };
        session.render(true);
        session
    }

    /// Swap in a new grid (after a load). History is cleared and the display
    /// is rebuilt to the new size.
    pub fn replace_grid(&mut self, grid: PixelGrid) {
        self.abandon_session();
        self.pending = None;
        self.history.clear();
        self.grid = Arc::new(grid);
        self.grid.mark_all_dirty();
        self.reallocate_display();
        let color = self.color_for(self.tool.choice());
        self.tool = ToolKind::build(self.tool.choice(), self.grid.clone(), color, &self.tool_options);
        info!("Canvas replaced ({}x{})", self.grid.width(), self.grid.height());
        self.render(true);
    }

    // ---- accessors ----------------------------------------------------------

    pub fn grid(&self) -> &Arc<PixelGrid> {
        &self.grid
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.display
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tool(&self) -> &ToolKind {
        &self.tool
    }

    pub fn tool_choice(&self) -> ToolChoice {
        self.tool.choice()
    }

    pub fn primary_color(&self) -> Color {
        self.primary
    }

    pub fn secondary_color(&self) -> Color {
        self.secondary
    }

    pub fn is_session_active(&self) -> bool {
        self.active
    }

    pub fn preview(&self) -> Option<&PreviewLayer> {
        self.preview.as_ref()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    // ---- configuration ------------------------------------------------------

    /// Switch tools. An open session is committed first.
    pub fn select_tool(&mut self, choice: ToolChoice) {
        self.commit_open_session();
        if choice == self.tool.choice() {
            return;
        }
        let color = self.color_for(choice);
        self.tool = ToolKind::build(choice, self.grid.clone(), color, &self.tool_options);
        debug!("Tool: {}", choice.name());
    }

    pub fn set_primary_color(&mut self, color: Color) {
        self.primary = color;
        if !self.tool.choice().uses_secondary_color() {
            self.tool.set_color(color);
        }
    }

    pub fn set_secondary_color(&mut self, color: Color) {
        self.secondary = color;
        if self.tool.choice().uses_secondary_color() {
            self.tool.set_color(color);
        }
    }

    pub fn set_text_rasterizer(&mut self, rasterizer: Box<dyn TextRasterizer + Send>) {
        self.text_rasterizer = Some(rasterizer);
    }

    /// Pad display rows to `stride` bytes (never less than `width * 4`).
    pub fn set_display_stride(&mut self, stride: usize) {
        self.display_stride = Some(stride);
        self.reallocate_display();
        self.render(true);
    }

    fn color_for(&self, choice: ToolChoice) -> Color {
        if choice.uses_secondary_color() { self.secondary } else { self.primary }
    }

    // ---- pointer input ------------------------------------------------------

    pub fn press(&mut self, x: i32, y: i32) -> PressOutcome {
        if self.active {
            return PressOutcome::Ignored;
        }
        if self.tool.choice() == ToolChoice::Text {
            self.tool.on_press(x, y);
            return PressOutcome::TextRequested { x, y };
        }

        self.active = true;
        self.last_pos = Some((x, y));
        self.tool.start_session();
        self.tool.on_press(x, y);

        if self.tool.uses_preview() {
            let mut preview = PreviewLayer::new(self.grid.width(), self.grid.height());
            self.tool.render_preview(&mut preview);
            self.renderer.composite_preview(&self.grid, &mut preview, &self.display);
            self.preview = Some(preview);
        } else {
            self.flush_incremental();
        }
        PressOutcome::Started
    }

    /// Returns false when ignored (no session, or same position as last event).
    pub fn drag(&mut self, x: i32, y: i32) -> bool {
        if !self.active || self.last_pos == Some((x, y)) {
            return false;
        }
        self.last_pos = Some((x, y));
        self.tool.on_drag(x, y);
        self.poll();

        if !self.throttle.ready() {
            return true;
        }
        if let Some(preview) = self.preview.as_mut() {
            if self.pending.is_none() {
                self.tool.render_preview(preview);
                self.renderer.composite_preview(&self.grid, preview, &self.display);
            }
        } else {
            self.flush_incremental();
        }
        true
    }

    /// Close the session. Returns the description of the recorded undo step,
    /// if anything changed.
    pub fn release(&mut self, x: i32, y: i32) -> Option<String> {
        if !self.active {
            return None;
        }
        self.tool.on_release(x, y);
        let recorded = self.finish_session();
        self.render(true);
        recorded
    }

    /// Stamp `text` at `(x, y)` as one undo step. Returns the changed cell count.
    pub fn commit_text(&mut self, x: i32, y: i32, text: &str, font_size: f32) -> usize {
        self.commit_open_session();
        let Some(rasterizer) = self.text_rasterizer.as_deref() else {
            warn!("No font loaded; text {:?} dropped", text);
            return 0;
        };

        let mut scratch;
        let tool: &mut TextTool = match self.tool.as_text_mut() {
            Some(t) => t,
            None => {
                scratch = TextTool::new(self.grid.clone(), self.primary, self.tool_options.font_size);
                &mut scratch
            }
        };
        tool.start_session();
        let changed = tool.render_text_to_grid(rasterizer, x, y, text, font_size);
        let changes = tool.end_session();

        if let Some(cmd) = PixelChangeCommand::new("text", self.grid.clone(), changes) {
            self.history.add_command(Box::new(cmd));
        }
        self.render(true);
        changed
    }

    // ---- history ------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.commit_open_session();
        let done = self.history.undo();
        if done {
            self.render(true);
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        self.commit_open_session();
        let done = self.history.redo();
        if done {
            self.render(true);
        }
        done
    }

    // ---- rendering ----------------------------------------------------------

    /// `force` repaints everything now (large canvases are packed in the
    /// background); otherwise only the dirty region is copied.
    pub fn render(&mut self, force: bool) -> Flush {
        if force {
            self.throttle.reset();
            if self.background_full_render && self.renderer.is_large(&self.grid) {
                // Writes landing after this point re-dirty the grid and are
                // picked up once the frame is installed.
                self.grid.get_and_clear_dirty_region();
                self.pending = Some(PendingFrame::spawn(&self.grid));
                debug!("Full frame scheduled on worker");
                return Flush::Deferred;
            }
            self.pending = None;
            return self.full_render();
        }
        if self.poll() || self.pending.is_some() {
            return Flush::Deferred;
        }
        self.flush_incremental()
    }

    /// Install a finished background frame. Returns true while one is still pending.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = self.pending.as_ref() else {
            return false;
        };
        match pending.try_take() {
            FrameStatus::Pending => true,
            FrameStatus::Ready(frame) => {
                self.pending = None;
                self.renderer.install_frame(&frame, &self.display);
                self.flush_incremental();
                false
            }
            FrameStatus::Lost => {
                warn!("Background frame lost; rendering in place");
                self.pending = None;
                self.full_render();
                false
            }
        }
    }

    /// Block until any background frame is installed and the display is current.
    pub fn finish_rendering(&mut self) {
        if let Some(pending) = self.pending.take() {
            match pending.wait() {
                Some(frame) => {
                    self.renderer.install_frame(&frame, &self.display);
                }
                None => {
                    self.full_render();
                    return;
                }
            }
        }
        self.flush_incremental();
    }

    fn full_render(&mut self) -> Flush {
        match self.renderer.render_full(&self.grid, &self.display) {
            Flush::SizeMismatch => {
                self.reallocate_display();
                self.renderer.render_full(&self.grid, &self.display)
            }
            flush => flush,
        }
    }

    fn flush_incremental(&mut self) -> Flush {
        if self.pending.is_some() {
            return Flush::Deferred;
        }
        match self.renderer.render_incremental(&self.grid, &self.display) {
            Flush::SizeMismatch => self.full_render(),
            flush => flush,
        }
    }

    fn reallocate_display(&mut self) {
        let (w, h) = (self.grid.width(), self.grid.height());
        self.display = match self.display_stride {
            Some(stride) => DisplayBuffer::with_stride(w, h, stride),
            None => DisplayBuffer::new(w, h),
        };
    }

    // ---- session bookkeeping ------------------------------------------------

    fn finish_session(&mut self) -> Option<String> {
        let changes = self.tool.end_session();
        self.active = false;
        self.last_pos = None;
        if let Some(mut preview) = self.preview.take() {
            preview.reset();
        }
        let cmd = PixelChangeCommand::new(self.tool.name(), self.grid.clone(), changes)?;
        let description = cmd.description();
        self.history.add_command(Box::new(cmd));
        Some(description)
    }

    /// Commit an unfinished session at the last pointer position.
    fn commit_open_session(&mut self) {
        if let (true, Some((x, y))) = (self.active, self.last_pos) {
            self.release(x, y);
        }
    }

    /// Drop an unfinished session without recording it. Its pixels stay.
    fn abandon_session(&mut self) {
        if self.active {
            self.tool.end_session();
            self.active = false;
            self.last_pos = None;
            self.preview = None;
        }
    }
}
