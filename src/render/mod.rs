pub mod preview;
pub mod target;

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use image::RgbaImage;
use log::{debug, warn};
use rayon::prelude::*;

use crate::color::to_premultiplied_bgra;
use crate::grid::{PixelGrid, PixelRect};
use preview::PreviewLayer;
use target::DisplayBuffer;

pub const DEFAULT_LARGE_CANVAS_THRESHOLD: u64 = 1_000_000;
pub const DEFAULT_MAX_FPS: u32 = 60;

// ============================================================================
// PIXEL PACKING
// ============================================================================

/// Convert straight RGBA cells into premultiplied BGRA. Every render path goes
/// through here so full and incremental output are byte-identical.
#[inline]
pub fn pack_row(src: &[u8], dst: &mut [u8]) {
    let src: &[[u8; 4]] = bytemuck::cast_slice(src);
    let dst: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst);
    for (d, s) in dst.iter_mut().zip(src) {
        *d = to_premultiplied_bgra(image::Rgba(*s));
    }
}

/// Source-over of a straight-alpha overlay cell onto a straight-alpha base
/// cell, producing premultiplied BGRA.
#[inline]
fn blend_over(base: [u8; 4], over: [u8; 4]) -> [u8; 4] {
    let b = to_premultiplied_bgra(image::Rgba(base));
    let o = to_premultiplied_bgra(image::Rgba(over));
    let inv = 255 - o[3] as u16;
    let mix = |o: u8, b: u8| (o as u16 + (b as u16 * inv + 127) / 255).min(255) as u8;
    [mix(o[0], b[0]), mix(o[1], b[1]), mix(o[2], b[2]), mix(o[3], b[3])]
}

// ============================================================================
// FRAMES
// ============================================================================

/// A fully packed canvas image, `width * 4` bytes per row.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl Frame {
    /// Pack the whole grid while holding its read lock. `parallel` spreads
    /// rows across the rayon pool.
    pub fn prepare(grid: &PixelGrid, parallel: bool) -> Self {
        Self::pack(&grid.pixels(), parallel)
    }

    /// Pack a detached copy of the pixels.
    pub fn pack(image: &RgbaImage, parallel: bool) -> Self {
        let (width, height) = image.dimensions();
        let row = width as usize * 4;
        let mut bytes = vec![0u8; row * height as usize];
        let src = image.as_raw();
        if parallel {
            bytes
                .par_chunks_mut(row)
                .zip(src.par_chunks(row))
                .for_each(|(dst, src)| pack_row(src, dst));
        } else {
            for (dst, src) in bytes.chunks_mut(row).zip(src.chunks(row)) {
                pack_row(src, dst);
            }
        }
        Self { width, height, bytes }
    }
}

pub enum FrameStatus {
    Pending,
    Ready(Frame),
    /// The worker went away without producing a frame.
    Lost,
}

/// A full frame being packed on the rayon pool.
pub struct PendingFrame {
    rx: Receiver<Frame>,
}

impl PendingFrame {
    /// Snapshot the grid now and pack the copy on the pool. The grid lock is
    /// held only for the copy, so writers never wait on the pack.
    pub fn spawn(grid: &PixelGrid) -> Self {
        let snapshot = grid.to_image();
        let (tx, rx) = mpsc::channel();
        rayon::spawn(move || {
            let frame = Frame::pack(&snapshot, true);
            let _ = tx.send(frame);
        });
        Self { rx }
    }

    pub fn try_take(&self) -> FrameStatus {
        match self.rx.try_recv() {
            Ok(frame) => FrameStatus::Ready(frame),
            Err(TryRecvError::Empty) => FrameStatus::Pending,
            Err(TryRecvError::Disconnected) => FrameStatus::Lost,
        }
    }

    /// Block until the frame is ready.
    pub fn wait(self) -> Option<Frame> {
        self.rx.recv().ok()
    }
}

// ============================================================================
// RENDER SERVICE
// ============================================================================

/// What a render call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    Rendered { rect: PixelRect },
    /// Nothing was dirty.
    Clean,
    /// The display buffer no longer matches the grid; reallocate it and
    /// render in full. The dirty region was left untouched.
    SizeMismatch,
    /// Nothing copied yet: the call was throttled or a full frame is still
    /// being packed. The dirty region is kept for a later flush.
    Deferred,
}

impl Flush {
    pub fn did_render(&self) -> bool {
        matches!(self, Flush::Rendered { .. })
    }

    pub fn dirty_size(&self) -> (u32, u32) {
        match self {
            Flush::Rendered { rect } => (rect.width(), rect.height()),
            _ => (0, 0),
        }
    }
}

/// Copies grid state into a `DisplayBuffer`.
#[derive(Clone, Debug)]
pub struct RenderService {
    large_canvas_threshold: u64,
}

impl Default for RenderService {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_CANVAS_THRESHOLD)
    }
}

impl RenderService {
    pub fn new(large_canvas_threshold: u64) -> Self {
        Self { large_canvas_threshold }
    }

    /// Canvases above the threshold are packed on the worker pool.
    pub fn is_large(&self, grid: &PixelGrid) -> bool {
        grid.pixel_count() > self.large_canvas_threshold
    }

    /// Rewrite every cell of `target` and consume the dirty region.
    pub fn render_full(&self, grid: &PixelGrid, target: &DisplayBuffer) -> Flush {
        if !target.matches(grid.width(), grid.height()) {
            return Flush::SizeMismatch;
        }
        grid.get_and_clear_dirty_region();

        if self.is_large(grid) {
            let frame = Frame::prepare(grid, true);
            self.install_frame(&frame, target);
        } else {
            let pixels = grid.pixels();
            let src = pixels.as_raw();
            let row = grid.width() as usize * 4;
            let mut guard = target.lock();
            for (y, src) in src.chunks_exact(row).enumerate() {
                pack_row(src, guard.span_mut(y as u32, 0, grid.width()));
            }
        }
        debug!("Full render {}x{}", grid.width(), grid.height());
        Flush::Rendered { rect: grid.bounds() }
    }

    /// Copy a prepared frame in one block. Returns false when sizes differ.
    pub fn install_frame(&self, frame: &Frame, target: &DisplayBuffer) -> bool {
        if !target.matches(frame.width, frame.height) {
            warn!(
                "Discarding {}x{} frame for {}x{} display",
                frame.width,
                frame.height,
                target.width(),
                target.height()
            );
            return false;
        }
        target.lock().copy_frame(&frame.bytes, frame.height);
        true
    }

    /// Copy only the dirty rectangle, consuming it.
    pub fn render_incremental(&self, grid: &PixelGrid, target: &DisplayBuffer) -> Flush {
        if !target.matches(grid.width(), grid.height()) {
            return Flush::SizeMismatch;
        }
        let Some(rect) = grid.get_and_clear_dirty_region() else {
            return Flush::Clean;
        };
        self.copy_rect(grid, target, rect);
        debug!(
            "Incremental render {}x{} at ({}, {})",
            rect.width(),
            rect.height(),
            rect.min_x,
            rect.min_y
        );
        Flush::Rendered { rect }
    }

    /// Write grid pixels with the preview overlay on top over every cell the
    /// current or earlier preview frames touched. The grid is only read.
    pub fn composite_preview(
        &self,
        grid: &PixelGrid,
        preview: &mut PreviewLayer,
        target: &DisplayBuffer,
    ) -> Option<PixelRect> {
        if !target.matches(grid.width(), grid.height())
            || preview.width() != grid.width()
            || preview.height() != grid.height()
        {
            return None;
        }
        let rect = preview.take_frame_region()?;
        let pixels = grid.pixels();
        let mut guard = target.lock();
        for y in rect.min_y..=rect.max_y {
            let dst = guard.span_mut(y, rect.min_x, rect.width());
            let dst: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst);
            for (i, out) in dst.iter_mut().enumerate() {
                let x = rect.min_x + i as u32;
                let base = pixels.get_pixel(x, y).0;
                let over = preview.get(x, y).0;
                *out = if over[3] == 0 {
                    to_premultiplied_bgra(image::Rgba(base))
                } else {
                    blend_over(base, over)
                };
            }
        }
        Some(rect)
    }

    fn copy_rect(&self, grid: &PixelGrid, target: &DisplayBuffer, rect: PixelRect) {
        let pixels = grid.pixels();
        let src = pixels.as_raw();
        let row = grid.width() as usize * 4;
        let mut guard = target.lock();
        for y in rect.min_y..=rect.max_y {
            let start = y as usize * row + rect.min_x as usize * 4;
            let end = start + rect.width() as usize * 4;
            pack_row(&src[start..end], guard.span_mut(y, rect.min_x, rect.width()));
        }
    }
}

// ============================================================================
// THROTTLE
// ============================================================================

/// Rate limit for incremental renders during a drag.
#[derive(Clone, Debug)]
pub struct RenderThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RenderThrottle {
    /// `max_fps == 0` disables throttling.
    pub fn new(max_fps: u32) -> Self {
        let interval = if max_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / max_fps as f64)
        };
        Self { interval, last: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    /// True when enough time has passed since the last accepted render;
    /// accepting restarts the interval.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        let due = match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
