use image::RgbaImage;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::color::{Color, TRANSPARENT};
use crate::error::GridError;

/// Inclusive axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    pub fn point(x: u32, y: u32) -> Self {
        Self { min_x: x, min_y: y, max_x: x, max_y: y }
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn union(self, other: PixelRect) -> PixelRect {
        PixelRect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn include(self, x: u32, y: u32) -> PixelRect {
        self.union(PixelRect::point(x, y))
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Clip signed bounds to a `width × height` canvas. `None` when fully outside.
    pub fn clipped(min_x: i32, min_y: i32, max_x: i32, max_y: i32, width: u32, height: u32) -> Option<PixelRect> {
        let (x0, x1) = (min_x.min(max_x), min_x.max(max_x));
        let (y0, y1) = (min_y.min(max_y), min_y.max(max_y));
        if x1 < 0 || y1 < 0 || x0 >= width as i32 || y0 >= height as i32 {
            return None;
        }
        Some(PixelRect {
            min_x: x0.max(0) as u32,
            min_y: y0.max(0) as u32,
            max_x: (x1 as i64).min(width as i64 - 1) as u32,
            max_y: (y1 as i64).min(height as i64 - 1) as u32,
        })
    }
}

/// Union accumulator for modified cells.
#[derive(Debug, Default)]
struct DirtyRegion {
    rect: Option<PixelRect>,
}

impl DirtyRegion {
    fn add(&mut self, x: u32, y: u32) {
        self.rect = Some(match self.rect {
            Some(r) => r.include(x, y),
            None => PixelRect::point(x, y),
        });
    }
}

/// Read access to the committed pixels, held for the duration of a copy.
pub type GridPixels<'a> = RwLockReadGuard<'a, RgbaImage>;

/// The canvas pixel store.
///
/// Pixels live in a dense row-major `RgbaImage`. Writes go through `&self`
/// so the grid can be shared (`Arc<PixelGrid>`) between tools, commands and
/// the renderer; the pixel buffer and the dirty box each sit behind their own
/// lock. A writer publishes the pixel before growing the dirty box, and the
/// renderer clears the box before reading pixels, so no write is lost between
/// a flush's read and its clear.
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: RwLock<RgbaImage>,
    dirty: Mutex<DirtyRegion>,
}

impl std::fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dirty", &self.dirty.lock().rect)
            .finish()
    }
}

impl PixelGrid {
    /// Create a fully transparent grid. The whole canvas starts dirty.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        let grid = Self {
            width,
            height,
            pixels: RwLock::new(RgbaImage::new(width, height)),
            dirty: Mutex::new(DirtyRegion::default()),
        };
        grid.mark_all_dirty();
        Ok(grid)
    }

    /// Create a grid filled with `background`.
    pub fn filled(width: u32, height: u32, background: Color) -> Result<Self, GridError> {
        let grid = Self::new(width, height)?;
        grid.fill(background);
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    // ---- pixel access -------------------------------------------------------

    /// Read a cell; transparent black when out of range.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Color {
        if !self.in_bounds(x, y) {
            return TRANSPARENT;
        }
        *self.pixels.read().get_pixel(x as u32, y as u32)
    }

    /// Write a cell and grow the dirty box. Out-of-range writes and writes of
    /// the value already stored are dropped.
    #[inline]
    pub fn set_pixel(&self, x: i32, y: i32, color: Color) {
        self.replace_pixel(x, y, color);
    }

    /// Compare and write under one pixel lock. Returns the previous color when
    /// the cell changed; `None` when out of range or already `color`.
    pub fn replace_pixel(&self, x: i32, y: i32, color: Color) -> Option<Color> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let (ux, uy) = (x as u32, y as u32);
        let old = {
            let mut pixels = self.pixels.write();
            let cell = pixels.get_pixel_mut(ux, uy);
            if *cell == color {
                return None;
            }
            std::mem::replace(cell, color)
        };
        self.dirty.lock().add(ux, uy);
        Some(old)
    }

    /// Paint every cell (background initialisation) and mark everything dirty.
    pub fn fill(&self, color: Color) {
        {
            let mut pixels = self.pixels.write();
            for px in pixels.pixels_mut() {
                *px = color;
            }
        }
        self.mark_all_dirty();
    }

    /// Shared read access for bulk copies (rendering, saving).
    pub fn pixels(&self) -> GridPixels<'_> {
        self.pixels.read()
    }

    /// Owned copy of the pixels.
    pub fn to_image(&self) -> RgbaImage {
        self.pixels.read().clone()
    }

    // ---- dirty tracking -----------------------------------------------------

    /// Force the dirty box to cover the whole canvas.
    pub fn mark_all_dirty(&self) {
        self.dirty.lock().rect = Some(self.bounds());
    }

    /// Read and reset the dirty box in one critical section.
    pub fn get_and_clear_dirty_region(&self) -> Option<PixelRect> {
        self.dirty.lock().rect.take()
    }

    pub fn has_dirty_region(&self) -> bool {
        self.dirty.lock().rect.is_some()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width - 1, self.height - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, RED, WHITE};

    #[test]
    fn rejects_empty_dimensions() {
        assert_eq!(
            PixelGrid::new(0, 4).unwrap_err(),
            GridError::InvalidDimensions { width: 0, height: 4 }
        );
        assert!(PixelGrid::new(3, 0).is_err());
    }

    #[test]
    fn out_of_range_access_is_inert() {
        let grid = PixelGrid::filled(3, 2, WHITE).unwrap();
        grid.get_and_clear_dirty_region();
        for (x, y) in [(-1, 0), (0, -1), (3, 0), (0, 2), (i32::MAX, i32::MIN)] {
            assert_eq!(grid.get_pixel(x, y), TRANSPARENT);
            grid.set_pixel(x, y, BLACK);
        }
        assert!(!grid.has_dirty_region());
        assert!(grid.to_image().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn dirty_region_is_minimal_box_and_clears() {
        let grid = PixelGrid::filled(10, 10, WHITE).unwrap();
        assert_eq!(grid.get_and_clear_dirty_region(), Some(grid.bounds()));

        grid.set_pixel(2, 7, BLACK);
        grid.set_pixel(5, 3, RED);
        grid.set_pixel(4, 4, WHITE); // unchanged value
        assert_eq!(grid.get_and_clear_dirty_region(), Some(PixelRect::new(2, 3, 5, 7)));
        assert_eq!(grid.get_and_clear_dirty_region(), None);
    }

    #[test]
    fn mark_all_dirty_covers_canvas() {
        let grid = PixelGrid::new(4, 3).unwrap();
        grid.get_and_clear_dirty_region();
        grid.set_pixel(1, 1, RED);
        grid.mark_all_dirty();
        let r = grid.get_and_clear_dirty_region().unwrap();
        assert_eq!((r.width(), r.height()), (4, 3));
    }

    #[test]
    fn clipping_signed_bounds() {
        assert_eq!(PixelRect::clipped(-3, -3, 2, 1, 4, 4), Some(PixelRect::new(0, 0, 2, 1)));
        assert_eq!(PixelRect::clipped(5, 5, 9, 9, 4, 4), None);
        assert_eq!(PixelRect::clipped(3, 3, -1, -1, 4, 4), Some(PixelRect::new(0, 0, 3, 3)));
    }

    #[test]
    fn replace_pixel_reports_previous_color() {
        let grid = PixelGrid::filled(2, 2, WHITE).unwrap();
        grid.get_and_clear_dirty_region();
        assert_eq!(grid.replace_pixel(1, 0, RED), Some(WHITE));
        assert_eq!(grid.replace_pixel(1, 0, RED), None);
        assert_eq!(grid.replace_pixel(2, 0, RED), None);
        assert_eq!(grid.get_and_clear_dirty_region(), Some(PixelRect::point(1, 0)));
    }

    #[test]
    fn concurrent_flushes_never_lose_a_write() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        const SIDE: u32 = 64;
        let grid = Arc::new(PixelGrid::filled(SIDE, SIDE, WHITE).unwrap());
        grid.get_and_clear_dirty_region();
        let done = Arc::new(AtomicBool::new(false));

        let flusher = {
            let grid = grid.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut taken = Vec::new();
                while !done.load(Ordering::Acquire) {
                    if let Some(r) = grid.get_and_clear_dirty_region() {
                        taken.push(r);
                    }
                    thread::yield_now();
                }
                taken
            })
        };

        // Walk the cells in a scattered order so each flush sees a small box.
        let cells: Vec<(i32, i32)> = (0..SIDE * SIDE)
            .map(|i| (i * 37) % (SIDE * SIDE))
            .map(|i| ((i % SIDE) as i32, (i / SIDE) as i32))
            .collect();
        for &(x, y) in &cells {
            grid.set_pixel(x, y, BLACK);
        }
        done.store(true, Ordering::Release);

        let mut taken = flusher.join().unwrap();
        taken.extend(grid.get_and_clear_dirty_region());
        for &(x, y) in &cells {
            let (ux, uy) = (x as u32, y as u32);
            assert!(taken.iter().any(|r| r.contains(ux, uy)), "write at ({x}, {y}) lost");
        }
    }
}
