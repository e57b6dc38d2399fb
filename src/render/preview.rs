use image::RgbaImage;

use crate::color::{Color, TRANSPARENT};
use crate::grid::PixelRect;

/// Transient overlay for in-progress shape outlines.
///
/// Sized like the canvas but never written into the grid. Each preview frame
/// starts with `begin_frame`, which wipes what the last frame drew and
/// remembers that area as stale so compositing can restore the grid's pixels
/// there.
pub struct PreviewLayer {
    pixels: RgbaImage,
    touched: Option<PixelRect>,
    stale: Option<PixelRect>,
}

impl PreviewLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            touched: None,
            stale: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width().saturating_sub(1), self.height().saturating_sub(1))
    }

    /// Clear the previous frame's marks before drawing a new one.
    pub fn begin_frame(&mut self) {
        if let Some(r) = self.touched.take() {
            self.clear_rect(r);
            self.stale = Some(match self.stale {
                Some(s) => s.union(r),
                None => r,
            });
        }
    }

    /// Plot one overlay cell; out-of-range points are dropped.
    pub fn put(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        self.pixels.put_pixel(ux, uy, color);
        self.touched = Some(match self.touched {
            Some(r) => r.include(ux, uy),
            None => PixelRect::point(ux, uy),
        });
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        *self.pixels.get_pixel(x, y)
    }

    /// Area that must be recomposited: what this frame drew plus what earlier
    /// frames drew and have since erased. Resets the stale area.
    pub fn take_frame_region(&mut self) -> Option<PixelRect> {
        match (self.stale.take(), self.touched) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_none()
    }

    /// Drop all overlay content. Returns the area it covered.
    pub fn reset(&mut self) -> Option<PixelRect> {
        self.begin_frame();
        self.stale.take()
    }

    fn clear_rect(&mut self, r: PixelRect) {
        for y in r.min_y..=r.max_y {
            for x in r.min_x..=r.max_x {
                self.pixels.put_pixel(x, y, TRANSPARENT);
            }
        }
    }
}
