use parking_lot::{Mutex, MutexGuard};

use crate::grid::PixelRect;

/// The host-visible frame: premultiplied B,G,R,A bytes, `stride` bytes per row.
///
/// All pixel copies go through `lock()`, which hands out a `TargetGuard`.
/// The guard records which cells were written and folds them into the
/// buffer's damage when it goes out of scope, so a presenter can ask what
/// changed since it last looked.
pub struct DisplayBuffer {
    width: u32,
    height: u32,
    stride: usize,
    bytes: Mutex<Vec<u8>>,
    damage: Mutex<Option<PixelRect>>,
}

impl DisplayBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_stride(width, height, width as usize * 4)
    }

    /// Rows padded to `stride` bytes. Strides shorter than a row are widened.
    pub fn with_stride(width: u32, height: u32, stride: usize) -> Self {
        let stride = stride.max(width as usize * 4);
        Self {
            width,
            height,
            stride,
            bytes: Mutex::new(vec![0; stride * height as usize]),
            damage: Mutex::new(None),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Exclusive access for one copy.
    pub fn lock(&self) -> TargetGuard<'_> {
        TargetGuard {
            bytes: self.bytes.lock(),
            stride: self.stride,
            width: self.width,
            written: None,
            damage: &self.damage,
        }
    }

    /// Area written since the last call.
    pub fn take_damage(&self) -> Option<PixelRect> {
        self.damage.lock().take()
    }

    /// Copy of the whole buffer, padding included.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// The four bytes stored for one cell.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bytes = self.bytes.lock();
        let at = y as usize * self.stride + x as usize * 4;
        Some([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }
}

/// Scoped write access to a `DisplayBuffer`.
pub struct TargetGuard<'a> {
    bytes: MutexGuard<'a, Vec<u8>>,
    stride: usize,
    width: u32,
    written: Option<PixelRect>,
    damage: &'a Mutex<Option<PixelRect>>,
}

impl TargetGuard<'_> {
    /// Bytes for cells `x0..x0 + len` of row `y`. Recorded as damage.
    pub fn span_mut(&mut self, y: u32, x0: u32, len: u32) -> &mut [u8] {
        if len > 0 {
            let span = PixelRect::new(x0, y, x0 + len - 1, y);
            self.record(span);
        }
        let start = y as usize * self.stride + x0 as usize * 4;
        &mut self.bytes[start..start + len as usize * 4]
    }

    /// Copy a tightly packed full frame, row by row.
    pub fn copy_frame(&mut self, frame: &[u8], height: u32) {
        let row = self.width as usize * 4;
        for (y, src) in frame.chunks_exact(row).take(height as usize).enumerate() {
            let start = y * self.stride;
            self.bytes[start..start + row].copy_from_slice(src);
        }
        if self.width > 0 && height > 0 {
            self.record(PixelRect::new(0, 0, self.width - 1, height - 1));
        }
    }

    fn record(&mut self, rect: PixelRect) {
        self.written = Some(match self.written {
            Some(r) => r.union(rect),
            None => rect,
        });
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        if let Some(written) = self.written.take() {
            let mut damage = self.damage.lock();
            *damage = Some(match *damage {
                Some(d) => d.union(written),
                None => written,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_records_damage_on_drop() {
        let display = DisplayBuffer::new(4, 4);
        {
            let mut guard = display.lock();
            guard.span_mut(1, 1, 2).copy_from_slice(&[9; 8]);
            guard.span_mut(3, 0, 1).copy_from_slice(&[7; 4]);
            assert_eq!(display.take_damage(), None);
        }
        assert_eq!(display.take_damage(), Some(PixelRect::new(0, 1, 2, 3)));
        assert_eq!(display.take_damage(), None);
        assert_eq!(display.pixel(2, 1), Some([9; 4]));
        assert_eq!(display.pixel(4, 0), None);
    }

    #[test]
    fn padded_rows_keep_padding_untouched() {
        let display = DisplayBuffer::with_stride(2, 2, 12);
        assert_eq!(display.stride(), 12);
        display.lock().copy_frame(&[1; 16], 2);
        let bytes = display.snapshot();
        assert_eq!(&bytes[0..8], &[1; 8]);
        assert_eq!(&bytes[8..12], &[0; 4]);
        assert_eq!(&bytes[12..20], &[1; 8]);

        assert_eq!(DisplayBuffer::with_stride(3, 1, 4).stride(), 12);
    }
}
