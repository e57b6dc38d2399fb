use std::collections::HashMap;
use std::sync::Arc;

use crate::color::Color;
use crate::grid::PixelGrid;

/// One cell modified during a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelChange {
    pub x: u32,
    pub y: u32,
    pub old: Color,
    pub new: Color,
}

/// Records every cell changed between `start_session` and `end_session`.
///
/// Repeated writes to one cell collapse into a single entry that keeps the
/// color from before the session and the last color written.
pub struct ChangeTracker {
    grid: Arc<PixelGrid>,
    changes: Vec<PixelChange>,
    index: HashMap<(u32, u32), usize>,
    active: bool,
}

impl ChangeTracker {
    pub fn new(grid: Arc<PixelGrid>) -> Self {
        Self {
            grid,
            changes: Vec::new(),
            index: HashMap::new(),
            active: false,
        }
    }

    pub fn grid(&self) -> &Arc<PixelGrid> {
        &self.grid
    }

    pub fn start_session(&mut self) {
        self.changes.clear();
        self.index.clear();
        self.active = true;
    }

    /// Close the session and hand over its changes in first-touched order.
    pub fn end_session(&mut self) -> Vec<PixelChange> {
        self.active = false;
        self.index.clear();
        std::mem::take(&mut self.changes)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Changes recorded so far in the open session.
    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Write through to the grid, recording the change while a session is open.
    /// Returns whether the cell actually changed.
    pub fn write(&mut self, x: i32, y: i32, color: Color) -> bool {
        let Some(old) = self.grid.replace_pixel(x, y, color) else {
            return false;
        };
        if self.active {
            let key = (x as u32, y as u32);
            match self.index.get(&key) {
                Some(&i) => self.changes[i].new = color,
                None => {
                    self.index.insert(key, self.changes.len());
                    self.changes.push(PixelChange { x: key.0, y: key.1, old, new: color });
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, RED, WHITE};

    fn tracker() -> ChangeTracker {
        ChangeTracker::new(Arc::new(PixelGrid::filled(4, 4, WHITE).unwrap()))
    }

    #[test]
    fn collapses_repeated_writes() {
        let mut t = tracker();
        t.start_session();
        assert!(t.write(1, 1, BLACK));
        assert!(t.write(1, 1, RED));
        assert!(!t.write(1, 1, RED));
        let changes = t.end_session();
        assert_eq!(changes, vec![PixelChange { x: 1, y: 1, old: WHITE, new: RED }]);
    }

    #[test]
    fn writes_outside_session_are_untracked() {
        let mut t = tracker();
        assert!(t.write(0, 0, BLACK));
        assert_eq!(t.grid().get_pixel(0, 0), BLACK);
        t.start_session();
        assert!(!t.write(9, 9, BLACK));
        assert!(t.end_session().is_empty());
    }

    #[test]
    fn sessions_start_empty() {
        let mut t = tracker();
        t.start_session();
        t.write(2, 2, BLACK);
        assert_eq!(t.pending(), 1);
        t.end_session();
        t.start_session();
        assert_eq!(t.pending(), 0);
        assert!(t.is_active());
    }
}
