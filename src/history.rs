use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;

use crate::grid::PixelGrid;
use crate::tools::PixelChange;

pub const DEFAULT_MAX_HISTORY: usize = 50;

// ============================================================================
// COMMAND TRAIT
// ============================================================================

/// A reversible edit that has already been applied when it is recorded.
pub trait Command: Send + Sync {
    /// Re-apply the edit. Calling it twice leaves the same result.
    fn execute(&self);
    /// Revert the edit. Calling it twice leaves the same result.
    fn undo(&self);
    fn description(&self) -> String;
    fn memory_size(&self) -> usize;
}

// ============================================================================
// PIXEL CHANGE COMMAND - the changes of one press-to-release session
// ============================================================================

pub struct PixelChangeCommand {
    grid: Arc<PixelGrid>,
    changes: Vec<PixelChange>,
    description: String,
}

impl PixelChangeCommand {
    /// Wrap a session's changes. `None` when nothing changed.
    pub fn new(tool: &str, grid: Arc<PixelGrid>, changes: Vec<PixelChange>) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        let description = format!("{} ({} px)", tool, changes.len());
        Some(Self { grid, changes, description })
    }

    pub fn changes(&self) -> &[PixelChange] {
        &self.changes
    }
}

impl Command for PixelChangeCommand {
    fn execute(&self) {
        for c in &self.changes {
            self.grid.set_pixel(c.x as i32, c.y as i32, c.new);
        }
    }

    fn undo(&self) {
        for c in self.changes.iter().rev() {
            self.grid.set_pixel(c.x as i32, c.y as i32, c.old);
        }
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn memory_size(&self) -> usize {
        self.changes.len() * std::mem::size_of::<PixelChange>()
    }
}

// ============================================================================
// HISTORY MANAGER - bounded undo/redo stacks
// ============================================================================

/// Undo/redo history with a step limit and an optional memory cap.
pub struct HistoryManager {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: VecDeque<Box<dyn Command>>,
    max_history_size: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            max_memory_bytes: None,
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(mut self, max_bytes: Option<usize>) -> Self {
        self.max_memory_bytes = max_bytes;
        self.prune();
        self
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Record an edit that is already visible on the grid. Clears redo.
    pub fn add_command(&mut self, command: Box<dyn Command>) {
        for cmd in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(cmd.memory_size());
        }

        debug!("History: {}", command.description());
        self.total_memory += command.memory_size();
        self.undo_stack.push_back(command);
        self.prune();
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop_back() {
            Some(command) => {
                command.undo();
                self.redo_stack.push_back(command);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop_back() {
            Some(command) => {
                command.execute();
                self.undo_stack.push_back(command);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|c| c.description())
    }

    /// All undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|c| c.description()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
            }
        }

        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    /// Undo `steps` entries of `undo_history()` (0 = nothing). Returns how many ran.
    pub fn undo_to(&mut self, steps: usize) -> usize {
        let mut done = 0;
        while done < steps && self.undo() {
            done += 1;
        }
        done
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, RED, WHITE};
    use std::sync::Mutex;

    /// Records calls into a shared log instead of touching pixels.
    struct Probe {
        id: usize,
        log: Arc<Mutex<Vec<String>>>,
        size: usize,
    }

    impl Command for Probe {
        fn execute(&self) {
            self.log.lock().unwrap().push(format!("redo {}", self.id));
        }
        fn undo(&self) {
            self.log.lock().unwrap().push(format!("undo {}", self.id));
        }
        fn description(&self) -> String {
            format!("probe {}", self.id)
        }
        fn memory_size(&self) -> usize {
            self.size
        }
    }

    fn probes(history: &mut HistoryManager, n: usize, size: usize) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..n {
            history.add_command(Box::new(Probe { id, log: log.clone(), size }));
        }
        log
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut history = HistoryManager::default();
        assert!(!history.undo());
        assert!(!history.redo());
        assert_eq!(history.max_history_size(), 50);
    }

    #[test]
    fn eviction_drops_oldest_only() {
        let mut history = HistoryManager::new(3);
        probes(&mut history, 5, 1);
        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.undo_history(), vec!["probe 4", "probe 3", "probe 2"]);
    }

    #[test]
    fn new_command_discards_redo() {
        let mut history = HistoryManager::default();
        let log = probes(&mut history, 2, 8);
        assert!(history.undo());
        assert!(history.can_redo());
        history.add_command(Box::new(Probe { id: 9, log, size: 8 }));
        assert!(!history.can_redo());
        assert_eq!(history.memory_usage(), 16);
    }

    #[test]
    fn undo_to_walks_back() {
        let mut history = HistoryManager::default();
        let log = probes(&mut history, 3, 1);
        assert_eq!(history.undo_to(5), 3);
        assert_eq!(*log.lock().unwrap(), vec!["undo 2", "undo 1", "undo 0"]);
        assert!(history.redo());
        assert_eq!(history.undo_description().as_deref(), Some("probe 0"));
        assert_eq!(history.redo_description().as_deref(), Some("probe 1"));
    }

    #[test]
    fn memory_cap_keeps_newest() {
        let mut history = HistoryManager::new(50).with_memory_limit(Some(100));
        probes(&mut history, 4, 40);
        assert_eq!(history.undo_count(), 2);
        history.add_command(Box::new(Probe { id: 7, log: Arc::new(Mutex::new(Vec::new())), size: 500 }));
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_description().as_deref(), Some("probe 7"));
    }

    #[test]
    fn pixel_command_round_trips() {
        let grid = Arc::new(PixelGrid::filled(3, 1, WHITE).unwrap());
        let changes = vec![
            PixelChange { x: 0, y: 0, old: WHITE, new: BLACK },
            PixelChange { x: 2, y: 0, old: WHITE, new: RED },
        ];
        for c in &changes {
            grid.set_pixel(c.x as i32, c.y as i32, c.new);
        }
        assert!(PixelChangeCommand::new("pencil", grid.clone(), Vec::new()).is_none());
        let cmd = PixelChangeCommand::new("pencil", grid.clone(), changes).unwrap();
        assert_eq!(cmd.description(), "pencil (2 px)");

        cmd.undo();
        cmd.undo();
        assert!(grid.to_image().pixels().all(|p| *p == WHITE));
        cmd.execute();
        cmd.execute();
        assert_eq!(grid.get_pixel(0, 0), BLACK);
        assert_eq!(grid.get_pixel(2, 0), RED);
    }
}
