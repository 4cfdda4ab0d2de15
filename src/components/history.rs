use image::RgbaImage;

use crate::canvas::PixelBuffer;
use crate::error::CanvasError;

// ============================================================================
// SNAPSHOT — immutable full copy of the canvas pixels
// ============================================================================

/// A committed canvas state. Holds its own copy of the pixels, so later
/// edits to the live buffer never reach it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    label: String,
    pixels: RgbaImage,
}

impl Snapshot {
    pub fn capture(label: impl Into<String>, buffer: &PixelBuffer) -> Self {
        Self {
            label: label.into(),
            pixels: buffer.to_rgba_image(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Overwrite every pixel of `buffer` with this snapshot.
    pub fn restore_into(&self, buffer: &mut PixelBuffer) {
        buffer.copy_from(&self.pixels);
    }

    fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len() + self.label.len()
    }
}

// ============================================================================
// HISTORY MANAGER — linear snapshot history with a cursor
// ============================================================================

/// Linear undo/redo over full snapshots.
///
/// `index` points at the snapshot currently materialised in the live buffer,
/// `-1` only before the first commit. Committing after an undo discards every
/// snapshot past `index`.
pub struct HistoryManager {
    snapshots: Vec<Snapshot>,
    index: isize,
    /// Maximum number of snapshots kept; `None` is unbounded.
    max_history_size: Option<usize>,
    /// Running memory total across all snapshots.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: Option<usize>) -> Self {
        Self {
            snapshots: Vec::new(),
            index: -1,
            max_history_size: max_history_size.map(|n| n.max(1)),
            total_memory: 0,
        }
    }

    /// Snapshot `buffer`, dropping any redo branch first. Returns the new
    /// index.
    pub fn commit(&mut self, buffer: &PixelBuffer, label: impl Into<String>) -> usize {
        let keep = (self.index + 1) as usize;
        for dropped in self.snapshots.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_bytes());
        }

        let snapshot = Snapshot::capture(label, buffer);
        self.total_memory += snapshot.memory_bytes();
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() as isize - 1;

        self.prune();
        self.index as usize
    }

    /// Step back one snapshot and restore it. Returns the new index, or
    /// `None` (and leaves everything untouched) at index 0 or below.
    pub fn undo(&mut self, buffer: &mut PixelBuffer) -> Option<usize> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.restore(self.index as usize, buffer).ok()?;
        Some(self.index as usize)
    }

    /// Step forward one snapshot and restore it. Returns the new index, or
    /// `None` at the end of the history.
    pub fn redo(&mut self, buffer: &mut PixelBuffer) -> Option<usize> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.restore(self.index as usize, buffer).ok()?;
        Some(self.index as usize)
    }

    /// Materialise snapshot `index` into `buffer`.
    fn restore(&self, index: usize, buffer: &mut PixelBuffer) -> Result<(), CanvasError> {
        let snapshot = self
            .snapshots
            .get(index)
            .ok_or(CanvasError::EmptyHistoryUnderflow)?;
        snapshot.restore_into(buffer);
        Ok(())
    }

    /// The snapshot that should currently be in the live buffer.
    pub fn current(&self) -> Result<&Snapshot, CanvasError> {
        if self.index < 0 {
            return Err(CanvasError::EmptyHistoryUnderflow);
        }
        self.snapshots
            .get(self.index as usize)
            .ok_or(CanvasError::EmptyHistoryUnderflow)
    }

    /// Discard uncommitted edits by restoring the current snapshot.
    pub fn revert(&self, buffer: &mut PixelBuffer) -> Result<(), CanvasError> {
        self.current()?.restore_into(buffer);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len() as isize
    }

    /// Label of the step `undo()` would revert.
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            self.snapshots.get(self.index as usize).map(|s| s.label())
        } else {
            None
        }
    }

    /// Label of the step `redo()` would reapply.
    pub fn redo_description(&self) -> Option<&str> {
        if self.can_redo() {
            self.snapshots.get((self.index + 1) as usize).map(|s| s.label())
        } else {
            None
        }
    }

    /// Labels of every stored snapshot, oldest first.
    pub fn labels(&self) -> Vec<&str> {
        self.snapshots.iter().map(|s| s.label()).collect()
    }

    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn index(&self) -> isize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Bytes held by stored snapshots (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> Option<usize> {
        self.max_history_size
    }

    /// Drop the oldest snapshots beyond the cap, shifting `index` with them.
    fn prune(&mut self) {
        let Some(max) = self.max_history_size else {
            return;
        };
        if self.snapshots.len() <= max {
            return;
        }
        let excess = self.snapshots.len() - max;
        for removed in self.snapshots.drain(..excess) {
            self.total_memory = self.total_memory.saturating_sub(removed.memory_bytes());
        }
        self.index = (self.index - excess as isize).max(0);
    }
}
