//! # Undo/Redo Stack
//!
//! Bounded history of whole-tree snapshots.
//!
//! ## Design
//!
//! - Each entry is the tree as it looked *after* an operation
//! - The top of the undo stack is the current committed state
//! - Undo moves the top onto the redo stack and adopts the entry below it
//! - Redo moves an entry back and adopts it
//! - Any new snapshot clears the redo stack
//! - The oldest entries are evicted first once `max_levels` is reached
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.reset(&tree);          // baseline
//! tree.insert(...)?;
//! stack.save_state(&tree);
//!
//! if let Some(previous) = stack.undo() {
//!     tree = previous.clone();
//! }
//! ```

use blockpress_model::BlockTree;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Committed states (most recent last)
    undo_stack: Vec<BlockTree>,

    /// Undone states (most recent last)
    redo_stack: Vec<BlockTree>,

    /// Maximum number of entries on the undo stack (at least 1)
    max_levels: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels: max_levels.max(1),
        }
    }

    /// Drop all history and record `tree` as the baseline
    pub fn reset(&mut self, tree: &BlockTree) {
        self.clear();
        self.undo_stack.push(tree.clone());
    }

    /// Push a snapshot of `tree`, evicting the oldest entries past the
    /// limit and clearing redo.
    pub fn save_state(&mut self, tree: &BlockTree) {
        self.undo_stack.push(tree.clone());

        if self.undo_stack.len() > self.max_levels {
            let excess = self.undo_stack.len() - self.max_levels;
            self.undo_stack.drain(..excess);
        }

        self.redo_stack.clear();
    }

    /// Step back. Returns the state to adopt, or `None` when fewer than
    /// two entries exist.
    pub fn undo(&mut self) -> Option<&BlockTree> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let top = self.undo_stack.pop()?;
        self.redo_stack.push(top);
        self.undo_stack.last()
    }

    /// Step forward. Returns the state to adopt, or `None` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Option<&BlockTree> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next);
        self.undo_stack.last()
    }

    /// The current committed state
    pub fn top(&self) -> Option<&BlockTree> {
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of entries on the undo stack, baseline included
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_model::{Attributes, Block, BlockId, LeafBlock};

    fn tree_with(ids: &[&str]) -> BlockTree {
        let blocks = ids
            .iter()
            .map(|id| {
                Block::Leaf(LeafBlock::new(BlockId::from(*id), "paragraph", Attributes::new()).unwrap())
            })
            .collect();
        BlockTree::from_blocks(blocks).unwrap()
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.max_levels(), 50);
    }

    #[test]
    fn test_undo_needs_two_entries() {
        let mut stack = UndoStack::new();
        stack.reset(&tree_with(&[]));

        assert!(stack.undo().is_none());
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_undo_and_redo() {
        let mut stack = UndoStack::new();
        stack.reset(&tree_with(&[]));
        stack.save_state(&tree_with(&["a"]));
        stack.save_state(&tree_with(&["a", "b"]));

        assert_eq!(stack.undo(), Some(&tree_with(&["a"])));
        assert_eq!(stack.undo(), Some(&tree_with(&[])));
        assert!(stack.undo().is_none());
        assert_eq!(stack.redo_levels(), 2);

        assert_eq!(stack.redo(), Some(&tree_with(&["a"])));
        assert_eq!(stack.top(), Some(&tree_with(&["a"])));
        assert_eq!(stack.redo_levels(), 1);
    }

    #[test]
    fn test_new_snapshot_clears_redo() {
        let mut stack = UndoStack::new();
        stack.reset(&tree_with(&[]));
        stack.save_state(&tree_with(&["a"]));
        stack.undo();
        assert!(stack.can_redo());

        stack.save_state(&tree_with(&["b"]));

        assert!(!stack.can_redo());
        assert!(stack.redo().is_none());
    }

    #[test]
    fn test_max_levels_evicts_oldest() {
        let mut stack = UndoStack::with_max_levels(3);
        stack.reset(&tree_with(&[]));
        for id in ["a", "b", "c", "d"] {
            stack.save_state(&tree_with(&[id]));
        }

        assert_eq!(stack.undo_levels(), 3);
        assert_eq!(stack.undo(), Some(&tree_with(&["c"])));
        assert_eq!(stack.undo(), Some(&tree_with(&["b"])));
        assert!(stack.undo().is_none());
    }
}
