//! Selection, active inline editor and column insert target.

use blockpress_model::{BlockId, Container};
use serde::{Deserialize, Serialize};

/// Single-use destination for the next insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnContext {
    pub parent: BlockId,
    pub column: usize,
}

impl ColumnContext {
    pub fn container(&self) -> Container {
        Container::column(self.parent.clone(), self.column)
    }
}

/// Block whose text region currently has an inline editor attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEditor {
    pub block_id: BlockId,
    /// Attribute the region is synced into (`content` or `text`)
    pub attribute: String,
}

/// Where the host should put the caret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caret {
    Start,
    End,
    Offset(usize),
}

/// Request for the host to move keyboard focus into a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRequest {
    pub block_id: BlockId,
    pub caret: Caret,
}

/// Invariant: when `active_editor` is set, its block is `selected`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<BlockId>,
    active_editor: Option<ActiveEditor>,
    column_context: Option<ColumnContext>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &BlockId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn active_editor(&self) -> Option<&ActiveEditor> {
        self.active_editor.as_ref()
    }

    pub fn column_context(&self) -> Option<&ColumnContext> {
        self.column_context.as_ref()
    }

    /// Select a block. Editing on any other block ends.
    pub fn select(&mut self, id: BlockId) {
        if self
            .active_editor
            .as_ref()
            .is_some_and(|editor| editor.block_id != id)
        {
            self.active_editor = None;
        }
        self.selected = Some(id);
    }

    /// Attach the inline editor to a block, selecting it
    pub fn begin_editing(&mut self, id: BlockId, attribute: impl Into<String>) {
        self.selected = Some(id.clone());
        self.active_editor = Some(ActiveEditor {
            block_id: id,
            attribute: attribute.into(),
        });
    }

    pub fn end_editing(&mut self) -> Option<ActiveEditor> {
        self.active_editor.take()
    }

    /// Clear selection and editor. The column context is left alone.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.active_editor = None;
    }

    pub fn set_column_context(&mut self, parent: BlockId, column: usize) {
        self.column_context = Some(ColumnContext { parent, column });
    }

    pub fn take_column_context(&mut self) -> Option<ColumnContext> {
        self.column_context.take()
    }

    pub fn clear_column_context(&mut self) {
        self.column_context = None;
    }

    /// Drop everything that refers to `id`
    pub fn forget(&mut self, id: &BlockId) {
        if self.selected.as_ref() == Some(id) {
            self.clear_selection();
        }
        if self
            .active_editor
            .as_ref()
            .is_some_and(|editor| &editor.block_id == id)
        {
            self.active_editor = None;
        }
        if self
            .column_context
            .as_ref()
            .is_some_and(|context| &context.parent == id)
        {
            self.column_context = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selecting_other_block_ends_editing() {
        let mut state = SelectionState::new();
        state.begin_editing(BlockId::from("a"), "content");

        state.select(BlockId::from("a"));
        assert!(state.active_editor().is_some());

        state.select(BlockId::from("b"));
        assert!(state.active_editor().is_none());
        assert!(state.is_selected(&BlockId::from("b")));
    }

    #[test]
    fn test_forget_clears_references() {
        let mut state = SelectionState::new();
        state.begin_editing(BlockId::from("a"), "content");
        state.set_column_context(BlockId::from("cols"), 1);

        state.forget(&BlockId::from("a"));
        assert!(state.selected().is_none());
        assert!(state.active_editor().is_none());
        assert!(state.column_context().is_some());

        state.forget(&BlockId::from("cols"));
        assert!(state.column_context().is_none());
    }
}
