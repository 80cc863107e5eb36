//! # Post-Effect System
//!
//! Structural changes (delete, move, undo, redo, column resize) can leave
//! session state pointing at blocks or columns that no longer exist.
//! Post-effects run after every such change and repair that state.
//!
//! Post-effects are:
//! - **Deterministic**: same tree and state always give the same result
//! - **Idempotent**: running them twice changes nothing the second time
//! - **Local**: they only touch session state, never the tree

use blockpress_model::BlockTree;
use tracing::debug;

use crate::selection::SelectionState;

/// Repair rule applied after a structural change
pub trait PostEffect: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Fix up `state` against `tree`. Returns true if anything changed.
    fn apply(&self, tree: &BlockTree, state: &mut SelectionState) -> bool;
}

/// Clear a selection whose block is gone
#[derive(Debug)]
pub struct DropStaleSelection;

impl PostEffect for DropStaleSelection {
    fn name(&self) -> &'static str {
        "drop-stale-selection"
    }

    fn apply(&self, tree: &BlockTree, state: &mut SelectionState) -> bool {
        match state.selected().cloned() {
            Some(id) if !tree.contains(&id) => {
                state.forget(&id);
                true
            }
            _ => false,
        }
    }
}

/// End an inline editor whose block is gone
#[derive(Debug)]
pub struct DropStaleEditor;

impl PostEffect for DropStaleEditor {
    fn name(&self) -> &'static str {
        "drop-stale-editor"
    }

    fn apply(&self, tree: &BlockTree, state: &mut SelectionState) -> bool {
        match state.active_editor().map(|editor| editor.block_id.clone()) {
            Some(id) if !tree.contains(&id) => {
                state.forget(&id);
                true
            }
            _ => false,
        }
    }
}

/// Clear a column context whose container no longer exists
#[derive(Debug)]
pub struct DropStaleColumnContext;

impl PostEffect for DropStaleColumnContext {
    fn name(&self) -> &'static str {
        "drop-stale-column-context"
    }

    fn apply(&self, tree: &BlockTree, state: &mut SelectionState) -> bool {
        let stale = state
            .column_context()
            .is_some_and(|context| tree.validate_container(&context.container()).is_err());
        if stale {
            state.clear_column_context();
        }
        stale
    }
}

/// Runs every registered post-effect in order
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    pub fn new() -> Self {
        Self {
            effects: vec![
                Box::new(DropStaleSelection),
                Box::new(DropStaleEditor),
                Box::new(DropStaleColumnContext),
            ],
        }
    }

    /// Apply all effects. Returns the names of those that changed state.
    pub fn reconcile(&self, tree: &BlockTree, state: &mut SelectionState) -> Vec<&'static str> {
        let mut applied = Vec::new();
        for effect in &self.effects {
            if effect.apply(tree, state) {
                debug!(effect = effect.name(), "post-effect applied");
                applied.push(effect.name());
            }
        }
        applied
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_model::{Attributes, BlockId, ColumnsBlock, LeafBlock};

    fn tree() -> BlockTree {
        let leaf = LeafBlock::new(BlockId::from("p"), "paragraph", Attributes::new()).unwrap();
        let columns = ColumnsBlock::new(BlockId::from("cols"), 2, Attributes::new());
        BlockTree::from_blocks(vec![leaf.into(), columns.into()]).unwrap()
    }

    #[test]
    fn test_post_effect_engine_creation() {
        let engine = PostEffectEngine::new();
        assert_eq!(engine.effects.len(), 3);
    }

    #[test]
    fn test_valid_state_is_untouched() {
        let engine = PostEffectEngine::new();
        let mut state = SelectionState::new();
        state.begin_editing(BlockId::from("p"), "content");
        state.set_column_context(BlockId::from("cols"), 1);
        let before = state.clone();

        assert!(engine.reconcile(&tree(), &mut state).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_stale_references_are_dropped() {
        let engine = PostEffectEngine::new();
        let mut state = SelectionState::new();
        state.begin_editing(BlockId::from("gone"), "content");
        state.set_column_context(BlockId::from("cols"), 5);

        let applied = engine.reconcile(&tree(), &mut state);

        assert_eq!(applied, vec!["drop-stale-selection", "drop-stale-column-context"]);
        assert_eq!(state, SelectionState::new());
    }
}
