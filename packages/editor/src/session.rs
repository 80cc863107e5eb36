//! # Editor Session
//!
//! One open page: the block tree plus everything the editor tracks about
//! it (history, selection, dirty state, pending renders, save status).
//!
//! Every structural operation follows the same path:
//!
//! 1. resolve and validate (nothing changes on failure)
//! 2. mutate the tree
//! 3. push an undo snapshot
//! 4. mark dirty and re-arm autosave
//! 5. repair selection state (post-effects)
//! 6. invalidate the render
//!
//! Operations that fail with `BlockNotFound` leave the session untouched
//! apart from forcing a full re-render, so the host resyncs with the tree.

use blockpress_model::{
    Block, BlockId, BlockRegistry, BlockTree, Container, IdGenerator, Location, ModelError,
    VDocument, COLUMNS_KEY, COLUMNS_TYPE, COLUMN_COUNT_KEY, MAX_COLUMNS,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::autosave::AutosaveScheduler;
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::mutations::{Mutation, MutationOutcome};
use crate::persistence::SaveStatus;
use crate::pipeline::{RenderPatch, RenderPipeline};
use crate::post_effects::PostEffectEngine;
use crate::selection::{ActiveEditor, Caret, ColumnContext, FocusRequest, SelectionState};
use crate::undo_stack::UndoStack;

pub struct EditorSession {
    pub(crate) post_id: String,
    pub(crate) title: String,
    pub(crate) page_settings: Value,
    pub(crate) tree: BlockTree,
    pub(crate) registry: BlockRegistry,
    ids: IdGenerator,
    undo: UndoStack,
    pub(crate) selection: SelectionState,
    post_effects: PostEffectEngine,
    pipeline: RenderPipeline,
    config: EditorConfig,
    pub(crate) dirty: bool,
    pub(crate) revision: u64,
    pub(crate) save_status: SaveStatus,
    pub(crate) autosave: AutosaveScheduler,
    focus_request: Option<FocusRequest>,
}

impl EditorSession {
    pub fn new(
        post_id: impl Into<String>,
        tree: BlockTree,
        registry: BlockRegistry,
        config: EditorConfig,
    ) -> Self {
        let post_id = post_id.into();
        let mut ids = IdGenerator::new(&post_id);
        for id in tree.all_ids() {
            ids.observe(&id);
        }
        let mut undo = UndoStack::with_max_levels(config.history_limit);
        undo.reset(&tree);

        Self {
            post_id,
            title: String::new(),
            page_settings: Value::Object(Default::default()),
            tree,
            registry,
            ids,
            undo,
            selection: SelectionState::new(),
            post_effects: PostEffectEngine::new(),
            pipeline: RenderPipeline::new(),
            autosave: AutosaveScheduler::new(config.autosave_delay()),
            config,
            dirty: false,
            revision: 0,
            save_status: SaveStatus::Idle,
            focus_request: None,
        }
    }

    /// Open a page from its serialized block array
    pub fn load(
        post_id: impl Into<String>,
        source: &str,
        registry: BlockRegistry,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let tree = BlockTree::from_json(source)?;
        Ok(Self::new(post_id, tree, registry, config))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_page_settings(mut self, page_settings: Value) -> Self {
        self.page_settings = page_settings;
        self
    }

    /// Restore the id high-water mark saved with the page, so ids of
    /// blocks deleted before that save are not handed out again
    pub fn with_id_counter(mut self, counter: u64) -> Self {
        self.ids.advance_to(counter);
        self
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page_settings(&self) -> &Value {
        &self.page_settings
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    /// Highest id number handed out so far. Persist it with the page.
    pub fn id_counter(&self) -> u64 {
        self.ids.count()
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selection.selected()
    }

    pub fn active_editor(&self) -> Option<&ActiveEditor> {
        self.selection.active_editor()
    }

    pub fn column_context(&self) -> Option<&ColumnContext> {
        self.selection.column_context()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bumped on every change; used to detect edits during a save
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the host should guard navigation away from the page
    pub fn should_warn_before_leaving(&self) -> bool {
        self.dirty
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.mark_dirty();
    }

    pub fn set_page_settings(&mut self, page_settings: Value) {
        self.page_settings = page_settings;
        self.mark_dirty();
    }

    // ---------------------------------------------------------------------
    // Rendering and focus
    // ---------------------------------------------------------------------

    /// Patches the host has to apply since the last call
    pub fn render(&mut self) -> Vec<RenderPatch> {
        self.pipeline.flush(&self.tree, &self.registry)
    }

    /// Render the whole page, regardless of what is pending
    pub fn render_document(&mut self) -> VDocument {
        self.pipeline.full_render(&self.tree, &self.registry)
    }

    pub fn needs_render(&self) -> bool {
        self.pipeline.has_pending()
    }

    /// Focus the host should apply after an insertion
    pub fn take_focus_request(&mut self) -> Option<FocusRequest> {
        self.focus_request.take()
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Apply a serialized mutation
    pub fn apply(&mut self, mutation: Mutation) -> EditorResult<MutationOutcome> {
        mutation.apply(self)
    }

    /// Add a block built from registry defaults.
    ///
    /// With an active column context the block is appended to that slot and
    /// the context is consumed. Otherwise it goes after `after_index` at the
    /// top level, or at the end.
    pub fn add(&mut self, block_type: &str, after_index: Option<usize>) -> EditorResult<BlockId> {
        let result = self.try_add(block_type, after_index);
        self.guard(result)
    }

    fn try_add(&mut self, block_type: &str, after_index: Option<usize>) -> EditorResult<BlockId> {
        self.ensure_known_type(block_type)?;

        let (container, index) = match self.selection.column_context() {
            Some(context) => {
                if block_type == COLUMNS_TYPE {
                    return Err(ModelError::NestedColumns.into());
                }
                let container = context.container();
                let len = self.tree.container_len(&container)?;
                (container, len)
            }
            None => {
                let index = after_index.map_or(self.tree.len(), |index| index.saturating_add(1));
                (Container::Root, index)
            }
        };

        let id = self.insert_new(block_type, &container, index)?;
        if !container.is_root() {
            self.selection.clear_column_context();
        }
        self.commit("add");
        self.focus_new_block(&id, block_type);
        Ok(id)
    }

    /// Insert a block at a top-level index, ignoring any column context
    pub fn add_at(&mut self, block_type: &str, index: usize) -> EditorResult<BlockId> {
        self.ensure_known_type(block_type)?;
        let id = self.insert_new(block_type, &Container::Root, index)?;
        self.commit("add_at");
        self.focus_new_block(&id, block_type);
        Ok(id)
    }

    /// Insert a block directly into a column slot. `None` appends.
    pub fn insert_into_column(
        &mut self,
        block_type: &str,
        parent: &BlockId,
        column: usize,
        index: Option<usize>,
    ) -> EditorResult<BlockId> {
        let result = self.try_insert_into_column(block_type, parent, column, index);
        self.guard(result)
    }

    fn try_insert_into_column(
        &mut self,
        block_type: &str,
        parent: &BlockId,
        column: usize,
        index: Option<usize>,
    ) -> EditorResult<BlockId> {
        self.ensure_known_type(block_type)?;
        if block_type == COLUMNS_TYPE {
            return Err(ModelError::NestedColumns.into());
        }
        let container = Container::column(parent.clone(), column);
        let len = self.tree.container_len(&container)?;
        let id = self.insert_new(block_type, &container, index.unwrap_or(len))?;
        self.commit("insert_into_column");
        self.focus_new_block(&id, block_type);
        Ok(id)
    }

    /// Deep-copy a block (column contents included) with fresh ids and
    /// place the copy right after the original. The copy is selected.
    pub fn duplicate(&mut self, id: &BlockId) -> EditorResult<BlockId> {
        let result = self.try_duplicate(id);
        self.guard(result)
    }

    fn try_duplicate(&mut self, id: &BlockId) -> EditorResult<BlockId> {
        let location = self.tree.locate(id)?;
        let original = self.tree.get(id)?.to_block();
        let copy = original.clone_with_fresh_ids(&mut || self.next_id());
        let copy_id = copy.id().clone();

        self.tree
            .insert(copy, &location.container, location.index + 1)?;
        self.selection.select(copy_id.clone());
        self.commit("duplicate");
        Ok(copy_id)
    }

    /// Remove a block (and its column contents)
    pub fn delete(&mut self, id: &BlockId) -> EditorResult<()> {
        let result = self.try_delete(id);
        self.guard(result)
    }

    fn try_delete(&mut self, id: &BlockId) -> EditorResult<()> {
        self.tree.remove(id)?;
        self.selection.forget(id);
        self.commit("delete");
        Ok(())
    }

    /// Move a block. `index` is a position in `dest` as it looks once the
    /// block has been taken out.
    pub fn move_block(
        &mut self,
        id: &BlockId,
        dest: &Container,
        index: usize,
    ) -> EditorResult<Location> {
        let result = self.try_move(id, dest, index);
        self.guard(result)
    }

    fn try_move(&mut self, id: &BlockId, dest: &Container, index: usize) -> EditorResult<Location> {
        let location = self.tree.move_block(id, dest, index)?;
        self.commit("move");
        Ok(location)
    }

    /// Merge one attribute into a block and re-render only that block.
    /// Marks dirty but does not push an undo snapshot.
    ///
    /// `columnCount` on a columns block resizes its slots; `columns` itself
    /// cannot be set this way.
    pub fn update_attribute(&mut self, id: &BlockId, key: &str, value: Value) -> EditorResult<()> {
        let result = self.try_update_attribute(id, key, value);
        self.guard(result)
    }

    fn try_update_attribute(&mut self, id: &BlockId, key: &str, value: Value) -> EditorResult<()> {
        if key == COLUMNS_KEY && self.tree.columns_block(id).is_some() {
            return Err(EditorError::invalid_attribute(
                key,
                "column contents change through block operations",
            ));
        }
        self.tree.locate(id)?;

        if key == COLUMN_COUNT_KEY {
            if let Some(columns) = self.tree.columns_block_mut(id) {
                let count = value
                    .as_u64()
                    .and_then(|count| usize::try_from(count).ok())
                    .filter(|count| (1..=MAX_COLUMNS).contains(count))
                    .ok_or_else(|| {
                        EditorError::invalid_attribute(
                            key,
                            format!("expected an integer from 1 to {}", MAX_COLUMNS),
                        )
                    })?;
                columns.set_column_count(count);
                self.mark_dirty();
                self.post_effects.reconcile(&self.tree, &mut self.selection);
                self.pipeline.invalidate_block(id);
                debug!(block = %id, count, "column count changed");
                return Ok(());
            }
        }

        self.tree.attributes_mut(id)?.insert(key.to_string(), value);
        self.mark_dirty();
        self.pipeline.invalidate_block(id);
        debug!(block = %id, key, "attribute updated");
        Ok(())
    }

    /// Write an attribute that the host already displays (inline typing).
    /// No render is queued. Returns false when the value is unchanged.
    pub(crate) fn sync_attribute(&mut self, id: &BlockId, key: &str, value: Value) -> EditorResult<bool> {
        let attributes = self.tree.attributes_mut(id)?;
        if attributes.get(key) == Some(&value) {
            return Ok(false);
        }
        attributes.insert(key.to_string(), value);
        self.mark_dirty();
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Step back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(state) = self.undo.undo() else {
            return false;
        };
        self.tree = state.clone();
        self.after_history_jump("undo");
        true
    }

    /// Step forward one snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(state) = self.undo.redo() else {
            return false;
        };
        self.tree = state.clone();
        self.after_history_jump("redo");
        true
    }

    /// Snapshot the tree if it changed since the last snapshot (e.g. after
    /// a run of typing or a settings edit). Returns true if one was pushed.
    pub fn checkpoint(&mut self) -> bool {
        if self.undo.top() == Some(&self.tree) {
            return false;
        }
        self.undo.save_state(&self.tree);
        debug!(levels = self.undo.undo_levels(), "checkpoint");
        true
    }

    // ---------------------------------------------------------------------
    // Selection gestures
    // ---------------------------------------------------------------------

    /// Select a block. Editing on any other block ends.
    pub fn click_block(&mut self, id: &BlockId) -> EditorResult<()> {
        if !self.tree.contains(id) {
            let err: EditorError = ModelError::BlockNotFound(id.clone()).into();
            return self.guard(Err(err));
        }
        let ends_editing = self
            .selection
            .active_editor()
            .is_some_and(|editor| &editor.block_id != id);
        self.selection.select(id.clone());
        if ends_editing {
            self.checkpoint();
        }
        Ok(())
    }

    /// Make a column slot the destination of the next `add`
    pub fn click_column(&mut self, parent: &BlockId, column: usize) -> EditorResult<()> {
        let container = Container::column(parent.clone(), column);
        let result = self.tree.validate_container(&container).map_err(EditorError::from);
        self.guard(result)?;
        self.selection.set_column_context(parent.clone(), column);
        Ok(())
    }

    /// Click outside every block: clear selection, editor and column context
    pub fn click_canvas(&mut self) {
        let was_editing = self.selection.active_editor().is_some();
        self.selection.clear_selection();
        self.selection.clear_column_context();
        if was_editing {
            self.checkpoint();
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    pub(crate) fn next_id(&mut self) -> BlockId {
        loop {
            let id = self.ids.new_id();
            if !self.tree.contains(&id) {
                return id;
            }
        }
    }

    fn ensure_known_type(&self, block_type: &str) -> EditorResult<()> {
        if self.registry.contains(block_type) {
            Ok(())
        } else {
            Err(ModelError::UnknownBlockType(block_type.to_string()).into())
        }
    }

    fn insert_new(
        &mut self,
        block_type: &str,
        container: &Container,
        index: usize,
    ) -> EditorResult<BlockId> {
        self.tree.validate_container(container)?;
        let id = self.next_id();
        let block: Block = self.registry.create_block(id.clone(), block_type)?;
        self.tree.insert(block, container, index)?;
        Ok(id)
    }

    fn focus_new_block(&mut self, id: &BlockId, block_type: &str) {
        match self.registry.text_attribute(block_type) {
            Some(attribute) => {
                self.selection.begin_editing(id.clone(), attribute);
                self.focus_request = Some(FocusRequest {
                    block_id: id.clone(),
                    caret: Caret::Start,
                });
            }
            None => self.selection.select(id.clone()),
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
        self.revision += 1;
        if self.config.autosave_enabled {
            self.autosave.arm(Instant::now());
        }
    }

    /// Snapshot, mark dirty, repair selection and queue a full render
    pub(crate) fn commit(&mut self, action: &str) {
        self.undo.save_state(&self.tree);
        self.mark_dirty();
        self.post_effects.reconcile(&self.tree, &mut self.selection);
        self.pipeline.invalidate_all();
        debug!(
            action,
            blocks = self.tree.total_blocks(),
            undo_levels = self.undo.undo_levels(),
            "structural change committed"
        );
    }

    fn after_history_jump(&mut self, action: &str) {
        self.mark_dirty();
        self.post_effects.reconcile(&self.tree, &mut self.selection);
        self.pipeline.invalidate_all();
        debug!(
            action,
            undo_levels = self.undo.undo_levels(),
            redo_levels = self.undo.redo_levels(),
            "history moved"
        );
    }

    /// Force a full re-render when an operation hit a stale id
    pub(crate) fn guard<T>(&mut self, result: EditorResult<T>) -> EditorResult<T> {
        if let Err(err) = &result {
            if err.is_block_not_found() {
                debug!(error = %err, "stale block id, forcing full render");
                self.pipeline.invalidate_all();
            }
        }
        result
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("post_id", &self.post_id)
            .field("blocks", &self.tree.total_blocks())
            .field("dirty", &self.dirty)
            .field("revision", &self.revision)
            .field("selection", &self.selection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> EditorSession {
        EditorSession::new(
            "42",
            BlockTree::new(),
            BlockRegistry::builtin(),
            EditorConfig::default(),
        )
    }

    #[test]
    fn test_session_creation() {
        let session = session();
        assert_eq!(session.post_id(), "42");
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_add_focuses_text_blocks_and_selects_others() {
        let mut session = session();

        let text = session.add("paragraph", None).unwrap();
        assert_eq!(session.active_editor().unwrap().block_id, text);
        assert_eq!(
            session.take_focus_request(),
            Some(FocusRequest { block_id: text.clone(), caret: Caret::Start })
        );

        let image = session.add("image", Some(0)).unwrap();
        assert_eq!(session.selected(), Some(&image));
        assert!(session.active_editor().is_none());
        assert!(session.take_focus_request().is_none());
    }

    #[test]
    fn test_add_after_index() {
        let mut session = session();
        let a = session.add("paragraph", None).unwrap();
        let b = session.add("paragraph", None).unwrap();
        let c = session.add("heading", Some(0)).unwrap();

        let ids = session.tree().container_ids(&Container::Root).unwrap();
        assert_eq!(ids, vec![a, c, b]);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut session = session();
        let err = session.add("nope", None).unwrap_err();

        assert!(matches!(err, EditorError::Model(ModelError::UnknownBlockType(_))));
        assert!(!session.is_dirty());
        assert_eq!(session.undo_stack().undo_levels(), 1);
    }

    #[test]
    fn test_update_attribute_marks_dirty_without_snapshot() {
        let mut session = session();
        let id = session.add("heading", None).unwrap();
        session.render();
        let levels = session.undo_stack().undo_levels();

        session.update_attribute(&id, "level", json!(3)).unwrap();

        assert_eq!(session.undo_stack().undo_levels(), levels);
        assert!(session.is_dirty());
        let patches = session.render();
        assert!(matches!(
            patches.as_slice(),
            [RenderPatch::ReplaceBlock { block_id, .. }] if block_id == &id
        ));
    }

    #[test]
    fn test_add_after_last_possible_index_appends() {
        let mut session = session();
        let first = session.add("paragraph", None).unwrap();

        let second = session.add("heading", Some(usize::MAX)).unwrap();

        let ids = session.tree().container_ids(&Container::Root).unwrap();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_column_count_above_limit_is_rejected() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        session.render();

        let err = session
            .update_attribute(&cols, "columnCount", json!(1_000_000_000_000u64))
            .unwrap_err();

        assert!(matches!(err, EditorError::InvalidAttribute { .. }));
        assert_eq!(session.tree().columns_block(&cols).unwrap().column_count(), 2);
        assert!(!session.needs_render());

        session
            .update_attribute(&cols, "columnCount", json!(MAX_COLUMNS))
            .unwrap();
        assert_eq!(
            session.tree().columns_block(&cols).unwrap().column_count(),
            MAX_COLUMNS
        );
    }

    #[test]
    fn test_columns_key_cannot_be_set() {
        let mut session = session();
        let id = session.add("columns", None).unwrap();

        let err = session.update_attribute(&id, "columns", json!([])).unwrap_err();
        assert!(matches!(err, EditorError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_column_count_resizes() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        session.insert_into_column("paragraph", &cols, 1, None).unwrap();

        session.update_attribute(&cols, "columnCount", json!(4)).unwrap();
        assert_eq!(session.tree().columns_block(&cols).unwrap().column_count(), 4);

        session.update_attribute(&cols, "columnCount", json!(1)).unwrap();
        let columns = session.tree().columns_block(&cols).unwrap();
        assert_eq!(columns.column_count(), 1);
        assert_eq!(columns.columns()[0].len(), 1);
        assert_eq!(session.tree().total_blocks(), 2);

        let err = session.update_attribute(&cols, "columnCount", json!(0)).unwrap_err();
        assert!(matches!(err, EditorError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_stale_id_forces_full_render() {
        let mut session = session();
        session.add("paragraph", None).unwrap();
        session.render();
        assert!(!session.needs_render());

        let err = session.delete(&BlockId::from("missing")).unwrap_err();

        assert!(err.is_block_not_found());
        assert!(matches!(session.render().as_slice(), [RenderPatch::Full(_)]));
    }

    #[test]
    fn test_checkpoint_only_when_changed() {
        let mut session = session();
        let id = session.add("paragraph", None).unwrap();
        assert!(!session.checkpoint());

        session.update_attribute(&id, "content", json!("typed")).unwrap();
        assert!(session.checkpoint());
        assert!(!session.checkpoint());
    }

    #[test]
    fn test_click_gestures() {
        let mut session = session();
        let cols = session.add("columns", None).unwrap();
        let p = session.add("paragraph", None).unwrap();

        session.click_column(&cols, 1).unwrap();
        assert_eq!(session.column_context().unwrap().column, 1);
        assert!(session.click_column(&cols, 9).is_err());

        session.click_block(&cols).unwrap();
        assert_eq!(session.selected(), Some(&cols));
        assert!(session.active_editor().is_none());

        session.click_canvas();
        assert!(session.selected().is_none());
        assert!(session.column_context().is_none());
        assert!(session.tree().contains(&p));
    }

    #[test]
    fn test_deleted_ids_are_not_reissued_after_reload() {
        let mut session = session();
        session.add("paragraph", None).unwrap();
        let deleted = session.add("paragraph", None).unwrap();
        session.delete(&deleted).unwrap();

        let json = session.tree().to_json().unwrap();
        let counter = session.id_counter();
        let mut reopened =
            EditorSession::load("42", &json, BlockRegistry::builtin(), EditorConfig::default())
                .unwrap()
                .with_id_counter(counter);
        let added = reopened.add("paragraph", None).unwrap();

        assert_ne!(added, deleted);
        assert_eq!(reopened.id_counter(), counter + 1);
    }

    #[test]
    fn test_ids_never_collide_with_loaded_blocks() {
        let mut session = session();
        let first = session.add("paragraph", None).unwrap();
        let json = session.tree().to_json().unwrap();

        let mut reopened =
            EditorSession::load("42", &json, BlockRegistry::builtin(), EditorConfig::default())
                .unwrap();
        let second = reopened.add("paragraph", None).unwrap();

        assert_ne!(first, second);
        assert_eq!(reopened.tree().total_blocks(), 2);
    }
}
