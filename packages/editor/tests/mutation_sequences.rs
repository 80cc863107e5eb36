//! Tests for sequences of mutations
//!
//! This tests:
//! - Undo/redo round trips across structural changes
//! - History bounds
//! - Column context and selection repair across chains
//! - Tree integrity after operations

use blockpress_editor::{
    BlockId, BlockRegistry, BlockTree, Container, EditorConfig, EditorSession,
    DEFAULT_HISTORY_LIMIT,
};
use serde_json::json;

fn session() -> EditorSession {
    EditorSession::new(
        "200",
        BlockTree::new(),
        BlockRegistry::builtin(),
        EditorConfig::default(),
    )
}

fn assert_unique_ids(session: &EditorSession) {
    let ids = session.tree().all_ids();
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate ids in {:?}", ids);
    assert!(session.tree().validate().is_ok());
}

#[test]
fn test_undo_reverses_structural_chain() {
    let mut session = session();
    let initial = session.tree().clone();

    let cols = session.add("columns", None).unwrap();
    let p = session.add("paragraph", None).unwrap();
    session.move_block(&p, &Container::column(cols.clone(), 1), 0).unwrap();
    let copy = session.duplicate(&cols).unwrap();
    session.delete(&cols).unwrap();
    let final_tree = session.tree().clone();
    assert_unique_ids(&session);

    let mut steps = 0;
    while session.undo() {
        steps += 1;
    }
    assert_eq!(steps, 5);
    assert_eq!(session.tree(), &initial);
    assert!(!session.can_undo());

    while session.redo() {}
    assert_eq!(session.tree(), &final_tree);
    assert!(session.tree().contains(&copy));
    assert!(!session.tree().contains(&cols));
}

#[test]
fn test_new_mutation_clears_redo() {
    let mut session = session();
    session.add("paragraph", None).unwrap();
    session.add("heading", None).unwrap();

    assert!(session.undo());
    assert!(session.can_redo());

    session.add("quote", None).unwrap();
    assert!(!session.can_redo());
    assert!(!session.redo());
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let mut session = session();
    let revision = session.revision();

    assert!(!session.undo());
    assert!(!session.redo());
    assert_eq!(session.revision(), revision);
    assert!(!session.is_dirty());
}

#[test]
fn test_history_is_bounded() {
    let mut session = session();
    for _ in 0..(DEFAULT_HISTORY_LIMIT + 20) {
        session.add("paragraph", None).unwrap();
    }

    assert_eq!(session.undo_stack().undo_levels(), DEFAULT_HISTORY_LIMIT);

    let mut steps = 0;
    while session.undo() {
        steps += 1;
    }
    assert_eq!(steps, DEFAULT_HISTORY_LIMIT - 1);
    assert_eq!(session.tree().len(), 21);
}

#[test]
fn test_custom_history_limit() {
    let config = EditorConfig {
        history_limit: 3,
        ..EditorConfig::default()
    };
    let mut session =
        EditorSession::new("200", BlockTree::new(), BlockRegistry::builtin(), config);
    for _ in 0..10 {
        session.add("divider", None).unwrap();
    }
    assert_eq!(session.undo_stack().undo_levels(), 3);
}

#[test]
fn test_column_context_is_single_use() {
    let mut session = session();
    let cols = session.add("columns", None).unwrap();

    session.click_column(&cols, 1).unwrap();
    let inside = session.add("paragraph", None).unwrap();
    let outside = session.add("paragraph", None).unwrap();

    assert_eq!(
        session.tree().locate(&inside).unwrap().container,
        Container::column(cols.clone(), 1)
    );
    assert_eq!(session.tree().locate(&outside).unwrap().container, Container::Root);
    assert!(session.column_context().is_none());
}

#[test]
fn test_columns_in_column_context_is_rejected() {
    let mut session = session();
    let cols = session.add("columns", None).unwrap();
    session.click_column(&cols, 0).unwrap();
    let before = session.tree().clone();

    assert!(session.add("columns", None).is_err());
    assert_eq!(session.tree(), &before);
    assert!(session.column_context().is_some());
}

#[test]
fn test_deleting_context_parent_drops_context() {
    let mut session = session();
    let cols = session.add("columns", None).unwrap();
    session.click_column(&cols, 0).unwrap();

    session.delete(&cols).unwrap();
    assert!(session.column_context().is_none());

    let id = session.add("paragraph", None).unwrap();
    assert_eq!(session.tree().locate(&id).unwrap().container, Container::Root);
}

#[test]
fn test_undo_drops_selection_of_vanished_block() {
    let mut session = session();
    let p = session.add("paragraph", None).unwrap();
    assert_eq!(session.selected(), Some(&p));

    session.undo();

    assert!(session.selected().is_none());
    assert!(session.active_editor().is_none());
}

#[test]
fn test_shrinking_columns_keeps_blocks() {
    let mut session = session();
    let cols = session.add("columns", None).unwrap();
    session.update_attribute(&cols, "columnCount", json!(3)).unwrap();
    let ids: Vec<BlockId> = (0..3)
        .map(|column| {
            session
                .insert_into_column("paragraph", &cols, column, None)
                .unwrap()
        })
        .collect();

    session.update_attribute(&cols, "columnCount", json!(1)).unwrap();

    for id in &ids {
        assert_eq!(
            session.tree().locate(id).unwrap().container,
            Container::column(cols.clone(), 0)
        );
    }
    assert_eq!(
        session.tree().get(&cols).unwrap().attributes()["columnCount"],
        1
    );
    assert_unique_ids(&session);
}

#[test]
fn test_settings_edit_then_checkpoint_is_undoable() {
    let mut session = session();
    let id = session.add("heading", None).unwrap();

    session.update_attribute(&id, "level", json!(4)).unwrap();
    assert!(session.checkpoint());
    assert!(session.undo());

    assert_eq!(session.tree().get(&id).unwrap().attributes()["level"], 2);
}
