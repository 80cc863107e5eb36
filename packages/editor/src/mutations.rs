//! # Block Mutations
//!
//! Serializable form of the structural and attribute operations a session
//! supports. Hosts that drive the editor over a message channel, and the
//! CLI's replay scripts, speak this format:
//!
//! ```json
//! { "op": "addAt", "blockType": "paragraph", "index": 0 }
//! { "op": "move", "blockId": "a1-3", "container": { "kind": "root" }, "index": 2 }
//! ```
//!
//! ## Mutation Semantics
//!
//! ### Move
//! - Atomic: the block is detached and re-inserted, never duplicated or lost
//! - The index refers to the destination after the block was detached
//! - Columns blocks cannot move into a column
//!
//! ### UpdateAttribute
//! - Merges a single key, last write wins
//! - Does not push an undo snapshot
//!
//! ### Delete
//! - Removes the block and, for columns, everything inside it

use blockpress_model::{BlockId, Container, Location};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EditorResult;
use crate::session::EditorSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Add after a top-level index (or into the active column context)
    Add {
        block_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_index: Option<usize>,
    },

    /// Add at a top-level index
    AddAt { block_type: String, index: usize },

    /// Add into a column slot; `None` appends
    InsertIntoColumn {
        block_type: String,
        parent: BlockId,
        column: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    Duplicate { block_id: BlockId },

    Delete { block_id: BlockId },

    Move {
        block_id: BlockId,
        container: Container,
        index: usize,
    },

    UpdateAttribute {
        block_id: BlockId,
        key: String,
        value: Value,
    },
}

/// What a mutation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Inserted(BlockId),
    Removed(BlockId),
    Moved { block_id: BlockId, location: Location },
    Updated(BlockId),
}

impl Mutation {
    /// Apply to a session, with the session's validation and bookkeeping
    pub fn apply(self, session: &mut EditorSession) -> EditorResult<MutationOutcome> {
        match self {
            Mutation::Add {
                block_type,
                after_index,
            } => session
                .add(&block_type, after_index)
                .map(MutationOutcome::Inserted),

            Mutation::AddAt { block_type, index } => session
                .add_at(&block_type, index)
                .map(MutationOutcome::Inserted),

            Mutation::InsertIntoColumn {
                block_type,
                parent,
                column,
                index,
            } => session
                .insert_into_column(&block_type, &parent, column, index)
                .map(MutationOutcome::Inserted),

            Mutation::Duplicate { block_id } => session
                .duplicate(&block_id)
                .map(MutationOutcome::Inserted),

            Mutation::Delete { block_id } => {
                session.delete(&block_id)?;
                Ok(MutationOutcome::Removed(block_id))
            }

            Mutation::Move {
                block_id,
                container,
                index,
            } => {
                let location = session.move_block(&block_id, &container, index)?;
                Ok(MutationOutcome::Moved { block_id, location })
            }

            Mutation::UpdateAttribute {
                block_id,
                key,
                value,
            } => {
                session.update_attribute(&block_id, &key, value)?;
                Ok(MutationOutcome::Updated(block_id))
            }
        }
    }

    /// The existing block this mutation targets, if any
    pub fn target(&self) -> Option<&BlockId> {
        match self {
            Mutation::Add { .. } | Mutation::AddAt { .. } => None,
            Mutation::InsertIntoColumn { parent, .. } => Some(parent),
            Mutation::Duplicate { block_id }
            | Mutation::Delete { block_id }
            | Mutation::Move { block_id, .. }
            | Mutation::UpdateAttribute { block_id, .. } => Some(block_id),
        }
    }

    /// Structural mutations push an undo snapshot
    pub fn is_structural(&self) -> bool {
        !matches!(self, Mutation::UpdateAttribute { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_json_shape() {
        let mutation: Mutation = serde_json::from_value(json!({
            "op": "move",
            "blockId": "a",
            "container": { "kind": "column", "parent": "cols", "column": 1 },
            "index": 0
        }))
        .unwrap();

        assert_eq!(
            mutation,
            Mutation::Move {
                block_id: BlockId::from("a"),
                container: Container::column("cols", 1),
                index: 0,
            }
        );
        assert_eq!(mutation.target(), Some(&BlockId::from("a")));
        assert!(mutation.is_structural());
    }

    #[test]
    fn test_optional_fields_default() {
        let mutation: Mutation =
            serde_json::from_value(json!({ "op": "add", "blockType": "paragraph" })).unwrap();
        assert_eq!(
            mutation,
            Mutation::Add {
                block_type: "paragraph".to_string(),
                after_index: None,
            }
        );

        let value = serde_json::to_value(&mutation).unwrap();
        assert_eq!(value, json!({ "op": "add", "blockType": "paragraph" }));
    }

    #[test]
    fn test_update_attribute_is_not_structural() {
        let mutation = Mutation::UpdateAttribute {
            block_id: BlockId::from("a"),
            key: "content".to_string(),
            value: json!("x"),
        };
        assert!(!mutation.is_structural());
    }
}
