use thiserror::Error;

use crate::block::BlockId;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Duplicate block id: {0}")]
    DuplicateId(BlockId),

    #[error("Columns blocks cannot be nested inside a column")]
    NestedColumns,

    #[error("Invalid column {column} for block {parent}")]
    InvalidColumn { parent: BlockId, column: usize },

    #[error("Block {id} declares {declared} columns but holds {actual}")]
    ColumnCountMismatch {
        id: BlockId,
        declared: usize,
        actual: usize,
    },

    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ModelError {
    pub fn invalid_column(parent: &BlockId, column: usize) -> Self {
        Self::InvalidColumn {
            parent: parent.clone(),
            column,
        }
    }

    pub fn invalid_block(message: impl Into<String>) -> Self {
        Self::InvalidBlock(message.into())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}
