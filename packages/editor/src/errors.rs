//! Error types for the editor

use blockpress_model::ModelError;
use thiserror::Error;

use crate::inline::PlatformError;
use crate::markup::MarkupError;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid attribute `{key}`: {reason}")]
    InvalidAttribute { key: String, reason: String },

    #[error("No inline editor is active")]
    NoActiveEditor,

    #[error("Block type `{0}` has no editable text")]
    NotEditable(String),

    #[error("Block type `{0}` cannot hold media")]
    NotMediaBlock(String),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditorError {
    pub fn invalid_attribute(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True when the error only means a block id went stale. Hosts treat
    /// these as no-ops.
    pub fn is_block_not_found(&self) -> bool {
        matches!(self, EditorError::Model(ModelError::BlockNotFound(_)))
    }
}
