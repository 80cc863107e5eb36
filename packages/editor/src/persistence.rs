//! # Persistence
//!
//! The boundary to whatever stores pages. A save runs in three steps:
//!
//! 1. [`EditorSession::prepare_save`] captures the tree and the revision
//! 2. the client call runs
//! 3. [`EditorSession::complete_save`] applies the response
//!
//! [`EditorSession::save`] does all three while holding `&mut self` across
//! the client call, which suits a session with a single owner. A session
//! shared behind `Arc<Mutex<_>>`, as with
//! [`AutosaveDriver`](crate::AutosaveDriver), should lock for steps 1 and 3
//! only, so the lock is not held during the request.
//!
//! Saves and autosaves are independent requests; the last one to reach the
//! store wins. Only a manual save clears the dirty flag, and only when
//! nothing was edited while it was in flight.

use async_trait::async_trait;
use blockpress_model::BlockTree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{EditorError, EditorResult};
use crate::session::EditorSession;

/// What the save indicator shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
}

/// Body of a manual save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub post_id: String,
    pub blocks: BlockTree,
    pub title: String,
    pub page_settings: Value,
    /// Id high-water mark, restored with [`EditorSession::with_id_counter`]
    #[serde(default)]
    pub id_counter: u64,
}

/// A save captured at a given revision
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub revision: u64,
    pub payload: SavePayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait PersistenceClient: Send + Sync {
    async fn save(&self, payload: &SavePayload) -> EditorResult<SaveResponse>;

    /// Background save of the blocks only
    async fn autosave(&self, post_id: &str, blocks: &BlockTree) -> EditorResult<()>;

    /// Open a preview of the page at `post_url`
    async fn preview(&self, post_url: &str) -> EditorResult<()>;
}

impl EditorSession {
    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    /// Capture the current page for a save and show the saving status
    pub fn prepare_save(&mut self) -> SaveRequest {
        self.save_status = SaveStatus::Saving;
        SaveRequest {
            revision: self.revision,
            payload: SavePayload {
                post_id: self.post_id.clone(),
                blocks: self.tree.clone(),
                title: self.title.clone(),
                page_settings: self.page_settings.clone(),
                id_counter: self.id_counter(),
            },
        }
    }

    /// Apply the result of a save started at `revision`. Returns whether
    /// the save succeeded.
    pub fn complete_save(&mut self, revision: u64, result: EditorResult<SaveResponse>) -> bool {
        let failure = match result {
            Ok(response) if response.success => None,
            Ok(response) => Some(
                response
                    .error
                    .unwrap_or_else(|| "save rejected".to_string()),
            ),
            Err(err) => Some(err.to_string()),
        };

        match failure {
            None => {
                if self.revision == revision {
                    self.dirty = false;
                    self.autosave.cancel();
                }
                self.save_status = SaveStatus::Saved;
                info!(post = %self.post_id, revision, still_dirty = self.dirty, "page saved");
                true
            }
            Some(message) => {
                warn!(post = %self.post_id, error = %message, "save failed");
                self.save_status = SaveStatus::Failed(message);
                false
            }
        }
    }

    /// Save through `client`. A failure is reported through the status and
    /// the returned error; the page stays dirty.
    ///
    /// Holds the session for the whole request. Shared sessions should use
    /// [`prepare_save`](Self::prepare_save) and
    /// [`complete_save`](Self::complete_save) around the client call instead.
    pub async fn save(&mut self, client: &dyn PersistenceClient) -> EditorResult<()> {
        let request = self.prepare_save();
        let result = client.save(&request.payload).await;
        let failure = match &result {
            Ok(response) if !response.success => response.error.clone(),
            Err(err) => Some(err.to_string()),
            _ => None,
        };
        if self.complete_save(request.revision, result) {
            Ok(())
        } else {
            Err(EditorError::Persistence(
                failure.unwrap_or_else(|| "save rejected".to_string()),
            ))
        }
    }

    /// Background save. Errors are logged, never surfaced, and the dirty
    /// flag is left alone.
    pub async fn autosave(&mut self, client: &dyn PersistenceClient) {
        self.autosave.cancel();
        let blocks = self.tree.clone();
        if let Err(err) = client.autosave(&self.post_id, &blocks).await {
            warn!(post = %self.post_id, error = %err, "autosave failed");
        }
    }

    /// Save if there are unsaved changes, then open the preview. The
    /// preview is skipped when that save fails.
    pub async fn preview(
        &mut self,
        client: &dyn PersistenceClient,
        post_url: &str,
    ) -> EditorResult<()> {
        if self.dirty {
            self.save(client).await?;
        }
        client.preview(post_url).await
    }
}
