//! Saves pages next to the document they were loaded from.
//!
//! `page.json` gets the block array, `page.meta.json` the title, page
//! settings, id counter and save time, and autosaves land in
//! `page.autosave.json`.

use async_trait::async_trait;
use blockpress_editor::{
    EditorError, EditorResult, PersistenceClient, SavePayload, SaveResponse,
};
use blockpress_model::BlockTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub post_id: String,
    pub title: String,
    pub page_settings: Value,
    #[serde(default)]
    pub id_counter: u64,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FilePersistence {
    document: PathBuf,
}

impl FilePersistence {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    pub fn meta_path(&self) -> PathBuf {
        self.document.with_extension("meta.json")
    }

    pub fn autosave_path(&self) -> PathBuf {
        self.document.with_extension("autosave.json")
    }

    /// Meta written by the last save, if there was one
    pub fn load_meta(&self) -> EditorResult<Option<PageMeta>> {
        let path = self.meta_path();
        if !path.exists() {
            return Ok(None);
        }
        let source = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&source)?))
    }

    async fn write_json(path: &Path, contents: String) -> EditorResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, contents).await?;
        Ok(())
    }
}

fn blocks_json(blocks: &BlockTree) -> EditorResult<String> {
    blocks
        .to_json_pretty()
        .map_err(|err| EditorError::Persistence(err.to_string()))
}

#[async_trait]
impl PersistenceClient for FilePersistence {
    async fn save(&self, payload: &SavePayload) -> EditorResult<SaveResponse> {
        let meta = PageMeta {
            post_id: payload.post_id.clone(),
            title: payload.title.clone(),
            page_settings: payload.page_settings.clone(),
            id_counter: payload.id_counter,
            saved_at: Utc::now(),
        };

        Self::write_json(&self.document, blocks_json(&payload.blocks)?).await?;
        Self::write_json(&self.meta_path(), serde_json::to_string_pretty(&meta)?).await?;

        info!(path = %self.document.display(), "page written");
        Ok(SaveResponse::ok())
    }

    async fn autosave(&self, _post_id: &str, blocks: &BlockTree) -> EditorResult<()> {
        Self::write_json(&self.autosave_path(), blocks_json(blocks)?).await
    }

    async fn preview(&self, post_url: &str) -> EditorResult<()> {
        info!(url = post_url, "preview requested");
        Ok(())
    }
}
