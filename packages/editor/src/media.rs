//! Media blocks and the media picker boundary.

use async_trait::async_trait;
use blockpress_model::BlockId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::session::EditorSession;

const MEDIA_ID_KEY: &str = "mediaId";
const URL_KEY: &str = "url";
const IMAGES_KEY: &str = "images";

/// Item picked in the media dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSelection {
    pub media_id: u64,
    pub url: String,
}

/// What the picker should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
    Gallery,
}

impl MediaKind {
    pub fn for_block_type(block_type: &str) -> Option<Self> {
        match block_type {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "gallery" => Some(MediaKind::Gallery),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MediaSelector: Send + Sync {
    /// Open the picker. `None` means the dialog was dismissed.
    async fn select(&self, kind: MediaKind) -> EditorResult<Option<MediaSelection>>;
}

impl EditorSession {
    /// Write a picked item into a media block and checkpoint history
    pub fn apply_media(&mut self, id: &BlockId, selection: &MediaSelection) -> EditorResult<()> {
        let result = self.try_apply_media(id, selection);
        self.guard(result)
    }

    fn try_apply_media(&mut self, id: &BlockId, selection: &MediaSelection) -> EditorResult<()> {
        let block = self.tree.get(id)?;
        let block_type = block.block_type().to_string();

        match MediaKind::for_block_type(&block_type) {
            Some(MediaKind::Image | MediaKind::Video) => {
                self.update_attribute(id, MEDIA_ID_KEY, json!(selection.media_id))?;
                self.update_attribute(id, URL_KEY, json!(selection.url))?;
            }
            Some(MediaKind::Gallery) => {
                let mut images = match block.attributes().get(IMAGES_KEY) {
                    Some(Value::Array(images)) => images.clone(),
                    _ => Vec::new(),
                };
                images.push(json!({ "id": selection.media_id, "url": selection.url }));
                self.update_attribute(id, IMAGES_KEY, Value::Array(images))?;
            }
            None => return Err(EditorError::NotMediaBlock(block_type)),
        }

        self.checkpoint();
        debug!(block = %id, media = selection.media_id, "media applied");
        Ok(())
    }

    /// Ask the picker for an item and apply it. Returns false when the
    /// dialog was dismissed.
    pub async fn pick_media(
        &mut self,
        id: &BlockId,
        selector: &dyn MediaSelector,
    ) -> EditorResult<bool> {
        let block_type = self.tree.get(id)?.block_type().to_string();
        let kind = MediaKind::for_block_type(&block_type)
            .ok_or(EditorError::NotMediaBlock(block_type))?;

        match selector.select(kind).await? {
            Some(selection) => {
                self.apply_media(id, &selection)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
