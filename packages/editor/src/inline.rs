//! # Inline rich-text editing
//!
//! The block's text attribute (`content`, or `text` for button-like
//! blocks) is the source of truth. The host owns the editable region on
//! screen and talks to the engine through [`InlineHost`]: the engine reads
//! the region back after every input or format command, and asks the host
//! to move focus after a split or merge.
//!
//! Typing is synced into the tree without an undo snapshot. Ending the edit
//! (blur) pushes one snapshot for the whole run.

use blockpress_model::{Block, BlockId, LeafBlock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::markup::split_markup;
use crate::sanitize::{sanitize_paste, PasteData};
use crate::selection::{ActiveEditor, Caret, FocusRequest};
use crate::session::EditorSession;

/// Failure reported by the host's editable region
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// Toolbar commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Align { alignment: Alignment },
    Link { url: String },
    Unlink,
    ClearFormatting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyInput {
    /// A key press with no modifiers held
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
            meta: false,
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Whether the engine consumed a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    NotHandled,
}

/// Where focus went when the region lost it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurTarget {
    /// The floating toolbar; editing continues
    Toolbar,
    Elsewhere,
}

/// The host side of an editable text region
pub trait InlineHost {
    /// Current markup of a block's region
    fn read_region(&self, block_id: &BlockId) -> Result<String, PlatformError>;

    /// Caret position within the region, in visible characters
    fn caret_offset(&self, block_id: &BlockId) -> Result<usize, PlatformError>;

    fn exec_command(
        &mut self,
        block_id: &BlockId,
        command: &FormatCommand,
    ) -> Result<(), PlatformError>;

    /// Insert markup at the caret
    fn insert_html(&mut self, block_id: &BlockId, html: &str) -> Result<(), PlatformError>;

    fn focus(&mut self, request: &FocusRequest) -> Result<(), PlatformError>;

    fn show_toolbar(&mut self, block_id: &BlockId);

    fn hide_toolbar(&mut self);
}

impl EditorSession {
    /// Attach the inline editor to a block, selecting it and showing the
    /// toolbar. An editor on another block is finished first.
    pub fn focus_block(&mut self, id: &BlockId, host: &mut dyn InlineHost) -> EditorResult<()> {
        let result = self.try_focus_block(id, host);
        self.guard(result)
    }

    fn try_focus_block(&mut self, id: &BlockId, host: &mut dyn InlineHost) -> EditorResult<()> {
        let block_type = self.tree.get(id)?.block_type().to_string();
        let attribute = self
            .registry
            .text_attribute(&block_type)
            .ok_or(EditorError::NotEditable(block_type))?;

        if let Some(current) = self.selection.active_editor() {
            if &current.block_id == id {
                return Ok(());
            }
            self.blur(BlurTarget::Elsewhere, host)?;
        }

        self.selection.begin_editing(id.clone(), attribute);
        host.show_toolbar(id);
        debug!(block = %id, "inline editing started");
        Ok(())
    }

    /// Read the active region back into the tree
    pub fn sync_inline(&mut self, host: &dyn InlineHost) -> EditorResult<bool> {
        let editor = self.active_editor_cloned()?;
        let markup = host.read_region(&editor.block_id)?;
        self.sync_attribute(&editor.block_id, &editor.attribute, Value::String(markup))
    }

    /// Run a toolbar command on the active region
    pub fn exec_format(
        &mut self,
        command: &FormatCommand,
        host: &mut dyn InlineHost,
    ) -> EditorResult<()> {
        let editor = self.active_editor_cloned()?;

        if let FormatCommand::Align { alignment } = command {
            let block_type = self.tree.get(&editor.block_id)?.block_type().to_string();
            if self.registry.supports(&block_type).align {
                return self.update_attribute(
                    &editor.block_id,
                    "align",
                    Value::String(alignment.as_str().to_string()),
                );
            }
        }

        host.exec_command(&editor.block_id, command)?;
        self.sync_inline(host)?;
        Ok(())
    }

    /// Handle Enter (split) and Backspace at offset 0 (merge). Any other
    /// key is left to the host.
    pub fn handle_key(
        &mut self,
        input: KeyInput,
        host: &mut dyn InlineHost,
    ) -> EditorResult<KeyOutcome> {
        let Some(editor) = self.selection.active_editor().cloned() else {
            return Ok(KeyOutcome::NotHandled);
        };
        if input.has_modifier() {
            return Ok(KeyOutcome::NotHandled);
        }
        let result = match input.key {
            Key::Enter => self.split_block(&editor, host),
            Key::Backspace => self.merge_with_previous(&editor, host),
            Key::Other => Ok(KeyOutcome::NotHandled),
        };
        self.guard(result)
    }

    fn split_block(
        &mut self,
        editor: &ActiveEditor,
        host: &mut dyn InlineHost,
    ) -> EditorResult<KeyOutcome> {
        let block = self.tree.get(&editor.block_id)?.to_block();
        if !self.registry.supports(block.block_type()).splitting {
            return Ok(KeyOutcome::NotHandled);
        }

        self.sync_inline(host)?;
        let caret = host.caret_offset(&editor.block_id)?;
        let block = self.tree.get(&editor.block_id)?.to_block();
        let content = text_of(&block, &editor.attribute);
        let (before, after) = split_markup(&content, caret)?;

        let location = self.tree.locate(&editor.block_id)?;
        let new_id = self.next_id();
        let mut attributes = block.attributes().clone();
        attributes.insert(editor.attribute.clone(), Value::String(after));
        let new_block = Block::Leaf(LeafBlock::new(new_id.clone(), block.block_type(), attributes)?);

        self.tree
            .insert(new_block, &location.container, location.index + 1)?;
        self.tree
            .attributes_mut(&editor.block_id)?
            .insert(editor.attribute.clone(), Value::String(before));
        self.commit("split");

        self.selection
            .begin_editing(new_id.clone(), editor.attribute.clone());
        host.focus(&FocusRequest {
            block_id: new_id,
            caret: Caret::Start,
        })?;
        Ok(KeyOutcome::Handled)
    }

    fn merge_with_previous(
        &mut self,
        editor: &ActiveEditor,
        host: &mut dyn InlineHost,
    ) -> EditorResult<KeyOutcome> {
        if host.caret_offset(&editor.block_id)? != 0 {
            return Ok(KeyOutcome::NotHandled);
        }
        let current_type = self.tree.get(&editor.block_id)?.block_type().to_string();
        if !self.registry.supports(&current_type).merging {
            return Ok(KeyOutcome::NotHandled);
        }

        let Some(previous) = self.tree.previous_sibling(&editor.block_id)? else {
            return Ok(KeyOutcome::NotHandled);
        };
        let previous_id = previous.id().clone();
        let previous_type = previous.block_type();
        let Some(previous_attribute) = self.registry.text_attribute(previous_type) else {
            return Ok(KeyOutcome::NotHandled);
        };
        if !self.registry.supports(previous_type).merging {
            return Ok(KeyOutcome::NotHandled);
        }
        let previous_content = previous
            .attributes()
            .get(previous_attribute)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.sync_inline(host)?;
        let current = self.tree.get(&editor.block_id)?.to_block();
        let merged = format!("{}{}", previous_content, text_of(&current, &editor.attribute));

        self.tree.remove(&editor.block_id)?;
        self.tree
            .attributes_mut(&previous_id)?
            .insert(previous_attribute.to_string(), Value::String(merged));
        self.commit("merge");

        self.selection
            .begin_editing(previous_id.clone(), previous_attribute);
        host.focus(&FocusRequest {
            block_id: previous_id,
            caret: Caret::End,
        })?;
        Ok(KeyOutcome::Handled)
    }

    /// Sanitize a paste, insert it into the active region and sync.
    /// Returns the markup that was inserted.
    pub fn handle_paste(
        &mut self,
        data: &PasteData,
        host: &mut dyn InlineHost,
    ) -> EditorResult<String> {
        let editor = self.active_editor_cloned()?;
        let clean = sanitize_paste(data);
        host.insert_html(&editor.block_id, &clean)?;
        self.sync_inline(host)?;
        Ok(clean)
    }

    /// Region lost focus. Moving to the toolbar keeps the editor; anything
    /// else ends editing with a final sync and a history checkpoint.
    pub fn blur(&mut self, target: BlurTarget, host: &mut dyn InlineHost) -> EditorResult<()> {
        if target == BlurTarget::Toolbar || self.selection.active_editor().is_none() {
            return Ok(());
        }
        let synced = self.sync_inline(host);
        self.selection.end_editing();
        host.hide_toolbar();
        self.checkpoint();
        debug!("inline editing ended");
        synced.map(|_| ())
    }

    fn active_editor_cloned(&self) -> EditorResult<ActiveEditor> {
        self.selection
            .active_editor()
            .cloned()
            .ok_or(EditorError::NoActiveEditor)
    }
}

fn text_of(block: &Block, attribute: &str) -> String {
    block
        .attribute(attribute)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
