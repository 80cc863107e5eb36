//! # Blockpress Editor
//!
//! Live editing engine for block pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: pointer, keyboard, editable regions   │
//! └─────────────────────────────────────────────┘
//!          ↓ gestures, keys, drags
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorSession                       │
//! │  - Block mutations with validation          │
//! │  - Undo/redo snapshots                      │
//! │  - Inline rich text (split, merge, paste)   │
//! │  - Drag and drop placement                  │
//! │  - Save, autosave, preview                  │
//! └─────────────────────────────────────────────┘
//!          ↓ render patches
//! ┌─────────────────────────────────────────────┐
//! │ model: BlockTree → VDocument                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: the DOM is a derived view
//! 2. **Failed operations change nothing**: a stale id only forces a re-render
//! 3. **Snapshots, not inverses**: undo restores whole trees
//! 4. **Typing is cheap**: keystrokes sync without history; blur checkpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockpress_editor::{EditorConfig, EditorSession, Mutation};
//! use blockpress_model::BlockRegistry;
//!
//! let mut session =
//!     EditorSession::load("42", &json, BlockRegistry::builtin(), EditorConfig::default())?;
//!
//! let id = session.add("paragraph", None)?;
//! session.apply(Mutation::UpdateAttribute {
//!     block_id: id,
//!     key: "content".to_string(),
//!     value: "Hello".into(),
//! })?;
//!
//! for patch in session.render() {
//!     // hand to the host
//! }
//!
//! session.save(&client).await?;
//! ```

mod autosave;
mod config;
mod drag;
mod errors;
mod inline;
mod markup;
mod media;
mod mutations;
mod persistence;
mod pipeline;
mod post_effects;
mod sanitize;
mod selection;
mod session;
mod undo_stack;

pub use autosave::{AutosaveDriver, AutosaveRequest, AutosaveScheduler};
pub use config::EditorConfig;
pub use drag::{ContainerLayout, DragController, DragPhase, DragSource, DropOutcome, DropTarget};
pub use errors::{EditorError, EditorResult};
pub use inline::{
    Alignment, BlurTarget, FormatCommand, InlineHost, Key, KeyInput, KeyOutcome, PlatformError,
};
pub use markup::{
    escape_attribute, escape_text, markup_len, parse_inline, plain_text, render_inline,
    split_markup, InlineNode, MarkupError,
};
pub use media::{MediaKind, MediaSelection, MediaSelector};
pub use mutations::{Mutation, MutationOutcome};
pub use persistence::{PersistenceClient, SavePayload, SaveRequest, SaveResponse, SaveStatus};
pub use pipeline::{render_block, render_tree, RenderPatch, RenderPipeline};
pub use post_effects::{PostEffect, PostEffectEngine};
pub use sanitize::{plain_text_markup, sanitize_html, sanitize_paste, PasteData, ALLOWED_TAGS};
pub use selection::{ActiveEditor, Caret, ColumnContext, FocusRequest, SelectionState};
pub use session::EditorSession;
pub use undo_stack::{UndoStack, DEFAULT_HISTORY_LIMIT};

// Re-export common types for convenience
pub use blockpress_model::{BlockId, BlockRegistry, BlockTree, Container, VDocument, VNode};
