//! # Blockpress Model
//!
//! Data model of a block page: blocks, the block tree, the registry of block
//! types and the virtual DOM that render functions produce.
//!
//! ## Shape
//!
//! ```text
//! BlockTree
//!   └── Block::Leaf(LeafBlock)            paragraph, heading, image, ...
//!   └── Block::Columns(ColumnsBlock)
//!         └── Vec<Vec<LeafBlock>>         one list per column slot
//! ```
//!
//! A column slot holds `LeafBlock`s only, so nesting is at most one level
//! deep by construction. The serialized form is an ordered JSON array of
//! `{ id, type, attributes }`, with `attributes.columns` holding the slots.

pub mod block;
pub mod error;
pub mod id_generator;
pub mod registry;
pub mod tree;
pub mod vdom;
pub mod visitor;

pub use block::{
    Attributes, Block, BlockId, ColumnsBlock, LeafBlock, RawBlock, COLUMNS_KEY, COLUMNS_TYPE,
    COLUMN_COUNT_KEY, MAX_COLUMNS,
};
pub use error::{ModelError, ModelResult};
pub use id_generator::{get_post_seed, IdGenerator};
pub use registry::{
    AttributeSpec, BlockRegistry, BlockSpec, RenderFn, RenderInput, Supports, CONTENT_KEY,
    TEXT_KEY,
};
pub use tree::{BlockRef, BlockTree, Container, Location};
pub use vdom::{VDocument, VNode};
pub use visitor::{walk_block, walk_columns, walk_tree, BlockVisitor, TypeCounter};
