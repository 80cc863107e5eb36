//! # Render Pipeline
//!
//! Turns the block tree into a [`VDocument`] through the registry's render
//! functions and decides how much of it the host has to repaint.
//!
//! - Structural changes invalidate everything: the next flush is a full
//!   document.
//! - Attribute edits invalidate single blocks: the next flush carries one
//!   `ReplaceBlock` patch per touched block.
//!
//! Every root element produced for a block is keyed by the block id.

use blockpress_model::{
    Block, BlockId, BlockRegistry, BlockTree, LeafBlock, RenderInput, VDocument, VNode,
};
use std::collections::BTreeSet;
use tracing::debug;

/// What the host has to repaint
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPatch {
    /// Replace the whole canvas
    Full(VDocument),
    /// Replace the node keyed by `block_id`
    ReplaceBlock { block_id: BlockId, node: VNode },
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Pending {
    #[default]
    Nothing,
    Blocks(BTreeSet<BlockId>),
    Full,
}

/// Manages the tree → VDOM step with a cached last render
#[derive(Debug)]
pub struct RenderPipeline {
    last_vdom: Option<VDocument>,
    pending: Pending,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self {
            last_vdom: None,
            pending: Pending::Full,
        }
    }

    /// Force a full render on the next flush
    pub fn invalidate_all(&mut self) {
        self.pending = Pending::Full;
    }

    /// Re-render one block on the next flush
    pub fn invalidate_block(&mut self, id: &BlockId) {
        if let Pending::Blocks(ids) = &mut self.pending {
            ids.insert(id.clone());
        } else if self.pending == Pending::Nothing {
            self.pending = Pending::Blocks(BTreeSet::from([id.clone()]));
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending != Pending::Nothing
    }

    pub fn last_vdom(&self) -> Option<&VDocument> {
        self.last_vdom.as_ref()
    }

    /// Drop the cached render (next flush is a full render)
    pub fn clear_cache(&mut self) {
        self.last_vdom = None;
        self.pending = Pending::Full;
    }

    /// Produce the patches for everything invalidated since the last flush
    pub fn flush(&mut self, tree: &BlockTree, registry: &BlockRegistry) -> Vec<RenderPatch> {
        let pending = std::mem::take(&mut self.pending);
        let ids = match pending {
            Pending::Nothing => return Vec::new(),
            Pending::Full => return vec![RenderPatch::Full(self.full_render(tree, registry))],
            Pending::Blocks(ids) => ids,
        };

        if self.last_vdom.is_none() {
            return vec![RenderPatch::Full(self.full_render(tree, registry))];
        }

        let mut patches = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(node) = render_by_id(tree, registry, &id) else {
                // The block vanished after it was invalidated.
                return vec![RenderPatch::Full(self.full_render(tree, registry))];
            };
            let replaced = self
                .last_vdom
                .as_mut()
                .is_some_and(|vdom| vdom.replace_by_key(id.as_str(), node.clone()));
            if !replaced {
                return vec![RenderPatch::Full(self.full_render(tree, registry))];
            }
            debug!(block = %id, "block re-rendered");
            patches.push(RenderPatch::ReplaceBlock { block_id: id, node });
        }
        patches
    }

    /// Render the whole tree and cache the result
    pub fn full_render(&mut self, tree: &BlockTree, registry: &BlockRegistry) -> VDocument {
        let vdom = render_tree(tree, registry);
        debug!(nodes = vdom.nodes.len(), "full render");
        self.last_vdom = Some(vdom.clone());
        self.pending = Pending::Nothing;
        vdom
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Render every top-level block in order
pub fn render_tree(tree: &BlockTree, registry: &BlockRegistry) -> VDocument {
    let mut vdom = VDocument::new();
    for block in tree.blocks() {
        vdom.add_node(render_block(block, registry));
    }
    vdom
}

/// Render one top-level block, children included
pub fn render_block(block: &Block, registry: &BlockRegistry) -> VNode {
    match block {
        Block::Leaf(leaf) => render_leaf(leaf, registry),
        Block::Columns(columns) => {
            let slots = columns
                .columns()
                .iter()
                .map(|slot| slot.iter().map(|leaf| render_leaf(leaf, registry)).collect())
                .collect();
            registry
                .render(&RenderInput {
                    id: columns.id(),
                    block_type: block.block_type(),
                    attributes: &columns.attributes,
                    columns: slots,
                })
                .with_key(columns.id().as_str())
        }
    }
}

fn render_leaf(leaf: &LeafBlock, registry: &BlockRegistry) -> VNode {
    registry
        .render(&RenderInput {
            id: leaf.id(),
            block_type: leaf.block_type(),
            attributes: &leaf.attributes,
            columns: Vec::new(),
        })
        .with_key(leaf.id().as_str())
}

fn render_by_id(tree: &BlockTree, registry: &BlockRegistry, id: &BlockId) -> Option<VNode> {
    let block = tree.get(id).ok()?.to_block();
    Some(render_block(&block, registry))
}
