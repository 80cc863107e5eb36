use crate::block::{Block, ColumnsBlock, LeafBlock};
use crate::tree::{BlockTree, Container};

/// Visitor for walking a block tree immutably
///
/// Default implementations walk the whole tree in document order.
/// Override specific visit_* methods to act on nodes.
pub trait BlockVisitor: Sized {
    fn visit_tree(&mut self, tree: &BlockTree) {
        walk_tree(self, tree);
    }

    fn visit_block(&mut self, block: &Block, container: &Container) {
        walk_block(self, block, container);
    }

    fn visit_columns(&mut self, columns: &ColumnsBlock) {
        walk_columns(self, columns);
    }

    fn visit_leaf(&mut self, _leaf: &LeafBlock, _container: &Container) {
        // Leaf node, no children to walk
    }
}

pub fn walk_tree<V: BlockVisitor>(visitor: &mut V, tree: &BlockTree) {
    for block in tree.blocks() {
        visitor.visit_block(block, &Container::Root);
    }
}

pub fn walk_block<V: BlockVisitor>(visitor: &mut V, block: &Block, container: &Container) {
    match block {
        Block::Leaf(leaf) => visitor.visit_leaf(leaf, container),
        Block::Columns(columns) => visitor.visit_columns(columns),
    }
}

pub fn walk_columns<V: BlockVisitor>(visitor: &mut V, columns: &ColumnsBlock) {
    for (index, slot) in columns.columns().iter().enumerate() {
        let container = Container::column(columns.id().clone(), index);
        for leaf in slot {
            visitor.visit_leaf(leaf, &container);
        }
    }
}

/// Counts blocks by type
#[derive(Debug, Default)]
pub struct TypeCounter {
    pub counts: std::collections::BTreeMap<String, usize>,
}

impl BlockVisitor for TypeCounter {
    fn visit_columns(&mut self, columns: &ColumnsBlock) {
        *self
            .counts
            .entry(crate::block::COLUMNS_TYPE.to_string())
            .or_default() += 1;
        walk_columns(self, columns);
    }

    fn visit_leaf(&mut self, leaf: &LeafBlock, _container: &Container) {
        *self.counts.entry(leaf.block_type().to_string()).or_default() += 1;
    }
}
