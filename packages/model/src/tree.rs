//! # Block tree
//!
//! The ordered list of top-level blocks plus every column slot below them.
//! All lookups go through [`BlockTree::locate`], which resolves an id to its
//! container and index.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::block::{Attributes, Block, BlockId, ColumnsBlock, LeafBlock};
use crate::error::{ModelError, ModelResult};

/// A list that can hold blocks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Container {
    Root,
    Column { parent: BlockId, column: usize },
}

impl Container {
    pub fn column(parent: impl Into<BlockId>, column: usize) -> Self {
        Container::Column {
            parent: parent.into(),
            column,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Container::Root)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Root => write!(f, "root"),
            Container::Column { parent, column } => write!(f, "{}[{}]", parent, column),
        }
    }
}

/// Where a block lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub container: Container,
    pub index: usize,
}

/// Borrowed view of a block at any depth
#[derive(Debug, Clone, Copy)]
pub enum BlockRef<'a> {
    Top(&'a Block),
    Nested(&'a LeafBlock),
}

impl<'a> BlockRef<'a> {
    pub fn id(&self) -> &'a BlockId {
        match self {
            BlockRef::Top(block) => block.id(),
            BlockRef::Nested(leaf) => leaf.id(),
        }
    }

    pub fn block_type(&self) -> &'a str {
        match self {
            BlockRef::Top(block) => block.block_type(),
            BlockRef::Nested(leaf) => leaf.block_type(),
        }
    }

    pub fn attributes(&self) -> &'a Attributes {
        match self {
            BlockRef::Top(block) => block.attributes(),
            BlockRef::Nested(leaf) => &leaf.attributes,
        }
    }

    pub fn to_block(&self) -> Block {
        match self {
            BlockRef::Top(block) => (*block).clone(),
            BlockRef::Nested(leaf) => Block::Leaf((*leaf).clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct BlockTree {
    blocks: Vec<Block>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree, checking that every id is unique
    pub fn from_blocks(blocks: Vec<Block>) -> ModelResult<Self> {
        let tree = Self { blocks };
        tree.validate()?;
        Ok(tree)
    }

    pub fn from_json(source: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_value(value: Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of top-level blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Number of blocks at every depth
    pub fn total_blocks(&self) -> usize {
        self.blocks.iter().map(Block::block_count).sum()
    }

    /// Every id in document order
    pub fn all_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::with_capacity(self.total_blocks());
        for block in &self.blocks {
            ids.push(block.id().clone());
            if let Block::Columns(columns) = block {
                for slot in columns.columns() {
                    ids.extend(slot.iter().map(|leaf| leaf.id().clone()));
                }
            }
        }
        ids
    }

    /// Check the uniqueness invariant
    pub fn validate(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for id in self.all_ids() {
            if !seen.insert(id.clone()) {
                return Err(ModelError::DuplicateId(id));
            }
        }
        Ok(())
    }

    pub fn locate(&self, id: &BlockId) -> ModelResult<Location> {
        for (index, block) in self.blocks.iter().enumerate() {
            if block.id() == id {
                return Ok(Location {
                    container: Container::Root,
                    index,
                });
            }
            if let Block::Columns(columns) = block {
                for (column, slot) in columns.columns().iter().enumerate() {
                    if let Some(index) = slot.iter().position(|leaf| leaf.id() == id) {
                        return Ok(Location {
                            container: Container::column(columns.id().clone(), column),
                            index,
                        });
                    }
                }
            }
        }
        Err(ModelError::BlockNotFound(id.clone()))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.locate(id).is_ok()
    }

    pub fn get(&self, id: &BlockId) -> ModelResult<BlockRef<'_>> {
        let location = self.locate(id)?;
        match &location.container {
            Container::Root => Ok(BlockRef::Top(&self.blocks[location.index])),
            Container::Column { parent, column } => {
                let slot = self.slot(parent, *column)?;
                Ok(BlockRef::Nested(&slot[location.index]))
            }
        }
    }

    pub fn attributes_mut(&mut self, id: &BlockId) -> ModelResult<&mut Attributes> {
        let location = self.locate(id)?;
        match location.container {
            Container::Root => Ok(self.blocks[location.index].attributes_mut()),
            Container::Column { parent, column } => {
                let slot = self.slot_mut(&parent, column)?;
                Ok(&mut slot[location.index].attributes)
            }
        }
    }

    pub fn columns_block(&self, id: &BlockId) -> Option<&ColumnsBlock> {
        self.blocks
            .iter()
            .find(|block| block.id() == id)
            .and_then(Block::as_columns)
    }

    pub fn columns_block_mut(&mut self, id: &BlockId) -> Option<&mut ColumnsBlock> {
        self.blocks
            .iter_mut()
            .find(|block| block.id() == id)
            .and_then(Block::as_columns_mut)
    }

    fn slot(&self, parent: &BlockId, column: usize) -> ModelResult<&Vec<LeafBlock>> {
        let columns = self
            .columns_block(parent)
            .ok_or_else(|| ModelError::BlockNotFound(parent.clone()))?;
        columns
            .column(column)
            .ok_or_else(|| ModelError::invalid_column(parent, column))
    }

    fn slot_mut(&mut self, parent: &BlockId, column: usize) -> ModelResult<&mut Vec<LeafBlock>> {
        let columns = self
            .columns_block_mut(parent)
            .ok_or_else(|| ModelError::BlockNotFound(parent.clone()))?;
        columns
            .column_mut(column)
            .ok_or_else(|| ModelError::invalid_column(parent, column))
    }

    /// Fails if the container does not exist
    pub fn validate_container(&self, container: &Container) -> ModelResult<()> {
        self.container_len(container).map(|_| ())
    }

    pub fn container_len(&self, container: &Container) -> ModelResult<usize> {
        match container {
            Container::Root => Ok(self.blocks.len()),
            Container::Column { parent, column } => Ok(self.slot(parent, *column)?.len()),
        }
    }

    /// Ids of the blocks directly inside a container
    pub fn container_ids(&self, container: &Container) -> ModelResult<Vec<BlockId>> {
        match container {
            Container::Root => Ok(self.blocks.iter().map(|b| b.id().clone()).collect()),
            Container::Column { parent, column } => Ok(self
                .slot(parent, *column)?
                .iter()
                .map(|leaf| leaf.id().clone())
                .collect()),
        }
    }

    /// The block right before `id` in the same container, if any
    pub fn previous_sibling(&self, id: &BlockId) -> ModelResult<Option<BlockRef<'_>>> {
        let location = self.locate(id)?;
        if location.index == 0 {
            return Ok(None);
        }
        let previous = location.index - 1;
        match &location.container {
            Container::Root => Ok(Some(BlockRef::Top(&self.blocks[previous]))),
            Container::Column { parent, column } => {
                Ok(Some(BlockRef::Nested(&self.slot(parent, *column)?[previous])))
            }
        }
    }

    /// Insert a block into a container. The index is clamped to the
    /// container length. Fails without touching the tree if any id in
    /// `block` already exists, or if a columns block targets a column.
    pub fn insert(
        &mut self,
        block: Block,
        container: &Container,
        index: usize,
    ) -> ModelResult<Location> {
        self.validate_container(container)?;
        if !container.is_root() && block.is_columns() {
            return Err(ModelError::NestedColumns);
        }
        self.check_new_ids(&block)?;

        let index = match container {
            Container::Root => {
                let index = index.min(self.blocks.len());
                self.blocks.insert(index, block);
                index
            }
            Container::Column { parent, column } => {
                let leaf = block.into_leaf()?;
                let slot = self.slot_mut(parent, *column)?;
                let index = index.min(slot.len());
                slot.insert(index, leaf);
                index
            }
        };

        Ok(Location {
            container: container.clone(),
            index,
        })
    }

    fn check_new_ids(&self, block: &Block) -> ModelResult<()> {
        let existing: HashSet<BlockId> = self.all_ids().into_iter().collect();
        let mut incoming = vec![block.id().clone()];
        if let Block::Columns(columns) = block {
            for slot in columns.columns() {
                incoming.extend(slot.iter().map(|leaf| leaf.id().clone()));
            }
        }
        let mut seen = HashSet::new();
        for id in incoming {
            if existing.contains(&id) || !seen.insert(id.clone()) {
                return Err(ModelError::DuplicateId(id));
            }
        }
        Ok(())
    }

    /// Detach a block (with its column contents) from the tree
    pub fn remove(&mut self, id: &BlockId) -> ModelResult<(Block, Location)> {
        let location = self.locate(id)?;
        let block = match &location.container {
            Container::Root => self.blocks.remove(location.index),
            Container::Column { parent, column } => {
                Block::Leaf(self.slot_mut(parent, *column)?.remove(location.index))
            }
        };
        Ok((block, location))
    }

    /// Move a block to `dest` at `index`.
    ///
    /// The index is interpreted against the destination as it looks after
    /// the block has been detached, and is clamped to its length. Every
    /// precondition is checked first, so a failed move never loses the
    /// block.
    pub fn move_block(
        &mut self,
        id: &BlockId,
        dest: &Container,
        index: usize,
    ) -> ModelResult<Location> {
        let source = self.locate(id)?;
        self.validate_container(dest)?;
        if let Container::Column { parent, .. } = dest {
            if parent == id || self.columns_block(id).is_some() {
                return Err(ModelError::NestedColumns);
            }
        }

        let (block, _) = self.remove(id)?;
        match self.insert(block.clone(), dest, index) {
            Ok(location) => Ok(location),
            Err(err) => {
                // Put the block back where it was.
                match &source.container {
                    Container::Root => self.blocks.insert(source.index, block),
                    Container::Column { parent, column } => {
                        let leaf = block.into_leaf()?;
                        self.slot_mut(parent, *column)?.insert(source.index, leaf);
                    }
                }
                Err(err)
            }
        }
    }
}

impl TryFrom<Vec<Block>> for BlockTree {
    type Error = ModelError;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        BlockTree::from_blocks(blocks)
    }
}

impl From<BlockTree> for Vec<Block> {
    fn from(tree: BlockTree) -> Self {
        tree.blocks
    }
}
