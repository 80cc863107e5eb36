//! # Blocks
//!
//! A block is the atomic node of a page: an immutable id, an immutable type
//! and a free-form attribute map whose shape comes from the registry.
//!
//! Nesting is expressed in the type system. A [`ColumnsBlock`] owns its
//! column slots as `Vec<Vec<LeafBlock>>`, and a [`LeafBlock`] can never be a
//! columns block, so columns-inside-columns cannot be constructed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Attribute map of a block
pub type Attributes = Map<String, Value>;

/// Type name of the multi-column container block
pub const COLUMNS_TYPE: &str = "columns";

/// Attribute key holding the serialized column slots
pub const COLUMNS_KEY: &str = "columns";

/// Attribute key holding the number of column slots
pub const COLUMN_COUNT_KEY: &str = "columnCount";

/// Most slots a columns block may have
pub const MAX_COLUMNS: usize = 12;

/// Globally unique, immutable block identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A block that may live anywhere, including inside a column slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub struct LeafBlock {
    id: BlockId,
    block_type: String,
    pub attributes: Attributes,
}

impl LeafBlock {
    /// Create a leaf block. Fails for the columns type.
    pub fn new(
        id: BlockId,
        block_type: impl Into<String>,
        attributes: Attributes,
    ) -> ModelResult<Self> {
        let block_type = block_type.into();
        if block_type == COLUMNS_TYPE {
            return Err(ModelError::NestedColumns);
        }
        Ok(Self {
            id,
            block_type,
            attributes,
        })
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }
}

/// A multi-column container. Only ever lives at the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsBlock {
    id: BlockId,
    /// Attributes other than the column slots themselves
    pub attributes: Attributes,
    columns: Vec<Vec<LeafBlock>>,
}

impl ColumnsBlock {
    /// Create an empty container with `count` slots, clamped to
    /// `1..=MAX_COLUMNS`
    pub fn new(id: BlockId, count: usize, mut attributes: Attributes) -> Self {
        let count = count.clamp(1, MAX_COLUMNS);
        attributes.remove(COLUMNS_KEY);
        attributes.insert(COLUMN_COUNT_KEY.to_string(), Value::from(count));
        Self {
            id,
            attributes,
            columns: vec![Vec::new(); count],
        }
    }

    /// Build from existing slots. `columnCount` is rewritten to match.
    pub fn with_columns(
        id: BlockId,
        mut attributes: Attributes,
        columns: Vec<Vec<LeafBlock>>,
    ) -> Self {
        let mut columns = columns;
        if columns.is_empty() {
            columns.push(Vec::new());
        }
        attributes.remove(COLUMNS_KEY);
        attributes.insert(COLUMN_COUNT_KEY.to_string(), Value::from(columns.len()));
        Self {
            id,
            attributes,
            columns,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Vec<LeafBlock>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Vec<LeafBlock>> {
        self.columns.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Vec<LeafBlock>> {
        self.columns.get_mut(index)
    }

    /// Resize the slot list.
    ///
    /// Growing appends empty slots. Shrinking moves the contents of the
    /// dropped slots, in order, to the end of the last remaining slot, so
    /// no block ever leaves the tree. `count` is clamped to
    /// `1..=MAX_COLUMNS`.
    pub fn set_column_count(&mut self, count: usize) {
        let count = count.clamp(1, MAX_COLUMNS);
        if count > self.columns.len() {
            self.columns.resize_with(count, Vec::new);
        } else if count < self.columns.len() {
            let overflow: Vec<LeafBlock> =
                self.columns.drain(count..).flatten().collect();
            if let Some(last) = self.columns.last_mut() {
                last.extend(overflow);
            }
        }
        self.attributes
            .insert(COLUMN_COUNT_KEY.to_string(), Value::from(count));
    }
}

/// A top-level block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBlock", into = "RawBlock")]
pub enum Block {
    Leaf(LeafBlock),
    Columns(ColumnsBlock),
}

impl Block {
    pub fn id(&self) -> &BlockId {
        match self {
            Block::Leaf(leaf) => leaf.id(),
            Block::Columns(columns) => columns.id(),
        }
    }

    pub fn block_type(&self) -> &str {
        match self {
            Block::Leaf(leaf) => leaf.block_type(),
            Block::Columns(_) => COLUMNS_TYPE,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Block::Leaf(leaf) => &leaf.attributes,
            Block::Columns(columns) => &columns.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Block::Leaf(leaf) => &mut leaf.attributes,
            Block::Columns(columns) => &mut columns.attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes().get(key)
    }

    pub fn is_columns(&self) -> bool {
        matches!(self, Block::Columns(_))
    }

    pub fn as_columns(&self) -> Option<&ColumnsBlock> {
        match self {
            Block::Columns(columns) => Some(columns),
            Block::Leaf(_) => None,
        }
    }

    pub fn as_columns_mut(&mut self) -> Option<&mut ColumnsBlock> {
        match self {
            Block::Columns(columns) => Some(columns),
            Block::Leaf(_) => None,
        }
    }

    /// Convert into a block that may be placed inside a column
    pub fn into_leaf(self) -> ModelResult<LeafBlock> {
        match self {
            Block::Leaf(leaf) => Ok(leaf),
            Block::Columns(_) => Err(ModelError::NestedColumns),
        }
    }

    /// Number of blocks this block accounts for, itself included
    pub fn block_count(&self) -> usize {
        match self {
            Block::Leaf(_) => 1,
            Block::Columns(columns) => {
                1 + columns.columns().iter().map(Vec::len).sum::<usize>()
            }
        }
    }

    /// Deep copy with every id (nested ones included) replaced by `next_id`
    pub fn clone_with_fresh_ids(&self, next_id: &mut impl FnMut() -> BlockId) -> Block {
        match self {
            Block::Leaf(leaf) => Block::Leaf(LeafBlock {
                id: next_id(),
                block_type: leaf.block_type.clone(),
                attributes: leaf.attributes.clone(),
            }),
            Block::Columns(columns) => {
                let id = next_id();
                let slots = columns
                    .columns()
                    .iter()
                    .map(|slot| {
                        slot.iter()
                            .map(|leaf| LeafBlock {
                                id: next_id(),
                                block_type: leaf.block_type.clone(),
                                attributes: leaf.attributes.clone(),
                            })
                            .collect()
                    })
                    .collect();
                Block::Columns(ColumnsBlock::with_columns(
                    id,
                    columns.attributes.clone(),
                    slots,
                ))
            }
        }
    }
}

impl From<LeafBlock> for Block {
    fn from(leaf: LeafBlock) -> Self {
        Block::Leaf(leaf)
    }
}

impl From<ColumnsBlock> for Block {
    fn from(columns: ColumnsBlock) -> Self {
        Block::Columns(columns)
    }
}

/// Wire shape shared by persistence, undo snapshots and save payloads:
/// `{ id, type, attributes }`, with `attributes.columns` for columns blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl TryFrom<RawBlock> for LeafBlock {
    type Error = ModelError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        if raw.id.is_empty() {
            return Err(ModelError::invalid_block("block id is empty"));
        }
        LeafBlock::new(BlockId(raw.id), raw.block_type, raw.attributes)
    }
}

impl From<LeafBlock> for RawBlock {
    fn from(leaf: LeafBlock) -> Self {
        RawBlock {
            id: leaf.id.0,
            block_type: leaf.block_type,
            attributes: leaf.attributes,
        }
    }
}

impl TryFrom<RawBlock> for Block {
    type Error = ModelError;

    fn try_from(mut raw: RawBlock) -> Result<Self, Self::Error> {
        if raw.block_type != COLUMNS_TYPE {
            return LeafBlock::try_from(raw).map(Block::Leaf);
        }
        if raw.id.is_empty() {
            return Err(ModelError::invalid_block("block id is empty"));
        }
        let id = BlockId(raw.id);

        let slots: Vec<Vec<LeafBlock>> = match raw.attributes.remove(COLUMNS_KEY) {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => {
                let raw_slots: Vec<Vec<RawBlock>> = serde_json::from_value(value)?;
                raw_slots
                    .into_iter()
                    .map(|slot| {
                        slot.into_iter()
                            .map(LeafBlock::try_from)
                            .collect::<ModelResult<Vec<_>>>()
                    })
                    .collect::<ModelResult<Vec<_>>>()?
            }
        };

        let declared = raw
            .attributes
            .get(COLUMN_COUNT_KEY)
            .and_then(Value::as_u64)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));

        if slots.len() > MAX_COLUMNS || declared.is_some_and(|n| n > MAX_COLUMNS) {
            return Err(ModelError::invalid_block(format!(
                "columns block {} has more than {} columns",
                id, MAX_COLUMNS
            )));
        }

        let mut slots = slots;
        match declared {
            Some(declared) if declared < slots.len() => {
                return Err(ModelError::ColumnCountMismatch {
                    id,
                    declared,
                    actual: slots.len(),
                });
            }
            Some(declared) => slots.resize_with(declared.max(1), Vec::new),
            None => {}
        }

        Ok(Block::Columns(ColumnsBlock::with_columns(
            id,
            raw.attributes,
            slots,
        )))
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        match block {
            Block::Leaf(leaf) => leaf.into(),
            Block::Columns(columns) => {
                let ColumnsBlock {
                    id,
                    mut attributes,
                    columns,
                } = columns;
                let slots = columns
                    .into_iter()
                    .map(|slot| Value::Array(slot.into_iter().map(leaf_to_value).collect()))
                    .collect();
                attributes.insert(COLUMNS_KEY.to_string(), Value::Array(slots));
                RawBlock {
                    id: id.0,
                    block_type: COLUMNS_TYPE.to_string(),
                    attributes,
                }
            }
        }
    }
}

fn leaf_to_value(leaf: LeafBlock) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(leaf.id.0));
    object.insert("type".to_string(), Value::String(leaf.block_type));
    object.insert("attributes".to_string(), Value::Object(leaf.attributes));
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_leaf_rejects_columns_type() {
        let result = LeafBlock::new(BlockId::from("a"), COLUMNS_TYPE, Attributes::new());
        assert_eq!(result, Err(ModelError::NestedColumns));
    }

    #[test]
    fn test_columns_block_from_json() {
        let value = json!({
            "id": "cols",
            "type": "columns",
            "attributes": {
                "columnCount": 2,
                "columns": [[{"id": "p1", "type": "paragraph", "attributes": {"content": "Hi"}}], []]
            }
        });

        let block: Block = serde_json::from_value(value).unwrap();
        let columns = block.as_columns().unwrap();
        assert_eq!(columns.column_count(), 2);
        assert_eq!(columns.columns()[0][0].id().as_str(), "p1");
        assert!(columns.attributes.get(COLUMNS_KEY).is_none());
        assert_eq!(block.block_count(), 2);
    }

    #[test]
    fn test_nested_columns_rejected_on_load() {
        let value = json!({
            "id": "outer",
            "type": "columns",
            "attributes": {
                "columnCount": 1,
                "columns": [[{"id": "inner", "type": "columns", "attributes": {}}]]
            }
        });

        let result: Result<Block, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_columns_are_padded() {
        let value = json!({
            "id": "cols",
            "type": "columns",
            "attributes": { "columnCount": 3, "columns": [[]] }
        });

        let block: Block = serde_json::from_value(value).unwrap();
        assert_eq!(block.as_columns().unwrap().column_count(), 3);
    }

    #[test]
    fn test_more_columns_than_declared_is_an_error() {
        let raw = RawBlock {
            id: "cols".to_string(),
            block_type: COLUMNS_TYPE.to_string(),
            attributes: attrs(json!({ "columnCount": 1, "columns": [[], []] })),
        };

        assert!(matches!(
            Block::try_from(raw),
            Err(ModelError::ColumnCountMismatch { declared: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_oversized_column_count_is_rejected_on_load() {
        let value = json!({
            "id": "cols",
            "type": "columns",
            "attributes": { "columnCount": 1_000_000_000_000u64, "columns": [[]] }
        });

        let err = Block::try_from(serde_json::from_value::<RawBlock>(value).unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBlock(_)));
    }

    #[test]
    fn test_column_count_is_clamped() {
        let mut columns = ColumnsBlock::new(BlockId::from("cols"), usize::MAX, Attributes::new());
        assert_eq!(columns.column_count(), MAX_COLUMNS);

        columns.set_column_count(0);
        assert_eq!(columns.column_count(), 1);
        columns.set_column_count(MAX_COLUMNS + 1);
        assert_eq!(columns.column_count(), MAX_COLUMNS);
        assert_eq!(columns.attributes[COLUMN_COUNT_KEY], MAX_COLUMNS);
    }

    #[test]
    fn test_serialized_shape_includes_columns() {
        let leaf = LeafBlock::new(
            BlockId::from("p1"),
            "paragraph",
            attrs(json!({"content": "x"})),
        )
        .unwrap();
        let block = Block::Columns(ColumnsBlock::with_columns(
            BlockId::from("cols"),
            Attributes::new(),
            vec![vec![leaf], vec![]],
        ));

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "columns");
        assert_eq!(value["attributes"]["columnCount"], 2);
        assert_eq!(value["attributes"]["columns"][0][0]["id"], "p1");
        assert_eq!(value["attributes"]["columns"][1], json!([]));
    }

    #[test]
    fn test_shrinking_columns_keeps_blocks() {
        let mut columns = ColumnsBlock::new(BlockId::from("cols"), 3, Attributes::new());
        for (slot, id) in ["a", "b", "c"].iter().enumerate() {
            let leaf = LeafBlock::new(BlockId::from(*id), "paragraph", Attributes::new()).unwrap();
            columns.column_mut(slot).unwrap().push(leaf);
        }

        columns.set_column_count(1);

        assert_eq!(columns.column_count(), 1);
        let ids: Vec<_> = columns.columns()[0].iter().map(|b| b.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(columns.attributes[COLUMN_COUNT_KEY], 1);
    }

    #[test]
    fn test_clone_with_fresh_ids_replaces_nested_ids() {
        let leaf = LeafBlock::new(BlockId::from("p1"), "paragraph", Attributes::new()).unwrap();
        let block = Block::Columns(ColumnsBlock::with_columns(
            BlockId::from("cols"),
            Attributes::new(),
            vec![vec![leaf]],
        ));

        let mut counter = 0;
        let copy = block.clone_with_fresh_ids(&mut || {
            counter += 1;
            BlockId::new(format!("new-{}", counter))
        });

        assert_eq!(copy.id().as_str(), "new-1");
        assert_eq!(copy.as_columns().unwrap().columns()[0][0].id().as_str(), "new-2");
        assert_eq!(copy.block_count(), block.block_count());
    }
}
