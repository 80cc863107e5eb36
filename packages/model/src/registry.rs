//! # Block registry
//!
//! Static lookup from a type name to its label, default attributes,
//! `supports` flags and render function. The engine only reads from it.
//!
//! The JSON form is `{ type: { label, attributes: { key: { default } }, supports } }`.
//! Render functions cannot be expressed in JSON; a loaded registry picks up
//! the builtin renderer for every type it shares with [`BlockRegistry::builtin`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::block::{
    Attributes, Block, BlockId, ColumnsBlock, LeafBlock, COLUMNS_KEY, COLUMNS_TYPE,
    COLUMN_COUNT_KEY, MAX_COLUMNS,
};
use crate::error::{ModelError, ModelResult};
use crate::vdom::VNode;

/// Rich-text attribute used by most text blocks
pub const CONTENT_KEY: &str = "content";

/// Rich-text attribute used by button-like blocks
pub const TEXT_KEY: &str = "text";

/// Everything a render function may look at
#[derive(Debug)]
pub struct RenderInput<'a> {
    pub id: &'a BlockId,
    pub block_type: &'a str,
    pub attributes: &'a Attributes,
    /// Rendered children per column slot; empty for leaf blocks
    pub columns: Vec<Vec<VNode>>,
}

impl<'a> RenderInput<'a> {
    pub fn str_attr(&self, key: &str) -> &'a str {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn attr(&self, key: &str) -> Option<&'a Value> {
        self.attributes.get(key)
    }
}

/// Pure render function of a block type
pub type RenderFn = fn(&RenderInput) -> VNode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(default)]
    pub default: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supports {
    pub inline_editing: bool,
    pub splitting: bool,
    pub merging: bool,
    pub align: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSpec {
    pub label: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
    #[serde(default)]
    pub supports: Supports,
    #[serde(skip)]
    pub render: Option<RenderFn>,
}

impl BlockSpec {
    fn new(label: &str, defaults: Value, supports: Supports, render: RenderFn) -> Self {
        let attributes = defaults
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .map(|(key, default)| {
                        (
                            key.clone(),
                            AttributeSpec {
                                default: default.clone(),
                            },
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            label: label.to_string(),
            attributes,
            supports,
            render: Some(render),
        }
    }

    pub fn defaults(&self) -> Attributes {
        self.attributes
            .iter()
            .map(|(key, spec)| (key.clone(), spec.default.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRegistry {
    specs: BTreeMap<String, BlockSpec>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block types every page can use
    pub fn builtin() -> Self {
        let text = Supports {
            inline_editing: true,
            splitting: true,
            merging: true,
            align: true,
        };
        let inline_only = Supports {
            inline_editing: true,
            ..Supports::default()
        };
        let aligned = Supports {
            align: true,
            ..Supports::default()
        };

        let mut registry = Self::new();
        registry.register(
            "paragraph",
            BlockSpec::new("Paragraph", json!({"content": "", "align": "left"}), text, render_paragraph),
        );
        registry.register(
            "heading",
            BlockSpec::new(
                "Heading",
                json!({"content": "", "level": 2, "align": "left"}),
                text,
                render_heading,
            ),
        );
        registry.register(
            "list",
            BlockSpec::new("List", json!({"ordered": false, "items": [""]}), Supports::default(), render_list),
        );
        registry.register(
            "quote",
            BlockSpec::new(
                "Quote",
                json!({"content": "", "citation": ""}),
                Supports { splitting: false, ..text },
                render_quote,
            ),
        );
        registry.register(
            "button",
            BlockSpec::new(
                "Button",
                json!({"text": "Click here", "url": "#", "align": "left"}),
                Supports { align: true, ..inline_only },
                render_button,
            ),
        );
        registry.register(
            "image",
            BlockSpec::new(
                "Image",
                json!({"mediaId": null, "url": "", "alt": "", "caption": ""}),
                aligned,
                render_image,
            ),
        );
        registry.register(
            "video",
            BlockSpec::new(
                "Video",
                json!({"mediaId": null, "url": "", "autoplay": false}),
                Supports::default(),
                render_video,
            ),
        );
        registry.register(
            "gallery",
            BlockSpec::new("Gallery", json!({"images": [], "columns": 3}), Supports::default(), render_gallery),
        );
        registry.register(
            "spacer",
            BlockSpec::new("Spacer", json!({"height": 40}), Supports::default(), render_spacer),
        );
        registry.register(
            "divider",
            BlockSpec::new("Divider", json!({}), Supports::default(), render_divider),
        );
        registry.register(
            "table",
            BlockSpec::new(
                "Table",
                json!({"rows": [["", ""], ["", ""]], "hasHeader": false}),
                Supports::default(),
                render_table,
            ),
        );
        registry.register(
            "html",
            BlockSpec::new("Custom HTML", json!({"html": ""}), Supports::default(), render_html),
        );
        registry.register(
            COLUMNS_TYPE,
            BlockSpec::new("Columns", json!({"columnCount": 2, "gap": 24}), Supports::default(), render_columns),
        );
        registry
    }

    /// Load a registry from its JSON form
    pub fn from_json(source: &str) -> ModelResult<Self> {
        let mut registry: BlockRegistry = serde_json::from_str(source)?;
        let builtin = Self::builtin();
        for (block_type, spec) in registry.specs.iter_mut() {
            if spec.render.is_none() {
                spec.render = builtin.get(block_type).and_then(|b| b.render);
            }
        }
        Ok(registry)
    }

    /// Overlay `other` on top of this registry. Specs without a render
    /// function keep the one already registered for that type.
    pub fn merge(&mut self, other: BlockRegistry) {
        for (block_type, mut spec) in other.specs {
            if spec.render.is_none() {
                spec.render = self.get(&block_type).and_then(|existing| existing.render);
            }
            self.specs.insert(block_type, spec);
        }
    }

    pub fn register(&mut self, block_type: impl Into<String>, spec: BlockSpec) {
        self.specs.insert(block_type.into(), spec);
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockSpec> {
        self.specs.get(block_type)
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.specs.contains_key(block_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn label(&self, block_type: &str) -> Option<&str> {
        self.get(block_type).map(|spec| spec.label.as_str())
    }

    pub fn defaults(&self, block_type: &str) -> ModelResult<Attributes> {
        self.get(block_type)
            .map(BlockSpec::defaults)
            .ok_or_else(|| ModelError::UnknownBlockType(block_type.to_string()))
    }

    pub fn supports(&self, block_type: &str) -> Supports {
        self.get(block_type)
            .map(|spec| spec.supports)
            .unwrap_or_default()
    }

    /// The attribute that holds a block's rich text, if the type is
    /// inline-editable: `content`, or `text` for button-like blocks.
    pub fn text_attribute(&self, block_type: &str) -> Option<&'static str> {
        let spec = self.get(block_type)?;
        if !spec.supports.inline_editing {
            return None;
        }
        if spec.attributes.contains_key(CONTENT_KEY) {
            Some(CONTENT_KEY)
        } else if spec.attributes.contains_key(TEXT_KEY) {
            Some(TEXT_KEY)
        } else {
            None
        }
    }

    pub fn is_text_editable(&self, block_type: &str) -> bool {
        self.text_attribute(block_type).is_some()
    }

    /// Build a new block of `block_type` from its defaults
    pub fn create_block(&self, id: BlockId, block_type: &str) -> ModelResult<Block> {
        let mut attributes = self.defaults(block_type)?;
        if block_type == COLUMNS_TYPE {
            attributes.remove(COLUMNS_KEY);
            let count = attributes
                .get(COLUMN_COUNT_KEY)
                .and_then(Value::as_u64)
                .map_or(2, |n| usize::try_from(n).unwrap_or(MAX_COLUMNS));
            return Ok(Block::Columns(ColumnsBlock::new(id, count, attributes)));
        }
        Ok(Block::Leaf(LeafBlock::new(id, block_type, attributes)?))
    }

    /// Render one block. Unknown types and types without a render
    /// function get a neutral placeholder.
    pub fn render(&self, input: &RenderInput) -> VNode {
        match self.get(input.block_type).and_then(|spec| spec.render) {
            Some(render) => render(input),
            None => render_fallback(input),
        }
    }
}

fn block_element(tag: &str, input: &RenderInput) -> VNode {
    VNode::element(tag)
        .with_attr("class", format!("bp-block bp-{}", input.block_type))
        .with_attr("data-block-id", input.id.as_str())
}

fn with_align(node: VNode, input: &RenderInput) -> VNode {
    match input.str_attr("align") {
        "" | "left" => node,
        align => node.with_style("text-align", align),
    }
}

fn render_paragraph(input: &RenderInput) -> VNode {
    with_align(block_element("p", input), input).with_child(VNode::raw(input.str_attr(CONTENT_KEY)))
}

fn render_heading(input: &RenderInput) -> VNode {
    let level = input
        .attr("level")
        .and_then(Value::as_u64)
        .unwrap_or(2)
        .clamp(1, 6);
    with_align(block_element(&format!("h{}", level), input), input)
        .with_child(VNode::raw(input.str_attr(CONTENT_KEY)))
}

fn render_list(input: &RenderInput) -> VNode {
    let ordered = input.attr("ordered").and_then(Value::as_bool).unwrap_or(false);
    let items = input
        .attr("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    VNode::element("li").with_child(VNode::raw(item.as_str().unwrap_or_default()))
                })
                .collect()
        })
        .unwrap_or_default();
    block_element(if ordered { "ol" } else { "ul" }, input).with_children(items)
}

fn render_quote(input: &RenderInput) -> VNode {
    let mut node = block_element("blockquote", input)
        .with_child(VNode::element("p").with_child(VNode::raw(input.str_attr(CONTENT_KEY))));
    let citation = input.str_attr("citation");
    if !citation.is_empty() {
        node = node.with_child(VNode::element("cite").with_child(VNode::text(citation)));
    }
    node
}

fn render_button(input: &RenderInput) -> VNode {
    let link = VNode::element("a")
        .with_attr("class", "bp-button")
        .with_attr("href", input.str_attr("url"))
        .with_child(VNode::raw(input.str_attr(TEXT_KEY)));
    with_align(block_element("div", input), input).with_child(link)
}

fn render_image(input: &RenderInput) -> VNode {
    let url = input.str_attr("url");
    if url.is_empty() {
        return block_element("figure", input).with_child(VNode::comment("no image selected"));
    }
    let mut node = with_align(block_element("figure", input), input).with_child(
        VNode::element("img")
            .with_attr("src", url)
            .with_attr("alt", input.str_attr("alt")),
    );
    let caption = input.str_attr("caption");
    if !caption.is_empty() {
        node = node.with_child(VNode::element("figcaption").with_child(VNode::text(caption)));
    }
    node
}

fn render_video(input: &RenderInput) -> VNode {
    let url = input.str_attr("url");
    if url.is_empty() {
        return block_element("div", input).with_child(VNode::comment("no video selected"));
    }
    let mut video = VNode::element("video")
        .with_attr("src", url)
        .with_attr("controls", "controls");
    if input.attr("autoplay").and_then(Value::as_bool).unwrap_or(false) {
        video = video.with_attr("autoplay", "autoplay");
    }
    block_element("div", input).with_child(video)
}

fn render_gallery(input: &RenderInput) -> VNode {
    let columns = input.attr("columns").and_then(Value::as_u64).unwrap_or(3);
    let images = input
        .attr("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| image.get("url").and_then(Value::as_str))
                .map(|url| VNode::element("img").with_attr("src", url))
                .collect()
        })
        .unwrap_or_default();
    block_element("div", input)
        .with_style("display", "grid")
        .with_style("grid-template-columns", format!("repeat({}, 1fr)", columns))
        .with_children(images)
}

fn render_spacer(input: &RenderInput) -> VNode {
    let height = input.attr("height").and_then(Value::as_u64).unwrap_or(40);
    block_element("div", input).with_style("height", format!("{}px", height))
}

fn render_divider(input: &RenderInput) -> VNode {
    block_element("hr", input)
}

fn render_table(input: &RenderInput) -> VNode {
    let has_header = input.attr("hasHeader").and_then(Value::as_bool).unwrap_or(false);
    let rows = input
        .attr("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .enumerate()
                .map(|(index, row)| {
                    let cell_tag = if has_header && index == 0 { "th" } else { "td" };
                    let cells = row
                        .as_array()
                        .map(|cells| {
                            cells
                                .iter()
                                .map(|cell| {
                                    VNode::element(cell_tag)
                                        .with_child(VNode::text(cell.as_str().unwrap_or_default()))
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    VNode::element("tr").with_children(cells)
                })
                .collect()
        })
        .unwrap_or_default();
    block_element("table", input).with_children(rows)
}

fn render_html(input: &RenderInput) -> VNode {
    block_element("div", input).with_child(VNode::raw(input.str_attr("html")))
}

fn render_columns(input: &RenderInput) -> VNode {
    let gap = input.attr("gap").and_then(Value::as_u64).unwrap_or(24);
    let slots = input
        .columns
        .iter()
        .enumerate()
        .map(|(index, children)| {
            VNode::element("div")
                .with_attr("class", "bp-column")
                .with_attr("data-column", index.to_string())
                .with_children(children.clone())
        })
        .collect();
    block_element("div", input)
        .with_style("display", "flex")
        .with_style("gap", format!("{}px", gap))
        .with_children(slots)
}

fn render_fallback(input: &RenderInput) -> VNode {
    block_element("div", input).with_child(VNode::comment(format!(
        "unsupported block type: {}",
        input.block_type
    )))
}
