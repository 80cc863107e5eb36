use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Virtual DOM node produced by block render functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VNode {
    /// HTML element
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        styles: BTreeMap<String, String>,
        children: Vec<VNode>,
        /// Id of the block this element is the root of
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },

    /// Escaped text
    Text { content: String },

    /// Trusted inline markup (already sanitized rich text)
    Raw { html: String },

    Comment { content: String },
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
            key: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    pub fn raw(html: impl Into<String>) -> Self {
        VNode::Raw { html: html.into() }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        VNode::Comment {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element { ref mut styles, .. } = self {
            styles.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: VNode) -> Self {
        if let VNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<VNode>) -> Self {
        if let VNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        if let VNode::Element {
            key: ref mut node_key,
            ..
        } = self
        {
            *node_key = Some(key.into());
        }
        self
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            VNode::Element { key, .. } => key.as_deref(),
            _ => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn find_by_key(&self, wanted: &str) -> Option<&VNode> {
        if self.key() == Some(wanted) {
            return Some(self);
        }
        self.children()
            .iter()
            .find_map(|child| child.find_by_key(wanted))
    }

    fn replace_by_key(&mut self, wanted: &str, replacement: &mut Option<VNode>) -> bool {
        if self.key() == Some(wanted) {
            if let Some(node) = replacement.take() {
                *self = node;
                return true;
            }
            return false;
        }
        if let VNode::Element { children, .. } = self {
            for child in children.iter_mut() {
                if child.replace_by_key(wanted, replacement) {
                    return true;
                }
            }
        }
        false
    }
}

/// Rendered page: one root node per top-level block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VDocument {
    pub nodes: Vec<VNode>,
}

impl VDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: VNode) {
        self.nodes.push(node);
    }

    /// Find the node rendered for a block id, at any depth
    pub fn find_by_key(&self, key: &str) -> Option<&VNode> {
        self.nodes.iter().find_map(|node| node.find_by_key(key))
    }

    /// Swap the node rendered for a block id. Returns false if absent.
    pub fn replace_by_key(&mut self, key: &str, node: VNode) -> bool {
        let mut replacement = Some(node);
        self.nodes
            .iter_mut()
            .any(|root| root.replace_by_key(key, &mut replacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VDocument {
        let mut doc = VDocument::new();
        doc.add_node(VNode::element("p").with_key("a").with_child(VNode::text("A")));
        doc.add_node(
            VNode::element("div")
                .with_key("cols")
                .with_child(
                    VNode::element("div")
                        .with_attr("class", "column")
                        .with_child(VNode::element("p").with_key("inner")),
                ),
        );
        doc
    }

    #[test]
    fn test_find_nested_key() {
        let doc = sample();
        let node = doc.find_by_key("inner").unwrap();
        assert!(matches!(node, VNode::Element { tag, .. } if tag == "p"));
        assert!(doc.find_by_key("missing").is_none());
    }

    #[test]
    fn test_replace_by_key() {
        let mut doc = sample();
        let replaced = doc.replace_by_key("inner", VNode::element("h2").with_key("inner"));

        assert!(replaced);
        let node = doc.find_by_key("inner").unwrap();
        assert!(matches!(node, VNode::Element { tag, .. } if tag == "h2"));
        assert!(!doc.replace_by_key("missing", VNode::text("x")));
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(VNode::text("hi")).unwrap();
        assert_eq!(json["type"], "Text");
    }
}
