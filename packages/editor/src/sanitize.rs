//! Paste sanitizer.
//!
//! Pasted HTML is reduced to text plus a short list of inline formatting
//! tags. Every attribute is stripped except `href` on links, and only for
//! safe URL schemes. Disallowed elements are unwrapped (their text is kept);
//! script-like elements are dropped with their contents.

use tracing::warn;

use crate::markup::{escape_text, parse_inline, render_inline, InlineNode, MarkupError};

/// Inline tags that survive a paste
pub const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "a", "br", "code", "sub", "sup", "mark",
];

/// Unwrapped elements whose contents start on a new line
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
    "section", "article", "header", "footer",
];

const DROPPED_TAGS: &[&str] = &["script", "style", "iframe", "object", "embed", "template", "noscript"];

const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:", "tel:"];

/// Clipboard contents as the host hands them over
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteData {
    pub html: Option<String>,
    pub text: String,
}

impl PasteData {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: text.into(),
        }
    }

    pub fn html(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: text.into(),
        }
    }
}

/// Sanitize an HTML fragment. Fails on malformed markup.
pub fn sanitize_html(html: &str) -> Result<String, MarkupError> {
    let nodes = parse_inline(html)?;
    Ok(render_inline(&sanitize_nodes(nodes)))
}

/// Markup to insert for a paste. Malformed HTML falls back to the plain
/// text flavor, escaped.
pub fn sanitize_paste(data: &PasteData) -> String {
    match &data.html {
        Some(html) => match sanitize_html(html) {
            Ok(clean) => clean,
            Err(err) => {
                warn!(error = %err, "malformed paste, falling back to plain text");
                plain_text_markup(&data.text)
            }
        },
        None => plain_text_markup(&data.text),
    }
}

/// Escape plain text, turning newlines into `<br>`
pub fn plain_text_markup(text: &str) -> String {
    text.lines()
        .map(escape_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn sanitize_nodes(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut out = Vec::new();
    // Set after a block-level element; the next content goes on a new line
    let mut pending_break = false;
    for node in nodes {
        match node {
            InlineNode::Text(text) => {
                if pending_break && text.trim().is_empty() {
                    continue;
                }
                flush_break(&mut out, &mut pending_break);
                push_text(&mut out, text);
            }
            InlineNode::Void { tag, .. } => {
                if tag == "br" {
                    pending_break = false;
                    out.push(line_break());
                }
            }
            InlineNode::Element {
                tag,
                attributes,
                children,
            } => {
                if DROPPED_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                let children = sanitize_nodes(children);
                if ALLOWED_TAGS.contains(&tag.as_str()) {
                    flush_break(&mut out, &mut pending_break);
                    out.push(InlineNode::Element {
                        attributes: allowed_attributes(&tag, attributes),
                        tag,
                        children,
                    });
                } else {
                    let is_block = BLOCK_TAGS.contains(&tag.as_str());
                    pending_break |= is_block;
                    for child in children {
                        flush_break(&mut out, &mut pending_break);
                        match child {
                            InlineNode::Text(text) => push_text(&mut out, text),
                            other => out.push(other),
                        }
                    }
                    pending_break |= is_block;
                }
            }
        }
    }
    out
}

fn line_break() -> InlineNode {
    InlineNode::Void {
        tag: "br".to_string(),
        attributes: Vec::new(),
    }
}

/// Emit a pending `<br>` unless the output is empty or already ends in one
fn flush_break(out: &mut Vec<InlineNode>, pending_break: &mut bool) {
    if !std::mem::take(pending_break) {
        return;
    }
    let ends_in_break = matches!(out.last(), Some(InlineNode::Void { tag, .. }) if tag == "br");
    if !out.is_empty() && !ends_in_break {
        out.push(line_break());
    }
}

fn push_text(out: &mut Vec<InlineNode>, text: String) {
    if let Some(InlineNode::Text(previous)) = out.last_mut() {
        previous.push_str(&text);
    } else {
        out.push(InlineNode::Text(text));
    }
}

fn allowed_attributes(tag: &str, attributes: Vec<(String, String)>) -> Vec<(String, String)> {
    if tag != "a" {
        return Vec::new();
    }
    attributes
        .into_iter()
        .filter(|(name, value)| name == "href" && is_safe_url(value))
        .collect()
}

fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    match url.find(':') {
        Some(colon) if !url[..colon].contains(['/', '?', '#']) => {
            let scheme = url[..=colon].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}
