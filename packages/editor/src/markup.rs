//! # Inline markup
//!
//! Rich-text attributes hold a small inline HTML fragment
//! (`Hello <b>wor</b>ld`). This module lexes it with logos, builds a tiny
//! inline tree and supports the two structural text operations the editor
//! needs: measuring text length and splitting at a text offset while
//! keeping tags balanced on both sides.
//!
//! Offsets count characters of visible text. An entity counts as one
//! character and so does `<br>`.

use logos::Logos;
use thiserror::Error;

/// Token types for inline HTML
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum MarkupToken<'src> {
    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    #[regex(r"</[a-zA-Z][a-zA-Z0-9]*[ \t\r\n]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim_end()
    })]
    CloseTag(&'src str),

    #[regex(r"<[a-zA-Z][a-zA-Z0-9]*([ \t\r\n/][^<>]*)?>", |lex| lex.slice())]
    OpenTag(&'src str),

    #[regex(r"&[a-zA-Z][a-zA-Z0-9]*;|&#[0-9]+;|&#[xX][0-9a-fA-F]+;", |lex| lex.slice())]
    Entity(&'src str),

    // A bare ampersand is plain text
    #[token("&")]
    Ampersand,

    #[regex(r"[^<&]+", |lex| lex.slice())]
    Text(&'src str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Unexpected input at offset {offset}")]
    UnexpectedInput { offset: usize },

    #[error("Unexpected closing tag </{tag}> at offset {offset}")]
    UnexpectedClose { tag: String, offset: usize },

    #[error("Closing tag </{found}> does not match <{expected}> at offset {offset}")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },
}

const VOID_TAGS: &[&str] = &["br", "img", "hr", "wbr"];

fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Node of an inline fragment. Text is stored decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(String),
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<InlineNode>,
    },
    Void {
        tag: String,
        attributes: Vec<(String, String)>,
    },
}

impl InlineNode {
    /// Length in caret positions
    pub fn text_len(&self) -> usize {
        match self {
            InlineNode::Text(text) => text.chars().count(),
            InlineNode::Element { children, .. } => text_len(children),
            InlineNode::Void { tag, .. } => usize::from(tag == "br"),
        }
    }

    fn is_empty_element(&self) -> bool {
        match self {
            InlineNode::Text(text) => text.is_empty(),
            InlineNode::Element { children, .. } => children.is_empty(),
            InlineNode::Void { .. } => false,
        }
    }
}

type OpenElement = (String, Vec<(String, String)>, Vec<InlineNode>);

/// Parse an inline fragment. Unclosed tags are closed at the end of input;
/// stray or mismatched closing tags and unlexable input are errors.
pub fn parse_inline(source: &str) -> Result<Vec<InlineNode>, MarkupError> {
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root = Vec::new();

    for (result, span) in MarkupToken::lexer(source).spanned() {
        let token = result.map_err(|_| MarkupError::UnexpectedInput { offset: span.start })?;
        let node = match token {
            MarkupToken::Comment => continue,
            MarkupToken::Text(text) => InlineNode::Text(text.to_string()),
            MarkupToken::Ampersand => InlineNode::Text("&".to_string()),
            MarkupToken::Entity(entity) => InlineNode::Text(decode_entity(entity)),
            MarkupToken::OpenTag(raw) => {
                let (tag, attributes, self_closing) = parse_open_tag(raw);
                if self_closing || is_void(&tag) {
                    InlineNode::Void { tag, attributes }
                } else {
                    stack.push((tag, attributes, Vec::new()));
                    continue;
                }
            }
            MarkupToken::CloseTag(name) => {
                let name = name.to_ascii_lowercase();
                if is_void(&name) {
                    continue;
                }
                let Some((tag, attributes, children)) = stack.pop() else {
                    return Err(MarkupError::UnexpectedClose {
                        tag: name,
                        offset: span.start,
                    });
                };
                if tag != name {
                    return Err(MarkupError::MismatchedClose {
                        expected: tag,
                        found: name,
                        offset: span.start,
                    });
                }
                InlineNode::Element {
                    tag,
                    attributes,
                    children,
                }
            }
        };
        push_node(&mut stack, &mut root, node);
    }

    while let Some((tag, attributes, children)) = stack.pop() {
        push_node(
            &mut stack,
            &mut root,
            InlineNode::Element {
                tag,
                attributes,
                children,
            },
        );
    }

    Ok(root)
}

fn push_node(stack: &mut [OpenElement], root: &mut Vec<InlineNode>, node: InlineNode) {
    let target = match stack.last_mut() {
        Some((_, _, children)) => children,
        None => root,
    };
    if let (Some(InlineNode::Text(previous)), InlineNode::Text(text)) = (target.last_mut(), &node) {
        previous.push_str(text);
        return;
    }
    target.push(node);
}

fn parse_open_tag(raw: &str) -> (String, Vec<(String, String)>, bool) {
    let inner = &raw[1..raw.len() - 1];
    let self_closing = inner.trim_end().ends_with('/');
    let name_end = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    (tag, parse_attributes(&inner[name_end..]), self_closing)
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = source;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                match after_eq.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let body = &after_eq[1..];
                        let end = body.find(quote).unwrap_or(body.len());
                        rest = body.get(end + 1..).unwrap_or_default();
                        decode_entities(&body[..end])
                    }
                    _ => {
                        let end = after_eq
                            .find(char::is_whitespace)
                            .unwrap_or(after_eq.len());
                        rest = &after_eq[end..];
                        decode_entities(&after_eq[..end])
                    }
                }
            }
            None => String::new(),
        };

        if !name.is_empty() {
            attributes.push((name, value));
        }
    }

    attributes
}

fn decode_entity(entity: &str) -> String {
    let body = &entity[1..entity.len() - 1];
    let decoded = match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(decimal) = body.strip_prefix('#') {
                decimal.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    };
    decoded.map_or_else(|| entity.to_string(), String::from)
}

fn decode_entities(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match rest.find(';').filter(|end| *end <= 10) {
            Some(end) => {
                out.push_str(&decode_entity(&rest[..=end]));
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Serialize an inline tree back to markup
pub fn render_inline(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text(text) => out.push_str(&escape_text(text)),
            InlineNode::Element {
                tag,
                attributes,
                children,
            } => {
                write_open_tag(tag, attributes, out);
                write_nodes(children, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            InlineNode::Void { tag, attributes } => write_open_tag(tag, attributes, out),
        }
    }
}

fn write_open_tag(tag: &str, attributes: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out.push('>');
}

pub fn text_len(nodes: &[InlineNode]) -> usize {
    nodes.iter().map(InlineNode::text_len).sum()
}

/// Visible text, with `<br>` as a newline
pub fn plain_text(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            InlineNode::Text(text) => out.push_str(text),
            InlineNode::Element { children, .. } => out.push_str(&plain_text(children)),
            InlineNode::Void { tag, .. } if tag == "br" => out.push('\n'),
            InlineNode::Void { .. } => {}
        }
    }
    out
}

/// Length of a markup string in caret positions
pub fn markup_len(source: &str) -> Result<usize, MarkupError> {
    Ok(text_len(&parse_inline(source)?))
}

/// Split markup at a text offset. Elements spanning the offset are
/// duplicated on both sides; elements left empty by the split are dropped.
/// Offsets past the end put everything on the left.
pub fn split_markup(source: &str, offset: usize) -> Result<(String, String), MarkupError> {
    let nodes = parse_inline(source)?;
    let (left, right) = split_nodes(nodes, offset);
    Ok((render_inline(&left), render_inline(&right)))
}

fn split_nodes(nodes: Vec<InlineNode>, offset: usize) -> (Vec<InlineNode>, Vec<InlineNode>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut remaining = offset;

    for node in nodes {
        if remaining == 0 {
            right.push(node);
            continue;
        }
        let len = node.text_len();
        if len <= remaining {
            remaining -= len;
            left.push(node);
            continue;
        }
        match node {
            InlineNode::Text(text) => {
                let index = text
                    .char_indices()
                    .nth(remaining)
                    .map_or(text.len(), |(index, _)| index);
                left.push(InlineNode::Text(text[..index].to_string()));
                right.push(InlineNode::Text(text[index..].to_string()));
            }
            InlineNode::Element {
                tag,
                attributes,
                children,
            } => {
                let (inner_left, inner_right) = split_nodes(children, remaining);
                left.push(InlineNode::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                    children: inner_left,
                });
                right.push(InlineNode::Element {
                    tag,
                    attributes,
                    children: inner_right,
                });
            }
            void @ InlineNode::Void { .. } => left.push(void),
        }
        remaining = 0;
    }

    (prune_empty(left), prune_empty(right))
}

fn prune_empty(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            InlineNode::Element {
                tag,
                attributes,
                children,
            } => {
                let node = InlineNode::Element {
                    tag,
                    attributes,
                    children: prune_empty(children),
                };
                (!node.is_empty_element()).then_some(node)
            }
            other => (!other.is_empty_element()).then_some(other),
        })
        .collect()
}
