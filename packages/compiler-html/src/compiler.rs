use blockpress_model::{VDocument, VNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during HTML compilation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Invalid tag name: {0:?}")]
    InvalidTagName(String),

    #[error("Invalid attribute name {name:?} on <{tag}>")]
    InvalidAttributeName { tag: String, name: String },
}

/// Options for HTML compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Pretty print HTML
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
    /// Wrap the blocks in a complete HTML page
    pub full_page: bool,
    /// Page title, used with `full_page`
    pub title: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
            full_page: false,
            title: "Untitled".to_string(),
        }
    }
}

struct Context {
    options: CompileOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    fn new(options: CompileOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        self.newline();
    }

    fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    fn newline(&mut self) {
        if self.options.pretty {
            self.add("\n");
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

/// Compile a rendered page to HTML
pub fn compile_to_html(document: &VDocument, options: CompileOptions) -> Result<String, CompileError> {
    let mut ctx = Context::new(options);

    if !ctx.options.full_page {
        compile_nodes(&document.nodes, &mut ctx)?;
        return Ok(ctx.get_output());
    }

    ctx.add_line("<!DOCTYPE html>");
    ctx.add_line("<html>");
    ctx.indent();

    compile_head(&mut ctx);

    ctx.add_line("<body>");
    ctx.indent();
    compile_nodes(&document.nodes, &mut ctx)?;
    ctx.dedent();
    ctx.add_line("</body>");

    ctx.dedent();
    ctx.add_line("</html>");

    Ok(ctx.get_output())
}

/// Compile a single node, e.g. one block re-rendered after an edit
pub fn compile_node(node: &VNode, options: CompileOptions) -> Result<String, CompileError> {
    let mut ctx = Context::new(options);
    compile_block_node(node, &mut ctx)?;
    Ok(ctx.get_output())
}

fn compile_head(ctx: &mut Context) {
    ctx.add_line("<head>");
    ctx.indent();

    ctx.add_line("<meta charset=\"UTF-8\">");
    ctx.add_line("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">");
    let title = format!("<title>{}</title>", escape_html(&ctx.options.title));
    ctx.add_line(&title);

    ctx.dedent();
    ctx.add_line("</head>");
}

fn compile_nodes(nodes: &[VNode], ctx: &mut Context) -> Result<(), CompileError> {
    for node in nodes {
        compile_block_node(node, ctx)?;
    }
    Ok(())
}

/// A node on its own line(s)
fn compile_block_node(node: &VNode, ctx: &mut Context) -> Result<(), CompileError> {
    match node {
        VNode::Element {
            tag,
            attributes,
            styles,
            children,
            ..
        } => compile_tag(tag, attributes, styles, children, ctx),
        _ => {
            if ctx.options.pretty {
                ctx.add_indent();
            }
            compile_inline_node(node, ctx)?;
            ctx.newline();
            Ok(())
        }
    }
}

/// A node written into the current line
fn compile_inline_node(node: &VNode, ctx: &mut Context) -> Result<(), CompileError> {
    match node {
        VNode::Element {
            tag,
            attributes,
            styles,
            children,
            ..
        } => {
            open_tag(tag, attributes, styles, ctx)?;
            if is_self_closing(tag) && children.is_empty() {
                return Ok(());
            }
            for child in children {
                compile_inline_node(child, ctx)?;
            }
            ctx.add(&format!("</{}>", tag));
        }
        VNode::Text { content } => ctx.add(&escape_html(content)),
        VNode::Raw { html } => ctx.add(html),
        VNode::Comment { content } => {
            ctx.add(&format!("<!-- {} -->", content.replace("--", "- -")));
        }
    }
    Ok(())
}

fn compile_tag(
    name: &str,
    attributes: &BTreeMap<String, String>,
    styles: &BTreeMap<String, String>,
    children: &[VNode],
    ctx: &mut Context,
) -> Result<(), CompileError> {
    if ctx.options.pretty {
        ctx.add_indent();
    }
    open_tag(name, attributes, styles, ctx)?;

    if children.is_empty() && is_self_closing(name) {
        ctx.newline();
        return Ok(());
    }

    // Text-only content stays on the tag's line
    if !has_element_children(children) {
        for child in children {
            compile_inline_node(child, ctx)?;
        }
        ctx.add(&format!("</{}>", name));
        ctx.newline();
        return Ok(());
    }

    ctx.newline();
    ctx.indent();
    compile_nodes(children, ctx)?;
    ctx.dedent();
    ctx.add_line(&format!("</{}>", name));
    Ok(())
}

fn open_tag(
    name: &str,
    attributes: &BTreeMap<String, String>,
    styles: &BTreeMap<String, String>,
    ctx: &mut Context,
) -> Result<(), CompileError> {
    if !is_valid_name(name) {
        return Err(CompileError::InvalidTagName(name.to_string()));
    }
    ctx.add(&format!("<{}", name));

    for (attr_name, value) in attributes {
        if !is_valid_name(attr_name) {
            return Err(CompileError::InvalidAttributeName {
                tag: name.to_string(),
                name: attr_name.clone(),
            });
        }
        ctx.add(&format!(" {}=\"{}\"", attr_name, escape_html(value)));
    }

    if !styles.is_empty() {
        let declarations: Vec<String> = styles
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        ctx.add(&format!(" style=\"{}\"", escape_html(&declarations.join("; "))));
    }

    ctx.add(">");
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

fn is_self_closing(tag: &str) -> bool {
    matches!(
        tag,
        "img"
            | "input"
            | "br"
            | "hr"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "col"
            | "embed"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn has_element_children(children: &[VNode]) -> bool {
    children
        .iter()
        .any(|child| matches!(child, VNode::Element { .. }))
}
