//! # Blockpress HTML
//!
//! Turns a rendered page ([`VDocument`](blockpress_model::VDocument)) into
//! an HTML string, as a fragment for export or a full page for preview.

mod compiler;

pub use compiler::{compile_node, compile_to_html, CompileError, CompileOptions};

#[cfg(test)]
mod tests;
