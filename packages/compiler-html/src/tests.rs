use crate::{compile_node, compile_to_html, CompileError, CompileOptions};
use blockpress_model::{VDocument, VNode};

fn compact() -> CompileOptions {
    CompileOptions {
        pretty: false,
        ..CompileOptions::default()
    }
}

fn paragraph(id: &str, html: &str) -> VNode {
    VNode::element("p")
        .with_attr("class", "bp-block bp-paragraph")
        .with_attr("data-block-id", id)
        .with_key(id)
        .with_child(VNode::raw(html))
}

fn document(nodes: Vec<VNode>) -> VDocument {
    let mut document = VDocument::new();
    for node in nodes {
        document.add_node(node);
    }
    document
}

#[test]
fn test_compile_fragment() {
    let doc = document(vec![paragraph("a-1", "Hello <b>world</b>")]);

    let html = compile_to_html(&doc, compact()).unwrap();

    assert_eq!(
        html,
        r#"<p class="bp-block bp-paragraph" data-block-id="a-1">Hello <b>world</b></p>"#
    );
}

#[test]
fn test_text_is_escaped_and_raw_is_not() {
    let node = VNode::element("figcaption")
        .with_child(VNode::text("a < b & \"c\""))
        .with_child(VNode::raw("<i>kept</i>"));

    let html = compile_node(&node, compact()).unwrap();

    assert_eq!(
        html,
        "<figcaption>a &lt; b &amp; &quot;c&quot;<i>kept</i></figcaption>"
    );
}

#[test]
fn test_pretty_nesting() {
    let columns = VNode::element("div")
        .with_attr("class", "bp-columns")
        .with_child(VNode::element("div").with_child(paragraph("p-1", "One")))
        .with_child(VNode::element("div"));
    let doc = document(vec![columns]);

    let html = compile_to_html(&doc, CompileOptions::default()).unwrap();

    let expected = [
        r#"<div class="bp-columns">"#,
        "  <div>",
        r#"    <p class="bp-block bp-paragraph" data-block-id="p-1">One</p>"#,
        "  </div>",
        "  <div></div>",
        "</div>",
        "",
    ]
    .join("\n");
    assert_eq!(html, expected);
}

#[test]
fn test_styles_and_void_elements() {
    let node = VNode::element("figure")
        .with_style("text-align", "center")
        .with_child(VNode::element("img").with_attr("src", "/a.jpg").with_attr("alt", ""));

    let html = compile_node(&node, compact()).unwrap();

    assert_eq!(
        html,
        r#"<figure style="text-align: center"><img alt="" src="/a.jpg"></figure>"#
    );
}

#[test]
fn test_full_page() {
    let doc = document(vec![paragraph("a-1", "Hi")]);
    let options = CompileOptions {
        full_page: true,
        title: "Tom & Jerry".to_string(),
        ..CompileOptions::default()
    };

    let html = compile_to_html(&doc, options).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>\n<html>\n"));
    assert!(html.contains("    <title>Tom &amp; Jerry</title>\n"));
    assert!(html.contains(
        "    <p class=\"bp-block bp-paragraph\" data-block-id=\"a-1\">Hi</p>\n"
    ));
    assert!(html.ends_with("</body>\n</html>\n"));
}

#[test]
fn test_comments_cannot_close_early() {
    let html = compile_node(&VNode::comment("a -- b"), compact()).unwrap();
    assert_eq!(html, "<!-- a - - b -->");
}

#[test]
fn test_invalid_names_are_rejected() {
    let bad_tag = VNode::element("p onclick=x");
    assert!(matches!(
        compile_node(&bad_tag, compact()),
        Err(CompileError::InvalidTagName(_))
    ));

    let bad_attr = VNode::element("p").with_attr("x\"y", "1");
    assert!(matches!(
        compile_node(&bad_attr, compact()),
        Err(CompileError::InvalidAttributeName { .. })
    ));
}

#[test]
fn test_options_from_json() {
    let options: CompileOptions =
        serde_json::from_str(r#"{ "pretty": false, "fullPage": true }"#).unwrap();
    assert!(!options.pretty);
    assert!(options.full_page);
    assert_eq!(options.indent, "  ");
}
