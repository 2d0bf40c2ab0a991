//! Static HTML export.
//!
//! Each page becomes a `<div class="page">` holding a structural rendering
//! of its document: one element per node, children in order, a few well
//! known props (text, links, image sources, inline style) carried over.
//! Block-specific visuals are not reproduced.

use crate::artifact::{Artifact, ExportFormat};
use crate::error::{ExportError, logged};
use pb_core::document::parse_document;
use pb_core::{BlockKind, BlockType, Document, Node, NodeId, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HtmlOptions {
    /// All pages (true) or only the current one.
    pub multi_page: bool,
    pub title: String,
    /// Emit each page's name as a heading above its content.
    pub include_page_titles: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            multi_page: true,
            title: "Exported pages".to_string(),
            include_page_titles: true,
        }
    }
}

const STYLE: &str = "\
body { margin: 0; font-family: system-ui, sans-serif; }
.page { box-sizing: border-box; padding: 24px; page-break-after: always; break-after: page; }
.page:last-child { page-break-after: auto; break-after: auto; }
.page-title { font-size: 14px; color: #6b7280; margin: 0 0 16px; }
.pb-unknown { border: 1px dashed #d1d5db; padding: 8px; color: #9ca3af; }
";

/// Export `pages` (or only `current_page_id` when not multi-page) as
/// `<stem>.html`.
pub fn export_html(
    pages: &[Page],
    current_page_id: &str,
    options: &HtmlOptions,
    stem: &str,
) -> Result<Artifact, ExportError> {
    logged(
        render_html(pages, current_page_id, options)
            .map(|html| Artifact::new(stem, ExportFormat::Html, html.into_bytes())),
    )
}

/// The HTML document as text.
pub fn render_html(
    pages: &[Page],
    current_page_id: &str,
    options: &HtmlOptions,
) -> Result<String, ExportError> {
    let selected: Vec<&Page> = if options.multi_page {
        pages.iter().collect()
    } else {
        pages.iter().filter(|p| p.id == current_page_id).collect()
    };
    if selected.is_empty() {
        return Err(ExportError::failed(
            ExportFormat::Html,
            format!("no page `{current_page_id}` to export"),
        ));
    }

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(&options.title));
    let _ = writeln!(out, "<style>\n{STYLE}</style>\n</head>\n<body>");
    for page in &selected {
        render_page(&mut out, page, options);
    }
    out.push_str("</body>\n</html>\n");
    log::debug!("HTML export: {} pages, {} bytes", selected.len(), out.len());
    Ok(out)
}

fn render_page(out: &mut String, page: &Page, options: &HtmlOptions) {
    let _ = writeln!(
        out,
        "<div class=\"page\" data-page-id=\"{}\">",
        escape(&page.id)
    );
    if options.include_page_titles {
        let _ = writeln!(out, "<h1 class=\"page-title\">{}</h1>", escape(&page.name));
    }
    match parse_document(&page.data) {
        Ok(doc) => {
            for child in doc.children(NodeId::root()) {
                render_tree(out, &doc, child, 1);
            }
        }
        Err(err) => {
            // The page still appears, in order, with its title.
            log::warn!("page {} exported without content: {err}", page.id);
            out.push_str("<!-- page content could not be read -->\n");
        }
    }
    out.push_str("</div>\n");
}

/// Deeper levels share this indent so very deep trees stay linear in size.
const MAX_INDENT: usize = 16;

/// Pending work while walking a page's tree.
enum Frame {
    Open { id: NodeId, depth: usize },
    Close { tag: &'static str, depth: usize },
}

/// Render the subtree under `root` at `depth`. Walks with an explicit stack,
/// so nesting depth is bounded by memory, not by the call stack.
fn render_tree(out: &mut String, doc: &Document, root: NodeId, depth: usize) {
    let mut stack = vec![Frame::Open { id: root, depth }];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Open { id, depth } => open_node(out, doc, id, depth, &mut stack),
            Frame::Close { tag, depth } => {
                let _ = writeln!(out, "{}</{tag}>", indent(depth));
            }
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth.min(MAX_INDENT))
}

/// Write the opening of `id` and queue its children and closing tag.
fn open_node(out: &mut String, doc: &Document, id: NodeId, depth: usize, stack: &mut Vec<Frame>) {
    let Some(node) = doc.get(id) else {
        return;
    };
    if node.hidden {
        return;
    }
    let indent = indent(depth);
    let kind = match &node.block {
        BlockType::Known(kind) => *kind,
        BlockType::Unresolved(name) => {
            let _ = writeln!(
                out,
                "{indent}<div class=\"pb-unknown\" data-block=\"{}\">{}</div>",
                escape(name),
                escape(node.label())
            );
            return;
        }
    };

    let tag = kind.html_tag();
    let mut attrs = format!(" class=\"pb-{}\"", kind.id_prefix());
    let _ = write!(attrs, " data-node-id=\"{}\"", escape(id.as_str()));
    for (name, prop) in attribute_props(kind) {
        if let Some(value) = scalar(node, prop) {
            let _ = write!(attrs, " {name}=\"{}\"", escape(&value));
        }
    }
    if let Some(style) = inline_style(node) {
        let _ = write!(attrs, " style=\"{}\"", escape(&style));
    }

    if is_void(tag) {
        let _ = writeln!(out, "{indent}<{tag}{attrs}>");
        return;
    }
    let _ = write!(out, "{indent}<{tag}{attrs}>");
    if let Some(text) = text_content(node, kind) {
        out.push_str(&escape(&text));
    }
    let children = doc.children(id);
    let linked = doc.linked_nodes(id);
    if children.is_empty() && linked.is_empty() {
        let _ = writeln!(out, "</{tag}>");
        return;
    }
    out.push('\n');
    stack.push(Frame::Close { tag, depth });
    // Pushed in reverse so children pop in order, then linked slots.
    for (_, child) in linked.into_iter().rev() {
        stack.push(Frame::Open { id: child, depth: depth + 1 });
    }
    for child in children.into_iter().rev() {
        stack.push(Frame::Open { id: child, depth: depth + 1 });
    }
}

/// HTML attributes lifted straight from props.
fn attribute_props(kind: BlockKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        BlockKind::Image => &[("src", "src"), ("alt", "alt")],
        BlockKind::Video => &[("src", "src")],
        BlockKind::Link => &[("href", "href"), ("target", "target")],
        BlockKind::Form => &[("action", "action"), ("method", "method")],
        BlockKind::Input => &[("type", "inputType"), ("name", "name"), ("placeholder", "placeholder")],
        BlockKind::Icon => &[("data-icon", "icon")],
        _ => &[],
    }
}

fn text_content(node: &Node, kind: BlockKind) -> Option<String> {
    match kind {
        BlockKind::Text | BlockKind::Heading | BlockKind::Button | BlockKind::Link => scalar(node, "text"),
        BlockKind::List => {
            let items = node.prop("items")?.as_array()?;
            Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" · "),
            )
        }
        _ => None,
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "hr" | "input")
}

fn scalar(node: &Node, path: &str) -> Option<String> {
    match node.prop(path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `props.style` (an object of camelCase CSS properties) as inline CSS.
fn inline_style(node: &Node) -> Option<String> {
    let style = node.prop("style")?.as_object()?;
    let mut css = String::new();
    for (key, value) in style {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        let _ = write!(css, "{}: {value}; ", kebab_case(key));
    }
    let css = css.trim_end().to_string();
    (!css.is_empty()).then_some(css)
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
