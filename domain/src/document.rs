//! Linearizes a collaborative rich-text document (a tree of `type`-tagged nodes) into the
//! Markdown-flavoured plain text that is sent to the summarization provider.
//!
//! The output is a pure function of the input: identical trees always render to identical text.

use crate::error::{Error, ValidationErrorKind};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static INLINE_SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid inline whitespace pattern"));
static QUOTED_LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("valid line break pattern"));
static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

const MAX_HEADING_LEVEL: u64 = 6;
const INDENT: &str = "  ";

/// Block node kinds the renderer knows about. Anything else is `Other` and is rendered by
/// walking its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Heading,
    Paragraph,
    BulletList,
    OrderedList,
    TaskList,
    Blockquote,
    Other,
}

impl Block {
    fn of(node: &Value) -> Self {
        match node.get("type").and_then(Value::as_str).unwrap_or_default() {
            "heading" => Block::Heading,
            "paragraph" => Block::Paragraph,
            "bulletList" => Block::BulletList,
            "orderedList" => Block::OrderedList,
            "taskList" => Block::TaskList,
            "blockquote" => Block::Blockquote,
            _ => Block::Other,
        }
    }
}

/// Renders `document` as plain text.
///
/// `Null` renders as the empty string. A JSON string is parsed as a stringified document
/// first. The tree itself may be the root, or be wrapped as `data.content` (stringified),
/// `data.doc` or `doc`; the first candidate with a `content` array wins.
pub fn to_plain_text(document: &Value) -> Result<String, Error> {
    if document.is_null() {
        return Ok(String::new());
    }

    let root = normalize_root(document)?;
    if root.is_null() {
        return Err(Error::validation(ValidationErrorKind::EmptyDocument));
    }
    if root.is_string() {
        return Err(Error::validation(ValidationErrorKind::MalformedDocument(
            "note content must be a rich-text tree, not plain text".to_string(),
        )));
    }

    let doc = resolve_doc(&root).ok_or_else(|| {
        Error::validation(ValidationErrorKind::MalformedDocument(
            "no document tree with a content array was found".to_string(),
        ))
    })?;

    let mut out = String::new();
    render_blocks(doc.get("content"), &mut out, 0);

    Ok(cleanup(&out))
}

fn normalize_root(document: &Value) -> Result<Value, Error> {
    let Some(raw) = document.as_str() else {
        return Ok(document.clone());
    };

    if raw.trim().is_empty() {
        return Err(Error::validation(ValidationErrorKind::EmptyDocument));
    }

    serde_json::from_str(raw).map_err(|err| Error {
        source: Some(Box::new(err)),
        ..Error::validation(ValidationErrorKind::MalformedDocument(
            "note content is not valid JSON".to_string(),
        ))
    })
}

fn has_content_array(node: &Value) -> bool {
    node.get("content").is_some_and(Value::is_array)
}

fn resolve_doc(root: &Value) -> Option<Value> {
    // Stringified sub-document; an unparseable one falls through to the other shapes.
    if let Some(raw) = root.pointer("/data/content").and_then(Value::as_str) {
        if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
            if has_content_array(&parsed) {
                return Some(parsed);
            }
        }
    }

    [root.pointer("/data/doc"), root.get("doc"), Some(root)]
        .into_iter()
        .flatten()
        .find(|candidate| has_content_array(candidate))
        .cloned()
}

fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn render_blocks(content: Option<&Value>, out: &mut String, depth: usize) {
    let Some(nodes) = content.and_then(Value::as_array) else {
        return;
    };

    for node in nodes {
        match Block::of(node) {
            Block::Heading => render_heading(node, out),
            Block::Paragraph => {
                let text = inline_text(node.get("content"));
                if !text.is_empty() {
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
            }
            Block::BulletList => render_list(node, out, depth, ListStyle::Bullet),
            Block::OrderedList => render_list(node, out, depth, ListStyle::Ordered),
            Block::TaskList => render_list(node, out, depth, ListStyle::Task),
            Block::Blockquote => render_blockquote(node, out),
            Block::Other => render_blocks(node.get("content"), out, depth),
        }
    }
}

fn render_heading(node: &Value, out: &mut String) {
    let text = inline_text(node.get("content"));
    if text.is_empty() {
        return;
    }

    let level = node
        .pointer("/attrs/level")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .clamp(1, MAX_HEADING_LEVEL);

    out.push_str(&"#".repeat(level as usize));
    out.push(' ');
    out.push_str(&text);
    out.push_str("\n\n");
}

fn render_blockquote(node: &Value, out: &mut String) {
    // Each child block of the quote becomes its own quoted line.
    let lines: Vec<String> = children(node)
        .iter()
        .map(|child| {
            let mut line = String::new();
            collect_node(child, &mut line);
            normalize_inline(&line)
        })
        .filter(|line| !line.is_empty())
        .collect();

    let text = lines.join("\n");
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    out.push_str("> ");
    out.push_str(&QUOTED_LINE_BREAK.replace_all(text, "\n> "));
    out.push_str("\n\n");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListStyle {
    Bullet,
    Ordered,
    Task,
}

fn render_list(node: &Value, out: &mut String, depth: usize, style: ListStyle) {
    let Some(items) = node.get("content").and_then(Value::as_array) else {
        return;
    };

    for (index, item) in items.iter().enumerate() {
        let marker = match style {
            ListStyle::Bullet => "- ".to_string(),
            ListStyle::Ordered => format!("{}. ", index + 1),
            ListStyle::Task => {
                let checked = item
                    .pointer("/attrs/checked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let marker = if checked { "[x] " } else { "[ ] " };
                marker.to_string()
            }
        };
        render_list_item(item, out, depth, &marker);
    }
    out.push('\n');
}

/// Renders one list item. Paragraphs print on the item's own line; nested lists and any other
/// block are rendered one level deeper. An item with nested content but no text of its own gets
/// a bare marker line so the nesting stays readable; an item with nothing at all renders nothing.
fn render_list_item(item: &Value, out: &mut String, depth: usize, marker: &str) {
    let indent = INDENT.repeat(depth);
    let mut has_primary_text = false;
    let mut body = String::new();

    for child in children(item) {
        match Block::of(child) {
            Block::Paragraph => {
                let text = inline_text(child.get("content"));
                if !text.is_empty() {
                    body.push_str(&indent);
                    body.push_str(marker);
                    body.push_str(&text);
                    body.push('\n');
                    has_primary_text = true;
                }
            }
            Block::BulletList => render_list(child, &mut body, depth + 1, ListStyle::Bullet),
            Block::OrderedList => render_list(child, &mut body, depth + 1, ListStyle::Ordered),
            Block::TaskList => render_list(child, &mut body, depth + 1, ListStyle::Task),
            _ => render_blocks(child.get("content"), &mut body, depth + 1),
        }
    }

    if !has_primary_text && !body.trim().is_empty() {
        out.push_str(&indent);
        out.push_str(marker.trim());
        out.push('\n');
    }
    out.push_str(&body);
}

/// Concatenates the text leaves under `nodes`, turning `hardBreak` into a newline. Runs of
/// spaces or tabs collapse to one space and the result is trimmed.
fn inline_text(nodes: Option<&Value>) -> String {
    let mut text = String::new();
    if let Some(Value::Array(nodes)) = nodes {
        for node in nodes {
            collect_node(node, &mut text);
        }
    } else if let Some(Value::String(leaf)) = nodes {
        text.push_str(leaf);
    }
    normalize_inline(&text)
}

fn collect_node(node: &Value, text: &mut String) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => text.push_str(node.get("text").and_then(Value::as_str).unwrap_or_default()),
        Some("hardBreak") => text.push('\n'),
        _ => {
            for child in children(node) {
                collect_node(child, text);
            }
        }
    }
}

fn normalize_inline(text: &str) -> String {
    INLINE_SPACE_RUN.replace_all(text, " ").trim().to_string()
}

fn cleanup(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    BLANK_LINE_RUN.replace_all(text, "\n\n").trim().to_string()
}
