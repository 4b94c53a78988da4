// src/ops/blocks.rs
//! Minimal block translation for page content.
//!
//! The client's content model is deliberately shallow: plain text (with
//! lightweight markdown-style headings and bullets) becomes block
//! payloads on write, and blocks flatten back to typed plain text on
//! read. Full block fidelity is the service's own editor's job.

use serde_json::{json, Value};

/// A child block flattened to displayable text.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BlockText {
    pub id: String,
    pub block_type: String,
    pub text: String,
    pub has_children: bool,
}

/// Convert plain text to block payloads.
///
/// Paragraphs split on blank lines; `#`/`##`/`###` prefixes become
/// headings and `- `/`* ` prefixes become bulleted list items.
pub fn text_to_blocks(content: &str) -> Vec<Value> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            if let Some(rest) = paragraph.strip_prefix("# ") {
                block("heading_1", rest.trim())
            } else if let Some(rest) = paragraph.strip_prefix("## ") {
                block("heading_2", rest.trim())
            } else if let Some(rest) = paragraph.strip_prefix("### ") {
                block("heading_3", rest.trim())
            } else if let Some(rest) = paragraph
                .strip_prefix("- ")
                .or_else(|| paragraph.strip_prefix("* "))
            {
                block("bulleted_list_item", rest.trim())
            } else {
                block("paragraph", paragraph)
            }
        })
        .collect()
}

fn block(block_type: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "type": block_type,
        (block_type): {
            "rich_text": [{ "type": "text", "text": { "content": text } }]
        }
    })
}

/// Flatten one block object from the service into displayable text.
pub fn block_to_text(raw: &Value) -> Option<BlockText> {
    let id = raw.get("id")?.as_str()?.to_string();
    let block_type = raw.get("type")?.as_str()?.to_string();
    let has_children = raw
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let text = raw
        .get(&block_type)
        .and_then(|payload| payload.get("rich_text"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    Some(BlockText {
        id,
        block_type,
        text,
        has_children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_splits_into_typed_blocks() {
        let blocks = text_to_blocks("# Titel\n\nEin Absatz.\n\n- Punkt eins");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["type"], "heading_1");
        assert_eq!(
            blocks[0]["heading_1"]["rich_text"][0]["text"]["content"],
            "Titel"
        );
        assert_eq!(blocks[1]["type"], "paragraph");
        assert_eq!(blocks[2]["type"], "bulleted_list_item");
    }

    #[test]
    fn empty_content_yields_no_blocks() {
        assert!(text_to_blocks("").is_empty());
        assert!(text_to_blocks("\n\n  \n\n").is_empty());
    }

    #[test]
    fn block_flattening_reads_plain_text() {
        let raw = json!({
            "id": "abc",
            "type": "paragraph",
            "has_children": false,
            "paragraph": { "rich_text": [
                { "plain_text": "Größe: " },
                { "plain_text": "Müller" }
            ]}
        });
        let text = block_to_text(&raw).unwrap();
        assert_eq!(text.text, "Größe: Müller");
        assert_eq!(text.block_type, "paragraph");
    }
}
