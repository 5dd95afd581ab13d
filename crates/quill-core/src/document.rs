//! Rich-text document model
//!
//! A document is a non-empty sequence of blocks. Blocks hold text runs or
//! nested blocks. The JSON shape matches the editor model the server speaks:
//! elements carry `type` and `children`, leaves carry `text` plus marks.
//!
//! `Document` values are never patched in place by the model; every change
//! builds a new value and swaps the `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocumentError;

pub const PARAGRAPH: &str = "paragraph";

const PLACEHOLDER_TEXT: &str = "Start typing your document...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

/// An inline run of text with optional marks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(
        rename = "fontSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub font_size: Option<f64>,
    /// Marks this client does not interpret (underline, color, ...)
    #[serde(flatten)]
    pub other_marks: Map<String, Value>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.bold.unwrap_or(false)
    }

    pub fn is_italic(&self) -> bool {
        self.italic.unwrap_or(false)
    }
}

/// A block element with ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type", default = "default_block_kind")]
    pub kind: String,
    #[serde(
        rename = "textAlign",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text_align: Option<Alignment>,
    pub children: Vec<Node>,
}

fn default_block_kind() -> String {
    PARAGRAPH.to_string()
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: PARAGRAPH.to_string(),
            text_align: None,
            children: vec![Node::Text(TextRun::new(text))],
        }
    }

    pub fn alignment(&self) -> Alignment {
        self.text_align.unwrap_or(Alignment::Left)
    }

    /// Text runs that are direct children of this block.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.children.iter().filter_map(|node| match node {
            Node::Text(run) => Some(run),
            Node::Block(_) => None,
        })
    }

    fn runs_mut(&mut self) -> impl Iterator<Item = &mut TextRun> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Text(run) => Some(run),
            Node::Block(_) => None,
        })
    }

    /// Concatenated text of every run under this block, depth first.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(run) => out.push_str(&run.text),
                Node::Block(block) => out.push_str(&block.plain_text()),
            }
        }
        out
    }
}

/// Either a nested block or a text leaf. Elements are tried first, so a
/// node is a block exactly when it has `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Block(Block),
    Text(TextRun),
}

/// A complete document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            blocks: vec![Block::paragraph(PLACEHOLDER_TEXT)],
        }
    }
}

impl Document {
    /// Build a document, rejecting an empty block sequence.
    pub fn new(blocks: Vec<Block>) -> Result<Self, DocumentError> {
        let document = Self { blocks };
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.blocks.is_empty() {
            return Err(DocumentError::EmptyDocument);
        }
        Ok(())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copy with `fontSize` set on every run of block `index`.
    pub fn with_font_size(&self, index: usize, size: f64) -> Document {
        self.with_block(index, |block| {
            for run in block.runs_mut() {
                run.font_size = Some(size);
            }
        })
    }

    /// Copy with `bold` flipped on every run of block `index`.
    pub fn with_bold_toggled(&self, index: usize) -> Document {
        self.with_block(index, |block| {
            for run in block.runs_mut() {
                run.bold = Some(!run.is_bold());
            }
        })
    }

    pub fn with_alignment(&self, index: usize, alignment: Alignment) -> Document {
        self.with_block(index, |block| block.text_align = Some(alignment))
    }

    fn with_block(&self, index: usize, f: impl FnOnce(&mut Block)) -> Document {
        let mut next = self.clone();
        if let Some(block) = next.blocks.get_mut(index) {
            f(block);
        }
        next
    }

    /// Append a character to the last run of block `index`, adding a run if
    /// the block has none.
    pub fn push_char(&mut self, index: usize, c: char) {
        let Some(block) = self.blocks.get_mut(index) else {
            return;
        };
        match block.children.last_mut() {
            Some(Node::Text(run)) => run.text.push(c),
            _ => block.children.push(Node::Text(TextRun::new(c.to_string()))),
        }
    }

    /// Remove the last character of block `index`. Empty trailing runs are
    /// dropped so the next backspace reaches the previous run.
    pub fn pop_char(&mut self, index: usize) {
        let Some(block) = self.blocks.get_mut(index) else {
            return;
        };
        while let Some(Node::Text(run)) = block.children.last_mut() {
            if run.text.pop().is_some() {
                return;
            }
            if block.children.len() == 1 {
                return;
            }
            block.children.pop();
        }
    }

    /// Insert an empty paragraph after block `index` and return its index.
    pub fn push_paragraph(&mut self, index: usize) -> usize {
        let at = (index + 1).min(self.blocks.len());
        self.blocks.insert(at, Block::paragraph(""));
        at
    }
}

/// Holder of the current document. Replacement and user edits are the only
/// mutations and both keep the non-empty invariant.
#[derive(Debug, Clone, Default)]
pub struct DocumentModel {
    current: Arc<Document>,
}

impl DocumentModel {
    pub fn new(document: Document) -> Result<Self, DocumentError> {
        document.validate()?;
        Ok(Self {
            current: Arc::new(document),
        })
    }

    pub fn current(&self) -> Arc<Document> {
        Arc::clone(&self.current)
    }

    /// Swap in `document` wholesale. The existing tree is kept on error.
    pub fn replace(&mut self, document: Document) -> Result<(), DocumentError> {
        document.validate()?;
        self.current = Arc::new(document);
        Ok(())
    }

    /// Apply a user edit to a copy and commit it if it is still valid.
    pub fn edit(&mut self, f: impl FnOnce(&mut Document)) -> Result<(), DocumentError> {
        let mut next = (*self.current).clone();
        f(&mut next);
        self.replace(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        Document::new(vec![
            Block::paragraph("Title"),
            Block {
                kind: PARAGRAPH.to_string(),
                text_align: None,
                children: vec![
                    Node::Text(TextRun::new("plain ")),
                    Node::Text(TextRun {
                        bold: Some(true),
                        ..TextRun::new("bold")
                    }),
                ],
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_parses_editor_json() {
        let value = json!([
            {
                "type": "paragraph",
                "textAlign": "center",
                "children": [
                    { "text": "Hello ", "bold": true },
                    { "text": "world", "fontSize": 18, "underline": true }
                ]
            }
        ]);
        let document: Document = serde_json::from_value(value).unwrap();
        let block = &document.blocks()[0];

        assert_eq!(block.alignment(), Alignment::Center);
        let runs: Vec<&TextRun> = block.runs().collect();
        assert!(runs[0].is_bold());
        assert_eq!(runs[1].font_size, Some(18.0));
        assert_eq!(runs[1].other_marks.get("underline"), Some(&json!(true)));
        assert_eq!(document.plain_text(), "Hello world");
    }

    #[test]
    fn test_serializes_back_to_editor_json() {
        let document = sample().with_alignment(0, Alignment::Right);
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value[0]["type"], "paragraph");
        assert_eq!(value[0]["textAlign"], "right");
        assert_eq!(value[0]["children"][0]["text"], "Title");
        assert!(value[0]["children"][0].get("bold").is_none());
        assert_eq!(value[1]["children"][1]["bold"], true);
    }

    #[test]
    fn test_nested_blocks_parse_as_blocks() {
        let value = json!([
            {
                "type": "bulleted-list",
                "children": [
                    { "type": "list-item", "children": [{ "text": "one" }] },
                    { "type": "list-item", "children": [{ "text": "two" }] }
                ]
            }
        ]);
        let document: Document = serde_json::from_value(value).unwrap();
        let list = &document.blocks()[0];

        assert_eq!(list.kind, "bulleted-list");
        assert!(matches!(list.children[0], Node::Block(_)));
        assert_eq!(list.plain_text(), "onetwo");
    }

    #[test]
    fn test_empty_document_is_rejected() {
        assert_eq!(Document::new(Vec::new()), Err(DocumentError::EmptyDocument));
        let parsed: Document = serde_json::from_value(json!([])).unwrap();
        assert_eq!(parsed.validate(), Err(DocumentError::EmptyDocument));
    }

    #[test]
    fn test_replace_with_empty_keeps_current() {
        let mut model = DocumentModel::new(sample()).unwrap();
        let before = model.current();
        let empty: Document = serde_json::from_value(json!([])).unwrap();

        assert_eq!(model.replace(empty), Err(DocumentError::EmptyDocument));
        assert!(Arc::ptr_eq(&before, &model.current()));
    }

    #[test]
    fn test_replace_swaps_whole_tree() {
        let mut model = DocumentModel::default();
        let before = model.current();
        model.replace(sample()).unwrap();

        assert_eq!(*model.current(), sample());
        assert_eq!(*before, Document::default());
    }

    #[test]
    fn test_current_is_idempotent() {
        let model = DocumentModel::new(sample()).unwrap();
        assert_eq!(model.current(), model.current());
    }

    #[test]
    fn test_edit_that_empties_document_is_rejected() {
        let mut model = DocumentModel::new(sample()).unwrap();
        let result = model.edit(|doc| doc.blocks_mut().clear());

        assert_eq!(result, Err(DocumentError::EmptyDocument));
        assert_eq!(model.current().blocks().len(), 2);
    }

    #[test]
    fn test_toggle_bold_flips_each_run() {
        let toggled = sample().with_bold_toggled(1);
        let runs: Vec<bool> = toggled.blocks()[1].runs().map(TextRun::is_bold).collect();
        assert_eq!(runs, vec![true, false]);
        assert_eq!(toggled.blocks()[0], sample().blocks()[0]);
    }

    #[test]
    fn test_font_size_applies_to_runs_of_one_block() {
        let sized = sample().with_font_size(0, 24.0);
        assert_eq!(sized.blocks()[0].runs().next().unwrap().font_size, Some(24.0));
        assert!(sized.blocks()[1].runs().all(|r| r.font_size.is_none()));
    }

    #[test]
    fn test_out_of_range_formatting_is_noop() {
        let doc = sample();
        assert_eq!(doc.with_bold_toggled(9), doc);
        assert_eq!(doc.with_font_size(9, 12.0), doc);
        assert_eq!(doc.with_alignment(9, Alignment::Center), doc);
    }

    #[test]
    fn test_typing_edits() {
        let mut doc = Document::default();
        let at = doc.push_paragraph(0);
        assert_eq!(at, 1);
        doc.push_char(at, 'h');
        doc.push_char(at, 'é');
        assert_eq!(doc.blocks()[1].plain_text(), "hé");

        doc.pop_char(at);
        doc.pop_char(at);
        doc.pop_char(at);
        assert_eq!(doc.blocks()[1].plain_text(), "");
        assert_eq!(doc.blocks()[1].children.len(), 1);
    }

    #[test]
    fn test_pop_char_crosses_run_boundary() {
        let mut doc = sample();
        for _ in 0.."bold".len() {
            doc.pop_char(1);
        }
        doc.pop_char(1);
        assert_eq!(doc.blocks()[1].plain_text(), "plain");
    }
}
