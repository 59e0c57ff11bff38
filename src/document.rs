//! Response-to-document transformer.
//!
//! [`render`] turns the model's raw answer into a downloadable `.docx`:
//!
//! ```text
//! raw text ──► markup::parse_blocks ──► [Header | BulletItem]* ──► docx::write_docx ──► bytes
//! ```
//!
//! The transform is pure: the same text always yields the same blocks and
//! the same bytes. A response with no headers still produces a valid,
//! openable document with an empty body.

use crate::error::AssistantError;
use crate::pipeline::{docx, markup};
use serde::Serialize;
use std::io::Cursor;
use tracing::debug;

/// MIME type the document is served with.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// One structural element of the generated document, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DocumentBlock {
    /// Bold, non-bulleted paragraph.
    Header(String),
    /// Bulleted paragraph.
    BulletItem(String),
}

impl DocumentBlock {
    pub fn text(&self) -> &str {
        match self {
            DocumentBlock::Header(t) | DocumentBlock::BulletItem(t) => t,
        }
    }
}

/// A finished document owned by the interaction that produced it.
///
/// Serializes as its block list only; the bytes are for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub blocks: Vec<DocumentBlock>,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl GeneratedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A reader positioned at the first byte, ready to stream out.
    pub fn as_reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Transform raw model text into a `.docx` document.
pub fn render(raw_text: &str) -> Result<GeneratedDocument, AssistantError> {
    let blocks = markup::parse_blocks(raw_text);
    debug!(
        "Parsed {} blocks ({} headers)",
        blocks.len(),
        blocks
            .iter()
            .filter(|b| matches!(b, DocumentBlock::Header(_)))
            .count()
    );
    let bytes = docx::write_docx(&blocks)?;
    Ok(GeneratedDocument { blocks, bytes })
}
