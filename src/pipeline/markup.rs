//! Header/bullet markup walk over the model's answer.
//!
//! The model marks headers as `**Title**` and list items as `*item*`. The
//! text is split on the bold delimiter and walked as an alternating sequence
//! of segments:
//!
//! ```text
//! "Intro **Overview** fine. **Symptoms** *Fever* *Cough* "
//!   body    header    body    header     body
//!  (no header yet → ignored)
//! ```
//!
//! Each header segment becomes a [`DocumentBlock::Header`]; the body segment
//! right after it is split on the bullet delimiter and every non-blank piece
//! becomes a [`DocumentBlock::BulletItem`]. Anything malformed degrades to
//! fewer blocks, never to an error.

use crate::document::DocumentBlock;

/// Separates header titles from the surrounding text.
pub const BOLD_DELIMITER: &str = "**";

/// Separates bullet items inside a header's body.
pub const BULLET_DELIMITER: char = '*';

/// What the next segment is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Body text; `after_header` is false only for the leading preamble.
    Body { after_header: bool },
    Header,
}

/// Turn raw model text into an ordered block sequence.
///
/// Pure and deterministic. Text without a bold delimiter yields no blocks;
/// a trailing header with nothing after it yields just that header.
pub fn parse_blocks(raw: &str) -> Vec<DocumentBlock> {
    let mut blocks = Vec::new();
    let mut state = Expect::Body {
        after_header: false,
    };

    for segment in raw.split(BOLD_DELIMITER) {
        state = match state {
            Expect::Body { after_header } => {
                if after_header {
                    push_bullets(segment, &mut blocks);
                }
                Expect::Header
            }
            Expect::Header => {
                let title = segment.trim();
                if !title.is_empty() {
                    blocks.push(DocumentBlock::Header(title.to_string()));
                }
                Expect::Body { after_header: true }
            }
        };
    }

    blocks
}

fn push_bullets(body: &str, blocks: &mut Vec<DocumentBlock>) {
    blocks.extend(
        body.split(BULLET_DELIMITER)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| DocumentBlock::BulletItem(item.to_string())),
    );
}
