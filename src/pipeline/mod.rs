//! Pipeline stages for one assistant interaction.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own.
//!
//! ## Data Flow
//!
//! ```text
//! image path/bytes ──▶ input ──▶ classify (advisory)
//!                        │
//!                        ▼
//!   query text ──────▶ dispatch ──▶ markup ──▶ docx
//!                      (encode)
//! ```
//!
//! 1. [`input`]   : sniff and decode the upload; decode runs in
//!    `spawn_blocking`
//! 2. [`classify`]: grayscale heuristic, reported but never acted on
//! 3. [`encode`]  : base64-wrap image bytes for the request body
//! 4. [`dispatch`]: compose the prompt and make the single service call;
//!    the only stage with network I/O
//! 5. [`markup`]  : split the answer into header and bullet blocks
//! 6. [`docx`]    : serialize the blocks as a WordprocessingML package

pub mod classify;
pub mod dispatch;
pub mod docx;
pub mod encode;
pub mod input;
pub mod markup;
