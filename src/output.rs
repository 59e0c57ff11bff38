//! Result types produced by the dispatcher and the assistant.

use crate::document::GeneratedDocument;
use crate::error::DispatchError;
use crate::prompts::Modality;
use serde::Serialize;

/// Outcome of a single service call.
///
/// Always returned, never thrown: on failure `text` is empty and `error`
/// says why.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub modality: Modality,
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<DispatchError>,
}

impl AnalysisResponse {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Timing and token usage for one interaction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub dispatch_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a presentation shell needs after a successful interaction.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub modality: Modality,
    /// Raw model text, shown as-is.
    pub text: String,
    /// Grayscale heuristic; `None` for text queries.
    pub is_likely_xray: Option<bool>,
    pub document: GeneratedDocument,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// Fixed filename the document is offered under.
    pub fn download_filename(&self) -> &'static str {
        self.modality.download_filename()
    }
}
