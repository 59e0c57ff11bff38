//! # medassist
//!
//! A visual medical assistant: send a medical image or a free-text question
//! to Google's Gemini models and get back a structured explanation plus a
//! downloadable Word document of the answer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image / query
//!  │
//!  ├─ 1. Input     sniff JPEG/PNG, decode once (spawn_blocking)
//!  ├─ 2. Classify  grayscale heuristic, advisory only
//!  ├─ 3. Dispatch  persona prompt + payload → one Gemini call, no retries
//!  ├─ 4. Markup    **Header** / *bullet* walk over the answer
//!  └─ 5. Document  blocks → .docx bytes, deterministic
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medassist::{Assistant, AssistantConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY / GOOGLE_API_KEY
//!     let assistant = Assistant::new(AssistantConfig::default())?;
//!     let output = assistant.answer_query("What causes a persistent dry cough?").await?;
//!     println!("{}", output.text);
//!     medassist::write_document(&output.document, output.download_filename()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Browser front end (axum + tower-http) |
//! | `cli`    | on      | The `medassist` binary (clap + anyhow + tracing-subscriber + indicatif); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! medassist = { version = "0.1", default-features = false }
//! ```
//!
//! ## Disclaimer
//!
//! Responses are produced by a generative model and are not medical advice.
//! The prompts instruct the model to say so in every answer.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod document;
pub mod error;
pub mod gemini;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_image, answer_query, write_document, Assistant};
pub use config::{
    AssistantConfig, AssistantConfigBuilder, BlockThreshold, GenerationConfig, HarmCategory,
    SafetyPolicy, SafetySetting,
};
pub use document::{render, DocumentBlock, GeneratedDocument, DOCX_MIME_TYPE};
pub use error::{AssistantError, DispatchError};
pub use gemini::GeminiClient;
pub use output::{AnalysisOutput, AnalysisResponse, AnalysisStats};
pub use pipeline::classify::is_likely_xray;
pub use pipeline::dispatch::{dispatch, AnalysisRequest};
pub use pipeline::input::ImageInput;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{get_template, Modality, PromptTemplate};
pub use service::{GenerateRequest, GeneratedText, GenerativeService, Part};
