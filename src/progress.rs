//! Progress-callback trait for interaction events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AssistantConfigBuilder::progress_callback`] to receive
//! events while a request is in flight, so a presentation layer can show a
//! spinner and stay responsive.
//!
//! # Example
//!
//! ```rust
//! use medassist::{AnalysisProgressCallback, AssistantConfig, Modality};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     answered: Arc<AtomicUsize>,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_response(&self, modality: Modality, text_len: usize) {
//!         self.answered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{modality}: {text_len} chars");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     answered: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = AssistantConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::prompts::Modality;
use std::sync::Arc;

/// Called by the assistant as an interaction moves through its stages.
///
/// Implementations must be `Send + Sync`: the browser shell serves many
/// interactions concurrently and shares one config. All methods default to
/// no-ops so callers only override what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called just before the request is sent to the generative service.
    fn on_dispatch_start(&self, modality: Modality) {
        let _ = modality;
    }

    /// Called when the service returned usable text.
    ///
    /// # Arguments
    /// * `text_len`: byte length of the raw response text
    fn on_response(&self, modality: Modality, text_len: usize) {
        let _ = (modality, text_len);
    }

    /// Called when the service call failed. No document follows.
    fn on_failure(&self, modality: Modality, error: &str) {
        let _ = (modality, error);
    }

    /// Called once the downloadable document has been serialised.
    fn on_document_ready(&self, modality: Modality, byte_len: usize) {
        let _ = (modality, byte_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssistantConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
