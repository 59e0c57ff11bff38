//! Error types for the medassist library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AssistantError`]: **Fatal for the interaction**: the image could not
//!   be decoded, no service is configured, the service call failed, or the
//!   document could not be written. Returned as `Err(AssistantError)` from
//!   the [`crate::analyze`] entry points.
//!
//! * [`DispatchError`]: **Classification of a failed service call**
//!   (transport, timeout, HTTP status, blocked prompt, empty answer). Stored
//!   on [`crate::output::AnalysisResponse`] rather than propagated, so the
//!   dispatcher always hands back a response value and the caller decides
//!   what to surface.
//!
//! Malformed markup in the model's answer is never an error: the document
//! renderer degrades to fewer (or zero) blocks instead.

use crate::prompts::Modality;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the medassist library.
#[derive(Debug, Error)]
pub enum AssistantError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes are not a JPEG or PNG image.
    #[error("Unsupported image format: {detail}\nOnly JPEG and PNG uploads are accepted.")]
    UnsupportedImage { detail: String },

    /// The bytes look like a supported format but fail to decode.
    #[error("Image could not be decoded: {detail}")]
    InvalidImage { detail: String },

    /// The user input is empty or otherwise unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// No generative service could be constructed (missing API key etc.).
    #[error("Generative service '{service}' is not configured.\n{hint}")]
    ServiceNotConfigured { service: String, hint: String },

    /// The service call failed or returned no content.
    #[error("{modality} request failed: {source}")]
    ServiceFailed {
        modality: Modality,
        #[source]
        source: DispatchError,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// Building the word-processing package failed.
    #[error("Failed to serialise document: {0}")]
    DocumentSerialization(String),

    /// Could not create or write the output document file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single call to the generative service did not produce text.
///
/// None of these are retried; every failure is terminal for the interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DispatchError {
    /// Connection refused, DNS failure, TLS error, broken body.
    #[error("transport error: {detail}")]
    Transport { detail: String },

    /// The client's transport-level timeout elapsed.
    #[error("service call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// 401/403: the API key is missing, wrong or lacks access.
    #[error("authentication rejected by '{service}': {detail}")]
    Auth { service: String, detail: String },

    /// 429: quota or rate limit exhausted.
    #[error("rate limit exceeded for '{service}'")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The safety policy blocked the prompt before generation.
    #[error("prompt blocked by the service: {reason}")]
    Blocked { reason: String },

    /// The call succeeded but carried no usable text.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The response body did not match the expected schema.
    #[error("malformed service response: {detail}")]
    MalformedResponse { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_failed_display_names_modality() {
        let e = AssistantError::ServiceFailed {
            modality: Modality::Image,
            source: DispatchError::EmptyResponse,
        };
        let msg = e.to_string();
        assert!(msg.contains("image"), "got: {msg}");
        assert!(msg.contains("empty response"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display() {
        let e = DispatchError::RateLimited {
            service: "gemini".into(),
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn timeout_display() {
        let e = DispatchError::Timeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn auth_error_display() {
        let e = DispatchError::Auth {
            service: "gemini".into(),
            detail: "API key not valid".into(),
        };
        assert!(e.to_string().contains("gemini"));
        assert!(e.to_string().contains("API key not valid"));
    }

    #[test]
    fn unsupported_image_mentions_accepted_formats() {
        let e = AssistantError::UnsupportedImage {
            detail: "gif".into(),
        };
        assert!(e.to_string().contains("JPEG and PNG"));
    }
}
