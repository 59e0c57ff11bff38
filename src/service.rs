//! The generative-service boundary.
//!
//! The model provider is a black box: an ordered list of [`Part`]s plus the
//! fixed sampling and safety records go in, text (or a [`DispatchError`])
//! comes out. Everything provider-specific lives behind
//! [`GenerativeService`], so tests and alternative backends can plug in a
//! pre-built implementation through
//! [`crate::config::AssistantConfigBuilder::service`].

use crate::config::{AssistantConfig, GenerationConfig, SafetyPolicy};
use crate::error::{AssistantError, DispatchError};
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use std::sync::Arc;

/// One element of the ordered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Raw (not yet base64-encoded) bytes with their MIME type.
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Everything the service needs for one generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    pub generation: GenerationConfig,
    pub safety: SafetyPolicy,
}

/// Successful service output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedText {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// A backend able to turn prompt parts into generated text.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one generation. Implementations must not retry.
    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedText, DispatchError>;
}

/// Resolve the service, from most-specific to least-specific.
///
/// 1. **Pre-built service** (`config.service`): used as-is. Tests and
///    custom middleware go through here.
/// 2. **API key** (`config.api_key`, then `GEMINI_API_KEY`, then
///    `GOOGLE_API_KEY`): a [`GeminiClient`] is built against
///    `config.base_url` with `config.api_timeout_secs` as transport timeout.
pub fn resolve_service(
    config: &AssistantConfig,
) -> Result<Arc<dyn GenerativeService>, AssistantError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }

    let api_key = config
        .resolve_api_key()
        .ok_or_else(|| AssistantError::ServiceNotConfigured {
            service: "gemini".to_string(),
            hint: "Set GEMINI_API_KEY (or GOOGLE_API_KEY), or pass --api-key.".to_string(),
        })?;

    let client = GeminiClient::new(
        &config.base_url,
        &config.model,
        api_key,
        config.api_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl GenerativeService for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: &GenerateRequest) -> Result<GeneratedText, DispatchError> {
            Ok(GeneratedText {
                text: "ok".into(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn prebuilt_service_takes_precedence() {
        let config = AssistantConfig::builder()
            .api_key("ignored")
            .service(Arc::new(Fixed))
            .build()
            .unwrap();
        let service = resolve_service(&config).unwrap();
        assert_eq!(service.name(), "fixed");
    }

    #[test]
    fn explicit_key_builds_gemini_client() {
        let config = AssistantConfig::builder().api_key("k").build().unwrap();
        let service = resolve_service(&config).unwrap();
        assert_eq!(service.name(), "gemini");
    }
}
