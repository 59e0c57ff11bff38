//! Gemini `generateContent` REST client.
//!
//! Request body (camelCase):
//!
//! ```text
//! { contents: [{ role: "user", parts: [ {inlineData} | {text}, … ] }],
//!   generationConfig: { temperature, topP, topK?, maxOutputTokens },
//!   safetySettings:   [{ category, threshold }, …] }
//! ```
//!
//! The answer is the concatenation of the first candidate's text parts. A
//! blocked prompt, a response without candidates, or whitespace-only text is
//! reported as a failure; the caller never sees partial output.

use crate::config::{GenerationConfig, SafetySetting};
use crate::error::{AssistantError, DispatchError};
use crate::pipeline::encode::{encode_inline, InlineData};
use crate::service::{GenerateRequest, GeneratedText, GenerativeService, Part};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "gemini";

/// Longest slice of an error body kept in messages.
const MAX_ERROR_DETAIL: usize = 300;

/// HTTP client for one model of the Generative Language API.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AssistantError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: generate_url(base_url, model),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    /// Full `…:generateContent` URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn generate_url(base_url: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

#[async_trait]
impl GenerativeService for GeminiClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedText, DispatchError> {
        let body = WireRequest::from(request);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let detail = response.text().await.unwrap_or_default();
            warn!("Gemini returned HTTP {}", status.as_u16());
            return Err(status_error(status, &detail, retry_after_secs));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: WireResponse =
            serde_json::from_slice(&bytes).map_err(|e| DispatchError::MalformedResponse {
                detail: e.to_string(),
            })?;

        parsed.into_generated_text()
    }
}

impl GeminiClient {
    fn transport_error(&self, e: reqwest::Error) -> DispatchError {
        if e.is_timeout() {
            DispatchError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            DispatchError::Transport {
                detail: e.to_string(),
            }
        }
    }
}

fn status_error(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> DispatchError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DispatchError::Auth {
            service: SERVICE_NAME.to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => DispatchError::RateLimited {
            service: SERVICE_NAME.to_string(),
            retry_after_secs,
        },
        other => DispatchError::Http {
            status: other.as_u16(),
            detail,
        },
    }
}

/// Prefer `error.message` from the JSON error envelope; fall back to the raw body.
fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<WireErrorEnvelope>(body)
        .ok()
        .map(|env| env.error.message)
        .unwrap_or_else(|| body.trim().to_string());
    message.chars().take(MAX_ERROR_DETAIL).collect()
}

// ── Wire types: request ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent>,
    generation_config: WireGenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    max_output_tokens: u32,
}

impl From<&GenerationConfig> for WireGenerationConfig {
    fn from(g: &GenerationConfig) -> Self {
        Self {
            temperature: g.temperature,
            top_p: g.top_p,
            top_k: (g.top_k > 0).then_some(g.top_k),
            max_output_tokens: g.max_output_tokens,
        }
    }
}

impl<'a> From<&'a GenerateRequest> for WireRequest<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(t) => WirePart::Text(t.clone()),
                Part::InlineData { mime_type, data } => {
                    WirePart::InlineData(encode_inline(mime_type, data))
                }
            })
            .collect();

        Self {
            contents: vec![WireContent {
                role: "user",
                parts,
            }],
            generation_config: WireGenerationConfig::from(&request.generation),
            safety_settings: request.safety.settings(),
        }
    }
}

// ── Wire types: response ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

impl WireResponse {
    fn into_generated_text(self) -> Result<GeneratedText, DispatchError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(DispatchError::Blocked { reason });
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(DispatchError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            // A SAFETY stop leaves the candidate without text.
            return match candidate.finish_reason.as_deref() {
                Some("SAFETY") => Err(DispatchError::Blocked {
                    reason: "SAFETY".to_string(),
                }),
                _ => Err(DispatchError::EmptyResponse),
            };
        }

        let usage = self.usage_metadata.unwrap_or_default();
        debug!(
            "Gemini: {} prompt tokens, {} completion tokens",
            usage.prompt_token_count, usage.candidates_token_count
        );

        Ok(GeneratedText {
            text,
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
        })
    }
}
