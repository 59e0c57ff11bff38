//! Generative request dispatch: compose the prompt and call the service once.
//!
//! Prompt wording lives in
//! [`crate::prompts`] and all wire details in the service implementation.
//!
//! ## Prompt layout
//!
//! | Modality | Parts, in order |
//! |----------|-----------------|
//! | image    | `[image, persona]` |
//! | text     | `[persona, "User query: " + query]` |
//!
//! ## No retries
//!
//! A failed call is terminal for the interaction; the user re-triggers it.
//! Transport timeouts belong to the service client.

use crate::config::{GenerationConfig, SafetyPolicy};
use crate::error::DispatchError;
use crate::output::AnalysisResponse;
use crate::pipeline::input::ImageInput;
use crate::prompts::{get_template, user_query, Modality, PromptTemplate};
use crate::service::{GenerateRequest, GenerativeService, Part};
use std::time::Instant;
use tracing::{debug, info, warn};

/// User-supplied payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Image(ImageInput),
    Query(String),
}

/// A per-interaction request: payload plus the persona for its modality.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub content: Content,
    pub template: &'static PromptTemplate,
}

impl AnalysisRequest {
    pub fn image(image: ImageInput) -> Self {
        Self {
            content: Content::Image(image),
            template: get_template(Modality::Image),
        }
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self {
            content: Content::Query(query.into()),
            template: get_template(Modality::Text),
        }
    }

    pub fn modality(&self) -> Modality {
        match self.content {
            Content::Image(_) => Modality::Image,
            Content::Query(_) => Modality::Text,
        }
    }

    /// The ordered prompt parts for this request.
    pub fn parts(&self) -> Vec<Part> {
        let persona = Part::Text(self.template.text.to_string());
        match &self.content {
            Content::Image(img) => vec![
                Part::InlineData {
                    mime_type: img.mime_type.to_string(),
                    data: img.bytes.clone(),
                },
                persona,
            ],
            Content::Query(q) => vec![persona, Part::Text(user_query(q))],
        }
    }
}

/// Send one request and fold the outcome into an [`AnalysisResponse`].
///
/// Never returns an error: failures are recorded in `response.error` with
/// `text` left empty, so the caller can branch on
/// [`AnalysisResponse::succeeded`].
pub async fn dispatch(
    service: &dyn GenerativeService,
    request: &AnalysisRequest,
    generation: &GenerationConfig,
    safety: &SafetyPolicy,
) -> AnalysisResponse {
    let modality = request.modality();
    let start = Instant::now();

    let generate_request = GenerateRequest {
        parts: request.parts(),
        generation: *generation,
        safety: safety.clone(),
    };

    info!("Dispatching {} request to {}", modality, service.name());

    match service.generate(&generate_request).await {
        Ok(generated) if !generated.text.trim().is_empty() => {
            let duration = start.elapsed();
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                modality, generated.prompt_tokens, generated.completion_tokens, duration
            );
            AnalysisResponse {
                modality,
                text: generated.text,
                input_tokens: generated.prompt_tokens,
                output_tokens: generated.completion_tokens,
                duration_ms: duration.as_millis() as u64,
                error: None,
            }
        }
        Ok(_) => failed(modality, start, DispatchError::EmptyResponse),
        Err(e) => failed(modality, start, e),
    }
}

fn failed(
    modality: Modality,
    start: Instant,
    error: DispatchError,
) -> AnalysisResponse {
    warn!("{} request failed: {}", modality, error);
    AnalysisResponse {
        modality,
        text: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::GeneratedText;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the request and replies with a canned result.
    struct Recorder {
        reply: Result<GeneratedText, DispatchError>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl Recorder {
        fn new(reply: Result<GeneratedText, DispatchError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeService for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedText, DispatchError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn ok(text: &str) -> Result<GeneratedText, DispatchError> {
        Ok(GeneratedText {
            text: text.into(),
            prompt_tokens: 10,
            completion_tokens: 4,
        })
    }

    fn png() -> ImageInput {
        ImageInput {
            mime_type: "image/png",
            bytes: vec![9, 9, 9],
        }
    }

    #[test]
    fn image_parts_put_image_first() {
        let parts = AnalysisRequest::image(png()).parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            Part::InlineData {
                mime_type: "image/png".into(),
                data: vec![9, 9, 9]
            }
        );
        assert_eq!(
            parts[1],
            Part::Text(get_template(Modality::Image).text.to_string())
        );
    }

    #[test]
    fn text_parts_put_persona_first() {
        let parts = AnalysisRequest::query("chest pain").parts();
        assert_eq!(
            parts,
            vec![
                Part::Text(get_template(Modality::Text).text.to_string()),
                Part::Text("User query: chest pain".into()),
            ]
        );
    }

    #[test]
    fn success_carries_text_and_tokens() {
        let service = Recorder::new(ok("**H** *a*"));
        let response = tokio_test::block_on(dispatch(
            &service,
            &AnalysisRequest::query("q"),
            &GenerationConfig::default(),
            &SafetyPolicy::default(),
        ));
        assert!(response.succeeded());
        assert_eq!(response.text, "**H** *a*");
        assert_eq!(response.input_tokens, 10);
        assert_eq!(response.modality, Modality::Text);
    }

    #[tokio::test]
    async fn config_and_safety_are_forwarded() {
        let service = Recorder::new(ok("x"));
        let generation = GenerationConfig {
            temperature: 0.3,
            ..Default::default()
        };
        dispatch(
            &service,
            &AnalysisRequest::image(png()),
            &generation,
            &SafetyPolicy::default(),
        )
        .await;
        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].generation.temperature, 0.3);
        assert_eq!(seen[0].safety, SafetyPolicy::default());
    }

    #[tokio::test]
    async fn service_error_yields_empty_failed_response() {
        let service = Recorder::new(Err(DispatchError::Timeout { secs: 5 }));
        let response = dispatch(
            &service,
            &AnalysisRequest::image(png()),
            &GenerationConfig::default(),
            &SafetyPolicy::default(),
        )
        .await;
        assert!(!response.succeeded());
        assert!(response.text.is_empty());
        assert_eq!(response.error, Some(DispatchError::Timeout { secs: 5 }));
        assert_eq!(service.seen.lock().unwrap().len(), 1, "no retry");
    }

    #[tokio::test]
    async fn blank_text_counts_as_empty_response() {
        let service = Recorder::new(ok("  \n "));
        let response = dispatch(
            &service,
            &AnalysisRequest::query("q"),
            &GenerationConfig::default(),
            &SafetyPolicy::default(),
        )
        .await;
        assert_eq!(response.error, Some(DispatchError::EmptyResponse));
        assert!(response.text.is_empty());
    }
}
