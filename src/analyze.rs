//! Interaction entry points: input → dispatch → document.
//!
//! [`Assistant`] owns the resolved generative service and runs one
//! interaction per call. It holds no per-request state, so a single
//! instance can be shared (behind an `Arc`) by every request the browser
//! shell serves.
//!
//! A failed service call is returned as
//! [`AssistantError::ServiceFailed`] and no document is produced.

use crate::config::AssistantConfig;
use crate::document::{self, GeneratedDocument};
use crate::error::AssistantError;
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::classify::is_likely_xray;
use crate::pipeline::dispatch::{dispatch, AnalysisRequest};
use crate::pipeline::input::ImageInput;
use crate::service::{resolve_service, GenerativeService};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The configured assistant.
#[derive(Clone)]
pub struct Assistant {
    config: AssistantConfig,
    service: Arc<dyn GenerativeService>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("config", &self.config)
            .field("service", &self.service.name())
            .finish()
    }
}

impl Assistant {
    /// Resolve the generative service once for the lifetime of the assistant.
    ///
    /// # Errors
    /// [`AssistantError::ServiceNotConfigured`] when no service was injected
    /// and no API key is available.
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let service = resolve_service(&config)?;
        info!("Assistant ready: service={}, model={}", service.name(), config.model);
        Ok(Self { config, service })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Analyze an uploaded JPEG or PNG.
    pub async fn analyze_image(
        &self,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<AnalysisOutput, AssistantError> {
        let image = ImageInput::from_bytes(bytes)?;
        self.analyze(image).await
    }

    /// Analyze a JPEG or PNG on local disk.
    pub async fn analyze_image_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<AnalysisOutput, AssistantError> {
        let image = ImageInput::from_path(path).await?;
        self.analyze(image).await
    }

    /// Answer a free-text medical question.
    ///
    /// # Errors
    /// [`AssistantError::InvalidInput`] for a blank query; nothing is sent.
    pub async fn answer_query(&self, query: &str) -> Result<AnalysisOutput, AssistantError> {
        let start = Instant::now();
        if query.trim().is_empty() {
            return Err(AssistantError::InvalidInput(
                "Query is empty; please enter a question.".to_string(),
            ));
        }
        self.run(AnalysisRequest::query(query), None, start).await
    }

    /// Analyze an already-sniffed upload.
    pub async fn analyze(&self, image: ImageInput) -> Result<AnalysisOutput, AssistantError> {
        let start = Instant::now();
        // Decode before any network call so corrupt uploads fail locally.
        let decoded = image.decode().await?;
        let xray = is_likely_xray(&decoded);
        debug!("Grayscale heuristic: is_likely_xray={}", xray);
        drop(decoded);

        self.run(AnalysisRequest::image(image), Some(xray), start)
            .await
    }

    async fn run(
        &self,
        request: AnalysisRequest,
        is_likely_xray: Option<bool>,
        start: Instant,
    ) -> Result<AnalysisOutput, AssistantError> {
        let modality = request.modality();
        let cb = self.config.progress_callback.as_ref();

        // ── Step 1: Dispatch ─────────────────────────────────────────────
        if let Some(cb) = cb {
            cb.on_dispatch_start(modality);
        }
        let response = dispatch(
            self.service.as_ref(),
            &request,
            &self.config.generation,
            &self.config.safety,
        )
        .await;

        if let Some(error) = response.error {
            if let Some(cb) = cb {
                cb.on_failure(modality, &error.to_string());
            }
            return Err(AssistantError::ServiceFailed {
                modality,
                source: error,
            });
        }
        if let Some(cb) = cb {
            cb.on_response(modality, response.text.len());
        }

        // ── Step 2: Render ───────────────────────────────────────────────
        let render_start = Instant::now();
        let document = document::render(&response.text)?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        if let Some(cb) = cb {
            cb.on_document_ready(modality, document.len());
        }

        let stats = AnalysisStats {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            dispatch_duration_ms: response.duration_ms,
            render_duration_ms,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "{} interaction complete: {} blocks, {} bytes, {}ms total",
            modality,
            document.blocks.len(),
            document.len(),
            stats.total_duration_ms
        );

        Ok(AnalysisOutput {
            modality,
            text: response.text,
            is_likely_xray,
            document,
            stats,
        })
    }
}

/// One-shot image analysis with a throwaway [`Assistant`].
pub async fn analyze_image(
    bytes: &[u8],
    config: &AssistantConfig,
) -> Result<AnalysisOutput, AssistantError> {
    Assistant::new(config.clone())?.analyze_image(bytes).await
}

/// One-shot query with a throwaway [`Assistant`].
pub async fn answer_query(
    query: &str,
    config: &AssistantConfig,
) -> Result<AnalysisOutput, AssistantError> {
    Assistant::new(config.clone())?.answer_query(query).await
}

/// Write a document to disk.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_document(
    document: &GeneratedDocument,
    path: impl AsRef<Path>,
) -> Result<(), AssistantError> {
    let path = path.as_ref();
    let write_err = |source| AssistantError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, document.bytes())
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", document.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::progress::AnalysisProgressCallback;
    use crate::prompts::Modality;
    use crate::service::{GenerateRequest, GeneratedText};
    use async_trait::async_trait;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<GeneratedText, DispatchError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(GeneratedText {
                    text: text.to_string(),
                    prompt_tokens: 100,
                    completion_tokens: 20,
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: DispatchError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerativeService for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _: &GenerateRequest) -> Result<GeneratedText, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl AnalysisProgressCallback for Events {
        fn on_dispatch_start(&self, modality: Modality) {
            self.0.lock().unwrap().push(format!("start:{modality}"));
        }
        fn on_response(&self, modality: Modality, _text_len: usize) {
            self.0.lock().unwrap().push(format!("response:{modality}"));
        }
        fn on_failure(&self, modality: Modality, _error: &str) {
            self.0.lock().unwrap().push(format!("failure:{modality}"));
        }
        fn on_document_ready(&self, modality: Modality, _byte_len: usize) {
            self.0.lock().unwrap().push(format!("document:{modality}"));
        }
    }

    fn assistant(service: Arc<Scripted>) -> Assistant {
        let config = AssistantConfig::builder().service(service).build().unwrap();
        Assistant::new(config).unwrap()
    }

    fn png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn query_produces_text_and_document() {
        let service = Scripted::answering("**Answer** *Rest* *Fluids*");
        let out = assistant(service.clone())
            .answer_query("I have a cold")
            .await
            .unwrap();
        assert_eq!(out.modality, Modality::Text);
        assert_eq!(out.text, "**Answer** *Rest* *Fluids*");
        assert_eq!(out.is_likely_xray, None);
        assert_eq!(out.document.blocks.len(), 3);
        assert_eq!(out.download_filename(), "medical_query_response.doc");
        assert_eq!(out.stats.input_tokens, 100);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_without_a_call() {
        let service = Scripted::answering("x");
        let err = assistant(service.clone())
            .answer_query("   \n")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput(_)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn grayscale_upload_is_flagged() {
        let bytes = png(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([77]))));
        let out = assistant(Scripted::answering("**Findings** *Clear*"))
            .analyze_image(bytes)
            .await
            .unwrap();
        assert_eq!(out.is_likely_xray, Some(true));
        assert_eq!(out.download_filename(), "medical_image_analysis.doc");
    }

    #[tokio::test]
    async fn colour_upload_is_not_flagged() {
        let bytes = png(DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))));
        let out = assistant(Scripted::answering("ok"))
            .analyze_image(bytes)
            .await
            .unwrap();
        assert_eq!(out.is_likely_xray, Some(false));
        assert!(out.document.blocks.is_empty());
    }

    #[tokio::test]
    async fn corrupt_upload_fails_before_dispatch() {
        let mut bytes = png(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([1]))));
        bytes.truncate(24);
        let service = Scripted::answering("x");
        let err = assistant(service.clone())
            .analyze_image(bytes)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::InvalidImage { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn service_failure_yields_no_document() {
        let events = Arc::new(Events::default());
        let config = AssistantConfig::builder()
            .service(Scripted::failing(DispatchError::EmptyResponse))
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let err = Assistant::new(config)
            .unwrap()
            .answer_query("headache")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::ServiceFailed {
                modality: Modality::Text,
                source: DispatchError::EmptyResponse
            }
        ));
        assert_eq!(*events.0.lock().unwrap(), ["start:text", "failure:text"]);
    }

    #[tokio::test]
    async fn callbacks_fire_in_order_on_success() {
        let events = Arc::new(Events::default());
        let config = AssistantConfig::builder()
            .service(Scripted::answering("**H** *a*"))
            .progress_callback(events.clone())
            .build()
            .unwrap();
        answer_query("q", &config).await.unwrap();
        assert_eq!(
            *events.0.lock().unwrap(),
            ["start:text", "response:text", "document:text"]
        );
    }

    #[tokio::test]
    async fn write_document_is_atomic_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.doc");
        let doc = document::render("**H** *a*").unwrap();

        write_document(&doc, &path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), doc.bytes());
        assert!(!dir.path().join("nested").join("report.doc.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.doc");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();
        let doc = document::render("**H** *a*").unwrap();

        let err = write_document(&doc, &path).await.unwrap_err();

        assert!(matches!(err, AssistantError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("report.doc.tmp").exists());
    }
}
