//! Browser front end.
//!
//! Two surfaces on one page, mirroring the tabbed layout users expect:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | upload form + query form |
//! | `POST /analyze/image` | multipart field `image` → analysis page |
//! | `POST /analyze/query` | form field `query` → answer page |
//! | `GET /health` | liveness probe |
//!
//! Results are rendered server-side. The generated document travels back
//! inside the page as a `data:` URI, so nothing is stored between requests.
//! A failed service call shows the generic notice for its modality with
//! `502 Bad Gateway`.

use crate::analyze::Assistant;
use crate::document::DOCX_MIME_TYPE;
use crate::error::AssistantError;
use crate::output::AnalysisOutput;
use crate::pipeline::input::ImageInput;
use crate::prompts::Modality;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::escape;
use serde::Deserialize;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const PAGE_TITLE: &str = "Visual Medical Assistant 👨‍⚕️ 🩺 🏥";
pub const PAGE_SUBHEADER: &str = "An app to help with medical analysis using images and text";
pub const ABOUT_TEXT: &str = "This is a Visual Medical Assistant app that uses AI to analyze medical images and answer medical queries.";

#[derive(Clone)]
pub struct AppState {
    assistant: Arc<Assistant>,
}

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub query: String,
}

/// Build the router; exposed separately from [`serve`] for tests.
pub fn router(assistant: Arc<Assistant>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/analyze/image", post(analyze_image))
        .route("/analyze/query", post(analyze_query))
        .route("/health", get(health_check))
        .with_state(AppState { assistant })
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, assistant: Arc<Assistant>) -> std::io::Result<()> {
    let app = router(assistant);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<String> {
    Html(page(Modality::Image, ""))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

async fn analyze_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<Vec<u8>> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return client_error(Modality::Image, &format!("Malformed upload: {e}")),
        };
        if field.name() != Some("image") {
            continue;
        }
        match field.bytes().await {
            Ok(bytes) if !bytes.is_empty() => upload = Some(bytes.to_vec()),
            Ok(_) => {}
            Err(e) => return client_error(Modality::Image, &format!("Malformed upload: {e}")),
        }
    }

    let Some(bytes) = upload else {
        return client_error(Modality::Image, "Please upload an image for analysis.");
    };

    let image = match ImageInput::from_bytes(bytes) {
        Ok(image) => image,
        Err(e) => return failure(Modality::Image, e),
    };
    let preview = data_uri(image.mime_type, &image.bytes);

    match state.assistant.analyze(image).await {
        Ok(output) => Html(page(Modality::Image, &result_section(&output, Some(&preview))))
            .into_response(),
        Err(e) => failure(Modality::Image, e),
    }
}

async fn analyze_query(State(state): State<AppState>, Form(form): Form<QueryForm>) -> Response {
    match state.assistant.answer_query(&form.query).await {
        Ok(output) => Html(page(Modality::Text, &result_section(&output, None))).into_response(),
        Err(e) => failure(Modality::Text, e),
    }
}

// ── Responses ────────────────────────────────────────────────────────────

/// Map an interaction error to a page.
///
/// Bad input is the user's to fix and is shown verbatim with 400. Anything
/// else gets the generic notice.
fn failure(modality: Modality, error: AssistantError) -> Response {
    match error {
        AssistantError::UnsupportedImage { .. }
        | AssistantError::InvalidImage { .. }
        | AssistantError::InvalidInput(_) => {
            let message = error.to_string();
            let first_line = message.lines().next().unwrap_or_default();
            client_error(modality, first_line)
        }
        other => {
            warn!("{} interaction failed: {}", modality, other);
            let body = notice(modality.failure_notice());
            (StatusCode::BAD_GATEWAY, Html(page(modality, &body))).into_response()
        }
    }
}

fn client_error(modality: Modality, message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Html(page(modality, &notice(message)))).into_response()
}

fn notice(message: &str) -> String {
    format!(r#"<div class="error" role="alert">{}</div>"#, escape(message))
}

fn download_label(modality: Modality) -> &'static str {
    match modality {
        Modality::Image => "Download analysis as .doc",
        Modality::Text => "Download response as .doc",
    }
}

fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

// ── HTML ─────────────────────────────────────────────────────────────────

fn result_section(output: &AnalysisOutput, preview: Option<&str>) -> String {
    let mut html = String::from(r#"<section class="result">"#);
    if let Some(src) = preview {
        let _ = write!(
            html,
            r#"<figure><img src="{src}" alt="Uploaded Image"><figcaption>Uploaded Image</figcaption></figure>"#
        );
    }
    let _ = write!(
        html,
        r#"<div class="response">{}</div><a class="download" download="{}" href="{}">{}</a></section>"#,
        escape(&output.text),
        output.download_filename(),
        data_uri(DOCX_MIME_TYPE, output.document.bytes()),
        download_label(output.modality),
    );
    html
}

/// Whole page with `result` placed under the surface for `active`.
fn page(active: Modality, result: &str) -> String {
    let (image_result, text_result) = match active {
        Modality::Image => (result, ""),
        Modality::Text => ("", result),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Visual Medical Assistant</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 0; display: flex; }}
aside {{ width: 16rem; padding: 1.5rem; background: #f0f2f6; min-height: 100vh; }}
main {{ flex: 1; padding: 1.5rem 3rem; max-width: 56rem; }}
section {{ margin-bottom: 2.5rem; }}
.response {{ white-space: pre-wrap; border-left: 3px solid #ccc; padding-left: 1rem; }}
.error {{ background: #ffe3e3; color: #7d1a1a; padding: .75rem 1rem; border-radius: .25rem; }}
figure img {{ max-width: 100%; }}
.download {{ display: inline-block; margin-top: 1rem; }}
</style>
</head>
<body>
<aside><h2>About</h2><p>{about}</p></aside>
<main>
<h1>{title}</h1>
<h3>{subheader}</h3>
<section id="image">
<h2>Image Analysis</h2>
<form action="/analyze/image" method="post" enctype="multipart/form-data">
<label>Upload the image for Analysis: <input type="file" name="image" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required></label>
<button type="submit">Analyze</button>
</form>
{image_result}
</section>
<section id="text">
<h2>Text Query</h2>
<form action="/analyze/query" method="post">
<label>Enter your medical query:<br><textarea name="query" rows="6" cols="70"></textarea></label><br>
<button type="submit">Submit Query</button>
</form>
{text_result}
</section>
</main>
</body>
</html>
"#,
        about = ABOUT_TEXT,
        title = PAGE_TITLE,
        subheader = PAGE_SUBHEADER,
    )
}
