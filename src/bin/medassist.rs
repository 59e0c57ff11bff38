//! CLI binary for medassist.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssistantConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use medassist::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use medassist::{
    server, write_document, AnalysisOutput, AnalysisProgressCallback, Assistant, AssistantConfig,
    Modality, ProgressCallback,
};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner shown while the model is thinking.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_dispatch_start(&self, modality: Modality) {
        let msg = match modality {
            Modality::Image => "Analyzing…",
            Modality::Text => "Processing…",
        };
        self.bar.set_prefix(modality.to_string());
        self.bar.set_message(msg);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_response(&self, _modality: Modality, text_len: usize) {
        self.bar
            .set_message(format!("Building document from {text_len} chars…"));
    }

    // `main` reports the error itself.
    fn on_failure(&self, _modality: Modality, _error: &str) {
        self.bar.finish_and_clear();
    }

    fn on_document_ready(&self, _modality: Modality, byte_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Document ready  {}",
            green("✔"),
            dim(&format!("{byte_len} bytes"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a radiograph; the answer goes to stdout,
  # the Word document to ./medical_image_analysis.doc
  medassist image chest-xray.png

  # Ask a question and save the document elsewhere
  medassist query "What are common causes of lower back pain?" -o back-pain.doc

  # Read the question from stdin, structured output
  echo "Is ibuprofen safe with asthma?" | medassist query - --json

  # Start the browser front end
  medassist serve --bind 127.0.0.1:8080

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  GOOGLE_API_KEY          Fallback when GEMINI_API_KEY is unset
  MEDASSIST_MODEL         Override model ID
  RUST_LOG                Override log filter (e.g. medassist=debug)

DISCLAIMER:
  Answers are generated by an AI model and are not medical advice.
  Always consult a qualified healthcare professional.
"#;

/// Analyze medical images and answer medical questions with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "medassist",
    version,
    about = "Analyze medical images and answer medical questions with Gemini",
    long_about = "Send a medical image or a free-text medical question to a Google Gemini model \
and get back a structured explanation, plus a Word document of the answer with bold section \
headers and bulleted points.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, global = true, env = "MEDASSIST_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Generative Language API base URL.
    #[arg(long, global = true, env = "MEDASSIST_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, default_value_t = 1.0)]
    temperature: f32,

    /// Nucleus sampling mass (0.0–1.0).
    #[arg(long, global = true, default_value_t = 0.95)]
    top_p: f32,

    /// Top-k sampling; 0 leaves it to the service.
    #[arg(long, global = true, default_value_t = 0)]
    top_k: u32,

    /// Max output tokens per answer.
    #[arg(long, global = true, default_value_t = 8192)]
    max_output_tokens: u32,

    /// Service call timeout in seconds.
    #[arg(long, global = true, env = "MEDASSIST_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable the spinner.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and the answer itself.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a JPEG or PNG medical image.
    Image {
        /// Path to the image.
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Answer a medical question ("-" reads it from stdin).
    Query {
        text: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Serve the browser front end.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "MEDASSIST_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write the Word document here instead of the default filename.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write a Word document.
    #[arg(long, conflicts_with = "output")]
    no_document: bool,

    /// Print structured JSON (AnalysisOutput) instead of the raw answer.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let json = match &cli.command {
        Commands::Image { output, .. } | Commands::Query { output, .. } => output.json,
        Commands::Serve { .. } => false,
    };
    let serving = matches!(cli.command, Commands::Serve { .. });
    let show_progress = !cli.quiet && !cli.no_progress && !json && !serving;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build assistant ──────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let assistant = Assistant::new(config).context("Failed to set up the assistant")?;

    // ── Run ──────────────────────────────────────────────────────────────
    match cli.command {
        Commands::Image { path, output } => {
            let result = assistant
                .analyze_image_file(&path)
                .await
                .context(Modality::Image.failure_notice())?;
            emit(&result, &output, cli.quiet).await?;
        }
        Commands::Query { text, output } => {
            let text = if text == "-" {
                read_stdin()?
            } else {
                text
            };
            let result = assistant
                .answer_query(&text)
                .await
                .context(Modality::Text.failure_notice())?;
            emit(&result, &output, cli.quiet).await?;
        }
        Commands::Serve { bind } => {
            if !cli.quiet {
                eprintln!("{} Serving on {}", green("◆"), bold(&format!("http://{bind}")));
            }
            server::serve(bind, Arc::new(assistant))
                .await
                .context("Server failed")?;
        }
    }

    Ok(())
}

/// Print the answer and write the document.
async fn emit(result: &AnalysisOutput, args: &OutputArgs, quiet: bool) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(result).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.text.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !result.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if args.no_document {
        return Ok(());
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(result.download_filename()));
    write_document(&result.document, &path)
        .await
        .with_context(|| format!("Failed to write document to {}", path.display()))?;

    if !quiet && !args.json {
        eprintln!(
            "{}  {} blocks  {}ms  →  {}",
            green("✔"),
            result.document.blocks.len(),
            result.stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&result.stats.input_tokens.to_string()),
            dim(&result.stats.output_tokens.to_string()),
        );
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read query from stdin")?;
    Ok(buf)
}

/// Map CLI args to `AssistantConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssistantConfig> {
    let mut builder = AssistantConfig::builder()
        .model(&cli.model)
        .base_url(&cli.base_url)
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .top_k(cli.top_k)
        .max_output_tokens(cli.max_output_tokens)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
