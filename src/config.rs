//! Configuration types for the assistant.
//!
//! All behaviour is controlled through [`AssistantConfig`], built via its
//! [`AssistantConfigBuilder`]. The config is constructed once at process
//! start and passed by reference into the dispatcher; nothing here is global.
//! Unset fields keep the product's fixed sampling and safety settings.

use crate::error::AssistantError;
use crate::progress::ProgressCallback;
use crate::service::GenerativeService;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Default REST endpoint of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variables consulted, in order, when no key is configured.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration for the assistant.
///
/// Built via [`AssistantConfig::builder()`] or using
/// [`AssistantConfig::default()`].
///
/// # Example
/// ```rust
/// use medassist::AssistantConfig;
///
/// let config = AssistantConfig::builder()
///     .model("gemini-1.5-flash")
///     .temperature(0.4)
///     .api_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AssistantConfig {
    /// API key for the generative service. If None, the environment is
    /// consulted (see [`API_KEY_ENV_VARS`]).
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Service base URL, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Sampling parameters applied to every request.
    pub generation: GenerationConfig,

    /// Harm-category block thresholds applied to every request.
    pub safety: SafetyPolicy,

    /// Transport-level timeout of the service client in seconds. Default: 120.
    ///
    /// Long image analyses with 8 192 output tokens regularly take over a
    /// minute, so the default is generous.
    pub api_timeout_secs: u64,

    /// Pre-constructed service. Takes precedence over `api_key`.
    pub service: Option<Arc<dyn GenerativeService>>,

    /// Optional observer notified as the interaction progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
            safety: SafetyPolicy::default(),
            api_timeout_secs: 120,
            service: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("generation", &self.generation)
            .field("safety", &self.safety)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AssistantConfig {
    /// Create a new builder for `AssistantConfig`.
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured key, else the first non-empty key variable in the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
    }
}

/// Builder for [`AssistantConfig`].
#[derive(Debug)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.generation.temperature = t;
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.generation.top_p = p;
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.config.generation.top_k = k;
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.generation.max_output_tokens = n;
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn safety(mut self, policy: SafetyPolicy) -> Self {
        self.config.safety = policy;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn service(mut self, service: Arc<dyn GenerativeService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssistantConfig, AssistantError> {
        let c = &self.config;
        let g = &c.generation;
        if !(0.0..=2.0).contains(&g.temperature) {
            return Err(AssistantError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                g.temperature
            )));
        }
        if !(0.0..=1.0).contains(&g.top_p) {
            return Err(AssistantError::InvalidConfig(format!(
                "top_p must be 0.0–1.0, got {}",
                g.top_p
            )));
        }
        if g.max_output_tokens == 0 {
            return Err(AssistantError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(AssistantError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(AssistantError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Sampling ─────────────────────────────────────────────────────────────

/// Sampling parameters, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    /// `0` leaves the choice to the service.
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 0,
            max_output_tokens: 8192,
        }
    }
}

// ── Safety ───────────────────────────────────────────────────────────────

/// Harm categories the service can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

/// Probability level at and above which the service blocks output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One `{category, threshold}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

/// Ordered set of safety settings, one per harm category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

impl SafetyPolicy {
    /// Apply the same threshold to all four categories, in canonical order.
    pub fn uniform(threshold: BlockThreshold) -> Self {
        let settings = [
            HarmCategory::HarmCategoryHarassment,
            HarmCategory::HarmCategoryHateSpeech,
            HarmCategory::HarmCategorySexuallyExplicit,
            HarmCategory::HarmCategoryDangerousContent,
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category,
            threshold,
        })
        .collect();
        Self { settings }
    }

    /// Replace the threshold for `category`, appending it if absent.
    ///
    /// Keeps at most one entry per category and preserves insertion order.
    pub fn with(mut self, category: HarmCategory, threshold: BlockThreshold) -> Self {
        match self.settings.iter_mut().find(|s| s.category == category) {
            Some(existing) => existing.threshold = threshold,
            None => self.settings.push(SafetySetting {
                category,
                threshold,
            }),
        }
        self
    }

    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::uniform(BlockThreshold::BlockMediumAndAbove)
    }
}
