//! Configuration for a batch extraction run.
//!
//! All Extractor behaviour is controlled through [`ExtractorConfig`], built
//! via its [`ExtractorConfigBuilder`] and handed to
//! [`crate::Extractor::new`]. Nothing is read from ambient global state
//! except the API-key environment variables consulted when no key or
//! service is configured.

use crate::error::Exam2JsonError;
use crate::pipeline::input::DEFAULT_OUTPUT_SUFFIX;
use crate::progress::ProgressCallback;
use crate::service::{ExtractionService, GeminiService};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variables checked (in order) for a Gemini API key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Configuration for an extraction batch.
///
/// # Example
/// ```rust
/// use exam2json::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .input_dir("./pdfs")
///     .output_dir("./json")
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Directory holding the exam PDFs. Default: `./pdfs`.
    pub input_dir: PathBuf,

    /// Directory receiving one JSON file per converted PDF. Default: `./json`.
    pub output_dir: PathBuf,

    /// Model identifier. Default: `gemini-2.5-flash-lite`.
    pub model: String,

    /// API base URL. Default: the public Gemini endpoint.
    pub base_url: String,

    /// API key. If None, taken from [`API_KEY_ENV_VARS`].
    pub api_key: Option<String>,

    /// Suffix replacing the input extension. Default: `_structured_output.json`.
    pub output_suffix: String,

    /// Sort input entries by file name before processing. Default: true.
    ///
    /// When false, files are processed in raw directory-listing order, which
    /// differs between platforms.
    pub sort_inputs: bool,

    /// Per-request timeout in seconds. Default: None (wait indefinitely).
    pub request_timeout_secs: Option<u64>,

    /// Pre-constructed service. Takes precedence over every key setting.
    pub service: Option<Arc<dyn ExtractionService>>,

    /// Per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./pdfs"),
            output_dir: PathBuf::from("./json"),
            model: GeminiService::DEFAULT_MODEL.to_string(),
            base_url: GeminiService::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            sort_inputs: true,
            request_timeout_secs: None,
            service: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("output_suffix", &self.output_suffix)
            .field("sort_inputs", &self.sort_inputs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the extraction service, from most-specific to least-specific:
    ///
    /// 1. **Injected service** (`service`): used as-is (tests, custom
    ///    providers).
    /// 2. **Configured key** (`api_key`): a [`GeminiService`] for `model`.
    /// 3. **Environment**: the first non-empty variable in
    ///    [`API_KEY_ENV_VARS`].
    pub fn resolve_service(&self) -> Result<Arc<dyn ExtractionService>, Exam2JsonError> {
        if let Some(ref service) = self.service {
            return Ok(Arc::clone(service));
        }

        let key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .filter_map(|var| std::env::var(var).ok())
                    .find(|k| !k.is_empty())
            })
            .ok_or_else(|| Exam2JsonError::ProviderNotConfigured {
                provider: "gemini".to_string(),
                hint: format!(
                    "No API key configured.\nSet {} (or pass --api-key).",
                    API_KEY_ENV_VARS.join(" or ")
                ),
            })?;

        let timeout = self.request_timeout_secs.map(std::time::Duration::from_secs);
        let service = GeminiService::new(key, &self.model, &self.base_url, timeout)?;
        Ok(Arc::new(service))
    }
}

/// Builder for [`ExtractorConfig`].
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl fmt::Debug for ExtractorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractorConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    pub fn sort_inputs(mut self, v: bool) -> Self {
        self.config.sort_inputs = v;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn service(mut self, service: Arc<dyn ExtractionService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, Exam2JsonError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Exam2JsonError::InvalidConfig("model must not be empty".into()));
        }
        if c.output_suffix.is_empty() || c.output_suffix.contains(['/', '\\']) {
            return Err(Exam2JsonError::InvalidConfig(format!(
                "output suffix must be a non-empty file-name fragment, got {:?}",
                c.output_suffix
            )));
        }
        if c.input_dir == c.output_dir {
            return Err(Exam2JsonError::InvalidConfig(format!(
                "input and output directories must differ (both '{}')",
                c.input_dir.display()
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(Exam2JsonError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
