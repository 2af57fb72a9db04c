//! Configuration for a renaming batch.
//!
//! Everything the batch needs is carried by [`RenameConfig`] and passed to
//! [`crate::batch::run_batch`] explicitly; nothing is read from process-wide
//! state once the config is built. The one exception is the API credential:
//! the default Gemini provider is built from [`resolve_api_key`] over the
//! environment, before any file is touched.

use crate::error::RenameError;
use crate::pipeline::extract::InvoiceExtractor;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment keys accepted for the API credential, in lookup order.
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"];

/// Provider used when none is named.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used when none is named.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Upper bound for [`RenameConfigBuilder::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// The three working directories of an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDirs {
    /// Invoices waiting to be renamed.
    pub input: PathBuf,
    /// Renamed copies.
    pub output: PathBuf,
    /// Originals after a successful run.
    pub processed: PathBuf,
}

impl WorkDirs {
    /// `in/`, `out/` and `processed/` under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            input: root.join("in"),
            output: root.join("out"),
            processed: root.join("processed"),
        }
    }

    /// All three directories, input first.
    pub fn all(&self) -> [&Path; 3] {
        [&self.input, &self.output, &self.processed]
    }
}

impl Default for WorkDirs {
    fn default() -> Self {
        Self::under(".")
    }
}

/// How the invoice is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachmentMode {
    /// The raw file bytes as an `application/pdf` attachment. (default)
    #[default]
    Pdf,
    /// The first pages rasterised to PNG, for providers that only accept images.
    Pages,
}

/// Configuration for one batch run.
///
/// Built via [`RenameConfig::builder()`] or [`RenameConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_invoice_rename::RenameConfig;
///
/// let config = RenameConfig::builder()
///     .root("/srv/invoices")
///     .max_retries(2)
///     .examples("ORLEN S.A. Stacja 4411 => Orlen pb")
///     .build()
///     .unwrap();
/// assert!(config.dirs.input.ends_with("in"));
/// ```
#[derive(Clone)]
pub struct RenameConfig {
    /// Working directories. Default: `./in`, `./out`, `./processed`.
    pub dirs: WorkDirs,

    /// LLM model identifier. If None, [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name. If None, [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extractor. Takes precedence over every provider setting.
    pub extractor: Option<Arc<dyn InvoiceExtractor>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per reply. Default: 512.
    ///
    /// The reply is a two-field JSON object; the cap only guards against a
    /// model that starts transcribing the invoice.
    pub max_tokens: usize,

    /// Retries after a failed extraction attempt. Default: 2 (three attempts).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds; a timeout counts as a failed attempt. Default: 60.
    pub api_timeout_secs: u64,

    /// Few-shot examples, one `source => target` per line, appended to the prompt.
    pub examples: Option<String>,

    /// Attachment encoding. Default: [`AttachmentMode::Pdf`].
    pub attachment: AttachmentMode,

    /// Pages rasterised in [`AttachmentMode::Pages`]. Default: 2.
    pub max_pages: usize,

    /// Longest edge of a rasterised page in pixels. Default: 1600.
    pub max_rendered_pixels: u32,

    /// Receives per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            dirs: WorkDirs::default(),
            model: None,
            provider_name: None,
            provider: None,
            extractor: None,
            temperature: 0.0,
            max_tokens: 512,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            examples: None,
            attachment: AttachmentMode::default(),
            max_pages: 2,
            max_rendered_pixels: 1600,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenameConfig")
            .field("dirs", &self.dirs)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn InvoiceExtractor>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("examples", &self.examples.as_ref().map(|e| e.lines().count()))
            .field("attachment", &self.attachment)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl RenameConfig {
    /// Create a new builder for `RenameConfig`.
    pub fn builder() -> RenameConfigBuilder {
        RenameConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenameConfig`].
#[derive(Debug)]
pub struct RenameConfigBuilder {
    config: RenameConfig,
}

impl RenameConfigBuilder {
    /// Installation root; the three working directories live under it.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.dirs = WorkDirs::under(root);
        self
    }

    pub fn dirs(mut self, dirs: WorkDirs) -> Self {
        self.config.dirs = dirs;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn InvoiceExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn examples(mut self, examples: impl Into<String>) -> Self {
        self.config.examples = Some(examples.into());
        self
    }

    pub fn attachment(mut self, mode: AttachmentMode) -> Self {
        self.config.attachment = mode;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenameConfig, RenameError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(RenameError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(RenameError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        let d = &c.dirs;
        if d.input == d.output || d.input == d.processed || d.output == d.processed {
            return Err(RenameError::InvalidConfig(format!(
                "input, output and processed directories must differ (got {:?})",
                d
            )));
        }
        Ok(self.config)
    }
}

/// Find the API credential using `lookup` over [`API_KEY_VARS`].
///
/// Empty values are treated as unset.
pub fn resolve_api_key<F>(lookup: F) -> Result<String, RenameError>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .ok_or(RenameError::MissingCredential { keys: API_KEY_VARS })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RenameConfig::default();
        assert_eq!(c.max_retries, 2);
        assert_eq!(c.attachment, AttachmentMode::Pdf);
        assert_eq!(c.dirs, WorkDirs::under("."));
    }

    #[test]
    fn work_dirs_layout() {
        let d = WorkDirs::under("/srv/inv");
        assert_eq!(d.input, PathBuf::from("/srv/inv/in"));
        assert_eq!(d.output, PathBuf::from("/srv/inv/out"));
        assert_eq!(d.processed, PathBuf::from("/srv/inv/processed"));
    }

    #[test]
    fn builder_rejects_shared_directories() {
        let dirs = WorkDirs {
            input: "/a".into(),
            output: "/a".into(),
            processed: "/b".into(),
        };
        let err = RenameConfig::builder().dirs(dirs).build().unwrap_err();
        assert!(matches!(err, RenameError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps() {
        let c = RenameConfig::builder()
            .temperature(9.0)
            .max_pages(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_pages, 1);
    }

    #[test]
    fn builder_caps_max_retries() {
        let c = RenameConfig::builder().max_retries(u32::MAX).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES_LIMIT);
        let c = RenameConfig::builder().max_retries(0).build().unwrap();
        assert_eq!(c.max_retries, 0);
    }

    #[test]
    fn api_key_first_key_wins() {
        let key = resolve_api_key(|k| match k {
            "GEMINI_API_KEY" => Some("a".into()),
            "GOOGLE_GENERATIVE_AI_API_KEY" => Some("b".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(key, "a");
    }

    #[test]
    fn api_key_second_key_used_when_first_blank() {
        let key = resolve_api_key(|k| match k {
            "GEMINI_API_KEY" => Some("  ".into()),
            "GOOGLE_GENERATIVE_AI_API_KEY" => Some("b".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(key, "b");
    }

    #[test]
    fn api_key_missing() {
        let err = resolve_api_key(|_| None).unwrap_err();
        assert!(matches!(err, RenameError::MissingCredential { .. }));
    }
}
