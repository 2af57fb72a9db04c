//! Batch driver: rename every eligible invoice in the input directory.
//!
//! Files are processed strictly one at a time, in whatever order the store
//! lists them. A failing file is logged and recorded in the report; it never
//! stops the batch. Only problems with the working directories themselves
//! (cannot create, cannot list) or with the provider setup are fatal.

use crate::config::{resolve_api_key, RenameConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::RenameError;
use crate::output::{BatchReport, FileFailure};
use crate::pipeline::extract::{InvoiceExtractor, LlmExtractor};
use crate::process::InvoiceProcessor;
use crate::store::{EntryKind, FileStore, LocalStore};
use edgequake_llm::{GeminiProvider, LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run one batch against the local filesystem.
///
/// The API credential is read from the environment (see
/// [`crate::config::API_KEY_VARS`]).
///
/// # Errors
/// Returns `Err(RenameError)` only for fatal errors:
/// - No extractor could be built (missing credential, unknown provider)
/// - A working directory could not be created
/// - The input directory could not be listed
///
/// Per-file failures are in [`BatchReport::failed`].
pub async fn run_batch(config: &RenameConfig) -> Result<BatchReport, RenameError> {
    run_batch_with_credentials(config, |key| std::env::var(key).ok()).await
}

/// [`run_batch`] with an explicit credential `lookup` instead of the
/// environment.
///
/// The extractor is resolved before any directory is created, so a missing
/// credential leaves the filesystem untouched.
pub async fn run_batch_with_credentials<F>(
    config: &RenameConfig,
    lookup: F,
) -> Result<BatchReport, RenameError>
where
    F: Fn(&str) -> Option<String>,
{
    let extractor = resolve_extractor_with(config, lookup)?;
    run_batch_with(&LocalStore, extractor.as_ref(), config).await
}

/// Run one batch with an explicit store and extractor.
pub async fn run_batch_with(
    store: &dyn FileStore,
    extractor: &dyn InvoiceExtractor,
    config: &RenameConfig,
) -> Result<BatchReport, RenameError> {
    ensure_dirs(store, config).await?;

    let files = list_eligible(store, &config.dirs.input).await?;
    let total = files.len();
    let callback = config.progress_callback.as_ref();

    if files.is_empty() {
        info!(
            "No PDF files in {}, nothing to do",
            config.dirs.input.display()
        );
        if let Some(cb) = callback {
            cb.on_nothing_to_do();
        }
        return Ok(BatchReport::default());
    }

    info!("Found {} invoice(s) in {}", total, config.dirs.input.display());
    if let Some(cb) = callback {
        cb.on_batch_start(total);
    }

    let processor = InvoiceProcessor::new(store, extractor, config);
    let examples = config.examples.as_deref();
    let mut report = BatchReport {
        total,
        ..Default::default()
    };

    for (i, path) in files.iter().enumerate() {
        let index = i + 1;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(cb) = callback {
            cb.on_file_start(index, total, &file_name);
        }

        match processor.process(path, examples).await {
            Ok(record) => {
                if let Some(cb) = callback {
                    cb.on_file_complete(index, total, &record);
                }
                report.processed.push(record);
            }
            Err(e) => {
                error!("{}: {}", file_name, e);
                let message = e.to_string();
                if let Some(cb) = callback {
                    cb.on_file_error(index, total, &file_name, &message);
                }
                report.failed.push(FileFailure {
                    file_name,
                    error: message,
                });
            }
        }
    }

    info!(
        "Batch complete: {}/{} renamed, {} failed",
        report.processed.len(),
        total,
        report.failed.len()
    );
    if let Some(cb) = callback {
        cb.on_batch_complete(total, report.processed.len());
    }
    Ok(report)
}

/// Create `in/`, `out/` and `processed/` if they are missing.
pub async fn ensure_dirs(store: &dyn FileStore, config: &RenameConfig) -> Result<(), RenameError> {
    for dir in config.dirs.all() {
        store
            .create_dir_all(dir)
            .await
            .map_err(|source| RenameError::CreateDirFailed {
                path: dir.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Whether `name` is an invoice candidate: ends in `.pdf`, any case.
pub fn is_pdf_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// Regular `.pdf` files directly inside `input_dir`, in store order.
pub async fn list_eligible(
    store: &dyn FileStore,
    input_dir: &Path,
) -> Result<Vec<PathBuf>, RenameError> {
    let entries = store
        .list_dir(input_dir)
        .await
        .map_err(|source| RenameError::ListDirFailed {
            path: input_dir.to_path_buf(),
            source,
        })?;

    Ok(entries
        .into_iter()
        .filter(|e| {
            let keep = e.kind == EntryKind::File && is_pdf_name(&e.file_name());
            if !keep {
                debug!("Skipping {}", e.path.display());
            }
            keep
        })
        .map(|e| e.path)
        .collect())
}

/// Pick the extractor, from most-specific to least-specific.
///
/// 1. **Pre-built extractor** (`config.extractor`) — used as-is.
/// 2. **Pre-built provider** (`config.provider`) — wrapped in [`LlmExtractor`].
/// 3. **Default Gemini provider** — built directly from the credential found
///    in either of [`crate::config::API_KEY_VARS`]; fails fast with
///    [`RenameError::MissingCredential`] when both are unset.
/// 4. **Other named provider + model** — built by [`ProviderFactory`], which
///    reads that provider's own API key from the environment.
pub fn resolve_extractor(config: &RenameConfig) -> Result<Arc<dyn InvoiceExtractor>, RenameError> {
    resolve_extractor_with(config, |key| std::env::var(key).ok())
}

/// [`resolve_extractor`] with an explicit credential `lookup`.
pub fn resolve_extractor_with<F>(
    config: &RenameConfig,
    lookup: F,
) -> Result<Arc<dyn InvoiceExtractor>, RenameError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    let provider = resolve_provider(config, lookup)?;
    Ok(Arc::new(LlmExtractor::new(provider, config)))
}

fn resolve_provider<F>(config: &RenameConfig, lookup: F) -> Result<Arc<dyn LLMProvider>, RenameError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let name = config.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER);
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    info!("Using provider {} with model {}", name, model);

    if name == DEFAULT_PROVIDER {
        let key = resolve_api_key(lookup)?;
        return Ok(Arc::new(GeminiProvider::new(key).with_model(model)));
    }

    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        RenameError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}
