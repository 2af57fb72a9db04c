//! The invoice processor: one file from `in/` to `out/` + `processed/`.
//!
//! ## Steps
//!
//! 1. Read the whole file
//! 2. Ask the extractor for `{issueDate, issuerName}`, retrying failed calls
//! 3. Derive `{date}_{slug}{ext}` (see [`crate::naming`])
//! 4. Write a byte-identical copy under a free name in `out/`
//! 5. Move the original under a free name in `processed/`
//!
//! The original is only ever touched by the final rename. If anything before
//! it fails, the file stays in `in/` and the next run picks it up again. A
//! failure of the rename itself leaves the copy in `out/` behind; the next
//! run then produces a `_1` copy.

use crate::config::RenameConfig;
use crate::error::InvoiceError;
use crate::naming::{extension_of, target_filename};
use crate::output::ProcessedInvoice;
use crate::pipeline::extract::{ExtractionRequest, ExtractionResult, InvoiceExtractor};
use crate::pipeline::resolve::resolve_unique;
use crate::prompts::build_instruction;
use crate::store::FileStore;
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Processes single invoices against one store and one extractor.
///
/// Holds no mutable state; calls are independent of each other.
pub struct InvoiceProcessor<'a> {
    store: &'a dyn FileStore,
    extractor: &'a dyn InvoiceExtractor,
    config: &'a RenameConfig,
}

impl<'a> InvoiceProcessor<'a> {
    pub fn new(
        store: &'a dyn FileStore,
        extractor: &'a dyn InvoiceExtractor,
        config: &'a RenameConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            config,
        }
    }

    /// Rename one invoice.
    ///
    /// `examples` is the optional few-shot hint appended to the instruction.
    pub async fn process(
        &self,
        file_path: &Path,
        examples: Option<&str>,
    ) -> Result<ProcessedInvoice, InvoiceError> {
        let start = Instant::now();
        let file_name = file_path
            .file_name()
            .ok_or_else(|| InvoiceError::NoFileName {
                path: file_path.to_path_buf(),
            })?;
        // Lossy copy for records and logs; paths keep the raw OsStr.
        let original_name = file_name.to_string_lossy().into_owned();
        let extension = extension_of(file_path);

        // ── Step 1: Read ─────────────────────────────────────────────────
        let bytes = self
            .store
            .read(file_path)
            .await
            .map_err(|e| InvoiceError::io("read", file_path, e))?;
        debug!("{}: read {} bytes", original_name, bytes.len());

        // ── Step 2: Extract ──────────────────────────────────────────────
        let instruction = build_instruction(examples);
        let request = ExtractionRequest {
            file_name: &original_name,
            bytes: &bytes,
            instruction: &instruction,
        };
        let (extracted, attempts) = self.extract_with_retry(request).await?;

        // ── Step 3: Name ─────────────────────────────────────────────────
        let target = target_filename(&extracted.issue_date, &extracted.issuer_name, &extension);

        // ── Step 4: Copy to out/ ─────────────────────────────────────────
        let output_path =
            resolve_unique(self.store, &self.config.dirs.output.join(&target)).await?;
        self.store
            .write(&output_path, &bytes)
            .await
            .map_err(|e| InvoiceError::io("write", &output_path, e))?;

        // ── Step 5: Move original to processed/ ──────────────────────────
        let processed_path =
            resolve_unique(self.store, &self.config.dirs.processed.join(file_name)).await?;
        self.store
            .rename(file_path, &processed_path)
            .await
            .map_err(|e| InvoiceError::io("rename", file_path, e))?;

        let record = ProcessedInvoice {
            original_name,
            output_name: file_name_of(&output_path),
            processed_name: file_name_of(&processed_path),
            issue_date: extracted.issue_date,
            issuer_name: extracted.issuer_name,
            attempts,
        };
        info!(
            "{} → {} ({}, {}) in {}ms",
            record.original_name,
            record.output_name,
            record.issue_date,
            record.issuer_name,
            start.elapsed().as_millis()
        );
        Ok(record)
    }

    /// Call the extractor up to `max_retries + 1` times with exponential backoff.
    ///
    /// Returns the result and the number of attempts it took.
    async fn extract_with_retry(
        &self,
        request: ExtractionRequest<'_>,
    ) -> Result<(ExtractionResult, u32), InvoiceError> {
        let max_retries = self.config.max_retries;
        let call_timeout = Duration::from_secs(self.config.api_timeout_secs);
        let mut last_err: Option<String> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = retry_backoff_ms(self.config.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    request.file_name, attempt, max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let outcome = match timeout(call_timeout, self.extractor.extract(request)).await {
                Ok(result) => result.and_then(ExtractionResult::validated),
                Err(_) => Err(InvoiceError::Api(format!(
                    "timed out after {}s",
                    call_timeout.as_secs()
                ))),
            };

            match outcome {
                Ok(result) => return Ok((result, attempt + 1)),
                Err(e) => {
                    warn!(
                        "{}: attempt {} failed — {}",
                        request.file_name,
                        attempt + 1,
                        e
                    );
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(InvoiceError::ExtractionFailed {
            attempts: max_retries + 1,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating at `u64::MAX`.
fn retry_backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    base_ms.saturating_mul(factor)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
