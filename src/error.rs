//! Error types for the invoice renamer.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RenameError`] — **Fatal**: the batch cannot start or cannot continue
//!   at all (missing credential, working directories cannot be created or
//!   listed, provider not configured). Returned as `Err(RenameError)` from
//!   [`crate::batch::run_batch`].
//!
//! * [`InvoiceError`] — **Non-fatal**: a single invoice failed (unreadable
//!   file, extraction failed after retries, a write or rename failed). The
//!   batch driver catches it, records it in [`crate::output::FileFailure`]
//!   and moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice renamer.
///
/// Per-file failures use [`InvoiceError`] and never abort the batch.
#[derive(Debug, Error)]
pub enum RenameError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Neither of the recognised credential keys is set.
    #[error(
        "No API key configured.\n\
Set one of: {}\n\
Example: export GEMINI_API_KEY=...",
        .keys.join(", ")
    )]
    MissingCredential { keys: &'static [&'static str] },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Working directory errors ──────────────────────────────────────────
    /// One of `in/`, `out/`, `processed/` could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input directory could not be enumerated.
    #[error("Failed to list input directory '{path}': {source}")]
    ListDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-fatal error for a single invoice.
///
/// When this is returned the original file has not been moved: it either
/// stays in the input directory or, if the final rename itself failed, the
/// rename never happened.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// A file-store operation failed.
    #[error("{operation} failed for '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extraction collaborator failed on every attempt.
    #[error("Extraction failed after {attempts} attempt(s): {detail}")]
    ExtractionFailed { attempts: u32, detail: String },

    /// The model answered, but not with a valid `{issueDate, issuerName}` object.
    #[error("Model reply does not match the extraction schema: {0}")]
    MalformedReply(String),

    /// The extraction provider returned an error for a single call.
    #[error("LLM API error: {0}")]
    Api(String),

    /// Page rasterisation (attachment mode `pages`) failed.
    #[error("Rasterisation failed: {0}")]
    RasterisationFailed(String),

    /// Every suffix up to the sanity cap is already taken.
    #[error("No free name for '{path}' after {attempts} attempts")]
    TooManyCollisions { path: PathBuf, attempts: u32 },

    /// The path has no usable file name component.
    #[error("'{path}' has no file name")]
    NoFileName { path: PathBuf },
}

impl InvoiceError {
    /// Wrap an I/O error with the operation and path that produced it.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InvoiceError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_lists_both_keys() {
        let e = RenameError::MissingCredential {
            keys: &["GEMINI_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"],
        };
        let msg = e.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
        assert!(msg.contains("GOOGLE_GENERATIVE_AI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn io_display_names_operation_and_path() {
        let e = InvoiceError::io(
            "rename",
            "/tmp/in/a.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = e.to_string();
        assert!(msg.contains("rename"));
        assert!(msg.contains("/tmp/in/a.pdf"));
    }

    #[test]
    fn extraction_failed_display() {
        let e = InvoiceError::ExtractionFailed {
            attempts: 3,
            detail: "503 overloaded".into(),
        };
        assert!(e.to_string().contains("3 attempt"));
        assert!(e.to_string().contains("503"));
    }
}
