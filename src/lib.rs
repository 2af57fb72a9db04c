//! # edgequake-invoice-rename
//!
//! Rename PDF invoices after their issue date and issuer, using an LLM to
//! read the document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! in/*.pdf
//!  │
//!  ├─ 1. Enumerate   regular files ending in .pdf (any case), no recursion
//!  ├─ 2. Read        whole file into memory
//!  ├─ 3. Extract     PDF + instruction → LLM → {issueDate, issuerName}
//!  ├─ 4. Name        YYMMDD_issuer_slug.pdf  (brak_nazwy if the slug is empty)
//!  ├─ 5. Copy        byte-identical copy to out/, _1, _2 … on collision
//!  └─ 6. Move        original to processed/, same collision rule
//! ```
//!
//! One file at a time. A file that fails anywhere in 2–6 stays in `in/` and
//! the batch carries on with the next one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_invoice_rename::{run_batch, RenameConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential from GEMINI_API_KEY or GOOGLE_GENERATIVE_AI_API_KEY
//!     let config = RenameConfig::builder().root("/srv/invoices").build()?;
//!     let report = run_batch(&config).await?;
//!     for rec in &report.processed {
//!         println!("{} -> {}", rec.original_name, rec.output_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice-rename` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_batch, run_batch_with, run_batch_with_credentials};
pub use config::{AttachmentMode, RenameConfig, RenameConfigBuilder, WorkDirs};
pub use error::{InvoiceError, RenameError};
pub use naming::{sanitize, target_filename};
pub use output::{BatchReport, FileFailure, ProcessedInvoice};
pub use pipeline::extract::{ExtractionRequest, ExtractionResult, InvoiceExtractor, LlmExtractor};
pub use pipeline::resolve::resolve_unique;
pub use process::InvoiceProcessor;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{FileStore, LocalStore, MemoryStore};
