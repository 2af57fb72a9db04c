//! Pipeline stages for renaming one invoice.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ encode/render ──▶ extract ──▶ naming ──▶ resolve ──▶ store
//!          (attachment)     (LLM)      (slug)     (_N suffix)  (copy + move)
//! ```
//!
//! 1. [`encode`]  — wrap the PDF (or PNG pages) as base64 attachments
//! 2. [`render`]  — rasterise the first pages via pdfium when the provider
//!    cannot read PDFs; runs in `spawn_blocking`
//! 3. [`extract`] — the collaborator seam and its LLM implementation; the
//!    only stage with network I/O
//! 4. [`resolve`] — find a free `{stem}_{n}{ext}` in the target directory
//!
//! Slug generation lives in [`crate::naming`] and orchestration in
//! [`crate::process`].

pub mod encode;
pub mod extract;
pub mod render;
pub mod resolve;
