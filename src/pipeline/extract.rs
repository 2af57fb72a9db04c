//! The extraction collaborator: invoice bytes in, `{issueDate, issuerName}` out.
//!
//! [`InvoiceExtractor`] is the seam between the renamer and whatever reads
//! the document. The production implementation, [`LlmExtractor`], sends the
//! invoice plus the instruction from [`crate::prompts`] to an
//! `edgequake_llm` provider and validates the JSON reply. A reply that does
//! not fit the schema is an error, never a partially filled result, so the
//! processor's retry loop treats it like any other failed call.

use crate::config::{AttachmentMode, RenameConfig};
use crate::error::InvoiceError;
use crate::pipeline::{encode, render};
use crate::prompts::SYSTEM_ROLE;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Fields extracted from one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Issue date as `YYMMDD`, exactly six ASCII digits.
    pub issue_date: String,
    /// Issuer as the model wrote it; never empty.
    pub issuer_name: String,
}

impl ExtractionResult {
    /// Check the schema and return a trimmed copy.
    pub fn validated(self) -> Result<Self, InvoiceError> {
        let issue_date = self.issue_date.trim().to_string();
        if !RE_ISSUE_DATE.is_match(&issue_date) {
            return Err(InvoiceError::MalformedReply(format!(
                "issueDate must be 6 digits (YYMMDD), got {:?}",
                self.issue_date
            )));
        }
        let issuer_name = self.issuer_name.trim().to_string();
        if issuer_name.is_empty() {
            return Err(InvoiceError::MalformedReply(
                "issuerName is empty".into(),
            ));
        }
        Ok(Self {
            issue_date,
            issuer_name,
        })
    }
}

/// Everything the collaborator gets for one invoice.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    /// File name, for logging only.
    pub file_name: &'a str,
    /// The full invoice, unchanged.
    pub bytes: &'a [u8],
    /// Instruction text, see [`crate::prompts::build_instruction`].
    pub instruction: &'a str,
}

/// Reads an invoice and returns its issue date and issuer.
///
/// Implementations fail the call rather than return data that violates the
/// [`ExtractionResult`] invariants. Retrying is the caller's job.
#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    async fn extract(
        &self,
        request: ExtractionRequest<'_>,
    ) -> Result<ExtractionResult, InvoiceError>;
}

// ── LLM-backed implementation ────────────────────────────────────────────

/// [`InvoiceExtractor`] on top of an `edgequake_llm` chat provider.
pub struct LlmExtractor {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    attachment: AttachmentMode,
    max_pages: usize,
    max_rendered_pixels: u32,
}

impl LlmExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &RenameConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            attachment: config.attachment,
            max_pages: config.max_pages,
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    async fn attachments(&self, bytes: &[u8]) -> Result<Vec<ImageData>, InvoiceError> {
        match self.attachment {
            AttachmentMode::Pdf => Ok(vec![encode::encode_pdf(bytes)]),
            AttachmentMode::Pages => {
                let pages =
                    render::render_pages(bytes.to_vec(), self.max_pages, self.max_rendered_pixels)
                        .await?;
                pages
                    .iter()
                    .map(|img| {
                        encode::encode_page(img).map_err(|e| {
                            InvoiceError::RasterisationFailed(format!("PNG encoding: {e}"))
                        })
                    })
                    .collect()
            }
        }
    }
}

#[async_trait]
impl InvoiceExtractor for LlmExtractor {
    async fn extract(
        &self,
        request: ExtractionRequest<'_>,
    ) -> Result<ExtractionResult, InvoiceError> {
        let attachments = self.attachments(request.bytes).await?;
        let messages = vec![
            ChatMessage::system(SYSTEM_ROLE),
            ChatMessage::user_with_images(request.instruction, attachments),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| InvoiceError::Api(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            request.file_name, response.prompt_tokens, response.completion_tokens
        );

        parse_reply(&response.content)
    }
}

/// Build `CompletionOptions` from the batch config.
fn build_options(config: &RenameConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Reply parsing ────────────────────────────────────────────────────────

static RE_ISSUE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").unwrap());

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*)\n```\s*$").unwrap());

/// Parse and validate the model's reply.
///
/// Accepts the bare JSON object, the object wrapped in a ```` ```json ````
/// fence, or the object surrounded by stray prose.
pub fn parse_reply(content: &str) -> Result<ExtractionResult, InvoiceError> {
    let trimmed = content.trim();
    let unfenced = match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    };

    let json = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => {
            return Err(InvoiceError::MalformedReply(format!(
                "no JSON object in reply: {:?}",
                truncate(trimmed, 120)
            )))
        }
    };

    let parsed: ExtractionResult = serde_json::from_str(json)
        .map_err(|e| InvoiceError::MalformedReply(format!("{e}: {:?}", truncate(json, 120))))?;
    parsed.validated()
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
