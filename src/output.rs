//! Result records for a batch run.

use serde::{Deserialize, Serialize};

/// Success record for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedInvoice {
    /// File name as found in the input directory.
    pub original_name: String,
    /// Name of the renamed copy in the output directory (suffix included).
    pub output_name: String,
    /// Name the original was moved to in the processed directory.
    pub processed_name: String,
    /// `YYMMDD` as extracted.
    pub issue_date: String,
    /// Issuer as extracted, before sanitising.
    pub issuer_name: String,
    /// Extraction attempts used (1 = first try).
    pub attempts: u32,
}

/// A file the batch could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

/// What a batch did. Mirrors the per-file log lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Eligible files found in the input directory.
    pub total: usize,
    pub processed: Vec<ProcessedInvoice>,
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    /// True when the input directory held no eligible invoices.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
