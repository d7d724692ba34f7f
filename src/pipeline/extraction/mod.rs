pub mod client;
pub mod parser;
pub mod prompt;
pub mod retry;

pub use client::*;
pub use parser::*;
pub use prompt::*;
pub use retry::*;

use thiserror::Error;

use crate::models::enums::PromptVariant;
use crate::models::extraction::{Document, ExtractionResult};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction service rate limit reached: {0}")]
    RateLimited(String),

    #[error("Document could not be read by the extraction service: {0}")]
    UnreadableDocument(String),

    #[error("Extraction service rejected the document format: {0}")]
    RejectedFormat(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("Extraction response did not match the invoice schema: {0}")]
    SchemaMismatch(String),
}

impl ExtractionError {
    /// Rate limits are worth a growing-backoff retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Content errors (unreadable bytes, rejected format) never succeed on
    /// retry and abort the stage immediately.
    pub fn is_content_error(&self) -> bool {
        matches!(self, Self::UnreadableDocument(_) | Self::RejectedFormat(_))
    }
}

/// The AI extraction collaborator. The pipeline selects the prompt variant
/// from the processing mode; implementations own the transport.
pub trait InvoiceExtractor {
    fn extract(
        &self,
        document: &Document,
        variant: PromptVariant,
    ) -> Result<ExtractionResult, ExtractionError>;
}
