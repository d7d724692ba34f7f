pub mod approval;
pub mod conversion;
pub mod export;
pub mod extraction;
pub mod persistence;
pub mod processor;
pub mod storage;
pub mod validation;

use thiserror::Error;

/// Batch-level setup failures. Per-file problems never surface here —
/// they are caught at the orchestrator boundary and recorded as
/// `success=false` entries in the batch results.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No documents to process")]
    NoDocuments,
}
