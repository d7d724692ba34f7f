//! Pipeline orchestrator.
//!
//! Single entry point that drives a document through
//! upload → extraction → validation → conversion → approval → export →
//! persistence, and a batch of documents through the same chain with
//! per-file isolation.
//!
//! Uses trait-based DI for all collaborators (InvoiceExtractor,
//! ObjectStore, RecordStore, RateProvider) so the orchestrator remains
//! fully testable with mock implementations.

use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::approval;
use super::conversion::{self, RateProvider};
use super::export;
use super::extraction::retry::extract_with_retry;
use super::extraction::{ExtractionError, InvoiceExtractor};
use super::persistence::{PersistenceError, RecordStore};
use super::storage::{ObjectStore, UploadError};
use super::validation::{self, ValidationOutcome};
use super::PipelineError;
use crate::config::PipelineConfig;
use crate::models::enums::{ApprovalStatus, ProcessingMode, StageStatus};
use crate::models::extraction::Document;
use crate::models::record::{
    ApprovalAnnotation, BatchResult, ProcessingRecord, ProgressEvent,
};

// ---------------------------------------------------------------------------
// Progress checkpoints
// ---------------------------------------------------------------------------

// Fixed per-stage percent markers so UIs render deterministically
// regardless of actual stage timing. Extraction and persistence also emit
// a completion checkpoint; terminal failures carry 0.
const PCT_UPLOAD: u8 = 10;
const PCT_EXTRACTION: u8 = 40;
const PCT_EXTRACTION_DONE: u8 = 70;
const PCT_VALIDATION: u8 = 75;
const PCT_CONVERSION: u8 = 80;
const PCT_APPROVAL: u8 = 85;
const PCT_EXPORT: u8 = 90;
const PCT_PERSISTENCE: u8 = 95;
const PCT_COMPLETE: u8 = 100;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Stage failures that are fatal for one file. Conversion, approval, and
/// export never appear here — those stages degrade in place.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StageError {
    fn stage(&self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::Extraction(_) => "extraction",
            Self::Persistence(_) => "persistence",
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Drives documents through the full processing chain. One instance runs
/// one document (or one batch) at a time; the progress log belongs to the
/// current run only and is never shared across concurrent runs.
pub struct InvoicePipeline {
    extractor: Box<dyn InvoiceExtractor + Send + Sync>,
    storage: Box<dyn ObjectStore + Send + Sync>,
    records: Box<dyn RecordStore + Send + Sync>,
    rates: Box<dyn RateProvider + Send + Sync>,
    config: PipelineConfig,
    progress_callbacks: Vec<ProgressCallback>,
    progress_history: Vec<ProgressEvent>,
}

impl InvoicePipeline {
    pub fn new(
        extractor: Box<dyn InvoiceExtractor + Send + Sync>,
        storage: Box<dyn ObjectStore + Send + Sync>,
        records: Box<dyn RecordStore + Send + Sync>,
        rates: Box<dyn RateProvider + Send + Sync>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            storage,
            records,
            rates,
            config,
            progress_callbacks: Vec::new(),
            progress_history: Vec::new(),
        }
    }

    /// Register a progress subscriber. Call before invoking an entry
    /// point; every subsequent event is delivered to every subscriber.
    pub fn on_progress(&mut self, callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.progress_callbacks.push(Box::new(callback));
    }

    /// Ordered progress log of the current (or most recent) run.
    pub fn progress_history(&self) -> &[ProgressEvent] {
        &self.progress_history
    }

    pub fn reset_progress(&mut self) {
        self.progress_history.clear();
    }

    fn emit(
        &mut self,
        status: StageStatus,
        stage: &str,
        percent: u8,
        message: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) {
        let event = ProgressEvent {
            status,
            stage: stage.to_string(),
            percent,
            message: message.into(),
            timestamp: Utc::now(),
            detail,
        };
        tracing::info!(
            stage = %event.stage,
            percent = event.percent,
            message = %event.message,
            "Pipeline progress"
        );
        for callback in &self.progress_callbacks {
            callback(&event);
        }
        self.progress_history.push(event);
    }

    /// Process one document through every stage.
    ///
    /// Infallible at the surface: any stage error is converted into a
    /// terminal `failed` progress event and a degenerate record with
    /// `success=false`. No stage runs after a failure, and nothing that
    /// already ran is rolled back (except the compensating delete of the
    /// uploaded object on a failed persistence write).
    pub fn process_single(
        &mut self,
        document: &Document,
        user_id: &str,
        mode: ProcessingMode,
    ) -> ProcessingRecord {
        self.progress_history.clear();
        let session_id = Uuid::new_v4();
        let start = Instant::now();

        tracing::info!(
            session = %session_id,
            filename = %document.filename,
            size = document.size,
            mode = mode.as_str(),
            "Processing document"
        );

        match self.run_stages(document, user_id, mode, session_id, start) {
            Ok(record) => record,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(
                    session = %session_id,
                    stage = e.stage(),
                    error = %message,
                    "Document processing failed"
                );
                self.emit(
                    StageStatus::Failed,
                    e.stage(),
                    0,
                    format!("Processing failed: {message}"),
                    Some(serde_json::json!({ "error": message })),
                );
                ProcessingRecord::failed(
                    session_id,
                    &document.filename,
                    mode,
                    user_id,
                    message,
                    start.elapsed().as_secs_f64(),
                )
            }
        }
    }

    fn run_stages(
        &mut self,
        document: &Document,
        user_id: &str,
        mode: ProcessingMode,
        session_id: Uuid,
        start: Instant,
    ) -> Result<ProcessingRecord, StageError> {
        let route = mode.route();

        // Stage 1: upload
        self.emit(
            StageStatus::Uploading,
            "upload",
            PCT_UPLOAD,
            format!("Uploading {} to storage...", document.filename),
            None,
        );
        let stored = self.storage.upload(&document.content, &document.filename)?;

        // Stage 2: extraction — the only stage with a retry loop
        self.emit(
            StageStatus::Processing,
            "extraction",
            PCT_EXTRACTION,
            "Extracting invoice fields...",
            None,
        );
        let raw = extract_with_retry(
            self.extractor.as_ref(),
            document,
            route.prompt,
            &self.config.extraction_retry,
        )?;
        self.emit(
            StageStatus::Processing,
            "extraction",
            PCT_EXTRACTION_DONE,
            "Extraction complete",
            serde_json::to_value(&raw).ok(),
        );

        // Stage 3: validation. From here on the normalized copy is the
        // source of truth — the raw extraction is dropped.
        self.emit(
            StageStatus::Processing,
            "validation",
            PCT_VALIDATION,
            "Validating extracted data...",
            None,
        );
        let ValidationOutcome { normalized, report } =
            validation::validate(&raw, self.config.strict_validation);

        // Stage 4: currency conversion (degrades, never fatal)
        self.emit(
            StageStatus::Processing,
            "conversion",
            PCT_CONVERSION,
            "Resolving JPY amount...",
            None,
        );
        let conversion = conversion::convert_to_jpy(&normalized, self.rates.as_ref());

        // Stage 5: approval evaluation (falls back to pending on failure)
        self.emit(
            StageStatus::Processing,
            "approval",
            PCT_APPROVAL,
            "Evaluating approval requirement...",
            None,
        );
        let approval = match approval::evaluate(&normalized, &self.config.approval) {
            Ok(annotation) => annotation,
            Err(e) => {
                tracing::warn!(error = %e, "Approval evaluation failed — falling back to pending");
                ApprovalAnnotation {
                    status: ApprovalStatus::Pending,
                    required_tier: None,
                    approver: None,
                    reason: format!("Approval evaluation failed: {e}"),
                }
            }
        };

        // Stage 6: export preparation (approved records only; degrades)
        self.emit(
            StageStatus::Processing,
            "export",
            PCT_EXPORT,
            "Staging export data...",
            None,
        );
        let export = export::prepare_export(&approval, &normalized);

        // Stage 7: persistence
        self.emit(
            StageStatus::Saving,
            "persistence",
            PCT_PERSISTENCE,
            "Persisting processing record...",
            None,
        );

        let line_items = normalized.line_items.clone();
        let mut record = ProcessingRecord {
            session_id,
            filename: document.filename.clone(),
            mode,
            user_id: user_id.to_string(),
            extraction: Some(normalized),
            validation: Some(report),
            conversion: Some(conversion),
            approval: Some(approval),
            export: Some(export),
            stored_file: Some(stored.clone()),
            persisted_id: None,
            success: true,
            error_message: None,
            elapsed_secs: 0.0,
        };

        let persisted_id = match self.records.insert(route.invoice_table, &record) {
            Ok(id) => id,
            Err(e) => {
                // Compensating action: don't leave an orphaned stored
                // object behind a failed persistence write.
                match self.storage.delete(&stored.id) {
                    Ok(()) => tracing::info!(
                        object = %stored.id,
                        "Compensating delete of uploaded object"
                    ),
                    Err(cleanup) => tracing::warn!(
                        object = %stored.id,
                        error = %cleanup,
                        "Compensating delete failed — stored object orphaned"
                    ),
                }
                return Err(e.into());
            }
        };

        if !line_items.is_empty() {
            if let Err(e) =
                self.records
                    .insert_line_items(route.line_item_table, &persisted_id, &line_items)
            {
                tracing::warn!(
                    table = route.line_item_table,
                    error = %e,
                    "Line-item insert failed — record kept"
                );
            }
        }

        record.persisted_id = Some(persisted_id.clone());
        record.elapsed_secs = start.elapsed().as_secs_f64();

        self.emit(
            StageStatus::Completed,
            "persistence",
            PCT_COMPLETE,
            format!("Processing complete (id: {persisted_id})"),
            Some(serde_json::json!({
                "persisted_id": persisted_id,
                "elapsed_secs": record.elapsed_secs,
            })),
        );

        Ok(record)
    }

    /// Process a batch of documents sequentially with per-file isolation:
    /// a failure on document *i* is recorded in `results[i]` and does not
    /// stop document *i+1*. `results[i]` always corresponds to
    /// `documents[i]`.
    pub fn process_batch(
        &mut self,
        documents: &[Document],
        user_id: &str,
        mode: ProcessingMode,
    ) -> Result<BatchResult, PipelineError> {
        if documents.is_empty() {
            return Err(PipelineError::NoDocuments);
        }

        let session_id = Uuid::new_v4();
        let start = Instant::now();
        tracing::info!(
            session = %session_id,
            files = documents.len(),
            mode = mode.as_str(),
            "Batch processing started"
        );

        let mut results = Vec::with_capacity(documents.len());
        for (i, document) in documents.iter().enumerate() {
            tracing::info!(
                index = i + 1,
                total = documents.len(),
                filename = %document.filename,
                "Batch file"
            );
            results.push(self.process_single(document, user_id, mode));
        }

        // Counters are derived from success flags, never accumulated.
        let successful_files = results.iter().filter(|r| r.success).count();
        let failed_files = results.len() - successful_files;

        tracing::info!(
            session = %session_id,
            total = results.len(),
            successful = successful_files,
            failed = failed_files,
            "Batch processing complete"
        );

        Ok(BatchResult {
            session_id,
            mode,
            total_files: results.len(),
            successful_files,
            failed_files,
            total_elapsed_secs: start.elapsed().as_secs_f64(),
            results,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
