use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ApprovalStatus, ApprovalTier, ConversionStatus, ExpenseCategory, ProcessingMode, StageStatus,
};
use super::extraction::ExtractionResult;

/// Findings bucketed by rule family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorCategories {
    pub required_fields: Vec<String>,
    pub data_format: Vec<String>,
    pub business_logic: Vec<String>,
}

/// Issue counters for display summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total_issues: usize,
    pub critical_issues: usize,
    pub warnings: usize,
}

/// Result of running the validation engine over one extraction result.
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub categories: ErrorCategories,
    pub summary: IssueSummary,
    /// Weighted field-population score in [0, 100], independent of
    /// errors/warnings.
    pub completeness_score: f64,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            categories: ErrorCategories::default(),
            summary: IssueSummary::default(),
            completeness_score: 0.0,
        }
    }
}

impl ValidationReport {
    /// One-line summary for batch displays.
    pub fn summary_text(&self) -> String {
        if self.summary.total_issues == 0 {
            return "Validation passed: no issues".into();
        }
        let mut parts = Vec::new();
        if self.summary.critical_issues > 0 {
            parts.push(format!("errors: {}", self.summary.critical_issues));
        }
        if self.summary.warnings > 0 {
            parts.push(format!("warnings: {}", self.summary.warnings));
        }
        parts.join(" / ")
    }
}

/// Outcome of the currency-conversion decision stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionAnnotation {
    pub exchange_rate: Option<f64>,
    /// Always populated when the tax-inclusive amount is; equal to the
    /// original amount when conversion degraded or was unnecessary.
    pub jpy_amount: Option<f64>,
    pub status: ConversionStatus,
    /// Where the rate came from ("exchange_rate_api", "no_conversion_needed", ...).
    pub source: Option<String>,
    pub converted_at: DateTime<Utc>,
}

/// Outcome of the approval-evaluation decision stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalAnnotation {
    pub status: ApprovalStatus,
    pub required_tier: Option<ApprovalTier>,
    /// Resolved approver e-mail, when a tier is required.
    pub approver: Option<String>,
    pub reason: String,
}

/// Accounting-system account a category maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMapping {
    pub code: String,
    pub name: String,
    pub sub_account: String,
}

/// Outcome of the export-preparation decision stage. Staging only — the
/// actual accounting-export call is out of scope and never happens here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportAnnotation {
    pub export_ready: bool,
    pub batch_id: Option<String>,
    pub category: ExpenseCategory,
    pub account: Option<AccountMapping>,
    pub note: Option<String>,
}

/// One progress checkpoint emitted at a stage boundary.
///
/// Percent markers are fixed per stage so UIs render deterministically
/// regardless of actual timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: StageStatus,
    pub stage: String,
    pub percent: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<serde_json::Value>,
}

/// Storage handle for an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub url: Option<String>,
}

/// Terminal, persistable aggregate for one processed document.
///
/// Invariant: `success == true` implies `persisted_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub session_id: Uuid,
    pub filename: String,
    pub mode: ProcessingMode,
    pub user_id: String,
    pub extraction: Option<ExtractionResult>,
    pub validation: Option<ValidationReport>,
    pub conversion: Option<ConversionAnnotation>,
    pub approval: Option<ApprovalAnnotation>,
    pub export: Option<ExportAnnotation>,
    pub stored_file: Option<StoredFile>,
    pub persisted_id: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub elapsed_secs: f64,
}

impl ProcessingRecord {
    /// Degenerate record for a failed run; used for batch reporting so
    /// `results[i]` always exists.
    pub fn failed(
        session_id: Uuid,
        filename: &str,
        mode: ProcessingMode,
        user_id: &str,
        error_message: String,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            session_id,
            filename: filename.to_string(),
            mode,
            user_id: user_id.to_string(),
            extraction: None,
            validation: None,
            conversion: None,
            approval: None,
            export: None,
            stored_file: None,
            persisted_id: None,
            success: false,
            error_message: Some(error_message),
            elapsed_secs,
        }
    }
}

/// Aggregate result of a batch run. `results.len()` always equals the
/// number of input documents; counters are derived from success flags,
/// never mutated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub session_id: Uuid,
    pub mode: ProcessingMode,
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub total_elapsed_secs: f64,
    pub results: Vec<ProcessingRecord>,
}
