use std::time::Duration;

use crate::pipeline::approval::ApprovalRules;
use crate::pipeline::extraction::retry::RetryPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Kessai";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,kessai=debug".into()
}

/// Tunable knobs for one pipeline instance. Everything has a production
/// default; tests override the pieces they exercise.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Extraction-stage retry/backoff. The only stage that retries.
    pub extraction_retry: RetryPolicy,
    /// Approval thresholds, blacklist, category rules, approver table.
    pub approval: ApprovalRules,
    /// How long a looked-up exchange rate stays fresh.
    pub rate_cache_ttl: Duration,
    /// Treat every validation warning as an error.
    pub strict_validation: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction_retry: RetryPolicy::default(),
            approval: ApprovalRules::default(),
            rate_cache_ttl: Duration::from_secs(3600),
            strict_validation: false,
        }
    }
}
