//! Extraction-stage retry/backoff.
//!
//! Retrying is confined to this stage: validation, conversion, approval,
//! and persistence are never retried automatically.

use std::time::Duration;

use super::{ExtractionError, InvoiceExtractor};
use crate::models::enums::PromptVariant;
use crate::models::extraction::{Document, ExtractionResult};

/// Retry policy for the extraction call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts for rate-limited responses (first call included).
    pub max_attempts: u32,
    /// First retry waits this long; later rate-limit retries wait
    /// `base_delay × attempt`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Fast policy for tests.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }
}

/// Call the extractor with the stage's retry semantics:
///
/// - rate-limited → bounded retries with a delay growing per attempt
/// - content error (unreadable/rejected document) → abort immediately
/// - anything else → one retry at the fixed base delay, then give up
pub fn extract_with_retry(
    extractor: &dyn InvoiceExtractor,
    document: &Document,
    variant: PromptVariant,
    policy: &RetryPolicy,
) -> Result<ExtractionResult, ExtractionError> {
    let mut rate_attempts: u32 = 0;
    let mut transient_retried = false;

    loop {
        match extractor.extract(document, variant) {
            Ok(result) => return Ok(result),

            Err(e) if e.is_content_error() => {
                tracing::error!(
                    filename = %document.filename,
                    error = %e,
                    "Extraction content error — not retryable"
                );
                return Err(e);
            }

            Err(e) if e.is_rate_limited() => {
                rate_attempts += 1;
                if rate_attempts >= policy.max_attempts {
                    tracing::error!(
                        filename = %document.filename,
                        attempts = rate_attempts,
                        "Extraction rate limit: retry budget exhausted"
                    );
                    return Err(e);
                }
                let delay = policy.base_delay * rate_attempts;
                tracing::warn!(
                    filename = %document.filename,
                    attempt = rate_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Extraction rate-limited, backing off"
                );
                std::thread::sleep(delay);
            }

            Err(e) => {
                if transient_retried {
                    return Err(e);
                }
                transient_retried = true;
                tracing::warn!(
                    filename = %document.filename,
                    error = %e,
                    "Extraction failed, retrying once"
                );
                std::thread::sleep(policy.base_delay);
            }
        }
    }
}
