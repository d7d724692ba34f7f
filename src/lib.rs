//! Kessai — AI-assisted invoice ingestion pipeline.
//!
//! Drives a document (or a batch of documents) through
//! upload → AI extraction → validation/normalization → currency
//! conversion → approval evaluation → export preparation → persistence,
//! emitting deterministic progress events at each stage boundary.
//!
//! External collaborators (AI extraction, object storage, relational
//! persistence, exchange rates) are trait-based and injected into the
//! orchestrator's constructor, so the whole pipeline runs against mocks
//! in tests.

pub mod config;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries or test harnesses embedding the
/// pipeline. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
