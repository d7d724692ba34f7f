//! Parsing of AI extraction responses.
//!
//! The primary contract is a single strict, schema-validated parse of the
//! response body. The multi-pattern recovery path exists only for
//! responses wrapped in markdown or prose and is invoked explicitly by
//! the caller when the strict parse fails — it is not part of the
//! primary contract.

use std::sync::OnceLock;

use regex::Regex;

use super::ExtractionError;
use crate::models::extraction::ExtractionResult;

/// Strict parse: the body must be exactly one JSON object matching the
/// invoice schema. Any mismatch is a typed error.
pub fn parse_extraction_response(body: &str) -> Result<ExtractionResult, ExtractionError> {
    serde_json::from_str(body.trim()).map_err(|e| ExtractionError::SchemaMismatch(e.to_string()))
}

/// Optional recovery for responses that wrap the JSON payload in markdown
/// or prose. Tries, in order: a fenced ```json block, an anonymous fenced
/// block that looks like an object, the first brace-delimited object, and
/// finally the whole body. Every candidate still goes through the strict
/// schema parse.
pub fn recover_extraction_lenient(body: &str) -> Option<ExtractionResult> {
    for candidate in candidate_payloads(body) {
        if let Ok(result) = serde_json::from_str::<ExtractionResult>(candidate.trim()) {
            tracing::debug!("Recovered extraction payload from wrapped response");
            return Some(result);
        }
    }
    None
}

fn candidate_payloads(body: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    if let Some(captures) = json_fence_re().captures(body) {
        if let Some(m) = captures.get(1) {
            candidates.push(m.as_str());
        }
    }

    if let Some(captures) = bare_fence_re().captures(body) {
        if let Some(m) = captures.get(1) {
            let inner = m.as_str().trim();
            if inner.starts_with('{') && inner.ends_with('}') {
                candidates.push(m.as_str());
            }
        }
    }

    if let Some(m) = brace_object_re().find(body) {
        candidates.push(m.as_str());
    }

    candidates.push(body);
    candidates
}

fn json_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*\n(.*?)\n```").expect("static regex"))
}

fn bare_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```\s*\n(.*?)\n```").expect("static regex"))
}

fn brace_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}
