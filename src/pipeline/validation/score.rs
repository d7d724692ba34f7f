//! Completeness score: weighted percentage of expected fields populated.
//!
//! Independent of errors/warnings. Required fields carry 60% of the score
//! split evenly, important fields 30%, optional fields 10%. A field counts
//! only when non-null, non-empty, and not a zero/empty-collection sentinel.

use crate::models::extraction::{ExtractionResult, FieldValue};

const REQUIRED_WEIGHT: f64 = 60.0;
const IMPORTANT_WEIGHT: f64 = 30.0;
const OPTIONAL_WEIGHT: f64 = 10.0;

pub fn completeness_score(result: &ExtractionResult) -> f64 {
    let required = [
        text_populated(&result.issuer),
        amount_populated(&result.amount_inclusive_tax),
        text_populated(&result.currency),
    ];
    let important = [
        text_populated(&result.payer),
        text_populated(&result.invoice_number),
        text_populated(&result.issue_date),
    ];
    let optional = [
        text_populated(&result.registration_number),
        amount_populated(&result.amount_exclusive_tax),
        text_populated(&result.due_date),
        !result.line_items.is_empty(),
        !result.key_facts.is_empty(),
    ];

    let score = weighted(&required, REQUIRED_WEIGHT)
        + weighted(&important, IMPORTANT_WEIGHT)
        + weighted(&optional, OPTIONAL_WEIGHT);

    score.clamp(0.0, 100.0)
}

fn weighted(fields: &[bool], weight: f64) -> f64 {
    let populated = fields.iter().filter(|p| **p).count() as f64;
    weight * populated / fields.len() as f64
}

fn text_populated(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn amount_populated(value: &Option<FieldValue>) -> bool {
    value.as_ref().is_some_and(FieldValue::is_populated)
}
