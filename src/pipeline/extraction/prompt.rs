//! Extraction prompt templates, one per variant.
//!
//! The variant is selected only through `ProcessingMode::route()` — no
//! other code path chooses a prompt.

use crate::models::enums::PromptVariant;

/// Shared field contract appended to every variant. Field names must match
/// the `ExtractionResult` schema exactly.
const FIELD_CONTRACT: &str = r#"Return a single JSON object with these fields (use null for anything not present on the invoice):
{
    "issuer": "string",
    "payer": "string",
    "invoice_number": "string",
    "registration_number": "string",
    "issue_date": "YYYY-MM-DD",
    "due_date": "YYYY-MM-DD",
    "currency": "string",
    "amount_inclusive_tax": number,
    "amount_exclusive_tax": number,
    "key_facts": {
        "account_id": "string",
        "customer_number": "string",
        "period": "string"
    },
    "line_items": [
        {
            "description": "string",
            "quantity": number,
            "unit_price": number,
            "amount": number,
            "tax_note": "string"
        }
    ]
}"#;

/// Build the full prompt for a variant.
pub fn build_extraction_prompt(variant: PromptVariant) -> String {
    let preamble = match variant {
        PromptVariant::Production => {
            "You are a high-accuracy OCR and information-extraction assistant. \
             Extract the billing fields from the attached invoice document. \
             Prefer printed totals over computed ones; transcribe dates exactly \
             as printed, normalized to YYYY-MM-DD."
        }
        PromptVariant::Diagnostic => {
            "You are an OCR evaluation assistant. Extract the billing fields \
             from the attached invoice document. Extract every line item you \
             can read, even partially; do not omit low-confidence values — \
             this run measures extraction quality."
        }
        PromptVariant::Compact => {
            "Extract the billing fields from the attached invoice document. \
             Be concise: top-level totals and dates first, line items only \
             when clearly itemized."
        }
    };

    format!("{preamble}\n\n{FIELD_CONTRACT}")
}
