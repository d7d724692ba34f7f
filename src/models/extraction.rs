use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A raw invoice document handed to the pipeline by the caller.
///
/// Immutable; discarded once extraction completes. The pipeline never
/// retains the bytes past the extraction stage.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub filename: String,
    pub size: u64,
}

impl Document {
    pub fn new(content: Vec<u8>, filename: impl Into<String>) -> Self {
        let size = content.len() as u64;
        Self {
            content,
            filename: filename.into(),
            size,
        }
    }
}

/// A field the extraction service may return as either a number or a string
/// ("1234.5" vs 1234.5, sometimes with currency symbols or separators).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Coerce to a number. Text values are cleaned of currency symbols,
    /// thousands separators, and whitespace before parsing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_amount_text(s),
        }
    }

    /// A populated value for completeness purposes: non-empty text or a
    /// non-zero number (zero is an absent-value sentinel from extraction).
    pub fn is_populated(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.trim().is_empty(),
        }
    }
}

fn parse_amount_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | '$' | '€' | '£' | ' '))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// One line of an invoice's itemization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub amount: Option<FieldValue>,
    /// Raw tax note as printed on the invoice ("10%", "non-taxable", ...).
    #[serde(alias = "tax")]
    pub tax_note: Option<String>,
}

/// Structured fields parsed from one invoice document by the AI collaborator.
///
/// Post-validation, the *returned normalized copy* is the source of truth:
/// currency codes are canonicalized and text amounts coerced to numbers
/// there, never in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionResult {
    pub issuer: Option<String>,
    pub payer: Option<String>,
    #[serde(alias = "main_invoice_number")]
    pub invoice_number: Option<String>,
    /// Qualified-invoice registration number ("T" number).
    #[serde(alias = "t_number")]
    pub registration_number: Option<String>,
    pub currency: Option<String>,
    pub amount_inclusive_tax: Option<FieldValue>,
    pub amount_exclusive_tax: Option<FieldValue>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    /// Free-form key facts: account ids, customer numbers, billing period.
    #[serde(alias = "key_info")]
    pub key_facts: BTreeMap<String, serde_json::Value>,
    pub line_items: Vec<LineItem>,
}

impl ExtractionResult {
    /// Tax-inclusive amount coerced to a number, if possible.
    pub fn inclusive_amount(&self) -> Option<f64> {
        self.amount_inclusive_tax.as_ref().and_then(FieldValue::as_number)
    }

    /// Tax-exclusive amount coerced to a number, if possible.
    pub fn exclusive_amount(&self) -> Option<f64> {
        self.amount_exclusive_tax.as_ref().and_then(FieldValue::as_number)
    }

    /// Currency code, defaulting to domestic (JPY) when absent.
    pub fn currency_or_domestic(&self) -> String {
        self.currency
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("JPY")
            .to_uppercase()
    }

    /// Flattened lowercase text of key facts + issuer, used by the
    /// keyword-based category detectors.
    pub fn category_scan_text(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.key_facts {
            text.push_str(key);
            text.push(' ');
            match value {
                serde_json::Value::String(s) => text.push_str(s),
                other => text.push_str(&other.to_string()),
            }
            text.push(' ');
        }
        if let Some(issuer) = &self.issuer {
            text.push_str(issuer);
        }
        text.to_lowercase()
    }
}
