//! Validation & normalization rule engine.
//!
//! Runs every rule group against an extraction result and accumulates
//! findings — no short-circuiting on first failure. Normalization is a
//! pure function: the input is never mutated; callers must treat the
//! returned `normalized` value as the source of truth from here on.

pub mod currency;
pub mod score;

use chrono::{Duration, Local, NaiveDate};

use crate::models::extraction::{ExtractionResult, FieldValue};
use crate::models::record::{IssueSummary, ValidationReport};

/// Issuer-name markers that suggest a foreign legal entity (substring
/// match, case-sensitive like the suffixes themselves).
const FOREIGN_ENTITY_MARKERS: &[&str] = &[
    "LLC", "Ltd", "Inc", "Corp", "GmbH", "Limited", "Ireland", "Singapore",
];

/// Consumption-tax plausibility window for domestic invoices, in percent.
const TAX_RATE_MIN: f64 = 5.0;
const TAX_RATE_MAX: f64 = 15.0;

/// Line totals may drift from the printed total by up to this fraction
/// before we flag the reconciliation.
const LINE_ITEM_TOLERANCE: f64 = 0.10;

/// Amounts above this are worth a second look (in invoice currency units).
const LARGE_AMOUNT_THRESHOLD: f64 = 10_000_000.0;

/// Issuer names longer than this are usually extraction noise.
const MAX_ISSUER_LEN: usize = 100;

#[derive(Clone, Copy)]
enum Category {
    RequiredFields,
    DataFormat,
    BusinessLogic,
}

/// Result of one validation pass: the normalized extraction plus the
/// report. The report is immutable after creation.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub normalized: ExtractionResult,
    pub report: ValidationReport,
}

/// Validate against today's date. See [`validate_at`].
pub fn validate(result: &ExtractionResult, strict_mode: bool) -> ValidationOutcome {
    validate_at(result, strict_mode, Local::now().date_naive())
}

/// Validate an extraction result against a fixed reference date.
///
/// `strict_mode` moves every warning into the error list (clearing the
/// warnings), which flips validity if any warnings existed. The
/// completeness score is computed independently of errors/warnings.
///
/// Idempotent: validating an already-normalized result reproduces the
/// identical report.
pub fn validate_at(
    result: &ExtractionResult,
    strict_mode: bool,
    today: NaiveDate,
) -> ValidationOutcome {
    let mut normalized = result.clone();
    let mut report = ValidationReport::default();

    check_required_fields(&normalized, &mut report);
    normalize_formats(&mut normalized, &mut report);
    check_amount_consistency(&normalized, &mut report);
    check_dates(&normalized, &mut report, today);
    check_foreign_currency(&normalized, &mut report);
    check_line_items(&normalized, &mut report);

    report.completeness_score = score::completeness_score(&normalized);

    if strict_mode && !report.warnings.is_empty() {
        let moved: Vec<String> = report.warnings.drain(..).collect();
        report.errors.extend(moved);
        report.is_valid = false;
    }

    if !report.errors.is_empty() {
        report.is_valid = false;
    }

    report.summary = IssueSummary {
        total_issues: report.errors.len() + report.warnings.len(),
        critical_issues: report.errors.len(),
        warnings: report.warnings.len(),
    };

    tracing::info!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        completeness = report.completeness_score,
        "Validation complete"
    );

    ValidationOutcome { normalized, report }
}

fn push_error(report: &mut ValidationReport, category: Category, message: String) {
    report.errors.push(message.clone());
    category_list(report, category).push(message);
}

fn push_warning(report: &mut ValidationReport, category: Category, message: String) {
    report.warnings.push(message.clone());
    category_list(report, category).push(message);
}

fn category_list(report: &mut ValidationReport, category: Category) -> &mut Vec<String> {
    match category {
        Category::RequiredFields => &mut report.categories.required_fields,
        Category::DataFormat => &mut report.categories.data_format,
        Category::BusinessLogic => &mut report.categories.business_logic,
    }
}

// -- Rule groups ------------------------------------------------------------

/// Issuer, tax-inclusive amount, and issue date must be present.
/// Absence is always an error, never a warning.
fn check_required_fields(result: &ExtractionResult, report: &mut ValidationReport) {
    if !text_present(&result.issuer) {
        push_error(
            report,
            Category::RequiredFields,
            "Required field missing: issuer".into(),
        );
    }
    if !result
        .amount_inclusive_tax
        .as_ref()
        .is_some_and(FieldValue::is_populated)
    {
        push_error(
            report,
            Category::RequiredFields,
            "Required field missing: tax-inclusive amount".into(),
        );
    }
    if !text_present(&result.issue_date) {
        push_error(
            report,
            Category::RequiredFields,
            "Required field missing: issue date".into(),
        );
    }
}

/// Currency canonicalization and numeric coercion. This is the only rule
/// group that writes into the normalized result.
fn normalize_formats(normalized: &mut ExtractionResult, report: &mut ValidationReport) {
    if let Some(raw) = normalized.currency.clone().filter(|c| !c.trim().is_empty()) {
        let canonical = currency::normalize_currency_code(&raw);
        if canonical != raw {
            tracing::info!(from = %raw, to = %canonical, "Currency code normalized");
            normalized.currency = Some(canonical.clone());
        }
        if !currency::is_supported(&canonical) {
            let message = if canonical == raw {
                format!("Unsupported currency code: {canonical}")
            } else {
                format!("Unsupported currency code: {canonical} (was: {raw})")
            };
            push_warning(report, Category::DataFormat, message);
        }
    }

    coerce_amount_field(
        &mut normalized.amount_inclusive_tax,
        "amount_inclusive_tax",
        report,
    );
    coerce_amount_field(
        &mut normalized.amount_exclusive_tax,
        "amount_exclusive_tax",
        report,
    );

    if let Some(issuer) = &normalized.issuer {
        let len = issuer.chars().count();
        if len > MAX_ISSUER_LEN {
            push_warning(
                report,
                Category::DataFormat,
                format!("Issuer name unusually long ({len} characters)"),
            );
        }
    }
}

/// Replace coercible text amounts with numbers; flag uncoercible ones.
fn coerce_amount_field(
    field: &mut Option<FieldValue>,
    field_name: &str,
    report: &mut ValidationReport,
) {
    if let Some(value) = field {
        match value.as_number() {
            Some(n) => {
                if matches!(value, FieldValue::Text(_)) {
                    *field = Some(FieldValue::Number(n));
                }
            }
            None => {
                push_error(
                    report,
                    Category::DataFormat,
                    format!(
                        "Amount field '{field_name}' has an invalid format: {}",
                        display_value(value)
                    ),
                );
            }
        }
    }
}

/// Tax-inclusive vs tax-exclusive consistency, with the foreign-currency
/// split: foreign vendors commonly charge no domestic consumption tax, so
/// inclusive == exclusive is the expected pattern there.
fn check_amount_consistency(result: &ExtractionResult, report: &mut ValidationReport) {
    let inclusive = result.inclusive_amount();
    let exclusive = result.exclusive_amount();
    let is_foreign = result.currency_or_domestic() != "JPY";

    if let Some(inc) = inclusive {
        if inc < 0.0 {
            push_warning(
                report,
                Category::BusinessLogic,
                format!("Tax-inclusive amount is negative: {inc:.0} (possible refund or adjustment)"),
            );
        }
        if inc > LARGE_AMOUNT_THRESHOLD {
            push_warning(
                report,
                Category::BusinessLogic,
                format!("Tax-inclusive amount is unusually large: {inc:.0}"),
            );
        }
    }

    let (Some(inc), Some(exc)) = (inclusive, exclusive) else {
        return;
    };
    if inc <= 0.0 || exc <= 0.0 {
        return;
    }

    if is_foreign {
        if inc < exc {
            push_warning(
                report,
                Category::BusinessLogic,
                format!(
                    "Foreign-currency invoice: tax-inclusive amount ({inc:.0}) is below tax-exclusive amount ({exc:.0})"
                ),
            );
        }
    } else if inc <= exc {
        push_warning(
            report,
            Category::BusinessLogic,
            format!("Tax-inclusive amount ({inc:.0}) is not greater than tax-exclusive amount ({exc:.0})"),
        );
    }

    let rate = (inc - exc) / exc * 100.0;
    if is_foreign {
        if rate.abs() < 0.1 {
            // inclusive == exclusive: expected for foreign vendors
        } else if rate < 0.0 {
            push_warning(
                report,
                Category::BusinessLogic,
                format!("Implied tax rate is negative on a foreign-currency invoice: {rate:.1}%"),
            );
        } else if rate > TAX_RATE_MAX {
            push_warning(
                report,
                Category::BusinessLogic,
                format!("Implied tax rate is unusually high for a foreign-currency invoice: {rate:.1}%"),
            );
        }
    } else if !(TAX_RATE_MIN..=TAX_RATE_MAX).contains(&rate) {
        push_warning(
            report,
            Category::BusinessLogic,
            format!("Implied tax rate outside the expected {TAX_RATE_MIN:.0}-{TAX_RATE_MAX:.0}% range: {rate:.1}%"),
        );
    }
}

/// Dates must parse; due before issue, far-future, and far-past issue
/// dates are warnings. Same-day issue/due is valid.
fn check_dates(result: &ExtractionResult, report: &mut ValidationReport, today: NaiveDate) {
    let issue = parse_date_field(&result.issue_date, "issue date", report);
    let due = parse_date_field(&result.due_date, "due date", report);

    if let (Some(issue), Some(due)) = (issue, due) {
        if due < issue {
            push_warning(
                report,
                Category::BusinessLogic,
                "Due date precedes the issue date".into(),
            );
        }
    }

    if let Some(issue) = issue {
        if issue > today + Duration::days(30) {
            push_warning(
                report,
                Category::BusinessLogic,
                "Issue date is more than 30 days in the future".into(),
            );
        }
        if issue < today - Duration::days(1095) {
            push_warning(
                report,
                Category::BusinessLogic,
                "Issue date is more than 3 years old".into(),
            );
        }
    }
}

fn parse_date_field(
    raw: &Option<String>,
    label: &str,
    report: &mut ValidationReport,
) -> Option<NaiveDate> {
    let raw = raw.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            push_warning(
                report,
                Category::DataFormat,
                format!("The {label} has an invalid format: {raw}"),
            );
            None
        }
    }
}

/// Cross-cutting foreign-currency flags: non-JPY invoices need a manual
/// exchange-rate review, and issuers that look like foreign entities need
/// their consumption-tax treatment confirmed.
fn check_foreign_currency(result: &ExtractionResult, report: &mut ValidationReport) {
    let Some(code) = result.currency.as_deref().filter(|c| !c.trim().is_empty()) else {
        return;
    };
    if code == "JPY" {
        return;
    }

    push_warning(
        report,
        Category::BusinessLogic,
        format!("Foreign-currency invoice ({code}): exchange rate needs manual review"),
    );

    if let Some(issuer) = &result.issuer {
        if FOREIGN_ENTITY_MARKERS.iter().any(|m| issuer.contains(m)) {
            push_warning(
                report,
                Category::BusinessLogic,
                "Issuer appears to be a foreign entity: confirm consumption-tax treatment".into(),
            );
        }
    }
}

/// Reconcile the line-item sum against the tax-exclusive total. Items
/// whose amount fails numeric coercion are skipped (with a format
/// warning) rather than aborting the sum.
fn check_line_items(result: &ExtractionResult, report: &mut ValidationReport) {
    if result.line_items.is_empty() {
        return;
    }

    let mut line_total = 0.0;
    for (i, item) in result.line_items.iter().enumerate() {
        if let Some(amount) = &item.amount {
            match amount.as_number() {
                Some(n) => line_total += n,
                None => push_warning(
                    report,
                    Category::DataFormat,
                    format!(
                        "Line item {} amount has an invalid format: {}",
                        i + 1,
                        display_value(amount)
                    ),
                ),
            }
        }
    }

    let Some(total) = result.exclusive_amount() else {
        return;
    };
    if total <= 0.0 || line_total <= 0.0 {
        return;
    }

    let discrepancy = (line_total - total).abs() / total;
    if discrepancy > LINE_ITEM_TOLERANCE {
        push_warning(
            report,
            Category::BusinessLogic,
            format!(
                "Line-item total ({line_total:.0}) differs from the tax-exclusive amount ({total:.0}) by {:.1}%",
                discrepancy * 100.0
            ),
        );
    }
}

// -- Helpers ----------------------------------------------------------------

fn text_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Text(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extraction::LineItem;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date")
    }

    fn domestic_invoice() -> ExtractionResult {
        ExtractionResult {
            issuer: Some("株式会社アクミ".into()),
            payer: Some("友の会株式会社".into()),
            invoice_number: Some("INV-2025-042".into()),
            currency: Some("JPY".into()),
            amount_inclusive_tax: Some(FieldValue::Number(110_000.0)),
            amount_exclusive_tax: Some(FieldValue::Number(100_000.0)),
            issue_date: Some("2025-06-01".into()),
            due_date: Some("2025-06-30".into()),
            ..Default::default()
        }
    }

    fn run(result: &ExtractionResult) -> ValidationOutcome {
        validate_at(result, false, fixed_today())
    }

    // ── Required fields ─────────────────────────────────────────────

    #[test]
    fn clean_domestic_invoice_is_valid() {
        let outcome = run(&domestic_invoice());
        assert!(outcome.report.is_valid);
        assert!(outcome.report.errors.is_empty());
        assert!(outcome.report.warnings.is_empty());
    }

    #[test]
    fn missing_required_fields_are_errors() {
        let outcome = run(&ExtractionResult::default());
        assert!(!outcome.report.is_valid);
        assert_eq!(outcome.report.errors.len(), 3);
        assert_eq!(outcome.report.categories.required_fields.len(), 3);
        // absence is never a warning
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("Required field")));
    }

    #[test]
    fn blank_issuer_counts_as_missing() {
        let invoice = ExtractionResult {
            issuer: Some("   ".into()),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .errors
            .iter()
            .any(|e| e.contains("issuer")));
    }

    // ── Currency normalization ──────────────────────────────────────

    #[test]
    fn currency_symbol_normalized_in_returned_copy() {
        let invoice = ExtractionResult {
            currency: Some("¥".into()),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert_eq!(outcome.normalized.currency.as_deref(), Some("JPY"));
        // input untouched
        assert_eq!(invoice.currency.as_deref(), Some("¥"));
        assert!(outcome.report.warnings.is_empty());
    }

    #[test]
    fn unsupported_currency_is_warning_not_error() {
        let invoice = ExtractionResult {
            currency: Some("sgd".into()),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert_eq!(outcome.normalized.currency.as_deref(), Some("SGD"));
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("Unsupported currency code: SGD")));
        assert!(outcome
            .report
            .errors
            .iter()
            .all(|e| !e.contains("currency")));
    }

    #[test]
    fn text_amount_coerced_to_number() {
        let invoice = ExtractionResult {
            amount_inclusive_tax: Some(FieldValue::Text("¥110,000".into())),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert_eq!(
            outcome.normalized.amount_inclusive_tax,
            Some(FieldValue::Number(110_000.0))
        );
        assert!(outcome.report.errors.is_empty());
    }

    #[test]
    fn uncoercible_amount_is_error() {
        let invoice = ExtractionResult {
            amount_inclusive_tax: Some(FieldValue::Text("eleven man yen".into())),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(!outcome.report.is_valid);
        assert!(outcome
            .report
            .errors
            .iter()
            .any(|e| e.contains("amount_inclusive_tax")));
        assert!(outcome
            .report
            .categories
            .data_format
            .iter()
            .any(|e| e.contains("invalid format")));
    }

    // ── Amount consistency ──────────────────────────────────────────

    #[test]
    fn domestic_ten_percent_tax_passes() {
        // 110,000 inclusive / 100,000 exclusive → 10%, inside 5–15%
        let outcome = run(&domestic_invoice());
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("tax rate")));
    }

    #[test]
    fn domestic_zero_tax_rate_warns() {
        let invoice = ExtractionResult {
            amount_inclusive_tax: Some(FieldValue::Number(100_000.0)),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("not greater than")));
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("5-15%")));
    }

    #[test]
    fn foreign_equal_amounts_expected() {
        let invoice = ExtractionResult {
            currency: Some("USD".into()),
            amount_inclusive_tax: Some(FieldValue::Number(500.0)),
            amount_exclusive_tax: Some(FieldValue::Number(500.0)),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        // the only expected warning is the cross-cutting FX review flag
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("tax rate") && !w.contains("below tax-exclusive")));
    }

    #[test]
    fn foreign_inclusive_below_exclusive_warns() {
        let invoice = ExtractionResult {
            currency: Some("USD".into()),
            amount_inclusive_tax: Some(FieldValue::Number(450.0)),
            amount_exclusive_tax: Some(FieldValue::Number(500.0)),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("below tax-exclusive")));
    }

    #[test]
    fn negative_amount_warns() {
        let invoice = ExtractionResult {
            amount_inclusive_tax: Some(FieldValue::Number(-5000.0)),
            amount_exclusive_tax: None,
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("negative")));
    }

    #[test]
    fn very_large_amount_warns() {
        let invoice = ExtractionResult {
            amount_inclusive_tax: Some(FieldValue::Number(22_000_000.0)),
            amount_exclusive_tax: Some(FieldValue::Number(20_000_000.0)),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("unusually large")));
    }

    // ── Dates ───────────────────────────────────────────────────────

    #[test]
    fn unparseable_dates_warn() {
        let invoice = ExtractionResult {
            issue_date: Some("June 1st".into()),
            due_date: Some("end of month".into()),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert_eq!(
            outcome
                .report
                .warnings
                .iter()
                .filter(|w| w.contains("invalid format"))
                .count(),
            2
        );
    }

    #[test]
    fn due_before_issue_warns_same_day_allowed() {
        let before = ExtractionResult {
            issue_date: Some("2025-06-10".into()),
            due_date: Some("2025-06-01".into()),
            ..domestic_invoice()
        };
        let outcome = run(&before);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("precedes")));

        let same_day = ExtractionResult {
            issue_date: Some("2025-06-10".into()),
            due_date: Some("2025-06-10".into()),
            ..domestic_invoice()
        };
        let outcome = run(&same_day);
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("precedes")));
    }

    #[test]
    fn issue_date_windows() {
        let future = ExtractionResult {
            issue_date: Some("2025-09-01".into()),
            due_date: None,
            ..domestic_invoice()
        };
        let outcome = run(&future);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("future")));

        let ancient = ExtractionResult {
            issue_date: Some("2020-01-01".into()),
            due_date: None,
            ..domestic_invoice()
        };
        let outcome = run(&ancient);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("3 years")));
    }

    // ── Foreign-currency flags ──────────────────────────────────────

    #[test]
    fn foreign_currency_flags_review_and_entity() {
        let invoice = ExtractionResult {
            issuer: Some("Cloudstack Pte Singapore".into()),
            currency: Some("USD".into()),
            amount_inclusive_tax: Some(FieldValue::Number(500.0)),
            amount_exclusive_tax: Some(FieldValue::Number(500.0)),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("exchange rate needs manual review")));
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("consumption-tax treatment")));
    }

    #[test]
    fn domestic_issuer_not_flagged_as_foreign_entity() {
        let outcome = run(&domestic_invoice());
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("foreign entity")));
    }

    // ── Line items ──────────────────────────────────────────────────

    #[test]
    fn line_item_reconciliation_within_tolerance() {
        let invoice = ExtractionResult {
            line_items: vec![
                LineItem {
                    amount: Some(FieldValue::Number(60_000.0)),
                    ..Default::default()
                },
                LineItem {
                    amount: Some(FieldValue::Number(45_000.0)),
                    ..Default::default()
                },
            ],
            ..domestic_invoice()
        };
        // 105,000 vs 100,000 exclusive → 5% discrepancy, under the 10% bar
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("differs from")));
    }

    #[test]
    fn line_item_discrepancy_warns() {
        let invoice = ExtractionResult {
            line_items: vec![LineItem {
                amount: Some(FieldValue::Number(50_000.0)),
                ..Default::default()
            }],
            ..domestic_invoice()
        };
        // 50,000 vs 100,000 → 50% discrepancy
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("differs from")));
    }

    #[test]
    fn bad_line_amount_skipped_with_warning() {
        let invoice = ExtractionResult {
            line_items: vec![
                LineItem {
                    amount: Some(FieldValue::Text("call us".into())),
                    ..Default::default()
                },
                LineItem {
                    amount: Some(FieldValue::Number(100_000.0)),
                    ..Default::default()
                },
            ],
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert!(outcome
            .report
            .warnings
            .iter()
            .any(|w| w.contains("Line item 1")));
        // sum excludes the bad item, so reconciliation still passes
        assert!(outcome
            .report
            .warnings
            .iter()
            .all(|w| !w.contains("differs from")));
    }

    // ── Strict mode ─────────────────────────────────────────────────

    #[test]
    fn strict_mode_promotes_all_warnings() {
        let invoice = ExtractionResult {
            currency: Some("sgd".into()),
            issue_date: Some("June 1st".into()),
            ..domestic_invoice()
        };
        let relaxed = validate_at(&invoice, false, fixed_today());
        assert!(relaxed.report.is_valid);
        let warning_count = relaxed.report.warnings.len();
        assert!(warning_count > 0);

        let strict = validate_at(&invoice, true, fixed_today());
        assert!(!strict.report.is_valid);
        assert!(strict.report.warnings.is_empty());
        for warning in &relaxed.report.warnings {
            assert!(strict.report.errors.contains(warning));
        }
        assert_eq!(strict.report.errors.len(), warning_count);
    }

    #[test]
    fn strict_mode_on_clean_invoice_stays_valid() {
        let outcome = validate_at(&domestic_invoice(), true, fixed_today());
        assert!(outcome.report.is_valid);
        assert!(outcome.report.warnings.is_empty());
    }

    // ── Idempotence ─────────────────────────────────────────────────

    #[test]
    fn validation_is_idempotent_after_normalization() {
        let invoice = ExtractionResult {
            currency: Some("¥".into()),
            amount_inclusive_tax: Some(FieldValue::Text("110,000".into())),
            ..domestic_invoice()
        };
        let first = run(&invoice);
        let second = run(&first.normalized);
        assert_eq!(first.normalized, second.normalized);
        assert_eq!(second.report, run(&second.normalized).report);
    }

    // ── Completeness score on the report ────────────────────────────

    #[test]
    fn report_carries_completeness_score() {
        let outcome = run(&domestic_invoice());
        assert!(outcome.report.completeness_score > 0.0);
        assert!(outcome.report.completeness_score <= 100.0);

        let empty = run(&ExtractionResult::default());
        assert_eq!(empty.report.completeness_score, 0.0);
    }

    #[test]
    fn summary_counts_match_lists() {
        let invoice = ExtractionResult {
            issuer: None,
            currency: Some("sgd".into()),
            ..domestic_invoice()
        };
        let outcome = run(&invoice);
        assert_eq!(outcome.report.summary.critical_issues, outcome.report.errors.len());
        assert_eq!(outcome.report.summary.warnings, outcome.report.warnings.len());
        assert_eq!(
            outcome.report.summary.total_issues,
            outcome.report.errors.len() + outcome.report.warnings.len()
        );
    }
}
