//! Export-preparation decision stage.
//!
//! Stages category/account data for the (out-of-scope) accounting export:
//! infers an expense category, maps it to an account code, and mints a
//! batch identifier. Runs only for approved records and never performs
//! the export call itself.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::enums::ExpenseCategory;
use crate::models::extraction::ExtractionResult;
use crate::models::record::{AccountMapping, ApprovalAnnotation, ExportAnnotation};

struct AccountEntry {
    category: ExpenseCategory,
    code: &'static str,
    name: &'static str,
    sub_account: &'static str,
}

/// Category → accounting-system account. 5201 (支払手数料) doubles as the
/// default for anything unclassified.
const ACCOUNT_TABLE: &[AccountEntry] = &[
    AccountEntry {
        category: ExpenseCategory::Consulting,
        code: "5201",
        name: "支払手数料",
        sub_account: "コンサルティング料",
    },
    AccountEntry {
        category: ExpenseCategory::SystemDevelopment,
        code: "5202",
        name: "外注費",
        sub_account: "システム開発費",
    },
    AccountEntry {
        category: ExpenseCategory::Advertising,
        code: "5203",
        name: "広告宣伝費",
        sub_account: "",
    },
    AccountEntry {
        category: ExpenseCategory::Communications,
        code: "5204",
        name: "通信費",
        sub_account: "",
    },
    AccountEntry {
        category: ExpenseCategory::Travel,
        code: "5205",
        name: "旅費交通費",
        sub_account: "出張費",
    },
    AccountEntry {
        category: ExpenseCategory::Supplies,
        code: "5206",
        name: "消耗品費",
        sub_account: "事務用品",
    },
    AccountEntry {
        category: ExpenseCategory::Rent,
        code: "5207",
        name: "地代家賃",
        sub_account: "",
    },
    AccountEntry {
        category: ExpenseCategory::General,
        code: "5201",
        name: "支払手数料",
        sub_account: "",
    },
];

struct CategoryKeywords {
    category: ExpenseCategory,
    keywords: &'static [&'static str],
}

/// Keyword sets scanned in order; first match wins.
const EXPENSE_KEYWORDS: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: ExpenseCategory::Consulting,
        keywords: &["コンサル", "consulting", "相談", "アドバイザー"],
    },
    CategoryKeywords {
        category: ExpenseCategory::SystemDevelopment,
        keywords: &["システム", "system", "開発", "development"],
    },
    CategoryKeywords {
        category: ExpenseCategory::Advertising,
        keywords: &["広告", "advertisement", "marketing", "宣伝"],
    },
    CategoryKeywords {
        category: ExpenseCategory::Communications,
        keywords: &["通信", "telecom", "internet", "phone"],
    },
    CategoryKeywords {
        category: ExpenseCategory::Travel,
        keywords: &["出張", "travel", "交通", "transport"],
    },
    CategoryKeywords {
        category: ExpenseCategory::Supplies,
        keywords: &["備品", "supplies", "消耗品", "stationery"],
    },
    CategoryKeywords {
        category: ExpenseCategory::Rent,
        keywords: &["家賃", "rent", "lease"],
    },
];

/// Infer the expense category by keyword scan over key facts + issuer.
pub fn detect_expense_category(result: &ExtractionResult) -> ExpenseCategory {
    let text = result.category_scan_text();
    for entry in EXPENSE_KEYWORDS {
        if entry.keywords.iter().any(|k| text.contains(k)) {
            return entry.category;
        }
    }
    ExpenseCategory::General
}

/// Map a category to its account, falling back to the general account.
pub fn map_expense_category(category: ExpenseCategory) -> AccountMapping {
    let entry = ACCOUNT_TABLE
        .iter()
        .find(|e| e.category == category)
        .unwrap_or(&ACCOUNT_TABLE[ACCOUNT_TABLE.len() - 1]);
    AccountMapping {
        code: entry.code.into(),
        name: entry.name.into(),
        sub_account: entry.sub_account.into(),
    }
}

/// Mint a unique export batch id: `export_batch_<yyyymmddHHMM>_<8 hex>`.
pub fn generate_batch_id(now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d%H%M");
    let unique = Uuid::new_v4().simple().to_string();
    format!("export_batch_{stamp}_{}", &unique[..8])
}

/// Stage export data for one record.
///
/// Unapproved records come back not-export-ready with a note; no batch id
/// is minted for them.
pub fn prepare_export(
    approval: &ApprovalAnnotation,
    result: &ExtractionResult,
) -> ExportAnnotation {
    let category = detect_expense_category(result);

    if !approval.status.is_approved() {
        return ExportAnnotation {
            export_ready: false,
            batch_id: None,
            category,
            account: None,
            note: Some(format!(
                "Not staged for export: approval status is {}",
                approval.status.as_str()
            )),
        };
    }

    let account = map_expense_category(category);
    let batch_id = generate_batch_id(Utc::now());

    tracing::info!(
        category = category.as_str(),
        account = %account.code,
        batch_id = %batch_id,
        "Export staged"
    );

    ExportAnnotation {
        export_ready: true,
        batch_id: Some(batch_id),
        category,
        account: Some(account),
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{ApprovalStatus, ApprovalTier};

    fn approved() -> ApprovalAnnotation {
        ApprovalAnnotation {
            status: ApprovalStatus::AutoApproved,
            required_tier: None,
            approver: None,
            reason: String::new(),
        }
    }

    fn pending() -> ApprovalAnnotation {
        ApprovalAnnotation {
            status: ApprovalStatus::Pending,
            required_tier: Some(ApprovalTier::Manager),
            approver: Some("manager@company.com".into()),
            reason: "amount threshold".into(),
        }
    }

    fn invoice_with_memo(memo: &str) -> ExtractionResult {
        let mut result = ExtractionResult {
            issuer: Some("株式会社アクミ".into()),
            ..Default::default()
        };
        result.key_facts.insert("memo".into(), serde_json::json!(memo));
        result
    }

    #[test]
    fn auto_approved_record_is_staged() {
        let annotation = prepare_export(&approved(), &invoice_with_memo("システム開発の請求"));
        assert!(annotation.export_ready);
        assert!(annotation.batch_id.is_some());
        assert_eq!(annotation.category, ExpenseCategory::SystemDevelopment);
        assert_eq!(annotation.account.as_ref().map(|a| a.code.as_str()), Some("5202"));
        assert!(annotation.note.is_none());
    }

    #[test]
    fn manually_approved_record_is_staged_too() {
        let manual = ApprovalAnnotation {
            status: ApprovalStatus::Approved,
            ..pending()
        };
        let annotation = prepare_export(&manual, &invoice_with_memo("家賃のお支払い"));
        assert!(annotation.export_ready);
        assert_eq!(annotation.category, ExpenseCategory::Rent);
    }

    #[test]
    fn pending_record_is_not_staged() {
        let annotation = prepare_export(&pending(), &invoice_with_memo("travel booking"));
        assert!(!annotation.export_ready);
        assert!(annotation.batch_id.is_none());
        assert!(annotation.account.is_none());
        assert!(annotation.note.as_deref().is_some_and(|n| n.contains("pending")));
    }

    #[test]
    fn rejected_record_is_not_staged() {
        let rejected = ApprovalAnnotation {
            status: ApprovalStatus::Rejected,
            ..pending()
        };
        let annotation = prepare_export(&rejected, &ExtractionResult::default());
        assert!(!annotation.export_ready);
    }

    #[test]
    fn category_detection_first_match_wins() {
        assert_eq!(
            detect_expense_category(&invoice_with_memo("コンサルティング契約")),
            ExpenseCategory::Consulting
        );
        assert_eq!(
            detect_expense_category(&invoice_with_memo("internet circuit fee")),
            ExpenseCategory::Communications
        );
        assert_eq!(
            detect_expense_category(&invoice_with_memo("消耗品の補充")),
            ExpenseCategory::Supplies
        );
        assert_eq!(
            detect_expense_category(&invoice_with_memo("monthly statement")),
            ExpenseCategory::General
        );
    }

    #[test]
    fn unknown_category_maps_to_general_account() {
        let account = map_expense_category(ExpenseCategory::General);
        assert_eq!(account.code, "5201");
        assert_eq!(account.name, "支払手数料");
        assert_eq!(account.sub_account, "");
    }

    #[test]
    fn every_category_has_an_account() {
        for category in [
            ExpenseCategory::Consulting,
            ExpenseCategory::SystemDevelopment,
            ExpenseCategory::Advertising,
            ExpenseCategory::Communications,
            ExpenseCategory::Travel,
            ExpenseCategory::Supplies,
            ExpenseCategory::Rent,
            ExpenseCategory::General,
        ] {
            let account = map_expense_category(category);
            assert!(!account.code.is_empty());
            assert!(!account.name.is_empty());
        }
    }

    #[test]
    fn batch_id_shape_and_uniqueness() {
        let now = Utc::now();
        let a = generate_batch_id(now);
        let b = generate_batch_id(now);
        assert!(a.starts_with("export_batch_"));
        assert_ne!(a, b);
        // export_batch_ + 12-digit stamp + _ + 8 hex
        let suffix = a.strip_prefix("export_batch_").unwrap();
        let (stamp, unique) = suffix.split_at(12);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(unique.len(), 9); // leading underscore + 8 hex
        assert!(unique[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
