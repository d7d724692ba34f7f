//! Approval-evaluation decision stage.
//!
//! Three independent rule groups — amount thresholds, vendor blacklist,
//! and category rules — each may demand an approval tier. The highest
//! tier across every triggered rule wins; nothing triggered means the
//! record auto-approves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::{ApprovalStatus, ApprovalTier};
use crate::models::extraction::ExtractionResult;
use crate::models::record::ApprovalAnnotation;

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("No approver configured for tier {0:?}")]
    NoApproverConfigured(ApprovalTier),
}

/// Monetary thresholds per tier (in JPY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountThresholds {
    pub manager: f64,
    pub director: f64,
    pub president: f64,
}

impl Default for AmountThresholds {
    fn default() -> Self {
        Self {
            manager: 300_000.0,
            director: 1_000_000.0,
            president: 5_000_000.0,
        }
    }
}

/// A category rule either demands a flat tier or applies a monetary
/// threshold of its own (threshold breaches route to manager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CategoryRule {
    RequiredTier(ApprovalTier),
    AmountThreshold(f64),
}

/// Invoice categories the approval rules care about, detected by keyword
/// scan over the key facts and issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalCategory {
    Consulting,
    Equipment,
    Travel,
    General,
}

struct CategoryKeywords {
    category: ApprovalCategory,
    keywords: &'static [&'static str],
}

const CATEGORY_KEYWORDS: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: ApprovalCategory::Consulting,
        keywords: &["コンサル", "consulting"],
    },
    CategoryKeywords {
        category: ApprovalCategory::Equipment,
        keywords: &["設備", "equipment"],
    },
    CategoryKeywords {
        category: ApprovalCategory::Travel,
        keywords: &["出張", "travel"],
    },
];

/// One approver row in the static tier table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approver {
    pub name: String,
    pub email: String,
    pub notification_channels: Vec<String>,
}

/// Full rule configuration. Defaults mirror production policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRules {
    pub thresholds: AmountThresholds,
    pub blacklisted_vendors: Vec<String>,
    pub category_rules: Vec<(ApprovalCategory, CategoryRule)>,
    pub approvers: Vec<(ApprovalTier, Approver)>,
}

impl Default for ApprovalRules {
    fn default() -> Self {
        Self {
            thresholds: AmountThresholds::default(),
            blacklisted_vendors: Vec::new(),
            category_rules: vec![
                (
                    ApprovalCategory::Consulting,
                    CategoryRule::RequiredTier(ApprovalTier::Manager),
                ),
                (
                    ApprovalCategory::Equipment,
                    CategoryRule::RequiredTier(ApprovalTier::Director),
                ),
                (
                    ApprovalCategory::Travel,
                    CategoryRule::AmountThreshold(50_000.0),
                ),
            ],
            approvers: vec![
                (
                    ApprovalTier::Manager,
                    Approver {
                        name: "部長".into(),
                        email: "manager@company.com".into(),
                        notification_channels: vec!["email".into(), "slack".into()],
                    },
                ),
                (
                    ApprovalTier::Director,
                    Approver {
                        name: "取締役".into(),
                        email: "director@company.com".into(),
                        notification_channels: vec!["email".into(), "slack".into(), "teams".into()],
                    },
                ),
                (
                    ApprovalTier::President,
                    Approver {
                        name: "社長".into(),
                        email: "president@company.com".into(),
                        notification_channels: vec!["email".into(), "teams".into()],
                    },
                ),
            ],
        }
    }
}

impl ApprovalRules {
    pub fn approver_for(&self, tier: ApprovalTier) -> Option<&Approver> {
        self.approvers
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, a)| a)
    }
}

struct RuleHit {
    tier: ApprovalTier,
    reason: String,
}

/// Evaluate the approval requirement for one validated extraction.
pub fn evaluate(
    result: &ExtractionResult,
    rules: &ApprovalRules,
) -> Result<ApprovalAnnotation, ApprovalError> {
    let amount = result.inclusive_amount().unwrap_or(0.0);
    let issuer = result.issuer.as_deref().unwrap_or("");

    let hits = check_rules(amount, issuer, result, rules);

    let Some(highest) = hits.iter().map(|h| h.tier).max_by_key(ApprovalTier::rank) else {
        tracing::info!(amount, "Invoice auto-approved — no rule triggered");
        return Ok(ApprovalAnnotation {
            status: ApprovalStatus::AutoApproved,
            required_tier: None,
            approver: None,
            reason: String::new(),
        });
    };

    let approver = rules
        .approver_for(highest)
        .ok_or(ApprovalError::NoApproverConfigured(highest))?;

    let reason = hits
        .iter()
        .map(|h| h.reason.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    tracing::info!(
        tier = highest.as_str(),
        approver = %approver.email,
        %reason,
        "Invoice requires approval"
    );

    Ok(ApprovalAnnotation {
        status: ApprovalStatus::Pending,
        required_tier: Some(highest),
        approver: Some(approver.email.clone()),
        reason,
    })
}

fn check_rules(
    amount: f64,
    issuer: &str,
    result: &ExtractionResult,
    rules: &ApprovalRules,
) -> Vec<RuleHit> {
    let mut hits = Vec::new();

    // Amount thresholds: every tier whose threshold the amount meets.
    for (tier, threshold) in [
        (ApprovalTier::Manager, rules.thresholds.manager),
        (ApprovalTier::Director, rules.thresholds.director),
        (ApprovalTier::President, rules.thresholds.president),
    ] {
        if amount >= threshold {
            hits.push(RuleHit {
                tier,
                reason: format!("amount of {amount:.0} meets the {threshold:.0} threshold"),
            });
        }
    }

    // Vendor blacklist.
    if rules.blacklisted_vendors.iter().any(|v| v == issuer) {
        hits.push(RuleHit {
            tier: ApprovalTier::Director,
            reason: "blacklisted vendor".into(),
        });
    }

    // Category rules.
    let category = detect_category(result);
    for (rule_category, rule) in &rules.category_rules {
        if *rule_category != category {
            continue;
        }
        match rule {
            CategoryRule::RequiredTier(tier) => hits.push(RuleHit {
                tier: *tier,
                reason: format!("{rule_category:?} category"),
            }),
            CategoryRule::AmountThreshold(threshold) => {
                if amount >= *threshold {
                    hits.push(RuleHit {
                        tier: ApprovalTier::Manager,
                        reason: format!(
                            "{rule_category:?} category at or above {threshold:.0}"
                        ),
                    });
                }
            }
        }
    }

    hits
}

/// Keyword scan over key facts + issuer; first matching category wins.
pub fn detect_category(result: &ExtractionResult) -> ApprovalCategory {
    let text = result.category_scan_text();
    for entry in CATEGORY_KEYWORDS {
        if entry.keywords.iter().any(|k| text.contains(k)) {
            return entry.category;
        }
    }
    ApprovalCategory::General
}
