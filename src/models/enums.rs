use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(StageStatus {
    Pending => "pending",
    Uploading => "uploading",
    Processing => "processing",
    Saving => "saving",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(ConversionStatus {
    NoConversionNeeded => "no_conversion_needed",
    Converted => "converted",
    SkippedNoAmount => "skipped_no_amount",
    ServiceUnavailable => "service_unavailable",
    Error => "error",
});

str_enum!(ApprovalStatus {
    AutoApproved => "auto_approved",
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(ApprovalTier {
    Manager => "manager",
    Director => "director",
    President => "president",
});

str_enum!(ExpenseCategory {
    Consulting => "consulting",
    SystemDevelopment => "system_development",
    Advertising => "advertising",
    Communications => "communications",
    Travel => "travel",
    Supplies => "supplies",
    Rent => "rent",
    General => "general",
});

str_enum!(PromptVariant {
    Production => "production",
    Diagnostic => "diagnostic",
    Compact => "compact",
});

impl ApprovalTier {
    /// Escalation priority. Higher rank always wins when multiple rules fire.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Manager => 1,
            Self::Director => 2,
            Self::President => 3,
        }
    }
}

impl ApprovalStatus {
    /// Auto-approved and manually approved are distinct terminal states with
    /// the same downstream effect (export staging accepts both).
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::AutoApproved | Self::Approved)
    }
}

/// Processing mode: selects the persistence targets and the prompt variant
/// for a run. A closed enum — mode never appears as a free-form string in
/// branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingMode {
    Upload,
    Test,
    Batch,
}

/// Static routing for a processing mode: which tables receive the record
/// and its line items, and which extraction prompt variant is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRoute {
    pub prompt: PromptVariant,
    pub invoice_table: &'static str,
    pub line_item_table: &'static str,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Test => "test",
            Self::Batch => "batch",
        }
    }

    /// The single mode→target lookup. Test runs land in test-scoped tables
    /// (including the line-item child table); everything else is production.
    pub fn route(&self) -> ModeRoute {
        match self {
            Self::Upload => ModeRoute {
                prompt: PromptVariant::Production,
                invoice_table: "invoices",
                line_item_table: "invoice_line_items",
            },
            Self::Test => ModeRoute {
                prompt: PromptVariant::Diagnostic,
                invoice_table: "ocr_test_results",
                line_item_table: "ocr_test_line_items",
            },
            Self::Batch => ModeRoute {
                prompt: PromptVariant::Compact,
                invoice_table: "invoices",
                line_item_table: "invoice_line_items",
            },
        }
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(Self::Upload),
            // "ocr_test" is the legacy tag for the same test-scoped mode.
            "test" | "ocr_test" => Ok(Self::Test),
            "batch" => Ok(Self::Batch),
            _ => Err(ModelError::InvalidEnum {
                field: "ProcessingMode".into(),
                value: s.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mode_roundtrip_and_alias() {
        assert_eq!(ProcessingMode::from_str("upload").unwrap(), ProcessingMode::Upload);
        assert_eq!(ProcessingMode::from_str("test").unwrap(), ProcessingMode::Test);
        assert_eq!(ProcessingMode::from_str("ocr_test").unwrap(), ProcessingMode::Test);
        assert_eq!(ProcessingMode::from_str("batch").unwrap(), ProcessingMode::Batch);
        assert!(ProcessingMode::from_str("streaming").is_err());
    }

    #[test]
    fn test_mode_routes_to_test_tables() {
        let route = ProcessingMode::Test.route();
        assert_eq!(route.invoice_table, "ocr_test_results");
        assert_eq!(route.line_item_table, "ocr_test_line_items");
        assert_eq!(route.prompt, PromptVariant::Diagnostic);
    }

    #[test]
    fn upload_and_batch_route_to_production_tables() {
        for mode in [ProcessingMode::Upload, ProcessingMode::Batch] {
            let route = mode.route();
            assert_eq!(route.invoice_table, "invoices");
            assert_eq!(route.line_item_table, "invoice_line_items");
        }
        assert_eq!(ProcessingMode::Upload.route().prompt, PromptVariant::Production);
        assert_eq!(ProcessingMode::Batch.route().prompt, PromptVariant::Compact);
    }

    #[test]
    fn tier_ranks_are_ascending() {
        assert!(ApprovalTier::Manager.rank() < ApprovalTier::Director.rank());
        assert!(ApprovalTier::Director.rank() < ApprovalTier::President.rank());
    }

    #[test]
    fn approved_statuses() {
        assert!(ApprovalStatus::AutoApproved.is_approved());
        assert!(ApprovalStatus::Approved.is_approved());
        assert!(!ApprovalStatus::Pending.is_approved());
        assert!(!ApprovalStatus::Rejected.is_approved());
    }

    #[test]
    fn conversion_status_strings() {
        assert_eq!(ConversionStatus::ServiceUnavailable.as_str(), "service_unavailable");
        assert_eq!(
            ConversionStatus::from_str("no_conversion_needed").unwrap(),
            ConversionStatus::NoConversionNeeded
        );
    }
}
