use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

str_enum!(FieldType {
    Text => "text",
    Date => "date",
    Email => "email",
    Phone => "phone",
    Number => "number",
});

str_enum!(FieldSource {
    Llm => "llm",
    Human => "human",
});

str_enum!(DocumentState {
    Pending => "pending",
    Processing => "processing",
    Failed => "failed",
    AutoApproved => "auto_approved",
    ReviewRequired => "review_required",
    UnderReview => "under_review",
    Completed => "completed",
});

str_enum!(ReviewPriority {
    Urgent => "urgent",
    High => "high",
    Normal => "normal",
});

str_enum!(RuleSeverity {
    Error => "error",
    Warning => "warning",
});

str_enum!(FeedbackType {
    Confirmation => "confirmation",
    Correction => "correction",
    Addition => "addition",
    Removal => "removal",
});

str_enum!(CrossFieldLogic {
    DenialWithoutAuthorization => "denial_without_authorization",
    PayerRequiresMemberId => "payer_requires_member_id",
    AgeServiceMismatch => "age_service_mismatch",
});

impl DocumentState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}

impl ReviewPriority {
    /// Queue rank: lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::High => 1,
            Self::Normal => 2,
        }
    }

    /// Review SLA window for this priority.
    pub fn due_within(&self) -> Duration {
        match self {
            Self::Urgent => Duration::hours(4),
            Self::High => Duration::hours(24),
            Self::Normal => Duration::days(3),
        }
    }
}
