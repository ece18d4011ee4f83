//! Business rules and violations.
//!
//! Rules are authored externally and evaluated read-only. Cross-field rules
//! carry a free-form logic identifier that is resolved against the closed
//! `CrossFieldLogic` predicate set at evaluation time; identifiers that do
//! not resolve fail closed as error-severity violations.

use serde::{Deserialize, Serialize};

use super::enums::{CrossFieldLogic, RuleSeverity};
use super::field::FieldDefinition;

/// One configurable validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRule {
    pub name: String,
    pub description: Option<String>,
    pub kind: RuleKind,
    pub severity: RuleSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Regex applied to one field's extracted value. Absent or empty values
    /// are skipped; required-ness is enforced by the confidence floor.
    FieldPattern { field: String, pattern: String },
    /// Named predicate over the listed fields' values.
    CrossField { logic: String, fields: Vec<String> },
}

impl BusinessRule {
    pub fn field_pattern(name: &str, field: &str, pattern: &str, severity: RuleSeverity) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: RuleKind::FieldPattern {
                field: field.into(),
                pattern: pattern.into(),
            },
            severity,
        }
    }

    pub fn cross_field(
        name: &str,
        logic: CrossFieldLogic,
        fields: &[&str],
        severity: RuleSeverity,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind: RuleKind::CrossField {
                logic: logic.as_str().into(),
                fields: fields.iter().map(|f| (*f).into()).collect(),
            },
            severity,
        }
    }

    /// Derive a warning-severity pattern rule from a field definition's
    /// validation pattern, if it has one.
    pub fn from_field_definition(def: &FieldDefinition) -> Option<Self> {
        let pattern = def.validation_pattern.as_deref()?;
        Some(Self {
            name: format!("{}_format", def.name),
            description: Some(format!("{} must match its configured format", def.display_name)),
            kind: RuleKind::FieldPattern {
                field: def.name.clone(),
                pattern: pattern.into(),
            },
            severity: RuleSeverity::Warning,
        })
    }
}

/// One rule failure from an evaluation pass.
///
/// Ephemeral: attached to the document for reviewer visibility but not part
/// of the feedback ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_name: String,
    pub severity: RuleSeverity,
    pub message: String,
    pub fields_involved: Vec<String>,
}

impl RuleViolation {
    pub fn is_blocking(&self) -> bool {
        self.severity == RuleSeverity::Error
    }
}
