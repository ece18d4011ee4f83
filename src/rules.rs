//! Business Rules Engine.
//!
//! Evaluates the active rule set against one document's extracted fields.
//! Rules are evaluated independently and exhaustively — a failing rule
//! never short-circuits the rest, because reviewers need the complete
//! violation list. Misconfiguration (unknown cross-field logic, an
//! unparseable pattern) fails closed as an error-severity violation so a
//! broken rule can never widen the auto-approval gate.

use std::collections::BTreeMap;
use std::str::FromStr;

use regex::Regex;

use crate::models::{
    BusinessRule, CrossFieldLogic, ExtractedValue, RuleKind, RuleSeverity, RuleViolation,
};

/// Evaluate every rule against the extracted field map.
pub fn evaluate(
    fields: &BTreeMap<String, ExtractedValue>,
    rules: &[BusinessRule],
) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for rule in rules {
        match &rule.kind {
            RuleKind::FieldPattern { field, pattern } => {
                if let Some(violation) = evaluate_field_pattern(fields, rule, field, pattern) {
                    violations.push(violation);
                }
            }
            RuleKind::CrossField { logic, fields: involved } => {
                if let Some(violation) = evaluate_cross_field(fields, rule, logic, involved) {
                    violations.push(violation);
                }
            }
        }
    }

    if !violations.is_empty() {
        tracing::info!(
            violation_count = violations.len(),
            blocking = violations.iter().filter(|v| v.is_blocking()).count(),
            "Business rule violations detected"
        );
    }

    violations
}

// ---------------------------------------------------------------------------
// Field-pattern rules
// ---------------------------------------------------------------------------

/// Check one field's value against the rule's pattern.
///
/// Absent or empty values are skipped: required-ness is the confidence
/// floor's job, not the pattern's. Full-match semantics.
fn evaluate_field_pattern(
    fields: &BTreeMap<String, ExtractedValue>,
    rule: &BusinessRule,
    field: &str,
    pattern: &str,
) -> Option<RuleViolation> {
    let value = fields.get(field).map(|v| v.value.trim()).unwrap_or("");
    if value.is_empty() {
        return None;
    }

    let regex = match Regex::new(&format!(r"\A(?:{pattern})\z")) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!(rule = %rule.name, field, "Unparseable rule pattern: {e}");
            return Some(RuleViolation {
                rule_name: rule.name.clone(),
                severity: RuleSeverity::Error,
                message: format!("Rule '{}' has an unparseable pattern for field '{field}'", rule.name),
                fields_involved: vec![field.into()],
            });
        }
    };

    if regex.is_match(value) {
        return None;
    }

    Some(RuleViolation {
        rule_name: rule.name.clone(),
        severity: rule.severity.clone(),
        message: format!("Field '{field}' does not match required pattern"),
        fields_involved: vec![field.into()],
    })
}

// ---------------------------------------------------------------------------
// Cross-field rules
// ---------------------------------------------------------------------------

/// Resolve the rule's logic identifier and run the predicate.
///
/// Identifiers outside the closed predicate set fail closed: the rule is
/// reported as a blocking violation, never silently skipped.
fn evaluate_cross_field(
    fields: &BTreeMap<String, ExtractedValue>,
    rule: &BusinessRule,
    logic: &str,
    involved: &[String],
) -> Option<RuleViolation> {
    let predicate = match CrossFieldLogic::from_str(logic) {
        Ok(predicate) => predicate,
        Err(_) => {
            tracing::warn!(rule = %rule.name, logic, "Unknown cross-field logic identifier");
            return Some(RuleViolation {
                rule_name: rule.name.clone(),
                severity: RuleSeverity::Error,
                message: format!("Rule '{}' references unknown cross-field logic '{logic}'", rule.name),
                fields_involved: involved.to_vec(),
            });
        }
    };

    let message = match predicate {
        CrossFieldLogic::DenialWithoutAuthorization => {
            if has_value(fields, "denial_reason") && has_value(fields, "authorization_number") {
                Some("Denied documents should not have authorization numbers".to_string())
            } else {
                None
            }
        }
        CrossFieldLogic::PayerRequiresMemberId => {
            if has_value(fields, "payer") && !has_value(fields, "member_id") {
                Some("Payer specified but member ID is missing".to_string())
            } else {
                None
            }
        }
        CrossFieldLogic::AgeServiceMismatch => {
            let service = fields
                .get("service")
                .map(|v| v.value.to_lowercase())
                .unwrap_or_default();
            let pediatric = service.contains("pediatric") || service.contains("child");
            if pediatric && has_value(fields, "date_of_birth") {
                Some("Potential age/service mismatch detected".to_string())
            } else {
                None
            }
        }
    };

    message.map(|message| RuleViolation {
        rule_name: rule.name.clone(),
        severity: rule.severity.clone(),
        message,
        fields_involved: predicate_fields(&predicate),
    })
}

fn has_value(fields: &BTreeMap<String, ExtractedValue>, name: &str) -> bool {
    fields.get(name).is_some_and(|v| !v.is_empty())
}

/// Input-field list for each predicate, for violation reporting.
fn predicate_fields(predicate: &CrossFieldLogic) -> Vec<String> {
    match predicate {
        CrossFieldLogic::DenialWithoutAuthorization => {
            vec!["denial_reason".into(), "authorization_number".into()]
        }
        CrossFieldLogic::PayerRequiresMemberId => vec!["payer".into(), "member_id".into()],
        CrossFieldLogic::AgeServiceMismatch => {
            vec!["date_of_birth".into(), "service".into()]
        }
    }
}
