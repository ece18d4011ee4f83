//! Document records and lifecycle legality.
//!
//! A document is created when OCR output arrives and is mutated only by the
//! routing engine and by review completion. Deletion is a collaborator
//! concern; this core never removes a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentState, FieldSource, ReviewPriority};
use super::field::ExtractedField;
use super::rule::RuleViolation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub state: DocumentState,
    /// Assigned once, at the transition into review_required.
    pub priority: Option<ReviewPriority>,
    pub overall_confidence: Option<f32>,
    /// Model version string of the current extraction.
    pub model_version: Option<String>,
    /// All field records: llm records plus human supersessions.
    pub fields: Vec<ExtractedField>,
    /// Violations attached by the last rule evaluation.
    pub violations: Vec<RuleViolation>,
    /// Error classification when a pass or the pipeline failed.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub routed_at: Option<DateTime<Utc>>,
    pub review_due: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: DocumentState::Pending,
            priority: None,
            overall_confidence: None,
            model_version: None,
            fields: Vec::new(),
            violations: Vec::new(),
            failure_reason: None,
            created_at: Utc::now(),
            routed_at: None,
            review_due: None,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    /// Lifecycle legality table. Terminal states accept nothing.
    pub fn can_transition(&self, to: &DocumentState) -> bool {
        use DocumentState::*;
        matches!(
            (&self.state, to),
            (Pending, Processing)
                | (Processing, Failed)
                | (Processing, AutoApproved)
                | (Processing, ReviewRequired)
                | (ReviewRequired, UnderReview)
                | (UnderReview, Completed)
                | (AutoApproved, Completed)
        )
    }

    /// Latest non-superseded record for a field, if any.
    pub fn current_field(&self, field_name: &str) -> Option<&ExtractedField> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.field_name == field_name && !f.superseded)
    }

    /// Non-superseded machine records from the current extraction.
    pub fn machine_fields(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields
            .iter()
            .filter(|f| f.source == FieldSource::Llm && !f.superseded)
    }

    /// Error-severity violations from the last evaluation.
    pub fn blocking_violations(&self) -> impl Iterator<Item = &RuleViolation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::RuleSeverity;
    use crate::models::field::ExtractedValue;

    fn make_document() -> Document {
        Document::new(Uuid::new_v4())
    }

    #[test]
    fn new_document_starts_pending() {
        let doc = make_document();
        assert_eq!(doc.state, DocumentState::Pending);
        assert!(doc.priority.is_none());
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn legal_transitions_allowed() {
        let mut doc = make_document();
        assert!(doc.can_transition(&DocumentState::Processing));

        doc.state = DocumentState::Processing;
        assert!(doc.can_transition(&DocumentState::Failed));
        assert!(doc.can_transition(&DocumentState::AutoApproved));
        assert!(doc.can_transition(&DocumentState::ReviewRequired));

        doc.state = DocumentState::ReviewRequired;
        assert!(doc.can_transition(&DocumentState::UnderReview));

        doc.state = DocumentState::UnderReview;
        assert!(doc.can_transition(&DocumentState::Completed));

        doc.state = DocumentState::AutoApproved;
        assert!(doc.can_transition(&DocumentState::Completed));
    }

    #[test]
    fn illegal_transitions_rejected() {
        let mut doc = make_document();
        assert!(!doc.can_transition(&DocumentState::Completed));
        assert!(!doc.can_transition(&DocumentState::UnderReview));

        doc.state = DocumentState::ReviewRequired;
        assert!(!doc.can_transition(&DocumentState::Completed));
        assert!(!doc.can_transition(&DocumentState::AutoApproved));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [DocumentState::Failed, DocumentState::Completed] {
            let mut doc = make_document();
            doc.state = terminal;
            for to in [
                DocumentState::Pending,
                DocumentState::Processing,
                DocumentState::Failed,
                DocumentState::AutoApproved,
                DocumentState::ReviewRequired,
                DocumentState::UnderReview,
                DocumentState::Completed,
            ] {
                assert!(!doc.can_transition(&to), "{:?} must be terminal", doc.state);
            }
        }
    }

    #[test]
    fn current_field_skips_superseded() {
        let mut doc = make_document();
        let mut machine = ExtractedField::from_extraction(
            doc.id,
            "payer",
            &ExtractedValue::new("Acme", 0.7),
        );
        machine.superseded = true;
        doc.fields.push(machine);
        doc.fields
            .push(ExtractedField::from_review(doc.id, "payer", "Acme Health"));

        let current = doc.current_field("payer").unwrap();
        assert_eq!(current.value, "Acme Health");
        assert_eq!(current.source, FieldSource::Human);
        assert_eq!(doc.machine_fields().count(), 0);
    }

    #[test]
    fn blocking_violations_filtered_by_severity() {
        let mut doc = make_document();
        doc.violations = vec![
            RuleViolation {
                rule_name: "warn".into(),
                severity: RuleSeverity::Warning,
                message: "w".into(),
                fields_involved: vec![],
            },
            RuleViolation {
                rule_name: "err".into(),
                severity: RuleSeverity::Error,
                message: "e".into(),
                fields_involved: vec![],
            },
        ];
        let blocking: Vec<_> = doc.blocking_violations().collect();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].rule_name, "err");
    }
}
