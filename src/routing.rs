//! Routing Decision Engine.
//!
//! Pure decision over aggregated confidence and rule violations: either the
//! extraction is trustworthy enough to auto-approve, or the document queues
//! for human review at a priority assigned once, at transition time.

use serde::{Deserialize, Serialize};

use crate::confidence::FieldConfidences;
use crate::config::RoutingConfig;
use crate::models::{DocumentState, FieldCatalog, ReviewPriority, RuleViolation};

/// Outcome of routing one extraction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub state: DocumentState,
    pub priority: Option<ReviewPriority>,
    pub overall_confidence: f32,
    pub violations: Vec<RuleViolation>,
}

/// Decide the post-extraction state for one document.
///
/// Auto-approval requires all three gates at once: overall confidence at or
/// above the minimum, every required field at or above the per-field floor
/// (a missing required field reports 0.0 and fails it), and no blocking
/// violations. Warnings attach for visibility but do not block.
pub fn decide(
    confidences: &FieldConfidences,
    violations: &[RuleViolation],
    catalog: &FieldCatalog,
    config: &RoutingConfig,
) -> (DocumentState, Option<ReviewPriority>) {
    let overall = confidences.overall();
    let has_blocking = violations.iter().any(|v| v.is_blocking());
    let required_ok = catalog
        .required()
        .all(|def| confidences.field(&def.name) >= config.required_fields_threshold);

    if overall >= config.min_confidence_threshold && required_ok && !has_blocking {
        tracing::info!(overall, "Extraction auto-approved");
        return (DocumentState::AutoApproved, None);
    }

    let priority = priority_for(overall, config);
    tracing::info!(
        overall,
        required_ok,
        has_blocking,
        priority = priority.as_str(),
        "Extraction routed for human review"
    );
    (DocumentState::ReviewRequired, Some(priority))
}

/// Priority banding: monotonic in confidence.
fn priority_for(overall: f32, config: &RoutingConfig) -> ReviewPriority {
    if overall < config.urgent_confidence_threshold {
        ReviewPriority::Urgent
    } else if overall < config.high_priority_confidence_threshold {
        ReviewPriority::High
    } else {
        ReviewPriority::Normal
    }
}
