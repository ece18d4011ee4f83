//! Feedback & Reward Engine.
//!
//! Diffs the machine extraction against the reviewer's finalized field set
//! and scores each touched field. Rewards follow the intake service's
//! scoring table: confirmations earn the machine's own confidence,
//! corrections are penalized harder the more confident the wrong answer
//! was, a missed field is the worst outcome at a flat -2.0, and a value
//! that should not exist costs 1.5x its confidence.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{ExtractedValue, FeedbackType};

/// Flat penalty for a field the machine missed entirely. There is no
/// confidence signal to scale by.
pub const ADDITION_PENALTY: f32 = -2.0;

/// One classified field from a completed review.
#[derive(Debug, Clone)]
pub struct Classification {
    pub field_name: String,
    pub feedback_type: FeedbackType,
    pub prior_value: Option<String>,
    pub new_value: Option<String>,
    pub prior_confidence: f32,
    pub reward: f32,
}

/// Classify every field appearing in either the machine extraction or the
/// reviewer's finalized set.
///
/// Fields empty on both sides produce no classification — the reviewer
/// never touched them and there is nothing to learn from.
pub fn classify_review(
    before: &BTreeMap<String, ExtractedValue>,
    after: &BTreeMap<String, String>,
) -> Vec<Classification> {
    let mut names: BTreeSet<&String> = before.keys().collect();
    names.extend(after.keys());

    let mut classifications = Vec::new();
    for name in names {
        let prior = before.get(name);
        let prior_text = prior.map(|v| v.value.trim()).unwrap_or("");
        let prior_confidence = prior.map(|v| v.confidence).unwrap_or(0.0);
        let new_text = after.get(name).map(|v| v.trim()).unwrap_or("");

        let feedback_type = match (prior_text.is_empty(), new_text.is_empty()) {
            (true, true) => continue,
            (true, false) => FeedbackType::Addition,
            (false, true) => FeedbackType::Removal,
            (false, false) if prior_text == new_text => FeedbackType::Confirmation,
            (false, false) => FeedbackType::Correction,
        };

        let reward = reward_for(&feedback_type, prior_confidence);
        classifications.push(Classification {
            field_name: name.clone(),
            feedback_type,
            prior_value: (!prior_text.is_empty()).then(|| prior_text.to_string()),
            new_value: (!new_text.is_empty()).then(|| new_text.to_string()),
            prior_confidence,
            reward,
        });
    }

    tracing::debug!(
        classified = classifications.len(),
        "Review diff classified"
    );
    classifications
}

/// Reward table.
///
/// Corrections scale linearly with machine confidence inside [-1.0, -0.5]:
/// a coin-flip wrong answer costs -0.5, a fully confident wrong answer the
/// full -1.0.
pub fn reward_for(feedback_type: &FeedbackType, machine_confidence: f32) -> f32 {
    let confidence = machine_confidence.clamp(0.0, 1.0);
    match feedback_type {
        FeedbackType::Confirmation => 1.0 * confidence,
        FeedbackType::Correction => -(0.5 + 0.5 * confidence),
        FeedbackType::Addition => ADDITION_PENALTY,
        FeedbackType::Removal => -1.5 * confidence,
    }
}
