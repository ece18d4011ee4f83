//! Immutable feedback events.
//!
//! One event per field touched during a completed review. The append-only
//! ledger of these events is the source of truth for all model performance
//! statistics; counters must always be reproducible by replaying it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::FeedbackType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub id: Uuid,
    pub document_id: Uuid,
    pub field_name: String,
    pub feedback_type: FeedbackType,
    /// Machine value before review. `None` for additions.
    pub prior_value: Option<String>,
    /// Reviewer value after review. `None` for removals.
    pub new_value: Option<String>,
    /// Machine confidence in the prior value (0.0 for additions).
    pub prior_confidence: f32,
    pub reward: f32,
    pub model_version: String,
    pub reviewer_id: String,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_round_trip() {
        let event = FeedbackEvent {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            field_name: "patient_last_name".into(),
            feedback_type: FeedbackType::Correction,
            prior_value: Some("Smth".into()),
            new_value: Some("Smith".into()),
            prior_confidence: 0.9,
            reward: -0.95,
            model_version: "gpt-4-turbo-2026-01".into(),
            reviewer_id: "reviewer-7".into(),
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: FeedbackEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.field_name, "patient_last_name");
        assert_eq!(back.feedback_type, FeedbackType::Correction);
        assert!((back.reward - -0.95).abs() < f32::EPSILON);
    }
}
