//! Append-only feedback ledger.
//!
//! The ledger is the source of truth for model performance: aggregate
//! counters are derived from it and must stay exactly reproducible by
//! replay. Events are immutable once appended; there is no mutation or
//! removal path.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::FeedbackEvent;

/// In-memory append-only event log guarded by a Mutex.
pub struct FeedbackLedger {
    events: Mutex<Vec<FeedbackEvent>>,
}

/// Query filter for ledger exports. All fields optional; `limit` caps the
/// result, newest first.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub model_version: Option<String>,
    pub field_name: Option<String>,
    pub document_id: Option<Uuid>,
    pub limit: Option<usize>,
}

/// Aggregate view of the whole ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_events: usize,
    pub average_reward: f32,
    pub by_type: BTreeMap<String, usize>,
}

impl FeedbackLedger {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Append a batch of events from one review completion.
    pub fn append(&self, batch: Vec<FeedbackEvent>) {
        if batch.is_empty() {
            return;
        }
        if let Ok(mut events) = self.events.lock() {
            events.extend(batch);
        }
    }

    /// All events, in append order.
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Filtered export, newest first.
    pub fn query(&self, filter: &LedgerFilter) -> Vec<FeedbackEvent> {
        let events = self.events();
        let mut matched: Vec<FeedbackEvent> = events
            .into_iter()
            .rev()
            .filter(|e| {
                filter
                    .model_version
                    .as_ref()
                    .map_or(true, |mv| &e.model_version == mv)
                    && filter
                        .field_name
                        .as_ref()
                        .map_or(true, |f| &e.field_name == f)
                    && filter.document_id.map_or(true, |id| e.document_id == id)
            })
            .collect();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whole-ledger summary for reporting collaborators.
    pub fn summary(&self) -> LedgerSummary {
        let events = self.events();
        let total_events = events.len();
        let average_reward = if total_events == 0 {
            0.0
        } else {
            let sum: f64 = events.iter().map(|e| f64::from(e.reward)).sum();
            (sum / total_events as f64) as f32
        };
        let mut by_type = BTreeMap::new();
        for event in &events {
            *by_type
                .entry(event.feedback_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        LedgerSummary {
            total_events,
            average_reward,
            by_type,
        }
    }
}

impl Default for FeedbackLedger {
    fn default() -> Self {
        Self::new()
    }
}
