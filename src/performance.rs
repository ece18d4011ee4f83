//! Performance Aggregator.
//!
//! Running per-(model version, field) statistics derived from the feedback
//! ledger. Counters are the only stored state; precision, recall, F1, and
//! average reward are recomputed on every read so they can never drift
//! from the ledger. The arena is the system's one hot shared-mutable
//! resource: records live behind per-key locks so concurrent feedback
//! submissions for the same key serialize their increments.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::models::{FeedbackEvent, FeedbackType};

/// Arena key: one record per model version per field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PerfKey {
    pub model_version: String,
    pub field_name: String,
}

impl PerfKey {
    pub fn new(model_version: &str, field_name: &str) -> Self {
        Self {
            model_version: model_version.into(),
            field_name: field_name.into(),
        }
    }
}

/// Stored counters for one key. Derived metrics are never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub sum_of_rewards: f64,
    pub count: u64,
    pub last_updated: DateTime<Utc>,
}

impl PerformanceRecord {
    fn new() -> Self {
        Self {
            total_predictions: 0,
            correct_predictions: 0,
            false_positives: 0,
            false_negatives: 0,
            sum_of_rewards: 0.0,
            count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Fold one feedback event into the counters.
    ///
    /// A correction counts as a false positive: the model asserted a value
    /// that was wrong.
    fn apply(&mut self, event: &FeedbackEvent) {
        self.total_predictions += 1;
        match event.feedback_type {
            FeedbackType::Confirmation => self.correct_predictions += 1,
            FeedbackType::Correction | FeedbackType::Removal => self.false_positives += 1,
            FeedbackType::Addition => self.false_negatives += 1,
        }
        self.sum_of_rewards += f64::from(event.reward);
        self.count += 1;
        self.last_updated = event.recorded_at;
    }
}

/// Derived view for one key, computed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub model_version: String,
    pub field_name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub avg_reward: f64,
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub sum_of_rewards: f64,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl PerformanceSnapshot {
    fn from_record(key: &PerfKey, record: &PerformanceRecord) -> Self {
        let precision = ratio(
            record.correct_predictions,
            record.correct_predictions + record.false_positives,
        );
        let recall = ratio(
            record.correct_predictions,
            record.correct_predictions + record.false_negatives,
        );
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        let avg_reward = if record.count == 0 {
            0.0
        } else {
            record.sum_of_rewards / record.count as f64
        };

        Self {
            model_version: key.model_version.clone(),
            field_name: key.field_name.clone(),
            precision,
            recall,
            f1,
            avg_reward,
            total_predictions: record.total_predictions,
            correct_predictions: record.correct_predictions,
            false_positives: record.false_positives,
            false_negatives: record.false_negatives,
            sum_of_rewards: record.sum_of_rewards,
        }
    }
}

/// Keyed record arena with per-key locking.
///
/// The outer RwLock guards the key set (reads dominate); each record's
/// Mutex serializes counter read-modify-write for that key only.
pub struct PerformanceArena {
    records: RwLock<BTreeMap<PerfKey, Mutex<PerformanceRecord>>>,
}

impl PerformanceArena {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Fold one event into its key's record, creating it on first touch.
    pub fn record(&self, event: &FeedbackEvent) -> Result<(), EngineError> {
        let key = PerfKey::new(&event.model_version, &event.field_name);

        {
            let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
            if let Some(slot) = records.get(&key) {
                let mut record = slot.lock().map_err(|_| EngineError::LockPoisoned)?;
                record.apply(event);
                return Ok(());
            }
        }

        let mut records = self.records.write().map_err(|_| EngineError::LockPoisoned)?;
        let slot = records
            .entry(key)
            .or_insert_with(|| Mutex::new(PerformanceRecord::new()));
        let mut record = slot.lock().map_err(|_| EngineError::LockPoisoned)?;
        record.apply(event);
        Ok(())
    }

    /// Derived snapshot for one key, if it has been touched.
    pub fn snapshot(
        &self,
        model_version: &str,
        field_name: &str,
    ) -> Result<Option<PerformanceSnapshot>, EngineError> {
        let key = PerfKey::new(model_version, field_name);
        let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
        match records.get(&key) {
            Some(slot) => {
                let record = slot.lock().map_err(|_| EngineError::LockPoisoned)?;
                Ok(Some(PerformanceSnapshot::from_record(&key, &record)))
            }
            None => Ok(None),
        }
    }

    /// Snapshots for every touched key, in key order.
    pub fn snapshots(&self) -> Result<Vec<PerformanceSnapshot>, EngineError> {
        let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
        let mut snapshots = Vec::with_capacity(records.len());
        for (key, slot) in records.iter() {
            let record = slot.lock().map_err(|_| EngineError::LockPoisoned)?;
            snapshots.push(PerformanceSnapshot::from_record(key, &record));
        }
        Ok(snapshots)
    }

    /// Discard all counters and replay the ledger from scratch.
    ///
    /// Drift-repair path: after this, counters match the ledger exactly by
    /// construction.
    pub fn rebuild(&self, events: &[FeedbackEvent]) -> Result<(), EngineError> {
        let mut fresh: BTreeMap<PerfKey, Mutex<PerformanceRecord>> = BTreeMap::new();
        for event in events {
            let key = PerfKey::new(&event.model_version, &event.field_name);
            let slot = fresh
                .entry(key)
                .or_insert_with(|| Mutex::new(PerformanceRecord::new()));
            slot.get_mut()
                .map_err(|_| EngineError::LockPoisoned)?
                .apply(event);
        }

        let mut records = self.records.write().map_err(|_| EngineError::LockPoisoned)?;
        *records = fresh;
        tracing::info!(events = events.len(), keys = records.len(), "Performance arena rebuilt from ledger");
        Ok(())
    }

    pub fn key_count(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }
}

impl Default for PerformanceArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_event(
        field_name: &str,
        feedback_type: FeedbackType,
        reward: f32,
        model_version: &str,
    ) -> FeedbackEvent {
        FeedbackEvent {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            field_name: field_name.into(),
            feedback_type,
            prior_value: None,
            new_value: None,
            prior_confidence: 0.0,
            reward,
            model_version: model_version.into(),
            reviewer_id: "reviewer-1".into(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn counters_track_feedback_types() {
        let arena = PerformanceArena::new();
        for event in [
            make_event("facility", FeedbackType::Confirmation, 0.9, "m1"),
            make_event("facility", FeedbackType::Confirmation, 0.8, "m1"),
            make_event("facility", FeedbackType::Correction, -0.95, "m1"),
            make_event("facility", FeedbackType::Removal, -1.2, "m1"),
            make_event("facility", FeedbackType::Addition, -2.0, "m1"),
        ] {
            arena.record(&event).unwrap();
        }

        let snapshot = arena.snapshot("m1", "facility").unwrap().unwrap();
        assert_eq!(snapshot.total_predictions, 5);
        assert_eq!(snapshot.correct_predictions, 2);
        assert_eq!(snapshot.false_positives, 2);
        assert_eq!(snapshot.false_negatives, 1);
    }

    #[test]
    fn derived_metrics_computed_on_read() {
        let arena = PerformanceArena::new();
        for event in [
            make_event("payer", FeedbackType::Confirmation, 1.0, "m1"),
            make_event("payer", FeedbackType::Removal, -1.5, "m1"),
            make_event("payer", FeedbackType::Addition, -2.0, "m1"),
        ] {
            arena.record(&event).unwrap();
        }

        let snapshot = arena.snapshot("m1", "payer").unwrap().unwrap();
        // precision = 1 / (1 + 1), recall = 1 / (1 + 1)
        assert!((snapshot.precision - 0.5).abs() < 1e-9);
        assert!((snapshot.recall - 0.5).abs() < 1e-9);
        assert!((snapshot.f1 - 0.5).abs() < 1e-9);
        assert!((snapshot.avg_reward - (-2.5 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn zero_denominators_yield_zero_metrics() {
        let arena = PerformanceArena::new();
        arena
            .record(&make_event("drg", FeedbackType::Addition, -2.0, "m1"))
            .unwrap();

        let snapshot = arena.snapshot("m1", "drg").unwrap().unwrap();
        // No correct, no false positives: precision denominator is 0.
        assert_eq!(snapshot.precision, 0.0);
        assert_eq!(snapshot.recall, 0.0);
        assert_eq!(snapshot.f1, 0.0);
    }

    #[test]
    fn untouched_key_has_no_snapshot() {
        let arena = PerformanceArena::new();
        assert!(arena.snapshot("m1", "never").unwrap().is_none());
    }

    #[test]
    fn keys_are_isolated() {
        let arena = PerformanceArena::new();
        arena
            .record(&make_event("facility", FeedbackType::Confirmation, 0.9, "m1"))
            .unwrap();
        arena
            .record(&make_event("facility", FeedbackType::Addition, -2.0, "m2"))
            .unwrap();

        let m1 = arena.snapshot("m1", "facility").unwrap().unwrap();
        let m2 = arena.snapshot("m2", "facility").unwrap().unwrap();
        assert_eq!(m1.correct_predictions, 1);
        assert_eq!(m1.false_negatives, 0);
        assert_eq!(m2.correct_predictions, 0);
        assert_eq!(m2.false_negatives, 1);
        assert_eq!(arena.key_count(), 2);
    }

    #[test]
    fn rebuild_reproduces_incremental_counters() {
        let events: Vec<FeedbackEvent> = vec![
            make_event("facility", FeedbackType::Confirmation, 0.9, "m1"),
            make_event("facility", FeedbackType::Correction, -0.95, "m1"),
            make_event("payer", FeedbackType::Removal, -1.2, "m1"),
            make_event("facility", FeedbackType::Addition, -2.0, "m2"),
        ];

        let incremental = PerformanceArena::new();
        for event in &events {
            incremental.record(event).unwrap();
        }

        let replayed = PerformanceArena::new();
        replayed.rebuild(&events).unwrap();

        let a = incremental.snapshots().unwrap();
        let b = replayed.snapshots().unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.model_version, y.model_version);
            assert_eq!(x.field_name, y.field_name);
            assert_eq!(x.total_predictions, y.total_predictions);
            assert_eq!(x.correct_predictions, y.correct_predictions);
            assert_eq!(x.false_positives, y.false_positives);
            assert_eq!(x.false_negatives, y.false_negatives);
            assert_eq!(x.sum_of_rewards, y.sum_of_rewards);
        }
    }

    #[test]
    fn concurrent_updates_to_same_key_lose_nothing() {
        use std::sync::Arc;
        use std::thread;

        let arena = Arc::new(PerformanceArena::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let arena = Arc::clone(&arena);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    arena
                        .record(&make_event("facility", FeedbackType::Confirmation, 0.5, "m1"))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = arena.snapshot("m1", "facility").unwrap().unwrap();
        assert_eq!(snapshot.total_predictions, 400);
        assert_eq!(snapshot.correct_predictions, 400);
        assert!((snapshot.sum_of_rewards - 200.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_serializes() {
        let arena = PerformanceArena::new();
        arena
            .record(&make_event("facility", FeedbackType::Confirmation, 0.9, "m1"))
            .unwrap();
        let snapshot = arena.snapshot("m1", "facility").unwrap().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"model_version\":\"m1\""));
        assert!(json.contains("\"precision\""));
    }
}
