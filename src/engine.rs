//! Intake engine — composition root.
//!
//! Single shared-state facade over the document table, the feedback
//! ledger, and the performance arena. Documents are routed independently
//! and may be processed concurrently; within one document the
//! aggregation → rules → routing sequence runs to completion under the
//! table's write lock, so no partial state is ever observable. Review
//! completion flips the document to completed in the same critical section
//! that appends its feedback, keeping the ledger and the lifecycle in
//! step.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::confidence;
use crate::config::{ConfigError, RoutingConfig};
use crate::ledger::{FeedbackLedger, LedgerFilter, LedgerSummary};
use crate::models::{
    BusinessRule, Document, DocumentState, ExtractedField, ExtractedValue, ExtractionPass,
    FeedbackEvent, FieldCatalog, FieldSource,
};
use crate::performance::{PerformanceArena, PerformanceSnapshot};
use crate::reward;
use crate::routing::{self, RoutingResult};
use crate::rules;

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Extraction pass contains no fields")]
    IncompleteExtraction,

    #[error("Document {document_id} has already been reviewed")]
    AlreadyReviewed { document_id: Uuid },

    #[error("Invalid state transition for document {document_id}: {from} -> {to}")]
    InvalidStateTransition {
        document_id: Uuid,
        from: &'static str,
        to: &'static str,
    },

    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: Uuid },

    #[error("Document already registered: {document_id}")]
    DocumentExists { document_id: Uuid },

    #[error("Invalid routing config: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal lock error")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// IntakeEngine
// ═══════════════════════════════════════════════════════════

/// Decision core for extraction routing and review feedback.
///
/// Wrapped in `Arc` by the embedding application; all methods take `&self`
/// and synchronize internally.
pub struct IntakeEngine {
    config: RoutingConfig,
    documents: RwLock<BTreeMap<Uuid, Document>>,
    ledger: FeedbackLedger,
    performance: PerformanceArena,
}

impl IntakeEngine {
    /// Create an engine with validated thresholds.
    pub fn new(config: RoutingConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            documents: RwLock::new(BTreeMap::new()),
            ledger: FeedbackLedger::new(),
            performance: PerformanceArena::new(),
        })
    }

    /// Engine with the deployment default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(RoutingConfig::default()).expect("default config is valid")
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    // ── Document lifecycle ──────────────────────────────────

    /// Register a new document in `pending` (OCR output arrived).
    pub fn register_document(&self) -> Result<Uuid, EngineError> {
        let id = Uuid::new_v4();
        self.register_document_with_id(id)?;
        Ok(id)
    }

    /// Register with a collaborator-supplied id.
    pub fn register_document_with_id(&self, document_id: Uuid) -> Result<(), EngineError> {
        let mut documents = self.write_documents()?;
        if documents.contains_key(&document_id) {
            return Err(EngineError::DocumentExists { document_id });
        }
        documents.insert(document_id, Document::new(document_id));
        tracing::debug!(document_id = %document_id, "Document registered");
        Ok(())
    }

    /// Run one extraction pass through aggregation → rules → routing.
    ///
    /// The document must be `pending`. On an empty pass the document stays
    /// in `processing` with the error classification attached — never a
    /// silent drop.
    pub fn process_extraction(
        &self,
        document_id: Uuid,
        pass: &ExtractionPass,
        catalog: &FieldCatalog,
        rules_set: &[BusinessRule],
    ) -> Result<RoutingResult, EngineError> {
        let mut documents = self.write_documents()?;
        let doc = documents
            .get_mut(&document_id)
            .ok_or(EngineError::DocumentNotFound { document_id })?;

        ensure_transition(doc, DocumentState::Processing)?;
        doc.state = DocumentState::Processing;
        doc.model_version = Some(pass.model_version.clone());

        let confidences = match confidence::aggregate(pass, catalog) {
            Ok(confidences) => confidences,
            Err(e) => {
                doc.failure_reason = Some("incomplete_extraction".into());
                tracing::warn!(
                    document_id = %document_id,
                    model_version = %pass.model_version,
                    "Extraction pass supplied zero fields"
                );
                return Err(e);
            }
        };

        doc.fields = pass
            .fields
            .iter()
            .map(|(name, value)| ExtractedField::from_extraction(document_id, name, value))
            .collect();

        let violations = rules::evaluate(&pass.fields, rules_set);
        let (state, priority) = routing::decide(&confidences, &violations, catalog, &self.config);

        let now = Utc::now();
        doc.overall_confidence = Some(confidences.overall());
        doc.violations = violations.clone();
        doc.state = state.clone();
        doc.priority = priority.clone();
        doc.routed_at = Some(now);
        doc.review_due = priority.as_ref().map(|p| now + p.due_within());
        doc.failure_reason = None;

        tracing::info!(
            document_id = %document_id,
            state = state.as_str(),
            overall = confidences.overall(),
            violations = doc.violations.len(),
            "Extraction pass routed"
        );

        Ok(RoutingResult {
            state,
            priority,
            overall_confidence: confidences.overall(),
            violations,
        })
    }

    /// Record an unrecoverable collaborator failure. Terminal.
    pub fn mark_failed(&self, document_id: Uuid, reason: &str) -> Result<(), EngineError> {
        let mut documents = self.write_documents()?;
        let doc = documents
            .get_mut(&document_id)
            .ok_or(EngineError::DocumentNotFound { document_id })?;

        ensure_transition(doc, DocumentState::Failed)?;
        doc.state = DocumentState::Failed;
        doc.failure_reason = Some(reason.into());
        tracing::warn!(document_id = %document_id, reason, "Document failed");
        Ok(())
    }

    /// Finalize an auto-approved document. No feedback events are
    /// generated — no human correction occurred.
    pub fn finalize_auto_approved(&self, document_id: Uuid) -> Result<(), EngineError> {
        let mut documents = self.write_documents()?;
        let doc = documents
            .get_mut(&document_id)
            .ok_or(EngineError::DocumentNotFound { document_id })?;

        ensure_transition(doc, DocumentState::Completed)?;
        doc.state = DocumentState::Completed;
        tracing::info!(document_id = %document_id, "Auto-approved document finalized");
        Ok(())
    }

    /// Record a reviewer claiming the document. Claim exclusivity is a
    /// collaborator concern; this core only records the transition.
    pub fn claim_for_review(&self, document_id: Uuid, reviewer_id: &str) -> Result<(), EngineError> {
        let mut documents = self.write_documents()?;
        let doc = documents
            .get_mut(&document_id)
            .ok_or(EngineError::DocumentNotFound { document_id })?;

        ensure_transition(doc, DocumentState::UnderReview)?;
        doc.state = DocumentState::UnderReview;
        doc.reviewed_by = Some(reviewer_id.into());
        tracing::info!(document_id = %document_id, reviewer = reviewer_id, "Document claimed for review");
        Ok(())
    }

    /// Finalize a review: classify every touched field, append the
    /// feedback events, fold them into the performance arena, and complete
    /// the document — all within the document table's critical section.
    ///
    /// Re-running on a completed document fails with `AlreadyReviewed` and
    /// leaves the ledger untouched.
    pub fn complete_review(
        &self,
        document_id: Uuid,
        reviewed_fields: &BTreeMap<String, String>,
        reviewer_id: &str,
    ) -> Result<Vec<FeedbackEvent>, EngineError> {
        let mut documents = self.write_documents()?;
        let doc = documents
            .get_mut(&document_id)
            .ok_or(EngineError::DocumentNotFound { document_id })?;

        if doc.state == DocumentState::Completed {
            return Err(EngineError::AlreadyReviewed { document_id });
        }
        ensure_transition(doc, DocumentState::Completed)?;

        let before: BTreeMap<String, ExtractedValue> = doc
            .machine_fields()
            .map(|f| (f.field_name.clone(), ExtractedValue::new(&f.value, f.confidence)))
            .collect();
        let classifications = reward::classify_review(&before, reviewed_fields);

        let model_version = doc.model_version.clone().unwrap_or_default();
        let now = Utc::now();
        let events: Vec<FeedbackEvent> = classifications
            .into_iter()
            .map(|c| FeedbackEvent {
                id: Uuid::new_v4(),
                document_id,
                field_name: c.field_name,
                feedback_type: c.feedback_type,
                prior_value: c.prior_value,
                new_value: c.new_value,
                prior_confidence: c.prior_confidence,
                reward: c.reward,
                model_version: model_version.clone(),
                reviewer_id: reviewer_id.into(),
                recorded_at: now,
            })
            .collect();

        // Arena first: its only failure mode is a poisoned lock, and the
        // ledger (source of truth) must not run ahead of a rejected
        // completion. A counter running ahead is repairable via
        // rebuild_performance().
        for event in &events {
            self.performance.record(event)?;
        }
        self.ledger.append(events.clone());

        // The reviewer's finalized set supersedes every machine record.
        for field in doc.fields.iter_mut() {
            if field.source == FieldSource::Llm {
                field.superseded = true;
            }
        }
        for (name, value) in reviewed_fields {
            if !value.trim().is_empty() {
                doc.fields
                    .push(ExtractedField::from_review(document_id, name, value.trim()));
            }
        }

        doc.state = DocumentState::Completed;
        doc.reviewed_by = Some(reviewer_id.into());
        doc.reviewed_at = Some(now);

        tracing::info!(
            document_id = %document_id,
            reviewer = reviewer_id,
            events = events.len(),
            "Review completed"
        );
        Ok(events)
    }

    // ── Queries ─────────────────────────────────────────────

    /// Current view of one document.
    pub fn document(&self, document_id: Uuid) -> Result<Document, EngineError> {
        let documents = self.read_documents()?;
        documents
            .get(&document_id)
            .cloned()
            .ok_or(EngineError::DocumentNotFound { document_id })
    }

    /// Documents awaiting a reviewer, most urgent first, FIFO within a
    /// priority.
    pub fn review_queue(&self) -> Result<Vec<Document>, EngineError> {
        let documents = self.read_documents()?;
        let mut queue: Vec<Document> = documents
            .values()
            .filter(|doc| doc.state == DocumentState::ReviewRequired)
            .cloned()
            .collect();
        queue.sort_by_key(|doc| {
            (
                doc.priority.as_ref().map(|p| p.rank()).unwrap_or(u8::MAX),
                doc.routed_at,
            )
        });
        Ok(queue)
    }

    pub fn performance_snapshot(
        &self,
        model_version: &str,
        field_name: &str,
    ) -> Result<Option<PerformanceSnapshot>, EngineError> {
        self.performance.snapshot(model_version, field_name)
    }

    pub fn performance_snapshots(&self) -> Result<Vec<PerformanceSnapshot>, EngineError> {
        self.performance.snapshots()
    }

    /// Replay the full ledger into a fresh arena. Repairs any counter
    /// drift; the ledger is the source of truth.
    pub fn rebuild_performance(&self) -> Result<(), EngineError> {
        self.performance.rebuild(&self.ledger.events())
    }

    pub fn ledger_events(&self, filter: &LedgerFilter) -> Vec<FeedbackEvent> {
        self.ledger.query(filter)
    }

    pub fn ledger_summary(&self) -> LedgerSummary {
        self.ledger.summary()
    }

    // ── Lock helpers ────────────────────────────────────────

    fn read_documents(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Uuid, Document>>, EngineError> {
        self.documents.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write_documents(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<Uuid, Document>>, EngineError> {
        self.documents.write().map_err(|_| EngineError::LockPoisoned)
    }
}

fn ensure_transition(doc: &Document, to: DocumentState) -> Result<(), EngineError> {
    if doc.can_transition(&to) {
        Ok(())
    } else {
        Err(EngineError::InvalidStateTransition {
            document_id: doc.id,
            from: doc.state.as_str(),
            to: to.as_str(),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
