//! Fieldgate — the decision core of an insurance-document intake pipeline.
//!
//! Upload handling, OCR, LLM extraction, storage, and the review UI are
//! collaborator concerns. This crate owns the part with actual decision
//! logic: whether an extraction pass is trustworthy enough to auto-approve,
//! what priority a human reviewer sees it at, how corrections become scored
//! feedback, and how per-field model performance accumulates over time.
//!
//! Data flow: extraction pass → confidence aggregation → business rules →
//! routing decision → (auto-approve | review queue) → reviewer corrections
//! → feedback ledger → performance arena.

pub mod confidence; // Confidence aggregation with missing-required floor
pub mod config;
pub mod engine;
pub mod ledger; // Append-only feedback event log
pub mod models;
pub mod performance; // Per-(model, field) counters + derived metrics
pub mod reward; // Review diff classification + reward scoring
pub mod routing; // Auto-approval gate + priority banding
pub mod rules; // Field-pattern and cross-field rule evaluation

pub use config::{ConfigError, RoutingConfig};
pub use engine::{EngineError, IntakeEngine};
pub use ledger::{LedgerFilter, LedgerSummary};
pub use models::{
    BusinessRule, CrossFieldLogic, Document, DocumentState, ExtractedField, ExtractedValue,
    ExtractionPass, FeedbackEvent, FeedbackType, FieldCatalog, FieldDefinition, FieldSource,
    FieldType, ReviewPriority, RuleKind, RuleSeverity, RuleViolation,
};
pub use performance::{PerformanceArena, PerformanceSnapshot};
pub use routing::RoutingResult;
