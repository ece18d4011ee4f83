//! Confidence Aggregator.
//!
//! Combines the per-field confidences of one extraction pass into a
//! document-level overall confidence. Missing required fields contribute a
//! hard 0.0 to the mean instead of being excluded, so a document cannot
//! look confident by omitting a required field. Pure, no side effects.

use std::collections::BTreeMap;

use crate::engine::EngineError;
use crate::models::{ExtractionPass, FieldCatalog};

/// Aggregated confidences for one extraction pass.
#[derive(Debug, Clone)]
pub struct FieldConfidences {
    per_field: BTreeMap<String, f32>,
    overall: f32,
    missing_required: Vec<String>,
}

impl FieldConfidences {
    /// Confidence for a field; fields unknown to the pass report 0.0.
    pub fn field(&self, name: &str) -> f32 {
        self.per_field.get(name).copied().unwrap_or(0.0)
    }

    pub fn overall(&self) -> f32 {
        self.overall
    }

    /// Required fields absent from the pass (or supplied empty), name order.
    pub fn missing_required(&self) -> &[String] {
        &self.missing_required
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f32)> {
        self.per_field.iter()
    }
}

/// Aggregate one extraction pass against the run's field catalog.
///
/// Fails only when the pass supplies zero fields, which is an upstream
/// contract violation.
pub fn aggregate(
    pass: &ExtractionPass,
    catalog: &FieldCatalog,
) -> Result<FieldConfidences, EngineError> {
    if pass.is_empty() {
        return Err(EngineError::IncompleteExtraction);
    }

    let mut per_field = BTreeMap::new();
    for (name, extracted) in &pass.fields {
        per_field.insert(name.clone(), extracted.confidence.clamp(0.0, 1.0));
    }

    // Required fields with no usable value are floored at 0.0, which also
    // drags the mean down — the floor, not an exclusion.
    let mut missing_required = Vec::new();
    for def in catalog.required() {
        let supplied = pass.fields.get(&def.name).is_some_and(|v| !v.is_empty());
        if !supplied {
            per_field.insert(def.name.clone(), 0.0);
            missing_required.push(def.name.clone());
        }
    }

    let overall = per_field.values().sum::<f32>() / per_field.len() as f32;

    if !missing_required.is_empty() {
        tracing::debug!(
            missing = missing_required.len(),
            overall,
            "Required fields absent from extraction pass"
        );
    }

    Ok(FieldConfidences {
        per_field,
        overall,
        missing_required,
    })
}
