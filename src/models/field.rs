//! Field definitions and extraction records.
//!
//! `FieldDefinition` is the configurable schema for one extractable field.
//! An extraction run snapshots the active set into a `FieldCatalog` at
//! start, so mid-run configuration edits cannot skew routing. Extracted
//! values arrive as an `ExtractionPass` and are kept per document as
//! `ExtractedField` records — superseded, never deleted, when a reviewer
//! overrides them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::enums::{FieldSource, FieldType};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Configurable definition of one extractable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Internal name, unique within a catalog.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub field_type: FieldType,
    pub is_required: bool,
    /// Regex source applied to extracted values by field-pattern rules.
    pub validation_pattern: Option<String>,
    /// Opaque hints consumed by the extraction collaborator.
    pub extraction_hints: Option<serde_json::Value>,
}

impl FieldDefinition {
    pub fn new(name: &str, display_name: &str, field_type: FieldType, is_required: bool) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            field_type,
            is_required,
            validation_pattern: None,
            extraction_hints: None,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.validation_pattern = Some(pattern.into());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hints(mut self, hints: serde_json::Value) -> Self {
        self.extraction_hints = Some(hints);
        self
    }
}

/// Snapshot of the active field definitions for one extraction run.
///
/// Keyed by internal name. Immutable once constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCatalog {
    fields: BTreeMap<String, FieldDefinition>,
}

impl FieldCatalog {
    pub fn new(definitions: Vec<FieldDefinition>) -> Self {
        let fields = definitions
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|def| def.is_required)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    /// Required definitions, in name order.
    pub fn required(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values().filter(|def| def.is_required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Default catalog for insurance denial/authorization documents.
    ///
    /// Seven required fields plus the optional set, with validation
    /// patterns for the machine-checkable ones.
    pub fn default_insurance_fields() -> Self {
        let definitions = vec![
            FieldDefinition::new("facility", "Facility", FieldType::Text, true)
                .with_description("Healthcare facility name")
                .with_hints(json!({"keywords": ["facility", "hospital", "clinic"], "context": "header"})),
            FieldDefinition::new("reference_number", "Reference Number", FieldType::Text, true)
                .with_description("Document reference or case number")
                .with_hints(json!({"keywords": ["reference", "case number", "ref"], "context": "header"})),
            FieldDefinition::new("patient_last_name", "Patient Last Name", FieldType::Text, true)
                .with_hints(json!({"keywords": ["last name", "surname"], "context": "patient_info"})),
            FieldDefinition::new("patient_first_name", "Patient First Name", FieldType::Text, true)
                .with_hints(json!({"keywords": ["first name", "given name"], "context": "patient_info"})),
            FieldDefinition::new("member_id", "Member ID", FieldType::Text, true)
                .with_description("Insurance member identification number")
                .with_pattern(r"^[A-Z0-9]{6,20}$")
                .with_hints(json!({"keywords": ["member id", "member number", "id"], "context": "insurance"})),
            FieldDefinition::new("date_of_birth", "Date of Birth", FieldType::Date, true)
                .with_pattern(r"^\d{1,2}/\d{1,2}/\d{4}$")
                .with_hints(json!({"keywords": ["dob", "date of birth", "birth date"], "context": "patient_info"})),
            FieldDefinition::new("denial_reason", "Denial Reason", FieldType::Text, true)
                .with_description("Reason for authorization denial")
                .with_hints(json!({"keywords": ["denial", "denied", "reason"], "context": "decision"})),
            FieldDefinition::new("payer", "Payer", FieldType::Text, false)
                .with_description("Insurance payer/company name")
                .with_hints(json!({"keywords": ["payer", "insurance", "plan"], "context": "insurance"})),
            FieldDefinition::new("authorization_number", "Authorization Number", FieldType::Text, false)
                .with_description("Prior authorization number")
                .with_hints(json!({"keywords": ["authorization", "auth number"], "context": "insurance"})),
            FieldDefinition::new("account_number", "Account Number", FieldType::Text, false)
                .with_hints(json!({"keywords": ["account", "acct"], "context": "patient_info"})),
            FieldDefinition::new("working_drg", "Working DRG", FieldType::Text, false)
                .with_description("Diagnosis Related Group code")
                .with_hints(json!({"keywords": ["drg", "diagnosis"], "context": "medical"})),
            FieldDefinition::new("third_party_reviewer", "3rd Party Reviewer", FieldType::Text, false)
                .with_hints(json!({"keywords": ["reviewer", "review organization"], "context": "review"})),
            FieldDefinition::new("level_of_care", "Level of Care", FieldType::Text, false)
                .with_hints(json!({"keywords": ["level of care", "care level"], "context": "medical"})),
            FieldDefinition::new("service", "Service", FieldType::Text, false)
                .with_description("Medical service or procedure")
                .with_hints(json!({"keywords": ["service", "procedure"], "context": "medical"})),
            FieldDefinition::new("clinical_care_guidelines", "Clinical Care Guidelines", FieldType::Text, false)
                .with_hints(json!({"keywords": ["guidelines", "clinical"], "context": "medical"})),
            FieldDefinition::new("provider_tin", "Provider TIN", FieldType::Text, false)
                .with_description("Provider Tax Identification Number")
                .with_pattern(r"^\d{2}-\d{7}$")
                .with_hints(json!({"keywords": ["tin", "tax id"], "context": "provider"})),
            FieldDefinition::new("case_manager", "Case Manager", FieldType::Text, false)
                .with_hints(json!({"keywords": ["case manager", "manager"], "context": "contact"})),
            FieldDefinition::new("peer_to_peer_email", "Peer to Peer Email", FieldType::Email, false)
                .with_pattern(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .with_hints(json!({"keywords": ["peer", "email"], "context": "contact"})),
            FieldDefinition::new("peer_to_peer_phone", "Peer to Peer Phone", FieldType::Phone, false)
                .with_pattern(r"^\(\d{3}\) \d{3}-\d{4}$")
                .with_hints(json!({"keywords": ["peer", "phone"], "context": "contact"})),
            FieldDefinition::new("peer_to_peer_fax", "Peer to Peer Fax", FieldType::Phone, false)
                .with_pattern(r"^\(\d{3}\) \d{3}-\d{4}$")
                .with_hints(json!({"keywords": ["peer", "fax"], "context": "contact"})),
        ];
        Self::new(definitions)
    }
}

// ---------------------------------------------------------------------------
// Extraction input
// ---------------------------------------------------------------------------

/// One extracted value as received from the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedValue {
    pub value: String,
    /// Provider certainty in [0,1]. Clamped on ingestion.
    pub confidence: f32,
}

impl ExtractedValue {
    pub fn new(value: &str, confidence: f32) -> Self {
        Self {
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// One complete extraction pass for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPass {
    pub model_version: String,
    pub fields: BTreeMap<String, ExtractedValue>,
}

impl ExtractionPass {
    pub fn new(model_version: &str) -> Self {
        Self {
            model_version: model_version.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, field_name: &str, value: &str, confidence: f32) {
        self.fields
            .insert(field_name.into(), ExtractedValue::new(value, confidence));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

// ---------------------------------------------------------------------------
// Per-document field records
// ---------------------------------------------------------------------------

/// One field value held on a document.
///
/// The llm record from the extraction pass stays on the document after
/// review; the reviewer's version is appended with `source = human` and the
/// machine record flagged superseded, preserving history for reward
/// calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub id: Uuid,
    pub document_id: Uuid,
    pub field_name: String,
    pub value: String,
    pub confidence: f32,
    pub source: FieldSource,
    pub recorded_at: DateTime<Utc>,
    pub superseded: bool,
}

impl ExtractedField {
    pub fn from_extraction(document_id: Uuid, field_name: &str, value: &ExtractedValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            field_name: field_name.into(),
            value: value.value.clone(),
            confidence: value.confidence,
            source: FieldSource::Llm,
            recorded_at: Utc::now(),
            superseded: false,
        }
    }

    pub fn from_review(document_id: Uuid, field_name: &str, value: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            field_name: field_name.into(),
            value: value.into(),
            confidence: 1.0,
            source: FieldSource::Human,
            recorded_at: Utc::now(),
            superseded: false,
        }
    }
}
