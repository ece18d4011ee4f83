//! Routing thresholds.
//!
//! All values are injected configuration, settable without code change.
//! Defaults mirror the deployment defaults of the intake service
//! (MIN_CONFIDENCE_THRESHOLD / REQUIRED_FIELDS_THRESHOLD environment
//! values plus the priority bands).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Threshold {name} out of range [0,1]: {value}")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("urgent_confidence_threshold ({urgent}) must not exceed high_priority_confidence_threshold ({high})")]
    PriorityBandInverted { urgent: f32, high: f32 },
}

/// Thresholds driving the routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Minimum overall confidence for auto-approval.
    pub min_confidence_threshold: f32,
    /// Minimum per-field confidence every required field must reach.
    pub required_fields_threshold: f32,
    /// Below this overall confidence, review priority is urgent.
    pub urgent_confidence_threshold: f32,
    /// Below this overall confidence (and at or above urgent), priority is high.
    pub high_priority_confidence_threshold: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.7,
            required_fields_threshold: 0.8,
            urgent_confidence_threshold: 0.3,
            high_priority_confidence_threshold: 0.6,
        }
    }
}

impl RoutingConfig {
    /// Validate ranges and band ordering.
    ///
    /// Priority monotonicity in confidence depends on urgent <= high; an
    /// inverted band would let a lower-confidence document queue at a less
    /// urgent priority than a higher-confidence one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("min_confidence_threshold", self.min_confidence_threshold),
            ("required_fields_threshold", self.required_fields_threshold),
            ("urgent_confidence_threshold", self.urgent_confidence_threshold),
            (
                "high_priority_confidence_threshold",
                self.high_priority_confidence_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        if self.urgent_confidence_threshold > self.high_priority_confidence_threshold {
            return Err(ConfigError::PriorityBandInverted {
                urgent: self.urgent_confidence_threshold,
                high: self.high_priority_confidence_threshold,
            });
        }

        Ok(())
    }
}
