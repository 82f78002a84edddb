//! Globally declared signal definitions.

use serde::{Deserialize, Serialize};

/// A signal definition shared across processes.
///
/// Unlike the other entities, signals are keyed by their BPMN id string
/// rather than a database row id, and live in the signal store instead of
/// the entity repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

impl SignalData {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            detail: detail.into(),
        }
    }
}
