//! Signal definition validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SignalData;

/// Maximum length for signal ids
pub const MAX_SIGNAL_ID_LENGTH: usize = 255;

/// Maximum length for signal names
pub const MAX_SIGNAL_NAME_LENGTH: usize = 255;

/// Signal ids are BPMN element ids: a letter or underscore followed by
/// letters, digits, underscores, dots or hyphens.
static RE_SIGNAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("Invalid regex"));

/// Errors that can occur while validating a signal definition.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum SignalValidationError {
    #[error("signal id cannot be empty")]
    EmptyId,
    #[error("signal id '{id}' is not a valid identifier")]
    InvalidId { id: String },
    #[error("signal {field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("signal '{id}' has no name")]
    EmptyName { id: String },
    #[error("signal name '{name}' is already used by signal '{existing_id}'")]
    NameTaken { name: String, existing_id: String },
}

/// Validate a signal definition against the signals already present.
///
/// Returns every problem found, not just the first: callers aggregate
/// failures across a whole import before reporting.
pub fn validate_signal(
    signal: &SignalData,
    existing: &[SignalData],
) -> Vec<SignalValidationError> {
    let mut errors = Vec::new();

    if signal.id.is_empty() {
        errors.push(SignalValidationError::EmptyId);
    } else if !RE_SIGNAL_ID.is_match(&signal.id) {
        errors.push(SignalValidationError::InvalidId {
            id: signal.id.clone(),
        });
    }
    if signal.id.len() > MAX_SIGNAL_ID_LENGTH {
        errors.push(SignalValidationError::TooLong {
            field: "id",
            max: MAX_SIGNAL_ID_LENGTH,
            actual: signal.id.len(),
        });
    }

    if signal.name.is_empty() {
        errors.push(SignalValidationError::EmptyName {
            id: signal.id.clone(),
        });
    }
    if signal.name.len() > MAX_SIGNAL_NAME_LENGTH {
        errors.push(SignalValidationError::TooLong {
            field: "name",
            max: MAX_SIGNAL_NAME_LENGTH,
            actual: signal.name.len(),
        });
    }

    if let Some(taken) = existing
        .iter()
        .find(|s| s.id != signal.id && s.name == signal.name && !signal.name.is_empty())
    {
        errors.push(SignalValidationError::NameTaken {
            name: signal.name.clone(),
            existing_id: taken.id.clone(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_signal_passes() {
        let signal = SignalData::new("order_shipped", "Order shipped", "");
        assert!(validate_signal(&signal, &[]).is_empty());
    }

    #[test]
    fn test_invalid_id_and_empty_name_both_reported() {
        let signal = SignalData::new("9 bad id", "", "");
        let errors = validate_signal(&signal, &[]);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], SignalValidationError::InvalidId { .. }));
        assert!(matches!(errors[1], SignalValidationError::EmptyName { .. }));
    }

    #[test]
    fn test_duplicate_name_detected() {
        let existing = vec![SignalData::new("a", "Shipped", "")];
        let signal = SignalData::new("b", "Shipped", "");
        let errors = validate_signal(&signal, &existing);
        assert!(matches!(errors[0], SignalValidationError::NameTaken { .. }));
    }
}
