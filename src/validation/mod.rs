//! Validation utilities
//!
//! Signal definitions are validated before they are created in the target
//! installation; failures are collected and surfaced together rather than
//! one at a time.

pub mod signals;

pub use signals::{SignalValidationError, validate_signal};
