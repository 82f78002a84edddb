//! BPMN XML access layer
//!
//! Parses BPMN 2.0 documents into an owned element tree and provides
//! path-addressed reads and writes:
//! - tag-set queries in definition order
//! - stable, XPath-like node paths that survive serialization round-trips
//! - attribute writes by path, including the `pm:config` JSON blob variant
//!
//! Namespaces are handled textually: prefixed tag names are compared as
//! strings, with an unprefixed query tag matching any prefix.

pub mod document;
pub mod path;

pub use document::{XmlDocument, XmlElement, XmlNode};
pub use path::{
    attribute, element_at_path, elements_by_tags, set_attribute_at_path, set_pm_config_at_path,
};

use serde::{Deserialize, Serialize};

/// Error while parsing or serializing an XML document.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(String),
    #[error("XML serialize error: {0}")]
    Serialize(String),
}

/// Error while resolving a recorded node path against a document.
///
/// Paths are captured at export time and replayed at import time; a path
/// that no longer resolves means the document structure drifted in between.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum PathError {
    #[error("node path does not resolve: {path}")]
    Unresolved { path: String },
    #[error("malformed node path: {path}")]
    Malformed { path: String },
    #[error("invalid pm:config JSON at {path}: {reason}")]
    Config { path: String, reason: String },
}
