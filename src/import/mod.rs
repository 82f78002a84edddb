//! Import functionality
//!
//! Consumes a package manifest: decrypts it when sealed, rebuilds the
//! dependency tree, materializes every entity against the target
//! installation in children-first order, and drives each exporter variant's
//! import step to patch foreign keys and embedded XML references.

pub mod importer;

pub use importer::{ImportContext, ImportReport, Importer, Preview};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::manifest::ManifestError;
use crate::models::EntityKind;
use crate::repository::RepositoryError;
use crate::xml::{PathError, XmlError};

use crate::export::DependentType;

/// Error during import
///
/// The variants are classed for the HTTP-adjacent boundary: password
/// failures are authentication-shaped (401), validation and structural
/// failures are client errors. See [`ImportError::is_password_error`].
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ImportError {
    #[error("password required")]
    PasswordRequired,
    #[error("incorrect password")]
    IncorrectPassword,
    /// Aggregated entity/signal validation failures.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Xml(#[from] XmlError),
    /// A structurally required dependent did not resolve to an imported
    /// entity (missing from the manifest, or discarded by options).
    #[error("required {dependent_type:?} dependent of {kind} node {key} is not available")]
    MissingDependent {
        kind: EntityKind,
        key: Uuid,
        dependent_type: DependentType,
    },
    /// Another actor created the same signal id concurrently.
    #[error("signal id conflict: {id}")]
    SignalConflict { id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ImportError {
    /// `true` for failures the caller should answer with an
    /// authentication-style response (prompt for the password again).
    pub fn is_password_error(&self) -> bool {
        matches!(
            self,
            ImportError::PasswordRequired | ImportError::IncorrectPassword
        )
    }

    pub(crate) fn manifest(message: impl Into<String>) -> Self {
        ImportError::Manifest(ManifestError::Malformed(message.into()))
    }
}

impl From<CryptoError> for ImportError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::PasswordRequired => ImportError::PasswordRequired,
            CryptoError::IncorrectPassword => ImportError::IncorrectPassword,
            CryptoError::Envelope(message) => ImportError::manifest(message),
        }
    }
}

/// What to do with one manifest node on import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Import the node (create or match it in the target installation).
    #[default]
    Update,
    /// Skip the node. Fatal when something structurally requires it.
    Discard,
}

/// Caller-supplied import options: the manifest password (when sealed) and
/// per-node modes keyed by manifest key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<Uuid, ImportMode>,
}

impl Options {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn mode(&self, key: Uuid) -> ImportMode {
        self.modes.get(&key).copied().unwrap_or_default()
    }
}
