//! Process Package SDK - Shared library for moving BPM processes between installations
//!
//! Provides unified interfaces for:
//! - Exporting a process and everything it transitively depends on
//!   (subprocesses, screens, users, groups, categories, global signals)
//!   into a portable manifest
//! - Importing a manifest against a different installation: id remapping,
//!   BPMN XML patching, referential integrity
//! - Password-sealed manifest envelopes
//! - Path-addressed BPMN XML access
//!
//! Persistence stays on the application's side of the
//! [`EntityRepository`]/[`SignalStore`] traits; in-memory implementations
//! are included for tests and embedded use.

pub mod crypto;
pub mod export;
pub mod import;
pub mod manifest;
pub mod models;
pub mod repository;
pub mod validation;
pub mod xml;

// Re-export commonly used types
pub use crypto::{CryptoError, ExportEncrypted};
pub use export::{
    DependencyTree, Dependent, DependentType, ExportError, ExportedEntity, PackageExporter,
    SignalReference, SignalScope,
};
pub use import::{ImportError, ImportMode, ImportReport, Importer, Options, Preview};
pub use manifest::{Manifest, ManifestError, ManifestNode};
pub use repository::{
    EntityRepository, InMemoryRepository, InMemorySignalStore, RepositoryError, SignalStore,
};
pub use validation::{SignalValidationError, validate_signal};

// Re-export models
pub use models::{
    Category, Entity, EntityKind, Group, NotificationSetting, Process, Screen, SignalData, User,
};
