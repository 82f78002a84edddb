//! Export functionality
//!
//! Walks an entity and everything it transitively depends on, producing a
//! portable manifest:
//! - per-kind exporter variants (process, screen, user, group, category)
//! - the dependency tree / dependent registry they record into
//! - signal scope resolution for BPMN signal references
//!
//! Discovery is memoized per pass, so cyclic references (mutually calling
//! subprocesses) export exactly once each.

pub mod category;
pub mod context;
pub mod group;
pub mod process;
pub mod screen;
pub mod signals;
pub mod tree;
pub mod user;

pub use context::ExportContext;
pub use signals::{SignalReference, SignalScope, signals_referenced_by_process};
pub use tree::{Dependent, DependentType, DependencyTree, ExportedEntity, entity_key};

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::models::{Entity, EntityKind};
use crate::repository::EntityRepository;
use crate::xml::XmlError;

/// Error during export
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ExportError {
    /// A structurally required entity (owner, screen, category) is gone.
    #[error("{kind} {id} referenced by the export was not found")]
    MissingEntity { kind: EntityKind, id: i64 },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Entry point: exports one entity and its dependency graph to a manifest.
pub struct PackageExporter<'a, R: EntityRepository> {
    repository: &'a R,
}

impl<'a, R: EntityRepository> PackageExporter<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Export `entity` with all of its dependents and references.
    pub fn export(&self, entity: &Entity) -> Result<Manifest, ExportError> {
        let mut context = ExportContext::new(self.repository, entity);
        let root = context.export_entity(entity)?;
        let tree = context.into_tree();
        tracing::info!(
            root = %root,
            entities = tree.len(),
            "export complete"
        );
        Ok(Manifest::from_tree(&tree))
    }
}
