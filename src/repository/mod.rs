//! Storage boundary
//!
//! The packaging engine never talks to a database directly; it consumes two
//! narrow traits. The owning application backs them with its persistence
//! layer; [`memory::InMemoryRepository`] and [`memory::InMemorySignalStore`]
//! back them with hash maps for tests and embedded use.

pub mod memory;

pub use memory::{InMemoryRepository, InMemorySignalStore};

use serde::{Deserialize, Serialize};

use crate::models::{Category, Entity, EntityKind, Group, SignalData, User};

/// Error from a repository or signal store operation.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("a signal with id '{id}' already exists")]
    DuplicateSignal { id: String },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Lookup and persistence for the packagable entity kinds.
///
/// `create` assigns the new entity's id; `save` overwrites an existing row.
/// The natural-key finders back import-time matching (users by username,
/// groups and categories by name).
pub trait EntityRepository {
    fn find(&self, kind: EntityKind, id: i64) -> Option<Entity>;

    fn find_user_by_username(&self, username: &str) -> Option<User>;

    fn find_group_by_name(&self, name: &str) -> Option<Group>;

    fn find_category_by_name(&self, name: &str) -> Option<Category>;

    fn create(&mut self, entity: Entity) -> Result<Entity, RepositoryError>;

    fn save(&mut self, entity: Entity) -> Result<(), RepositoryError>;
}

/// Store of globally declared signals, keyed by their BPMN id string.
///
/// Passed explicitly into the importer; one import owns one store reference.
/// `add_signal` must reject duplicate ids so a concurrent creation race
/// surfaces instead of silently overwriting.
pub trait SignalStore {
    fn find_signal(&self, id: &str) -> Option<SignalData>;

    fn add_signal(&mut self, signal: SignalData) -> Result<(), RepositoryError>;

    fn signals(&self) -> Vec<SignalData>;
}
