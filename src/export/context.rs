//! Per-pass export state: memoized recursion plus the dependent registry.

use uuid::Uuid;

use super::tree::{Dependent, DependencyTree, DependentType, ExportedEntity, entity_key};
use super::{ExportError, category, group, process, screen, user};
use crate::models::Entity;
use crate::repository::EntityRepository;

/// Owns the dependency tree while exporter variants populate it.
///
/// One context per export call; never shared across passes. The arena check
/// in [`export_entity`](Self::export_entity) is what makes re-entrant and
/// cyclic entity references terminate.
pub struct ExportContext<'a, R: EntityRepository> {
    repository: &'a R,
    tree: DependencyTree,
}

impl<'a, R: EntityRepository> ExportContext<'a, R> {
    pub fn new(repository: &'a R, root: &Entity) -> Self {
        Self {
            repository,
            tree: DependencyTree::new(entity_key(root.kind(), root.id())),
        }
    }

    pub fn repository(&self) -> &'a R {
        self.repository
    }

    pub fn into_tree(self) -> DependencyTree {
        self.tree
    }

    /// Export an entity, reusing the already-built node when this pass has
    /// seen it before.
    ///
    /// The node is registered *before* its variant walks dependents, so a
    /// cycle back to it resolves from the arena instead of recursing.
    pub fn export_entity(&mut self, entity: &Entity) -> Result<Uuid, ExportError> {
        let key = entity_key(entity.kind(), entity.id());
        if self.tree.contains(key) {
            return Ok(key);
        }

        tracing::debug!(kind = %entity.kind(), id = entity.id(), key = %key, "exporting entity");
        self.tree
            .insert(ExportedEntity::new(entity.kind(), key, entity.attributes()));

        match entity {
            Entity::Process(p) => process::export(self, key, p)?,
            Entity::Screen(s) => screen::export(self, key, s)?,
            Entity::User(u) => user::export(self, key, u),
            Entity::Group(g) => group::export(self, key, g),
            Entity::Category(c) => category::export(self, key, c),
        }

        Ok(key)
    }

    /// Recursively export `child`, then record an edge of `dependent_type`
    /// from `parent` to it with the given relocation metadata.
    pub fn add_dependent(
        &mut self,
        parent: Uuid,
        dependent_type: DependentType,
        child: &Entity,
        meta: serde_json::Value,
    ) -> Result<Uuid, ExportError> {
        let child_key = self.export_entity(child)?;
        self.parent_node(parent).dependents.push(Dependent {
            dependent_type,
            meta,
            child: child_key,
        });
        Ok(child_key)
    }

    /// Store opaque reference data on `parent`, overwriting any previous
    /// value under the same name.
    pub fn add_reference(&mut self, parent: Uuid, name: &str, data: serde_json::Value) {
        self.parent_node(parent)
            .references
            .insert(name.to_string(), data);
    }

    fn parent_node(&mut self, parent: Uuid) -> &mut ExportedEntity {
        // export_entity registers a node before running its variant, so a
        // variant's own key always resolves.
        self.tree
            .get_mut(parent)
            .expect("parent node registered before its exporter runs")
    }
}
