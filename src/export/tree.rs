//! Dependency tree built during an export or consumed during an import.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EntityKind;

/// Namespace for deterministic manifest keys: re-exporting the same entity
/// from the same installation yields the same key.
const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_1b6a_04d3_4e8b_b21f_7c5d83a90e14);

/// Manifest key for an entity, derived from its kind and source id (UUID v5).
pub fn entity_key(kind: EntityKind, id: i64) -> Uuid {
    Uuid::new_v5(&KEY_NAMESPACE, format!("{kind}:{id}").as_bytes())
}

/// Kind of edge from a parent entity to one of its dependents.
///
/// The type plus the edge metadata is the contract between discovery
/// (export) and resolution (import): whatever a variant registers under a
/// type is handed back to it, already materialized, under the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependentType {
    /// Owning user of the entity.
    User,
    Category,
    CancelScreen,
    RequestDetailScreen,
    /// Screen referenced from another screen's config JSON.
    NestedScreen,
    /// Process referenced through a `callActivity` element.
    SubProcess,
    UserAssignment,
    GroupAssignment,
}

/// A directed edge to a child node, with relocation metadata.
///
/// For assignments the metadata is `{path, assignmentType}`; for
/// subprocesses `{path}`; for nested screens `{pointer}` into the config
/// JSON. Structural edges (owner, screens, categories) carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    #[serde(rename = "type")]
    pub dependent_type: DependentType,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
    pub child: Uuid,
}

/// One exported entity: attributes snapshot plus its outgoing edges and
/// opaque references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEntity {
    pub kind: EntityKind,
    pub key: Uuid,
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub dependents: Vec<Dependent>,
    #[serde(default)]
    pub references: BTreeMap<String, serde_json::Value>,
}

impl ExportedEntity {
    pub fn new(kind: EntityKind, key: Uuid, attributes: serde_json::Value) -> Self {
        Self {
            kind,
            key,
            attributes,
            dependents: Vec::new(),
            references: BTreeMap::new(),
        }
    }

    /// Edges of one type, in discovery order.
    pub fn dependents_of(
        &self,
        dependent_type: DependentType,
    ) -> impl Iterator<Item = &Dependent> {
        self.dependents
            .iter()
            .filter(move |dep| dep.dependent_type == dependent_type)
    }

    /// Named reference data, if registered.
    pub fn reference(&self, name: &str) -> Option<&serde_json::Value> {
        self.references.get(name)
    }
}

/// The arena of exported entities for one pass, rooted at one of them.
///
/// Keys are stable across the pass; the arena doubles as the memoization
/// cache that keeps cyclic references (mutually calling subprocesses) from
/// recursing forever.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyTree {
    root: Uuid,
    nodes: BTreeMap<Uuid, ExportedEntity>,
}

impl DependencyTree {
    pub fn new(root: Uuid) -> Self {
        Self {
            root,
            nodes: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> Uuid {
        self.root
    }

    pub fn contains(&self, key: Uuid) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn insert(&mut self, node: ExportedEntity) {
        self.nodes.insert(node.key, node);
    }

    pub fn get(&self, key: Uuid) -> Option<&ExportedEntity> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: Uuid) -> Option<&mut ExportedEntity> {
        self.nodes.get_mut(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportedEntity> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
