//! Package manifest (de)serialization.
//!
//! The wire format is a nested JSON tree rooted at one entity:
//! `{root, encrypted, export: {type, key, attributes, dependents, references}}`.
//! Sealed manifests replace `export` with `ciphertext`/`salt`
//! (see [`crate::crypto`]).
//!
//! A nested tree cannot literally encode cyclic graphs (mutually calling
//! subprocesses), so the first occurrence of a node is emitted in full and
//! every later occurrence as a `{type, key}` stub. Deserialization rebuilds
//! the flat arena by resolving stubs against the nodes already absorbed.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::export::{Dependent, DependencyTree, DependentType, ExportedEntity};
use crate::models::EntityKind;

/// Error while interpreting a manifest.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Malformed(String),
}

/// Top-level manifest envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Key of the tree's root entity.
    pub root: Uuid,
    #[serde(default)]
    pub encrypted: bool,
    /// The dependency tree; absent when the manifest is sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ManifestNode>,
    /// Base64 of `nonce ‖ ciphertext ‖ tag`; present when sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    /// Base64 key-derivation salt; present when sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// One entity node in the nested tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub key: Uuid,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub attributes: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<ManifestDependent>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, serde_json::Value>,
}

/// One dependent edge with its embedded child node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDependent {
    #[serde(rename = "type")]
    pub dependent_type: DependentType,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
    pub entity: ManifestNode,
}

impl Manifest {
    /// Serialize a dependency tree into the nested manifest form.
    pub fn from_tree(tree: &DependencyTree) -> Self {
        let mut emitted = HashSet::new();
        Self {
            root: tree.root(),
            encrypted: false,
            export: Some(emit(tree, tree.root(), &mut emitted)),
            ciphertext: None,
            salt: None,
        }
    }

    /// Rebuild the flat dependency tree from the nested form.
    pub fn to_tree(&self) -> Result<DependencyTree, ManifestError> {
        let node = self
            .export
            .as_ref()
            .ok_or_else(|| ManifestError::Malformed("manifest has no export tree".to_string()))?;
        if node.key != self.root {
            return Err(ManifestError::Malformed(format!(
                "root mismatch: manifest says {}, tree starts at {}",
                self.root, node.key
            )));
        }

        let mut tree = DependencyTree::new(self.root);
        let mut absorbed = HashSet::new();
        absorb(node, &mut tree, &mut absorbed)?;

        // Every stub must have been backed by a full node somewhere.
        for entity in tree.iter() {
            if entity.attributes.is_null() {
                return Err(ManifestError::Malformed(format!(
                    "node {} is only ever referenced, never defined",
                    entity.key
                )));
            }
        }
        Ok(tree)
    }
}

fn emit(tree: &DependencyTree, key: Uuid, emitted: &mut HashSet<Uuid>) -> ManifestNode {
    let node = tree
        .get(key)
        .expect("dependent edges only reference nodes in the tree");

    if !emitted.insert(key) {
        // Already emitted in full: a stub is enough.
        return ManifestNode {
            kind: node.kind,
            key,
            attributes: serde_json::Value::Null,
            dependents: Vec::new(),
            references: BTreeMap::new(),
        };
    }

    ManifestNode {
        kind: node.kind,
        key,
        attributes: node.attributes.clone(),
        dependents: node
            .dependents
            .iter()
            .map(|dep| ManifestDependent {
                dependent_type: dep.dependent_type,
                meta: dep.meta.clone(),
                entity: emit(tree, dep.child, emitted),
            })
            .collect(),
        references: node.references.clone(),
    }
}

fn absorb(
    node: &ManifestNode,
    tree: &mut DependencyTree,
    absorbed: &mut HashSet<Uuid>,
) -> Result<(), ManifestError> {
    let is_stub = node.attributes.is_null() && node.dependents.is_empty();

    match tree.get(node.key) {
        Some(existing) if existing.kind != node.kind => {
            return Err(ManifestError::Malformed(format!(
                "node {} appears as both {} and {}",
                node.key, existing.kind, node.kind
            )));
        }
        Some(_) => {}
        None => tree.insert(ExportedEntity::new(
            node.kind,
            node.key,
            node.attributes.clone(),
        )),
    }

    if is_stub || !absorbed.insert(node.key) {
        return Ok(());
    }

    // First full occurrence: authoritative for attributes, references and
    // edges (a stub may have been absorbed ahead of it).
    let entity = tree
        .get_mut(node.key)
        .expect("node inserted above");
    entity.attributes = node.attributes.clone();
    entity.references = node.references.clone();
    entity.dependents = node
        .dependents
        .iter()
        .map(|dep| Dependent {
            dependent_type: dep.dependent_type,
            meta: dep.meta.clone(),
            child: dep.entity.key,
        })
        .collect();

    for dep in &node.dependents {
        absorb(&dep.entity, tree, absorbed)?;
    }
    Ok(())
}
