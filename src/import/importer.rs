//! Import orchestration.
//!
//! Three phases, so XML is never patched before every id it might need
//! exists:
//! 1. decrypt (when sealed) and rebuild the flat dependency tree, then
//!    preflight it, so structural and validation failures surface before
//!    the first write;
//! 2. materialize a target-installation id for every node, children first
//!    (post-order over the dependency graph);
//! 3. run each variant's import step in the same order, patching foreign
//!    keys and BPMN references, and persist.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::DiGraph;
use petgraph::visit::DfsPostOrder;
use uuid::Uuid;

use super::{ImportError, ImportMode, Options};
use crate::crypto::ExportEncrypted;
use crate::export::tree::{Dependent, DependencyTree, DependentType, ExportedEntity};
use crate::export::{category, group, process, screen, user};
use crate::manifest::Manifest;
use crate::models::{Entity, EntityKind};
use crate::repository::{EntityRepository, SignalStore};

/// Read-only view of what an import would do.
#[derive(Debug, Clone)]
pub struct Preview {
    pub root: Uuid,
    /// The decrypted manifest, tree included.
    pub manifest: Manifest,
}

/// Outcome of a completed import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub root: Uuid,
    /// New target-installation id per manifest key.
    pub ids: BTreeMap<Uuid, i64>,
    /// Nodes skipped because options discarded them.
    pub skipped: Vec<Uuid>,
}

impl ImportReport {
    /// Id assigned to the root entity.
    pub fn root_id(&self) -> Option<i64> {
        self.ids.get(&self.root).copied()
    }
}

/// Imports one manifest into a repository + signal store pair.
pub struct Importer<'a, R: EntityRepository, S: SignalStore> {
    manifest: Manifest,
    options: Options,
    repository: &'a mut R,
    signals: &'a mut S,
}

impl<'a, R: EntityRepository, S: SignalStore> Importer<'a, R, S> {
    pub fn new(
        manifest: Manifest,
        options: Options,
        repository: &'a mut R,
        signals: &'a mut S,
    ) -> Self {
        Self {
            manifest,
            options,
            repository,
            signals,
        }
    }

    /// Decrypt (if needed) and structurally check the manifest without
    /// touching the repository.
    pub fn preview(&self) -> Result<Preview, ImportError> {
        let manifest = self.decrypted()?;
        manifest.to_tree()?;
        Ok(Preview {
            root: manifest.root,
            manifest,
        })
    }

    /// Perform the import.
    pub fn run(&mut self) -> Result<ImportReport, ImportError> {
        let manifest = self.decrypted()?;
        let tree = manifest.to_tree()?;
        let order = import_order(&tree);
        self.preflight(&tree)?;

        let mut context = ImportContext {
            repository: &mut *self.repository,
            signals: &mut *self.signals,
            options: &self.options,
            ids: BTreeMap::new(),
            drafts: HashMap::new(),
            discarded: BTreeSet::new(),
        };

        for key in &order {
            let node = tree.get(*key).expect("order only walks tree nodes");
            context.materialize(node)?;
        }

        for key in &order {
            if context.discarded.contains(key) {
                continue;
            }
            let node = tree.get(*key).expect("order only walks tree nodes");
            match node.kind {
                EntityKind::Process => process::import(&mut context, node)?,
                EntityKind::Screen => screen::import(&mut context, node)?,
                // Account entities are fully handled by materialization.
                EntityKind::User | EntityKind::Group | EntityKind::Category => {}
            }
        }

        tracing::info!(
            root = %tree.root(),
            imported = context.ids.len(),
            skipped = context.discarded.len(),
            "import complete"
        );
        Ok(ImportReport {
            root: tree.root(),
            ids: context.ids,
            skipped: context.discarded.into_iter().collect(),
        })
    }

    fn decrypted(&self) -> Result<Manifest, ImportError> {
        if !self.manifest.encrypted {
            return Ok(self.manifest.clone());
        }
        let password = self
            .options
            .password
            .as_deref()
            .ok_or(ImportError::PasswordRequired)?;
        Ok(ExportEncrypted::new(password).decrypt(&self.manifest)?)
    }

    /// Everything that can be checked before the first write: node
    /// attributes must parse, structurally required dependents must be
    /// importable, and exported signals must validate (aggregated).
    fn preflight(&self, tree: &DependencyTree) -> Result<(), ImportError> {
        if self.options.mode(tree.root()) == ImportMode::Discard {
            return Err(ImportError::manifest("the root entity cannot be discarded"));
        }

        let existing_signals = self.signals.signals();
        let mut validation_errors = Vec::new();

        for node in tree.iter() {
            if self.options.mode(node.key) == ImportMode::Discard {
                continue;
            }

            Entity::from_attributes(node.kind, &node.attributes).map_err(|e| {
                ImportError::manifest(format!(
                    "invalid attributes for {} node {}: {e}",
                    node.kind, node.key
                ))
            })?;

            if node.kind == EntityKind::Process {
                validation_errors.extend(process::signal_validation_errors(node, &existing_signals));
            }

            for dep in &node.dependents {
                if !is_structural(dep.dependent_type) {
                    continue;
                }
                let importable =
                    tree.contains(dep.child) && self.options.mode(dep.child) != ImportMode::Discard;
                if !importable {
                    return Err(ImportError::MissingDependent {
                        kind: node.kind,
                        key: node.key,
                        dependent_type: dep.dependent_type,
                    });
                }
            }
        }

        if !validation_errors.is_empty() {
            return Err(ImportError::Validation(validation_errors));
        }
        Ok(())
    }
}

/// Assignment and subprocess edges tolerate a missing target; everything
/// else is structural.
fn is_structural(dependent_type: DependentType) -> bool {
    !matches!(
        dependent_type,
        DependentType::UserAssignment
            | DependentType::GroupAssignment
            | DependentType::SubProcess
    )
}

/// Children-before-parents walk of the dependency graph. The post-order
/// DFS's visited set is what makes cyclic subprocess graphs terminate.
fn import_order(tree: &DependencyTree) -> Vec<Uuid> {
    let mut graph: DiGraph<Uuid, ()> = DiGraph::new();
    let mut indices = HashMap::new();
    for key in tree.keys() {
        indices.insert(key, graph.add_node(key));
    }
    for node in tree.iter() {
        for dep in &node.dependents {
            if let Some(&child) = indices.get(&dep.child) {
                graph.add_edge(indices[&node.key], child, ());
            }
        }
    }

    let Some(&root) = indices.get(&tree.root()) else {
        return Vec::new();
    };
    let mut order = Vec::with_capacity(tree.len());
    let mut dfs = DfsPostOrder::new(&graph, root);
    while let Some(index) = dfs.next(&graph) {
        order.push(graph[index]);
    }
    order
}

/// Mutable state threaded through the variant import steps of one run.
pub struct ImportContext<'a, R: EntityRepository, S: SignalStore> {
    repository: &'a mut R,
    signals: &'a mut S,
    options: &'a Options,
    ids: BTreeMap<Uuid, i64>,
    drafts: HashMap<Uuid, Entity>,
    discarded: BTreeSet<Uuid>,
}

impl<'a, R: EntityRepository, S: SignalStore> ImportContext<'a, R, S> {
    pub fn signals(&self) -> &S {
        self.signals
    }

    pub fn signals_mut(&mut self) -> &mut S {
        self.signals
    }

    /// The materialized entity for a node, ready for the variant to patch.
    pub fn draft(&self, key: Uuid) -> Result<Entity, ImportError> {
        self.drafts
            .get(&key)
            .cloned()
            .ok_or_else(|| ImportError::manifest(format!("no materialized entity for node {key}")))
    }

    /// Target-installation id the dependent's child resolved to.
    pub fn resolved_id(
        &self,
        node: &ExportedEntity,
        dep: &Dependent,
    ) -> Result<i64, ImportError> {
        self.ids
            .get(&dep.child)
            .copied()
            .ok_or(ImportError::MissingDependent {
                kind: node.kind,
                key: node.key,
                dependent_type: dep.dependent_type,
            })
    }

    pub fn save(&mut self, entity: Entity) -> Result<(), ImportError> {
        self.repository.save(entity)?;
        Ok(())
    }

    fn materialize(&mut self, node: &ExportedEntity) -> Result<(), ImportError> {
        if self.options.mode(node.key) == ImportMode::Discard {
            tracing::warn!(key = %node.key, kind = %node.kind, "node discarded by options");
            self.discarded.insert(node.key);
            return Ok(());
        }

        let entity = Entity::from_attributes(node.kind, &node.attributes)
            .map_err(|e| ImportError::manifest(format!("invalid attributes: {e}")))?;
        let materialized = match entity {
            Entity::Process(p) => process::materialize(self.repository, p)?,
            Entity::Screen(s) => screen::materialize(self.repository, s)?,
            Entity::User(u) => user::materialize(self.repository, u)?,
            Entity::Group(g) => group::materialize(self.repository, g)?,
            Entity::Category(c) => category::materialize(self.repository, c)?,
        };

        tracing::debug!(key = %node.key, kind = %node.kind, id = materialized.id(), "materialized");
        self.ids.insert(node.key, materialized.id());
        self.drafts.insert(node.key, materialized);
        Ok(())
    }
}
