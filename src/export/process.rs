//! Process exporter variant, the richest of the set.
//!
//! Export discovers: owning user, categories, global signals, notification
//! settings, the cancel and request-detail screens, locally-defined
//! subprocesses, and per-element user/group task assignments. Import
//! re-attaches all of it against the target installation, rewriting the
//! BPMN document's embedded references to the newly assigned ids.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::signals::{SignalScope, signals_referenced_by_process};
use super::tree::{DependentType, ExportedEntity};
use super::{ExportContext, ExportError};
use crate::import::{ImportContext, ImportError};
use crate::models::{Entity, EntityKind, NotificationSetting, Process, SignalData};
use crate::repository::{EntityRepository, RepositoryError, SignalStore};
use crate::validation::validate_signal;
use crate::xml::{
    XmlDocument, XmlElement, attribute, elements_by_tags, set_attribute_at_path,
    set_pm_config_at_path,
};

/// Element kinds that can carry task assignments.
const ASSIGNABLE_TAGS: [&str; 3] = ["bpmn:task", "bpmn:manualTask", "bpmn:callActivity"];

/// Reference names used on process nodes.
const REF_GLOBAL_SIGNALS: &str = "global-signals";
const REF_NOTIFICATION_SETTINGS: &str = "notification_settings";

pub(crate) fn export<R: EntityRepository>(
    context: &mut ExportContext<R>,
    key: Uuid,
    process: &Process,
) -> Result<(), ExportError> {
    tracing::info!(id = process.id, name = %process.name, "exporting process");
    let document = XmlDocument::parse(&process.bpmn)?;

    if let Some(owner_id) = process.owner_user_id {
        let owner = context
            .repository()
            .find(EntityKind::User, owner_id)
            .ok_or(ExportError::MissingEntity {
                kind: EntityKind::User,
                id: owner_id,
            })?;
        context.add_dependent(key, DependentType::User, &owner, serde_json::Value::Null)?;
    }

    for category_id in &process.category_ids {
        let category = context
            .repository()
            .find(EntityKind::Category, *category_id)
            .ok_or(ExportError::MissingEntity {
                kind: EntityKind::Category,
                id: *category_id,
            })?;
        context.add_dependent(key, DependentType::Category, &category, serde_json::Value::Null)?;
    }

    export_signals(context, key, &document);
    export_assignments(context, key, &document)?;

    context.add_reference(
        key,
        REF_NOTIFICATION_SETTINGS,
        serde_json::to_value(&process.notification_settings)
            .map_err(|e| ExportError::Serialization(e.to_string()))?,
    );

    if let Some(screen_id) = process.cancel_screen_id {
        let screen = find_screen(context.repository(), screen_id)?;
        context.add_dependent(key, DependentType::CancelScreen, &screen, serde_json::Value::Null)?;
    }
    if let Some(screen_id) = process.request_detail_screen_id {
        let screen = find_screen(context.repository(), screen_id)?;
        context.add_dependent(
            key,
            DependentType::RequestDetailScreen,
            &screen,
            serde_json::Value::Null,
        )?;
    }

    export_subprocesses(context, key, &document)?;

    Ok(())
}

fn find_screen<R: EntityRepository>(repository: &R, id: i64) -> Result<Entity, ExportError> {
    repository
        .find(EntityKind::Screen, id)
        .ok_or(ExportError::MissingEntity {
            kind: EntityKind::Screen,
            id,
        })
}

/// Only globally scoped signals travel with the package. Processes reached
/// through scoped signals are not exported yet.
fn export_signals<R: EntityRepository>(
    context: &mut ExportContext<R>,
    key: Uuid,
    document: &XmlDocument,
) {
    let mut global_signals = Vec::new();
    for reference in signals_referenced_by_process(document) {
        match reference.scope {
            SignalScope::Global => global_signals.push(
                serde_json::to_value(&reference.signal)
                    .expect("signal definitions serialize to JSON objects"),
            ),
            SignalScope::Scoped => {}
        }
    }
    context.add_reference(key, REF_GLOBAL_SIGNALS, serde_json::Value::Array(global_signals));
}

/// Per-path user/group assignment lists, split into one dependent edge per
/// referenced account. A user or group that no longer exists is skipped:
/// a stale assignment must not abort the export.
fn export_assignments<R: EntityRepository>(
    context: &mut ExportContext<R>,
    key: Uuid,
    document: &XmlDocument,
) -> Result<(), ExportError> {
    for (path, assignment) in assignments_by_path(document) {
        let meta = serde_json::json!({
            "path": path.as_str(),
            "assignmentType": assignment.assignment_type,
        });

        for user_id in assignment.user_ids {
            match context.repository().find(EntityKind::User, user_id) {
                Some(user) => {
                    context.add_dependent(key, DependentType::UserAssignment, &user, meta.clone())?;
                }
                None => tracing::warn!(user_id, %path, "assigned user not found; skipping"),
            }
        }

        for group_id in assignment.group_ids {
            match context.repository().find(EntityKind::Group, group_id) {
                Some(group) => {
                    context.add_dependent(key, DependentType::GroupAssignment, &group, meta.clone())?;
                }
                None => tracing::warn!(group_id, %path, "assigned group not found; skipping"),
            }
        }
    }
    Ok(())
}

/// Subprocesses are `callActivity` elements whose `calledElement` is
/// `ProcessId-<n>` with a numeric `<n>` naming a local process. A literal,
/// a malformed value, or a process owned by an installed package is a
/// normal non-subprocess call activity and is skipped.
fn export_subprocesses<R: EntityRepository>(
    context: &mut ExportContext<R>,
    key: Uuid,
    document: &XmlDocument,
) -> Result<(), ExportError> {
    for (path, process) in subprocesses_by_path(context.repository(), document) {
        context.add_dependent(
            key,
            DependentType::SubProcess,
            &Entity::Process(process),
            serde_json::json!({ "path": path }),
        )?;
    }
    Ok(())
}

fn subprocesses_by_path<R: EntityRepository>(
    repository: &R,
    document: &XmlDocument,
) -> Vec<(String, Process)> {
    let mut found = Vec::new();
    for (path, element) in elements_by_tags(document, &["bpmn:callActivity"]) {
        let Some(called) = attribute(element, "calledElement") else {
            continue;
        };

        let parts: Vec<&str> = called.split('-').collect();
        if parts.len() != 2 {
            continue; // not a subprocess
        }
        let Ok(id) = parts[1].parse::<i64>() else {
            continue; // not a subprocess
        };

        let Some(Entity::Process(process)) = repository.find(EntityKind::Process, id) else {
            tracing::warn!(process_id = id, %path, "called process not found; skipping");
            continue;
        };
        if process.package_key.is_some() {
            continue; // belongs to an installed package
        }

        found.push((path, process));
    }
    found
}

struct ElementAssignment {
    user_ids: Vec<i64>,
    group_ids: Vec<i64>,
    assignment_type: Option<String>,
}

fn assignments_by_path(document: &XmlDocument) -> Vec<(String, ElementAssignment)> {
    elements_by_tags(document, &ASSIGNABLE_TAGS)
        .into_iter()
        .map(|(path, element)| (path, element_assignment(element)))
        .collect()
}

fn element_assignment(element: &XmlElement) -> ElementAssignment {
    ElementAssignment {
        user_ids: parse_id_list(attribute(element, "pm:assignedUsers")),
        group_ids: parse_id_list(attribute(element, "pm:assignedGroups")),
        assignment_type: attribute(element, "pm:assignment").map(str::to_string),
    }
}

fn parse_id_list(value: Option<&str>) -> Vec<i64> {
    value
        .unwrap_or_default()
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

pub(crate) fn materialize<R: EntityRepository>(
    repository: &mut R,
    process: Process,
) -> Result<Entity, ImportError> {
    let created = repository.create(Entity::Process(Process { id: 0, ..process }))?;
    Ok(created)
}

/// Validation problems with the node's exported global signals against the
/// signals already present in the store. Shared between the importer's
/// preflight (before any write) and the import step itself.
pub(crate) fn signal_validation_errors(
    node: &ExportedEntity,
    existing: &[SignalData],
) -> Vec<String> {
    let mut errors = Vec::new();
    for signal in exported_signals(node) {
        if existing.iter().any(|s| s.id == signal.id) {
            continue; // already present; creation will be a no-op
        }
        errors.extend(
            validate_signal(&signal, existing)
                .into_iter()
                .map(|e| e.to_string()),
        );
    }
    errors
}

fn exported_signals(node: &ExportedEntity) -> Vec<SignalData> {
    node.reference(REF_GLOBAL_SIGNALS)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

pub(crate) fn import<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
) -> Result<(), ImportError> {
    let Entity::Process(mut process) = context.draft(node.key)? else {
        return Err(ImportError::manifest(format!(
            "node {} is not a process",
            node.key
        )));
    };
    tracing::info!(id = process.id, name = %process.name, "importing process");

    // 1. Owning user.
    if let Some(dep) = node.dependents_of(DependentType::User).next() {
        process.owner_user_id = Some(context.resolved_id(node, dep)?);
    }

    // 2. Category associations.
    process.category_ids = node
        .dependents_of(DependentType::Category)
        .map(|dep| context.resolved_id(node, dep))
        .collect::<Result<Vec<_>, _>>()?;

    // 3. Global signals.
    import_signals(context, node)?;

    // 4. Screen references.
    for dep in node.dependents_of(DependentType::CancelScreen) {
        process.cancel_screen_id = Some(context.resolved_id(node, dep)?);
    }
    for dep in node.dependents_of(DependentType::RequestDetailScreen) {
        process.request_detail_screen_id = Some(context.resolved_id(node, dep)?);
    }

    // 5. Subprocess references, then assignments, rewritten into the BPMN
    // document. All ids are already assigned at this point.
    let mut document = XmlDocument::parse(&process.bpmn)?;
    import_subprocesses(context, node, &mut document)?;
    import_assignments(context, node, &mut document)?;
    process.bpmn = document.to_xml()?;

    // 6. Notification settings, replaced wholesale with the exported set,
    // re-pointed at the new process id.
    let mut settings: Vec<NotificationSetting> = node
        .reference(REF_NOTIFICATION_SETTINGS)
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ImportError::manifest(format!("invalid notification settings: {e}")))?
        .unwrap_or_default();
    for setting in &mut settings {
        setting.process_id = Some(process.id);
    }
    process.notification_settings = settings;

    context.save(Entity::Process(process))
}

fn import_signals<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
) -> Result<(), ImportError> {
    let existing = context.signals().signals();
    let errors = signal_validation_errors(node, &existing);
    if !errors.is_empty() {
        return Err(ImportError::Validation(errors));
    }

    for signal in exported_signals(node) {
        if context.signals().find_signal(&signal.id).is_some() {
            continue;
        }
        tracing::info!(signal = %signal.id, "creating global signal");
        context
            .signals_mut()
            .add_signal(signal.clone())
            .map_err(|e| match e {
                RepositoryError::DuplicateSignal { id } => ImportError::SignalConflict { id },
                other => ImportError::Repository(other),
            })?;
    }
    Ok(())
}

fn import_subprocesses<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
    document: &mut XmlDocument,
) -> Result<(), ImportError> {
    for dep in node.dependents_of(DependentType::SubProcess) {
        let path = meta_str(&dep.meta, "path")?;
        let Ok(new_id) = context.resolved_id(node, dep) else {
            // Discarded subprocess: leave the call activity pointing at its
            // original target.
            tracing::warn!(path, "subprocess not imported; call activity left untouched");
            continue;
        };

        let called = format!("ProcessId-{new_id}");
        set_attribute_at_path(document, path, "calledElement", &called)?;
        set_pm_config_at_path(document, path, "calledElement", &serde_json::json!(called))?;
        set_pm_config_at_path(document, path, "processId", &serde_json::json!(new_id))?;
    }
    Ok(())
}

/// Re-applies task assignments: resolved ids are batched per element path
/// and written back as consolidated comma-joined lists, together with the
/// assignment type captured for that path at export.
fn import_assignments<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
    document: &mut XmlDocument,
) -> Result<(), ImportError> {
    let users = collect_assignments(context, node, DependentType::UserAssignment)?;
    let groups = collect_assignments(context, node, DependentType::GroupAssignment)?;

    for (path, batch) in &users {
        write_assignment(document, path, batch, "pm:assignedUsers")?;
    }
    for (path, batch) in &groups {
        write_assignment(document, path, batch, "pm:assignedGroups")?;
    }
    Ok(())
}

struct AssignmentBatch {
    assignment_type: Option<String>,
    ids: Vec<i64>,
}

fn collect_assignments<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
    dependent_type: DependentType,
) -> Result<BTreeMap<String, AssignmentBatch>, ImportError> {
    let mut by_path: BTreeMap<String, AssignmentBatch> = BTreeMap::new();
    for dep in node.dependents_of(dependent_type) {
        let path = meta_str(&dep.meta, "path")?;
        let Ok(id) = context.resolved_id(node, dep) else {
            // A deleted account must not abort the whole import.
            tracing::warn!(path, "assignment target not resolved; skipping");
            continue;
        };
        let batch = by_path
            .entry(path.to_string())
            .or_insert_with(|| AssignmentBatch {
                assignment_type: dep
                    .meta
                    .get("assignmentType")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                ids: Vec::new(),
            });
        batch.ids.push(id);
    }
    Ok(by_path)
}

fn write_assignment(
    document: &mut XmlDocument,
    path: &str,
    batch: &AssignmentBatch,
    list_attribute: &str,
) -> Result<(), ImportError> {
    if let Some(assignment_type) = &batch.assignment_type {
        set_attribute_at_path(document, path, "pm:assignment", assignment_type)?;
    }
    let joined = batch
        .ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    set_attribute_at_path(document, path, list_attribute, &joined)?;
    Ok(())
}

fn meta_str<'a>(meta: &'a serde_json::Value, field: &str) -> Result<&'a str, ImportError> {
    meta.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        ImportError::manifest(format!("dependent metadata is missing '{field}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list_tolerates_blanks_and_junk() {
        assert_eq!(parse_id_list(Some("1,2,5")), vec![1, 2, 5]);
        assert_eq!(parse_id_list(Some("")), Vec::<i64>::new());
        assert_eq!(parse_id_list(Some("3, x ,4")), vec![3, 4]);
        assert_eq!(parse_id_list(None), Vec::<i64>::new());
    }

    #[test]
    fn test_called_element_shapes() {
        // The discovery rule: exactly two '-'-separated parts with a numeric
        // second part. Everything else is not a subprocess.
        for (value, is_candidate) in [
            ("ProcessId-12", true),
            ("ProcessId-12-extra", false),
            ("some-literal", false),
            ("ProcessId-", false),
            ("plain", false),
        ] {
            let parts: Vec<&str> = value.split('-').collect();
            let candidate = parts.len() == 2 && parts[1].parse::<i64>().is_ok();
            assert_eq!(candidate, is_candidate, "{value}");
        }
    }
}
