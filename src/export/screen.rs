//! Screen exporter variant.
//!
//! Beyond its categories, a screen can embed references to other screens in
//! its config JSON as `{"screen": <id>}` objects (nested forms, display
//! fragments). Each is exported as a NESTED_SCREEN dependent carrying the
//! JSON pointer of the referencing slot, so import can rewrite it in place.

use uuid::Uuid;

use super::tree::{DependentType, ExportedEntity};
use super::{ExportContext, ExportError};
use crate::import::{ImportContext, ImportError};
use crate::models::{Entity, EntityKind, Screen};
use crate::repository::{EntityRepository, SignalStore};

pub(crate) fn export<R: EntityRepository>(
    context: &mut ExportContext<R>,
    key: Uuid,
    screen: &Screen,
) -> Result<(), ExportError> {
    for category_id in &screen.category_ids {
        let category = context
            .repository()
            .find(EntityKind::Category, *category_id)
            .ok_or(ExportError::MissingEntity {
                kind: EntityKind::Category,
                id: *category_id,
            })?;
        context.add_dependent(key, DependentType::Category, &category, serde_json::Value::Null)?;
    }

    for (pointer, screen_id) in nested_screen_refs(&screen.config) {
        let nested = context
            .repository()
            .find(EntityKind::Screen, screen_id)
            .ok_or(ExportError::MissingEntity {
                kind: EntityKind::Screen,
                id: screen_id,
            })?;
        context.add_dependent(
            key,
            DependentType::NestedScreen,
            &nested,
            serde_json::json!({ "pointer": pointer }),
        )?;
    }

    Ok(())
}

pub(crate) fn materialize<R: EntityRepository>(
    repository: &mut R,
    screen: Screen,
) -> Result<Entity, ImportError> {
    let created = repository.create(Entity::Screen(Screen { id: 0, ..screen }))?;
    Ok(created)
}

pub(crate) fn import<R: EntityRepository, S: SignalStore>(
    context: &mut ImportContext<'_, R, S>,
    node: &ExportedEntity,
) -> Result<(), ImportError> {
    let Entity::Screen(mut screen) = context.draft(node.key)? else {
        return Err(ImportError::manifest(format!(
            "node {} is not a screen",
            node.key
        )));
    };

    screen.category_ids = node
        .dependents_of(DependentType::Category)
        .map(|dep| context.resolved_id(node, dep))
        .collect::<Result<Vec<_>, _>>()?;

    for dep in node.dependents_of(DependentType::NestedScreen) {
        let pointer = dep
            .meta
            .get("pointer")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ImportError::manifest("nested screen dependent is missing 'pointer'".to_string())
            })?;
        let new_id = context.resolved_id(node, dep)?;
        let slot = screen.config.pointer_mut(pointer).ok_or_else(|| {
            ImportError::manifest(format!("screen config has no value at pointer {pointer}"))
        })?;
        *slot = serde_json::json!(new_id);
    }

    context.save(Entity::Screen(screen))
}

/// JSON pointers of every `{"screen": <id>}` reference in a config value,
/// in document order.
fn nested_screen_refs(config: &serde_json::Value) -> Vec<(String, i64)> {
    let mut refs = Vec::new();
    walk(config, String::new(), &mut refs);
    refs
}

fn walk(value: &serde_json::Value, pointer: String, refs: &mut Vec<(String, i64)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (field, child) in map {
                let child_pointer = format!("{pointer}/{}", escape_pointer_token(field));
                if field == "screen" {
                    if let Some(id) = child.as_i64() {
                        refs.push((child_pointer.clone(), id));
                        continue;
                    }
                }
                walk(child, child_pointer, refs);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, format!("{pointer}/{index}"), refs);
            }
        }
        _ => {}
    }
}

/// RFC 6901 token escaping: `~` → `~0`, `/` → `~1`.
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_screen_refs_found_recursively() {
        let config = serde_json::json!([
            { "items": [ { "component": "FormNestedScreen", "config": { "screen": 4 } } ] },
            { "screen": "not-an-id" },
            { "deep": { "screen": 9 } }
        ]);
        let refs = nested_screen_refs(&config);
        assert_eq!(
            refs,
            vec![
                ("/0/items/0/config/screen".to_string(), 4),
                ("/2/deep/screen".to_string(), 9),
            ]
        );
    }

    #[test]
    fn test_pointer_escaping() {
        let config = serde_json::json!({ "a/b": { "screen": 3 } });
        let refs = nested_screen_refs(&config);
        assert_eq!(refs[0].0, "/a~1b/screen");
        assert!(config.pointer(&refs[0].0).is_some());
    }
}
