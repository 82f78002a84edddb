//! Group exporter variant. Matched by name on import.

use uuid::Uuid;

use super::ExportContext;
use crate::import::ImportError;
use crate::models::{Entity, Group};
use crate::repository::EntityRepository;

pub(crate) fn export<R: EntityRepository>(
    _context: &mut ExportContext<R>,
    key: Uuid,
    group: &Group,
) {
    tracing::debug!(key = %key, name = %group.name, "exported group");
}

pub(crate) fn materialize<R: EntityRepository>(
    repository: &mut R,
    group: Group,
) -> Result<Entity, ImportError> {
    if let Some(existing) = repository.find_group_by_name(&group.name) {
        return Ok(Entity::Group(existing));
    }
    let created = repository.create(Entity::Group(Group { id: 0, ..group }))?;
    Ok(created)
}
