//! Category exporter variant. Matched by name on import.

use uuid::Uuid;

use super::ExportContext;
use crate::import::ImportError;
use crate::models::{Category, Entity};
use crate::repository::EntityRepository;

pub(crate) fn export<R: EntityRepository>(
    _context: &mut ExportContext<R>,
    key: Uuid,
    category: &Category,
) {
    tracing::debug!(key = %key, name = %category.name, "exported category");
}

pub(crate) fn materialize<R: EntityRepository>(
    repository: &mut R,
    category: Category,
) -> Result<Entity, ImportError> {
    if let Some(existing) = repository.find_category_by_name(&category.name) {
        return Ok(Entity::Category(existing));
    }
    let created = repository.create(Entity::Category(Category { id: 0, ..category }))?;
    Ok(created)
}
