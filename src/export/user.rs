//! User exporter variant.
//!
//! Users carry no dependents of their own; the interesting half is import,
//! where the username is the matching key so an already-present account is
//! reused instead of duplicated.

use uuid::Uuid;

use super::ExportContext;
use crate::import::ImportError;
use crate::models::{Entity, User};
use crate::repository::EntityRepository;

pub(crate) fn export<R: EntityRepository>(_context: &mut ExportContext<R>, key: Uuid, user: &User) {
    tracing::debug!(key = %key, username = %user.username, "exported user");
}

/// Find the target installation's user by username, or create one from the
/// exported attributes.
pub(crate) fn materialize<R: EntityRepository>(
    repository: &mut R,
    user: User,
) -> Result<Entity, ImportError> {
    if let Some(existing) = repository.find_user_by_username(&user.username) {
        tracing::debug!(username = %existing.username, id = existing.id, "matched existing user");
        return Ok(Entity::User(existing));
    }
    let created = repository.create(Entity::User(User { id: 0, ..user }))?;
    Ok(created)
}
