//! In-memory repository and signal store.
//!
//! Auto-increment ids per entity kind, matching what a relational backend
//! would assign. `Clone` makes snapshot/rollback trivial for embedders
//! without database transactions.

use std::collections::BTreeMap;

use super::{EntityRepository, RepositoryError, SignalStore};
use crate::models::{Category, Entity, EntityKind, Group, Process, Screen, SignalData, User};

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    processes: BTreeMap<i64, Process>,
    screens: BTreeMap<i64, Screen>,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    categories: BTreeMap<i64, Category>,
    next_ids: BTreeMap<EntityKind, i64>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, kind: EntityKind) -> i64 {
        let next = self.next_ids.entry(kind).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    /// Insert an entity keeping its current id, bumping the id counter past
    /// it. Used to seed fixtures with known ids.
    pub fn insert(&mut self, entity: Entity) {
        let kind = entity.kind();
        let id = entity.id();
        let next = self.next_ids.entry(kind).or_insert(1);
        *next = (*next).max(id + 1);
        self.store(entity);
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn screens(&self) -> impl Iterator<Item = &Screen> {
        self.screens.values()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    fn store(&mut self, entity: Entity) {
        match entity {
            Entity::Process(p) => {
                self.processes.insert(p.id, p);
            }
            Entity::Screen(s) => {
                self.screens.insert(s.id, s);
            }
            Entity::User(u) => {
                self.users.insert(u.id, u);
            }
            Entity::Group(g) => {
                self.groups.insert(g.id, g);
            }
            Entity::Category(c) => {
                self.categories.insert(c.id, c);
            }
        }
    }

    fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.find(kind, id).is_some()
    }
}

impl EntityRepository for InMemoryRepository {
    fn find(&self, kind: EntityKind, id: i64) -> Option<Entity> {
        match kind {
            EntityKind::Process => self.processes.get(&id).cloned().map(Entity::Process),
            EntityKind::Screen => self.screens.get(&id).cloned().map(Entity::Screen),
            EntityKind::User => self.users.get(&id).cloned().map(Entity::User),
            EntityKind::Group => self.groups.get(&id).cloned().map(Entity::Group),
            EntityKind::Category => self.categories.get(&id).cloned().map(Entity::Category),
        }
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.users.values().find(|u| u.username == username).cloned()
    }

    fn find_group_by_name(&self, name: &str) -> Option<Group> {
        self.groups.values().find(|g| g.name == name).cloned()
    }

    fn find_category_by_name(&self, name: &str) -> Option<Category> {
        self.categories.values().find(|c| c.name == name).cloned()
    }

    fn create(&mut self, mut entity: Entity) -> Result<Entity, RepositoryError> {
        let id = self.next_id(entity.kind());
        entity.set_id(id);
        self.store(entity.clone());
        Ok(entity)
    }

    fn save(&mut self, entity: Entity) -> Result<(), RepositoryError> {
        let (kind, id) = (entity.kind(), entity.id());
        if !self.contains(kind, id) {
            return Err(RepositoryError::NotFound { kind, id });
        }
        self.store(entity);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySignalStore {
    signals: BTreeMap<String, SignalData>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalStore for InMemorySignalStore {
    fn find_signal(&self, id: &str) -> Option<SignalData> {
        self.signals.get(id).cloned()
    }

    fn add_signal(&mut self, signal: SignalData) -> Result<(), RepositoryError> {
        if self.signals.contains_key(&signal.id) {
            return Err(RepositoryError::DuplicateSignal { id: signal.id });
        }
        self.signals.insert(signal.id.clone(), signal);
        Ok(())
    }

    fn signals(&self) -> Vec<SignalData> {
        self.signals.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut repo = InMemoryRepository::new();
        let a = repo
            .create(Entity::Category(Category {
                id: 0,
                uuid: Uuid::new_v4(),
                name: "Ops".to_string(),
            }))
            .unwrap();
        let b = repo
            .create(Entity::Category(Category {
                id: 0,
                uuid: Uuid::new_v4(),
                name: "Finance".to_string(),
            }))
            .unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_insert_preserves_seeded_id() {
        let mut repo = InMemoryRepository::new();
        repo.insert(Entity::Group(Group {
            id: 5,
            uuid: Uuid::new_v4(),
            name: "reviewers".to_string(),
            description: String::new(),
        }));
        assert!(repo.find(EntityKind::Group, 5).is_some());

        let created = repo
            .create(Entity::Group(Group {
                id: 0,
                uuid: Uuid::new_v4(),
                name: "approvers".to_string(),
                description: String::new(),
            }))
            .unwrap();
        assert_eq!(created.id(), 6);
    }

    #[test]
    fn test_duplicate_signal_rejected() {
        let mut store = InMemorySignalStore::new();
        store
            .add_signal(SignalData::new("order_shipped", "Order shipped", ""))
            .unwrap();
        let err = store
            .add_signal(SignalData::new("order_shipped", "Other", ""))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateSignal { .. }));
    }
}
