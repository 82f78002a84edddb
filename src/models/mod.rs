//! Models module for the SDK
//!
//! Defines the domain entities that take part in process packaging. These are
//! plain serializable structs, not persistence models: the owning application
//! maps them onto its own storage through the repository traits.

pub mod category;
pub mod group;
pub mod process;
pub mod screen;
pub mod signal;
pub mod user;

pub use category::Category;
pub use group::Group;
pub use process::{NotificationSetting, Process};
pub use screen::Screen;
pub use signal::SignalData;
pub use user::User;

use serde::{Deserialize, Serialize};

/// The closed set of entity kinds that can appear in a package manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Process,
    Screen,
    User,
    Group,
    Category,
}

impl EntityKind {
    /// Stable lowercase label, used for manifest keys and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Process => "process",
            EntityKind::Screen => "screen",
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Category => "category",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain entity tagged with its kind.
///
/// Exporter variants dispatch on this enum rather than on open-ended
/// inheritance, so the set of packagable kinds is known at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Entity {
    Process(Process),
    Screen(Screen),
    User(User),
    Group(Group),
    Category(Category),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Process(_) => EntityKind::Process,
            Entity::Screen(_) => EntityKind::Screen,
            Entity::User(_) => EntityKind::User,
            Entity::Group(_) => EntityKind::Group,
            Entity::Category(_) => EntityKind::Category,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Process(p) => p.id,
            Entity::Screen(s) => s.id,
            Entity::User(u) => u.id,
            Entity::Group(g) => g.id,
            Entity::Category(c) => c.id,
        }
    }

    pub fn set_id(&mut self, id: i64) {
        match self {
            Entity::Process(p) => p.id = id,
            Entity::Screen(s) => s.id = id,
            Entity::User(u) => u.id = id,
            Entity::Group(g) => g.id = id,
            Entity::Category(c) => c.id = id,
        }
    }

    /// Serialize the entity payload (without the kind tag) for a manifest node.
    pub fn attributes(&self) -> serde_json::Value {
        match self {
            Entity::Process(p) => serde_json::to_value(p),
            Entity::Screen(s) => serde_json::to_value(s),
            Entity::User(u) => serde_json::to_value(u),
            Entity::Group(g) => serde_json::to_value(g),
            Entity::Category(c) => serde_json::to_value(c),
        }
        .expect("entity structs serialize to JSON objects")
    }

    /// Rebuild an entity from manifest node attributes.
    pub fn from_attributes(
        kind: EntityKind,
        attributes: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Process => Entity::Process(serde_json::from_value(attributes.clone())?),
            EntityKind::Screen => Entity::Screen(serde_json::from_value(attributes.clone())?),
            EntityKind::User => Entity::User(serde_json::from_value(attributes.clone())?),
            EntityKind::Group => Entity::Group(serde_json::from_value(attributes.clone())?),
            EntityKind::Category => Entity::Category(serde_json::from_value(attributes.clone())?),
        })
    }
}
