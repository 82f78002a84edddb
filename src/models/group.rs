//! Group entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user group referenced by task assignments. Matched by `name` on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
