//! Category entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A process or screen category. Matched by `name` on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub name: String,
}
