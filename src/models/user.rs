//! User entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account that owns processes or appears in task assignments.
///
/// Users are matched by `username` when a package is imported; a missing
/// user is created from these attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}
