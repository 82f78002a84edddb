//! Screen entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A form/display screen referenced by processes.
///
/// `config` is the screen designer's JSON document. Nested objects of the
/// shape `{"screen": <id>}` inside it reference other screens and are
/// followed when the screen is exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub screen_type: String,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub config: serde_json::Value,
}
