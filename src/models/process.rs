//! Process entity and its notification settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A BPM process definition.
///
/// `bpmn` holds the raw BPMN 2.0 XML document. Foreign keys
/// (`owner_user_id`, screen ids, `category_ids`) reference entities in the
/// same installation and are re-resolved when the process is imported
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default)]
    pub id: i64,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Set when the process belongs to an installed package. Packaged
    /// processes are never treated as local subprocesses.
    #[serde(default)]
    pub package_key: Option<String>,
    #[serde(default)]
    pub owner_user_id: Option<i64>,
    #[serde(default)]
    pub cancel_screen_id: Option<i64>,
    #[serde(default)]
    pub request_detail_screen_id: Option<i64>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub notification_settings: Vec<NotificationSetting>,
    /// BPMN 2.0 XML source of the process definition.
    pub bpmn: String,
}

/// One row of a process's notification configuration.
///
/// Carried verbatim through a package as an opaque reference; only the
/// `process_id` is rewritten on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub notifiable_type: String,
    pub notification_type: String,
}
