//! JSON bodies exchanged on `/api/sync`.

use serde::{Deserialize, Serialize};

use super::pull::TableError;
use super::push::PushError;
use crate::models::ChangeRecord;

pub const ACTION_PUSH: &str = "push";
pub const ACTION_PULL: &str = "pull";

/// Body of `POST /api/sync`.
///
/// `action` stays a string so the server can answer an unknown action with
/// its own error instead of a generic decode failure. The server reads
/// `changes` as raw JSON (`SyncRequest<Value>`) and decodes each item on
/// its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest<C = ChangeRecord> {
    pub action: String,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<C>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<String>,
}

impl SyncRequest {
    pub fn push(changes: Vec<ChangeRecord>) -> Self {
        Self {
            action: ACTION_PUSH.to_string(),
            changes,
            last_sync_timestamp: None,
        }
    }

    pub fn pull(since: Option<&str>) -> Self {
        Self {
            action: ACTION_PULL.to_string(),
            changes: Vec::new(),
            last_sync_timestamp: since.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    pub success: bool,
    pub processed: Vec<String>,
    #[serde(default)]
    pub errors: Vec<PushError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    pub success: bool,
    pub changes: Vec<ChangeRecord>,
    pub timestamp: String,
    #[serde(default)]
    pub errors: Vec<TableError>,
}

/// Body of `GET /api/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub changes: Vec<ChangeRecord>,
    pub timestamp: String,
    #[serde(default)]
    pub errors: Vec<TableError>,
}
