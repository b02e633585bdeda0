use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Column-to-value mapping carried by a change.
pub type Payload = Map<String, Value>;

/// What a change does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Create => write!(f, "create"),
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for ChangeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeAction::Create),
            "update" => Ok(ChangeAction::Update),
            "delete" => Ok(ChangeAction::Delete),
            _ => Err(format!(
                "Invalid action '{}'. Valid options: create, update, delete",
                s
            )),
        }
    }
}

/// One pending mutation against a named table and record.
///
/// `action` and `table_name` stay plain strings on the wire so that a single
/// malformed change fails on its own instead of rejecting the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Queue item id assigned by the client, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    #[serde(default)]
    pub payload: Payload,
}

impl ChangeRecord {
    pub fn new(
        action: ChangeAction,
        table_name: impl Into<String>,
        record_id: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            id: None,
            action: action.to_string(),
            table_name: table_name.into(),
            record_id: record_id.into(),
            payload,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier reported back by push: the queue id if set, else the record id.
    pub fn ack_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.record_id)
    }

    /// Tombstone carried in the payload, if the row is soft-deleted.
    pub fn tombstone(&self) -> Option<&str> {
        self.payload.get("geloescht_am").and_then(Value::as_str)
    }
}
