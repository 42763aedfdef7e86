use serde::{Deserialize, Serialize};

use crate::model::MatchEvent;

/// A row change on `match_events`, as folded into a reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeNotification {
    Insert(MatchEvent),
    Update(MatchEvent),
    /// Only the identifier is guaranteed; either field may be missing when
    /// the producer did not ship the prior row.
    Delete {
        id: Option<String>,
        match_id: Option<String>,
    },
}

impl ChangeNotification {
    pub fn delete(id: impl Into<String>) -> Self {
        ChangeNotification::Delete {
            id: Some(id.into()),
            match_id: None,
        }
    }

    /// Match the change belongs to, when the notification says.
    pub fn match_id(&self) -> Option<&str> {
        match self {
            ChangeNotification::Insert(event) | ChangeNotification::Update(event) => {
                Some(&event.match_id)
            }
            ChangeNotification::Delete { match_id, .. } => match_id.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeNotification::Insert(_) => "insert",
            ChangeNotification::Update(_) => "update",
            ChangeNotification::Delete { .. } => "delete",
        }
    }
}

/// Wire payload emitted by the `match_events` notify trigger.
///
/// Only identifiers travel through `pg_notify`, which caps payloads at
/// 8000 bytes; inserted and updated rows are read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum ChangePayload {
    Insert { id: String, match_id: String },
    Update { id: String, match_id: String },
    Delete {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        match_id: Option<String>,
    },
}

impl ChangePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ChangePayload::Insert { .. } => "insert",
            ChangePayload::Update { .. } => "update",
            ChangePayload::Delete { .. } => "delete",
        }
    }
}
