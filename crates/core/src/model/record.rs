use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::{Coordinates, EventType, MatchEvent, Team};

/// Row shape of the `match_events` table, as it travels over the change
/// feed and out of `SELECT` queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub match_id: String,
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub player_id: Option<i64>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub event_data: Option<Value>,
}

impl From<EventRecord> for MatchEvent {
    fn from(record: EventRecord) -> Self {
        let team = record.team.as_deref().and_then(|tag| {
            let team = Team::parse(tag);
            if team.is_none() {
                tracing::debug!(event_id = %record.id, team = tag, "unknown team tag");
            }
            team
        });

        // Non-object payloads carry no usable fields.
        let event_data = match record.event_data {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        MatchEvent {
            event_type: EventType::from(record.event_type),
            timestamp: record.timestamp.unwrap_or(0.0),
            team,
            player_id: record.player_id,
            coordinates: record.coordinates.unwrap_or_default(),
            created_by: record.created_by,
            created_at: record.created_at,
            event_data,
            id: record.id,
            match_id: record.match_id,
        }
    }
}
