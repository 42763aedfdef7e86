use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{EventStore, StoreError, StoreResult};
use crate::model::{Coordinates, EventRecord, MatchEvent};

const EVENT_COLUMNS: &str = r#"
    SELECT id::text AS id,
           match_id::text AS match_id,
           event_type,
           "timestamp"::float8 AS "timestamp",
           team,
           coordinates,
           player_id::int8 AS player_id,
           COALESCE(created_by::text, '') AS created_by,
           created_at,
           event_data
    FROM match_events
"#;

const DELETE_EVENT: &str = "DELETE FROM match_events WHERE id::text = $1 AND match_id::text = $2";

/// `match_events` table access over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode_row(row: &PgRow) -> StoreResult<EventRecord> {
    let decode = |e: sqlx::Error| StoreError::Decode(e.to_string());

    let coordinates: Option<Json<Coordinates>> = row.try_get("coordinates").map_err(decode)?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at").map_err(decode)?;
    let event_data: Option<Value> = row.try_get("event_data").map_err(decode)?;

    Ok(EventRecord {
        id: row.try_get("id").map_err(decode)?,
        match_id: row.try_get("match_id").map_err(decode)?,
        event_type: row.try_get("event_type").map_err(decode)?,
        timestamp: row.try_get("timestamp").map_err(decode)?,
        team: row.try_get("team").map_err(decode)?,
        coordinates: coordinates.map(|Json(c)| c),
        player_id: row.try_get("player_id").map_err(decode)?,
        created_by: row.try_get("created_by").map_err(decode)?,
        created_at,
        event_data,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn fetch_events(&self, match_id: &str) -> StoreResult<Vec<MatchEvent>> {
        let sql = format!(r#"{EVENT_COLUMNS} WHERE match_id::text = $1 ORDER BY "timestamp" ASC"#);
        let rows = sqlx::query(&sql)
            .bind(match_id)
            .fetch_all(&self.pool)
            .await?;

        let events = rows
            .iter()
            .map(|row| decode_row(row).map(MatchEvent::from))
            .collect::<StoreResult<Vec<_>>>()?;

        tracing::debug!(match_id, count = events.len(), "fetched match events");
        Ok(events)
    }

    async fn fetch_event(&self, event_id: &str) -> StoreResult<Option<MatchEvent>> {
        let sql = format!("{EVENT_COLUMNS} WHERE id::text = $1");
        let row = sqlx::query(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(|row| decode_row(row).map(MatchEvent::from))
            .transpose()
    }

    async fn delete_event(&self, match_id: &str, event_id: &str) -> StoreResult<()> {
        let result = sqlx::query(DELETE_EVENT)
            .bind(event_id)
            .bind(match_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(match_id, event_id, "delete matched no rows");
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
