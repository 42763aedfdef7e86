//! Persistence collaborator: the row store events are fetched from and
//! deleted in.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::MatchEvent;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed event row: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/delete access to persisted match events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events of a match, ascending by timestamp.
    async fn fetch_events(&self, match_id: &str) -> StoreResult<Vec<MatchEvent>>;

    /// One event by id, or `None` if it no longer exists.
    async fn fetch_event(&self, event_id: &str) -> StoreResult<Option<MatchEvent>>;

    /// Delete one event of a match. Deleting an id that no longer exists,
    /// or that belongs to another match, succeeds without touching anything.
    async fn delete_event(&self, match_id: &str, event_id: &str) -> StoreResult<()>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn EventStore>;
