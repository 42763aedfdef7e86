use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{EventStore, StoreError, StoreResult};
use crate::model::MatchEvent;

/// In-process event store for tests and local runs without a database.
/// Rows keep insertion order; reads sort by timestamp like the SQL store.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    rows: Mutex<Vec<MatchEvent>>,
    fail_fetch: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: impl IntoIterator<Item = MatchEvent>) -> Self {
        let store = Self::new();
        store.rows().extend(events);
        store
    }

    fn rows(&self) -> MutexGuard<'_, Vec<MatchEvent>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist an event, assigning an id when it has none. Returns the
    /// stored row.
    pub fn insert(&self, mut event: MatchEvent) -> MatchEvent {
        if event.id.is_empty() {
            event.id = Uuid::new_v4().to_string();
        }
        self.rows().push(event.clone());
        event
    }

    /// Replace the row with the same id. Returns false if there was none.
    pub fn update(&self, event: MatchEvent) -> bool {
        let mut rows = self.rows();
        match rows.iter_mut().find(|row| row.id == event.id) {
            Some(row) => {
                *row = event;
                true
            }
            None => false,
        }
    }

    /// Drop a row without going through [`EventStore::delete_event`], as if
    /// another client had deleted it.
    pub fn remove(&self, event_id: &str) -> Option<MatchEvent> {
        let mut rows = self.rows();
        let position = rows.iter().position(|row| row.id == event_id)?;
        Some(rows.remove(position))
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Make subsequent fetches fail until switched off.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail until switched off.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn fetch_events(&self, match_id: &str) -> StoreResult<Vec<MatchEvent>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fetch rejected".to_string()));
        }

        let mut events: Vec<MatchEvent> = self
            .rows()
            .iter()
            .filter(|row| row.match_id == match_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(events)
    }

    async fn fetch_event(&self, event_id: &str) -> StoreResult<Option<MatchEvent>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fetch rejected".to_string()));
        }
        Ok(self.rows().iter().find(|row| row.id == event_id).cloned())
    }

    async fn delete_event(&self, match_id: &str, event_id: &str) -> StoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("delete rejected".to_string()));
        }

        self.rows()
            .retain(|row| !(row.id == event_id && row.match_id == match_id));
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
