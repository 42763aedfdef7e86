use thiserror::Error;

use crate::analytics::{self, segment_events_by_time, MatchStatistics, Segment};
use crate::events::{ChangeFeed, ChangeNotification, FeedEvent, Subscription};
use crate::model::MatchEvent;
use crate::store::{SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to load events for match {match_id}: {source}")]
    LoadFailed {
        match_id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to delete event {event_id}: {source}")]
    DeleteFailed {
        event_id: String,
        #[source]
        source: StoreError,
    },

    #[error("live match {0} is no longer running")]
    Closed(String),
}

/// Why a notification left the collection untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherMatch,
    Duplicate,
    UnknownId,
    MissingId,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Updated,
    /// An update for an id never seen before, kept as an insert.
    UpsertedFromUpdate,
    Deleted,
    Ignored(IgnoreReason),
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Ignored(_))
    }
}

/// In-memory, timestamp-ordered copy of one match's events, kept in step
/// with the store through change notifications.
///
/// The collection is a cache: it is replaced wholesale on load and
/// otherwise only changes through [`Reconciler::apply`] or the optimistic
/// [`Reconciler::remove_local`].
pub struct Reconciler {
    match_id: String,
    store: SharedStore,
    events: Vec<MatchEvent>,
    loading: bool,
    closed: bool,
    last_error: Option<String>,
    subscription: Option<Subscription>,
}

impl Reconciler {
    pub fn new(match_id: impl Into<String>, store: SharedStore) -> Self {
        Self {
            match_id: match_id.into(),
            store,
            events: Vec::new(),
            loading: true,
            closed: false,
            last_error: None,
            subscription: None,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Events ordered by timestamp, ties in arrival order.
    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_open)
    }

    /// Message of the last failed load or delete, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.position(event_id).is_some()
    }

    pub fn statistics(&self) -> MatchStatistics {
        MatchStatistics::compute(&self.events)
    }

    pub fn segments(&self, interval_minutes: f64, match_duration_minutes: f64) -> Vec<Segment<'_>> {
        segment_events_by_time(&self.events, interval_minutes, match_duration_minutes)
    }

    pub fn recent(&self, count: usize) -> Vec<&MatchEvent> {
        analytics::recent(&self.events, count)
    }

    /// Open the change-feed subscription for this match, replacing any
    /// previous one.
    pub fn subscribe(&mut self, feed: &ChangeFeed) {
        if self.closed {
            tracing::debug!(match_id = %self.match_id, "not subscribing a closed reconciler");
            return;
        }
        self.subscription = Some(feed.subscribe(self.match_id.clone()));
        tracing::debug!(match_id = %self.match_id, "subscribed to change feed");
    }

    /// Wait for the next feed event of the open subscription. Returns `None`
    /// when there is no subscription or the feed has ended.
    pub async fn next_change(&mut self) -> Option<FeedEvent> {
        let subscription = self.subscription.as_mut()?;
        let next = subscription.next().await;
        if next.is_none() {
            self.subscription = None;
        }
        next
    }

    /// Close the subscription. Nothing is applied afterwards; calling it
    /// again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        if !self.closed {
            self.closed = true;
            tracing::info!(match_id = %self.match_id, "reconciler torn down");
        }
    }

    /// Replace the collection with the store's current view of the match.
    ///
    /// On failure the collection is left as it was; either way the
    /// reconciler stops reporting `loading`.
    pub async fn load(&mut self) -> Result<(), ReconcileError> {
        let result = self.store.fetch_events(&self.match_id).await;
        self.loading = false;

        match result {
            Ok(mut events) => {
                // The store promises timestamp order; sort anyway so the
                // collection invariant holds for any store.
                events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
                tracing::info!(match_id = %self.match_id, count = events.len(), "loaded match events");
                self.events = events;
                self.last_error = None;
                Ok(())
            }
            Err(source) => {
                tracing::error!(match_id = %self.match_id, error = %source, "failed to load match events");
                self.last_error = Some("Could not load match events".to_string());
                Err(ReconcileError::LoadFailed {
                    match_id: self.match_id.clone(),
                    source,
                })
            }
        }
    }

    /// Fold one change notification into the collection.
    pub fn apply(&mut self, change: ChangeNotification) -> ApplyOutcome {
        let kind = change.kind();
        let outcome = self.apply_inner(change);
        match outcome {
            ApplyOutcome::Ignored(reason) => {
                tracing::debug!(match_id = %self.match_id, kind, ?reason, "change ignored");
            }
            applied => {
                tracing::debug!(match_id = %self.match_id, kind, outcome = ?applied, count = self.events.len(), "change applied");
            }
        }
        outcome
    }

    fn apply_inner(&mut self, change: ChangeNotification) -> ApplyOutcome {
        if self.closed {
            return ApplyOutcome::Ignored(IgnoreReason::Closed);
        }

        match change {
            ChangeNotification::Insert(event) => {
                if event.match_id != self.match_id {
                    return ApplyOutcome::Ignored(IgnoreReason::OtherMatch);
                }
                if self.contains(&event.id) {
                    return ApplyOutcome::Ignored(IgnoreReason::Duplicate);
                }
                self.events.push(event);
                self.sort();
                ApplyOutcome::Inserted
            }
            ChangeNotification::Update(event) => {
                if event.match_id != self.match_id {
                    return ApplyOutcome::Ignored(IgnoreReason::OtherMatch);
                }
                let outcome = match self.position(&event.id) {
                    Some(index) => {
                        self.events[index] = event;
                        ApplyOutcome::Updated
                    }
                    None => {
                        self.events.push(event);
                        ApplyOutcome::UpsertedFromUpdate
                    }
                };
                self.sort();
                outcome
            }
            ChangeNotification::Delete { id: None, .. } => {
                tracing::warn!(match_id = %self.match_id, "delete notification without an event id");
                ApplyOutcome::Ignored(IgnoreReason::MissingId)
            }
            ChangeNotification::Delete { id: Some(id), .. } => match self.position(&id) {
                Some(index) => {
                    self.events.remove(index);
                    ApplyOutcome::Deleted
                }
                None => ApplyOutcome::Ignored(IgnoreReason::UnknownId),
            },
        }
    }

    /// First half of an optimistic delete: drop the event locally before
    /// the store has confirmed anything.
    pub fn remove_local(&mut self, event_id: &str) -> Option<MatchEvent> {
        let index = self.position(event_id)?;
        Some(self.events.remove(index))
    }

    /// Second half of an optimistic delete: ask the store to delete. If it
    /// refuses, reload the match so the collection matches the store again
    /// and report the failure.
    pub async fn confirm_delete(&mut self, event_id: &str) -> Result<(), ReconcileError> {
        let Err(source) = self.store.delete_event(&self.match_id, event_id).await else {
            tracing::info!(match_id = %self.match_id, event_id, "event deleted");
            return Ok(());
        };

        tracing::error!(match_id = %self.match_id, event_id, error = %source, "failed to delete event, reloading");
        // A failed reload logs and records its own error; the delete
        // failure is what the caller hears about.
        let _ = self.load().await;
        self.last_error = Some("Could not delete event".to_string());

        Err(ReconcileError::DeleteFailed {
            event_id: event_id.to_string(),
            source,
        })
    }

    /// Optimistically delete an event: local removal, then the store.
    pub async fn delete_event(&mut self, event_id: &str) -> Result<(), ReconcileError> {
        self.remove_local(event_id);
        self.confirm_delete(event_id).await
    }

    fn position(&self, event_id: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == event_id)
    }

    fn sort(&mut self) {
        self.events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }
}
