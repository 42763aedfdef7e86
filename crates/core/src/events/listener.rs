use sqlx::postgres::PgListener;
use sqlx::PgPool;
use thiserror::Error;

use super::bus::ChangeFeed;
use super::types::{ChangeNotification, ChangePayload};
use crate::model::MatchEvent;
use crate::store::{EventStore, SharedStore, StoreResult};

/// Channel the `match_events` trigger notifies on.
pub const DEFAULT_CHANNEL: &str = "match_events_changes";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to listen on {channel}: {source}")]
    Listen {
        channel: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("notification stream failed: {0}")]
    Receive(#[source] sqlx::Error),
}

/// Decode one `pg_notify` payload.
pub fn decode_payload(payload: &str) -> Result<ChangePayload, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Turn a payload into a notification, reading inserted and updated rows
/// back from `store`. Returns `None` when the row is already gone; the
/// delete that removed it follows on the same channel.
pub async fn resolve_payload(
    store: &dyn EventStore,
    payload: ChangePayload,
) -> StoreResult<Option<ChangeNotification>> {
    let (id, wrap): (String, fn(MatchEvent) -> ChangeNotification) = match payload {
        ChangePayload::Insert { id, .. } => (id, ChangeNotification::Insert),
        ChangePayload::Update { id, .. } => (id, ChangeNotification::Update),
        ChangePayload::Delete { id, match_id } => {
            return Ok(Some(ChangeNotification::Delete { id, match_id }));
        }
    };

    let event = store.fetch_event(&id).await?;
    if event.is_none() {
        tracing::debug!(event_id = %id, "changed row vanished before it was read");
    }
    Ok(event.map(wrap))
}

/// Forwards Postgres `LISTEN/NOTIFY` traffic onto a [`ChangeFeed`].
pub struct PgChangeListener {
    listener: PgListener,
    channel: String,
    store: SharedStore,
    feed: ChangeFeed,
}

impl PgChangeListener {
    pub async fn connect(
        pool: &PgPool,
        channel: &str,
        store: SharedStore,
        feed: ChangeFeed,
    ) -> Result<Self, FeedError> {
        let listen_error = |source| FeedError::Listen {
            channel: channel.to_string(),
            source,
        };

        let mut listener = PgListener::connect_with(pool).await.map_err(listen_error)?;
        listener.listen(channel).await.map_err(listen_error)?;
        tracing::info!(channel, "listening for match event changes");

        Ok(Self {
            listener,
            channel: channel.to_string(),
            store,
            feed,
        })
    }

    /// Pump notifications until the connection fails for good. Reconnects
    /// are left to `PgListener`; undecodable payloads and rows that cannot
    /// be read back are skipped.
    pub async fn run(mut self) -> Result<(), FeedError> {
        loop {
            let notification = self.listener.recv().await.map_err(|e| {
                tracing::error!(channel = %self.channel, error = %e, "change listener failed");
                FeedError::Receive(e)
            })?;

            let payload = match decode_payload(notification.payload()) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(channel = %self.channel, error = %e, "skipping malformed change payload");
                    continue;
                }
            };

            let kind = payload.kind();
            match resolve_payload(self.store.as_ref(), payload).await {
                Ok(Some(change)) => {
                    let receivers = self.feed.publish(change);
                    tracing::trace!(kind, receivers, "change forwarded");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(channel = %self.channel, kind, error = %e, "could not read changed row");
                }
            }
        }
    }
}
