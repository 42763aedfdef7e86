use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use match_events_core::events::ChangeFeed;
use match_events_core::reconcile::{LiveMatch, LiveMatchHandle};
use match_events_core::store::SharedStore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: SharedStore,
    config: AppConfig,
    change_feed: ChangeFeed,
    live_matches: Mutex<HashMap<String, LiveEntry>>,
}

struct LiveEntry {
    handle: LiveMatchHandle,
    last_access: Instant,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig, change_feed: ChangeFeed) -> Self {
        Self {
            inner: Arc::new(InnerState {
                store,
                config,
                change_feed,
                live_matches: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn change_feed(&self) -> &ChangeFeed {
        &self.inner.change_feed
    }

    /// Handle for a match, starting to follow it on first use (or again if
    /// its task has stopped). Makes room by stopping the least recently
    /// used match when the registry is full.
    pub fn live_match(&self, match_id: &str) -> LiveMatchHandle {
        let now = Instant::now();
        let mut live = self.live_matches();
        if let Some(entry) = live.get_mut(match_id).filter(|e| e.handle.is_running()) {
            entry.last_access = now;
            return entry.handle.clone();
        }
        live.remove(match_id);

        let limit = self.inner.config.max_live_matches.max(1);
        while live.len() >= limit {
            let Some(oldest) = live
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            if let Some(entry) = live.remove(&oldest) {
                tracing::info!(match_id = %oldest, "registry full, stopping least recently used match");
                entry.handle.shutdown();
            }
        }

        tracing::info!(match_id, "following match");
        let handle = LiveMatch::spawn(match_id, self.inner.store.clone(), &self.inner.change_feed);
        live.insert(
            match_id.to_string(),
            LiveEntry {
                handle: handle.clone(),
                last_access: now,
            },
        );
        handle
    }

    pub fn live_match_count(&self) -> usize {
        self.live_matches().len()
    }

    /// Stop matches nobody has asked about within the idle timeout and wait
    /// for them to wind down. Returns how many were stopped.
    pub async fn evict_idle_matches(&self) -> usize {
        let Some(idle) = self.idle_timeout() else {
            return 0;
        };
        let now = Instant::now();

        let evicted: Vec<(String, LiveMatchHandle)> = {
            let mut live = self.live_matches();
            let expired: Vec<String> = live
                .iter()
                .filter(|(_, entry)| {
                    !entry.handle.is_running() || now.duration_since(entry.last_access) >= idle
                })
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|id| live.remove(&id).map(|entry| (id, entry.handle)))
                .collect()
        };

        for (match_id, handle) in &evicted {
            tracing::info!(match_id = %match_id, "stopping idle match");
            handle.shutdown();
        }
        for (_, handle) in &evicted {
            handle.closed().await;
        }
        evicted.len()
    }

    /// Periodically evict idle matches. Does nothing when the idle timeout
    /// is zero.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let Some(idle) = state.idle_timeout() else {
                return;
            };
            let mut ticker = tokio::time::interval((idle / 2).max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                let stopped = state.evict_idle_matches().await;
                if stopped > 0 {
                    tracing::debug!(stopped, remaining = state.live_match_count(), "idle matches evicted");
                }
            }
        })
    }

    /// Stop every live match and wait for them to wind down.
    pub async fn shutdown_live_matches(&self) {
        let handles: Vec<LiveMatchHandle> = self
            .live_matches()
            .drain()
            .map(|(_, entry)| entry.handle)
            .collect();
        for handle in &handles {
            handle.shutdown();
        }
        for handle in &handles {
            handle.closed().await;
        }
        tracing::info!(count = handles.len(), "live matches stopped");
    }

    fn idle_timeout(&self) -> Option<Duration> {
        match self.inner.config.live_match_idle_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn live_matches(&self) -> MutexGuard<'_, HashMap<String, LiveEntry>> {
        self.inner
            .live_matches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
