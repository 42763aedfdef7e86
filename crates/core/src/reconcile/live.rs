use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::reconciler::{ReconcileError, Reconciler};
use crate::analytics::{segment_events_by_time, MatchStatistics, Segment};
use crate::events::{ChangeFeed, FeedEvent};
use crate::model::MatchEvent;
use crate::store::SharedStore;

const COMMAND_BUFFER: usize = 32;

/// Read-only view of a live match, republished after every change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub match_id: String,
    pub events: Arc<Vec<MatchEvent>>,
    pub loading: bool,
    pub connected: bool,
    pub last_error: Option<String>,
}

impl MatchSnapshot {
    fn of(reconciler: &Reconciler) -> Self {
        Self {
            match_id: reconciler.match_id().to_string(),
            events: Arc::new(reconciler.events().to_vec()),
            loading: reconciler.is_loading(),
            connected: reconciler.is_subscribed(),
            last_error: reconciler.last_error().map(str::to_string),
        }
    }

    pub fn statistics(&self) -> MatchStatistics {
        MatchStatistics::compute(&self.events)
    }

    pub fn segments(&self, interval_minutes: f64, match_duration_minutes: f64) -> Vec<Segment<'_>> {
        segment_events_by_time(&self.events, interval_minutes, match_duration_minutes)
    }
}

enum Command {
    Delete {
        event_id: String,
        reply: oneshot::Sender<Result<(), ReconcileError>>,
    },
    Reload {
        reply: oneshot::Sender<Result<(), ReconcileError>>,
    },
}

/// Task that owns one match's [`Reconciler`]. All mutation happens here,
/// one notification or command at a time; readers only see snapshots.
pub struct LiveMatch {
    reconciler: Reconciler,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
    snapshots: watch::Sender<MatchSnapshot>,
}

impl LiveMatch {
    /// Subscribe to `feed`, then load and follow the match on a new task.
    pub fn spawn(match_id: impl Into<String>, store: SharedStore, feed: &ChangeFeed) -> LiveMatchHandle {
        let mut reconciler = Reconciler::new(match_id, store);
        // Subscribing before the load starts means nothing committed while
        // the fetch is in flight is missed; duplicates are dropped on apply.
        reconciler.subscribe(feed);

        let match_id = reconciler.match_id().to_string();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (snapshot_tx, snapshot_rx) = watch::channel(MatchSnapshot::of(&reconciler));

        let actor = LiveMatch {
            reconciler,
            commands: command_rx,
            shutdown: shutdown_rx,
            snapshots: snapshot_tx,
        };
        let task = tokio::spawn(actor.run());

        LiveMatchHandle {
            match_id,
            commands: command_tx,
            snapshots: snapshot_rx,
            shutdown: Arc::new(shutdown_tx),
            task: Arc::new(task),
        }
    }

    async fn run(mut self) {
        // Failures are logged and recorded on the snapshot by the reconciler.
        let _ = self.reconciler.load().await;
        self.publish();

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                next = self.reconciler.next_change(), if self.reconciler.is_subscribed() => match next {
                    Some(FeedEvent::Change(change)) => {
                        if self.reconciler.apply(change).changed() {
                            self.publish();
                        }
                    }
                    Some(FeedEvent::Lagged(skipped)) => {
                        tracing::warn!(match_id = %self.reconciler.match_id(), skipped, "missed changes, reloading");
                        let _ = self.reconciler.load().await;
                        self.publish();
                    }
                    None => {
                        tracing::warn!(match_id = %self.reconciler.match_id(), "change feed ended");
                        self.publish();
                    }
                },
            }
        }

        self.reconciler.unsubscribe();
        self.publish();
        tracing::info!(match_id = %self.reconciler.match_id(), "live match stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Delete { event_id, reply } => {
                if self.reconciler.remove_local(&event_id).is_some() {
                    self.publish();
                }
                let result = self.reconciler.confirm_delete(&event_id).await;
                self.publish();
                let _ = reply.send(result);
            }
            Command::Reload { reply } => {
                let result = self.reconciler.load().await;
                self.publish();
                let _ = reply.send(result);
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(MatchSnapshot::of(&self.reconciler));
    }
}

/// Cloneable handle to a running [`LiveMatch`].
#[derive(Clone)]
pub struct LiveMatchHandle {
    match_id: String,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<MatchSnapshot>,
    shutdown: Arc<watch::Sender<bool>>,
    task: Arc<JoinHandle<()>>,
}

impl LiveMatchHandle {
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> MatchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified on every republished snapshot.
    pub fn watch(&self) -> watch::Receiver<MatchSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Optimistically delete an event. The local removal is visible in
    /// snapshots before the store answers.
    pub async fn delete_event(&self, event_id: impl Into<String>) -> Result<(), ReconcileError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Delete {
            event_id: event_id.into(),
            reply,
        })
        .await?;
        response.await.map_err(|_| self.closed_error())?
    }

    /// Replace the collection with the store's current view.
    pub async fn reload(&self) -> Result<(), ReconcileError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Reload { reply }).await?;
        response.await.map_err(|_| self.closed_error())?
    }

    /// Stop the task and close its subscription. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait until the task has stopped publishing.
    pub async fn closed(&self) {
        let mut snapshots = self.snapshots.clone();
        while snapshots.changed().await.is_ok() {}
    }

    async fn send(&self, command: Command) -> Result<(), ReconcileError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> ReconcileError {
        ReconcileError::Closed(self.match_id.clone())
    }
}
