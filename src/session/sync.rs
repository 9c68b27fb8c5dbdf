//! Ledger Synchronization Loop
//!
//! Polling is the only synchronization primitive the ledger offers, so it is
//! modeled once, here, as a cancellable periodic task feeding a single-writer
//! snapshot cache. UI layers subscribe to the published views instead of
//! polling on their own, which keeps every reader on one consistent picture.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::ledger::client::LedgerClient;
use crate::session::state::{GameStatus, Round, SessionId, SessionSnapshot};
use crate::DEFAULT_POLL_INTERVAL;

/// Sync loop configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between polling cycles.
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The merged result of one polling cycle.
///
/// Each field comes from its own read query and independently keeps its last
/// good value across transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// Session detail: config, players, rounds.
    pub snapshot: SessionSnapshot,
    /// The current round as reported by its dedicated query.
    pub current_round: Option<Round>,
    /// The status the ledger reports for the session.
    pub reported_status: GameStatus,
}

impl SessionView {
    /// Status derived locally from the snapshot. This, not
    /// [`SessionView::reported_status`], is what operation preconditions use.
    pub fn status(&self) -> GameStatus {
        self.snapshot.status()
    }
}

/// Handle to a running sync loop.
pub struct SyncHandle {
    view_rx: watch::Receiver<Option<SessionView>>,
    shutdown_tx: broadcast::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl SyncHandle {
    /// Subscribe to published views. Receivers observe only the latest view;
    /// identical consecutive polls are published once.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionView>> {
        self.view_rx.clone()
    }

    /// Stop scheduling future polling cycles. An in-flight cycle completes
    /// and its result is discarded.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for the loop task to finish.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// The polling task. Constructed via [`SyncLoop::spawn`].
pub struct SyncLoop;

impl SyncLoop {
    /// Spawn a polling task for one session.
    ///
    /// Every tick issues the three read queries concurrently; a failure in
    /// one does not block the others. Transient errors are logged and
    /// retried on the next tick, never terminating the loop. The loop ends
    /// when [`SyncHandle::stop`] is called or the session is observed ended.
    pub fn spawn<L>(ledger: Arc<L>, session: SessionId, config: SyncConfig) -> SyncHandle
    where
        L: LedgerClient + 'static,
    {
        let (view_tx, view_rx) = watch::channel(None);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut last_snapshot: Option<SessionSnapshot> = None;
            let mut last_round: Option<Round> = None;
            let mut last_status: Option<GameStatus> = None;
            let mut last_published: Option<SessionView> = None;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(session, "sync loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let (detail, round, status) = tokio::join!(
                    ledger.query_session(session),
                    ledger.query_current_round(session),
                    ledger.query_status(session),
                );

                match detail {
                    Ok(snapshot) => last_snapshot = Some(snapshot),
                    Err(e) => warn!(session, error = %e, "session query failed, keeping last snapshot"),
                }
                match round {
                    Ok(current) => last_round = current,
                    Err(e) => warn!(session, error = %e, "round query failed, keeping last round"),
                }
                match status {
                    Ok(reported) => last_status = Some(reported),
                    Err(e) => warn!(session, error = %e, "status query failed, keeping last status"),
                }

                let snapshot = match &last_snapshot {
                    Some(snapshot) => snapshot.clone(),
                    None => continue,
                };
                let reported_status = last_status.unwrap_or_else(|| snapshot.status());
                let view = SessionView {
                    snapshot,
                    current_round: last_round.clone(),
                    reported_status,
                };

                if last_published.as_ref() == Some(&view) {
                    continue;
                }
                debug!(session, status = %view.status(), "publishing session view");
                let ended = view.snapshot.ended;
                last_published = Some(view.clone());
                let _ = view_tx.send(Some(view));

                if ended {
                    info!(session, "session ended, sync loop finished");
                    break;
                }
            }
        });

        SyncHandle {
            view_rx,
            shutdown_tx,
            task,
        }
    }
}
