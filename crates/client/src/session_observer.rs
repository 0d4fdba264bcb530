//! Client-side "current user" tracker.
//!
//! One task owns the cell. It subscribes to session changes before asking
//! for the existing session, so no transition falls in between, then handles
//! events strictly in delivery order:
//!
//! ```text
//! event with session ──▶ generation += 1, fetch profile (concurrently)
//! event without      ──▶ generation += 1, cancel fetches, clear cell
//! fetch result       ──▶ applied only if its generation is still current
//! ```
//!
//! The generation check is what keeps a slow fetch for an older session from
//! overwriting the profile of a newer one.

use std::sync::Arc;

use tokio::sync::{Notify, broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};

use quill_auth::{Session, UserProfile};
use quill_core::UserId;

use crate::source::{FetchError, ProfileFetcher, SessionSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user: Option<UserProfile>,
    /// `true` until the first session query settles.
    pub loading: bool,
}

impl Default for CurrentUser {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

type FetchOutcome = (u64, UserId, Result<Option<UserProfile>, FetchError>);

pub struct SessionObserver;

impl SessionObserver {
    /// Start observing. Dropping the handle tears the observer down.
    pub fn spawn(
        source: Arc<dyn SessionSource>,
        fetcher: Arc<dyn ProfileFetcher>,
    ) -> ObserverHandle {
        let (tx, rx) = watch::channel(CurrentUser::default());
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(run(source, fetcher, tx, shutdown.clone()));

        ObserverHandle {
            state: rx,
            shutdown,
            task: Some(task),
        }
    }
}

pub struct ObserverHandle {
    state: watch::Receiver<CurrentUser>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ObserverHandle {
    /// Snapshot of the cell.
    pub fn current(&self) -> CurrentUser {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every change to the cell.
    pub fn watch(&self) -> watch::Receiver<CurrentUser> {
        self.state.clone()
    }

    /// Stop the observer and wait for it to release its subscription.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Tracker {
    fetcher: Arc<dyn ProfileFetcher>,
    tx: watch::Sender<CurrentUser>,
    generation: u64,
    fetches: JoinSet<FetchOutcome>,
}

impl Tracker {
    /// A new session (or none) supersedes everything in flight.
    fn session_changed(&mut self, session: Option<&Session>) {
        self.generation += 1;
        match session {
            Some(session) => {
                let generation = self.generation;
                let id = session.subject_id();
                let fetcher = self.fetcher.clone();
                self.fetches.spawn(async move {
                    let result = fetcher.fetch_profile(&id).await;
                    (generation, id, result)
                });
            }
            None => {
                self.fetches.abort_all();
                self.tx.send_modify(|cell| {
                    cell.user = None;
                    cell.loading = false;
                });
            }
        }
    }

    fn fetch_finished(&mut self, (generation, id, result): FetchOutcome) {
        if generation != self.generation {
            tracing::debug!(
                user_id = %id,
                generation,
                current = self.generation,
                "discarding stale profile fetch"
            );
            return;
        }

        match result {
            Ok(user) => {
                if user.is_none() {
                    tracing::debug!(user_id = %id, "session has no profile");
                }
                self.tx.send_modify(|cell| {
                    cell.user = user;
                    cell.loading = false;
                });
            }
            Err(err) => {
                // A profile may only outlive a failed refresh of the same subject.
                self.tx.send_modify(|cell| {
                    if cell.user.as_ref().map(|u| u.id) == Some(id) {
                        tracing::warn!(
                            user_id = %id,
                            error = %err,
                            "profile fetch failed; keeping user"
                        );
                    } else {
                        tracing::warn!(
                            user_id = %id,
                            error = %err,
                            "profile fetch failed; clearing user"
                        );
                        cell.user = None;
                    }
                    cell.loading = false;
                });
            }
        }
    }

    async fn resync(&mut self, source: &dyn SessionSource) {
        match source.current_session().await {
            Ok(session) => self.session_changed(session.as_ref()),
            Err(err) => {
                tracing::warn!(error = %err, "session query failed");
                self.tx.send_modify(|cell| cell.loading = false);
            }
        }
    }
}

async fn run(
    source: Arc<dyn SessionSource>,
    fetcher: Arc<dyn ProfileFetcher>,
    tx: watch::Sender<CurrentUser>,
    shutdown: Arc<Notify>,
) {
    let mut events = source.subscribe();
    let mut tracker = Tracker {
        fetcher,
        tx,
        generation: 0,
        fetches: JoinSet::new(),
    };

    tracker.resync(source.as_ref()).await;

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                tracing::debug!("session observer shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(change) => {
                    tracing::debug!(event = ?change.event, "session change");
                    tracker.session_changed(change.session.as_ref());
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "session events dropped; re-querying session");
                    tracker.resync(source.as_ref()).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("session source closed");
                    break;
                }
            },
            Some(joined) = tracker.fetches.join_next(), if !tracker.fetches.is_empty() => {
                match joined {
                    Ok(outcome) => tracker.fetch_finished(outcome),
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => tracing::error!(error = %err, "profile fetch task panicked"),
                }
            }
        }
    }

    tracker.fetches.shutdown().await;
}
