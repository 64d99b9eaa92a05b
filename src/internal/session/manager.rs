//! Session lifecycle: periodic auto-save, startup recovery and retention.
//!
//! ```text
//! stopped --start--> running (save timer armed) --stop--> stopped (final save)
//! ```
//!
//! The manager never holds the session lock across I/O: it takes a snapshot,
//! then writes it. Saves are serialized among themselves so an older snapshot
//! can never land on disk after a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    conversation::Session,
    error::Result,
    state::{HistorySummary, SessionId, SessionState},
};
use crate::{
    internal::config::LifecycleConfig,
    utils::storage::{BlobStore, Namespace},
};

/// Outcome of one retention sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<SessionId>,
    /// Sessions that should have been deleted, with the error that stopped it.
    pub failed: Vec<(SessionId, String)>,
}

struct SaveTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Bookkeeping {
    last_save: Option<DateTime<Utc>>,
    timer: Option<SaveTimer>,
}

/// Persists one live [`Session`] into a [`BlobStore`].
pub struct SessionManager {
    session: Arc<Session>,
    store: Arc<dyn BlobStore>,
    config: LifecycleConfig,
    bookkeeping: Mutex<Bookkeeping>,
    save_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        session: Arc<Session>,
        store: Arc<dyn BlobStore>,
        config: LifecycleConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            store,
            config,
            bookkeeping: Mutex::new(Bookkeeping::default()),
            save_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn bookkeeping(&self) -> MutexGuard<'_, Bookkeeping> {
        self.bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the periodic save and kick off a background retention sweep.
    ///
    /// No-op when disabled, already running, or called outside a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            tracing::debug!("session autosave disabled");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("session manager started outside a tokio runtime; autosave not armed");
            return;
        };

        let mut bookkeeping = self.bookkeeping();
        if bookkeeping.timer.is_some() {
            return;
        }

        let sweeper = Arc::clone(self);
        runtime.spawn(async move {
            match sweeper.cleanup_old_sessions().await {
                Ok(report) if !report.deleted.is_empty() => {
                    tracing::debug!(deleted = report.deleted.len(), "retention sweep finished");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("retention sweep failed: {e}"),
            }
        });

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(save_loop(
            Arc::downgrade(self),
            cancel.clone(),
            self.config.save_interval(),
        ));
        bookkeeping.timer = Some(SaveTimer { cancel, handle });
        tracing::debug!(
            session = %self.session.id(),
            interval_secs = self.config.save_interval().as_secs(),
            "session autosave armed"
        );
    }

    /// Cancel the timer, wait for it, then save one last time.
    ///
    /// A failing final save is logged, never returned.
    pub async fn stop(&self) {
        let timer = self.bookkeeping().timer.take();
        if let Some(timer) = timer {
            timer.cancel.cancel();
            if let Err(e) = timer.handle.await {
                tracing::warn!("save timer ended abnormally: {e}");
            }
        }
        if let Err(e) = self.save().await {
            tracing::error!(session = %self.session.id(), "final session save failed: {e}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.bookkeeping().timer.is_some()
    }

    /// When the last successful save finished.
    pub fn last_save(&self) -> Option<DateTime<Utc>> {
        self.bookkeeping().last_save
    }

    /// Write the full state and its history summary. No-op when disabled.
    pub async fn save(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let _gate = self.save_gate.lock().await;

        let state = self.session.snapshot();
        let full = serde_json::to_vec_pretty(&state)?;
        let summary = serde_json::to_vec_pretty(&state.to_summary())?;
        self.store.put(Namespace::Session, &state.id, &full).await?;
        self.store
            .put(Namespace::History, &state.id, &summary)
            .await?;

        self.bookkeeping().last_save = Some(Utc::now());
        tracing::debug!(
            session = %state.id,
            messages = state.message_count(),
            version = state.version,
            "session saved"
        );
        Ok(())
    }

    /// Save after a turn has been appended.
    pub async fn save_after_message(&self) -> Result<()> {
        self.save().await
    }

    /// The most recently active persisted session, if auto-load is on.
    pub async fn load_last(&self) -> Result<Option<(SessionState, HistorySummary)>> {
        if !self.config.auto_load {
            return Ok(None);
        }
        load_latest(self.store.as_ref()).await
    }

    /// Apply a loaded state onto the live session.
    pub fn restore_from_state(&self, state: &SessionState) {
        self.session.restore_state(state);
        tracing::debug!(
            session = %self.session.id(),
            restored_from = %state.id,
            messages = state.message_count(),
            "session restored"
        );
    }

    /// Apply the retention policy, sparing the live session.
    pub async fn cleanup_old_sessions(&self) -> Result<CleanupReport> {
        cleanup_sessions(self.store.as_ref(), &self.config, Some(self.session.id())).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<HistorySummary>> {
        list_sessions(self.store.as_ref()).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        delete_session(self.store.as_ref(), id).await
    }
}

/// Self-renewing save timer. Cancellation is checked before every rearm.
async fn save_loop(
    manager: Weak<SessionManager>,
    cancel: CancellationToken,
    interval: std::time::Duration,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let Some(manager) = manager.upgrade() else {
            break;
        };
        if let Err(e) = manager.save().await {
            tracing::error!(session = %manager.session.id(), "periodic session save failed: {e}");
        }
    }
}

/// Read one full session record.
pub async fn load_state(store: &dyn BlobStore, id: &str) -> Result<SessionState> {
    let bytes = store.get(Namespace::Session, id).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn load_summary(store: &dyn BlobStore, id: &str) -> Result<HistorySummary> {
    let from_history = match store.get(Namespace::History, id).await {
        Ok(bytes) => serde_json::from_slice::<HistorySummary>(&bytes).ok(),
        Err(_) => None,
    };
    match from_history {
        Some(summary) => Ok(summary),
        None => Ok(load_state(store, id).await?.to_summary()),
    }
}

/// Pick the persisted session with the latest `last_active`.
///
/// Ties go to the lexicographically greatest id. Corrupt records are skipped.
pub async fn load_latest(store: &dyn BlobStore) -> Result<Option<(SessionState, HistorySummary)>> {
    let mut latest: Option<SessionState> = None;
    for id in store.list(Namespace::Session).await? {
        match load_state(store, &id).await {
            Ok(state) => {
                if latest
                    .as_ref()
                    .is_none_or(|best| (state.last_active, &state.id) > (best.last_active, &best.id))
                {
                    latest = Some(state);
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "skipping corrupt session file");
            }
        }
    }

    let Some(state) = latest else {
        return Ok(None);
    };
    let summary = match load_summary(store, &state.id).await {
        Ok(summary) => summary,
        Err(_) => state.to_summary(),
    };
    Ok(Some((state, summary)))
}

/// Summaries of every persisted session, newest first.
pub async fn list_sessions(store: &dyn BlobStore) -> Result<Vec<HistorySummary>> {
    let mut summaries = Vec::new();
    for id in store.list(Namespace::Session).await? {
        match load_summary(store, &id).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "skipping malformed session file");
            }
        }
    }
    summaries.sort_by(|a, b| {
        b.last_active
            .cmp(&a.last_active)
            .then_with(|| b.id.cmp(&a.id))
    });
    Ok(summaries)
}

/// Remove a session from both namespaces.
pub async fn delete_session(store: &dyn BlobStore, id: &str) -> Result<()> {
    store.delete(Namespace::Session, id).await?;
    store.delete(Namespace::History, id).await
}

/// Delete sessions idle past `max_age_days` or ranked past `max_sessions`.
///
/// `active` is counted in the ranking but never deleted. Individual deletion
/// failures are logged and reported, not returned.
pub async fn cleanup_sessions(
    store: &dyn BlobStore,
    config: &LifecycleConfig,
    active: Option<&str>,
) -> Result<CleanupReport> {
    let summaries = list_sessions(store).await?;
    let cutoff = config.max_age().map(|age| Utc::now() - age);
    let mut report = CleanupReport::default();

    for (rank, summary) in summaries.iter().enumerate() {
        if active == Some(summary.id.as_str()) {
            continue;
        }
        let expired = cutoff.is_some_and(|cutoff| summary.last_active < cutoff);
        let excess = config.max_sessions > 0 && rank >= config.max_sessions;
        if !expired && !excess {
            continue;
        }
        match delete_session(store, &summary.id).await {
            Ok(()) => report.deleted.push(summary.id.clone()),
            Err(e) => {
                tracing::warn!(session_id = %summary.id, "failed to delete old session: {e}");
                report.failed.push((summary.id.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}
