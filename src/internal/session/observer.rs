//! History change notification.
//!
//! A session holds at most one observer. It is always invoked after the
//! session lock has been released, so an observer may call back into the
//! session freely. A panicking observer is caught and logged; it never
//! reaches the caller that mutated the history.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Payload delivered after every history mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryChange {
    pub old_count: usize,
    pub new_count: usize,
    pub version: u64,
}

/// Receives [`HistoryChange`] notifications from a session.
pub trait HistoryObserver: Send + Sync {
    fn on_history_changed(&self, change: HistoryChange);
}

impl<F> HistoryObserver for F
where
    F: Fn(HistoryChange) + Send + Sync,
{
    fn on_history_changed(&self, change: HistoryChange) {
        self(change)
    }
}

/// Invoke `observer`, swallowing any panic it raises.
pub(crate) fn dispatch(observer: Option<Arc<dyn HistoryObserver>>, change: HistoryChange) {
    let Some(observer) = observer else {
        return;
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_history_changed(change)));
    if outcome.is_err() {
        tracing::warn!(
            version = change.version,
            "history observer panicked; notification dropped"
        );
    }
}
