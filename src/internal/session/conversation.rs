//! The live, lockable conversation state of one interactive run.
//!
//! Every mutable field sits behind a single `RwLock`. Public methods hold it
//! for the shortest span they can and never call back into the session while
//! it is held; the change observer runs after the guard is dropped.
//!
//! Each history mutation bumps `version` exactly once, which makes
//! [`Session::set_history_if_version`] usable as a compare-and-swap by callers
//! that read, rewrite and resubmit the history without holding the lock.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{
    content::Content,
    observer::{self, HistoryChange, HistoryObserver},
    serializer::{deserialize_history, generate_summary, serialize_history},
    state::{SessionId, SessionState, generate_session_id},
};

/// Upper bound on history length enforced by the sliding-window trim.
pub const MAX_MESSAGES: usize = 100;

/// Leading entries never evicted by the trim (system turn and its reply).
pub const PINNED_PREFIX: usize = 2;

/// A conversation session shared between the foreground loop and the
/// lifecycle manager. Wrap it in an `Arc` to share it.
pub struct Session {
    id: SessionId,
    start_time: DateTime<Utc>,
    inner: RwLock<SessionInner>,
    observer: RwLock<Option<Arc<dyn HistoryObserver>>>,
}

struct SessionInner {
    history: Vec<Content>,
    /// `token_counts[i]` is the cost of `history[i]`; may be shorter than history.
    token_counts: Vec<u64>,
    total_tokens: u64,
    version: u64,
    branches: BTreeMap<String, Arc<Session>>,
    checkpoints: BTreeMap<String, usize>,
    scratchpad: String,
    system_instruction: String,
    working_dir: String,
    last_active: DateTime<Utc>,
}

impl SessionInner {
    fn empty(working_dir: String) -> Self {
        Self {
            history: Vec::new(),
            token_counts: Vec::new(),
            total_tokens: 0,
            version: 0,
            branches: BTreeMap::new(),
            checkpoints: BTreeMap::new(),
            scratchpad: String::new(),
            system_instruction: String::new(),
            working_dir,
            last_active: Utc::now(),
        }
    }

    fn push_entry(&mut self, entry: Content, tokens: Option<u64>) {
        match tokens {
            Some(tokens) => {
                self.token_counts.resize(self.history.len(), 0);
                self.token_counts.push(tokens);
                self.total_tokens = self.total_tokens.saturating_add(tokens);
            }
            None if self.token_counts.len() == self.history.len() => self.token_counts.push(0),
            None => {}
        }
        self.history.push(entry);
    }

    /// Evict the middle of the history once it exceeds [`MAX_MESSAGES`].
    fn trim(&mut self) -> bool {
        let len = self.history.len();
        if len <= MAX_MESSAGES {
            return false;
        }
        let tail_start = len - (MAX_MESSAGES - PINNED_PREFIX);
        self.history.drain(PINNED_PREFIX..tail_start);

        let counts_len = self.token_counts.len();
        if counts_len > PINNED_PREFIX {
            self.token_counts
                .drain(PINNED_PREFIX..tail_start.min(counts_len));
        }
        self.recompute_total();
        tracing::debug!(removed = len - self.history.len(), "trimmed session history");
        true
    }

    fn recompute_total(&mut self) {
        self.total_tokens = saturating_total(&self.token_counts);
    }

    /// Record a finished history mutation and describe it for the observer.
    fn commit(&mut self, old_count: usize) -> HistoryChange {
        self.version += 1;
        self.last_active = Utc::now();
        let len = self.history.len();
        self.checkpoints.retain(|_, index| *index <= len);
        HistoryChange {
            old_count,
            new_count: len,
            version: self.version,
        }
    }
}

impl Session {
    /// Create an empty session with a fresh identifier.
    pub fn new(working_dir: impl Into<String>) -> Self {
        Self::from_parts(
            generate_session_id(),
            Utc::now(),
            SessionInner::empty(working_dir.into()),
        )
    }

    fn from_parts(id: SessionId, start_time: DateTime<Utc>, inner: SessionInner) -> Self {
        Self {
            id,
            start_time,
            inner: RwLock::new(inner),
            observer: RwLock::new(None),
        }
    }

    /// Rebuild a session that keeps the identity of a persisted one.
    pub fn from_state(state: &SessionState) -> Self {
        let history = deserialize_history(&state.history);
        let mut inner = SessionInner::empty(state.working_dir.clone());
        inner.token_counts = aligned_counts(state, history.len());
        inner.history = history;
        inner.trim();
        inner.recompute_total();
        inner.version = state.version;
        inner.scratchpad = state.scratchpad.clone();
        inner.system_instruction = state.system_instruction.clone();
        inner.last_active = state.last_active;
        Self::from_parts(state.id.clone(), state.start_time, inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: HistoryChange) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        observer::dispatch(observer, change);
    }

    /// Apply `mutate` under the write lock, commit, then notify unlocked.
    fn mutate_history(&self, mutate: impl FnOnce(&mut SessionInner)) -> HistoryChange {
        let change = {
            let mut inner = self.write();
            let old_count = inner.history.len();
            mutate(&mut *inner);
            inner.commit(old_count)
        };
        self.notify(change);
        change
    }

    // ── Identity and accessors ───────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.read().last_active
    }

    pub fn working_dir(&self) -> String {
        self.read().working_dir.clone()
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    pub fn len(&self) -> usize {
        self.read().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().history.is_empty()
    }

    pub fn total_tokens(&self) -> u64 {
        self.read().total_tokens
    }

    pub fn token_counts(&self) -> Vec<u64> {
        self.read().token_counts.clone()
    }

    /// Register the change observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn HistoryObserver>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    pub fn clear_observer(&self) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn add_user_message(&self, text: impl Into<String>) -> HistoryChange {
        self.add_content(Content::user(text))
    }

    pub fn add_model_message(&self, text: impl Into<String>) -> HistoryChange {
        self.add_content(Content::model(text))
    }

    /// Append one entry with unknown token cost.
    pub fn add_content(&self, entry: Content) -> HistoryChange {
        self.mutate_history(|inner| {
            inner.push_entry(entry, None);
            inner.trim();
        })
    }

    /// Append one entry together with its token cost.
    pub fn add_content_with_tokens(&self, entry: Content, tokens: u64) -> HistoryChange {
        self.mutate_history(|inner| {
            inner.push_entry(entry, Some(tokens));
            inner.trim();
        })
    }

    /// Replace the whole history. Token costs are unknown afterwards.
    pub fn set_history(&self, entries: Vec<Content>) -> HistoryChange {
        self.mutate_history(|inner| replace_history(inner, entries))
    }

    /// Replace the history only if nobody has changed it since `expected_version`.
    ///
    /// A `false` return is a normal outcome: reread and retry.
    pub fn set_history_if_version(&self, entries: Vec<Content>, expected_version: u64) -> bool {
        let change = {
            let mut inner = self.write();
            if inner.version != expected_version {
                return false;
            }
            let old_count = inner.history.len();
            replace_history(&mut inner, entries);
            inner.commit(old_count)
        };
        self.notify(change);
        true
    }

    /// Independent copy of the history.
    pub fn history(&self) -> Vec<Content> {
        self.read().history.clone()
    }

    /// Independent copy of the history and the version it was read at.
    pub fn history_with_version(&self) -> (Vec<Content>, u64) {
        let inner = self.read();
        (inner.history.clone(), inner.version)
    }

    /// Apply the sliding-window trim now. Returns `true` if entries were removed.
    pub fn trim_history(&self) -> bool {
        let change = {
            let mut inner = self.write();
            let old_count = inner.history.len();
            if !inner.trim() {
                return false;
            }
            inner.commit(old_count)
        };
        self.notify(change);
        true
    }

    /// Collapse `history[..up_to_index]` into `summary`, keeping the rest verbatim.
    pub fn replace_with_summary(
        &self,
        up_to_index: usize,
        summary: Content,
        summary_tokens: u64,
    ) -> HistoryChange {
        self.mutate_history(|inner| {
            let up_to = up_to_index.min(inner.history.len());

            let mut history = Vec::with_capacity(inner.history.len() - up_to + 1);
            history.push(summary);
            history.extend(inner.history.drain(up_to..));

            let mut counts = vec![summary_tokens];
            if inner.token_counts.len() > up_to {
                counts.extend_from_slice(&inner.token_counts[up_to..]);
            }

            inner.history = history;
            inner.token_counts = counts;
            inner.trim();
            inner.recompute_total();
        })
    }

    /// Drop the whole history, its token costs and every checkpoint.
    pub fn clear(&self) -> HistoryChange {
        self.mutate_history(|inner| {
            inner.history.clear();
            inner.token_counts.clear();
            inner.checkpoints.clear();
            inner.total_tokens = 0;
        })
    }

    // ── Scratchpad and system instruction ───────────────────────────

    pub fn scratchpad(&self) -> String {
        self.read().scratchpad.clone()
    }

    pub fn set_scratchpad(&self, text: impl Into<String>) {
        self.write().scratchpad = text.into();
    }

    pub fn append_scratchpad(&self, text: &str) {
        let mut inner = self.write();
        if !inner.scratchpad.is_empty() && !inner.scratchpad.ends_with('\n') {
            inner.scratchpad.push('\n');
        }
        inner.scratchpad.push_str(text);
    }

    pub fn system_instruction(&self) -> String {
        self.read().system_instruction.clone()
    }

    pub fn set_system_instruction(&self, text: impl Into<String>) {
        self.write().system_instruction = text.into();
    }

    // ── Branches ─────────────────────────────────────────────────────

    /// Fork an independent copy of this session under `name`.
    ///
    /// The branch gets id `<parent>-<name>`, a fresh start time and version 0.
    /// Characters of `name` outside `[A-Za-z0-9_.-]` become `-` in the id; the
    /// branch is still listed under the raw name. Forking again with the same name replaces the earlier branch.
    pub fn fork(&self, name: &str) -> Arc<Session> {
        let copy = {
            let inner = self.read();
            let mut copy = SessionInner::empty(inner.working_dir.clone());
            copy.history = inner.history.clone();
            copy.token_counts = inner.token_counts.clone();
            copy.total_tokens = inner.total_tokens;
            copy.scratchpad = inner.scratchpad.clone();
            copy.system_instruction = inner.system_instruction.clone();
            copy
        };
        let branch = Arc::new(Session::from_parts(
            format!("{}-{}", self.id, branch_id_suffix(name)),
            Utc::now(),
            copy,
        ));
        self.write()
            .branches
            .insert(name.to_string(), Arc::clone(&branch));
        tracing::debug!(session = %self.id, branch = name, "forked session");
        branch
    }

    /// Branch names in sorted order.
    pub fn list_branches(&self) -> Vec<String> {
        self.read().branches.keys().cloned().collect()
    }

    pub fn branch(&self, name: &str) -> Option<Arc<Session>> {
        self.read().branches.get(name).cloned()
    }

    pub fn delete_branch(&self, name: &str) -> bool {
        self.write().branches.remove(name).is_some()
    }

    // ── Checkpoints ──────────────────────────────────────────────────

    /// Remember the current history length under `name`.
    pub fn save_checkpoint(&self, name: &str) {
        let mut inner = self.write();
        let len = inner.history.len();
        inner.checkpoints.insert(name.to_string(), len);
    }

    /// Truncate the history back to checkpoint `name`.
    ///
    /// Checkpoints past the new length are dropped. Returns `false`, changing
    /// nothing, when the checkpoint does not exist. The pinned prefix is not
    /// protected here: an early checkpoint can truncate it away.
    pub fn restore_checkpoint(&self, name: &str) -> bool {
        let change = {
            let mut inner = self.write();
            let Some(&index) = inner.checkpoints.get(name) else {
                return false;
            };
            let old_count = inner.history.len();
            let index = index.min(old_count);
            inner.history.truncate(index);
            inner.token_counts.truncate(index);
            inner.recompute_total();
            inner.commit(old_count)
        };
        self.notify(change);
        true
    }

    /// Checkpoint names in sorted order.
    pub fn list_checkpoints(&self) -> Vec<String> {
        self.read().checkpoints.keys().cloned().collect()
    }

    pub fn checkpoint_index(&self, name: &str) -> Option<usize> {
        self.read().checkpoints.get(name).copied()
    }

    pub fn delete_checkpoint(&self, name: &str) -> bool {
        self.write().checkpoints.remove(name).is_some()
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Consistent durable snapshot of this session.
    pub fn snapshot(&self) -> SessionState {
        let mut state = {
            let inner = self.read();
            SessionState {
                id: self.id.clone(),
                start_time: self.start_time,
                last_active: inner.last_active,
                working_dir: inner.working_dir.clone(),
                history: serialize_history(&inner.history),
                token_counts: inner.token_counts.clone(),
                total_tokens: inner.total_tokens,
                version: inner.version,
                summary: String::new(),
                scratchpad: inner.scratchpad.clone(),
                system_instruction: inner.system_instruction.clone(),
            }
        };
        state.summary = generate_summary(&state);
        state
    }

    /// Replace history, token costs, scratchpad, system instruction and
    /// version with those of `state`. The session keeps its own identity.
    pub fn restore_state(&self, state: &SessionState) -> HistoryChange {
        let history = deserialize_history(&state.history);
        let counts = aligned_counts(state, history.len());
        let change = {
            let mut inner = self.write();
            let old_count = inner.history.len();
            inner.history = history;
            inner.token_counts = counts;
            inner.trim();
            inner.recompute_total();
            inner.scratchpad = state.scratchpad.clone();
            inner.system_instruction = state.system_instruction.clone();
            inner.version = state.version;
            inner.last_active = Utc::now();
            let len = inner.history.len();
            inner.checkpoints.retain(|_, index| *index <= len);
            HistoryChange {
                old_count,
                new_count: len,
                version: inner.version,
            }
        };
        self.notify(change);
        change
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("version", &inner.version)
            .field("messages", &inner.history.len())
            .field("total_tokens", &inner.total_tokens)
            .finish()
    }
}

/// A branch name reduced to characters that are safe in a session id.
fn branch_id_suffix(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn replace_history(inner: &mut SessionInner, entries: Vec<Content>) {
    inner.history = entries;
    inner.token_counts.clear();
    inner.trim();
    inner.recompute_total();
}

fn saturating_total(counts: &[u64]) -> u64 {
    counts
        .iter()
        .fold(0u64, |total, &tokens| total.saturating_add(tokens))
}

/// Token counts from a persisted state, cut to the history they describe.
fn aligned_counts(state: &SessionState, history_len: usize) -> Vec<u64> {
    let mut counts = state.token_counts.clone();
    counts.truncate(history_len);
    let sum = saturating_total(&counts);
    if sum != state.total_tokens {
        tracing::warn!(
            session = %state.id,
            stored = state.total_tokens,
            recomputed = sum,
            "persisted token total disagrees with token counts; using recomputed value"
        );
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::session::content::{Part, Role};
    use std::sync::Mutex;

    fn assert_token_invariant(session: &Session) {
        let counts = session.token_counts();
        assert!(counts.len() <= session.len());
        assert_eq!(counts.iter().sum::<u64>(), session.total_tokens());
    }

    fn numbered(n: usize) -> Content {
        Content::user(format!("message {n}"))
    }

    #[test]
    fn test_appends_bump_version_once_each() {
        let session = Session::new("/tmp");
        let before = session.version();
        for i in 0..150 {
            session.add_content_with_tokens(numbered(i), 1);
        }
        assert_eq!(session.version(), before + 150);
        assert!(session.len() <= MAX_MESSAGES);
        assert_token_invariant(&session);
    }

    #[test]
    fn test_trim_keeps_pinned_prefix_and_recent_tail() {
        let session = Session::new("/tmp");
        let all: Vec<Content> = (0..MAX_MESSAGES + 7).map(numbered).collect();
        for entry in &all {
            session.add_content_with_tokens(entry.clone(), 2);
        }

        let history = session.history();
        assert_eq!(history.len(), MAX_MESSAGES);
        assert_eq!(&history[..PINNED_PREFIX], &all[..PINNED_PREFIX]);
        let keep = MAX_MESSAGES - PINNED_PREFIX;
        assert_eq!(&history[PINNED_PREFIX..], &all[all.len() - keep..]);
        assert_eq!(session.total_tokens(), 2 * MAX_MESSAGES as u64);
        assert_token_invariant(&session);
    }

    #[test]
    fn test_token_counts_stay_prefix_aligned() {
        let session = Session::new("/tmp");
        session.add_content_with_tokens(numbered(0), 5);
        session.add_content(numbered(1));
        session.add_content_with_tokens(numbered(2), 7);
        assert_eq!(session.token_counts(), vec![5, 0, 7]);

        session.set_history(vec![numbered(0), numbered(1)]);
        assert!(session.token_counts().is_empty());
        session.add_content(numbered(2));
        assert!(session.token_counts().is_empty());
        session.add_content_with_tokens(numbered(3), 4);
        assert_eq!(session.token_counts(), vec![0, 0, 0, 4]);
        assert_eq!(session.total_tokens(), 4);
    }

    #[test]
    fn test_set_history_if_version() {
        let session = Session::new("/tmp");
        session.add_user_message("hello");
        let (mut history, version) = session.history_with_version();
        history.push(Content::model("hi"));

        assert!(!session.set_history_if_version(history.clone(), version + 1));
        assert_eq!(session.len(), 1);
        assert_eq!(session.version(), version);

        assert!(session.set_history_if_version(history.clone(), version));
        assert_eq!(session.len(), 2);
        assert!(!session.set_history_if_version(history, version));
        assert_eq!(session.version(), version + 1);
    }

    #[test]
    fn test_history_copy_is_independent() {
        let session = Session::new("/tmp");
        session.add_user_message("original");
        let mut copy = session.history();
        copy[0] = Content::user("mutated");
        copy.push(Content::model("extra"));
        assert_eq!(session.history(), vec![Content::user("original")]);
    }

    #[test]
    fn test_checkpoint_restore_truncates_and_drops_later_checkpoints() {
        let session = Session::new("/tmp");
        for i in 0..5 {
            session.add_content_with_tokens(numbered(i), 3);
        }
        session.save_checkpoint("a");
        for i in 5..7 {
            session.add_content_with_tokens(numbered(i), 3);
        }
        session.save_checkpoint("b");
        session.add_content_with_tokens(numbered(7), 3);
        assert_eq!(session.len(), 8);

        let version = session.version();
        assert!(session.restore_checkpoint("a"));
        assert_eq!(session.len(), 5);
        assert_eq!(session.version(), version + 1);
        assert_eq!(session.list_checkpoints(), vec!["a".to_string()]);
        assert_eq!(session.total_tokens(), 15);
        assert_token_invariant(&session);

        assert!(!session.restore_checkpoint("b"));
        assert_eq!(session.version(), version + 1);
    }

    #[test]
    fn test_replace_with_summary() {
        let session = Session::new("/tmp");
        for i in 0..6 {
            session.add_content_with_tokens(numbered(i), 10);
        }
        session.replace_with_summary(4, Content::model("summary of 0..4"), 3);

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], Content::model("summary of 0..4"));
        assert_eq!(history[1], numbered(4));
        assert_eq!(session.token_counts(), vec![3, 10, 10]);
        assert_eq!(session.total_tokens(), 23);

        // Clamped past the end.
        session.replace_with_summary(99, Content::model("all"), 1);
        assert_eq!(session.history(), vec![Content::model("all")]);
        assert_eq!(session.total_tokens(), 1);
    }

    #[test]
    fn test_fork_is_independent() {
        let session = Session::new("/tmp");
        session.add_user_message("shared");
        session.set_scratchpad("notes");
        let version = session.version();

        let branch = session.fork("experiment");
        assert_eq!(branch.id(), format!("{}-experiment", session.id()));
        assert_eq!(session.version(), version);

        branch.add_model_message("only in branch");
        branch.set_scratchpad("branch notes");
        session.add_model_message("only in parent");

        assert_eq!(branch.history()[1], Content::model("only in branch"));
        assert_eq!(session.history()[1], Content::model("only in parent"));
        assert_eq!(session.scratchpad(), "notes");
        assert_eq!(session.list_branches(), vec!["experiment".to_string()]);
        assert!(session.branch("experiment").is_some());
        assert!(session.delete_branch("experiment"));
        assert!(session.list_branches().is_empty());
    }

    #[test]
    fn test_list_branches_sorted() {
        let session = Session::new("/tmp");
        session.fork("zeta");
        session.fork("alpha");
        session.fork("mid");
        assert_eq!(session.list_branches(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_fork_id_replaces_unsafe_characters() {
        let session = Session::new("/tmp");
        let branch = session.fork("feature/login retry");
        assert_eq!(branch.id(), format!("{}-feature-login-retry", session.id()));
        assert!(crate::utils::storage::validate_id(branch.id()).is_ok());
        assert_eq!(session.list_branches(), vec!["feature/login retry"]);
        assert!(session.branch("feature/login retry").is_some());
    }

    #[test]
    fn test_observer_runs_without_lock() {
        let session = Arc::new(Session::new("/tmp"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (observed, sink) = (Arc::clone(&session), Arc::clone(&seen));
        // Reading the session from inside the callback would deadlock if the
        // write lock were still held.
        session.set_observer(Arc::new(move |change: HistoryChange| {
            sink.lock().unwrap().push((change, observed.len()));
        }));

        session.add_user_message("one");
        session.add_model_message("two");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].0,
            HistoryChange {
                old_count: 1,
                new_count: 2,
                version: 2
            }
        );
        assert_eq!(seen[1].1, 2);
    }

    #[test]
    fn test_panicking_observer_does_not_poison_session() {
        let session = Session::new("/tmp");
        fn explode(_: HistoryChange) {
            panic!("boom");
        }
        session.set_observer(Arc::new(explode));
        session.add_user_message("still fine");
        session.clear_observer();
        session.add_model_message("and again");
        assert_eq!(session.len(), 2);
        assert_eq!(session.version(), 2);
    }

    #[test]
    fn test_last_observer_wins() {
        let session = Session::new("/tmp");
        let first = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(0));
        let f = Arc::clone(&first);
        session.set_observer(Arc::new(move |_: HistoryChange| *f.lock().unwrap() += 1));
        let s = Arc::clone(&second);
        session.set_observer(Arc::new(move |_: HistoryChange| *s.lock().unwrap() += 1));
        session.add_user_message("x");
        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_and_restore_state() {
        let session = Session::new("/work");
        session.set_system_instruction("be terse");
        session.add_content_with_tokens(Content::user("setup"), 4);
        session.add_content_with_tokens(Content::model("ok"), 2);
        session.add_content_with_tokens(
            Content::new(Role::User, vec![Part::text("refactor the parser")]),
            6,
        );
        session.set_scratchpad("todo: tests");
        let state = session.snapshot();
        assert_eq!(state.summary, "refactor the parser");
        assert_eq!(state.version, 3);

        let fresh = Session::new("/elsewhere");
        fresh.add_user_message("throwaway");
        fresh.restore_state(&state);
        assert_eq!(fresh.history(), session.history());
        assert_eq!(fresh.version(), 3);
        assert_eq!(fresh.total_tokens(), 12);
        assert_eq!(fresh.scratchpad(), "todo: tests");
        assert_eq!(fresh.system_instruction(), "be terse");
        assert_ne!(fresh.id(), session.id());

        let rebuilt = Session::from_state(&state);
        assert_eq!(rebuilt.id(), session.id());
        assert_eq!(rebuilt.history(), session.history());
    }

    #[test]
    fn test_restore_state_survives_one_bad_entry() {
        let session = Session::new("/work");
        session.add_content_with_tokens(Content::user("setup"), 1);
        session.add_content_with_tokens(Content::model("ok"), 1);
        session.add_content_with_tokens(Content::user("next"), 1);
        let mut state = session.snapshot();
        state.history[1].role = "assistant".to_string();

        let fresh = Session::new("/work");
        let change = fresh.restore_state(&state);
        assert_eq!(change.new_count, 3);
        assert_eq!(fresh.len(), 3);
        assert_eq!(fresh.history()[1].role, Role::User);
        assert_eq!(fresh.history()[2], Content::user("next"));
        assert_eq!(Session::from_state(&state).len(), 3);
    }

    #[test]
    fn test_huge_token_counts_saturate() {
        let session = Session::new("/work");
        session.add_content_with_tokens(Content::user("a"), u64::MAX);
        session.add_content_with_tokens(Content::model("b"), 5);
        assert_eq!(session.total_tokens(), u64::MAX);

        session.set_history(session.history());
        session.add_content_with_tokens(Content::user("c"), u64::MAX - 1);
        session.add_content_with_tokens(Content::model("d"), 10);
        assert_eq!(session.token_counts(), vec![0, 0, u64::MAX - 1, 10]);
        assert_eq!(session.total_tokens(), u64::MAX);

        let rebuilt = Session::from_state(&session.snapshot());
        assert_eq!(rebuilt.total_tokens(), u64::MAX);
    }

    #[test]
    fn test_clear_resets_everything() {
        let session = Session::new("/tmp");
        session.add_content_with_tokens(numbered(0), 9);
        session.save_checkpoint("start");
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.total_tokens(), 0);
        assert!(session.list_checkpoints().is_empty());
        assert_eq!(session.version(), 2);
    }

    #[test]
    fn test_explicit_trim_is_noop_when_short() {
        let session = Session::new("/tmp");
        session.add_user_message("a");
        let version = session.version();
        assert!(!session.trim_history());
        assert_eq!(session.version(), version);
    }

    #[test]
    fn test_append_scratchpad() {
        let session = Session::new("/tmp");
        session.append_scratchpad("first");
        session.append_scratchpad("second");
        assert_eq!(session.scratchpad(), "first\nsecond");
        assert_eq!(session.version(), 0);
    }
}
