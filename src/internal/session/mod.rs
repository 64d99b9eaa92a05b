//! Conversation state: the live session, its durable form and its lifecycle.
//!
//! A [`Session`] owns the history of one interactive run. It is versioned for
//! compare-and-swap updates, trims itself to a bounded window, and supports
//! branches and checkpoints. [`SessionManager`] persists it into a
//! [`BlobStore`](crate::utils::storage::BlobStore) on a timer, after each turn
//! and on shutdown, and finds the most recent session again at startup.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vega::internal::config::LifecycleConfig;
//! use vega::internal::session::{Session, SessionManager};
//! use vega::utils::storage::local::LocalBlobStore;
//!
//! # async fn run() -> vega::internal::session::error::Result<()> {
//! let store = Arc::new(LocalBlobStore::open_default()?);
//! let session = Arc::new(Session::new("/path/to/project"));
//! let manager = SessionManager::new(session.clone(), store, LifecycleConfig::default());
//!
//! if let Some((state, _summary)) = manager.load_last().await? {
//!     manager.restore_from_state(&state);
//! }
//! manager.start();
//!
//! session.add_user_message("implement auth");
//! manager.save_after_message().await?;
//!
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod conversation;
pub mod error;
pub mod export;
pub mod manager;
pub mod observer;
pub mod redact;
pub mod serializer;
pub mod state;

pub use content::{Content, FunctionCall, FunctionResponse, Part, PartKind, Role};
pub use conversation::{MAX_MESSAGES, PINNED_PREFIX, Session};
pub use error::SessionError;
pub use manager::{CleanupReport, SessionManager};
pub use observer::{HistoryChange, HistoryObserver};
pub use state::{HistorySummary, SessionId, SessionState};
