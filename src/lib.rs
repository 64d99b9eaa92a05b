//! Conversational-state core for an interactive AI-agent CLI.
//!
//! - [`internal::session`]: the live session, serialization, redaction and lifecycle manager
//! - [`internal::config`]: lifecycle configuration
//! - [`utils::storage`]: blob store trait with filesystem and in-memory backends

pub mod cli;
pub mod command;
pub mod internal;
pub mod utils;

pub use internal::config::LifecycleConfig;
pub use internal::session::{
    Content, HistoryChange, Part, Role, Session, SessionError, SessionManager, SessionState,
};
