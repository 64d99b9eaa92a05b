//! Key-addressed blob storage for persisted session records.
pub mod local;
pub mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::internal::session::error::Result;

/// Independent key spaces inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Lightweight per-session summaries used by listings.
    History,
    /// Full session state.
    Session,
}

impl Namespace {
    /// Directory name of this namespace under the data directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Namespace::History => "history",
            Namespace::Session => "sessions",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::History => f.write_str("history"),
            Namespace::Session => f.write_str("session"),
        }
    }
}

/// Storage backend abstraction interface.
///
/// Values are opaque bytes; callers own the encoding.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `id`, replacing any previous value.
    async fn put(&self, namespace: Namespace, id: &str, data: &[u8]) -> Result<()>;

    /// Fetch the value stored under `id`.
    /// Returns [`SessionError::NotFound`](crate::internal::session::error::SessionError::NotFound) if absent.
    async fn get(&self, namespace: Namespace, id: &str) -> Result<Vec<u8>>;

    /// All ids in the namespace, in no particular order.
    async fn list(&self, namespace: Namespace) -> Result<Vec<String>>;

    /// Remove `id`. Deleting an absent id succeeds.
    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()>;
}

/// Reject ids that are empty or could escape the namespace directory.
pub fn validate_id(id: &str) -> Result<()> {
    use crate::internal::session::error::SessionError;

    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_names() {
        assert_eq!(Namespace::Session.dir_name(), "sessions");
        assert_eq!(Namespace::History.dir_name(), "history");
        assert_eq!(Namespace::Session.to_string(), "session");
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("20250101-120000123-00ab-0001").is_ok());
        assert!(validate_id("abc-branch_1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("..").is_err());
        assert!(validate_id(".hidden").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a\\b").is_err());
        assert!(validate_id("name with space").is_err());
    }
}
