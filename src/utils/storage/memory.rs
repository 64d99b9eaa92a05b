//! In-process storage backend, used by tests and embedders that persist
//! sessions elsewhere.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    internal::session::error::{Result, SessionError},
    utils::storage::{BlobStore, Namespace, validate_id},
};

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    records: RwLock<HashMap<(Namespace, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, namespace: Namespace, id: &str, data: &[u8]) -> Result<()> {
        validate_id(id)?;
        self.records
            .write()
            .await
            .insert((namespace, id.to_string()), data.to_vec());
        Ok(())
    }

    async fn get(&self, namespace: Namespace, id: &str) -> Result<Vec<u8>> {
        self.records
            .read()
            .await
            .get(&(namespace, id.to_string()))
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                namespace,
                id: id.to_string(),
            })
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn delete(&self, namespace: Namespace, id: &str) -> Result<()> {
        self.records
            .write()
            .await
            .remove(&(namespace, id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let store = MemoryBlobStore::new();
        store.put(Namespace::Session, "x", b"full").await.unwrap();
        assert!(
            store
                .get(Namespace::History, "x")
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(store.list(Namespace::Session).await.unwrap(), vec!["x"]);
        assert!(store.list(Namespace::History).await.unwrap().is_empty());
        store.delete(Namespace::History, "x").await.unwrap();
        assert_eq!(store.get(Namespace::Session, "x").await.unwrap(), b"full");
    }
}
