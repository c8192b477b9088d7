//! In-memory token store for tests and demos

use std::collections::BTreeSet;

use common::TokenRecord;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{StoreFuture, TokenKey, TokenStore};

/// Process-local token store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    items: Mutex<BTreeSet<TokenKey>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored items.
    pub async fn items(&self) -> Vec<TokenKey> {
        self.items.lock().await.iter().cloned().collect()
    }

    pub async fn contains(&self, key: &TokenKey) -> bool {
        self.items.lock().await.contains(key)
    }
}

impl TokenStore for MemoryTokenStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn save<'a>(&'a self, record: &'a TokenRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let key = TokenKey::from_record(record);
            let mut items = self.items.lock().await;
            items.clear();
            items.insert(key);
            debug!(expires_at = record.expires_at, "stored token in memory");
            Ok(())
        })
    }

    fn delete(&self, key: TokenKey) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let removed = self.items.lock().await.remove(&key);
            debug!(removed, "deleted token from memory");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_delete() {
        let store = MemoryTokenStore::new();
        store.save(&TokenRecord::new("new1", 123)).await.unwrap();
        assert!(store.contains(&TokenKey::new("new1", "123")).await);

        store.delete(TokenKey::new("Bearer new1", "123")).await.unwrap();
        assert!(store.items().await.is_empty());
    }

    #[tokio::test]
    async fn deleting_twice_is_not_an_error() {
        let store = MemoryTokenStore::new();
        store.save(&TokenRecord::new("abc123", 1)).await.unwrap();

        let key = TokenKey::new("Bearer abc123", "1");
        store.delete(key.clone()).await.unwrap();
        store.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn delete_requires_matching_expiry() {
        let store = MemoryTokenStore::new();
        store.save(&TokenRecord::new("abc123", 1)).await.unwrap();

        store.delete(TokenKey::new("abc123", "2")).await.unwrap();
        assert_eq!(store.items().await, vec![TokenKey::new("abc123", "1")]);
    }

    #[tokio::test]
    async fn saving_same_record_twice_keeps_one_item() {
        let store = MemoryTokenStore::new();
        let record = TokenRecord::new("new1", 123);
        store.save(&record).await.unwrap();
        store.save(&record).await.unwrap();
        assert_eq!(store.items().await.len(), 1);
    }

    #[tokio::test]
    async fn save_replaces_previous_token() {
        let store = MemoryTokenStore::new();
        store.save(&TokenRecord::new("new1", 123)).await.unwrap();
        store.save(&TokenRecord::new("new2", 456)).await.unwrap();

        assert_eq!(store.items().await, vec![TokenKey::new("new2", "456")]);
    }
}
