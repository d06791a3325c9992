//! Key-value cache
//!
//! Opaque JSON bookkeeping for the federation substrate (nonces, cached
//! remote keys). Values are stored as-is; no expiry is applied here.

use std::sync::Arc;

use crate::data::Database;
use crate::error::AppError;

/// KV cache backed by the `kv` table
pub struct KvCache {
    db: Arc<Database>,
}

impl KvCache {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        self.db.kv_get(key).await
    }

    /// Insert or overwrite `key`. Any string, including "", is a valid key.
    pub async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        self.db.kv_set(key, &value).await
    }

    /// Remove `key`; absent keys are not an error
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.db.kv_delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn set_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let kv = KvCache::new(Arc::new(db));

        kv.set("remote-key:abc", json!({"kty": "RSA"})).await.unwrap();
        assert_eq!(
            kv.get("remote-key:abc").await.unwrap(),
            Some(json!({"kty": "RSA"}))
        );

        kv.delete("remote-key:abc").await.unwrap();
        assert_eq!(kv.get("remote-key:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_passed_through_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let kv = KvCache::new(Arc::new(db));

        kv.set("", json!(null)).await.unwrap();
        kv.set("Nonce:A", json!(1)).await.unwrap();
        kv.set("nonce:a", json!(2)).await.unwrap();

        assert_eq!(kv.get("").await.unwrap(), Some(json!(null)));
        assert_eq!(kv.get("Nonce:A").await.unwrap(), Some(json!(1)));
        assert_eq!(kv.get("nonce:a").await.unwrap(), Some(json!(2)));
    }
}
