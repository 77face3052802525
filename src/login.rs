//! Login records and the store they are looked up in.
//!
//! Records are issued and renewed elsewhere; apigate only reads them. A
//! record is addressed by exact match on its opaque `key`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Opaque user identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted login: bearer key → user, valid until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub key: String,
    #[serde(rename = "uid")]
    pub user_id: UserId,
    /// Unix seconds. The record is expired once this is in the past.
    #[serde(rename = "expires")]
    pub expires_at: i64,
}

impl LoginRecord {
    pub fn new(key: impl Into<String>, user_id: UserId, expires_at: i64) -> Self {
        Self { key: key.into(), user_id, expires_at }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// Infrastructure failure while querying a [`LoginStore`].
///
/// "No such key" is not an error; stores report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("login store unavailable: {0}")]
    Unavailable(String),

    #[error("login store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read-only access to login records.
///
/// `find_by_key` may do I/O; implementations must not hold process-wide
/// locks while it is pending.
#[async_trait]
pub trait LoginStore: Send + Sync + 'static {
    async fn find_by_key(&self, key: &str) -> Result<Option<LoginRecord>, StoreError>;
}

#[async_trait]
impl<S: LoginStore + ?Sized> LoginStore for Arc<S> {
    async fn find_by_key(&self, key: &str) -> Result<Option<LoginRecord>, StoreError> {
        (**self).find_by_key(key).await
    }
}

/// Sharded in-memory store, for tests, demos and single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryLoginStore {
    records: DashMap<String, LoginRecord>,
}

impl MemoryLoginStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `record.key`.
    pub fn insert(&self, record: LoginRecord) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn remove(&self, key: &str) -> Option<LoginRecord> {
        self.records.remove(key).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

impl FromIterator<LoginRecord> for MemoryLoginStore {
    fn from_iter<I: IntoIterator<Item = LoginRecord>>(iter: I) -> Self {
        let store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

#[async_trait]
impl LoginStore for MemoryLoginStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<LoginRecord>, StoreError> {
        // The shard guard is dropped before this returns; nothing is held
        // across an await.
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_before_now() {
        let record = LoginRecord::new("k", UserId::new("u"), 100);
        assert!(!record.is_expired(99));
        assert!(!record.is_expired(100));
        assert!(record.is_expired(101));
    }

    #[test]
    fn record_uses_stored_field_names() {
        let record = LoginRecord::new("k", UserId::new("u1"), 7);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"key": "k", "uid": "u1", "expires": 7}));
    }

    #[tokio::test]
    async fn memory_store_finds_by_exact_key() {
        let store: MemoryLoginStore =
            [LoginRecord::new("abc", UserId::new("u1"), 0)].into_iter().collect();
        assert!(store.find_by_key("abc").await.unwrap().is_some());
        assert!(store.find_by_key("ABC").await.unwrap().is_none());
        assert!(store.remove("abc").is_some());
        assert!(store.is_empty());
    }
}
