//! Durable mirror record store.
//!
//! One structured JSON document per mirror, keyed by mirror id. The store
//! owns the record timestamps: `updated_at` is refreshed on every upsert
//! and `inserted_at` is set exactly once, never overwritten by later
//! upserts. Transient connectivity failures are classified so that
//! [`RetryingStore`] can retry them with randomized backoff; everything
//! else surfaces immediately.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mirror_common::{retry_transient, RetryPolicy, Transient};
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::debug;

use crate::tables::MIRROR_TABLE_NAME;
use crate::types::MirrorRecord;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity-class failure; the backend reconnects automatically
    /// and a retry may succeed.
    #[error("store connection error: {0}")]
    Connection(String),

    /// Non-transient operation failure.
    #[error("store operation failed: {0}")]
    Operation(String),

    /// A stored document could not be decoded.
    #[error("stored document for {id} is not a valid mirror record: {reason}")]
    Corrupt { id: String, reason: String },
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Operation(err.to_string())
        }
    }
}

/// Durable keyed record store for mirror documents.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Fetches one mirror document by id.
    async fn find_one(&self, mirror_id: &str) -> StoreResult<Option<MirrorRecord>>;

    /// Fetches all mirror documents, keyed by id.
    async fn find_all(&self) -> StoreResult<HashMap<String, MirrorRecord>>;

    /// Inserts or updates a mirror document and returns it as stored,
    /// with timestamps applied.
    async fn upsert(&self, mirror_id: &str, record: MirrorRecord) -> StoreResult<MirrorRecord>;
}

/// Applies the store's timestamp contract to a record about to be written.
fn apply_timestamps(record: &mut MirrorRecord, existing: Option<&MirrorRecord>) {
    let now = Utc::now();
    record.inserted_at = existing
        .and_then(|r| r.inserted_at)
        .or(Some(now));
    record.updated_at = Some(now);
}

/// Redis-backed document store: one hash, one JSON document per field.
pub struct RedisMirrorStore {
    conn: ConnectionManager,
}

impl RedisMirrorStore {
    /// Wraps an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Opens a connection-managed client against `url`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(StoreError::from)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(StoreError::from)?;
        Ok(Self { conn })
    }

    fn decode(mirror_id: &str, json: &str) -> StoreResult<MirrorRecord> {
        serde_json::from_str(json).map_err(|err| StoreError::Corrupt {
            id: mirror_id.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl MirrorStore for RedisMirrorStore {
    async fn find_one(&self, mirror_id: &str) -> StoreResult<Option<MirrorRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(MIRROR_TABLE_NAME, mirror_id).await?;
        raw.map(|json| Self::decode(mirror_id, &json)).transpose()
    }

    async fn find_all(&self) -> StoreResult<HashMap<String, MirrorRecord>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(MIRROR_TABLE_NAME).await?;
        raw.into_iter()
            .map(|(id, json)| Self::decode(&id, &json).map(|record| (id, record)))
            .collect()
    }

    async fn upsert(&self, mirror_id: &str, mut record: MirrorRecord) -> StoreResult<MirrorRecord> {
        let mut conn = self.conn.clone();
        let existing: Option<String> = conn.hget(MIRROR_TABLE_NAME, mirror_id).await?;
        let existing = existing
            .map(|json| Self::decode(mirror_id, &json))
            .transpose()?;
        apply_timestamps(&mut record, existing.as_ref());

        let json =
            serde_json::to_string(&record).map_err(|err| StoreError::Operation(err.to_string()))?;
        let _: () = conn.hset(MIRROR_TABLE_NAME, mirror_id, json).await?;
        debug!(%mirror_id, "mirror document upserted");
        Ok(record)
    }
}

/// In-process store with the same timestamp contract. Used by tests and
/// single-node development.
#[derive(Default)]
pub struct MemoryMirrorStore {
    records: Mutex<HashMap<String, MirrorRecord>>,
}

impl MemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn find_one(&self, mirror_id: &str) -> StoreResult<Option<MirrorRecord>> {
        Ok(self.records.lock().get(mirror_id).cloned())
    }

    async fn find_all(&self) -> StoreResult<HashMap<String, MirrorRecord>> {
        Ok(self.records.lock().clone())
    }

    async fn upsert(&self, mirror_id: &str, mut record: MirrorRecord) -> StoreResult<MirrorRecord> {
        let mut records = self.records.lock();
        apply_timestamps(&mut record, records.get(mirror_id));
        records.insert(mirror_id.to_string(), record.clone());
        Ok(record)
    }
}

/// Decorator applying the transient-retry policy around every call of an
/// inner store. Validation and logic errors pass through untouched.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: MirrorStore> MirrorStore for RetryingStore<S> {
    async fn find_one(&self, mirror_id: &str) -> StoreResult<Option<MirrorRecord>> {
        retry_transient(&self.policy, || self.inner.find_one(mirror_id)).await
    }

    async fn find_all(&self) -> StoreResult<HashMap<String, MirrorRecord>> {
        retry_transient(&self.policy, || self.inner.find_all()).await
    }

    async fn upsert(&self, mirror_id: &str, record: MirrorRecord) -> StoreResult<MirrorRecord> {
        retry_transient(&self.policy, || self.inner.upsert(mirror_id, record.clone())).await
    }
}
