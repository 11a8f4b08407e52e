//! In-memory mirror registry.
//!
//! The registry is the authoritative read path: it is loaded from the
//! store at startup and updated after every committed mutation. The
//! durable store write happens-before an entry lands here, so readers
//! never observe a mirror the store does not have.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{MirrorRecord, MirrorStatus};

/// Concurrency-safe map of mirror id to mirror record.
#[derive(Debug, Default)]
pub struct MirrorRegistry {
    mirrors: RwLock<HashMap<String, MirrorRecord>>,
}

impl MirrorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry contents with the store's documents.
    /// Called once at startup.
    pub fn load(&self, records: HashMap<String, MirrorRecord>) {
        *self.mirrors.write() = records;
    }

    /// Returns a copy of one record.
    pub fn get(&self, mirror_id: &str) -> Option<MirrorRecord> {
        self.mirrors.read().get(mirror_id).cloned()
    }

    /// Returns true if the mirror id is known.
    pub fn contains(&self, mirror_id: &str) -> bool {
        self.mirrors.read().contains_key(mirror_id)
    }

    /// Commits a record. Called only after the store upsert succeeded.
    pub fn commit(&self, mirror_id: impl Into<String>, record: MirrorRecord) {
        self.mirrors.write().insert(mirror_id.into(), record);
    }

    /// All mirrors, keyed by id.
    pub fn list_all(&self) -> HashMap<String, MirrorRecord> {
        self.mirrors.read().clone()
    }

    /// Enabled mirrors only, keyed by id.
    pub fn list_enabled(&self) -> HashMap<String, MirrorRecord> {
        self.mirrors
            .read()
            .iter()
            .filter(|(_, record)| record.status == MirrorStatus::Enabled)
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Number of registered mirrors.
    pub fn len(&self) -> usize {
        self.mirrors.read().len()
    }

    /// True if no mirrors are registered.
    pub fn is_empty(&self) -> bool {
        self.mirrors.read().is_empty()
    }
}
