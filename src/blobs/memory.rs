//! In-process blob store.

use super::BlobStore;
use crate::error::{Result, SyncError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Blob store held in memory.
///
/// Besides embedding, it serves as a controllable stand-in for a remote
/// store: it can be switched offline and given a per-call latency.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,

    /// When set, every call fails with `StoreUnavailable`.
    offline: AtomicBool,

    /// Artificial delay applied to every call, in milliseconds.
    latency_ms: AtomicU64,

    /// Number of successful `set` calls.
    writes: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store offline (or bring it back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn enter(&self, op: &str, key: &str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            std::thread::sleep(Duration::from_millis(latency));
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::StoreUnavailable(format!(
                "{} {}: store is offline",
                op, key
            )));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.enter("get", key)?;
        Ok(self.blobs.read().get(key).cloned().unwrap_or_default())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.enter("set", key)?;
        self.blobs.write().insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_available(&self) -> Result<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
