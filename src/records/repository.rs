//! Per-record blob storage.

use crate::blobs::BlobStore;
use crate::codec::Codec;
use crate::error::{DecodeError, Result};
use crate::types::{Record, RecordId};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A decoded record together with the exact bytes it was decoded from.
struct CachedRecord {
    bytes: Vec<u8>,
    record: Record,
}

/// Stores each record under `<prefix><id>`.
///
/// Every read goes to the store. The cache only spares re-decoding: a cached
/// record is returned when the stored bytes are unchanged, so a blob that was
/// overwritten or damaged since is always seen as it is now.
pub struct RecordRepository {
    store: Arc<dyn BlobStore>,
    codec: Codec,
    prefix: String,

    /// Recently decoded records; `None` when caching is disabled.
    cache: Option<Mutex<LruCache<RecordId, CachedRecord>>>,
}

impl RecordRepository {
    pub fn new(
        store: Arc<dyn BlobStore>,
        codec: Codec,
        prefix: impl Into<String>,
        cache_size: usize,
    ) -> Self {
        Self {
            store,
            codec,
            prefix: prefix.into(),
            cache: NonZeroUsize::new(cache_size).map(|n| Mutex::new(LruCache::new(n))),
        }
    }

    /// Storage key for a record. The same identifier always yields the same key.
    pub fn record_key(&self, id: &RecordId) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Encode and store a record.
    pub fn put_record(&self, record: &Record) -> Result<()> {
        let bytes = self.codec.encode_record(record)?;
        self.store.set(&self.record_key(&record.id), &bytes)?;

        tracing::debug!(record = %record.id, bytes = bytes.len(), "record stored");
        self.remember(record.clone(), bytes);
        Ok(())
    }

    /// Fetch a record. `Ok(None)` means the key is absent.
    pub fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let bytes = self.store.get(&self.record_key(id))?;
        if bytes.is_empty() {
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.lock().get(id) {
                if cached.bytes == bytes {
                    return Ok(Some(cached.record.clone()));
                }
            }
        }

        let record = match self.codec.decode_record(&bytes) {
            Ok(record) => record,
            Err(e) => {
                self.forget(id);
                return Err(e.into());
            }
        };
        if &record.id != id {
            self.forget(id);
            return Err(DecodeError::IdentifierMismatch {
                expected: id.clone(),
                found: record.id,
            }
            .into());
        }

        self.remember(record.clone(), bytes);
        Ok(Some(record))
    }

    /// Whether anything is stored under the record's key.
    pub fn exists(&self, id: &RecordId) -> Result<bool> {
        Ok(!self.store.get(&self.record_key(id))?.is_empty())
    }

    fn remember(&self, record: Record, bytes: Vec<u8>) {
        if let Some(cache) = &self.cache {
            cache
                .lock()
                .put(record.id.clone(), CachedRecord { bytes, record });
        }
    }

    fn forget(&self, id: &RecordId) {
        if let Some(cache) = &self.cache {
            cache.lock().pop(id);
        }
    }
}
