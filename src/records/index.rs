//! Read-modify-write maintenance of the identifier index.

use crate::blobs::BlobStore;
use crate::codec::Codec;
use crate::error::Result;
use crate::types::RecordId;
use std::sync::Arc;

/// Result of [`IndexManager::append_identifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The identifier was added and the index rewritten.
    Appended,
    /// The identifier was already listed; nothing was written.
    AlreadyPresent,
}

/// Owns the single index blob.
///
/// # Concurrency
///
/// [`append_identifier`](Self::append_identifier) loads the whole list,
/// extends it and stores it back with no isolation. Two appends that both
/// load before either stores will race, and the later store silently drops
/// the earlier writer's identifier (its record stays in the store, orphaned).
/// This type does not guard against that; callers that need atomic appends
/// must serialize them, as [`SyncEngine`](crate::SyncEngine) does within a
/// process.
pub struct IndexManager {
    store: Arc<dyn BlobStore>,
    codec: Codec,
    key: String,
}

impl IndexManager {
    pub fn new(store: Arc<dyn BlobStore>, codec: Codec, key: impl Into<String>) -> Self {
        Self {
            store,
            codec,
            key: key.into(),
        }
    }

    /// Storage key of the index blob.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the current identifier list.
    ///
    /// An absent index is empty. A malformed index is an error: treating it
    /// as empty would let the next append erase every listed identifier.
    pub fn load_index(&self) -> Result<Vec<RecordId>> {
        let bytes = self.store.get(&self.key)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.codec.decode_index(&bytes).map_err(|e| {
            tracing::error!(key = %self.key, error = %e, "index blob is corrupt");
            e
        })?;
        Ok(ids)
    }

    pub fn contains(&self, id: &RecordId) -> Result<bool> {
        Ok(self.load_index()?.contains(id))
    }

    /// Add `id` to the end of the index unless it is already listed.
    pub fn append_identifier(&self, id: &RecordId) -> Result<AppendOutcome> {
        let mut ids = self.load_index()?;
        if ids.contains(id) {
            tracing::debug!(record = %id, "identifier already indexed");
            return Ok(AppendOutcome::AlreadyPresent);
        }

        ids.push(id.clone());
        let bytes = self.codec.encode_index(&ids)?;
        self.store.set(&self.key, &bytes)?;

        tracing::debug!(record = %id, entries = ids.len(), "identifier appended to index");
        Ok(AppendOutcome::Appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobs::MemoryBlobStore;
    use crate::error::{DecodeError, SyncError};

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    fn manager() -> (Arc<MemoryBlobStore>, IndexManager) {
        let store = Arc::new(MemoryBlobStore::new());
        let index = IndexManager::new(store.clone(), Codec::default(), "scent_keys");
        (store, index)
    }

    #[test]
    fn test_absent_index_is_empty() {
        let (_, index) = manager();
        assert!(index.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (store, index) = manager();
        for name in ["a", "b", "c"] {
            assert_eq!(index.append_identifier(&id(name)).unwrap(), AppendOutcome::Appended);
        }

        assert_eq!(index.load_index().unwrap(), vec![id("a"), id("b"), id("c")]);
        assert_eq!(store.get("scent_keys").unwrap(), br#"["a","b","c"]"#);
    }

    #[test]
    fn test_append_is_idempotent() {
        let (store, index) = manager();
        index.append_identifier(&id("a")).unwrap();
        let once = store.get("scent_keys").unwrap();
        let writes = store.write_count();

        assert_eq!(
            index.append_identifier(&id("a")).unwrap(),
            AppendOutcome::AlreadyPresent
        );
        assert_eq!(store.get("scent_keys").unwrap(), once);
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let (store, index) = manager();
        store.set("scent_keys", b"[\"a\", oops").unwrap();

        assert!(matches!(
            index.load_index(),
            Err(SyncError::Decode(DecodeError::Malformed(_)))
        ));
        // A corrupt index must not be overwritten by an append.
        assert!(index.append_identifier(&id("b")).is_err());
        assert_eq!(store.get("scent_keys").unwrap(), b"[\"a\", oops");
    }

    #[test]
    fn test_unavailable_store() {
        let (store, index) = manager();
        store.set_offline(true);

        assert!(matches!(index.load_index(), Err(SyncError::StoreUnavailable(_))));
        assert!(matches!(
            index.append_identifier(&id("a")),
            Err(SyncError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_contains() {
        let (_, index) = manager();
        index.append_identifier(&id("a")).unwrap();
        assert!(index.contains(&id("a")).unwrap());
        assert!(!index.contains(&id("b")).unwrap());
    }
}
