//! The blob store boundary.
//!
//! A blob store is a single flat namespace of string keys mapping to opaque
//! bytes, offering nothing beyond single-key `get` and `set`. There are no
//! batches, no transactions and no locks; everything above this module is
//! written with that in mind.

mod memory;
mod storage;
mod timeout;

pub use memory::MemoryBlobStore;
pub use storage::FsBlobStore;
pub use timeout::TimedBlobStore;

use crate::error::Result;
use std::sync::Arc;

/// Single-key get/set over opaque bytes.
///
/// Implementations must not retry; a failed or unreachable remote is
/// reported as [`SyncError::StoreUnavailable`](crate::SyncError::StoreUnavailable).
pub trait BlobStore: Send + Sync {
    /// Fetch the value under `key`. An empty value means the key is absent.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Health probe. Stores without one report available.
    fn is_available(&self) -> Result<bool> {
        Ok(true)
    }
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn is_available(&self) -> Result<bool> {
        (**self).is_available()
    }
}
