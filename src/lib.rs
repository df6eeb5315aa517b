//! # Scent Registry
//!
//! A shared directory of small encrypted records kept in a plain key-value
//! blob store that offers only single-key `get` and `set`.
//!
//! ## Core Concepts
//!
//! - **Records**: one blob per record, written once and never changed
//! - **Index**: one blob listing every known record identifier
//! - **Reload**: read the index, fetch each record, newest first
//! - **Submit**: write the record, then append its identifier to the index
//!
//! The store has no transactions, so the index and the records can drift
//! apart: an index entry may point at a record that has not landed yet, and
//! a record may be stored without ever being indexed. Reloads skip what they
//! cannot read instead of failing, and submissions always write the record
//! before the index.
//!
//! ## Example
//!
//! ```ignore
//! use scent_registry::{Classification, FsBlobStore, Owner, RecordDraft, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(FsBlobStore::new("./registry")?);
//! let engine = SyncEngine::builder(store)
//!     .config(SyncConfig::default().with_store_timeout(Duration::from_secs(5)))
//!     .owner(Owner::new("0xabc"))
//!     .build()?;
//!
//! engine.submit(RecordDraft::new(b"hr=72".to_vec(), Classification::new("calm", 5)?))?;
//! let records = engine.reload()?;
//! ```

pub mod blobs;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod records;
pub mod types;

// Re-exports
pub use blobs::{BlobStore, FsBlobStore, MemoryBlobStore, TimedBlobStore};
pub use codec::{Codec, Format};
pub use config::SyncConfig;
pub use engine::{
    Clock, IdSource, IdentitySource, ManualClock, PayloadEncryptor, RandomIdSource,
    SharedIdentity, Submission, SyncEngine, SyncEngineBuilder, SystemClock, TaggedHexEncryptor,
};
pub use error::{DecodeError, Result, SyncError};
pub use records::{AppendOutcome, IndexManager, RecordRepository};
pub use types::*;
