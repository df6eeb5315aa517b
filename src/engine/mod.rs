//! Orchestration of reloads and submissions.
//!
//! The engine composes the [`IndexManager`](crate::IndexManager) and the
//! [`RecordRepository`](crate::RecordRepository) and takes everything it
//! does not own (encryption, identity, time, identifier generation) as an
//! injected collaborator.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryBlobStore::new());
//! let engine = SyncEngine::builder(store)
//!     .owner(Owner::new("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"))
//!     .build()?;
//!
//! let submission = engine.submit(RecordDraft::new(
//!     b"hr=72".to_vec(),
//!     Classification::new("calm", 5)?,
//! ))?;
//!
//! for record in engine.reload()? {
//!     println!("{} {}", record.id, record.classification.emotion);
//! }
//! ```

mod clock;
mod collaborators;
mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    IdSource, IdentitySource, PayloadEncryptor, RandomIdSource, SharedIdentity, TaggedHexEncryptor,
};
pub use sync::{Submission, SyncEngine, SyncEngineBuilder};
