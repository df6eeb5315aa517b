//! The identifier index and the per-record blobs.
//!
//! Records live one per key; the index is a single blob listing every known
//! identifier. The two are written independently, so at any moment the index
//! may name a record that has not landed yet (a dangling reference) and a
//! stored record may be missing from the index (an orphan).

mod index;
mod repository;

pub use index::{AppendOutcome, IndexManager};
pub use repository::RecordRepository;
