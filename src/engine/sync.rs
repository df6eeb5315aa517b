//! The sync engine: full reloads and record submission.

use super::clock::{Clock, SystemClock};
use super::collaborators::{IdSource, IdentitySource, PayloadEncryptor, RandomIdSource, TaggedHexEncryptor};
use crate::blobs::{BlobStore, TimedBlobStore};
use crate::codec::Codec;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::records::{AppendOutcome, IndexManager, RecordRepository};
use crate::types::{OperationStatus, Owner, Record, RecordDraft, RecordId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Outcome of a [`SyncEngine::submit`] that stored its record.
#[derive(Debug)]
#[must_use]
pub enum Submission {
    /// Stored and listed in the index.
    Indexed(RecordId),

    /// Stored, but the index update failed. The record is reachable with
    /// [`SyncEngine::lookup`] and is not rolled back.
    Orphaned { id: RecordId, cause: SyncError },
}

impl Submission {
    pub fn id(&self) -> &RecordId {
        match self {
            Submission::Indexed(id) | Submission::Orphaned { id, .. } => id,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self, Submission::Orphaned { .. })
    }

    /// Treat an orphaned write as an error.
    pub fn into_result(self) -> Result<RecordId> {
        match self {
            Submission::Indexed(id) => Ok(id),
            Submission::Orphaned { id, cause } => Err(SyncError::OrphanWrite {
                id,
                cause: cause.to_string(),
            }),
        }
    }

    pub fn status(&self) -> OperationStatus {
        match self {
            Submission::Indexed(id) => OperationStatus::Success(format!("record {} submitted", id)),
            Submission::Orphaned { id, cause } => OperationStatus::Error(format!(
                "record {} stored but not listed: {}",
                id, cause
            )),
        }
    }
}

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder {
    store: Arc<dyn BlobStore>,
    config: SyncConfig,
    encryptor: Arc<dyn PayloadEncryptor>,
    identity: Arc<dyn IdentitySource>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl SyncEngineBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn encryptor(mut self, encryptor: Arc<dyn PayloadEncryptor>) -> Self {
        self.encryptor = encryptor;
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = identity;
        self
    }

    /// Shorthand for a fixed producer identity.
    pub fn owner(self, owner: Owner) -> Self {
        self.identity(Arc::new(owner))
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn build(self) -> Result<SyncEngine> {
        self.config.validate()?;

        let store: Arc<dyn BlobStore> = match self.config.store_timeout {
            Some(timeout) => Arc::new(TimedBlobStore::new(self.store, timeout)?),
            None => self.store,
        };

        let codec = Codec::new(self.config.format);
        let index = IndexManager::new(Arc::clone(&store), codec, self.config.index_key());
        let records = RecordRepository::new(
            Arc::clone(&store),
            codec,
            self.config.record_prefix(),
            self.config.record_cache_size,
        );

        Ok(SyncEngine {
            store,
            index,
            records,
            config: self.config,
            encryptor: self.encryptor,
            identity: self.identity,
            clock: self.clock,
            ids: self.ids,
            submit_lock: Mutex::new(()),
            orphans: Mutex::new(Vec::new()),
        })
    }
}

/// Client-side view of the shared record directory.
///
/// `reload` lists every indexed record; `submit` stores a new record and
/// then lists it. Submissions through one engine are serialized, so threads
/// sharing an engine never lose each other's index entries. Separate engines
/// (or processes) on the same store are not serialized; see
/// [`IndexManager`] for the resulting race.
pub struct SyncEngine {
    store: Arc<dyn BlobStore>,
    index: IndexManager,
    records: RecordRepository,
    config: SyncConfig,
    encryptor: Arc<dyn PayloadEncryptor>,
    identity: Arc<dyn IdentitySource>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,

    /// Held for the whole of a submit or repair.
    submit_lock: Mutex<()>,

    /// Records this engine stored but failed to index.
    orphans: Mutex<Vec<RecordId>>,
}

impl SyncEngine {
    pub fn builder(store: Arc<dyn BlobStore>) -> SyncEngineBuilder {
        SyncEngineBuilder {
            store,
            config: SyncConfig::default(),
            encryptor: Arc::new(TaggedHexEncryptor),
            identity: Arc::new(None::<Owner>),
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdSource),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    pub fn records(&self) -> &RecordRepository {
        &self.records
    }

    /// Load every indexed record, newest first.
    ///
    /// Records that are missing or fail to decode are logged and left out;
    /// ties on timestamp keep index order. Only an unreachable store or a
    /// corrupt index fails the whole reload.
    pub fn reload(&self) -> Result<Vec<Record>> {
        if !self.store.is_available()? {
            return Err(SyncError::StoreUnavailable("store reports itself unavailable".into()));
        }

        let ids = self.index.load_index()?;
        let mut records = Vec::with_capacity(ids.len());
        let mut skipped = 0usize;

        for id in &ids {
            match self.records.get_record(id) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    skipped += 1;
                    tracing::warn!(record = %id, "indexed record is absent, skipping");
                }
                Err(SyncError::Decode(e)) => {
                    skipped += 1;
                    tracing::warn!(record = %id, error = %e, "record failed to decode, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::debug!(indexed = ids.len(), loaded = records.len(), skipped, "reload complete");
        Ok(records)
    }

    /// Encrypt, store and index a new record.
    ///
    /// The record is written before the index, so the index never lists a
    /// record this call failed to store. If the index update fails the
    /// record stays put and the result is [`Submission::Orphaned`].
    pub fn submit(&self, draft: RecordDraft) -> Result<Submission> {
        draft.validate()?;
        let owner = self.identity.current().ok_or(SyncError::NoIdentity)?;
        let payload = self
            .encryptor
            .encrypt(&draft.plaintext)
            .map_err(|e| match e {
                SyncError::Encryption(_) => e,
                other => SyncError::Encryption(other.to_string()),
            })?;

        let _guard = self.submit_lock.lock();

        let id = self.fresh_id()?;
        let record = Record {
            id,
            payload,
            timestamp: self.clock.now(),
            owner,
            classification: draft.classification,
        };

        self.records.put_record(&record)?;

        match self.index.append_identifier(&record.id) {
            Ok(_) => {
                tracing::debug!(record = %record.id, "record submitted");
                Ok(Submission::Indexed(record.id))
            }
            Err(cause) => {
                tracing::warn!(record = %record.id, error = %cause, "record stored but index update failed");
                self.orphans.lock().push(record.id.clone());
                Ok(Submission::Orphaned {
                    id: record.id,
                    cause,
                })
            }
        }
    }

    /// Fetch one record by identifier, whether or not it is indexed.
    pub fn lookup(&self, id: &RecordId) -> Result<Record> {
        self.records
            .get_record(id)?
            .ok_or_else(|| SyncError::RecordNotFound(id.clone()))
    }

    /// Whether `record` was produced by the current identity.
    pub fn is_mine(&self, record: &Record) -> bool {
        self.identity
            .current()
            .map(|me| me.matches(&record.owner))
            .unwrap_or(false)
    }

    /// Identifiers this engine stored but could not index.
    pub fn orphans(&self) -> Vec<RecordId> {
        self.orphans.lock().clone()
    }

    /// Retry indexing for this engine's orphaned records.
    ///
    /// Returns the identifiers now listed. Orphans whose record cannot be
    /// found stay pending. Stops at the first store failure, keeping the
    /// rest for a later attempt.
    pub fn repair_orphans(&self) -> Result<Vec<RecordId>> {
        let _guard = self.submit_lock.lock();

        let pending = std::mem::take(&mut *self.orphans.lock());
        let mut repaired = Vec::new();
        let mut remaining = Vec::new();
        let mut failure = None;

        for id in pending {
            if failure.is_some() {
                remaining.push(id);
                continue;
            }
            match self.repair_one(&id) {
                Ok(true) => repaired.push(id),
                Ok(false) => remaining.push(id),
                Err(e) => {
                    remaining.push(id);
                    failure = Some(e);
                }
            }
        }

        self.orphans.lock().extend(remaining);
        match failure {
            Some(e) => Err(e),
            None => Ok(repaired),
        }
    }

    fn repair_one(&self, id: &RecordId) -> Result<bool> {
        if !self.records.exists(id)? {
            tracing::warn!(record = %id, "orphaned record is not in the store, leaving it pending");
            return Ok(false);
        }
        if self.index.append_identifier(id)? == AppendOutcome::Appended {
            tracing::info!(record = %id, "orphaned record re-indexed");
        }
        Ok(true)
    }

    /// Pick an identifier not already listed or stored.
    fn fresh_id(&self) -> Result<RecordId> {
        let indexed = self.index.load_index()?;
        let mut last = None;

        for attempt in 1..=self.config.max_submit_attempts {
            let id = self.ids.next_id(self.clock.now_millis());
            if !indexed.contains(&id) && !self.records.exists(&id)? {
                return Ok(id);
            }
            tracing::warn!(record = %id, attempt, "generated identifier already in use");
            last = Some(id);
        }

        // max_submit_attempts >= 1 is enforced by config validation.
        match last {
            Some(id) => Err(SyncError::IdentifierCollision(id)),
            None => Err(SyncError::Config("max_submit_attempts must be at least 1".into())),
        }
    }
}
