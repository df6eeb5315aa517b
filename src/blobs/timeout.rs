//! Per-access timeouts for a blocking blob store.

use super::BlobStore;
use crate::error::{Result, SyncError};
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Job<S> = Box<dyn FnOnce(&S) + Send>;

/// Wraps a store so that no single access waits longer than `timeout`.
///
/// Calls run on a dedicated worker thread; the caller waits on a reply
/// channel and gives up with `StoreUnavailable` when the deadline passes.
/// A `set` that timed out may still complete on the remote afterwards.
///
/// There is one worker, and it runs calls in order. While a call that
/// already timed out is still blocked in the inner store, every call queued
/// behind it waits too and may time out without ever reaching the store.
pub struct TimedBlobStore<S: BlobStore + 'static> {
    jobs: Sender<Job<S>>,
    timeout: Duration,
    inner: Arc<S>,
}

impl<S: BlobStore + 'static> TimedBlobStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Result<Self> {
        let inner = Arc::new(inner);
        let (jobs, rx) = unbounded::<Job<S>>();

        let worker_store = Arc::clone(&inner);
        thread::Builder::new()
            .name("blob-store-worker".into())
            .spawn(move || {
                for job in rx {
                    job(&worker_store);
                }
            })?;

        Ok(Self {
            jobs,
            timeout,
            inner,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn call<T, F>(&self, op: &str, key: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let (reply, response) = bounded(1);
        self.jobs
            .send(Box::new(move |store: &S| {
                // The caller may have given up already.
                let _ = reply.send(f(store));
            }))
            .map_err(|_| SyncError::StoreUnavailable("blob store worker has stopped".into()))?;

        match response.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(op, key, timeout = ?self.timeout, "blob store access timed out");
                Err(SyncError::StoreUnavailable(format!(
                    "{} {} timed out after {:?}",
                    op, key, self.timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SyncError::StoreUnavailable(format!(
                "{} {}: worker dropped the request",
                op, key
            ))),
        }
    }
}

impl<S: BlobStore + 'static> BlobStore for TimedBlobStore<S> {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let owned = key.to_string();
        self.call("get", key, move |store| store.get(&owned))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let owned = key.to_string();
        let value = value.to_vec();
        self.call("set", key, move |store| store.set(&owned, &value))
    }

    fn is_available(&self) -> Result<bool> {
        self.call("probe", "", |store| store.is_available())
    }
}
