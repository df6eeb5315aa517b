//! Registry configuration.

use crate::codec::Format;
use crate::error::{Result, SyncError};
use crate::types::INDEX_SUFFIX;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix shared by the index key and every record key.
    pub namespace: String,

    /// Wire format for index and record blobs.
    pub format: Format,

    /// Upper bound on a single store access. `None` waits indefinitely.
    #[serde(rename = "store_timeout_ms", with = "millis")]
    pub store_timeout: Option<Duration>,

    /// Capacity of the decoded-record cache (0 disables it). The cache
    /// only skips re-decoding unchanged blobs; reads still hit the store.
    pub record_cache_size: usize,

    /// How many fresh identifiers a submit may try before giving up.
    pub max_submit_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: "scent".to_string(),
            format: Format::Json,
            store_timeout: None,
            record_cache_size: 256,
            max_submit_attempts: 3,
        }
    }
}

impl SyncConfig {
    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn with_record_cache_size(mut self, size: usize) -> Self {
        self.record_cache_size = size;
        self
    }

    pub fn with_max_submit_attempts(mut self, attempts: u32) -> Self {
        self.max_submit_attempts = attempts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(SyncError::Config("namespace must not be empty".into()));
        }
        if self
            .namespace
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(SyncError::Config(format!(
                "namespace {:?} contains whitespace or control characters",
                self.namespace
            )));
        }
        if self.max_submit_attempts == 0 {
            return Err(SyncError::Config("max_submit_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Key under which the identifier list is stored.
    pub fn index_key(&self) -> String {
        format!("{}_{}", self.namespace, INDEX_SUFFIX)
    }

    /// Prefix for record keys; the identifier is appended.
    pub(crate) fn record_prefix(&self) -> String {
        format!("{}_", self.namespace)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
