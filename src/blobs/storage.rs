//! Filesystem-backed blob store.

use super::BlobStore;
use crate::error::{DecodeError, Result, SyncError};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for blob files.
const BLOB_MAGIC: &[u8; 4] = b"SBL\0";

/// Current blob format version.
const BLOB_VERSION: u8 = 1;

/// Fixed header: magic + version + key length.
const HEADER_SIZE: usize = 4 + 1 + 2;

/// Longest key the two-byte length field can record.
const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Blob store keeping one file per key.
///
/// File names are the SHA-256 of the key, sharded into directories by the
/// first byte of the hash (like Git objects). Each file carries the key it
/// was written for and a CRC32 of the value, so a damaged file reads back as
/// a [`DecodeError`] rather than as a missing key.
///
/// Keys longer than 65535 bytes are refused by `set`.
///
/// Several processes may share one root; each `set` lands atomically through
/// a rename, and the last rename wins.
pub struct FsBlobStore {
    /// Base directory for blobs.
    path: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a blob store rooted at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Full path of the file backing `key`.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        let name = key_hash(key);
        self.path.join(&name[..2]).join(name)
    }

    fn encode_file(key: &str, content: &[u8]) -> Result<Vec<u8>> {
        let key_bytes = key.as_bytes();
        let key_len = u16::try_from(key_bytes.len()).map_err(|_| SyncError::KeyTooLong {
            len: key_bytes.len(),
            max: MAX_KEY_LEN,
        })?;
        let mut buf = Vec::with_capacity(HEADER_SIZE + key_bytes.len() + 8 + content.len() + 4);

        buf.extend_from_slice(BLOB_MAGIC);
        buf.push(BLOB_VERSION);
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(key_bytes);
        buf.extend_from_slice(&(content.len() as u64).to_le_bytes());
        buf.extend_from_slice(content);
        buf.extend_from_slice(&crc32fast::hash(content).to_le_bytes());
        Ok(buf)
    }

    fn decode_file(key: &str, file: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
        let mut cursor = Cursor { buf: file, pos: 0 };

        if cursor.take(4)? != BLOB_MAGIC {
            return Err(DecodeError::InvalidFormat("invalid blob magic".into()));
        }
        let version = cursor.take(1)?[0];
        if version != BLOB_VERSION {
            return Err(DecodeError::InvalidFormat(format!(
                "unsupported blob version: {}",
                version
            )));
        }

        let key_len = u16::from_le_bytes(cursor.array()?) as usize;
        let stored_key = cursor.take(key_len)?;
        if stored_key != key.as_bytes() {
            return Err(DecodeError::InvalidFormat(format!(
                "file holds key {:?}",
                String::from_utf8_lossy(stored_key)
            )));
        }

        let content_len = u64::from_le_bytes(cursor.array()?) as usize;
        let content = cursor.take(content_len)?.to_vec();

        let stored_checksum = u32::from_le_bytes(cursor.array()?);
        let computed_checksum = crc32fast::hash(&content);
        if stored_checksum != computed_checksum {
            return Err(DecodeError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        if cursor.pos != file.len() {
            return Err(DecodeError::InvalidFormat("trailing bytes after checksum".into()));
        }

        Ok(content)
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blob_path = self.blob_path(key);
        let file = match fs::read(&blob_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable("read", &blob_path, e)),
        };
        Ok(Self::decode_file(key, &file)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let file_bytes = Self::encode_file(key, value)?;
        let blob_path = self.blob_path(key);
        let shard_dir = blob_path
            .parent()
            .ok_or_else(|| SyncError::StoreUnavailable("blob path has no parent".into()))?;
        fs::create_dir_all(shard_dir).map_err(|e| unavailable("create", shard_dir, e))?;

        let tmp_path = blob_path.with_extension(format!("tmp{:016x}", rand::thread_rng().gen::<u64>()));
        let write = || -> io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&file_bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &blob_path)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(unavailable("write", &blob_path, e));
        }

        tracing::trace!(key, bytes = value.len(), "blob written");
        Ok(())
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.path.is_dir())
    }
}

fn key_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

fn unavailable(op: &str, path: &Path, e: io::Error) -> SyncError {
    SyncError::StoreUnavailable(format!("{} {}: {}", op, path.display(), e))
}

/// Bounds-checked reader over a blob file.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| DecodeError::InvalidFormat("truncated blob file".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> std::result::Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
