//! Seams for the collaborators the engine does not own: encryption,
//! producer identity and identifier generation.

use crate::error::Result;
use crate::types::{Owner, RecordId};
use parking_lot::RwLock;

/// Turns plaintext into the opaque payload that gets stored.
pub trait PayloadEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
}

/// Placeholder encoding: `FHE-` followed by the hex of the plaintext.
///
/// Not encryption. The tag only marks where a real scheme would plug in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaggedHexEncryptor;

impl TaggedHexEncryptor {
    pub const TAG: &'static [u8] = b"FHE-";
}

impl PayloadEncryptor for TaggedHexEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::TAG.len() + plaintext.len() * 2);
        out.extend_from_slice(Self::TAG);
        out.extend_from_slice(hex::encode(plaintext).as_bytes());
        Ok(out)
    }
}

/// Who is submitting, if anyone.
pub trait IdentitySource: Send + Sync {
    fn current(&self) -> Option<Owner>;
}

impl IdentitySource for Owner {
    fn current(&self) -> Option<Owner> {
        Some(self.clone())
    }
}

impl IdentitySource for Option<Owner> {
    fn current(&self) -> Option<Owner> {
        self.clone()
    }
}

/// Identity that can be connected, switched and disconnected at runtime.
#[derive(Debug, Default)]
pub struct SharedIdentity {
    owner: RwLock<Option<Owner>>,
}

impl SharedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, owner: Owner) {
        *self.owner.write() = Some(owner);
    }

    pub fn disconnect(&self) {
        *self.owner.write() = None;
    }
}

impl IdentitySource for SharedIdentity {
    fn current(&self) -> Option<Owner> {
        self.owner.read().clone()
    }
}

/// Generates candidate identifiers for new records.
pub trait IdSource: Send + Sync {
    fn next_id(&self, unix_millis: u64) -> RecordId;
}

/// Wall-clock milliseconds plus seven random base-36 characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_id(&self, unix_millis: u64) -> RecordId {
        RecordId::generate(unix_millis, &mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_hex() {
        let out = TaggedHexEncryptor.encrypt(b"hr=72").unwrap();
        assert_eq!(out, b"FHE-68723d3732");
    }

    #[test]
    fn test_shared_identity() {
        let identity = SharedIdentity::new();
        assert_eq!(identity.current(), None);

        identity.connect(Owner::new("0xabc"));
        assert_eq!(identity.current(), Some(Owner::new("0xabc")));

        identity.disconnect();
        assert_eq!(identity.current(), None);
    }

    #[test]
    fn test_random_ids_differ() {
        let a = RandomIdSource.next_id(5);
        let b = RandomIdSource.next_id(5);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("5-"));
    }
}
