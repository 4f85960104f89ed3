//! The user's long-term key, and the shared cell the service reads it from.
//!
//! A [`KeyMaterial`] is a single 32-byte [`StreamKey`] plus the [`LockKey`] derived from it. The
//! [`SharedKey`] holds the current one and lets it be swapped out while requests are in flight.

use crate::{
    lock::{LockId, LockKey},
    stream::StreamKey,
    GistError,
};

use parking_lot::RwLock;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use std::{fmt, sync::Arc};

/// The symmetric key and the keypair derived from it.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    stream: StreamKey,
    lock: LockKey,
}

impl KeyMaterial {

    /// Generate fresh key material.
    pub fn generate<R>(csprng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        Self::from_stream_key(StreamKey::generate(csprng))
    }

    /// Load key material from the base64 encoding of its 32-byte key. Fails with
    /// [`InvalidKeyEncoding`](GistError::InvalidKeyEncoding) on anything else.
    pub fn from_encoded(encoded: &str) -> Result<Self, GistError> {
        Ok(Self::from_stream_key(StreamKey::from_base64(encoded)?))
    }

    pub fn from_stream_key(stream: StreamKey) -> Self {
        let lock = stream.lock_key();
        Self { stream, lock }
    }

    /// Base64 of the raw key. This is the secret.
    pub fn encode(&self) -> String {
        self.stream.to_base64()
    }

    pub fn stream_key(&self) -> &StreamKey {
        &self.stream
    }

    pub fn lock_key(&self) -> &LockKey {
        &self.lock
    }

    /// The public half of the derived keypair.
    pub fn public_key(&self) -> &LockId {
        self.lock.id()
    }

    /// Export both halves of the derived keypair as base64.
    pub fn export_keypair(&self) -> ExportedKeypair {
        ExportedKeypair {
            public_key: self.lock.id().to_base64(),
            secret_key: self.lock.to_base64(),
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("stream_id", &self.stream.id().to_base58())
            .field("public_key", &self.lock.id().to_base64())
            .finish()
    }
}

/// Keypair as handed out to a user, both halves in standard base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKeypair {
    pub public_key: String,
    pub secret_key: String,
}

impl fmt::Debug for ExportedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ExportedKeypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Holder for the current [`KeyMaterial`].
///
/// Readers take a [`snapshot`](Self::snapshot) and work from that; the lock is held only long
/// enough to clone an `Arc`, never across an await. A replacement becomes visible to every
/// snapshot taken after it, while snapshots already taken keep the old key.
///
/// ```
/// # use secret_gists::keys::{KeyMaterial, SharedKey};
/// let mut csprng = rand::rngs::OsRng;
/// let shared = SharedKey::new(KeyMaterial::generate(&mut csprng));
///
/// let before = shared.snapshot();
/// shared.replace(KeyMaterial::generate(&mut csprng));
/// assert_ne!(*before, *shared.snapshot());
/// ```
#[derive(Debug)]
pub struct SharedKey {
    current: RwLock<Arc<KeyMaterial>>,
}

impl SharedKey {
    pub fn new(key: KeyMaterial) -> Self {
        Self { current: RwLock::new(Arc::new(key)) }
    }

    /// The key in effect right now.
    pub fn snapshot(&self) -> Arc<KeyMaterial> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new key, returning the one it replaced.
    pub fn replace(&self, key: KeyMaterial) -> Arc<KeyMaterial> {
        let mut current = self.current.write();
        std::mem::replace(&mut *current, Arc::new(key))
    }

    /// Run `persist` on the new key and swap it in only if that succeeds, all under the write
    /// lock. Concurrent replacements are serialized, so whatever `persist` saved last is also the
    /// key left in place.
    pub fn try_replace<F, E>(&self, key: KeyMaterial, persist: F) -> Result<Arc<KeyMaterial>, E>
    where
        F: FnOnce(&KeyMaterial) -> Result<(), E>,
    {
        let mut current = self.current.write();
        persist(&key)?;
        Ok(std::mem::replace(&mut *current, Arc::new(key)))
    }
}
