//! Posting and reading gists.
//!
//! [`GistService`] ties together the current key, the envelope and locator formats, and a
//! [`GistStore`]. Every operation takes a snapshot of the key before touching the store, so a key
//! replaced mid-request doesn't affect a request already in flight.

use crate::{
    config::KeyFile,
    envelope::Envelope,
    keys::{ExportedKeypair, KeyMaterial, SharedKey},
    lock::LockId,
    locator::Locator,
    store::{GistStore, GistSummary},
    GistError,
};

use rand_core::OsRng;
use tracing::{debug, info, warn};

use std::sync::Arc;

/// Posts and reads gists for one user.
///
/// ```
/// # use secret_gists::{keys::KeyMaterial, service::GistService, store::MemoryStore};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), secret_gists::GistError> {
/// let service = GistService::new(MemoryStore::new(), KeyMaterial::generate(&mut rand::rngs::OsRng));
///
/// let id = service.post_self_secret("note", "hello friend").await?;
/// assert_eq!(service.fetch_self_secret(&id).await?, "hello friend");
/// # Ok(())
/// # }
/// ```
pub struct GistService<S> {
    store: S,
    key: SharedKey,
    key_file: Option<KeyFile>,
}

impl<S: GistStore> GistService<S> {
    pub fn new(store: S, key: KeyMaterial) -> Self {
        Self { store, key: SharedKey::new(key), key_file: None }
    }

    /// Start with the key in `key_file` (generating it if needed), and save every later key
    /// change back to it.
    pub fn with_key_file(store: S, key_file: KeyFile, env_key: Option<&str>) -> Result<Self, GistError> {
        let key = key_file.resolve(env_key, &mut OsRng)?;
        Ok(Self { store, key: SharedKey::new(key), key_file: Some(key_file) })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key in effect right now.
    pub fn key(&self) -> Arc<KeyMaterial> {
        self.key.snapshot()
    }

    /// Post text as-is.
    pub async fn post_unencrypted(&self, name: &str, text: &str) -> Result<String, GistError> {
        let id = self.store.store(name, text).await?;
        info!(gist_id = %id, "posted plain gist");
        Ok(id)
    }

    /// Seal text with the symmetric key and post it. Returns the new gist's id.
    pub async fn post_self_secret(&self, name: &str, text: &str) -> Result<String, GistError> {
        let key = self.key.snapshot();
        let content = key.stream_key().encrypt_data(&mut OsRng, text.as_bytes()).to_text();
        let id = self.store.store(name, &content).await?;
        info!(gist_id = %id, stream_id = %key.stream_key().id(), "posted self-secret gist");
        Ok(id)
    }

    /// Fetch a gist posted with [`post_self_secret`](Self::post_self_secret) and open it.
    pub async fn fetch_self_secret(&self, id: &str) -> Result<String, GistError> {
        let key = self.key.snapshot();
        let content = self.store.fetch(id).await?;
        let envelope = decode_envelope(id, &content)?;
        let plaintext = key.stream_key().decrypt_data(&envelope).map_err(|err| {
            warn!(gist_id = %id, stream_id = %key.stream_key().id(), "could not open self-secret gist");
            err
        })?;
        info!(gist_id = %id, stream_id = %key.stream_key().id(), "opened self-secret gist");
        into_text(plaintext)
    }

    /// Seal text for `recipient` and post it. Returns the locator to hand to them.
    pub async fn post_for_friend(
        &self,
        name: &str,
        text: &str,
        recipient: &LockId,
    ) -> Result<Locator, GistError> {
        let key = self.key.snapshot();
        let sender = key.lock_key();
        let content = sender
            .encrypt_data_for(&mut OsRng, recipient, text.as_bytes())?
            .to_text();
        let id = self.store.store(name, &content).await?;
        info!(gist_id = %id, sender = %sender.id(), recipient = %recipient, "posted gist for friend");
        Ok(Locator::new(*sender.id(), id))
    }

    /// Same as [`post_for_friend`](Self::post_for_friend), with the recipient's public key given
    /// as base64.
    pub async fn post_for_friend_base64(
        &self,
        name: &str,
        text: &str,
        recipient: &str,
    ) -> Result<Locator, GistError> {
        let recipient = LockId::from_base64(recipient)?;
        self.post_for_friend(name, text, &recipient).await
    }

    /// Fetch and open the gist a friend's locator points to.
    pub async fn fetch_from_friend(&self, locator: &str) -> Result<String, GistError> {
        let locator = Locator::decode(locator)?;
        let key = self.key.snapshot();
        let content = self.store.fetch(locator.blob_id()).await?;
        let envelope = decode_envelope(locator.blob_id(), &content)?;
        let plaintext = key
            .lock_key()
            .decrypt_data_from(locator.sender(), &envelope)
            .map_err(|err| {
                warn!(gist_id = %locator.blob_id(), sender = %locator.sender(), "could not open gist from friend");
                err
            })?;
        info!(gist_id = %locator.blob_id(), sender = %locator.sender(), "opened gist from friend");
        into_text(plaintext)
    }

    /// The user's gists, newest first.
    pub async fn list_gists(&self) -> Result<Vec<GistSummary>, GistError> {
        let gists = self.store.list_for_user().await?;
        debug!(count = gists.len(), "listed gists");
        Ok(gists)
    }

    /// Replace the key with a freshly generated one. Returns its base64 encoding.
    pub fn generate_key_material(&self) -> Result<String, GistError> {
        let key = KeyMaterial::generate(&mut OsRng);
        let encoded = key.encode();
        self.install(key)?;
        Ok(encoded)
    }

    /// Replace the key with the one `encoded` holds. Fails with
    /// [`InvalidKeyEncoding`](GistError::InvalidKeyEncoding), leaving the current key in place,
    /// unless `encoded` is base64 of exactly 32 bytes.
    pub fn set_key_material(&self, encoded: &str) -> Result<(), GistError> {
        let key = KeyMaterial::from_encoded(encoded).map_err(|err| {
            warn!("refused to set an invalid key");
            err
        })?;
        self.install(key)
    }

    /// Base64 of the current symmetric key.
    pub fn export_key_material(&self) -> String {
        self.key.snapshot().encode()
    }

    /// Both halves of the current derived keypair.
    pub fn export_keypair(&self) -> ExportedKeypair {
        self.key.snapshot().export_keypair()
    }

    /// The public key friends seal gists for.
    pub fn public_key(&self) -> LockId {
        *self.key.snapshot().public_key()
    }

    fn install(&self, key: KeyMaterial) -> Result<(), GistError> {
        let stream_id = key.stream_key().id().clone();
        // Save and swap under one write lock, so disk always holds the key in memory
        let old = self.key.try_replace(key, |key| match &self.key_file {
            Some(file) => file.save(key),
            None => Ok(()),
        })?;
        info!(old = %old.stream_key().id(), new = %stream_id, "replaced key");
        Ok(())
    }
}

fn decode_envelope(id: &str, content: &str) -> Result<Envelope, GistError> {
    Envelope::from_text(content).map_err(|err| {
        debug!(gist_id = %id, error = %err, "gist content is not an envelope");
        err
    })
}

fn into_text(plaintext: Vec<u8>) -> Result<String, GistError> {
    String::from_utf8(plaintext).map_err(|_| GistError::MalformedEnvelope("note is not UTF-8"))
}
