//! Symmetric-Key encryption.
//!
//! This submodule provides a `StreamKey` for sealing notes that only the key holder can read back
//! later. Each `StreamKey` has a corresponding `StreamId`, a fingerprint that identifies the key
//! in logs and listings without revealing it.
//!
//! # Example
//!
//! ```
//! # use secret_gists::stream::*;
//! # use secret_gists::envelope::Envelope;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! // Make a new key, and save it off somewhere as base64
//! let mut csprng = rand::rngs::OsRng {};
//! let key = StreamKey::generate(&mut csprng);
//! let saved = key.to_base64();
//!
//! println!("StreamId(Base58): {}", key.id());
//!
//! // Encrypt some data with the key, then turn it into gist text
//! let data = b"I am sensitive information, about to be encrypted";
//! let text = key.encrypt_data(&mut csprng, data.as_ref()).to_text();
//!
//! // Later: reload the key and decrypt
//! let key = StreamKey::from_base64(&saved)?;
//! let dec_data = key.decrypt_data(&Envelope::from_text(&text)?)?;
//! assert_eq!(&dec_data[..], &data[..]);
//! # Ok(())
//! # }
//! ```
//!
//! # Algorithms
//!
//! The current (and only) algorithm for symmetric encryption is XChaCha20 with a Poly1305 AEAD
//! construction (XChaCha20Poly1305).
//!
//! The `StreamId` is computed by using the 32-byte secret key as the key of a BLAKE2b MAC, with
//! no salt and a persona set to "gist-stream-id", over an empty message. The 32-byte output is
//! the `StreamId`.
//!
//! The same 32 bytes also seed the key's X25519 keypair; see [`StreamKey::lock_key`].
//!
//! # Format
//!
//! A `StreamKey` is exported as the standard base64 encoding of its 32 raw bytes (44
//! characters). There is no version byte.

use crate::{
    envelope::{self, Envelope, KEY_SIZE},
    lock::LockKey,
    GistError,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use rand_core::{CryptoRng, RngCore};

use subtle::ConstantTimeEq;

use zeroize::Zeroize;

use std::{convert::TryFrom, fmt};

use blake2::{
    digest::{consts::U32, Mac},
    Blake2bMac,
};

const STREAM_ID_PERSONA: &[u8] = b"gist-stream-id";

const V1_STREAM_ID_SIZE: usize = 32;

/// Stream Key that allows encrypting notes into an [`Envelope`] and decrypting them later.
///
/// ```
/// # use secret_gists::stream::*;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
///
/// // Make a new temporary key
/// let mut csprng = rand::rngs::OsRng {};
/// let key = StreamKey::generate(&mut csprng);
///
/// // Encrypt some data with the key
/// let data = b"I am sensitive information, about to be encrypted";
/// let envelope = key.encrypt_data(&mut csprng, data.as_ref());
///
/// // Decrypt that data with the same key
/// let dec_data = key.decrypt_data(&envelope)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StreamKey {
    key: [u8; KEY_SIZE],
    id: StreamId,
}

impl StreamKey {

    /// Generate a new random `StreamKey`.
    pub fn generate<R>(csprng: &mut R) -> StreamKey
        where R: CryptoRng + RngCore
    {
        let mut key = [0; KEY_SIZE];
        csprng.fill_bytes(&mut key);
        let new = Self::from_raw(&key);
        // Wipe out the key after it's copied into the struct
        key.zeroize();
        debug_assert!(key.iter().all(|&x| x == 0));
        new
    }

    fn from_raw(key: &[u8; KEY_SIZE]) -> StreamKey {
        StreamKey {
            key: *key,
            id: stream_id_from_key(key),
        }
    }

    /// Attempt to parse a base64-encoded `StreamKey`. Fails with
    /// [`InvalidKeyEncoding`](GistError::InvalidKeyEncoding) unless the string is standard base64
    /// of exactly 32 bytes. Surrounding whitespace is ignored.
    pub fn from_base64(s: &str) -> Result<Self, GistError> {
        let mut raw = STANDARD.decode(s.trim())
            .map_err(|_| GistError::InvalidKeyEncoding("not valid base64"))?;
        let result = Self::try_from(raw.as_ref());
        raw.zeroize();
        result
    }

    /// Export the raw key as standard base64. The result is the secret itself; treat it as such.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// The publically shareable fingerprint for this key.
    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Derive the X25519 keypair that uses this key's bytes as its secret scalar. This is a pure
    /// function of the key: the same `StreamKey` always yields the same `LockKey`.
    pub fn lock_key(&self) -> LockKey {
        LockKey::from_seed(&self.key)
    }

    /// Encrypt a byte slice into an `Envelope`. Requires a cryptographic RNG to generate the
    /// needed nonce.
    pub fn encrypt_data<R: CryptoRng + RngCore>(
        &self,
        csprng: &mut R,
        content: &[u8]
    ) -> Envelope {
        envelope::seal(&self.key, csprng, content)
    }

    /// Attempt to decrypt an `Envelope` with this key. Fails with
    /// [`DecryptionFailed`](GistError::DecryptionFailed) if the envelope was sealed with another
    /// key or has been altered.
    pub fn decrypt_data(&self, envelope: &Envelope) -> Result<Vec<u8>, GistError> {
        envelope::open(&self.key, envelope)
    }
}

impl TryFrom<&[u8]> for StreamKey {
    type Error = GistError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut key: [u8; KEY_SIZE] = TryFrom::try_from(value)
            .map_err(|_| GistError::InvalidKeyEncoding("key must be exactly 32 bytes"))?;
        let new = Self::from_raw(&key);
        key.zeroize();
        Ok(new)
    }
}

impl Drop for StreamKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl PartialEq for StreamKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for StreamKey {}

impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StreamKey")
            .field("stream_id", &self.id().raw_identifier())
            .finish()
    }
}

impl fmt::Display for StreamKey {
    /// Display just the StreamId (never the underlying key).
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

/// Compute the corresponding StreamId for a given raw key.
fn stream_id_from_key(key: &[u8; KEY_SIZE]) -> StreamId {
    let mac = Blake2bMac::<U32>::new_with_salt_and_personal(key, &[], STREAM_ID_PERSONA)
        .expect("32-byte key and 14-byte persona fit the BLAKE2b parameter block");
    let mut inner = [0u8; V1_STREAM_ID_SIZE];
    inner.copy_from_slice(&mac.finalize().into_bytes());
    StreamId { inner }
}

/// An identifier for a corresponding [`StreamKey`]. Safe to log or display; it's derived through
/// a keyed hash of the key (see [`crate::stream`]).
///
/// ```
/// # use secret_gists::stream::*;
///
/// let mut csprng = rand::rngs::OsRng {};
/// let key = StreamKey::generate(&mut csprng);
/// let id = key.id();
///
/// println!("StreamId(Base58): {}", id);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StreamId {
    inner: [u8; V1_STREAM_ID_SIZE],
}

impl StreamId {

    pub fn raw_identifier(&self) -> &[u8] {
        &self.inner
    }

    /// Convert into a base58-encoded StreamId.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.inner).into_string()
    }

    /// Attempt to parse a base58-encoded StreamId.
    pub fn from_base58(s: &str) -> Result<Self, GistError> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|_| GistError::InvalidKeyEncoding("not valid base58"))?;
        Self::try_from(&raw[..])
    }
}

impl TryFrom<&[u8]> for StreamId {
    type Error = GistError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let inner: [u8; V1_STREAM_ID_SIZE] = TryFrom::try_from(value)
            .map_err(|_| GistError::InvalidKeyEncoding("stream id must be exactly 32 bytes"))?;
        Ok(Self { inner })
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StreamId")
            .field("stream_id", &self.inner)
            .finish()
    }
}

impl fmt::Display for StreamId {
    /// Display as a base58-encoded string.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn display() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let disp_key = format!("{}", &key);
        let disp_id = format!("{}", key.id());
        let base58 = key.id().to_base58();
        assert_eq!(disp_key, disp_id);
        assert_eq!(disp_key, base58);
        assert!(disp_key.len() > 1);
        // Neither formatter may leak the key itself
        let debug = format!("{:?}", key);
        assert!(!disp_key.contains(&key.to_base64()));
        assert!(!debug.contains(&format!("{:?}", key.key)));
    }

    #[test]
    fn id_sanity_check() {
        // Just make sure the ID & Key aren't somehow the same
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        assert_ne!(key.id().raw_identifier(), &key.key[..]);
        let again = StreamKey::try_from(&key.key[..]).unwrap();
        assert_eq!(again.id(), key.id());
        assert_eq!(&StreamId::from_base58(&key.id().to_base58()).unwrap(), key.id());
        assert!(StreamId::from_base58("0OIl").is_err());
    }

    #[test]
    fn base64() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let encoded = key.to_base64();
        assert_eq!(encoded.len(), 44);
        let decoded = StreamKey::from_base64(&encoded).unwrap();
        assert_eq!(decoded, key);
        let padded = format!("  {}\n", encoded);
        assert_eq!(StreamKey::from_base64(&padded).unwrap(), key);
    }

    #[test]
    fn base64_bad_input() {
        let cases = [
            "",
            "definitely not base64!",
            // 31 bytes
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==",
            // 33 bytes
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        ];
        for case in cases {
            match StreamKey::from_base64(case) {
                Err(GistError::InvalidKeyEncoding(_)) => {}
                other => panic!("Expected InvalidKeyEncoding for {:?}, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn leading_zero_key() {
        let mut raw = [0u8; KEY_SIZE];
        raw[KEY_SIZE - 1] = 1;
        let key = StreamKey::try_from(&raw[..]).unwrap();
        let encoded = key.to_base64();
        assert_eq!(encoded.len(), 44);
        assert!(encoded.starts_with("AAAA"));
        assert_eq!(StreamKey::from_base64(&encoded).unwrap(), key);
    }

    #[test]
    fn data_clean_decrypt() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let message = b"I am a test message, going undercover";
        let envelope = key.encrypt_data(&mut csprng, message);
        assert_eq!(envelope.ciphertext().len(), message.len() + crate::envelope::TAG_SIZE);
        let text = envelope.to_text();
        let dec = key.decrypt_data(&Envelope::from_text(&text).unwrap()).unwrap();
        assert_eq!(&dec[..], &message[..]);
    }

    #[test]
    fn empty_message() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let envelope = key.encrypt_data(&mut csprng, b"");
        let text = envelope.to_text();
        let dec = key.decrypt_data(&Envelope::from_text(&text).unwrap()).unwrap();
        assert!(dec.is_empty());
    }

    #[test]
    fn wrong_key() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let other = StreamKey::generate(&mut csprng);
        let envelope = key.encrypt_data(&mut csprng, b"for my eyes only");
        assert!(matches!(other.decrypt_data(&envelope), Err(GistError::DecryptionFailed)));
    }

    #[test]
    fn nonce_uniqueness() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let mut nonces = HashSet::new();
        for _ in 0..10_000 {
            let envelope = key.encrypt_data(&mut csprng, b"same message every time");
            assert!(nonces.insert(*envelope.nonce()));
        }
        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn lock_key_is_deterministic() {
        let mut csprng = rand::rngs::OsRng;
        let key = StreamKey::generate(&mut csprng);
        let reloaded = StreamKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.lock_key().id(), reloaded.lock_key().id());
        // Secret half of the keypair is the stream key's own bytes
        assert_eq!(key.lock_key().to_base64(), key.to_base64());
        let other = StreamKey::generate(&mut csprng);
        assert_ne!(key.lock_key().id(), other.lock_key().id());
    }
}
