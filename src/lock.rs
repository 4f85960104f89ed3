//! Public-Key encryption.
//!
//! This module lets you hold a [`LockKey`] (a private key), which comes with a corresponding
//! [`LockId`] (the public key). Sharing the `LockId` lets friends seal notes that only the
//! `LockKey` can open. Unlike an anonymous sealed box, the sender seals with their *own* `LockKey`,
//! so the recipient needs the sender's `LockId` as well; in practice it travels inside a
//! [`Locator`](crate::locator::Locator).
//!
//! # Example
//!
//! ```
//! # use secret_gists::lock::*;
//! # use secret_gists::envelope::Envelope;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let mut csprng = rand::rngs::OsRng {};
//! let alice = LockKey::generate(&mut csprng);
//! let bob = LockKey::generate(&mut csprng);
//!
//! println!("LockId(Base64): {}", bob.id());
//!
//! // Alice encrypts some data for Bob's public ID
//! let data = b"I am sensitive information, about to be encrypted";
//! let text = alice.encrypt_data_for(&mut csprng, bob.id(), data.as_ref())?.to_text();
//!
//! // Bob decrypts it, knowing it came from Alice
//! let envelope = Envelope::from_text(&text)?;
//! let dec_data = bob.decrypt_data_from(alice.id(), &envelope)?;
//! assert_eq!(&data[..], &dec_data[..]);
//! # Ok(())
//! # }
//! ```
//!
//! # Algorithms
//!
//! The current (and only) algorithm for public-key encryption is X25519 for calculation of the
//! shared secret, between the sender's static key and the recipient's static key. The 32-byte
//! shared secret is never used directly. Instead it keys a BLAKE2b MAC, with no salt and a persona
//! set to "gist-box-v1", over the sender's public key followed by the recipient's public key. The
//! 32-byte output is the symmetric key for XChaCha20Poly1305.
//!
//! Shared secrets that aren't contributory (the peer handed over a low-order point) are refused.
//!
//! # Format
//!
//! A [`LockId`] is exported as the standard base64 encoding of its 32-byte public key, always 44
//! characters long. A [`LockKey`] is exported the same way from its 32-byte secret.

use crate::{
    envelope::{self, Envelope, KEY_SIZE},
    GistError,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use rand_core::{CryptoRng, RngCore};

use subtle::ConstantTimeEq;

use zeroize::Zeroize;

use std::{convert::TryFrom, fmt, str::FromStr};

use blake2::{
    digest::{consts::U32, Mac},
    Blake2bMac,
};

const BOX_PERSONA: &[u8] = b"gist-box-v1";

const V1_LOCK_ID_SIZE: usize = 32; // Size of public key
const V1_LOCK_KEY_SIZE: usize = 32; // Size of static secret key

/// Length of a base64-encoded [`LockId`].
pub const ENCODED_LOCK_ID_LEN: usize = 44;

/// A key that allows decrypting data meant for a particular [`LockId`], and sealing data for
/// others.
///
/// This acts as a wrapper for a specific X25519 private key.
///
/// # Example
/// ```
/// # use secret_gists::lock::*;
///
/// // Make a new temporary key
/// let mut csprng = rand::rngs::OsRng {};
/// let key = LockKey::generate(&mut csprng);
/// println!("LockId(Base64): {}", key.id());
/// ```
#[derive(Clone)]
pub struct LockKey {
    id: LockId,
    key: x25519_dalek::StaticSecret,
}

impl LockKey {

    /// Generate a new random `LockKey`.
    pub fn generate<R>(csprng: &mut R) -> LockKey
    where
        R: CryptoRng + RngCore,
    {
        let key = x25519_dalek::StaticSecret::random_from_rng(csprng);
        let id = LockId { inner: x25519_dalek::PublicKey::from(&key) };
        LockKey { id, key }
    }

    /// Build a `LockKey` using 32 bytes directly as the X25519 secret. Clamping happens at
    /// multiplication time, so any 32 bytes are acceptable.
    pub(crate) fn from_seed(seed: &[u8; V1_LOCK_KEY_SIZE]) -> LockKey {
        let key = x25519_dalek::StaticSecret::from(*seed);
        let id = LockId { inner: x25519_dalek::PublicKey::from(&key) };
        LockKey { id, key }
    }

    /// Attempt to parse a base64-encoded secret key. Surrounding whitespace is ignored.
    pub fn from_base64(s: &str) -> Result<Self, GistError> {
        let mut raw = STANDARD.decode(s.trim())
            .map_err(|_| GistError::InvalidKeyEncoding("not valid base64"))?;
        let result = Self::try_from(raw.as_ref());
        raw.zeroize();
        result
    }

    /// Export the secret key as standard base64. The result is the secret itself; treat it as
    /// such.
    pub fn to_base64(&self) -> String {
        let mut raw_key = self.key.to_bytes();
        let encoded = STANDARD.encode(raw_key);
        raw_key.zeroize();
        encoded
    }

    /// The public identifier for this key.
    pub fn id(&self) -> &LockId {
        &self.id
    }

    /// Encrypt a byte slice into an `Envelope` that only `recipient` can open, given this key's
    /// `LockId`. Requires a cryptographic RNG to generate the needed nonce.
    ///
    /// Fails with [`BadKey`](GistError::BadKey) if `recipient` is a low-order point.
    pub fn encrypt_data_for<R>(
        &self,
        csprng: &mut R,
        recipient: &LockId,
        content: &[u8],
    ) -> Result<Envelope, GistError>
    where
        R: CryptoRng + RngCore,
    {
        let mut key = self.box_key(recipient, &self.id, recipient)
            .ok_or(GistError::BadKey)?;
        let envelope = envelope::seal(&key, csprng, content);
        key.zeroize();
        Ok(envelope)
    }

    /// Attempt to decrypt an `Envelope` that `sender` sealed for this key. Fails with
    /// [`DecryptionFailed`](GistError::DecryptionFailed) if it was sealed by someone else, for
    /// someone else, or has been altered.
    pub fn decrypt_data_from(
        &self,
        sender: &LockId,
        envelope: &Envelope,
    ) -> Result<Vec<u8>, GistError> {
        let mut key = self.box_key(sender, sender, &self.id)
            .ok_or(GistError::DecryptionFailed)?;
        let result = envelope::open(&key, envelope);
        key.zeroize();
        result
    }

    /// Compute the symmetric key shared with `peer`. Returns None if the exchange isn't
    /// contributory.
    fn box_key(
        &self,
        peer: &LockId,
        sender: &LockId,
        recipient: &LockId,
    ) -> Option<[u8; KEY_SIZE]> {
        let shared = self.key.diffie_hellman(&peer.inner);
        if !shared.was_contributory() {
            return None;
        }
        let mut mac = Blake2bMac::<U32>::new_with_salt_and_personal(shared.as_bytes(), &[], BOX_PERSONA)
            .expect("32-byte secret and 11-byte persona fit the BLAKE2b parameter block");
        mac.update(sender.raw_public_key());
        mac.update(recipient.raw_public_key());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&mac.finalize().into_bytes());
        Some(key)
    }
}

impl TryFrom<&[u8]> for LockKey {
    type Error = GistError;

    /// Try to decode a raw 32-byte secret key.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut raw_key: [u8; V1_LOCK_KEY_SIZE] = TryFrom::try_from(value)
            .map_err(|_| GistError::InvalidKeyEncoding("secret key must be exactly 32 bytes"))?;
        let new = Self::from_seed(&raw_key);
        raw_key.zeroize();
        Ok(new)
    }
}

impl PartialEq for LockKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.as_bytes().ct_eq(other.key.as_bytes()).into()
    }
}

impl Eq for LockKey {}

impl fmt::Debug for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockKey")
            .field("lock_id", &self.id().raw_public_key())
            .finish()
    }
}

impl fmt::Display for LockKey {
    /// Display just the LockId (never the underlying key).
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.id(), f)
    }
}

/// An identifier for a corresponding [`LockKey`] that can be used to encrypt data for that key.
///
/// This contains a cryptographic public encryption key.
///
/// # Example
/// ```
/// # use secret_gists::lock::*;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let mut csprng = rand::rngs::OsRng {};
/// # let friend = LockKey::generate(&mut csprng);
/// # let shared = friend.id().to_base64();
/// let me = LockKey::generate(&mut csprng);
///
/// // We've been given a LockId that we're sending encrypted data to.
/// let id = LockId::from_base64(&shared)?;
///
/// // Encrypt some data for that LockId
/// let data = b"I am sensitive information, about to be encrypted";
/// let envelope = me.encrypt_data_for(&mut csprng, &id, data.as_ref())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId {
    inner: x25519_dalek::PublicKey,
}

impl LockId {

    /// Get the raw public encryption key contained within.
    pub fn raw_public_key(&self) -> &[u8; V1_LOCK_ID_SIZE] {
        self.inner.as_bytes()
    }

    /// Attempt to parse a base64-encoded `LockId`. Surrounding whitespace is ignored.
    pub fn from_base64(s: &str) -> Result<Self, GistError> {
        let raw = STANDARD.decode(s.trim())
            .map_err(|_| GistError::InvalidKeyEncoding("not valid base64"))?;
        Self::try_from(&raw[..])
    }

    /// Convert into a base64-encoded `LockId`. Always [`ENCODED_LOCK_ID_LEN`] characters.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.inner.as_bytes())
    }
}

impl From<[u8; V1_LOCK_ID_SIZE]> for LockId {
    fn from(value: [u8; V1_LOCK_ID_SIZE]) -> Self {
        Self { inner: x25519_dalek::PublicKey::from(value) }
    }
}

impl TryFrom<&[u8]> for LockId {
    type Error = GistError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let inner: [u8; V1_LOCK_ID_SIZE] = TryFrom::try_from(value)
            .map_err(|_| GistError::InvalidKeyEncoding("public key must be exactly 32 bytes"))?;
        Ok(Self::from(inner))
    }
}

impl FromStr for LockId {
    type Err = GistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl fmt::Debug for LockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LockId")
            .field("public_key", &self.raw_public_key())
            .finish()
    }
}

impl fmt::Display for LockId {
    /// Display as a base64-encoded string.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (LockKey, LockKey, Envelope) {
        let mut csprng = rand::rngs::OsRng;
        let sender = LockKey::generate(&mut csprng);
        let recipient = LockKey::generate(&mut csprng);
        let message = b"I am a test message, going undercover";
        let envelope = sender.encrypt_data_for(&mut csprng, recipient.id(), message).unwrap();
        (sender, recipient, envelope)
    }

    #[test]
    fn lock_data() {
        let (sender, recipient, envelope) = setup();
        let text = envelope.to_text();
        let dec_envelope = Envelope::from_text(&text).unwrap();
        let dec_message = recipient.decrypt_data_from(sender.id(), &dec_envelope).unwrap();
        assert_eq!(&dec_message[..], b"I am a test message, going undercover");
    }

    #[test]
    fn sender_can_reopen() {
        // Key derivation is directional: swapping sender and recipient gives a different key
        let (sender, recipient, envelope) = setup();
        let dec_message = sender.decrypt_data_from(recipient.id(), &envelope);
        assert!(dec_message.is_err());
        let mut csprng = rand::rngs::OsRng;
        let to_self = sender.encrypt_data_for(&mut csprng, sender.id(), b"note to self").unwrap();
        assert_eq!(sender.decrypt_data_from(sender.id(), &to_self).unwrap(), b"note to self");
    }

    #[test]
    fn wrong_recipient() {
        let (sender, _recipient, envelope) = setup();
        let mut csprng = rand::rngs::OsRng;
        let eve = LockKey::generate(&mut csprng);
        assert!(matches!(
            eve.decrypt_data_from(sender.id(), &envelope),
            Err(GistError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_sender() {
        let (_sender, recipient, envelope) = setup();
        let mut csprng = rand::rngs::OsRng;
        let eve = LockKey::generate(&mut csprng);
        assert!(matches!(
            recipient.decrypt_data_from(eve.id(), &envelope),
            Err(GistError::DecryptionFailed)
        ));
    }

    #[test]
    fn corrupt_each_byte() {
        let (sender, recipient, envelope) = setup();
        let mut raw = envelope.nonce().to_vec();
        raw.extend_from_slice(envelope.ciphertext());
        for i in 0..raw.len() {
            raw[i] ^= 0xFF;
            let text = STANDARD.encode(&raw);
            let corrupt = Envelope::from_text(&text).unwrap();
            assert!(matches!(
                recipient.decrypt_data_from(sender.id(), &corrupt),
                Err(GistError::DecryptionFailed)
            ));
            raw[i] ^= 0xFF;
        }
        let clean = Envelope::from_text(&STANDARD.encode(&raw)).unwrap();
        assert!(recipient.decrypt_data_from(sender.id(), &clean).is_ok());
    }

    #[test]
    fn low_order_recipient() {
        let mut csprng = rand::rngs::OsRng;
        let sender = LockKey::generate(&mut csprng);
        let zero = LockId::from([0u8; 32]);
        assert!(matches!(
            sender.encrypt_data_for(&mut csprng, &zero, b"nobody home"),
            Err(GistError::BadKey)
        ));
        let (_, recipient, envelope) = setup();
        assert!(matches!(
            recipient.decrypt_data_from(&zero, &envelope),
            Err(GistError::DecryptionFailed)
        ));
    }

    #[test]
    fn base64() {
        let mut csprng = rand::rngs::OsRng;
        let key = LockKey::generate(&mut csprng);
        let encoded = key.id().to_base64();
        assert_eq!(encoded.len(), ENCODED_LOCK_ID_LEN);
        assert_eq!(&LockId::from_base64(&encoded).unwrap(), key.id());
        assert_eq!(&encoded.parse::<LockId>().unwrap(), key.id());
        assert_eq!(format!("{}", key), encoded);

        let secret = key.to_base64();
        let reloaded = LockKey::from_base64(&secret).unwrap();
        assert_eq!(reloaded.id(), key.id());

        assert!(matches!(LockId::from_base64("nope"), Err(GistError::InvalidKeyEncoding(_))));
        assert!(matches!(
            LockId::from_base64(&STANDARD.encode([1u8; 31])),
            Err(GistError::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            LockKey::from_base64(&STANDARD.encode([1u8; 33])),
            Err(GistError::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn fixed_width() {
        let mut raw = [0u8; 32];
        assert_eq!(LockId::from(raw).to_base64().len(), ENCODED_LOCK_ID_LEN);
        raw[31] = 0xFF;
        assert_eq!(LockId::from(raw).to_base64().len(), ENCODED_LOCK_ID_LEN);
        let raw = [0xFFu8; 32];
        assert_eq!(LockId::from(raw).to_base64().len(), ENCODED_LOCK_ID_LEN);
    }
}
