//! Sealed gist content.
//!
//! An [`Envelope`] is the pair of a random nonce and the AEAD ciphertext produced with it. Both
//! the [`StreamKey`](crate::stream::StreamKey) and the [`LockKey`](crate::lock::LockKey) produce
//! the same kind of envelope; only the key fed into the cipher differs.
//!
//! # Algorithms
//!
//! The current (and only) algorithm is XChaCha20 with a Poly1305 AEAD construction. No additional
//! data is authenticated, so the gist's filename is not protected.
//!
//! # Format
//!
//! Gist services only store text, so an envelope is written out as two base64 strings placed
//! directly after one another. The nonce and the ciphertext are encoded *separately*, using the
//! standard alphabet with padding and no line breaks:
//!
//! ```text
//! +==================+==============================+
//! |  base64(Nonce)   |  base64(Ciphertext || Tag)   |
//! +==================+==============================+
//!
//! - base64(Nonce) is always 32 characters, since the nonce is 24 bytes
//! - Ciphertext is the note, encrypted with XChaCha20
//! - Tag is the 16-byte Poly1305 authentication tag
//! ```
//!
//! Decoding splits the text at character 32 rather than at a byte offset of the decoded data, so
//! the nonce width must never change. Since 24 bytes is a whole number of base64 groups, the
//! result happens to equal `base64(Nonce || Ciphertext || Tag)` as well.

use crate::{CryptoSrc, GistError};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use std::{fmt, str::FromStr};

/// Size of an envelope's nonce, in bytes.
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 tag carried at the end of the ciphertext, in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the symmetric key fed to the cipher, in bytes.
pub const KEY_SIZE: usize = 32;

/// Length of the base64-encoded nonce at the start of an envelope's text.
pub const ENCODED_NONCE_LEN: usize = 32;

/// An encrypted note, ready to be written to (or just read from) a gist.
///
/// ```
/// # use secret_gists::stream::StreamKey;
/// # use secret_gists::envelope::Envelope;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut csprng = rand::rngs::OsRng;
/// let key = StreamKey::generate(&mut csprng);
///
/// let envelope = key.encrypt_data(&mut csprng, b"a note for later");
/// let text = envelope.to_text();
///
/// let envelope: Envelope = text.parse()?;
/// assert_eq!(key.decrypt_data(&envelope)?, b"a note for later");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// The random nonce this envelope was sealed with.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// The ciphertext, including the trailing authentication tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Length of the note this envelope should open to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }

    /// Encode as gist text: `base64(nonce) || base64(ciphertext)`.
    pub fn to_text(&self) -> String {
        let mut text = STANDARD.encode(self.nonce);
        debug_assert_eq!(text.len(), ENCODED_NONCE_LEN);
        STANDARD.encode_string(&self.ciphertext, &mut text);
        text
    }

    /// The raw `nonce || ciphertext` bytes, for binary formats.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.ciphertext);
        raw
    }

    /// Split raw `nonce || ciphertext` bytes back into an envelope.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, GistError> {
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(GistError::MalformedEnvelope("too short to hold a nonce and tag"));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);
        let mut envelope = Self { nonce: [0u8; NONCE_SIZE], ciphertext: ciphertext.to_vec() };
        envelope.nonce.copy_from_slice(nonce);
        Ok(envelope)
    }

    /// Decode gist text into an envelope. Surrounding whitespace is ignored.
    pub fn from_text(text: &str) -> Result<Self, GistError> {
        let text = text.trim();
        // `get` also refuses to split inside a multi-byte character
        let nonce_text = text
            .get(..ENCODED_NONCE_LEN)
            .ok_or(GistError::MalformedEnvelope("text too short to hold a nonce"))?;
        let ciphertext_text = &text[ENCODED_NONCE_LEN..];

        let nonce = STANDARD
            .decode(nonce_text)
            .map_err(|_| GistError::MalformedEnvelope("nonce is not valid base64"))?;
        let nonce: [u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| GistError::MalformedEnvelope("nonce is not 24 bytes"))?;

        let ciphertext = STANDARD
            .decode(ciphertext_text)
            .map_err(|_| GistError::MalformedEnvelope("ciphertext is not valid base64"))?;
        if ciphertext.len() < TAG_SIZE {
            return Err(GistError::MalformedEnvelope("ciphertext shorter than its tag"));
        }

        Ok(Self { nonce, ciphertext })
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("nonce", &self.nonce)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

impl fmt::Display for Envelope {
    /// Display as gist text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Envelope {
    type Err = GistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

/// Seal `content` under a raw 32-byte key with a fresh nonce. Used by both
/// [`StreamKey`](crate::stream::StreamKey) and [`LockKey`](crate::lock::LockKey); the latter
/// passes in the key derived from its Diffie-Hellman exchange.
pub(crate) fn seal(key: &[u8; KEY_SIZE], csprng: &mut dyn CryptoSrc, content: &[u8]) -> Envelope {
    use chacha20poly1305::aead::{Aead, KeyInit};
    use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

    let mut nonce = [0u8; NONCE_SIZE];
    csprng.fill_bytes(&mut nonce);

    let aead = XChaCha20Poly1305::new(Key::from_slice(key));
    // The only failure condition on encryption is content past 256 GiB, which no gist can hold.
    let ciphertext = aead
        .encrypt(XNonce::from_slice(&nonce), content)
        .expect("More data than the cipher can accept was put in");
    debug_assert_eq!(ciphertext.len(), content.len() + TAG_SIZE);

    Envelope { nonce, ciphertext }
}

/// Open an envelope with a raw 32-byte key.
pub(crate) fn open(key: &[u8; KEY_SIZE], envelope: &Envelope) -> Result<Vec<u8>, GistError> {
    use chacha20poly1305::aead::{Aead, KeyInit};
    use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

    let aead = XChaCha20Poly1305::new(Key::from_slice(key));
    aead.decrypt(XNonce::from_slice(&envelope.nonce), envelope.ciphertext.as_ref())
        .map_err(|_| GistError::DecryptionFailed)
}
