use std::io;

use thiserror::Error;

/// Possible error conditions when sealing, storing, fetching, or opening a gist.
#[derive(Debug, Error)]
pub enum GistError {
    /// A key string was not standard base64, or didn't decode to exactly 32 bytes.
    #[error("Key string appears invalid: {0}")]
    InvalidKeyEncoding(&'static str),
    /// A provided public key is weak (low-order) and can't be used as a recipient.
    #[error("Crypto key is weak or invalid")]
    BadKey,
    /// Stored gist text isn't a sealed envelope. The step that failed is included.
    #[error("Gist content is not a valid envelope: {0}")]
    MalformedEnvelope(&'static str),
    /// A locator string couldn't be split into a public key and a gist id.
    #[error("Locator string is not valid: {0}")]
    MalformedLocator(&'static str),
    /// The envelope could not be opened with the key(s) given. Wrong key, wrong sender, and
    /// tampered ciphertext all look the same.
    #[error("Could not decrypt with key")]
    DecryptionFailed,
    /// The blob store couldn't be reached, or refused the request.
    #[error("Gist store unavailable: {0}")]
    StoreUnavailable(String),
    /// The blob store has no gist with the requested id.
    #[error("No gist found with id {0}")]
    NotFound(String),
    /// Reading or writing the key file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The key file isn't valid JSON, or is missing fields.
    #[error("Key file is malformed: {0}")]
    Config(#[from] serde_json::Error),
}
