//! Locators handed from a sender to a friend.
//!
//! A [`Locator`] is everything a recipient needs to find and open a gist sealed for them: the
//! sender's [`LockId`] and the store's id for the gist. It's written out as a single string:
//!
//! ```text
//! +======================+===========+
//! |  base64(LockId)      |  Gist ID  |
//! +======================+===========+
//!
//! - base64(LockId) is always 44 characters, since the public key is 32 bytes
//! - Gist ID is taken verbatim, and must not be empty
//! ```
//!
//! # Example
//!
//! ```
//! # use secret_gists::{lock::LockKey, locator::Locator};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut csprng = rand::rngs::OsRng;
//! let sender = LockKey::generate(&mut csprng);
//!
//! let locator = Locator::new(*sender.id(), "aa5a315d61ae9438b18d");
//! let text = locator.to_string();
//!
//! let decoded: Locator = text.parse()?;
//! assert_eq!(decoded.sender(), sender.id());
//! assert_eq!(decoded.blob_id(), "aa5a315d61ae9438b18d");
//! # Ok(())
//! # }
//! ```

use crate::{
    lock::{LockId, ENCODED_LOCK_ID_LEN},
    GistError,
};

use std::{fmt, str::FromStr};

/// Width of the encoded public key at the start of a locator.
pub const ENCODED_KEY_LEN: usize = ENCODED_LOCK_ID_LEN;

/// Sender public key plus gist id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator {
    sender: LockId,
    blob_id: String,
}

impl Locator {
    pub fn new(sender: LockId, blob_id: impl Into<String>) -> Self {
        Self { sender, blob_id: blob_id.into() }
    }

    /// Public key of whoever sealed the gist.
    pub fn sender(&self) -> &LockId {
        &self.sender
    }

    /// The store's id for the gist.
    pub fn blob_id(&self) -> &str {
        &self.blob_id
    }

    /// Split a locator string. Leading whitespace is ignored; everything after the key is the gist
    /// id, taken verbatim.
    pub fn decode(text: &str) -> Result<Self, GistError> {
        // Base64 never starts with whitespace, but an id may end with it
        let text = text.trim_start();
        let key_text = text
            .get(..ENCODED_KEY_LEN)
            .ok_or(GistError::MalformedLocator("too short to hold a public key"))?;
        let blob_id = &text[ENCODED_KEY_LEN..];
        let sender = LockId::from_base64(key_text)
            .map_err(|_| GistError::MalformedLocator("public key is not base64 of 32 bytes"))?;
        if blob_id.is_empty() {
            return Err(GistError::MalformedLocator("gist id is empty"));
        }
        Ok(Self { sender, blob_id: blob_id.to_owned() })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.sender.to_base64(), self.blob_id)
    }
}

impl FromStr for Locator {
    type Err = GistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
