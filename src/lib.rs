/*!
Keep notes confidential while storing them on a public gist service.

A user holds one 32-byte key. With it they can:

- Seal a note for themselves. The note is encrypted with the key directly, posted as a gist, and
  read back later by gist id with the same key.
- Seal a note for a friend. The key doubles as an X25519 secret, so the user has a public key to
  hand out. A note for a friend is sealed between the user's secret and the friend's public key,
  and the friend is given a [`Locator`](locator::Locator): the user's public key followed by the
  gist id. The locator is all the friend needs to fetch and open the note.

The gist host only ever sees text, so sealed notes are stored as an
[`Envelope`](envelope::Envelope) written out as `base64(nonce)` directly followed by
`base64(ciphertext)`.

# Example

```
# use secret_gists::{keys::KeyMaterial, service::GistService, store::MemoryStore};
# use std::sync::Arc;
# #[tokio::main(flavor = "current_thread")]
# async fn main() -> Result<(), secret_gists::GistError> {
let mut csprng = rand::rngs::OsRng;
let store = Arc::new(MemoryStore::new());
let alice = GistService::new(store.clone(), KeyMaterial::generate(&mut csprng));
let bob = GistService::new(store.clone(), KeyMaterial::generate(&mut csprng));

// Alice leaves a note only Bob can read, and passes him the locator
let locator = alice.post_for_friend("secret", "meet at noon", &bob.public_key()).await?;
let text = bob.fetch_from_friend(&locator.to_string()).await?;
assert_eq!(text, "meet at noon");
# Ok(())
# }
```

# Cryptographic Algorithms Used

The currently used algorithms are:

- Symmetric Encryption: AEAD cipher using XChaCha20 and Poly1305, with a 24-byte random nonce.
- DH key exchange: X25519, static key to static key.
- Key derivation & fingerprints: BLAKE2b with a 32-byte digest, keyed and personalized.

There is no version byte anywhere in the stored formats. Changing an algorithm means gists sealed
before the change can no longer be opened.

*/

mod error;
pub use self::error::GistError;

pub mod config;
pub mod envelope;
pub mod keys;
pub mod lock;
pub mod locator;
pub mod serde;
pub mod service;
pub mod store;
pub mod stream;

pub use config::KeyFile;
pub use envelope::Envelope;
pub use keys::{ExportedKeypair, KeyMaterial, SharedKey};
pub use lock::{LockId, LockKey};
pub use locator::Locator;
pub use service::GistService;
pub use store::{GistStore, GistSummary, MemoryStore};
pub use stream::{StreamId, StreamKey};

use rand_core::{CryptoRng, RngCore};

/// Holds a cryptographic random number generator (RNG). This trait is needed so that a RNG can be
/// passed around as a trait object.
pub trait CryptoSrc: CryptoRng + RngCore {}
impl<T: CryptoRng + RngCore> CryptoSrc for T {}
