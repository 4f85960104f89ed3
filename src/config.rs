//! Persisted key configuration.
//!
//! The only state kept between runs is the symmetric key, stored as JSON:
//!
//! ```text
//! { "secret_key": "<base64 of 32 bytes>" }
//! ```
//!
//! At startup the key comes from the `SECRET_KEY` environment variable if it's set, and otherwise
//! from the key file, which is regenerated if it's missing or unusable.

use crate::{keys::KeyMaterial, GistError};

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Where the key is kept when no other path is given.
pub const DEFAULT_KEY_FILE: &str = "config.json";

/// Environment variable that overrides the key file.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct KeyConfig {
    secret_key: String,
}

/// A JSON file holding the user's key.
#[derive(Clone, Debug)]
pub struct KeyFile {
    path: PathBuf,
}

impl Default for KeyFile {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_FILE)
    }
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the key. Fails if the file can't be read, isn't the expected JSON, or doesn't hold a
    /// valid key.
    pub fn load(&self) -> Result<KeyMaterial, GistError> {
        let mut text = fs::read_to_string(&self.path)?;
        let parsed = serde_json::from_str::<KeyConfig>(&text);
        text.zeroize();
        KeyMaterial::from_encoded(&parsed?.secret_key)
    }

    /// Write the key out, replacing whatever was there. On Unix the file is only readable by its
    /// owner.
    pub fn save(&self, key: &KeyMaterial) -> Result<(), GistError> {
        let config = KeyConfig { secret_key: key.encode() };
        let mut json = serde_json::to_string_pretty(&config)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        #[cfg(unix)]
        {
            // `mode` only applies to newly created files
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        let result = file.write_all(json.as_bytes()).and_then(|_| file.sync_all());
        json.zeroize();
        result?;

        debug!(path = %self.path.display(), stream_id = %key.stream_key().id(), "saved key file");
        Ok(())
    }

    /// Read the key, or generate and save a new one if the file is missing or unusable.
    pub fn load_or_generate<R>(&self, csprng: &mut R) -> Result<KeyMaterial, GistError>
    where
        R: CryptoRng + RngCore,
    {
        match self.load() {
            Ok(key) => {
                info!(path = %self.path.display(), stream_id = %key.stream_key().id(), "loaded key file");
                Ok(key)
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "key file unusable, generating a new key");
                let key = KeyMaterial::generate(csprng);
                self.save(&key)?;
                Ok(key)
            }
        }
    }

    /// Pick the key to start with. An `env_key` (normally the value of [`SECRET_KEY_ENV`]) wins
    /// over the file and must be valid; otherwise this falls back to
    /// [`load_or_generate`](Self::load_or_generate).
    pub fn resolve<R>(&self, env_key: Option<&str>, csprng: &mut R) -> Result<KeyMaterial, GistError>
    where
        R: CryptoRng + RngCore,
    {
        match env_key {
            Some(encoded) => {
                let key = KeyMaterial::from_encoded(encoded)?;
                info!(stream_id = %key.stream_key().id(), "using key from {}", SECRET_KEY_ENV);
                Ok(key)
            }
            None => self.load_or_generate(csprng),
        }
    }
}

/// Read [`SECRET_KEY_ENV`] from the process environment.
pub fn env_key() -> Option<String> {
    std::env::var(SECRET_KEY_ENV).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_file(dir: &tempfile::TempDir) -> KeyFile {
        KeyFile::new(dir.path().join(DEFAULT_KEY_FILE))
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        let mut csprng = rand::rngs::OsRng;
        let key = KeyMaterial::generate(&mut csprng);
        file.save(&key).unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["secret_key"], key.encode().as_str());

        assert_eq!(file.load().unwrap(), key);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        assert!(matches!(file.load(), Err(GistError::Io(_))));

        let mut csprng = rand::rngs::OsRng;
        let key = file.load_or_generate(&mut csprng).unwrap();
        assert!(file.path().exists());
        // Second start picks up the same key
        assert_eq!(file.load_or_generate(&mut csprng).unwrap(), key);
    }

    #[test]
    fn invalid_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        let mut csprng = rand::rngs::OsRng;

        fs::write(file.path(), "not json at all").unwrap();
        assert!(matches!(file.load(), Err(GistError::Config(_))));
        let key = file.load_or_generate(&mut csprng).unwrap();
        assert_eq!(file.load().unwrap(), key);

        fs::write(file.path(), r#"{ "secret_key": "c2hvcnQ=" }"#).unwrap();
        assert!(matches!(file.load(), Err(GistError::InvalidKeyEncoding(_))));
        let regenerated = file.load_or_generate(&mut csprng).unwrap();
        assert_ne!(regenerated, key);
        assert_eq!(file.load().unwrap(), regenerated);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        let mut csprng = rand::rngs::OsRng;
        let on_disk = file.load_or_generate(&mut csprng).unwrap();

        let from_env = KeyMaterial::generate(&mut csprng);
        let resolved = file.resolve(Some(&from_env.encode()), &mut csprng).unwrap();
        assert_eq!(resolved, from_env);
        // The file is left alone
        assert_eq!(file.load().unwrap(), on_disk);

        assert_eq!(file.resolve(None, &mut csprng).unwrap(), on_disk);
    }

    #[test]
    fn bad_env_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        let mut csprng = rand::rngs::OsRng;
        assert!(matches!(
            file.resolve(Some("not a key"), &mut csprng),
            Err(GistError::InvalidKeyEncoding(_))
        ));
        // No fallback to generating a file
        assert!(!file.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let file = key_file(&dir);
        fs::write(file.path(), "{}").unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();

        let mut csprng = rand::rngs::OsRng;
        file.save(&KeyMaterial::generate(&mut csprng)).unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
