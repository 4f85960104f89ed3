//! Blob store the gists are written to.
//!
//! The service only needs three calls from a gist host, captured by [`GistStore`]. Anything
//! reachable over the network implements it outside this crate; [`MemoryStore`] is a local
//! stand-in.

use crate::GistError;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// One entry of a user's gist listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistSummary {
    pub name: String,
    pub id: String,
}

/// Gist host
#[async_trait]
pub trait GistStore: Send + Sync {
    /// Create a gist holding a single file, returning the new gist's id.
    async fn store(&self, name: &str, content: &str) -> Result<String, GistError>;
    /// Content of the gist's file.
    async fn fetch(&self, id: &str) -> Result<String, GistError>;
    async fn list_for_user(&self) -> Result<Vec<GistSummary>, GistError>;
}

#[async_trait]
impl<S: GistStore + ?Sized> GistStore for Arc<S> {
    async fn store(&self, name: &str, content: &str) -> Result<String, GistError> {
        (**self).store(name, content).await
    }

    async fn fetch(&self, id: &str) -> Result<String, GistError> {
        (**self).fetch(id).await
    }

    async fn list_for_user(&self) -> Result<Vec<GistSummary>, GistError> {
        (**self).list_for_user().await
    }
}

struct StoredGist {
    name: String,
    content: String,
    // Insertion order, for listing newest first
    seq: u64,
}

#[derive(Default)]
struct Gists {
    by_id: HashMap<String, StoredGist>,
    next_seq: u64,
}

/// In-memory gist host. Ids look like GitHub's: 32 lowercase hex characters.
#[derive(Default)]
pub struct MemoryStore {
    gists: Mutex<Gists>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every call fails with [`StoreUnavailable`](GistError::StoreUnavailable).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Overwrite a gist's content in place, as anyone with write access to the host could.
    pub fn tamper(&self, id: &str, content: &str) -> Result<(), GistError> {
        let mut gists = self.gists.lock();
        let gist = gists.by_id.get_mut(id).ok_or_else(|| GistError::NotFound(id.to_owned()))?;
        gist.content = content.to_owned();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.gists.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<(), GistError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GistError::StoreUnavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn new_id() -> String {
        let mut raw = [0u8; 16];
        OsRng.fill_bytes(&mut raw);
        format!("{:032x}", u128::from_be_bytes(raw))
    }
}

#[async_trait]
impl GistStore for MemoryStore {
    async fn store(&self, name: &str, content: &str) -> Result<String, GistError> {
        self.check_online()?;
        let mut gists = self.gists.lock();
        gists.next_seq += 1;
        let seq = gists.next_seq;
        let id = loop {
            let id = Self::new_id();
            if !gists.by_id.contains_key(&id) {
                break id;
            }
        };
        gists.by_id.insert(
            id.clone(),
            StoredGist {
                name: name.to_owned(),
                content: content.to_owned(),
                seq,
            },
        );
        Ok(id)
    }

    async fn fetch(&self, id: &str) -> Result<String, GistError> {
        self.check_online()?;
        self.gists
            .lock()
            .by_id
            .get(id)
            .map(|gist| gist.content.clone())
            .ok_or_else(|| GistError::NotFound(id.to_owned()))
    }

    async fn list_for_user(&self) -> Result<Vec<GistSummary>, GistError> {
        self.check_online()?;
        let gists = self.gists.lock();
        let mut entries: Vec<(&String, &StoredGist)> = gists.by_id.iter().collect();
        entries.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));
        Ok(entries
            .into_iter()
            .map(|(id, gist)| GistSummary {
                name: gist.name.clone(),
                id: id.clone(),
            })
            .collect())
    }
}
