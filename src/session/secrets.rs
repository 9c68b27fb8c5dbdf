//! Committed Secret Storage
//!
//! The `{choice, nonce}` pair is the only client-side secret in the whole
//! protocol. It is written at commit time, read at reveal time, and purged
//! only after the ledger confirms the reveal. Losing it before reveal leaves
//! the player unable to prove their choice — an unrecoverable local
//! data-loss condition, not a protocol fault — which is why the default
//! store is file-backed and scoped by `(session, round, player)` so it
//! survives a process restart between commit and reveal.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::catalog::variant::{Choice, GameVariant};
use crate::session::state::{PlayerAddr, SessionId};

/// Scope of one committed secret.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SecretKey {
    /// Session the commitment belongs to.
    pub session: SessionId,
    /// Round the commitment belongs to.
    pub round: u32,
    /// The committing player.
    pub player: PlayerAddr,
}

impl SecretKey {
    fn file_name(&self) -> String {
        format!("{}-{}-{}.json", self.session, self.round, self.player)
    }
}

/// The secret behind one commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSecret {
    /// Variant the choice was validated against.
    pub variant: GameVariant,
    /// The hidden choice.
    pub choice: Choice,
    /// The blinding nonce.
    pub nonce: u64,
    /// The digest that was submitted, kept for local re-verification.
    pub digest_hex: String,
}

/// Secret storage failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// Filesystem failure.
    #[error("secret storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record does not parse; treated as corruption, not absence.
    #[error("secret record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable storage for committed secrets.
pub trait SecretStore: Send + Sync {
    /// Store a secret. Overwrites any record under the same key; the
    /// controller guards against clobbering a live commitment.
    fn put(&self, key: &SecretKey, secret: &RoundSecret) -> Result<(), SecretStoreError>;

    /// Load a secret, `None` if absent.
    fn get(&self, key: &SecretKey) -> Result<Option<RoundSecret>, SecretStoreError>;

    /// Purge a secret. Removing an absent key is not an error.
    fn remove(&self, key: &SecretKey) -> Result<(), SecretStoreError>;
}

/// One JSON file per secret under a directory.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SecretStoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &SecretKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl SecretStore for FileSecretStore {
    fn put(&self, key: &SecretKey, secret: &RoundSecret) -> Result<(), SecretStoreError> {
        let bytes = serde_json::to_vec(secret)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn get(&self, key: &SecretKey) -> Result<Option<RoundSecret>, SecretStoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &SecretKey) -> Result<(), SecretStoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and throwaway sessions. Offers none of the
/// restart durability the protocol wants from a real client.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<BTreeMap<SecretKey, RoundSecret>>,
}

impl MemorySecretStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn put(&self, key: &SecretKey, secret: &RoundSecret) -> Result<(), SecretStoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.clone(), secret.clone());
        Ok(())
    }

    fn get(&self, key: &SecretKey) -> Result<Option<RoundSecret>, SecretStoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn remove(&self, key: &SecretKey) -> Result<(), SecretStoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(round: u32) -> SecretKey {
        SecretKey {
            session: 7,
            round,
            player: PlayerAddr::from("alice"),
        }
    }

    fn secret() -> RoundSecret {
        RoundSecret {
            variant: GameVariant::Dilemma,
            choice: Choice::Symbol("cooperate".into()),
            nonce: 42,
            digest_hex: "ab".repeat(32),
        }
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get(&key(1)).unwrap(), None);
        store.put(&key(1), &secret()).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), Some(secret()));
        store.remove(&key(1)).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), None);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::open(dir.path()).unwrap();
        store.put(&key(1), &secret()).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), Some(secret()));
        assert_eq!(store.get(&key(2)).unwrap(), None);
        store.remove(&key(1)).unwrap();
        assert_eq!(store.get(&key(1)).unwrap(), None);
        // removing again is not an error
        store.remove(&key(1)).unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileSecretStore::open(dir.path()).unwrap();
            store.put(&key(3), &secret()).unwrap();
        }
        // a new process would reopen the same directory
        let reopened = FileSecretStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&key(3)).unwrap(), Some(secret()));
    }

    #[test]
    fn test_corrupt_record_is_distinguished_from_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join(key(1).file_name()), b"not json").unwrap();
        assert!(matches!(
            store.get(&key(1)),
            Err(SecretStoreError::Corrupt(_))
        ));
    }
}
