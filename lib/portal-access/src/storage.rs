//! Durable key/value storage for session state.
//!
//! The session manager persists the member, the bearer token, the school list
//! and the member's chosen school under fixed keys. Any store that survives a
//! restart can back it; `FileStorage` keeps a JSON map on disk and
//! `MemoryStorage` is used in tests and for ephemeral runs.
//!
//! Storage is accessed from a single owner only, so implementations take
//! `&mut self` for writes and do no locking.

use rootcause::Report;
use seed_portal_core::UserId;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StorageError;

/// Storage keys used by the session manager.
pub mod keys {
    use seed_portal_core::UserId;

    /// Serialized member record (never contains the token).
    pub const USER: &str = "portal_user";
    /// Bearer token string.
    pub const TOKEN: &str = "portal_token";
    /// Serialized school list.
    pub const ORGANIZATIONS: &str = "portal_schools";

    /// Key of the chosen school, scoped to one member so that choices never
    /// leak between accounts sharing a device.
    #[must_use]
    pub fn current_organization(user_id: &UserId) -> String {
        format!("current_organization_id:{user_id}")
    }
}

/// A durable string key/value store.
pub trait SessionStorage {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>>;

    /// Writes a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Report<StorageError>>;

    /// Removes a value. Removing a missing key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), Report<StorageError>>;

    /// Removes several values, logging failures instead of returning them.
    fn remove_all(&mut self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.remove(key) {
                warn!(key, error = %e, "failed to remove stored value");
            }
        }
    }

    /// Reads the persisted school choice for a member.
    fn current_organization(
        &self,
        user_id: &UserId,
    ) -> Result<Option<String>, Report<StorageError>> {
        self.get(&keys::current_organization(user_id))
    }
}

/// In-memory storage. Contents are lost when the value is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Report<StorageError>> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON file.
///
/// The whole map is rewritten on every change. On Unix the file is created
/// with mode 0600 since it holds the bearer token.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the store at `path`, creating nothing until the first write.
    ///
    /// An unreadable or corrupted file is treated as empty; the next write
    /// replaces it.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding corrupted session file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read session file");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, key: &str) -> Result<(), Report<StorageError>> {
        let write_error = |reason: String| StorageError::Write {
            key: key.to_string(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;

        let contents =
            serde_json::to_string_pretty(&self.entries).map_err(|e| write_error(e.to_string()))?;

        // Written beside the target, then renamed over it.
        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| write_error(e.to_string()))?;
        std::io::Write::write_all(&mut file, contents.as_bytes())
            .map_err(|e| write_error(e.to_string()))?;
        file.as_file()
            .sync_all()
            .map_err(|e| write_error(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| write_error(e.to_string()))?;
        }
        file.persist(&self.path)
            .map_err(|e| write_error(e.error.to_string()))?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush(key)
    }

    fn remove(&mut self, key: &str) -> Result<(), Report<StorageError>> {
        if self.entries.remove(key).is_some() {
            self.flush(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_organization_key_is_per_user() {
        let alice = UserId::new("alice").expect("valid id");
        let bob = UserId::new("bob").expect("valid id");
        assert_ne!(
            keys::current_organization(&alice),
            keys::current_organization(&bob)
        );
        assert_eq!(
            keys::current_organization(&alice),
            "current_organization_id:alice"
        );
    }

    #[test]
    fn memory_storage_set_get_remove() {
        let mut storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "abc").expect("set");
        assert_eq!(storage.get(keys::TOKEN).expect("get"), Some("abc".to_string()));
        storage.remove(keys::TOKEN).expect("remove");
        storage.remove(keys::TOKEN).expect("second remove");
        assert!(storage.is_empty());
    }

    #[test]
    fn remove_all_clears_listed_keys_only() {
        let mut storage = MemoryStorage::new();
        storage.set(keys::USER, "{}").expect("set");
        storage.set(keys::TOKEN, "abc").expect("set");
        storage.set("unrelated", "x").expect("set");
        storage.remove_all(&[keys::USER, keys::TOKEN, keys::ORGANIZATIONS]);
        assert_eq!(storage.keys(), vec!["unrelated"]);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        let mut storage = FileStorage::open(&path);
        storage.set(keys::TOKEN, "abc").expect("set");
        storage.set(keys::USER, r#"{"id":"1"}"#).expect("set");
        storage.remove(keys::USER).expect("remove");

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get(keys::TOKEN).expect("get"), Some("abc".to_string()));
        assert_eq!(reopened.get(keys::USER).expect("get"), None);
    }

    #[test]
    fn file_storage_ignores_corrupted_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").expect("write");

        let mut storage = FileStorage::open(&path);
        assert_eq!(storage.get(keys::TOKEN).expect("get"), None);
        storage.set(keys::TOKEN, "fresh").expect("set");

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get(keys::TOKEN).expect("get"), Some("fresh".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let mut storage = FileStorage::open(&path);
        storage.set(keys::TOKEN, "abc").expect("set");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).expect("chmod");

        let mut storage = FileStorage::open(&path);
        storage.set(keys::TOKEN, "abc").expect("set");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_storage_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let mut storage = FileStorage::open(&path);
        storage.set(keys::TOKEN, "abc").expect("set");
        storage.set(keys::USER, "{}").expect("set");
        storage.remove(keys::TOKEN).expect("remove");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }
}
