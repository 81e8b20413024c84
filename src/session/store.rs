use crate::error::Result;
use crate::types::User;
use log::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const USER_KEY: &str = "user";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key/value storage for the persisted session (user object and tokens).
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads the serialized user under [`USER_KEY`].
///
/// A missing or unparseable entry yields `None`; the latter is logged.
pub fn current_user(store: &dyn SessionStore) -> Option<User> {
    let raw = store.get(USER_KEY)?;
    match serde_json::from_str::<User>(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            error!("Error parsing user from session store: {}", e);
            None
        }
    }
}

pub fn current_user_id(store: &dyn SessionStore) -> Option<u64> {
    current_user(store).map(|user| user.id)
}

pub fn save_user(store: &dyn SessionStore, user: &User) -> Result<()> {
    let raw = serde_json::to_string(user)?;
    store.set(USER_KEY, &raw)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The file is read once on open and rewritten on every change. A missing
/// file is treated as an empty store and created on first write.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlumniError;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "alumni-connector-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_current_user_id_from_stored_user() {
        let store = MemorySessionStore::new();
        assert_eq!(current_user_id(&store), None);

        store
            .set(USER_KEY, r#"{"id": 42, "email": "ada@example.edu"}"#)
            .unwrap();
        assert_eq!(current_user_id(&store), Some(42));
    }

    #[test]
    fn test_unparseable_user_yields_none() {
        let store = MemorySessionStore::new();
        store.set(USER_KEY, "{not json").unwrap();
        assert_eq!(current_user_id(&store), None);

        store.set(USER_KEY, r#"{"email": "no-id@example.edu"}"#).unwrap();
        assert_eq!(current_user_id(&store), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_path("round-trip");
        let _ = fs::remove_file(&path);

        {
            let store = FileSessionStore::open(&path).unwrap();
            assert!(store.get(ACCESS_TOKEN_KEY).is_none());
            store.set(ACCESS_TOKEN_KEY, "token-abc").unwrap();
            store.set(USER_KEY, r#"{"id":5}"#).unwrap();
        }

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("token-abc"));
        assert_eq!(current_user_id(&reopened), Some(5));

        reopened.remove(ACCESS_TOKEN_KEY).unwrap();
        let again = FileSessionStore::open(&path).unwrap();
        assert!(again.get(ACCESS_TOKEN_KEY).is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        // A regular file where the parent directory should be makes every write fail
        let blocker = temp_path("blocker");
        fs::write(&blocker, "").unwrap();
        let store = FileSessionStore::open(blocker.join("session.json")).unwrap();

        let result = store.set(ACCESS_TOKEN_KEY, "token-abc");
        assert!(matches!(result, Err(AlumniError::IoError(_))));
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());

        let _ = fs::remove_file(&blocker);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let path = temp_path("corrupt");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let result = FileSessionStore::open(&path);
        assert!(matches!(result, Err(AlumniError::SerdeError(_))));
        let _ = fs::remove_file(&path);
    }
}
