use {
    crate::{
        config::{PERSISTENCE, storage_key},
        utils::lock,
    },
    std::{
        collections::BTreeMap,
        fs::{self, File},
        io::{BufReader, BufWriter, Write},
        path::{Path, PathBuf},
        sync::Mutex,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Values the client persists between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    User,
    Theme,
}

impl StorageKey {
    /// Keys owned by the session. Cleared on logout; the theme survives.
    pub const SESSION: [StorageKey; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AccessToken => PERSISTENCE.keys.access_token,
            Self::RefreshToken => PERSISTENCE.keys.refresh_token,
            Self::User => PERSISTENCE.keys.user,
            Self::Theme => PERSISTENCE.keys.theme,
        }
    }

    /// Namespaced key as written to the backing store.
    pub fn qualified(&self) -> String {
        storage_key(self.name())
    }
}

/// Durable key-value storage for credentials and preferences.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Option<String>;
    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: StorageKey) -> Result<(), StoreError>;

    fn clear_session(&self) -> Result<(), StoreError> {
        for key in StorageKey::SESSION {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Keeps everything in a single JSON object on disk, rewritten on every change.
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            match serde_json::from_reader(reader) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!(
                        "Session file {} is unreadable ({}). Starting with an empty store.",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
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

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        lock(&self.entries).get(&key.qualified()).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.qualified(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        if entries.remove(&key.qualified()).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the raw (namespaced) contents.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        lock(&self.entries).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        lock(&self.entries).get(&key.qualified()).cloned()
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.qualified(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        lock(&self.entries).remove(&key.qualified());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "procurelens-store-{}-{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn keys_are_namespaced() {
        let store = MemoryTokenStore::new();
        store.set(StorageKey::AccessToken, "abc").unwrap();
        assert_eq!(
            store.snapshot().get("procurelens_access_token"),
            Some(&"abc".to_string())
        );
    }

    #[test]
    fn clear_session_keeps_the_theme() {
        let store = MemoryTokenStore::new();
        for key in StorageKey::SESSION {
            store.set(key, "value").unwrap();
        }
        store.set(StorageKey::Theme, "dark").unwrap();

        store.clear_session().unwrap();

        assert_eq!(store.get(StorageKey::AccessToken), None);
        assert_eq!(store.get(StorageKey::RefreshToken), None);
        assert_eq!(store.get(StorageKey::User), None);
        assert_eq!(store.get(StorageKey::Theme), Some("dark".to_string()));
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = scratch_path("reopen");
        let _ = fs::remove_file(&path);

        let store = FileTokenStore::open(&path).unwrap();
        store.set(StorageKey::RefreshToken, "refresh-1").unwrap();
        drop(store);

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(StorageKey::RefreshToken),
            Some("refresh-1".to_string())
        );
        reopened.remove(StorageKey::RefreshToken).unwrap();
        assert_eq!(reopened.get(StorageKey::RefreshToken), None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = scratch_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let store = FileTokenStore::open(&path).unwrap();
        assert_eq!(store.get(StorageKey::AccessToken), None);

        let _ = fs::remove_file(&path);
    }
}
