use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use thiserror::Error;
use tracing::warn;

/// Storage key of the access token.
pub const TOKEN_KEY: &str = "authToken";

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Persists the single access token between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Key/value JSON file, e.g. `<data dir>/storage.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the application data directory.
    pub fn in_data_dir() -> Self {
        Self::new(utils::assets::data_dir().join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, TokenStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match self.read_map() {
            Ok(mut map) => map.remove(TOKEN_KEY),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable token storage");
                None
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut map = self.read_map().unwrap_or_default();
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.load(), None);
        store.save("abc.def.ghi").unwrap();
        assert_eq!(FileTokenStore::new(&path).load().as_deref(), Some("abc.def.ghi"));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
        let raw: HashMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert_eq!(store.load(), None);
        store.save("t").unwrap();
        assert_eq!(store.load().as_deref(), Some("t"));
    }

    #[test]
    fn memory_store() {
        let store = MemoryTokenStore::with_token("x");
        assert_eq!(store.load().as_deref(), Some("x"));
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }
}
