use crate::domain::ports::KeyValueStore;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// In-memory store, mostly for tests and one-shot CLI runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk; every `set` rewrites the file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let data = fs::read(&path)?;
            serde_json::from_slice(&data)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.values)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("geometry.json");

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.get("vcpu-current").is_none());
        store.set("vcpu-current", "12").unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("vcpu-current").as_deref(), Some("12"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geometry.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileStore::open(&path).is_err());
    }
}
