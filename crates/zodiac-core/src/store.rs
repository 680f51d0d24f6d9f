//! Flat key/value substrate. Values are opaque text (JSON in practice); the
//! typed layer on top lives in `storage`.

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    kv: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.kv.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.kv.write().remove(key);
        Ok(())
    }
}

/// Single JSON document on disk, rewritten in full on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    kv: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create store dir {}", parent.display()))?;
            }
        }
        let kv = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read store {}", path.display()))?;
            match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(kv) => kv,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "store file is corrupt; starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = kv.len(), "store opened");
        Ok(Self {
            path,
            kv: RwLock::new(kv),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, kv: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).context("create staging file")?;
        serde_json::to_writer_pretty(&mut tmp, kv)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("persist store {}: {}", self.path.display(), e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.kv.write();
        let mut next = guard.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.kv.write();
        if !guard.contains_key(key) {
            return Ok(());
        }
        let mut next = guard.clone();
        next.remove(key);
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_put_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let store = FileStore::open(&path).unwrap();
            store.put("zodiac.likes", "{}").unwrap();
            store.put("other", "1").unwrap();
            store.remove("other").unwrap();
        }
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("zodiac.likes").unwrap().as_deref(), Some("{}"));
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn corrupt_store_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{not json").unwrap();
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        store.put("a", "b").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("a").unwrap().as_deref(), Some("b"));
    }
}
