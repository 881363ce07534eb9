use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing::warn;

/// String key/value backing for small pieces of local state.
///
/// `set` and `remove` only touch the in-memory view; `save` makes the
/// current view durable.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn save(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryKv {
    data: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.remove(key);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// JSON object file, rewritten atomically on `save`.
pub struct JsonFileKv {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl JsonFileKv {
    /// Loads `path` if it exists. A corrupt file is logged and treated as empty
    /// so the next save replaces it.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(
                        target: "homebox",
                        event = "kv_file_corrupt",
                        path = %path.display(),
                        error = %err
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", path.display()));
            }
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileKv {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .map(|guard| guard.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.data.lock() {
            guard.remove(key);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        let snapshot = {
            let guard = self
                .data
                .lock()
                .map_err(|_| anyhow::anyhow!("kv state poisoned"))?;
            serde_json::to_vec_pretty(&*guard)?
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("temp file in {}", dir.display()))?;
        tmp.write_all(&snapshot)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct KvHandle {
    inner: Arc<dyn KeyValueStore>,
}

impl KvHandle {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner: store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKv::default()))
    }

    pub fn json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(JsonFileKv::open(path)?)))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn set(&self, key: &str, value: &str) {
        self.inner.set(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn persist(&self) -> anyhow::Result<()> {
        self.inner.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let kv = KvHandle::in_memory();
        assert_eq!(kv.get("k"), None);
        kv.set("k", "v");
        assert_eq!(kv.get("k").as_deref(), Some("v"));
        kv.remove("k");
        assert_eq!(kv.get("k"), None);
    }

    #[test]
    fn json_file_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state").join("kv.json");

        let kv = KvHandle::json_file(&path).expect("open");
        kv.set("searchHistory", "[]");
        kv.persist().expect("save");

        let reopened = KvHandle::json_file(&path).expect("reopen");
        assert_eq!(reopened.get("searchHistory").as_deref(), Some("[]"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kv.json");
        std::fs::write(&path, b"{not json").expect("write");

        let kv = JsonFileKv::open(&path).expect("open");
        assert_eq!(kv.get("anything"), None);
        kv.set("a", "b");
        kv.save().expect("save overwrites");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"a\""));
    }
}
