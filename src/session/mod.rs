use anyhow::{Context, Result};
use fs_err as fs;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const PROJECT_INFO: &str = "projectInfo";
pub const CHANGE_REQUEST: &str = "changeRequest";

/// Session-scoped key/value storage. Values are raw JSON text so a reader can
/// tell "absent" apart from "present but unreadable".
pub trait SessionStore: Send + Sync {
    fn id(&self) -> Uuid;
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Serialize `value` and store it under `key`.
pub fn put_json<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw)
}

/// Read and parse the value under `key`. Malformed JSON reads as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(key, error = %e, "ignoring malformed session value");
            None
        }
    }
}

/// Lives as long as the process.
pub struct MemorySession {
    id: Uuid,
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), values: Mutex::new(BTreeMap::new()) }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}

/// Session kept in a single JSON file so one-shot commands can hand state to
/// each other. Every write rewrites the whole file through a temp file.
pub struct FileSession {
    id: Uuid,
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSession {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let text = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "session file unreadable; starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { id: Uuid::new_v4(), path, values: Mutex::new(values) })
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let tmp = NamedTempFile::new_in(&dir)?;
        fs::write(tmp.path(), serde_json::to_string_pretty(values)?)?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to write session file {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionStore for FileSession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut values = self.values.lock();
        values.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        n: u32,
    }

    #[test]
    fn memory_roundtrip_and_clear() {
        let s = MemorySession::new();
        put_json(&s, "k", &Probe { n: 7 }).unwrap();
        assert_eq!(get_json::<Probe>(&s, "k"), Some(Probe { n: 7 }));
        s.clear().unwrap();
        assert_eq!(s.get("k"), None);
    }

    #[test]
    fn malformed_value_reads_as_absent() {
        let s = MemorySession::new();
        s.set("k", "{not json".into()).unwrap();
        assert!(s.get("k").is_some());
        assert_eq!(get_json::<Probe>(&s, "k"), None);
    }

    #[test]
    fn file_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let s = FileSession::open(&path).unwrap();
        put_json(&s, PROJECT_INFO, &Probe { n: 1 }).unwrap();
        drop(s);

        let again = FileSession::open(&path).unwrap();
        assert_eq!(get_json::<Probe>(&again, PROJECT_INFO), Some(Probe { n: 1 }));

        again.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn garbage_session_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "][").unwrap();
        let s = FileSession::open(&path).unwrap();
        assert_eq!(s.get(PROJECT_INFO), None);
    }
}
