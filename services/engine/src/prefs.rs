//! Non-critical UI preference store.
//!
//! A flat key/value JSON file — the only thing this engine ever persists.
//! Nothing financial lives here; a corrupt or missing file degrades to
//! defaults with a log line, never an error surfaced to the user.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Key for the last chain the user selected.
pub const PREF_ACTIVE_CHAIN: &str = "active_chain";

pub struct PreferenceStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl PreferenceStore {
    /// Open the store at `path`, loading existing values if present.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(error) => {
                    warn!(path = %path.display(), %error, "preference file corrupt; starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), entries = values.len(), "preference store opened");
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Set and persist. The file is rewritten whole via a temp-file rename,
    /// so a crash mid-write leaves the previous contents intact.
    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let snapshot = {
            let mut values = self.values.lock();
            values.insert(key.to_string(), value.to_string());
            values.clone()
        };
        self.persist(&snapshot)
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let snapshot = {
            let mut values = self.values.lock();
            values.remove(key);
            values.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, values: &HashMap<String, String>) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let store = PreferenceStore::open(&path);
        assert_eq!(store.get(PREF_ACTIVE_CHAIN), None);
        store.set(PREF_ACTIVE_CHAIN, "0x89").unwrap();
        store.set("theme", "dark").unwrap();
        drop(store);

        let reopened = PreferenceStore::open(&path);
        assert_eq!(reopened.get(PREF_ACTIVE_CHAIN).as_deref(), Some("0x89"));
        assert_eq!(reopened.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn remove_deletes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::open(&path);
        store.set("theme", "dark").unwrap();
        store.remove("theme").unwrap();
        drop(store);
        assert_eq!(PreferenceStore::open(&path).get("theme"), None);
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = PreferenceStore::open(&path);
        assert_eq!(store.get("anything"), None);
        store.set("k", "v").unwrap();
        assert_eq!(PreferenceStore::open(&path).get("k").as_deref(), Some("v"));
    }
}
