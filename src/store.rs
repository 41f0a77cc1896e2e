use crate::overlay::default_labels;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Key under which the whole mapping is persisted.
pub const STORAGE_KEY: &str = "controller-labels";

pub type LabelMap = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing `{key}` ({size} bytes, limit {limit})")]
    QuotaExceeded { key: String, size: usize, limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable string key/value storage.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: Storage + ?Sized> Storage for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-process storage with an optional per-value size limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(limit),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota
            && value.len() > limit
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size: value.len(),
                limit,
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.dir.is_file() {
            return Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

fn load_from<S: Storage>(storage: &S, defaults: &LabelMap) -> LabelMap {
    let raw = match storage.get(STORAGE_KEY) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => return defaults.clone(),
        Err(err) => {
            warn!(error = %err, "error loading labels from storage");
            return defaults.clone();
        }
    };
    match serde_json::from_str::<LabelMap>(&raw) {
        Ok(map) => map,
        Err(err) => {
            warn!(error = %err, "stored labels are not a valid mapping, using defaults");
            defaults.clone()
        }
    }
}

fn save_to<S: Storage>(storage: &mut S, map: &LabelMap) {
    let serialized = match serde_json::to_string(map) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!(error = %err, "error serializing labels");
            return;
        }
    };
    if let Err(err) = storage.set(STORAGE_KEY, &serialized) {
        warn!(error = %err, "error saving labels to storage");
    }
}

/// The in-memory label mapping, kept in sync with its storage.
#[derive(Debug)]
pub struct LabelStore<S: Storage> {
    storage: S,
    defaults: LabelMap,
    current: LabelMap,
}

impl<S: Storage> LabelStore<S> {
    /// Opens the store with the built-in controller defaults.
    pub fn new(storage: S) -> Self {
        Self::with_defaults(storage, default_labels())
    }

    pub fn with_defaults(storage: S, defaults: LabelMap) -> Self {
        let current = load_from(&storage, &defaults);
        debug!(labels = current.len(), "label store opened");
        Self {
            storage,
            defaults,
            current,
        }
    }

    /// Reads the persisted mapping, or the defaults when it is missing or
    /// unreadable.
    pub fn load(&self) -> LabelMap {
        load_from(&self.storage, &self.defaults)
    }

    /// Persists `map` as-is. Failures are logged.
    pub fn save(&mut self, map: &LabelMap) {
        save_to(&mut self.storage, map);
    }

    /// Records a text edit and persists the whole mapping immediately.
    pub fn set_text(&mut self, id: &str, text: &str) {
        self.current.insert(id.to_string(), text.to_string());
        save_to(&mut self.storage, &self.current);
    }

    /// Replaces the mapping with a fresh copy of the defaults and persists it.
    /// Views refresh through [`LabelStore::default_text`].
    pub fn reset_to_defaults(&mut self) {
        self.current = self.defaults.clone();
        save_to(&mut self.storage, &self.current);
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.current.get(id).map(String::as_str)
    }

    pub fn default_text(&self, id: &str) -> Option<&str> {
        self.defaults.get(id).map(String::as_str)
    }

    pub fn snapshot(&self) -> LabelMap {
        self.current.clone()
    }

    pub fn defaults(&self) -> &LabelMap {
        &self.defaults
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn custom_map() -> LabelMap {
        let mut map = LabelMap::new();
        map.insert("aButton".to_string(), "Jump".to_string());
        map.insert("bButton".to_string(), "Crouch & \"roll\"".to_string());
        map.insert("xButton".to_string(), String::new());
        map
    }

    #[test]
    fn empty_storage_loads_defaults() {
        let store = LabelStore::new(MemoryStorage::new());
        assert_eq!(store.load(), default_labels());
        assert_eq!(store.snapshot(), default_labels());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = LabelStore::new(MemoryStorage::new());
        let map = custom_map();
        store.save(&map);
        assert_eq!(store.load(), map);
    }

    #[test]
    fn broken_storage_falls_back_to_defaults() {
        let mut store = LabelStore::new(BrokenStorage);
        assert_eq!(store.load(), default_labels());
        store.set_text("aButton", "Jump");
        assert_eq!(store.text("aButton"), Some("Jump"));
        assert_eq!(store.load(), default_labels());
    }

    #[test]
    fn unparseable_data_falls_back_to_defaults() {
        for raw in ["{not json", "[1, 2, 3]", "{\"aButton\": 7}", "null", "   "] {
            let mut storage = MemoryStorage::new();
            storage.insert_raw(STORAGE_KEY, raw);
            let store = LabelStore::new(storage);
            assert_eq!(store.load(), default_labels(), "raw value {raw:?}");
        }
    }

    #[test]
    fn every_edit_is_persisted() {
        let mut store = LabelStore::new(MemoryStorage::new());
        store.set_text("dpad", "Move");
        let raw = store.storage().raw(STORAGE_KEY).unwrap();
        let persisted: LabelMap = serde_json::from_str(raw).unwrap();
        assert_eq!(persisted.get("dpad").map(String::as_str), Some("Move"));
        assert_eq!(persisted.len(), default_labels().len());
    }

    #[test]
    fn quota_failure_keeps_in_memory_text() {
        let mut store = LabelStore::new(MemoryStorage::with_quota(16));
        store.set_text("aButton", "Jump");
        assert_eq!(store.text("aButton"), Some("Jump"));
        assert!(store.storage().raw(STORAGE_KEY).is_none());
    }

    #[test]
    fn reset_restores_every_default() {
        let mut store = LabelStore::new(MemoryStorage::new());
        store.save(&custom_map());
        for (id, _) in custom_map() {
            store.set_text(&id, "edited");
        }
        store.reset_to_defaults();
        let loaded = store.load();
        for (id, text) in default_labels() {
            assert_eq!(loaded.get(&id), Some(&text));
        }
        assert_eq!(store.snapshot(), default_labels());
    }

    #[test]
    fn file_storage_round_trips_and_reports_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("state"));
        assert!(storage.get(STORAGE_KEY).unwrap().is_none());
        storage.set(STORAGE_KEY, "{}").unwrap();
        assert_eq!(storage.get(STORAGE_KEY).unwrap().as_deref(), Some("{}"));

        let mut store = LabelStore::new(storage);
        store.set_text("yButton", "Swap");
        let reopened = LabelStore::new(FileStorage::new(dir.path().join("state")));
        assert_eq!(reopened.text("yButton"), Some("Swap"));
    }

    #[test]
    fn file_storage_over_a_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut storage = FileStorage::new(&blocker);
        assert!(matches!(
            storage.set(STORAGE_KEY, "{}"),
            Err(StorageError::Unavailable(_))
        ));
    }
}
