//! Persistent string key/value storage.
//!
//! Mirrors the browser `localStorage` contract (get/set/remove by key) so the
//! planner state can live in the browser, in a JSON file, or in memory.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(not(target_arch = "wasm32"))]
mod file;
pub mod keys;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Unavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "storage unavailable"),
            StorageError::Corrupt(msg) => write!(f, "storage corrupt: {msg}"),
            StorageError::Io(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns `true` if the key existed.
    fn remove(&mut self, key: &str) -> Result<bool, StorageError>;
}

/// Reads and decodes a JSON value. Missing and blank keys read as `None`.
pub fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupt(format!("{key}: {e}")))
}

pub fn set_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Io(e.to_string()))?;
    store.set(key, &raw)
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(|k| k.as_str())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{KvStore, StorageError};

    /// `window.localStorage`, optionally namespaced with a key prefix.
    #[derive(Debug)]
    pub struct LocalStorageStore {
        key_prefix: String,
    }

    impl LocalStorageStore {
        pub fn new(key_prefix: impl Into<String>) -> Result<Self, StorageError> {
            // Fail early instead of on first access.
            window_local_storage()?;
            Ok(Self {
                key_prefix: key_prefix.into(),
            })
        }

        fn full_key(&self, key: &str) -> String {
            format!("{}{}", self.key_prefix, key)
        }
    }

    impl KvStore for LocalStorageStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            window_local_storage()?
                .get_item(&self.full_key(key))
                .map_err(|e| StorageError::Io(format!("get_item({key}) failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            window_local_storage()?
                .set_item(&self.full_key(key), value)
                .map_err(|e| StorageError::Io(format!("set_item({key}) failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<bool, StorageError> {
            let storage = window_local_storage()?;
            let full = self.full_key(key);
            let existed = storage
                .get_item(&full)
                .map_err(|e| StorageError::Io(format!("get_item({key}) failed: {:?}", e)))?
                .is_some();
            storage
                .remove_item(&full)
                .map_err(|e| StorageError::Io(format!("remove_item({key}) failed: {:?}", e)))?;
            Ok(existed)
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, StorageError> {
        let win = web_sys::window().ok_or(StorageError::Unavailable)?;
        win.local_storage()
            .map_err(|e| StorageError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(StorageError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageStore {
    pub fn new(_key_prefix: impl Into<String>) -> Result<Self, StorageError> {
        Err(StorageError::Unavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KvStore for LocalStorageStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::{KvStore, MemoryStore, StorageError, get_json, set_json};
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_store_get_set_remove() {
        let mut s = MemoryStore::new();
        assert_eq!(s.get("a").unwrap(), None);
        s.set("a", "1").unwrap();
        assert_eq!(s.get("a").unwrap(), Some("1".to_string()));
        assert!(s.remove("a").unwrap());
        assert!(!s.remove("a").unwrap());
    }

    #[test]
    fn json_helpers_round_trip_and_treat_blank_as_missing() {
        let mut s = MemoryStore::new();
        set_json(&mut s, "v", &vec![1, 2, 3]).unwrap();
        let v: Option<Vec<i32>> = get_json(&s, "v").unwrap();
        assert_eq!(v, Some(vec![1, 2, 3]));

        s.set("blank", "  ").unwrap();
        let v: Option<Vec<i32>> = get_json(&s, "blank").unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn corrupt_json_is_reported() {
        let mut s = MemoryStore::new();
        s.set("v", "{not json").unwrap();
        let err = get_json::<Vec<i32>, _>(&s, "v").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn local_storage_is_unavailable_off_the_web() {
        assert_eq!(
            super::LocalStorageStore::new("planner.").unwrap_err(),
            StorageError::Unavailable
        );
    }
}
