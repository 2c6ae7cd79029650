//! Local per-device key-value persistence.
//!
//! The unlock set, streak record and achievement set all live here as
//! JSON blobs under deterministic keys. Local storage is the system of
//! record; a server-synced store only has to implement [`KvStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;

use crate::error::StorageError;

/// Byte-oriented key-value storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Write several keys as one unit: either all land or none do.
    ///
    /// The default writes one key at a time and is only correct for
    /// stores whose writes cannot fail halfway; stores that can should
    /// override it.
    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StorageError> {
        (**self).set_many(entries)
    }
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StorageError> {
        (**self).set_many(entries)
    }
}

/// Deterministic storage keys, namespaced by device.
pub mod keys {
    use crate::device::DeviceId;

    pub fn unlocks(device: &DeviceId) -> String {
        format!("worldping:{device}:unlocks")
    }

    pub fn streak(device: &DeviceId) -> String {
        format!("worldping:{device}:streak")
    }

    pub fn achievements(device: &DeviceId) -> String {
        format!("worldping:{device}:achievements")
    }
}

/// Read and decode a JSON value, treating anything unreadable as absent.
///
/// Corrupt bytes are logged and replaced by `T::default()`; callers never
/// see an error from this path.
pub fn load_json_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KvStore + ?Sized,
{
    match store.get(key) {
        Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "corrupt persisted state, reinitializing");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "unreadable persisted state, reinitializing");
            T::default()
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: Mutex<bool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full or revoked store would.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<(), StorageError> {
        if let Some((key, _)) = entries.first() {
            self.check_writable(key)?;
        }
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;

    #[test]
    fn memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        assert!(kv.get("a").unwrap().is_none());
        kv.set("a", b"hello").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn memory_kv_failing_writes_leave_state() {
        let kv = MemoryKv::new();
        kv.set("a", b"1").unwrap();
        kv.fail_writes(true);

        assert!(kv.set("a", b"2").is_err());
        assert!(kv
            .set_many(&[("a".into(), b"3".to_vec()), ("b".into(), b"4".to_vec())])
            .is_err());
        assert_eq!(kv.get("a").unwrap().as_deref(), Some(&b"1"[..]));
        assert!(kv.get("b").unwrap().is_none());
    }

    #[test]
    fn keys_are_namespaced_by_device() {
        let a = DeviceId::new("wp-a");
        let b = DeviceId::new("wp-b");
        assert_eq!(keys::streak(&a), "worldping:wp-a:streak");
        assert_ne!(keys::unlocks(&a), keys::unlocks(&b));
        assert_ne!(keys::streak(&a), keys::achievements(&a));
    }

    #[test]
    fn corrupt_json_loads_as_default() {
        let kv = MemoryKv::new();
        kv.set("k", b"{not json").unwrap();
        let loaded: Vec<String> = load_json_or_default(&kv, "k");
        assert!(loaded.is_empty());

        kv.set("k", br#"["x"]"#).unwrap();
        let loaded: Vec<String> = load_json_or_default(&kv, "k");
        assert_eq!(loaded, vec!["x".to_string()]);
    }
}
