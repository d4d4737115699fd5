use crate::{DurableStore, Key, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// A [`DurableStore`] that only lives as long as the process. Used for
/// ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore(Mutex<HashMap<&'static str, String>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(entries: impl IntoIterator<Item = (Key, String)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        Self(Mutex::new(map))
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().expect("memory store poisoned").is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: Key) -> Option<String> {
        self.0
            .lock()
            .expect("memory store poisoned")
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: Key, value: String) -> Result<()> {
        self.0
            .lock()
            .expect("memory store poisoned")
            .insert(key.as_str(), value);
        Ok(())
    }

    fn remove(&self, key: Key) -> Result<()> {
        self.0
            .lock()
            .expect("memory store poisoned")
            .remove(key.as_str());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.0.lock().expect("memory store poisoned").clear();
        Ok(())
    }
}
