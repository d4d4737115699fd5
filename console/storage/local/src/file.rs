use crate::{DurableStore, Key, Result};
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

/// A [`DurableStore`] backed by a single JSON object on disk.
///
/// The whole file is read once on open and rewritten on every change. Writes
/// go to a sibling temporary file that is then renamed over the original, so
/// a crash mid-write never leaves a truncated store behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Never held across await points.
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Discarding unreadable storage at {:?}: {}", path, err);
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!("Loaded {} stored entries from {:?}", entries.len(), path);
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Applies a change and swaps it in only once it has reached the disk.
    fn modify(&self, op: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut entries = self.entries.lock().expect("file store poisoned");
        let mut next = entries.clone();
        op(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: Key) -> Option<String> {
        self.entries
            .lock()
            .expect("file store poisoned")
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: Key, value: String) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.as_str().to_owned(), value);
        })
    }

    fn remove(&self, key: Key) -> Result<()> {
        self.modify(|entries| {
            entries.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<()> {
        self.modify(BTreeMap::clear)
    }
}
