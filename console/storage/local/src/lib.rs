mod file;
mod keys;
mod memory;

pub use self::file::FileStore;
pub use self::keys::Key;
pub use self::memory::MemoryStore;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub type Result<T> = core::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {:?}", .0)]
    Io(#[from] std::io::Error),
    #[error("Storage JSON error: {:?}", .0)]
    Json(#[from] serde_json::Error),
}

/// A string key/value store that outlives the running process.
///
/// Implementations are expected to be cheap to read from. Writes are
/// persisted before returning.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: Key) -> Option<String>;
    fn set(&self, key: Key, value: String) -> Result<()>;
    fn remove(&self, key: Key) -> Result<()>;

    /// Removes every entry, including keys this crate does not know about.
    fn clear(&self) -> Result<()>;
}

pub fn init(path: impl AsRef<Path>) -> Result<FileStore> {
    debug!("Opening durable storage at {:?}", path.as_ref());
    FileStore::open(path)
}
