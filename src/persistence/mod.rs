//! Persistence for the energy record
//!
//! Features:
//! - Versioned storage key, JSON record (`count`, `stability`, `nextRecoverTime`)
//! - Narrow key-value trait so the medium is swappable
//! - Change notifications for writes made by other instances (tabs)
//! - Backends: in-memory multi-tab, file (native), LocalStorage (wasm)

pub mod memory;
pub mod record;

#[cfg(not(target_arch = "wasm32"))]
pub mod file;

#[cfg(target_arch = "wasm32")]
pub mod local;

pub use memory::{MemoryStorage, MemorySubscription};
pub use record::{EnergyRecord, read_record, write_record};

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local::{LocalStorage, StorageListener};

/// Storage medium failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure reading or writing the energy record
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("corrupt energy record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A persisted string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Callback receiving the key written by another instance.
/// `None` means the whole store was cleared.
pub type ChangeListener = Box<dyn FnMut(Option<&str>)>;

/// Storage that reports writes made by *other* instances.
///
/// The returned subscription unsubscribes when dropped.
pub trait ChangeNotifier {
    type Subscription;

    fn subscribe(&self, listener: ChangeListener) -> Self::Subscription;
}
