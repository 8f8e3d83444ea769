//! Browser LocalStorage backend (WASM only)

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{StorageEvent, Window};

use super::{ChangeListener, ChangeNotifier, KeyValueStore, StorageError};

/// `window.localStorage`
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open LocalStorage for the current window
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }
}

/// `storage` event listener on the window; removed when dropped
pub struct StorageListener {
    window: Option<Window>,
    closure: Closure<dyn FnMut(StorageEvent)>,
}

impl Drop for StorageListener {
    fn drop(&mut self) {
        if let Some(window) = &self.window {
            if window
                .remove_event_listener_with_callback("storage", self.closure.as_ref().unchecked_ref())
                .is_err()
            {
                log::warn!("Failed to unsubscribe from storage events");
            }
        }
    }
}

impl ChangeNotifier for LocalStorage {
    type Subscription = StorageListener;

    // The browser only fires `storage` in tabs other than the writer
    fn subscribe(&self, mut listener: ChangeListener) -> StorageListener {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: StorageEvent| {
            listener(event.key().as_deref());
        });

        let window = web_sys::window();
        match &window {
            Some(window) => {
                if window
                    .add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref())
                    .is_err()
                {
                    log::warn!("Failed to subscribe to storage events");
                }
            }
            None => log::warn!("No window, cross-tab sync disabled"),
        }

        StorageListener { window, closure }
    }
}
