//! In-memory storage shared by several tabs
//!
//! Mirrors browser LocalStorage semantics: every tab sees the same values,
//! and a write queues a change event on every *other* tab that is listening.
//! Events are delivered when that tab calls
//! [`MemoryStorage::dispatch_events`], never re-entrantly inside the writer.
//! A tab is forgotten once its last handle and subscription are dropped.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use super::{ChangeListener, ChangeNotifier, KeyValueStore, StorageError};

type SharedListener = Rc<RefCell<ChangeListener>>;

#[derive(Default)]
struct Tab {
    /// Keys written by other tabs, oldest first
    pending: VecDeque<Option<String>>,
    listeners: Vec<(u64, SharedListener)>,
}

#[derive(Default)]
struct Backend {
    values: HashMap<String, String>,
    tabs: HashMap<u64, Tab>,
    next_tab: u64,
    next_listener: u64,
}

impl Backend {
    fn open_tab(&mut self) -> u64 {
        let id = self.next_tab;
        self.next_tab += 1;
        self.tabs.insert(id, Tab::default());
        id
    }

    // Tabs without listeners could never consume the event
    fn notify_others(&mut self, writer: u64, key: Option<&str>) {
        for (id, tab) in &mut self.tabs {
            if *id != writer && !tab.listeners.is_empty() {
                tab.pending.push_back(key.map(str::to_string));
            }
        }
    }
}

/// Registration of one tab, removed from the backend when dropped
struct TabToken {
    id: u64,
    backend: Weak<RefCell<Backend>>,
}

impl TabToken {
    fn open(backend: &Rc<RefCell<Backend>>) -> Rc<Self> {
        let id = backend.borrow_mut().open_tab();
        Rc::new(Self {
            id,
            backend: Rc::downgrade(backend),
        })
    }
}

impl Drop for TabToken {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.upgrade() {
            // Listeners may own handles of their own; drop them after the borrow ends
            let removed = backend.borrow_mut().tabs.remove(&self.id);
            drop(removed);
        }
    }
}

/// Handle to one tab's view of a shared in-memory store.
///
/// Cloning gives another handle to the *same* tab; use
/// [`MemoryStorage::new_tab`] for a separate instance.
#[derive(Clone)]
pub struct MemoryStorage {
    backend: Rc<RefCell<Backend>>,
    tab: Rc<TabToken>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create an empty store with a single tab
    pub fn new() -> Self {
        let backend = Rc::new(RefCell::new(Backend::default()));
        let tab = TabToken::open(&backend);
        Self { backend, tab }
    }

    /// Open another tab over the same values
    pub fn new_tab(&self) -> Self {
        Self {
            backend: Rc::clone(&self.backend),
            tab: TabToken::open(&self.backend),
        }
    }

    /// Remove every key, notifying other tabs with a `None` key
    pub fn clear(&mut self) {
        let mut backend = self.backend.borrow_mut();
        backend.values.clear();
        backend.notify_others(self.tab.id, None);
    }

    /// Number of change events waiting for this tab
    pub fn pending_events(&self) -> usize {
        self.backend
            .borrow()
            .tabs
            .get(&self.tab.id)
            .map_or(0, |tab| tab.pending.len())
    }

    /// Number of live subscriptions on this tab
    pub fn listener_count(&self) -> usize {
        self.backend
            .borrow()
            .tabs
            .get(&self.tab.id)
            .map_or(0, |tab| tab.listeners.len())
    }

    /// Number of tabs still open on the shared store
    pub fn tab_count(&self) -> usize {
        self.backend.borrow().tabs.len()
    }

    /// Deliver queued change events to this tab's listeners.
    /// Returns the number of events delivered.
    pub fn dispatch_events(&self) -> usize {
        let mut delivered = 0;
        loop {
            // Release the backend before running listeners; they read storage
            let (key, listeners) = {
                let mut backend = self.backend.borrow_mut();
                let Some(tab) = backend.tabs.get_mut(&self.tab.id) else {
                    break;
                };
                let Some(key) = tab.pending.pop_front() else {
                    break;
                };
                let listeners: Vec<SharedListener> =
                    tab.listeners.iter().map(|(_, l)| Rc::clone(l)).collect();
                (key, listeners)
            };

            for listener in listeners {
                let mut listener = listener.borrow_mut();
                (*listener)(key.as_deref());
            }
            delivered += 1;
        }
        delivered
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.backend.borrow().values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut backend = self.backend.borrow_mut();
        backend.values.insert(key.to_string(), value.to_string());
        backend.notify_others(self.tab.id, Some(key));
        Ok(())
    }
}

/// Removes its listener from the tab when dropped. Keeps the tab open
/// while alive.
pub struct MemorySubscription {
    backend: Weak<RefCell<Backend>>,
    tab: Rc<TabToken>,
    id: u64,
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        let Some(backend) = self.backend.upgrade() else {
            return;
        };
        let removed: Vec<(u64, SharedListener)> = {
            let mut backend = backend.borrow_mut();
            match backend.tabs.get_mut(&self.tab.id) {
                Some(tab) => {
                    let (removed, kept) = std::mem::take(&mut tab.listeners)
                        .into_iter()
                        .partition(|(id, _)| *id == self.id);
                    tab.listeners = kept;
                    if tab.listeners.is_empty() {
                        tab.pending.clear();
                    }
                    removed
                }
                None => Vec::new(),
            }
        };
        drop(removed);
    }
}

impl ChangeNotifier for MemoryStorage {
    type Subscription = MemorySubscription;

    fn subscribe(&self, listener: ChangeListener) -> MemorySubscription {
        let mut backend = self.backend.borrow_mut();
        let id = backend.next_listener;
        backend.next_listener += 1;
        if let Some(tab) = backend.tabs.get_mut(&self.tab.id) {
            tab.listeners.push((id, Rc::new(RefCell::new(listener))));
        }
        MemorySubscription {
            backend: Rc::downgrade(&self.backend),
            tab: Rc::clone(&self.tab),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabs_share_values() {
        let mut a = MemoryStorage::new();
        let b = a.new_tab();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_writer_is_not_notified() {
        let mut a = MemoryStorage::new();
        let b = a.new_tab();
        let _a_sub = a.subscribe(Box::new(|_| {}));
        let _b_sub = b.subscribe(Box::new(|_| {}));
        a.set("k", "v").unwrap();
        assert_eq!(a.pending_events(), 0);
        assert_eq!(b.pending_events(), 1);
    }

    #[test]
    fn test_dispatch_delivers_keys_in_order() {
        let mut a = MemoryStorage::new();
        let b = a.new_tab();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = b.subscribe(Box::new(move |key| {
            sink.borrow_mut().push(key.map(str::to_string));
        }));

        a.set("one", "1").unwrap();
        a.set("two", "2").unwrap();
        a.clear();
        assert!(seen.borrow().is_empty());

        assert_eq!(b.dispatch_events(), 3);
        assert_eq!(
            *seen.borrow(),
            vec![Some("one".to_string()), Some("two".to_string()), None]
        );
        assert!(b.get("one").unwrap().is_none());
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let mut a = MemoryStorage::new();
        let b = a.new_tab();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let sub = b.subscribe(Box::new(move |_| *counter.borrow_mut() += 1));
        assert_eq!(b.listener_count(), 1);

        drop(sub);
        assert_eq!(b.listener_count(), 0);
        a.set("k", "v").unwrap();
        b.dispatch_events();
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_listener_may_write_to_storage() {
        let mut a = MemoryStorage::new();
        let b = a.new_tab();
        let mut writer = b.clone();
        let _sub = b.subscribe(Box::new(move |_| {
            writer.set("echo", "1").unwrap();
        }));
        a.set("k", "v").unwrap();
        assert_eq!(b.dispatch_events(), 1);
        assert_eq!(a.get("echo").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_tabs_without_listeners_queue_nothing() {
        let mut writer = MemoryStorage::new();
        let watcher = writer.new_tab();
        drop(writer.new_tab());
        assert_eq!(writer.tab_count(), 2);

        for i in 0..10_000 {
            writer.set("k", &i.to_string()).unwrap();
        }
        assert_eq!(watcher.pending_events(), 0);
        assert_eq!(watcher.dispatch_events(), 0);
    }

    #[test]
    fn test_unsubscribing_drops_queued_events() {
        let mut writer = MemoryStorage::new();
        let watcher = writer.new_tab();
        let sub = watcher.subscribe(Box::new(|_| {}));
        writer.set("k", "1").unwrap();
        writer.set("k", "2").unwrap();
        assert_eq!(watcher.pending_events(), 2);

        drop(sub);
        assert_eq!(watcher.pending_events(), 0);
        writer.set("k", "3").unwrap();
        assert_eq!(watcher.pending_events(), 0);
    }

    #[test]
    fn test_tab_closes_with_last_handle() {
        let writer = MemoryStorage::new();
        let tab = writer.new_tab();
        let same_tab = tab.clone();
        let sub = tab.subscribe(Box::new(|_| {}));
        assert_eq!(writer.tab_count(), 2);

        drop(tab);
        drop(same_tab);
        // The subscription still holds the tab open
        assert_eq!(writer.tab_count(), 2);

        drop(sub);
        assert_eq!(writer.tab_count(), 1);
    }
}
