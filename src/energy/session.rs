//! Active energy store
//!
//! Activation is the mount sequence: load, reconcile once, start the
//! periodic ticker and subscribe to writes from other tabs. The returned
//! guard owns both resources and releases them when dropped. Tasks only
//! hold weak references, so nothing can touch the store after disposal.

use std::cell::RefCell;
use std::rc::Rc;

use super::{EnergyError, EnergyState, EnergyStore};
use crate::persistence::{ChangeNotifier, KeyValueStore};
use crate::platform::{Clock, Scheduler};

/// An [`EnergyStore`] with a running ticker and change subscription
pub struct ActiveEnergyStore<S: ChangeNotifier, C, H> {
    // Declared first so they are cancelled before the store is released
    ticker: H,
    subscription: S::Subscription,
    store: Rc<RefCell<EnergyStore<S, C>>>,
}

impl<S, C> EnergyStore<S, C>
where
    S: KeyValueStore + ChangeNotifier + 'static,
    C: Clock + 'static,
{
    /// Load, reconcile and start ticking on `scheduler`
    pub fn activate<T: Scheduler>(mut self, scheduler: &T) -> ActiveEnergyStore<S, C, T::Handle> {
        self.load();
        self.tick();
        let period_ms = self.settings().tick_interval_ms;
        let store = Rc::new(RefCell::new(self));

        let weak = Rc::downgrade(&store);
        let ticker = scheduler.every(
            period_ms,
            Box::new(move || {
                if let Some(store) = weak.upgrade() {
                    store.borrow_mut().tick();
                }
            }),
        );

        let weak = Rc::downgrade(&store);
        let subscription = store.borrow().storage().subscribe(Box::new(move |key| {
            if let Some(store) = weak.upgrade() {
                store.borrow_mut().on_storage_change(key);
            }
        }));

        log::info!(
            "Energy store active ({}/{} energy, {}/{} stability)",
            store.borrow().energy(),
            store.borrow().settings().max_energy,
            store.borrow().stability(),
            store.borrow().settings().max_stability
        );

        ActiveEnergyStore {
            ticker,
            subscription,
            store,
        }
    }
}

impl<S, C, H> ActiveEnergyStore<S, C, H>
where
    S: KeyValueStore + ChangeNotifier,
    C: Clock,
{
    pub fn consume(&self) -> bool {
        self.store.borrow_mut().consume()
    }

    pub fn try_consume(&self) -> Result<(), EnergyError> {
        self.store.borrow_mut().try_consume()
    }

    pub fn refund(&self) {
        self.store.borrow_mut().refund();
    }

    pub fn decrease_stability(&self) {
        self.store.borrow_mut().decrease_stability();
    }

    pub fn recover_stability(&self) {
        self.store.borrow_mut().recover_stability();
    }

    pub fn energy(&self) -> u32 {
        self.store.borrow().energy()
    }

    pub fn stability(&self) -> u32 {
        self.store.borrow().stability()
    }

    /// Copy of the current state; later ticks do not change it
    pub fn state(&self) -> EnergyState {
        *self.store.borrow().state()
    }

    pub fn countdown(&self) -> String {
        self.store.borrow().countdown()
    }

    pub fn max_energy(&self) -> u32 {
        self.store.borrow().settings().max_energy
    }

    pub fn max_stability(&self) -> u32 {
        self.store.borrow().settings().max_stability
    }
}

impl<S: ChangeNotifier, C, H> Drop for ActiveEnergyStore<S, C, H> {
    fn drop(&mut self) {
        log::debug!("Energy store deactivated");
    }
}
