//! Persistent energy store
//!
//! Every mutation reloads the persisted record first so the freshest write
//! from any tab is the base (last writer wins, no merging). Storage and parse
//! failures never reach the caller: the store logs them and starts fresh.

use super::countdown::countdown;
use super::{EnergyError, EnergyState};
use crate::persistence::{KeyValueStore, PersistenceError, read_record, write_record};
use crate::platform::Clock;
use crate::settings::EnergySettings;

/// Energy and stability counters backed by a key-value store
pub struct EnergyStore<S, C> {
    storage: S,
    clock: C,
    settings: EnergySettings,
    state: EnergyState,
    /// Last sampled time, drives the countdown only
    now: u64,
}

impl<S: KeyValueStore, C: Clock> EnergyStore<S, C> {
    /// Create a store with full counters without touching storage.
    ///
    /// Invalid settings (zero caps or intervals) are replaced by defaults.
    pub fn new(storage: S, clock: C, settings: EnergySettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("Invalid energy settings, using defaults: {}", e);
                EnergySettings::default()
            }
        };
        let now = clock.now_ms();
        let state = EnergyState::full(&settings);
        Self {
            storage,
            clock,
            settings,
            state,
            now,
        }
    }

    /// Create a store, load the persisted record and apply elapsed recovery
    pub fn open(storage: S, clock: C, settings: EnergySettings) -> Self {
        let mut store = Self::new(storage, clock, settings);
        store.load();
        store.tick();
        store
    }

    /// Replace the in-memory state with the persisted record.
    ///
    /// Absent, unreadable or corrupt records are reinitialised to defaults.
    pub fn load(&mut self) {
        match read_record(&self.storage, &self.settings.storage_key) {
            Ok(Some(record)) => self.state = record.into_state(&self.settings),
            Ok(None) => {
                log::info!("No energy record found, starting fresh");
                self.reset();
            }
            Err(PersistenceError::Parse(e)) => {
                log::error!("Failed to parse energy data: {}", e);
                self.reset();
            }
            Err(e) => {
                log::error!("Failed to read energy data: {}", e);
                self.reset();
            }
        }
    }

    /// Refill both counters, clear the deadline and persist
    pub fn reset(&mut self) {
        self.state = EnergyState::full(&self.settings);
        self.save();
    }

    fn save(&mut self) {
        if let Err(e) = write_record(&mut self.storage, &self.settings.storage_key, &self.state) {
            log::warn!("Failed to save energy data: {}", e);
        }
    }

    /// Apply recovery due at `current_time`. Persists and returns true only
    /// when points were granted.
    pub fn reconcile_recovery(&mut self, current_time: u64) -> bool {
        let recovered = self.state.reconcile(current_time, &self.settings);
        if recovered == 0 {
            return false;
        }
        log::debug!(
            "Recovered {} energy point(s), now {}/{}",
            recovered,
            self.state.energy,
            self.settings.max_energy
        );
        self.save();
        true
    }

    /// One periodic step: sample the clock and reconcile
    pub fn tick(&mut self) -> bool {
        self.now = self.clock.now_ms();
        self.reconcile_recovery(self.now)
    }

    /// Spend one energy point, or report why not
    pub fn try_consume(&mut self) -> Result<(), EnergyError> {
        self.load();
        self.now = self.clock.now_ms();
        self.state.consume(self.now, &self.settings)?;
        log::debug!(
            "Consumed energy, {}/{} left",
            self.state.energy,
            self.settings.max_energy
        );
        self.save();
        Ok(())
    }

    /// Spend one energy point. False (and no change) when empty.
    pub fn consume(&mut self) -> bool {
        match self.try_consume() {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Consume refused: {}", e);
                false
            }
        }
    }

    /// Give back one energy point, e.g. when the action it paid for failed
    pub fn refund(&mut self) {
        self.load();
        if self.state.refund(&self.settings) {
            self.save();
        }
    }

    pub fn decrease_stability(&mut self) {
        self.load();
        if self.state.decrease_stability() {
            self.save();
        }
    }

    pub fn recover_stability(&mut self) {
        self.load();
        self.state.recover_stability(&self.settings);
        self.save();
    }

    /// React to a write made by another instance. Reloads when `key` is
    /// ours; returns whether it did.
    pub fn on_storage_change(&mut self, key: Option<&str>) -> bool {
        if key != Some(self.settings.storage_key.as_str()) {
            return false;
        }
        self.load();
        true
    }

    pub fn energy(&self) -> u32 {
        self.state.energy
    }

    pub fn stability(&self) -> u32 {
        self.state.stability
    }

    pub fn next_recover_time(&self) -> u64 {
        self.state.next_recover_time
    }

    pub fn is_full(&self) -> bool {
        self.state.is_full(&self.settings)
    }

    pub fn state(&self) -> &EnergyState {
        &self.state
    }

    /// Time of the last tick or mutation
    pub fn now(&self) -> u64 {
        self.now
    }

    /// `MM:SS` until the next point, empty when nothing is pending
    pub fn countdown(&self) -> String {
        countdown(&self.state, self.now, &self.settings)
    }

    pub fn settings(&self) -> &EnergySettings {
        &self.settings
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::persistence::{ChangeNotifier, MemoryStorage};
    use crate::platform::ManualClock;

    const T: u64 = 1_700_000_000_000;

    fn open(storage: &MemoryStorage, clock: &ManualClock) -> EnergyStore<MemoryStorage, ManualClock> {
        EnergyStore::open(storage.clone(), clock.clone(), EnergySettings::default())
    }

    fn persisted(storage: &MemoryStorage) -> String {
        storage.get(STORAGE_KEY).unwrap().unwrap()
    }

    #[test]
    fn test_first_open_persists_defaults() {
        let storage = MemoryStorage::new();
        let store = open(&storage, &ManualClock::new(T));
        assert_eq!(store.energy(), MAX_ENERGY);
        assert_eq!(store.stability(), MAX_STABILITY);
        assert_eq!(store.next_recover_time(), 0);
        assert_eq!(
            persisted(&storage),
            r#"{"count":3,"stability":6,"nextRecoverTime":0}"#
        );
    }

    #[test]
    fn test_corrupt_record_resets_and_persists() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{\"count\":").unwrap();
        let store = open(&storage, &ManualClock::new(T));
        assert_eq!(*store.state(), EnergyState::full(store.settings()));
        assert_eq!(
            persisted(&storage),
            r#"{"count":3,"stability":6,"nextRecoverTime":0}"#
        );
    }

    #[test]
    fn test_open_applies_elapsed_recovery() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                STORAGE_KEY,
                &format!(r#"{{"count":1,"stability":2,"nextRecoverTime":{}}}"#, T),
            )
            .unwrap();
        let store = open(&storage, &ManualClock::new(T + 1_500_000));
        assert_eq!(store.energy(), 3);
        assert_eq!(store.next_recover_time(), 0);
        assert_eq!(store.stability(), 2);
        assert_eq!(
            persisted(&storage),
            r#"{"count":3,"stability":2,"nextRecoverTime":0}"#
        );
    }

    #[test]
    fn test_reconcile_only_persists_on_change() {
        let storage = MemoryStorage::new();
        let other_tab = storage.new_tab();
        let _watch = other_tab.subscribe(Box::new(|_| {}));
        let mut store = open(&storage, &ManualClock::new(T));
        store.consume();
        let writes = other_tab.pending_events();

        assert!(!store.reconcile_recovery(T + 1000));
        assert_eq!(other_tab.pending_events(), writes);

        assert!(store.reconcile_recovery(T + RECOVER_INTERVAL_MS));
        assert_eq!(other_tab.pending_events(), writes + 1);
        assert_eq!(store.energy(), 3);
    }

    #[test]
    fn test_consume_exhaustion() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T);
        let mut store = open(&storage, &clock);
        assert!(store.consume());
        assert!(store.consume());
        assert!(store.consume());
        let before = persisted(&storage);

        assert!(!store.consume());
        assert_eq!(store.try_consume(), Err(EnergyError::InsufficientEnergy));
        assert_eq!(store.energy(), 0);
        assert_eq!(store.next_recover_time(), T + RECOVER_INTERVAL_MS);
        assert_eq!(persisted(&storage), before);
    }

    #[test]
    fn test_consume_then_refund_round_trip() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T));
        assert!(store.consume());
        assert_eq!(store.countdown(), "10:00");
        store.refund();
        assert_eq!(store.energy(), MAX_ENERGY);
        assert_eq!(store.next_recover_time(), 0);
        assert_eq!(store.countdown(), "");
    }

    #[test]
    fn test_refund_at_max_is_noop() {
        let storage = MemoryStorage::new();
        let other_tab = storage.new_tab();
        let _watch = other_tab.subscribe(Box::new(|_| {}));
        let mut store = open(&storage, &ManualClock::new(T));
        let writes = other_tab.pending_events();
        store.refund();
        assert_eq!(store.energy(), MAX_ENERGY);
        assert_eq!(other_tab.pending_events(), writes);
    }

    #[test]
    fn test_mutations_start_from_persisted_record() {
        let storage = MemoryStorage::new();
        let mut other_tab = storage.new_tab();
        let mut store = open(&storage, &ManualClock::new(T));

        // Another tab spent two points; this instance has not heard about it
        other_tab
            .set(
                STORAGE_KEY,
                &format!(r#"{{"count":1,"stability":6,"nextRecoverTime":{}}}"#, T + 1000),
            )
            .unwrap();
        assert_eq!(store.energy(), 3);

        assert!(store.consume());
        assert_eq!(store.energy(), 0);
        assert_eq!(store.next_recover_time(), T + 1000);
    }

    #[test]
    fn test_stability() {
        let storage = MemoryStorage::new();
        let mut store = open(&storage, &ManualClock::new(T));
        for _ in 0..10 {
            store.decrease_stability();
        }
        assert_eq!(store.stability(), 0);
        store.recover_stability();
        assert_eq!(store.stability(), MAX_STABILITY);
        assert_eq!(
            persisted(&storage),
            r#"{"count":3,"stability":6,"nextRecoverTime":0}"#
        );
    }

    #[test]
    fn test_storage_change_filters_key() {
        let storage = MemoryStorage::new();
        let mut other_tab = storage.new_tab();
        let mut store = open(&storage, &ManualClock::new(T));
        other_tab
            .set(STORAGE_KEY, r#"{"count":0,"stability":1,"nextRecoverTime":5}"#)
            .unwrap();

        assert!(!store.on_storage_change(Some("unrelated")));
        assert!(!store.on_storage_change(None));
        assert_eq!(store.energy(), 3);

        assert!(store.on_storage_change(Some(STORAGE_KEY)));
        assert_eq!(store.energy(), 0);
        assert_eq!(store.stability(), 1);
        assert_eq!(store.next_recover_time(), 5);
    }

    #[test]
    fn test_countdown_tracks_ticks() {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T);
        let mut store = open(&storage, &clock);
        store.consume();
        clock.set_now(T + RECOVER_INTERVAL_MS - 125_000);
        store.tick();
        assert_eq!(store.countdown(), "02:05");
    }

    #[test]
    fn test_custom_settings() {
        let settings = EnergySettings {
            storage_key: "custom_v2".to_string(),
            max_energy: 5,
            max_stability: 2,
            recover_interval_ms: 1000,
            tick_interval_ms: 100,
        };
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T);
        let mut store = EnergyStore::open(storage.clone(), clock.clone(), settings);
        assert_eq!(store.energy(), 5);
        assert!(store.consume());
        assert!(store.consume());
        clock.set_now(T + 1500);
        store.tick();
        assert_eq!(store.energy(), 4);
        assert_eq!(store.next_recover_time(), T + 2000);
        assert!(storage.get(STORAGE_KEY).unwrap().is_none());
        assert!(storage.get("custom_v2").unwrap().is_some());
    }

    #[test]
    fn test_zero_interval_falls_back_to_defaults() {
        let settings = EnergySettings {
            recover_interval_ms: 0,
            ..EnergySettings::default()
        };
        let storage = MemoryStorage::new();
        let clock = ManualClock::new(T);
        let mut store = EnergyStore::open(storage.clone(), clock.clone(), settings);
        assert_eq!(*store.settings(), EnergySettings::default());

        assert!(store.consume());
        assert_eq!(store.next_recover_time(), T + RECOVER_INTERVAL_MS);
        clock.set_now(T + RECOVER_INTERVAL_MS);
        assert!(store.tick());
        assert_eq!(store.energy(), MAX_ENERGY);
    }

    #[test]
    fn test_zero_caps_fall_back_to_defaults() {
        let settings = EnergySettings {
            max_energy: 0,
            max_stability: 0,
            ..EnergySettings::default()
        };
        let store = EnergyStore::new(MemoryStorage::new(), ManualClock::new(T), settings);
        assert_eq!(store.settings().max_energy, MAX_ENERGY);
        assert_eq!(store.settings().max_stability, MAX_STABILITY);
    }
}
