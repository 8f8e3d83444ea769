//! Wish Energy - regenerating resource counters for the browser
//!
//! Core modules:
//! - `energy`: Energy/stability state machine, countdown, store and session
//! - `persistence`: Record codec and swappable key-value storage backends
//! - `platform`: Clock and scheduler abstraction (browser/native)
//! - `settings`: Tunable limits, intervals and storage key

pub mod energy;
pub mod persistence;
pub mod platform;
pub mod settings;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use energy::{
    ActiveEnergyStore, EnergyError, EnergyState, EnergyStore, format_countdown,
};
pub use persistence::{ChangeNotifier, KeyValueStore, MemoryStorage, PersistenceError, StorageError};
pub use platform::{Clock, Scheduler, SystemClock};
pub use settings::{EnergySettings, SettingsError};

/// Default limits and timings
pub mod consts {
    /// Energy cap (points)
    pub const MAX_ENERGY: u32 = 3;
    /// Stability cap (points)
    pub const MAX_STABILITY: u32 = 6;
    /// Time to regenerate one energy point (10 minutes)
    pub const RECOVER_INTERVAL_MS: u64 = 10 * 60 * 1000;
    /// Reconciliation tick period
    pub const TICK_INTERVAL_MS: u32 = 1000;
    /// Persisted record key. Bump the suffix on incompatible schema changes;
    /// older keys are abandoned, never migrated.
    pub const STORAGE_KEY: &str = "wish_energy_status_v1";
}
