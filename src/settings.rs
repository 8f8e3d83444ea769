//! Energy settings
//!
//! Defaults come from [`crate::consts`]. Hosts can override them from a JSON
//! blob or, on native, from `WISH_ENERGY_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Invalid configuration
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Limits, timings and storage key for an energy store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySettings {
    /// Key of the persisted record
    pub storage_key: String,
    /// Energy cap
    pub max_energy: u32,
    /// Stability cap
    pub max_stability: u32,
    /// Time to regenerate one energy point (ms)
    pub recover_interval_ms: u64,
    /// Reconciliation tick period (ms)
    pub tick_interval_ms: u32,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            max_energy: MAX_ENERGY,
            max_stability: MAX_STABILITY,
            recover_interval_ms: RECOVER_INTERVAL_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
        }
    }
}

impl EnergySettings {
    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject limits and intervals that would make the counters meaningless
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_energy == 0 {
            return Err(SettingsError::Zero { field: "max_energy" });
        }
        if self.max_stability == 0 {
            return Err(SettingsError::Zero {
                field: "max_stability",
            });
        }
        if self.recover_interval_ms == 0 {
            return Err(SettingsError::Zero {
                field: "recover_interval_ms",
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Zero {
                field: "tick_interval_ms",
            });
        }
        Ok(())
    }

    /// Defaults overlaid with `WISH_ENERGY_*` environment variables.
    /// Unparsable or zero values are ignored.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let settings = Self {
            storage_key: std::env::var("WISH_ENERGY_STORAGE_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.storage_key),
            max_energy: env_parse("WISH_ENERGY_MAX_ENERGY", defaults.max_energy),
            max_stability: env_parse("WISH_ENERGY_MAX_STABILITY", defaults.max_stability),
            recover_interval_ms: env_parse(
                "WISH_ENERGY_RECOVER_INTERVAL_MS",
                defaults.recover_interval_ms,
            ),
            tick_interval_ms: env_parse("WISH_ENERGY_TICK_INTERVAL_MS", defaults.tick_interval_ms),
        };
        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("Ignoring environment overrides: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
