//! Energy record codec
//!
//! Wire shape: `{"count": 3, "stability": 6, "nextRecoverTime": 0}`.
//! Missing or `null` fields fall back to their defaults; a field of the
//! wrong type (string, negative, fractional) makes the whole record corrupt.

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, PersistenceError};
use crate::energy::EnergyState;
use crate::settings::EnergySettings;

/// Persisted form of [`EnergyState`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRecord {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub stability: Option<u32>,
    #[serde(default)]
    pub next_recover_time: Option<u64>,
}

impl EnergyRecord {
    /// Fill missing fields from defaults and clamp into range
    pub fn into_state(self, settings: &EnergySettings) -> EnergyState {
        EnergyState {
            energy: self.count.unwrap_or(settings.max_energy),
            stability: self.stability.unwrap_or(settings.max_stability),
            next_recover_time: self.next_recover_time.unwrap_or(0),
        }
        .sanitized(settings)
    }
}

impl From<&EnergyState> for EnergyRecord {
    fn from(state: &EnergyState) -> Self {
        Self {
            count: Some(state.energy),
            stability: Some(state.stability),
            next_recover_time: Some(state.next_recover_time),
        }
    }
}

/// Read and decode the record under `key`. `Ok(None)` when absent.
pub fn read_record<S: KeyValueStore + ?Sized>(
    storage: &S,
    key: &str,
) -> Result<Option<EnergyRecord>, PersistenceError> {
    match storage.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Encode `state` and write it under `key`
pub fn write_record<S: KeyValueStore + ?Sized>(
    storage: &mut S,
    key: &str,
    state: &EnergyState,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(&EnergyRecord::from(state))?;
    storage.set(key, &json)?;
    Ok(())
}
