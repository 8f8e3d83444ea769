//! Energy state and the pure regeneration rules
//!
//! Everything here is deterministic: time is passed in, nothing touches
//! storage. [`super::EnergyStore`] wraps these rules with persistence.

use crate::settings::EnergySettings;

/// Mutation refused by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnergyError {
    #[error("no energy left to consume")]
    InsufficientEnergy,
}

/// Energy and stability counters plus the recovery deadline
///
/// Invariants (for states produced by these methods):
/// - `energy <= max_energy`, `stability <= max_stability`
/// - `next_recover_time == 0` whenever energy is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyState {
    /// Consumable points, regenerate over time
    pub energy: u32,
    /// Secondary points, only decremented or reset
    pub stability: u32,
    /// Epoch ms at which the next point regenerates, 0 when none is pending
    pub next_recover_time: u64,
}

impl EnergyState {
    /// Fresh state: both counters full, no pending recovery
    pub fn full(settings: &EnergySettings) -> Self {
        Self {
            energy: settings.max_energy,
            stability: settings.max_stability,
            next_recover_time: 0,
        }
    }

    pub fn is_full(&self, settings: &EnergySettings) -> bool {
        self.energy >= settings.max_energy
    }

    /// Pull out-of-range values back into the valid range.
    ///
    /// Only needed for externally written records; the mutators below never
    /// leave the range.
    pub fn sanitized(mut self, settings: &EnergySettings) -> Self {
        self.energy = self.energy.min(settings.max_energy);
        self.stability = self.stability.min(settings.max_stability);
        if self.is_full(settings) {
            self.next_recover_time = 0;
        }
        self
    }

    /// Apply time-based recovery up to `current_time`.
    ///
    /// Crossing the deadline grants one point immediately, plus one per full
    /// interval elapsed past it. The deadline advances by whole intervals so
    /// the regeneration phase does not drift. Returns the number of points
    /// granted (before clamping), 0 when nothing changed.
    pub fn reconcile(&mut self, current_time: u64, settings: &EnergySettings) -> u64 {
        if self.is_full(settings)
            || self.next_recover_time == 0
            || current_time < self.next_recover_time
        {
            return 0;
        }

        let elapsed = current_time - self.next_recover_time;
        let recovered = 1 + elapsed / settings.recover_interval_ms;

        let energy = (u64::from(self.energy) + recovered).min(u64::from(settings.max_energy));
        // Bounded by max_energy, which is a u32
        self.energy = u32::try_from(energy).unwrap_or(settings.max_energy);

        if self.is_full(settings) {
            self.next_recover_time = 0;
        } else {
            self.next_recover_time = self
                .next_recover_time
                .saturating_add(recovered.saturating_mul(settings.recover_interval_ms));
        }
        recovered
    }

    /// Spend one energy point at time `now`.
    ///
    /// Spending from a full counter starts the recovery timer; spending while
    /// a timer is running leaves the deadline alone.
    pub fn consume(&mut self, now: u64, settings: &EnergySettings) -> Result<(), EnergyError> {
        if self.energy == 0 {
            return Err(EnergyError::InsufficientEnergy);
        }
        if self.energy == settings.max_energy {
            self.next_recover_time = now.saturating_add(settings.recover_interval_ms);
        }
        self.energy -= 1;
        Ok(())
    }

    /// Give one energy point back. Returns false when already full.
    pub fn refund(&mut self, settings: &EnergySettings) -> bool {
        if self.is_full(settings) {
            return false;
        }
        self.energy += 1;
        if self.energy == settings.max_energy {
            self.next_recover_time = 0;
        }
        true
    }

    /// Lose one stability point. Returns false when already empty.
    pub fn decrease_stability(&mut self) -> bool {
        if self.stability == 0 {
            return false;
        }
        self.stability -= 1;
        true
    }

    /// Refill stability to its cap
    pub fn recover_stability(&mut self, settings: &EnergySettings) {
        self.stability = settings.max_stability;
    }
}
