//! Countdown until the next energy point

use super::EnergyState;
use crate::settings::EnergySettings;

/// Format a millisecond duration as zero-padded `MM:SS`.
///
/// Minutes are not wrapped into hours; long durations just grow wider.
pub fn format_countdown(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1000;
    format!("{:02}:{:02}", minutes, seconds)
}

/// Countdown string for `state` as seen at `now`.
///
/// Empty when energy is full or no recovery is pending. A deadline already
/// in the past shows `00:00` until the next reconciliation tick.
pub fn countdown(state: &EnergyState, now: u64, settings: &EnergySettings) -> String {
    if state.is_full(settings) || state.next_recover_time == 0 {
        return String::new();
    }
    format_countdown(state.next_recover_time.saturating_sub(now))
}
