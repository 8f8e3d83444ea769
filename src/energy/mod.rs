//! Energy module
//!
//! The regeneration rules live in `state` and are pure; `store` adds
//! persistence and cross-tab reloads; `session` owns the ticker and the
//! change subscription for an active store.

pub mod countdown;
pub mod session;
pub mod state;
pub mod store;

pub use countdown::{countdown, format_countdown};
pub use session::ActiveEnergyStore;
pub use state::{EnergyError, EnergyState};
pub use store::EnergyStore;
