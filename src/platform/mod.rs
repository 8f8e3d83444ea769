//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time (epoch milliseconds)
//! - Periodic tasks with cancel-on-drop handles

pub mod manual;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use manual::{ManualClock, ManualTimer};

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserScheduler, IntervalHandle};

/// Wall-clock time source
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// Runs a task periodically until the returned handle is dropped
pub trait Scheduler {
    type Handle;

    fn every(&self, period_ms: u32, task: Box<dyn FnMut()>) -> Self::Handle;
}

/// The real clock: `Date.now()` on web, `SystemTime` on native
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
