//! `setInterval`-based scheduler (WASM only)

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use super::Scheduler;

/// Schedules tasks on the window's interval timers
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserScheduler;

/// Live `setInterval` registration; cleared when dropped
pub struct IntervalHandle {
    id: Option<i32>,
    // Must outlive the interval, JS holds a reference to it
    _closure: Closure<dyn FnMut()>,
}

impl Drop for IntervalHandle {
    fn drop(&mut self) {
        if let (Some(id), Some(window)) = (self.id, web_sys::window()) {
            window.clear_interval_with_handle(id);
        }
    }
}

impl Scheduler for BrowserScheduler {
    type Handle = IntervalHandle;

    fn every(&self, period_ms: u32, mut task: Box<dyn FnMut()>) -> IntervalHandle {
        let closure = Closure::<dyn FnMut()>::new(move || task());
        let timeout = i32::try_from(period_ms).unwrap_or(i32::MAX);

        let id = web_sys::window().and_then(|w| {
            w.set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                timeout,
            )
            .ok()
        });
        if id.is_none() {
            log::warn!("Failed to start {}ms interval", period_ms);
        }

        IntervalHandle {
            id,
            _closure: closure,
        }
    }
}
