//! JavaScript bindings (WASM only)
//!
//! ```js
//! const energy = new WishEnergy();
//! if (!energy.consumeEnergy()) showOutOfEnergy();
//! label.textContent = energy.countdownStr;
//! energy.free(); // on unmount: stops the ticker and the storage listener
//! ```

use wasm_bindgen::prelude::*;

use crate::energy::{ActiveEnergyStore, EnergyStore};
use crate::persistence::LocalStorage;
use crate::platform::{BrowserScheduler, IntervalHandle, SystemClock};
use crate::settings::EnergySettings;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger already installed by the host page
        return;
    }
    log::info!("Wish energy loaded");
}

/// Energy store bound to `localStorage`, ticking once per second
#[wasm_bindgen]
pub struct WishEnergy {
    inner: ActiveEnergyStore<LocalStorage, SystemClock, IntervalHandle>,
}

#[wasm_bindgen]
impl WishEnergy {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WishEnergy, JsValue> {
        Self::with_settings(JsValue::UNDEFINED)
    }

    /// Construct with a JSON settings string; `undefined` uses defaults
    #[wasm_bindgen(js_name = withSettings)]
    pub fn with_settings(settings: JsValue) -> Result<WishEnergy, JsValue> {
        let settings = match settings.as_string() {
            Some(json) => EnergySettings::from_json(&json)
                .map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => EnergySettings::default(),
        };
        let storage = LocalStorage::open().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let store = EnergyStore::new(storage, SystemClock, settings);
        Ok(Self {
            inner: store.activate(&BrowserScheduler),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn energy(&self) -> u32 {
        self.inner.energy()
    }

    #[wasm_bindgen(getter)]
    pub fn stability(&self) -> u32 {
        self.inner.stability()
    }

    #[wasm_bindgen(getter = countdownStr)]
    pub fn countdown(&self) -> String {
        self.inner.countdown()
    }

    #[wasm_bindgen(getter = MAX_ENERGY)]
    pub fn max_energy(&self) -> u32 {
        self.inner.max_energy()
    }

    #[wasm_bindgen(getter = MAX_STABILITY)]
    pub fn max_stability(&self) -> u32 {
        self.inner.max_stability()
    }

    #[wasm_bindgen(js_name = consumeEnergy)]
    pub fn consume(&self) -> bool {
        self.inner.consume()
    }

    #[wasm_bindgen(js_name = refundEnergy)]
    pub fn refund(&self) {
        self.inner.refund();
    }

    #[wasm_bindgen(js_name = decreaseStability)]
    pub fn decrease_stability(&self) {
        self.inner.decrease_stability();
    }

    #[wasm_bindgen(js_name = recoverStability)]
    pub fn recover_stability(&self) {
        self.inner.recover_stability();
    }
}
