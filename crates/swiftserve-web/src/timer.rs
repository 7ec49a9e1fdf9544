use std::time::Duration;

use swiftserve_core::timer::Timers;
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

/// `window.setTimeout`.
#[derive(Clone)]
pub struct WindowTimers(Window);

impl WindowTimers {
    pub fn new(window: Window) -> Self {
        Self(window)
    }
}

impl Timers for WindowTimers {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || callback());
        let millis = delay.as_millis().min(i32::MAX as u128) as i32;

        if let Err(e) = self
            .0
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
        {
            warn!(error = ?e, delay_ms = millis, "could not schedule timer");
        }
    }
}
