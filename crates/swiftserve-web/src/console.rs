//! Logging to the developer console.

use swiftserve_core::config::StorefrontConfig;
use swiftserve_core::logging::{ConsoleLayer, LogLevel, LogWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;
use wasm_bindgen::JsValue;
use web_sys::console;

/// Writes each line with the console method matching its level.
pub struct ConsoleWriter;

impl LogWriter for ConsoleWriter {
    fn write(&self, level: LogLevel, line: &str) {
        let line = JsValue::from_str(line);
        match level {
            LogLevel::Trace | LogLevel::Debug => console::debug_1(&line),
            LogLevel::Info => console::info_1(&line),
            LogLevel::Warn => console::warn_1(&line),
            LogLevel::Error => console::error_1(&line),
        }
    }
}

/// Install the console layer as the global subscriber.
///
/// Only the first call takes effect.
pub fn init(config: &StorefrontConfig) {
    let layer = ConsoleLayer::new(ConsoleWriter)
        .with_min_level(config.log_level)
        .with_format(config.log_format);
    let subscriber = Registry::default().with(layer);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        console::debug_1(&JsValue::from_str("logging already initialized"));
    }
}
