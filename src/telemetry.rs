//! Console logging
//!
//! In the browser everything goes to `web_sys::console`. Native builds (unit
//! tests, host tooling) write to stderr instead, since the console imports
//! only exist inside a JS runtime.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub fn emit(level: Level, message: &str) {
    let value = wasm_bindgen::JsValue::from_str(message);
    match level {
        Level::Info => web_sys::console::log_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Error => web_sys::console::error_1(&value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn emit(level: Level, message: &str) {
    let tag = match level {
        Level::Info => "INFO",
        Level::Warn => "WARN",
        Level::Error => "ERROR",
    };
    eprintln!("{} {}", tag, message);
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::telemetry::emit($crate::telemetry::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::telemetry::emit($crate::telemetry::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::telemetry::emit($crate::telemetry::Level::Error, &format!($($arg)*))
    };
}
