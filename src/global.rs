//! Process-wide initialization state.
//!
//! `init`/`exit` model libopentracedecode's single, one-level-deep global handle: nested
//! `init` without an intervening `exit` fails, and `exit` is idempotent.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::logging;

struct GlobalState {
    initialized: bool,
    search_paths: Vec<PathBuf>,
}

fn state() -> &'static Mutex<GlobalState> {
    static STATE: Mutex<GlobalState> =
        Mutex::new(GlobalState { initialized: false, search_paths: Vec::new() });
    &STATE
}

/// Initializes the module. `search_path` of `None` uses the built-in search path.
///
/// Fails (without changing state) if already initialized.
pub fn init(search_path: Option<&Path>) -> Result<()> {
    let mut g = state().lock().unwrap();
    if g.initialized {
        return Err(Error::arg("opentracedecode is already initialized"));
    }
    g.initialized = true;
    g.search_paths = match search_path {
        Some(p) => vec![p.to_path_buf()],
        None => vec![PathBuf::from(default_search_path())],
    };
    drop(g);
    logging::install_bridge();
    log::info!("opentracedecode initialized");
    Ok(())
}

/// Tears down the module. Idempotent: calling `exit` without a prior `init`, or calling it
/// more than once, always returns `Ok`.
pub fn exit() -> Result<()> {
    let mut g = state().lock().unwrap();
    g.initialized = false;
    Ok(())
}

/// Whether the module is currently initialized.
pub fn is_initialized() -> bool {
    state().lock().unwrap().initialized
}

/// Returns the currently configured decoder search paths.
pub fn searchpaths_get() -> Vec<PathBuf> {
    state().lock().unwrap().search_paths.clone()
}

fn default_search_path() -> &'static str {
    "/usr/share/opentracedecode/decoders"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // init/exit are process-global, so serialize the tests that touch them.
    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    #[test]
    fn init_exit_nesting() {
        let _guard = TEST_LOCK.lock().unwrap();
        let _ = exit();

        assert!(init(None).is_ok());
        assert!(init(None).is_err());
        assert!(init(None).is_err());
        assert!(exit().is_ok());
        assert!(exit().is_ok());
        assert!(exit().is_ok());
    }

    #[test]
    fn init_none_uses_builtin_path() {
        let _guard = TEST_LOCK.lock().unwrap();
        let _ = exit();
        assert!(init(None).is_ok());
        assert!(!searchpaths_get().is_empty());
        assert!(exit().is_ok());
    }
}
