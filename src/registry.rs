//! A minimal in-process decoder registry.
//!
//! spec.md §1 puts "loading/parsing decoder metadata from on-disk modules" out of scope;
//! this module is the concrete stand-in the core still needs to hand frontends something
//! for `decoder_load`/`decoder_list`/etc. It manages `Arc<Decoder>` by id, in memory only,
//! seeded with one built-in decoder for boundary testing (spec.md §8's `decoder_load("uart")`
//! scenarios), and open to registering more via [`register`].

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::decoder::{ChannelDef, Decoder, OptionDef};
use crate::error::{Error, Result};
use crate::value::Value;

struct Registry {
    loaded: Mutex<HashMap<String, std::sync::Arc<Decoder>>>,
}

fn state() -> &'static Registry {
    static STATE: OnceLock<Registry> = OnceLock::new();
    STATE.get_or_init(|| Registry { loaded: Mutex::new(HashMap::new()) })
}

fn builtin_decoders() -> Vec<Decoder> {
    vec![Decoder {
        id: "uart".into(),
        name: "uart".into(),
        longname: "Universal Asynchronous Receiver/Transmitter".into(),
        desc: "Asynchronous, serial bus".into(),
        license: "gplv2+".into(),
        inputs: vec!["logic".into()],
        outputs: vec!["uart".into()],
        tags: vec!["Embedded/industrial".into()],
        channels: vec![],
        optional_channels: vec![
            ChannelDef::new("rx", "RX", "UART receive line", 0),
            ChannelDef::new("tx", "TX", "UART transmit line", 1),
        ],
        options: vec![OptionDef::new("baudrate", Value::U64(115200))],
        annotations: vec![],
        annotation_rows: vec![],
        binary: vec![],
        logic_output_channels: vec![],
        api_version: 3,
    }]
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.chars().any(|c| c.is_whitespace()) {
        return Err(Error::arg(format!("invalid decoder id: {id:?}")));
    }
    Ok(())
}

/// Registers (or replaces) a decoder under its own id. Lets embedders and tests add
/// decoders beyond the built-in set without touching a filesystem.
pub fn register(decoder: Decoder) {
    state().loaded.lock().unwrap().insert(decoder.id.clone(), std::sync::Arc::new(decoder));
}

/// `decoder_load(id)`: case-sensitive, exact-match lookup. Loading the same id twice is a
/// no-op that returns the same entry, not a duplicate.
pub fn decoder_load(id: &str) -> Result<std::sync::Arc<Decoder>> {
    validate_id(id)?;
    let mut g = state().loaded.lock().unwrap();
    if let Some(d) = g.get(id) {
        return Ok(d.clone());
    }
    let found = builtin_decoders()
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| Error::arg(format!("no such decoder: {id}")))?;
    let arc = std::sync::Arc::new(found);
    g.insert(id.to_string(), arc.clone());
    Ok(arc)
}

/// `decoder_load_all`: loads every built-in decoder.
pub fn decoder_load_all() -> Result<Vec<std::sync::Arc<Decoder>>> {
    builtin_decoders().into_iter().map(|d| decoder_load(&d.id)).collect()
}

/// `decoder_unload(id)`.
pub fn decoder_unload(id: &str) -> Result<()> {
    if state().loaded.lock().unwrap().remove(id).is_some() {
        Ok(())
    } else {
        Err(Error::arg(format!("decoder not loaded: {id}")))
    }
}

/// `decoder_unload_all`: a no-op (returning `Ok`) when nothing has ever been loaded.
pub fn decoder_unload_all() -> Result<()> {
    state().loaded.lock().unwrap().clear();
    Ok(())
}

/// `decoder_list`.
pub fn decoder_list() -> Vec<std::sync::Arc<Decoder>> {
    state().loaded.lock().unwrap().values().cloned().collect()
}

/// `decoder_get_by_id`.
pub fn decoder_get_by_id(id: &str) -> Option<std::sync::Arc<Decoder>> {
    state().loaded.lock().unwrap().get(id).cloned()
}

/// `decoder_doc_get`: a human-readable doc string assembled from the decoder's metadata.
pub fn decoder_doc_get(decoder: &Decoder) -> String {
    format!("{}\n\n{}", decoder.longname, decoder.desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // state() is a process-wide OnceLock shared by every test in this module; serialize
    // them the same way src/global.rs does for its own process-wide handle.
    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    fn reset() {
        let _ = decoder_unload_all();
    }

    #[test]
    fn rejects_empty_blank_and_unknown_ids() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        assert!(decoder_load("").is_err());
        assert!(decoder_load(" ").is_err());
        assert!(decoder_load("nonexisting").is_err());
        assert!(decoder_load("UART").is_err());
        assert!(decoder_load("uart spi").is_err());
    }

    #[test]
    fn loading_the_same_decoder_twice_does_not_duplicate() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        assert!(decoder_load("uart").is_ok());
        assert!(decoder_load("uart").is_ok());
        assert_eq!(decoder_list().len(), 1);
    }

    #[test]
    fn unload_nonexistent_errors_unload_all_without_load_is_ok() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        assert!(decoder_unload("nope").is_err());
        assert!(decoder_unload_all().is_ok());
    }

    #[test]
    fn list_is_empty_until_something_is_loaded() {
        let _guard = TEST_LOCK.lock().unwrap();
        reset();
        assert!(decoder_list().is_empty());
        decoder_load("uart").unwrap();
        assert_eq!(decoder_list().len(), 1);
        reset();
    }
}
