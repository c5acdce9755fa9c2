//! Owns a set of decoder instances arranged in stacks, the frontend's output callbacks,
//! and session metadata; drives the `start`/`send`/`send_eof`/`terminate_reset`/`destroy`
//! lifecycle described in spec.md §4.5.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::buffer::SampleBuffer;
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::instance::{DecoderLogic, Instance};
use crate::output::{OutputType, ProtocolDatum};
use crate::value::{Value, ValueKind};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Recognized `(key, value-kind)` pairs for `metadata_set`. Today only `SAMPLERATE` is
/// defined (spec.md §6's config-keys table); `Other` models any unrecognized numeric key so
/// the boundary behavior in spec.md §8 ("unknown key e.g. -1, 9, 123 -> non-OK") is
/// expressible without Rust's type system silently ruling it out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetadataKey {
    SampleRate,
    Other(i32),
}

pub const METADATA_KEY_SAMPLERATE: i32 = 10000;

pub type OutputCallback = Arc<dyn Fn(&ProtocolDatum) + Send + Sync>;

struct State {
    roots: Vec<Arc<Instance>>,
    callbacks: HashMap<OutputType, OutputCallback>,
    metadata: HashMap<&'static str, Value>,
    next_instance_id: u64,
}

/// A decoding session: a stack of decoder instances, callbacks, and metadata.
pub struct Session {
    id: u64,
    started: AtomicBool,
    state: Mutex<State>,
}

impl Session {
    pub fn new() -> Arc<Session> {
        Arc::new(Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst),
            started: AtomicBool::new(false),
            state: Mutex::new(State {
                roots: Vec::new(),
                callbacks: HashMap::new(),
                metadata: HashMap::new(),
                next_instance_id: 0,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// `session_metadata_set`.
    pub fn metadata_set(&self, key: MetadataKey, value: Value) -> Result<()> {
        match key {
            MetadataKey::SampleRate => {
                if value.kind() != ValueKind::U64 {
                    return Err(Error::arg("SAMPLERATE requires a u64 value"));
                }
                self.state.lock().unwrap().metadata.insert("samplerate", value);
                Ok(())
            }
            MetadataKey::Other(k) => Err(Error::arg(format!("unknown metadata key: {k}"))),
        }
    }

    pub fn metadata_get(&self, key: MetadataKey) -> Option<Value> {
        match key {
            MetadataKey::SampleRate => self.state.lock().unwrap().metadata.get("samplerate").cloned(),
            MetadataKey::Other(_) => None,
        }
    }

    /// `inst_new`: creates a decoder instance and appends it to the session's root list.
    /// `logic` stands in for the scripting runtime's would-be-loaded decoder module
    /// (spec.md §6's out-of-scope on-disk loader; see DESIGN.md).
    pub fn inst_new(
        self: &Arc<Self>,
        decoder: Arc<Decoder>,
        options: HashMap<String, Value>,
        logic: Box<dyn DecoderLogic>,
    ) -> Result<Arc<Instance>> {
        if self.is_started() {
            return Err(Error::arg("cannot create an instance after session_start"));
        }
        let resolved = resolve_options(&decoder, options)?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_instance_id;
        state.next_instance_id += 1;
        let instance = Instance::new(id, decoder, Arc::downgrade(self), resolved, logic);
        state.roots.push(instance.clone());
        Ok(instance)
    }

    /// `inst_stack(from, to)`: moves `to` out of the root list into `from`'s `next` chain.
    pub fn inst_stack(&self, from: &Arc<Instance>, to: &Arc<Instance>) -> Result<()> {
        if self.is_started() {
            return Err(Error::arg("cannot stack instances after session_start"));
        }
        if Arc::ptr_eq(from, to) {
            return Err(Error::arg("an instance cannot be stacked onto itself"));
        }
        if reaches(to, from) {
            return Err(Error::arg("stacking would create a cycle"));
        }
        if !to.decoder.inputs.iter().any(|input| from.decoder.outputs.contains(input)) {
            return Err(Error::arg("`to`'s declared input id does not match any of `from`'s declared outputs"));
        }
        let mut state = self.state.lock().unwrap();
        let pos = state
            .roots
            .iter()
            .position(|inst| Arc::ptr_eq(inst, to))
            .ok_or_else(|| Error::arg("`to` is not a root instance in this session"))?;
        let moved = state.roots.remove(pos);
        drop(state);
        moved.set_root(false);
        from.push_next(moved);
        Ok(())
    }

    /// `inst_find_by_id`: linear search across roots and their `next` chains.
    pub fn inst_find_by_id(&self, id: u64) -> Option<Arc<Instance>> {
        fn search(list: &[Arc<Instance>], id: u64) -> Option<Arc<Instance>> {
            for inst in list {
                if inst.id == id {
                    return Some(inst.clone());
                }
                if let Some(found) = search(&inst.next_snapshot(), id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.state.lock().unwrap().roots, id)
    }

    /// `session_start`: spawns a worker for every root instance (and, recursively, every
    /// instance stacked above it — see `Instance::spawn_tree`).
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::arg("session already started"));
        }
        let roots = self.state.lock().unwrap().roots.clone();
        for root in &roots {
            root.spawn_tree()?;
        }
        Ok(())
    }

    /// `session_send`: feeds each root instance, in declaration order, waiting for each to
    /// consume the buffer before moving on to the next.
    pub fn send(&self, buf: SampleBuffer) -> Result<()> {
        if !self.is_started() {
            return Err(Error::arg("session has not been started"));
        }
        let roots = self.state.lock().unwrap().roots.clone();
        for root in &roots {
            root.feed_samples(buf.clone())?;
        }
        Ok(())
    }

    /// `session_send_eof`: every root instance's next `wait()` raises end-of-stream. Stacked
    /// instances have no handshake of their own to signal — they are driven by direct
    /// invocation from their producer, so they simply stop being called once their producer
    /// does.
    pub fn send_eof(&self) -> Result<()> {
        let roots = self.state.lock().unwrap().roots.clone();
        for root in &roots {
            root.signal_eof();
        }
        Ok(())
    }

    /// `session_terminate_reset`: cancels every root's worker, joins it, then resets the
    /// whole stack's runtime state so the session can be restarted without reloading
    /// decoders. A root's worker thread is the only thing ever joined here: a stacked
    /// instance has no worker of its own, since its `decode_passthrough` calls run to
    /// completion synchronously, inline, inside its producer's `put()` — by the time a
    /// root's worker has been joined, every stacked instance it could have reached has
    /// already finished running, too.
    pub fn terminate_reset(&self) -> Result<()> {
        let roots = self.state.lock().unwrap().roots.clone();
        for root in &roots {
            root.signal_terminate();
            root.join_worker();
            root.reset_tree();
        }
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// `session_destroy`: idempotent. Tolerates partially-initialized state; the only
    /// Rust-idiomatic analogue of the original's "NULL session" check is calling this twice,
    /// which is harmless here.
    pub fn destroy(&self) -> Result<()> {
        self.terminate_reset()?;
        let mut state = self.state.lock().unwrap();
        state.roots.clear();
        state.callbacks.clear();
        Ok(())
    }

    /// `pd_output_callback_add`: installs at most one callback per output type.
    pub fn pd_output_callback_add(&self, output_type: OutputType, cb: OutputCallback) -> Result<()> {
        self.state.lock().unwrap().callbacks.insert(output_type, cb);
        Ok(())
    }

    pub(crate) fn dispatch(&self, datum: &ProtocolDatum) {
        let cb = self.state.lock().unwrap().callbacks.get(&datum.output_type).cloned();
        if let Some(cb) = cb {
            cb(datum);
        }
    }
}

/// DFS from `node` over `next_di`: does it reach `target`? Used by `inst_stack`'s cycle
/// check (spec.md §4.6, §9: "DFS from `to` over `next_di` must not reach `from`").
fn reaches(node: &Arc<Instance>, target: &Arc<Instance>) -> bool {
    for next in node.next_snapshot() {
        if Arc::ptr_eq(&next, target) || reaches(&next, target) {
            return true;
        }
    }
    false
}

/// Resolves a caller-supplied option map against a decoder's option schema: unknown keys
/// error, missing keys take the schema default, type-mismatched values error.
fn resolve_options(decoder: &Decoder, supplied: HashMap<String, Value>) -> Result<HashMap<String, Value>> {
    for key in supplied.keys() {
        if decoder.option(key).is_none() {
            return Err(Error::arg(format!("unknown option: {key}")));
        }
    }
    let mut resolved = HashMap::new();
    for option in &decoder.options {
        let value = match supplied.get(&option.id) {
            Some(v) => {
                if v.kind() != option.default.kind() {
                    return Err(Error::arg(format!("option {} expects a {:?} value", option.id, option.default.kind())));
                }
                if let Some(allowed) = &option.allowed {
                    if !allowed.contains(v) {
                        return Err(Error::arg(format!("value not in the allowed set for option {}", option.id)));
                    }
                }
                v.clone()
            }
            None => option.default.clone(),
        };
        resolved.insert(option.id.clone(), value);
    }
    Ok(resolved)
}
