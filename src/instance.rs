//! A single running decoder: its configuration, its worker thread, and the `wait`/`put`
//! handshake that thread uses to talk to the feeder and to the instances stacked above it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

use crate::buffer::SampleBuffer;
use crate::condition::{reset_skips, ConditionList};
use crate::cursor::SampleCursor;
use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::handshake::{FeedOutcome, Handshake, WorkerSignal};
use crate::matcher;
use crate::output::{MetaDescriptor, OutputType, Payload, PdOutput, ProtocolDatum};
use crate::router;
use crate::session::Session;
use crate::value::{Value, ValueKind};

/// Initial-pin values a channel is seeded with for "sample -1", so edge detection is
/// well-defined at sample 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum InitialPin {
    Low = 0,
    High = 1,
    SameAsSample0 = 2,
}

/// Decoder instance lifecycle, spec.md §3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Running,
    EofSignaled,
    Terminated,
}

/// The result a `wait()` call hands back to the decoder script: the sample at which the
/// match occurred, the pin values there, and which top-level condition sets matched.
#[derive(Clone, Debug)]
pub struct WaitResult {
    pub samplenum: u64,
    pub pins: Vec<u8>,
    pub matched: Vec<bool>,
}

/// The native stand-in for the embedded scripting runtime: a decoder script, reduced to
/// the lifecycle hooks and two decode entry points the core actually drives. A decoder is
/// either root-only (implements `decode`, fed sample buffers and running on its own worker
/// thread) or stacked-only (implements `decode_passthrough`, fed one datum at a time by
/// direct, synchronous invocation from its producer's thread, spec.md §5); both default to
/// a no-op so a decoder only needs to implement the one it actually uses.
pub trait DecoderLogic: Send {
    fn start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn reset(&mut self) {}

    /// Root entry point. Called once per instance run and expected to loop internally,
    /// calling `ctx.wait(...)` the way a real decoder's `decode()` method would.
    fn decode(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Stacked entry point. Called once per passthrough datum a producer `put()`s, inside
    /// the producer's own thread — never on a worker thread of its own.
    fn decode_passthrough(&mut self, ctx: &mut Context, datum: &ProtocolDatum) -> Result<()> {
        let _ = (ctx, datum);
        Ok(())
    }
}

struct Config {
    options: HashMap<String, Value>,
    channel_map: Vec<Option<usize>>,
    initial_pins: Vec<InitialPin>,
    next: Vec<Arc<Instance>>,
    outputs: Vec<Arc<PdOutput>>,
    next_output_id: u64,
}

struct Runtime {
    lifecycle: LifecycleState,
    logic: Option<Box<dyn DecoderLogic>>,
    cursor: SampleCursor,
    condition_list: ConditionList,
    current_samples: Option<SampleBuffer>,
    last_error: Option<String>,
}

/// One configured, possibly-running decoder bound to a session.
pub struct Instance {
    pub id: u64,
    pub decoder: Arc<Decoder>,
    session: Weak<Session>,
    is_root: AtomicBool,
    config: Mutex<Config>,
    runtime: Mutex<Runtime>,
    samples_in: Handshake<SampleBuffer>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Instance {
    pub(crate) fn new(
        id: u64,
        decoder: Arc<Decoder>,
        session: Weak<Session>,
        options: HashMap<String, Value>,
        logic: Box<dyn DecoderLogic>,
    ) -> Arc<Instance> {
        let num_channels = decoder.total_channels();
        Arc::new(Instance {
            id,
            decoder,
            session,
            is_root: AtomicBool::new(true),
            config: Mutex::new(Config {
                options,
                channel_map: vec![None; num_channels],
                initial_pins: vec![InitialPin::Low; num_channels],
                next: Vec::new(),
                outputs: Vec::new(),
                next_output_id: 0,
            }),
            runtime: Mutex::new(Runtime {
                lifecycle: LifecycleState::Initialized,
                logic: Some(logic),
                cursor: SampleCursor::new(num_channels),
                condition_list: Vec::new(),
                current_samples: None,
                last_error: None,
            }),
            samples_in: Handshake::new(),
            worker: Mutex::new(None),
        })
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.is_root.load(Ordering::SeqCst)
    }

    pub(crate) fn set_root(&self, value: bool) {
        self.is_root.store(value, Ordering::SeqCst);
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.runtime.lock().unwrap().lifecycle
    }

    fn require_unstarted(&self) -> Result<()> {
        match self.lifecycle() {
            LifecycleState::Initialized | LifecycleState::Uninitialized => Ok(()),
            _ => Err(Error::arg("instance configuration must happen before session_start")),
        }
    }

    pub fn option_set(&self, id: &str, value: Value) -> Result<()> {
        self.require_unstarted()?;
        let option = self
            .decoder
            .option(id)
            .ok_or_else(|| Error::arg(format!("unknown option: {id}")))?;
        if value.kind() != option.default.kind() {
            return Err(Error::arg(format!("option {id} expects a {:?} value", option.default.kind())));
        }
        if let Some(allowed) = &option.allowed {
            if !allowed.contains(&value) {
                return Err(Error::arg(format!("value not in the allowed set for option {id}")));
            }
        }
        self.config.lock().unwrap().options.insert(id.to_string(), value);
        Ok(())
    }

    pub fn channel_set_all(&self, map: Vec<Option<usize>>) -> Result<()> {
        self.require_unstarted()?;
        if map.len() != self.decoder.total_channels() {
            return Err(Error::arg("channel map length must equal the decoder's declared channel count"));
        }
        self.config.lock().unwrap().channel_map = map;
        Ok(())
    }

    pub fn initial_pins_set_all(&self, pins: Vec<InitialPin>) -> Result<()> {
        self.require_unstarted()?;
        if pins.len() != self.decoder.total_channels() {
            return Err(Error::arg("initial pins length must equal the decoder's declared channel count"));
        }
        self.config.lock().unwrap().initial_pins = pins;
        Ok(())
    }

    pub fn option(&self, id: &str) -> Option<Value> {
        self.config.lock().unwrap().options.get(id).cloned()
    }

    pub fn channel_by_name(&self, id: &str) -> Option<usize> {
        let decoder_idx = self.decoder.channel_index(id)?;
        self.config.lock().unwrap().channel_map.get(decoder_idx).copied().flatten()
    }

    /// Required channels must all be assigned before a session can start.
    fn required_channels_assigned(&self) -> bool {
        let cfg = self.config.lock().unwrap();
        (0..self.decoder.channels.len()).all(|idx| cfg.channel_map.get(idx).copied().flatten().is_some())
    }

    pub(crate) fn push_next(&self, next: Arc<Instance>) {
        self.config.lock().unwrap().next.push(next);
    }

    pub(crate) fn next_snapshot(&self) -> Vec<Arc<Instance>> {
        self.config.lock().unwrap().next.clone()
    }

    pub fn pd_output_new(&self, output_type: OutputType, proto_id: impl Into<String>) -> Arc<PdOutput> {
        self.pd_output_new_with_meta(output_type, proto_id, None)
    }

    /// Registers a `Meta` output binding, carrying the type descriptor and human
    /// name/description spec.md §3 requires for `META` outputs (`router::put` validates a
    /// `put()`'s `Value` kind against `value_kind` before dispatching).
    pub fn pd_output_new_meta(
        &self,
        proto_id: impl Into<String>,
        value_kind: ValueKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Arc<PdOutput> {
        self.pd_output_new_with_meta(
            OutputType::Meta,
            proto_id,
            Some(MetaDescriptor { value_kind, name: name.into(), description: description.into() }),
        )
    }

    fn pd_output_new_with_meta(
        &self,
        output_type: OutputType,
        proto_id: impl Into<String>,
        meta: Option<MetaDescriptor>,
    ) -> Arc<PdOutput> {
        let mut cfg = self.config.lock().unwrap();
        let id = cfg.next_output_id;
        cfg.next_output_id += 1;
        let output = Arc::new(PdOutput { id, output_type, proto_id: proto_id.into(), owner_instance: self.id, meta });
        cfg.outputs.push(output.clone());
        output
    }

    /// Spawns a worker for this instance if (and only if) it is a root, then recurses into
    /// every instance stacked above it. Per spec.md §5, a root decoder instance gets its own
    /// worker thread; a stacked instance has none of its own — it is driven later by direct,
    /// synchronous invocation from its producer's thread during `put()` (see
    /// `deliver_passthrough`). A stacked instance's `start()` hook still needs to run exactly
    /// once before the first datum can reach it, so it runs here, synchronously, in whichever
    /// thread called `session_start`.
    pub(crate) fn spawn_tree(self: &Arc<Self>) -> Result<()> {
        if !self.required_channels_assigned() {
            return Err(Error::arg(format!("instance {} has unassigned required channels", self.id)));
        }
        {
            let channel_map = self.config.lock().unwrap().channel_map.clone();
            let mut rt = self.runtime.lock().unwrap();
            rt.cursor.set_channel_map(channel_map);
            rt.lifecycle = LifecycleState::Running;
        }
        if self.is_root() {
            let mut worker_guard = self.worker.lock().unwrap();
            if worker_guard.is_none() {
                let inst = self.clone();
                *worker_guard = Some(thread::spawn(move || run_worker(inst)));
            }
        } else {
            self.start_stacked();
        }
        for next in self.next_snapshot() {
            next.spawn_tree()?;
        }
        Ok(())
    }

    /// Runs a stacked instance's one-time `start()` hook, synchronously, catching a panic
    /// the same way the root worker's `run_worker` does (spec.md §7).
    fn start_stacked(&self) {
        let logic = self.runtime.lock().unwrap().logic.take();
        let Some(mut logic) = logic else { return };
        let result = {
            let mut ctx = Context::new(self);
            catch_decoder(self, || logic.start(&mut ctx))
        };
        self.runtime.lock().unwrap().logic = Some(logic);
        if let Err(e) = result {
            self.note_script_error(&e);
            self.set_lifecycle(LifecycleState::Terminated);
        }
    }

    /// Feeds one buffer to this (root) instance. `FeedOutcome::Finished` — the instance
    /// already ran to completion on its own, a normal, spec-legal outcome — is *not* an
    /// error: it must not abort `Session::send`'s per-root fan-out loop, since spec.md §5
    /// drives every root in declaration order regardless of whether an earlier one has
    /// already finished. Only an actual concurrent termination surfaces as
    /// `Error::TerminateRequested`.
    pub fn feed_samples(&self, buf: SampleBuffer) -> Result<()> {
        match self.samples_in.feed(buf) {
            FeedOutcome::Consumed | FeedOutcome::Finished => Ok(()),
            FeedOutcome::Terminated => Err(Error::TerminateRequested),
        }
    }

    /// Delivers one passthrough datum to a stacked instance by calling its
    /// `decode_passthrough` hook directly, inline, in the caller's own thread — the caller
    /// is always the producer's worker thread, reached via `router::put`. No handshake, no
    /// suspension point: this is the whole of the "direct invocation" half of spec.md §5's
    /// execution model.
    pub(crate) fn deliver_passthrough(&self, datum: ProtocolDatum) -> Result<()> {
        if matches!(self.lifecycle(), LifecycleState::Terminated | LifecycleState::EofSignaled) {
            return Err(Error::TerminateRequested);
        }
        let logic = self.runtime.lock().unwrap().logic.take();
        let Some(mut logic) = logic else {
            return Err(Error::TerminateRequested);
        };
        let result = {
            let mut ctx = Context::new(self);
            catch_decoder(self, || logic.decode_passthrough(&mut ctx, &datum))
        };
        self.runtime.lock().unwrap().logic = Some(logic);
        if let Err(e) = result {
            self.note_script_error(&e);
            self.set_lifecycle(LifecycleState::Terminated);
            return Err(Error::TerminateRequested);
        }
        Ok(())
    }

    /// Only meaningful for a root: a stacked instance has no sample handshake of its own to
    /// signal, since it is driven by direct invocation rather than a blocking read.
    pub(crate) fn signal_eof(&self) {
        self.samples_in.signal_eof();
    }

    pub(crate) fn signal_terminate(&self) {
        self.samples_in.signal_terminate();
    }

    pub(crate) fn join_worker(&self) {
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Resets every instance in the stack rooted here back to `Initialized`, rebuilding its
    /// cursor and re-arming its sample handshake (the latter a no-op for a stacked instance,
    /// which never feeds one). Recurses over the whole tree: every instance's own runtime
    /// state, including its decoder logic's `reset()` hook, needs clearing before a restart,
    /// whether or not it owns a worker thread.
    pub(crate) fn reset_tree(&self) {
        self.samples_in.reset();
        {
            let channel_map = self.config.lock().unwrap().channel_map.clone();
            let mut rt = self.runtime.lock().unwrap();
            rt.lifecycle = LifecycleState::Initialized;
            rt.cursor = SampleCursor::new(self.decoder.total_channels());
            rt.cursor.set_channel_map(channel_map);
            rt.condition_list = Vec::new();
            rt.current_samples = None;
            rt.last_error = None;
            if let Some(logic) = rt.logic.as_mut() {
                logic.reset();
            }
        }
        for next in self.next_snapshot() {
            next.reset_tree();
        }
    }

    pub fn samplenum(&self) -> u64 {
        self.runtime.lock().unwrap().cursor.samplenum()
    }

    /// Core of `wait()`: installs the condition list, then repeatedly evaluates it against
    /// the sample stream, pulling in new sample buffers across blocking points as needed.
    /// Only meaningful for a root (sample-fed) instance.
    pub fn wait(&self, conditions: ConditionList) -> Result<WaitResult> {
        if !self.is_root() {
            return Err(Error::bug("wait() called on a passthrough-fed stacked instance"));
        }
        let is_empty = conditions.is_empty();
        {
            let mut rt = self.runtime.lock().unwrap();
            rt.condition_list = conditions;
            reset_skips(&mut rt.condition_list);
        }

        // Empty condition list: advance exactly one sample and return with empty results
        // (spec.md §9's resolution for this otherwise-unspecified case).
        if is_empty {
            self.ensure_samples_available()?;
            let mut rt = self.runtime.lock().unwrap();
            let buf = rt.current_samples.clone().expect("ensure_samples_available populates a buffer");
            rt.cursor.advance(&buf)?;
            return Ok(WaitResult { samplenum: rt.cursor.samplenum(), pins: Vec::new(), matched: Vec::new() });
        }

        loop {
            if self.samples_in.want_terminate() {
                return Err(Error::TerminateRequested);
            }
            self.ensure_samples_available()?;
            let mut rt = self.runtime.lock().unwrap();
            let buf = rt.current_samples.clone().expect("ensure_samples_available populates a buffer");
            if rt.cursor.samplenum() == 0 {
                let initial_pins = self.config.lock().unwrap().initial_pins.clone();
                rt.cursor.seed_initial_pins(&initial_pins, &buf)?;
            }
            let Runtime { cursor, condition_list, .. } = &mut *rt;
            match matcher::evaluate(&*cursor, &buf, condition_list)? {
                Some(matched) => {
                    let pins = (0..self.decoder.total_channels())
                        .map(|ch| cursor.current(&buf, ch).unwrap_or(0))
                        .collect();
                    let samplenum = cursor.samplenum();
                    // A re-armed wait() at the same, unmoved sample must not re-trigger the
                    // edge that just matched (spec.md §4.3 step 4).
                    cursor.sync_previous(&buf)?;
                    return Ok(WaitResult { samplenum, pins, matched });
                }
                None => {
                    cursor.advance(&buf)?;
                }
            }
        }
    }

    /// Blocks until a buffer covering the cursor's current sample is installed, pulling a
    /// new one from the handshake if the previous one has been fully consumed.
    ///
    /// `mark_consumed_and_wait` is safe to call even before any buffer has ever arrived:
    /// the handshake starts in the "consumed" state, so the first call simply blocks for
    /// the first buffer without disturbing a feeder (there isn't one blocked yet).
    fn ensure_samples_available(&self) -> Result<()> {
        loop {
            {
                let rt = self.runtime.lock().unwrap();
                if let Some(buf) = &rt.current_samples {
                    if rt.cursor.samplenum() < buf.abs_end_samplenum() {
                        return Ok(());
                    }
                }
            }
            match self.samples_in.mark_consumed_and_wait() {
                WorkerSignal::NewItem(buf) => {
                    self.runtime.lock().unwrap().current_samples = Some(buf);
                }
                WorkerSignal::Terminate => return Err(Error::TerminateRequested),
                WorkerSignal::Eof => return Err(Error::EndOfStream),
            }
        }
    }

    pub fn put(&self, start: u64, end: u64, output: &Arc<PdOutput>, payload: Payload) -> Result<()> {
        router::put(self, start, end, output, payload)
    }

    fn record_error(&self, message: String) {
        self.runtime.lock().unwrap().last_error = Some(message);
    }

    pub fn last_error(&self) -> Option<String> {
        self.runtime.lock().unwrap().last_error.clone()
    }

    fn set_lifecycle(&self, state: LifecycleState) {
        self.runtime.lock().unwrap().lifecycle = state;
    }

    fn note_script_error(&self, e: &Error) {
        log::error!("decoder instance {} raised a script error at sample {}: {e}", self.id, self.samplenum());
        self.record_error(e.to_string());
    }
}

/// Everything a decoder script's `start`/`decode` methods can touch. The only two
/// synchronous primitives are `wait` and `put`; everything else is a read-only accessor.
pub struct Context<'a> {
    instance: &'a Instance,
}

impl<'a> Context<'a> {
    fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    pub fn wait(&mut self, conditions: ConditionList) -> Result<WaitResult> {
        self.instance.wait(conditions)
    }

    pub fn put(&mut self, start: u64, end: u64, output: &Arc<PdOutput>, payload: Payload) -> Result<()> {
        self.instance.put(start, end, output, payload)
    }

    pub fn samplenum(&self) -> u64 {
        self.instance.samplenum()
    }

    pub fn option(&self, id: &str) -> Option<Value> {
        self.instance.option(id)
    }

    pub fn channel(&self, id: &str) -> Option<usize> {
        self.instance.channel_by_name(id)
    }

    pub fn output_new(&mut self, output_type: OutputType, proto_id: impl Into<String>) -> Arc<PdOutput> {
        self.instance.pd_output_new(output_type, proto_id)
    }

    /// Registers a `Meta` output binding with its type descriptor and human
    /// name/description (spec.md §3).
    pub fn output_new_meta(
        &mut self,
        proto_id: impl Into<String>,
        value_kind: ValueKind,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Arc<PdOutput> {
        self.instance.pd_output_new_meta(proto_id, value_kind, name, description)
    }
}

fn run_worker(inst: Arc<Instance>) {
    let mut logic = inst
        .runtime
        .lock()
        .unwrap()
        .logic
        .take()
        .expect("a worker is only spawned once per instance run");
    let result = {
        let mut ctx = Context::new(&inst);
        catch_decoder(&inst, || logic.start(&mut ctx).and_then(|()| logic.decode(&mut ctx)))
    };
    inst.runtime.lock().unwrap().logic = Some(logic);
    // Make sure a feeder blocked in (or later calling) `send`/`send_eof` for this instance
    // is never stuck, even if the script returned without ever calling wait() again. A clean
    // finish or an end-of-stream signal is not a cancellation, so those use
    // `signal_finished` — a feeder must see `FeedOutcome::Finished`, not `Terminated`,
    // otherwise every later root in the same `Session::send` fan-out would be skipped once
    // an earlier one finishes naturally (spec.md §5's declaration-order guarantee applies to
    // every root regardless).
    match result {
        Ok(()) => {
            inst.set_lifecycle(LifecycleState::Terminated);
            inst.samples_in.signal_finished();
        }
        Err(Error::TerminateRequested) => {
            inst.set_lifecycle(LifecycleState::Terminated);
            inst.samples_in.signal_terminate();
        }
        Err(Error::EndOfStream) => {
            inst.set_lifecycle(LifecycleState::EofSignaled);
            inst.samples_in.signal_finished();
        }
        Err(e) => {
            inst.note_script_error(&e);
            inst.set_lifecycle(LifecycleState::Terminated);
            inst.samples_in.signal_finished();
        }
    }
}

/// Runs a decoder-logic call, catching a Rust panic at this script/native boundary the way
/// a real embedded scripting runtime catches a raised exception (spec.md §7), and mapping
/// it onto the same `Error::Script` path an ordinary `Err` return takes. Without this, a
/// panicking decoder would unwind straight through the worker thread (or the producer's
/// thread, for a stacked instance), killing it silently and risking a poisoned mutex for
/// every other instance sharing this process.
fn catch_decoder<F>(inst: &Instance, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Script {
            instance: inst.id,
            samplenum: inst.samplenum(),
            source: Box::new(PanicMessage(panic_message(payload))),
        }),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "decoder logic panicked with a non-string payload".to_string()
    }
}

#[derive(Debug)]
struct PanicMessage(String);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PanicMessage {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{ChannelDef, OptionDef};
    use std::collections::HashMap;

    struct NoOp;
    impl DecoderLogic for NoOp {
        fn decode(&mut self, _ctx: &mut Context) -> Result<()> {
            Ok(())
        }
    }

    fn toy_decoder() -> Arc<Decoder> {
        Arc::new(Decoder {
            id: "toy".into(),
            name: "toy".into(),
            longname: "toy".into(),
            desc: "".into(),
            license: "MIT".into(),
            inputs: vec!["logic".into()],
            outputs: vec!["toy".into()],
            tags: vec![],
            channels: vec![ChannelDef::new("a", "A", "", 0)],
            optional_channels: vec![ChannelDef::new("b", "B", "", 1)],
            options: vec![OptionDef::new("rate", Value::U64(9600))],
            annotations: vec![],
            annotation_rows: vec![],
            binary: vec![],
            logic_output_channels: vec![],
            api_version: 3,
        })
    }

    fn toy_instance() -> Arc<Instance> {
        Instance::new(0, toy_decoder(), Weak::new(), HashMap::new(), Box::new(NoOp))
    }

    #[test]
    fn option_set_validates_kind_and_allowed_set() {
        let inst = toy_instance();
        assert!(inst.option_set("rate", Value::U64(115200)).is_ok());
        assert_eq!(inst.option("rate"), Some(Value::U64(115200)));
        assert!(inst.option_set("rate", Value::String("nope".into())).is_err());
        assert!(inst.option_set("nonexistent", Value::U64(1)).is_err());
    }

    #[test]
    fn channel_set_all_requires_matching_length() {
        let inst = toy_instance();
        assert!(inst.channel_set_all(vec![Some(0)]).is_err());
        assert!(inst.channel_set_all(vec![Some(0), None]).is_ok());
        assert_eq!(inst.channel_by_name("a"), Some(0));
        assert_eq!(inst.channel_by_name("b"), None);
    }

    #[test]
    fn initial_pins_set_all_requires_matching_length() {
        let inst = toy_instance();
        assert!(inst.initial_pins_set_all(vec![InitialPin::Low]).is_err());
        assert!(inst.initial_pins_set_all(vec![InitialPin::Low, InitialPin::High]).is_ok());
    }

    #[test]
    fn pd_output_new_assigns_increasing_ids() {
        let inst = toy_instance();
        let a = inst.pd_output_new(OutputType::Ann, "toy");
        let b = inst.pd_output_new(OutputType::Binary, "toy");
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
    }

    #[test]
    fn configuration_is_rejected_once_spawned() {
        let inst = toy_instance();
        inst.channel_set_all(vec![Some(0), None]).unwrap();
        inst.spawn_tree().unwrap();
        assert!(inst.option_set("rate", Value::U64(1)).is_err());
        inst.signal_terminate();
        inst.join_worker();
        inst.reset_tree();
    }

    #[test]
    fn spawn_tree_fails_with_unassigned_required_channel() {
        let inst = toy_instance();
        assert!(inst.spawn_tree().is_err());
    }

    struct Panics;
    impl DecoderLogic for Panics {
        fn decode(&mut self, _ctx: &mut Context) -> Result<()> {
            panic!("boom");
        }
    }

    /// A panic inside decoder logic must be caught at the worker boundary and surfaced as
    /// `Error::Script`, not unwind straight through the worker thread.
    #[test]
    fn a_panicking_root_decoder_surfaces_as_a_script_error_not_a_thread_crash() {
        use std::time::{Duration, Instant};

        let inst = Instance::new(0, toy_decoder(), Weak::new(), HashMap::new(), Box::new(Panics));
        inst.channel_set_all(vec![Some(0), None]).unwrap();
        inst.spawn_tree().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while matches!(inst.lifecycle(), LifecycleState::Running) {
            assert!(Instant::now() < deadline, "worker never left the running state");
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(inst.lifecycle(), LifecycleState::Terminated);
        assert!(inst.last_error().unwrap().contains("boom"));
        inst.signal_terminate();
        inst.join_worker();
        inst.reset_tree();
    }
}
