//! The per-instance producer/consumer rendezvous between a feeder (the session, or a
//! producer instance delivering a passthrough datum) and the worker thread that runs a
//! decoder instance's script.
//!
//! Modeled as a bounded-capacity-1 channel with two condition variables rather than a
//! single channel, to keep "buffer delivered" and "buffer consumed" as distinct observable
//! states — the session-driven feed loop waits for the latter before moving on to the next
//! instance, and a single rendezvous would conflate the two.

use std::sync::{Condvar, Mutex};

/// What the worker observed when it last blocked waiting for new input.
pub enum WorkerSignal<T> {
    NewItem(T),
    Eof,
    Terminate,
}

/// What the feeder observed after handing off an item.
pub enum FeedOutcome {
    /// The worker consumed the item in the usual way.
    Consumed,
    /// The instance had already run to completion on its own (a normal, spec-legal finish,
    /// e.g. a decoder whose script returns after a fixed preamble) — there is no worker left
    /// to consume anything, but this is not a termination request, so the feeder must not
    /// treat it as an error.
    Finished,
    /// The instance was actually cancelled, concurrently or beforehand, via
    /// `signal_terminate`.
    Terminated,
}

struct State<T> {
    pending: Option<T>,
    available: bool,
    consumed: bool,
    want_terminate: bool,
    communicate_eof: bool,
    /// Set once the worker has run to completion on its own, as opposed to being cancelled.
    /// Distinct from `want_terminate` so a feeder calling `feed()` afterward gets
    /// `FeedOutcome::Finished`, not `FeedOutcome::Terminated` (spec.md §7: `ERR_TERM_REQ` is
    /// reserved for an instance terminated concurrently, not one that finished cleanly).
    finished: bool,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            pending: None,
            available: false,
            consumed: true,
            want_terminate: false,
            communicate_eof: false,
            finished: false,
        }
    }
}

pub struct Handshake<T> {
    state: Mutex<State<T>>,
    cv_available: Condvar,
    cv_consumed: Condvar,
}

impl<T> Handshake<T> {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()), cv_available: Condvar::new(), cv_consumed: Condvar::new() }
    }

    /// Feeder side: installs `item`, wakes the worker, then blocks until the worker has
    /// fully consumed it, finished on its own, or was terminated.
    ///
    /// Checks `finished`/`want_terminate` up front too: a worker that already ran to
    /// completion (or was already cancelled) before this call will never consume anything,
    /// so blocking on the usual rendezvous would hang forever.
    pub fn feed(&self, item: T) -> FeedOutcome {
        let mut g = self.state.lock().unwrap();
        if g.finished {
            return FeedOutcome::Finished;
        }
        if g.want_terminate {
            return FeedOutcome::Terminated;
        }
        g.pending = Some(item);
        g.available = true;
        g.consumed = false;
        self.cv_available.notify_one();
        let g = self
            .cv_consumed
            .wait_while(g, |s| !s.consumed && !s.want_terminate && !s.finished)
            .unwrap();
        if g.finished {
            FeedOutcome::Finished
        } else if g.want_terminate {
            FeedOutcome::Terminated
        } else {
            FeedOutcome::Consumed
        }
    }

    /// Worker side: marks the instance as having run to completion on its own. Unlike
    /// `signal_terminate`, this is not a cancellation — a feeder blocked in (or later
    /// calling) `feed` observes `FeedOutcome::Finished`, not `FeedOutcome::Terminated`.
    pub fn signal_finished(&self) {
        let mut g = self.state.lock().unwrap();
        g.finished = true;
        self.cv_consumed.notify_all();
        self.cv_available.notify_all();
    }

    /// Feeder side: causes the worker's next blocking wait to observe end-of-stream.
    pub fn signal_eof(&self) {
        let mut g = self.state.lock().unwrap();
        g.communicate_eof = true;
        self.cv_available.notify_all();
    }

    /// Feeder side: causes the worker's next blocking wait to observe termination, and
    /// unblocks any feeder currently parked in `feed`.
    pub fn signal_terminate(&self) {
        let mut g = self.state.lock().unwrap();
        g.want_terminate = true;
        self.cv_available.notify_all();
        self.cv_consumed.notify_all();
    }

    pub fn want_terminate(&self) -> bool {
        self.state.lock().unwrap().want_terminate
    }

    /// Worker side: marks the current item consumed and blocks until a new one arrives, or
    /// termination/EOF is signaled.
    pub fn mark_consumed_and_wait(&self) -> WorkerSignal<T>
    where
        T: Clone,
    {
        let mut g = self.state.lock().unwrap();
        g.consumed = true;
        g.available = false;
        self.cv_consumed.notify_one();
        let mut g = self
            .cv_available
            .wait_while(g, |s| !s.available && !s.want_terminate && !s.communicate_eof)
            .unwrap();
        if g.want_terminate {
            WorkerSignal::Terminate
        } else if g.available {
            WorkerSignal::NewItem(g.pending.take().expect("available implies pending is set"))
        } else {
            WorkerSignal::Eof
        }
    }

    /// Resets all flags and drops any pending item, so the instance can be re-run without
    /// reloading the decoder.
    pub fn reset(&self) {
        *self.state.lock().unwrap() = State::default();
    }
}

impl<T> Default for Handshake<T> {
    fn default() -> Self {
        Self::new()
    }
}
