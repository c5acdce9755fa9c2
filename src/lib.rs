//! # `opentracedecode`
//!
//! The runtime core of a protocol-decoder library for multi-channel logic-analyzer
//! captures. Frontends feed contiguous sample buffers into a [`Session`](session::Session);
//! the session drives a stack of [`Instance`](instance::Instance)s, each running a
//! user-supplied [`DecoderLogic`](instance::DecoderLogic) that repeatedly calls
//! [`Context::wait`](instance::Context::wait) to block until a sample-level condition
//! holds, and [`Context::put`](instance::Context::put) to emit annotated output.
//!
//! What this crate is **not**: it does not host the scripting runtime a real decoder
//! module would be written in (decoders are plain `DecoderLogic` trait objects here), does
//! not load decoder metadata from disk, does not acquire samples, and does not render
//! annotations. Those are frontend and decoder-loader concerns.
//!
//! ```
//! use opentracedecode::condition::{ConditionSet, ConditionTerm};
//! use opentracedecode::instance::{Context, DecoderLogic};
//! use opentracedecode::error::Result;
//!
//! struct CountEdges;
//!
//! impl DecoderLogic for CountEdges {
//!     fn decode(&mut self, ctx: &mut Context) -> Result<()> {
//!         loop {
//!             let conditions = vec![ConditionSet::new(vec![ConditionTerm::EdgeRising(0)])];
//!             match ctx.wait(conditions) {
//!                 Ok(result) => {
//!                     let _ = result.samplenum;
//!                 }
//!                 Err(_) => return Ok(()),
//!             }
//!         }
//!     }
//! }
//! ```

pub mod buffer;
pub mod condition;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod global;
mod handshake;
pub mod instance;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod registry;
pub mod router;
pub mod session;
pub mod value;

/// The crate's own version, as a `(major, minor, micro)` tuple, mirroring the version
/// getters the public API exposes alongside the decoder/session operations.
pub fn version() -> (u32, u32, u32) {
    (0, 1, 0)
}

/// The crate's version as a `major.minor.micro` string.
pub fn version_str() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
