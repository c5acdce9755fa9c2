//! Decodes packed samples into per-channel pin values for one decoder instance and keeps
//! the previous-pins snapshot that edge detection needs.

use crate::buffer::SampleBuffer;
use crate::error::{Error, Result};
use crate::instance::InitialPin;

/// Tracks an instance's absolute position in the sample stream and the pin values at the
/// current and previous sample for every one of its (mapped) decoder channels.
#[derive(Clone)]
pub struct SampleCursor {
    /// decoder-channel index -> stream-channel index, `None` means unassigned.
    channel_map: Vec<Option<usize>>,
    previous: Vec<u8>,
    abs_cur: u64,
    seeded: bool,
}

impl SampleCursor {
    pub fn new(num_channels: usize) -> Self {
        Self { channel_map: vec![None; num_channels], previous: vec![0; num_channels], abs_cur: 0, seeded: false }
    }

    pub fn set_channel_map(&mut self, map: Vec<Option<usize>>) {
        self.previous.resize(map.len(), 0);
        self.channel_map = map;
    }

    pub fn samplenum(&self) -> u64 {
        self.abs_cur
    }

    pub fn set_samplenum(&mut self, s: u64) {
        self.abs_cur = s;
    }

    fn stream_channel(&self, ch: usize) -> Result<usize> {
        self.channel_map
            .get(ch)
            .copied()
            .flatten()
            .ok_or_else(|| Error::bug(format!("decoder channel {ch} is not assigned to a stream channel")))
    }

    /// Pin value for `ch` at the cursor's current sample.
    pub fn current(&self, buf: &SampleBuffer, ch: usize) -> Result<u8> {
        let sc = self.stream_channel(ch)?;
        buf.channel_bit(self.abs_cur, sc)
    }

    /// Pin value for `ch` at the sample before the cursor's current one (or the configured
    /// initial pin, if the cursor has never advanced past sample 0).
    pub fn previous(&self, ch: usize) -> Result<u8> {
        self.stream_channel(ch)?;
        Ok(self.previous[ch])
    }

    /// Seeds the previous-pins snapshot for sample -1. Only meaningful, and only applied
    /// once, at the very start of a session (`abs_cur == 0`).
    pub fn seed_initial_pins(&mut self, initial: &[InitialPin], buf: &SampleBuffer) -> Result<()> {
        if self.seeded {
            return Ok(());
        }
        for (ch, pin) in initial.iter().enumerate() {
            if self.channel_map.get(ch).copied().flatten().is_none() {
                continue;
            }
            self.previous[ch] = match pin {
                InitialPin::Low => 0,
                InitialPin::High => 1,
                InitialPin::SameAsSample0 => self.current(buf, ch)?,
            };
        }
        self.seeded = true;
        Ok(())
    }

    /// Rolls `previous` forward to the cursor's current sample without moving the cursor
    /// itself. Called when a `wait()` call returns a match: the matched sample becomes its
    /// own "previous" sample, so re-evaluating the same (or a new) condition list at the
    /// unmoved cursor does not re-fire an edge that already matched.
    pub fn sync_previous(&mut self, buf: &SampleBuffer) -> Result<()> {
        for ch in 0..self.previous.len() {
            if self.channel_map.get(ch).copied().flatten().is_some() {
                self.previous[ch] = self.current(buf, ch)?;
            }
        }
        Ok(())
    }

    /// Advances the cursor by exactly one sample. `previous` is rolled forward from the
    /// sample the cursor is leaving, before `abs_cur` itself moves.
    pub fn advance(&mut self, buf: &SampleBuffer) -> Result<()> {
        self.sync_previous(buf)?;
        self.abs_cur += 1;
        Ok(())
    }
}
