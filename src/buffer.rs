//! The wire contract for a contiguous chunk of packed multi-channel samples.

use std::sync::Arc;

use bitvec::prelude::*;

use crate::error::{Error, Result};

/// A contiguous chunk of packed samples, as delivered by the frontend to `session_send`.
///
/// Bit `i` of the little-endian value at each sample corresponds to stream channel `i`.
/// Buffers are reference-counted so the same physical capture can be observed by multiple
/// decoder instances (a root and everything stacked beneath it) without copying.
#[derive(Clone)]
pub struct SampleBuffer {
    abs_start_samplenum: u64,
    abs_end_samplenum: u64,
    data: Arc<[u8]>,
    unitsize: usize,
}

impl SampleBuffer {
    pub fn new(abs_start_samplenum: u64, abs_end_samplenum: u64, data: Arc<[u8]>, unitsize: usize) -> Result<Self> {
        if unitsize == 0 {
            return Err(Error::arg("unitsize must be non-zero"));
        }
        if abs_start_samplenum > abs_end_samplenum {
            return Err(Error::arg("abs_start_samplenum must be <= abs_end_samplenum"));
        }
        let expected_len = (abs_end_samplenum - abs_start_samplenum) as usize * unitsize;
        if data.len() < expected_len {
            return Err(Error::arg(format!(
                "buffer too short: expected at least {} bytes, got {}",
                expected_len,
                data.len()
            )));
        }
        Ok(Self { abs_start_samplenum, abs_end_samplenum, data, unitsize })
    }

    pub fn abs_start_samplenum(&self) -> u64 {
        self.abs_start_samplenum
    }

    pub fn abs_end_samplenum(&self) -> u64 {
        self.abs_end_samplenum
    }

    pub fn unitsize(&self) -> usize {
        self.unitsize
    }

    pub fn contains(&self, samplenum: u64) -> bool {
        samplenum >= self.abs_start_samplenum && samplenum < self.abs_end_samplenum
    }

    /// Reads the bit for `stream_channel` at absolute sample index `samplenum`.
    pub fn channel_bit(&self, samplenum: u64, stream_channel: usize) -> Result<u8> {
        if !self.contains(samplenum) {
            return Err(Error::bug(format!(
                "sample {} out of range [{}, {})",
                samplenum, self.abs_start_samplenum, self.abs_end_samplenum
            )));
        }
        let offset = (samplenum - self.abs_start_samplenum) as usize * self.unitsize;
        let sample_bytes = &self.data[offset..offset + self.unitsize];
        let byte_index = stream_channel / 8;
        if byte_index >= sample_bytes.len() {
            return Err(Error::bug(format!(
                "stream channel {} not present in a {}-byte sample",
                stream_channel, self.unitsize
            )));
        }
        let bits = sample_bytes[byte_index].view_bits::<Lsb0>();
        Ok(bits[stream_channel % 8] as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_undersized_buffer() {
        let data: Arc<[u8]> = Arc::from(vec![0u8; 1]);
        assert!(SampleBuffer::new(0, 4, data, 1).is_err());
    }

    #[test]
    fn extracts_little_endian_bits() {
        // Two samples, unitsize 1: 0b0000_0001, 0b0000_0010
        let data: Arc<[u8]> = Arc::from(vec![0b0000_0001u8, 0b0000_0010u8]);
        let buf = SampleBuffer::new(0, 2, data, 1).unwrap();
        assert_eq!(buf.channel_bit(0, 0).unwrap(), 1);
        assert_eq!(buf.channel_bit(0, 1).unwrap(), 0);
        assert_eq!(buf.channel_bit(1, 0).unwrap(), 0);
        assert_eq!(buf.channel_bit(1, 1).unwrap(), 1);
    }

    #[test]
    fn out_of_range_sample_errors() {
        let data: Arc<[u8]> = Arc::from(vec![0u8; 2]);
        let buf = SampleBuffer::new(10, 12, data, 1).unwrap();
        assert!(buf.channel_bit(9, 0).is_err());
        assert!(buf.channel_bit(12, 0).is_err());
    }
}
