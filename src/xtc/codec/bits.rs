//! Bit-granular packing over an in-memory byte buffer.
//!
//! The coordinate codec concatenates integers of arbitrary bit widths with no
//! byte alignment between values; alignment to a byte boundary happens once,
//! at the end of a frame's coordinate block. Bits are packed most significant
//! first within each byte.

use crate::xtc::error::{Result, XtcError};

/// Accumulates variable-width integers into a byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    // Wider than a byte so a full-byte chunk can shift in without overflow.
    current: u16,
    used: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `nbits` bits of `value`, most significant first.
    ///
    /// `nbits` of zero is a no-op: a value with only one representable state
    /// costs nothing on the wire.
    pub fn write_bits(&mut self, value: u128, nbits: u32) {
        debug_assert!(nbits <= 128);
        debug_assert!(nbits == 128 || value >> nbits == 0);

        let mut left = nbits;
        while left > 0 {
            let free = 8 - self.used;
            let take = free.min(left);
            let chunk = ((value >> (left - take)) & ((1u128 << take) - 1)) as u16;
            self.current = (self.current << take) | chunk;
            self.used += take;
            left -= take;
            if self.used == 8 {
                self.bytes.push(self.current as u8);
                self.current = 0;
                self.used = 0;
            }
        }
    }

    /// Pads any final partial byte with zero bits and returns the buffer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.bytes.push((self.current << (8 - self.used)) as u8);
        }
        self.bytes
    }
}

/// Reads variable-width integers back out of a packed byte run.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bit_pos: 0 }
    }

    /// Reads `nbits` bits, most significant first.
    ///
    /// Running out of bits means the packed run is shorter than the frame
    /// header declared, which is reported as a truncated frame.
    pub fn read_bits(&mut self, nbits: u32) -> Result<u128> {
        debug_assert!(nbits <= 128);
        if self.bit_pos + nbits as usize > self.bytes.len() * 8 {
            return Err(XtcError::TruncatedFrame(format!(
                "packed coordinate run exhausted at bit {} (needed {} more bits)",
                self.bit_pos, nbits
            )));
        }

        let mut value = 0u128;
        let mut left = nbits;
        while left > 0 {
            let byte = self.bytes[self.bit_pos / 8];
            let offset = (self.bit_pos % 8) as u32;
            let avail = 8 - offset;
            let take = avail.min(left);
            let chunk = (byte >> (avail - take)) & (((1u16 << take) - 1) as u8);
            value = (value << take) | chunk as u128;
            self.bit_pos += take as usize;
            left -= take;
        }
        Ok(value)
    }
}
