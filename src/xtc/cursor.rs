//! Ordered big-endian reads and writes over a seekable byte stream.
//!
//! Every multi-byte field in the XTC format is big-endian; this cursor is the
//! one primitive all other components build on. It makes no buffering
//! decisions beyond what the underlying stream provides and issues no partial
//! multi-field writes on its own: a failed write leaves the stream position
//! undefined, and a half-written frame is reported as corrupt on the next
//! read rather than repaired here.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::error::Result;

/// A position-tracking cursor over an underlying seekable byte stream.
#[derive(Debug)]
pub struct ByteCursor<S> {
    stream: S,
}

impl<S> ByteCursor<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Consumes the cursor and returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Seek> ByteCursor<S> {
    /// Current byte offset from the start of the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Moves to an absolute byte offset.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Advances the position by `bytes` without reading.
    pub fn skip(&mut self, bytes: u64) -> Result<u64> {
        Ok(self.stream.seek(SeekFrom::Current(bytes as i64))?)
    }

    /// Total stream length. Restores the current position afterwards.
    pub fn stream_len(&mut self) -> Result<u64> {
        let pos = self.stream.stream_position()?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

impl<S: Read> ByteCursor<S> {
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.stream.read_i32::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.stream.read_u32::<BigEndian>()?)
    }

    /// Reads one IEEE-754 single-precision float.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.stream.read_f32::<BigEndian>()?)
    }

    /// Fills `buf` completely, failing on a short read.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.read_exact(buf)?;
        Ok(())
    }
}

impl<S: Write> ByteCursor<S> {
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.stream.write_i32::<BigEndian>(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.stream.write_u32::<BigEndian>(value)?)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        Ok(self.stream.write_f32::<BigEndian>(value)?)
    }

    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.stream.write_all(buf)?;
        Ok(())
    }
}
