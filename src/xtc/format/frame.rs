//! Assembly and parsing of complete trajectory frames.
//!
//! A frame is the fixed header prefix followed by one of two coordinate
//! payloads, selected by particle count: plain big-endian floats below
//! [`MIN_COMPRESSED_PARTICLES`], the packed representation at or above it.

use std::io::{Read, Seek, Write};

use log::trace;

use super::{eof_to_truncated, header};
use crate::xtc::codec::compression::{self, CompressedBlock};
use crate::xtc::cursor::ByteCursor;
use crate::xtc::error::{Result, XtcError};
use crate::xtc::models::{Frame, FrameHeader, MIN_COMPRESSED_PARTICLES};

/// Bytes of one verbatim coordinate triplet.
const VERBATIM_BYTES_PER_PARTICLE: u64 = 3 * 4;

/// Rounds a packed byte length up to the format's 4-byte alignment.
fn padded_len(packed_len: u64) -> u64 {
    packed_len.div_ceil(4) * 4
}

/// Writes one frame at the cursor and returns the byte count written.
///
/// Dispatches to the verbatim or compressed payload by particle count. The
/// `precision` argument only applies to the compressed path; a tiny frame
/// ignores it entirely and stores exact floats.
///
/// # Errors
/// - `InvalidPrecision` / `RangeOverflow` from the compressor; these are
///   raised before any bytes are written, so a rejected call leaves the
///   stream exactly as it was.
/// - `Io` on stream-level write failures; the stream position is undefined
///   afterwards and the half-written frame surfaces as corrupt on read.
pub fn write_frame<S: Write + Seek>(
    cursor: &mut ByteCursor<S>,
    frame: &Frame,
    precision: f32,
) -> Result<u64> {
    let natoms = frame.coordinates.len();
    if natoms > i32::MAX as usize {
        return Err(XtcError::RangeOverflow(format!(
            "{} particles exceed the format's 32-bit particle count",
            natoms
        )));
    }

    // Compress before touching the stream: a rejected frame must not leave
    // a dangling header behind it.
    let block = if natoms < MIN_COMPRESSED_PARTICLES {
        None
    } else {
        let block = compression::compress(&frame.coordinates, precision)?;
        if block.packed.len() > i32::MAX as usize {
            return Err(XtcError::RangeOverflow(format!(
                "packed coordinate block of {} bytes exceeds the 32-bit length field",
                block.packed.len()
            )));
        }
        Some(block)
    };

    let start = cursor.position()?;
    header::write(
        cursor,
        &FrameHeader {
            natoms: natoms as u32,
            step: frame.step,
            time: frame.time,
            box_vectors: frame.box_vectors,
        },
    )?;

    if let Some(block) = block {
        cursor.write_f32(precision)?;
        for value in block.min {
            cursor.write_i32(value)?;
        }
        for value in block.max {
            cursor.write_i32(value)?;
        }
        cursor.write_u32(block.small_idx)?;
        cursor.write_i32(block.packed.len() as i32)?;
        cursor.write_bytes(&block.packed)?;
        let pad = (padded_len(block.packed.len() as u64) - block.packed.len() as u64) as usize;
        cursor.write_bytes(&[0u8; 3][..pad])?;
    } else {
        for coord in &frame.coordinates {
            for value in coord {
                cursor.write_f32(*value)?;
            }
        }
    }

    let written = cursor.position()? - start;
    trace!(
        "Wrote frame: step {}, {} particles, {} bytes",
        frame.step,
        natoms,
        written
    );
    Ok(written)
}

/// Reads exactly one frame at the cursor.
///
/// The particle count in the frame's own header is authoritative. The cursor
/// advances past exactly one frame and never reads ahead; declared payload
/// sizes are checked against the remaining stream length before anything is
/// allocated or read.
///
/// # Errors
/// - `BadMagic` when the cursor is not at a frame boundary.
/// - `TruncatedFrame` when the payload is shorter than the header declares
///   or internally inconsistent.
pub fn read_frame<S: Read + Seek>(cursor: &mut ByteCursor<S>) -> Result<Frame> {
    let head = header::read(cursor)?;
    let natoms = head.natoms as usize;

    let (coordinates, precision) = if natoms < MIN_COMPRESSED_PARTICLES {
        require_remaining(cursor, natoms as u64 * VERBATIM_BYTES_PER_PARTICLE, "verbatim coordinates")?;
        let mut coordinates = Vec::with_capacity(natoms);
        for _ in 0..natoms {
            let mut coord = [0f32; 3];
            for value in &mut coord {
                *value = cursor
                    .read_f32()
                    .map_err(|e| eof_to_truncated(e, "verbatim coordinates"))?;
            }
            coordinates.push(coord);
        }
        (coordinates, None)
    } else {
        let precision = cursor
            .read_f32()
            .map_err(|e| eof_to_truncated(e, "precision"))?;
        let mut min = [0i32; 3];
        let mut max = [0i32; 3];
        for value in &mut min {
            *value = cursor
                .read_i32()
                .map_err(|e| eof_to_truncated(e, "bounding-box minimum"))?;
        }
        for value in &mut max {
            *value = cursor
                .read_i32()
                .map_err(|e| eof_to_truncated(e, "bounding-box maximum"))?;
        }
        let small_idx = cursor
            .read_u32()
            .map_err(|e| eof_to_truncated(e, "small-delta index"))?;
        let packed_len = cursor
            .read_i32()
            .map_err(|e| eof_to_truncated(e, "packed byte length"))?;
        if packed_len < 0 {
            return Err(XtcError::TruncatedFrame(format!(
                "negative packed byte length {}",
                packed_len
            )));
        }
        let padded = padded_len(packed_len as u64);
        require_remaining(cursor, padded, "packed coordinates")?;

        let mut packed = vec![0u8; packed_len as usize];
        cursor
            .read_bytes(&mut packed)
            .map_err(|e| eof_to_truncated(e, "packed coordinates"))?;
        cursor.skip(padded - packed_len as u64)?;

        let block = CompressedBlock {
            min,
            max,
            small_idx,
            packed,
        };
        let coordinates = compression::decompress(&block, natoms, precision)?;
        (coordinates, Some(precision))
    };

    Ok(Frame {
        step: head.step,
        time: head.time,
        box_vectors: head.box_vectors,
        coordinates,
        precision,
    })
}

/// Advances the cursor past one frame without decoding its coordinates.
///
/// The compressed payload carries its own byte length, so the skip is a seek
/// rather than a decompression; the indexer leans on this.
pub fn skip_frame<S: Read + Seek>(cursor: &mut ByteCursor<S>, stream_len: u64) -> Result<()> {
    let head = header::read(cursor)?;
    let natoms = head.natoms as u64;

    let payload = if (natoms as usize) < MIN_COMPRESSED_PARTICLES {
        natoms * VERBATIM_BYTES_PER_PARTICLE
    } else {
        // precision + bounding box + small-delta index
        cursor.skip(4 + 6 * 4 + 4)?;
        let packed_len = cursor
            .read_i32()
            .map_err(|e| eof_to_truncated(e, "packed byte length"))?;
        if packed_len < 0 {
            return Err(XtcError::TruncatedFrame(format!(
                "negative packed byte length {}",
                packed_len
            )));
        }
        padded_len(packed_len as u64)
    };

    let pos = cursor.position()?;
    if pos > stream_len || payload > stream_len - pos {
        return Err(XtcError::TruncatedFrame(format!(
            "frame payload of {} bytes at offset {} runs past the end of the {}-byte stream",
            payload, pos, stream_len
        )));
    }
    cursor.seek(pos + payload)?;
    Ok(())
}

fn require_remaining<S: Read + Seek>(
    cursor: &mut ByteCursor<S>,
    needed: u64,
    context: &str,
) -> Result<()> {
    let pos = cursor.position()?;
    let len = cursor.stream_len()?;
    let remaining = len.saturating_sub(pos);
    if needed > remaining {
        return Err(XtcError::TruncatedFrame(format!(
            "{} need {} bytes but only {} remain",
            context, needed, remaining
        )));
    }
    Ok(())
}
