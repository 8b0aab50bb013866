//! Frame-header encoding, decoding, and the particle-count probe.

use std::io::{ErrorKind, Read, Seek, Write};

use log::{debug, trace};

use super::eof_to_truncated;
use crate::xtc::cursor::ByteCursor;
use crate::xtc::error::{Result, XtcError};
use crate::xtc::models::{FrameHeader, XTC_MAGIC};

/// Serialized size of the fixed header prefix:
/// magic, particle count, step, time, 3x3 box matrix.
pub const HEADER_SIZE: u64 = 4 * 4 + 9 * 4;

/// Writes the fixed header prefix of one frame.
pub fn write<S: Write>(cursor: &mut ByteCursor<S>, header: &FrameHeader) -> Result<()> {
    cursor.write_i32(XTC_MAGIC)?;
    cursor.write_i32(header.natoms as i32)?;
    cursor.write_i32(header.step)?;
    cursor.write_f32(header.time)?;
    for row in &header.box_vectors {
        for value in row {
            cursor.write_f32(*value)?;
        }
    }
    Ok(())
}

/// Reads and validates the fixed header prefix of one frame.
///
/// # Errors
/// - `BadMagic` when the frame boundary does not open with the magic number.
/// - `TruncatedFrame` when the stream ends inside the header.
pub fn read<S: Read>(cursor: &mut ByteCursor<S>) -> Result<FrameHeader> {
    let magic = cursor
        .read_i32()
        .map_err(|e| eof_to_truncated(e, "frame magic"))?;
    if magic != XTC_MAGIC {
        return Err(XtcError::BadMagic {
            expected: XTC_MAGIC,
            found: magic,
        });
    }
    let natoms = cursor
        .read_i32()
        .map_err(|e| eof_to_truncated(e, "particle count"))?;
    if natoms < 0 {
        return Err(XtcError::TruncatedFrame(format!(
            "negative particle count {}",
            natoms
        )));
    }
    let step = cursor
        .read_i32()
        .map_err(|e| eof_to_truncated(e, "step"))?;
    let time = cursor
        .read_f32()
        .map_err(|e| eof_to_truncated(e, "time"))?;
    let mut box_vectors = [[0f32; 3]; 3];
    for row in &mut box_vectors {
        for value in row.iter_mut() {
            *value = cursor
                .read_f32()
                .map_err(|e| eof_to_truncated(e, "box matrix"))?;
        }
    }
    trace!(
        "Frame header: {} particles, step {}, time {}",
        natoms,
        step,
        time
    );
    Ok(FrameHeader {
        natoms: natoms as u32,
        step,
        time,
        box_vectors,
    })
}

/// Reads the particle count of the frame at the cursor without consuming the
/// stream: the position is restored so a subsequent full read starts from the
/// same frame.
///
/// # Errors
/// - `EmptyFile` when the stream ends before the particle-count field.
/// - `BadMagic` when the bytes at the cursor are not a frame boundary.
pub fn probe_natoms<S: Read + Seek>(cursor: &mut ByteCursor<S>) -> Result<u32> {
    let start = cursor.position()?;
    let probed = probe_fields(cursor);
    // Restore the position on failure too, so a failed probe has no
    // stream side effects either.
    cursor.seek(start)?;
    let natoms = probed?;
    debug!("Probed particle count: {}", natoms);
    Ok(natoms)
}

fn probe_fields<S: Read>(cursor: &mut ByteCursor<S>) -> Result<u32> {
    let magic = cursor.read_i32().map_err(empty_on_eof)?;
    if magic != XTC_MAGIC {
        return Err(XtcError::BadMagic {
            expected: XTC_MAGIC,
            found: magic,
        });
    }
    let natoms = cursor.read_i32().map_err(empty_on_eof)?;
    if natoms < 0 {
        return Err(XtcError::TruncatedFrame(format!(
            "negative particle count {}",
            natoms
        )));
    }
    Ok(natoms as u32)
}

fn empty_on_eof(err: XtcError) -> XtcError {
    match err {
        XtcError::Io(ref io) if io.kind() == ErrorKind::UnexpectedEof => XtcError::EmptyFile,
        other => other,
    }
}
