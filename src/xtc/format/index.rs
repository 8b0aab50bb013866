//! Frame-boundary discovery over a whole trajectory.
//!
//! Frames have no fixed byte length: each compressed payload is as long as
//! its content demands. Random access therefore needs one full sequential
//! pass recording where every frame starts. The linear cost is inherent to
//! the format, not an inefficiency; the scan seeks over payloads using their
//! stored lengths instead of decompressing them.

use std::io::{Read, Seek};

use log::debug;

use super::frame;
use crate::xtc::cursor::ByteCursor;
use crate::xtc::error::Result;
use crate::xtc::models::FrameIndex;

/// Scans from the cursor's position to the end of the stream, recording the
/// byte offset of every frame start plus the end-of-stream sentinel.
///
/// A clean end of stream exactly at a frame boundary terminates the scan; an
/// end of stream mid-frame is a corrupt file and propagates as
/// `TruncatedFrame`. A stream with no frames at all indexes as zero frames.
///
/// # Errors
/// - `BadMagic` when a recorded boundary does not open a frame.
/// - `TruncatedFrame` when the final frame is cut short.
pub fn build_index<S: Read + Seek>(cursor: &mut ByteCursor<S>) -> Result<FrameIndex> {
    let stream_len = cursor.stream_len()?;
    let mut offsets = Vec::new();
    loop {
        let pos = cursor.position()?;
        offsets.push(pos);
        if pos == stream_len {
            break;
        }
        frame::skip_frame(cursor, stream_len)?;
    }
    debug!(
        "Indexed {} frames over {} bytes",
        offsets.len() - 1,
        stream_len
    );
    Ok(FrameIndex::new(offsets))
}
