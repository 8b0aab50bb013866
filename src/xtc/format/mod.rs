//! Wire-format assembly and parsing of XTC frames.

pub mod frame;
pub mod header;
pub mod index;

use crate::xtc::error::XtcError;

/// Reclassifies an end-of-stream hit mid-frame as a truncated frame.
///
/// The cursor reports short reads as plain I/O errors; at the frame level an
/// unexpected end of stream means the file is corrupt, not merely short.
pub(crate) fn eof_to_truncated(err: XtcError, context: &str) -> XtcError {
    match err {
        XtcError::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            XtcError::TruncatedFrame(format!("stream ended while reading {}", context))
        }
        other => other,
    }
}
