//! Custom error types for the xtc-codec crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum XtcError {
    /// An error originating from I/O operations on the underlying stream.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// A frame boundary did not start with the XTC magic number.
    ///
    /// Strong signal of either a wrong file type or a torn write.
    #[error("Bad magic number: expected {expected}, got {found}")]
    BadMagic { expected: i32, found: i32 },

    /// Declared sizes imply more bytes than the stream holds, or the frame
    /// content is internally inconsistent with its own header.
    #[error("Truncated frame: {0}")]
    TruncatedFrame(String),

    /// The coordinate spread cannot be represented at the requested
    /// precision. Pick a coarser precision or split the trajectory.
    #[error("Coordinate range overflow: {0}")]
    RangeOverflow(String),

    /// A non-positive (or non-finite) precision was supplied on the
    /// compressed encode path.
    #[error("Invalid precision {0}: must be positive and finite")]
    InvalidPrecision(f32),

    /// The stream ends before a complete frame header.
    #[error("Empty file: no complete frame header present")]
    EmptyFile,

    /// A random-access read named a frame beyond the indexed range.
    #[error("Frame {frame} out of range: trajectory holds {num_frames} frames")]
    FrameOutOfRange { frame: usize, num_frames: usize },
}

/// A convenience `Result` type alias using the crate's `XtcError` type.
pub type Result<T> = std::result::Result<T, XtcError>;
