//! # xtc-codec
//!
//! A reader and writer for the GROMACS XTC compressed trajectory format:
//! sequences of frames holding a simulation step, a periodic-box matrix, and
//! the positions of N particles, stored either verbatim (tiny particle
//! counts) or through a lossy, precision-bounded variable-bit-width
//! compression scheme.
//!
//! Frames have no fixed byte length, so random access goes through a
//! one-time sequential index of frame-start offsets; see
//! [`XtcReader::build_index`].

pub mod xtc;

// Re-export the main types for convenience
pub use xtc::{
    error::{Result, XtcError},
    models::{Frame, FrameIndex},
    XtcReader, XtcWriter,
};
