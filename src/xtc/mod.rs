//! Core XTC codec module

pub mod cursor;
pub mod error;
pub mod format;
pub mod models;

mod codec;

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::{debug, info};

use self::cursor::ByteCursor;
pub use self::error::{Result, XtcError};
use self::models::{Frame, FrameIndex};

/// Reading session for one XTC trajectory file.
///
/// Owns the file handle, the probed particle count, and the lazily built
/// frame index. A session is strictly single-threaded: the cursor position
/// is mutable shared state with no internal locking. For parallel reads,
/// open one session per thread and share a single built [`FrameIndex`]
/// read-only between them.
#[derive(Debug)]
pub struct XtcReader {
    cursor: ByteCursor<File>,
    natoms: u32,
    index: Option<FrameIndex>,
}

impl XtcReader {
    /// Opens a trajectory and probes its particle count from the first
    /// frame header. The read position stays at frame zero.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The file is empty (`EmptyFile`)
    /// - The first frame does not open with the XTC magic (`BadMagic`)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening XTC trajectory: {}", path.display());
        let file = File::open(path)?;
        let mut cursor = ByteCursor::new(file);
        let natoms = format::header::probe_natoms(&mut cursor)?;
        info!("Trajectory holds {} particles per frame", natoms);
        Ok(Self {
            cursor,
            natoms,
            index: None,
        })
    }

    /// Particle count probed from the first frame.
    ///
    /// Fixed per trajectory by convention; each frame's own header remains
    /// authoritative for that frame when reading.
    pub fn natoms(&self) -> u32 {
        self.natoms
    }

    /// Reads the frame at the current position, or `None` at a clean end of
    /// file. Advances past exactly one frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.cursor.position()? >= self.cursor.stream_len()? {
            return Ok(None);
        }
        format::frame::read_frame(&mut self.cursor).map(Some)
    }

    /// Returns an iterator over all remaining frames.
    ///
    /// Stops at a clean end of file; a corrupt frame yields one `Err` and
    /// then ends the iteration.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            reader: self,
            finished: false,
        }
    }

    /// Repositions at frame zero.
    pub fn rewind(&mut self) -> Result<()> {
        self.cursor.seek(0)
    }

    /// Builds the frame index with one sequential scan, caching the result.
    ///
    /// The scan is O(file size) and runs at most once per session; the read
    /// position is restored afterwards. Clone the returned index to share it
    /// read-only across sessions.
    pub fn build_index(&mut self) -> Result<&FrameIndex> {
        if self.index.is_none() {
            let restore = self.cursor.position()?;
            self.cursor.seek(0)?;
            let index = format::index::build_index(&mut self.cursor)?;
            self.cursor.seek(restore)?;
            info!("Built frame index: {} frames", index.num_frames());
            self.index = Some(index);
        }
        Ok(self.index.as_ref().expect("index populated above"))
    }

    /// The cached frame index, if one has been built.
    pub fn index(&self) -> Option<&FrameIndex> {
        self.index.as_ref()
    }

    /// Number of frames in the file. Builds the index on first use.
    pub fn num_frames(&mut self) -> Result<usize> {
        Ok(self.build_index()?.num_frames())
    }

    /// Random-access read of frame `frame`, using the index to seek to its
    /// boundary. Builds the index on first use.
    ///
    /// # Errors
    /// `FrameOutOfRange` when `frame` is not below the indexed frame count.
    pub fn read_frame_at(&mut self, frame: usize) -> Result<Frame> {
        let (offset, num_frames) = {
            let index = self.build_index()?;
            (index.frame_offset(frame), index.num_frames())
        };
        let offset = offset.ok_or(XtcError::FrameOutOfRange { frame, num_frames })?;
        self.cursor.seek(offset)?;
        format::frame::read_frame(&mut self.cursor)
    }
}

/// Iterator over the frames of an [`XtcReader`].
#[derive(Debug)]
pub struct Frames<'a> {
    reader: &'a mut XtcReader,
    finished: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Writing session for one XTC trajectory file.
///
/// Writing is strictly append-sequential; concurrent writers to one
/// trajectory are unsupported and must be serialized by the caller.
#[derive(Debug)]
pub struct XtcWriter {
    cursor: ByteCursor<File>,
    frames_written: u64,
}

impl XtcWriter {
    /// Creates (or truncates) a trajectory file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Creating XTC trajectory: {}", path.display());
        Ok(Self {
            cursor: ByteCursor::new(File::create(path)?),
            frames_written: 0,
        })
    }

    /// Opens a trajectory for appending, creating it if absent. The write
    /// position moves to the end of the existing data.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create(true).open(path)?;
        let mut cursor = ByteCursor::new(file);
        let end = cursor.stream_len()?;
        cursor.seek(end)?;
        info!(
            "Appending to XTC trajectory: {} ({} existing bytes)",
            path.display(),
            end
        );
        Ok(Self {
            cursor,
            frames_written: 0,
        })
    }

    /// Appends one frame and returns the byte count written.
    ///
    /// `precision` drives the lossy compressed path; frames below the
    /// verbatim threshold ignore it and store exact floats.
    ///
    /// # Errors
    /// - `InvalidPrecision` for a non-positive precision on the compressed
    ///   path.
    /// - `RangeOverflow` when the coordinate spread cannot be represented at
    ///   the given precision.
    pub fn write_frame(&mut self, frame: &Frame, precision: f32) -> Result<u64> {
        let written = format::frame::write_frame(&mut self.cursor, frame, precision)?;
        self.frames_written += 1;
        debug!(
            "Frame {} written: step {}, {} bytes",
            self.frames_written,
            frame.step,
            written
        );
        Ok(written)
    }

    /// Number of frames written through this session.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}
