//! Data structures representing XTC trajectory components.

/// Magic number opening every XTC frame.
pub const XTC_MAGIC: i32 = 1995;

/// Frames with fewer particles than this store their coordinates as plain
/// floats: the fixed overhead of the packed representation (bounding box,
/// bit-width header) would exceed any saving at that scale.
pub const MIN_COMPRESSED_PARTICLES: usize = 10;

/// One trajectory snapshot.
///
/// `step` is monotonic by convention only; nothing in the format enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Simulation step index.
    pub step: i32,
    /// Simulation time.
    pub time: f32,
    /// Periodic-box basis vectors, one row per vector.
    pub box_vectors: [[f32; 3]; 3],
    /// Particle positions, one `[x, y, z]` triplet per particle.
    pub coordinates: Vec<[f32; 3]>,
    /// Quantization precision the frame was decoded with.
    ///
    /// `None` for frames stored on the verbatim path, whose coordinates are
    /// exact. Frames from the compressed path always carry the precision
    /// used, so a re-read reproduces coordinates within `±0.5 / precision`
    /// per axis.
    pub precision: Option<f32>,
}

impl Frame {
    /// Builds a frame ready for writing. The coordinate count is the
    /// particle count; the write path picks the storage scheme from it.
    pub fn new(
        step: i32,
        time: f32,
        box_vectors: [[f32; 3]; 3],
        coordinates: Vec<[f32; 3]>,
    ) -> Self {
        Self {
            step,
            time,
            box_vectors,
            coordinates,
            precision: None,
        }
    }

    /// Number of particles in this frame.
    pub fn num_particles(&self) -> usize {
        self.coordinates.len()
    }
}

/// The fixed header prefix shared by both storage paths:
/// magic, particle count, step, time, box matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    pub natoms: u32,
    pub step: i32,
    pub time: f32,
    pub box_vectors: [[f32; 3]; 3],
}

/// Byte offsets of every frame start plus a trailing end-of-file sentinel.
///
/// Length is always `num_frames + 1`. Derived data: rebuildable at any time
/// by rescanning the file, owned by the caller session, never persisted in
/// the file itself. Cheap to clone and share read-only across threads once
/// built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIndex {
    offsets: Vec<u64>,
}

impl FrameIndex {
    pub(crate) fn new(offsets: Vec<u64>) -> Self {
        debug_assert!(!offsets.is_empty());
        Self { offsets }
    }

    /// Number of frames covered by the index.
    pub fn num_frames(&self) -> usize {
        self.offsets.len() - 1
    }

    /// All recorded offsets, including the end-of-file sentinel.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Byte offset of the start of frame `frame`, if it exists.
    pub fn frame_offset(&self, frame: usize) -> Option<u64> {
        if frame < self.num_frames() {
            Some(self.offsets[frame])
        } else {
            None
        }
    }

    /// The end-of-file sentinel: one byte past the last frame.
    pub fn end_offset(&self) -> u64 {
        *self.offsets.last().unwrap_or(&0)
    }
}
