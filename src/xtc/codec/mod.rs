//! Coordinate packing codec: bit-granular buffers and the lossy
//! precision-bounded compressor built on them.

pub(crate) mod bits;
pub(crate) mod compression;
