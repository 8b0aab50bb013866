//! Variable-bit-width coordinate compression.
//!
//! The dominant cost of a frame is its N x 3 coordinate floats. Real
//! trajectories are smooth and locally clustered, so each frame quantizes its
//! coordinates to a caller-chosen precision, reduces them to offsets inside a
//! per-frame integer bounding box, and packs them with exactly as many bits
//! as the box ranges require.
//!
//! # Packed stream grammar
//!
//! The packed run is a sequence of per-particle symbols, MSB first:
//!
//! ```text
//! 0           absolute triplet, bounding-box-relative, frame bit width
//! 10          delta triplet from the previous particle, small-index radix
//! 11 nnnnnnnn repeat the previous triplet n times (1..=255)
//! ```
//!
//! A triplet packs as one mixed-radix integer (radix = per-axis range) rather
//! than three independent fields, since typical ranges are not powers of two.
//! The product of three wide ranges exceeds 32 bits, so all mixed-radix
//! arithmetic goes through `u128`. Axes needing more than 24 bits fall back
//! to independent per-axis fields; both ends derive that choice from the
//! bounding box stored in the frame header, so the stream stays
//! self-describing.
//!
//! The run-of-repeats symbol is the dominant saving for rigid solvent, where
//! long stretches of particles quantize to identical triplets.

use log::{debug, trace};

use super::bits::{BitReader, BitWriter};
use crate::xtc::error::{Result, XtcError};

/// Range steps with a favorable cost/coverage trade for small-delta
/// encoding. Indices below [`FIRST_IDX`] are placeholders.
const MAGICINTS: [u32; 73] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 10, 12, 16, 20, 25, 32, 40, 50, 64, 80, 101,
    128, 161, 203, 256, 322, 406, 512, 645, 812, 1024, 1290, 1625, 2048, 2580,
    3250, 4096, 5060, 6501, 8192, 10321, 13003, 16384, 20642, 26007, 32768,
    41285, 52015, 65536, 82570, 104031, 131072, 165140, 208063, 262144,
    330280, 416127, 524287, 660561, 832255, 1048576, 1321122, 1664510,
    2097152, 2642245, 3329021, 4194304, 5284491, 6658042, 8388607, 10568983,
    13316085, 16777216,
];

/// First usable index into [`MAGICINTS`].
const FIRST_IDX: usize = 9;

/// Quantized magnitudes beyond this cannot be packed at any width.
const MAX_QUANTIZED: f64 = (i32::MAX - 2) as f64;

/// Axes needing more than this many bits force independent per-axis fields
/// instead of one mixed-radix triplet.
const MAX_COMBINED_AXIS_BITS: u32 = 24;

/// Longest stretch one run symbol can cover.
const MAX_RUN: usize = 255;
const RUN_COUNT_BITS: u32 = 8;

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// One frame's compressed coordinate payload.
///
/// Lives for a single encode or decode call; never retained across frames.
#[derive(Debug)]
pub struct CompressedBlock {
    /// Per-axis minimum of the quantized coordinates.
    pub min: [i32; 3],
    /// Per-axis maximum of the quantized coordinates.
    pub max: [i32; 3],
    /// Index into the small-delta range table used for delta symbols.
    pub small_idx: u32,
    /// The bit-packed symbol run, padded to a whole number of bytes.
    pub packed: Vec<u8>,
}

/// Smallest bit count able to hold values in `[0, count)`.
fn bits_for(count: u128) -> u32 {
    if count <= 1 {
        0
    } else {
        128 - (count - 1).leading_zeros()
    }
}

/// Packs a triplet into one mixed-radix integer, first component most
/// significant.
fn pack_triplet(values: [u128; 3], radices: [u128; 3]) -> u128 {
    debug_assert!((0..3).all(|k| values[k] < radices[k]));
    (values[0] * radices[1] + values[1]) * radices[2] + values[2]
}

/// Inverse of [`pack_triplet`]. `None` when the leading component escapes
/// its radix, which only a corrupt stream can produce.
fn unpack_triplet(mut value: u128, radices: [u128; 3]) -> Option<[u128; 3]> {
    let v2 = value % radices[2];
    value /= radices[2];
    let v1 = value % radices[1];
    value /= radices[1];
    if value >= radices[0] {
        return None;
    }
    Some([value, v1, v2])
}

/// Bit-width layout derived from a frame's bounding box, identically on both
/// ends of the wire.
#[derive(Debug)]
struct Layout {
    sizes: [u128; 3],
    axis_bits: [u32; 3],
    separate: bool,
    combined_bits: u32,
}

impl Layout {
    fn derive(min: &[i32; 3], max: &[i32; 3]) -> Self {
        let mut sizes = [0u128; 3];
        let mut axis_bits = [0u32; 3];
        for k in 0..3 {
            sizes[k] = (max[k] as i64 - min[k] as i64) as u128 + 1;
            axis_bits[k] = bits_for(sizes[k]);
        }
        let separate = axis_bits.iter().any(|b| *b > MAX_COMBINED_AXIS_BITS);
        let combined_bits = if separate {
            0
        } else {
            bits_for(sizes[0] * sizes[1] * sizes[2])
        };
        Self {
            sizes,
            axis_bits,
            separate,
            combined_bits,
        }
    }

    /// Payload bits of one absolute triplet.
    fn absolute_bits(&self) -> u32 {
        if self.separate {
            self.axis_bits.iter().sum()
        } else {
            self.combined_bits
        }
    }
}

/// Small-delta parameters for a given range-table index.
#[derive(Debug)]
struct Small {
    half: i64,
    bits: u32,
    radices: [u128; 3],
}

impl Small {
    fn new(idx: u32) -> Self {
        let m = MAGICINTS[idx as usize] as u128;
        Self {
            half: (m / 2) as i64,
            bits: bits_for(m * m * m),
            radices: [m, m, m],
        }
    }

    fn fits(&self, cur: &[i32; 3], prev: &[i32; 3]) -> bool {
        (0..3).all(|k| (cur[k] as i64 - prev[k] as i64).abs() < self.half)
    }
}

fn quantize(coordinates: &[[f32; 3]], precision: f32) -> Result<Vec<[i32; 3]>> {
    let precision = precision as f64;
    let mut quantized = Vec::with_capacity(coordinates.len());
    for (i, coord) in coordinates.iter().enumerate() {
        let mut q = [0i32; 3];
        for k in 0..3 {
            let scaled = (coord[k] as f64 * precision).round();
            if !scaled.is_finite() || scaled.abs() > MAX_QUANTIZED {
                return Err(XtcError::RangeOverflow(format!(
                    "{} coordinate of particle {} quantizes to {} at precision {}",
                    AXIS_NAMES[k], i, scaled, precision
                )));
            }
            q[k] = scaled as i32;
        }
        quantized.push(q);
    }
    Ok(quantized)
}

fn bounding_box(quantized: &[[i32; 3]]) -> ([i32; 3], [i32; 3]) {
    let mut min = quantized[0];
    let mut max = quantized[0];
    for q in &quantized[1..] {
        for k in 0..3 {
            min[k] = min[k].min(q[k]);
            max[k] = max[k].max(q[k]);
        }
    }
    (min, max)
}

/// Picks the range-table index minimizing the estimated symbol-stream size.
///
/// Only particles that actually moved relative to their predecessor matter:
/// stationary stretches collapse into run symbols whatever the index.
fn choose_small_idx(quantized: &[[i32; 3]], absolute_cost: u64) -> u32 {
    let mut displacements: Vec<u64> = quantized
        .windows(2)
        .filter_map(|w| {
            let d = (0..3)
                .map(|k| (w[1][k] as i64 - w[0][k] as i64).unsigned_abs())
                .max()
                .unwrap_or(0);
            (d > 0).then_some(d)
        })
        .collect();
    displacements.sort_unstable();
    let n = displacements.len() as u64;

    let mut best_idx = FIRST_IDX as u32;
    let mut best_cost = n * absolute_cost;
    for idx in FIRST_IDX..MAGICINTS.len() {
        let small = Small::new(idx as u32);
        let delta_cost = 2 + small.bits as u64;
        if delta_cost >= absolute_cost {
            // wider indices only get more expensive
            break;
        }
        let fitting = displacements.partition_point(|d| (*d as i64) < small.half) as u64;
        let cost = fitting * delta_cost + (n - fitting) * absolute_cost;
        if cost < best_cost {
            best_cost = cost;
            best_idx = idx as u32;
        }
    }
    best_idx
}

fn unquantize(q: [i32; 3], precision: f32) -> [f32; 3] {
    [
        q[0] as f32 / precision,
        q[1] as f32 / precision,
        q[2] as f32 / precision,
    ]
}

/// Quantizes a frame's coordinates to `precision` and packs them.
///
/// # Errors
/// - `InvalidPrecision` for a non-positive or non-finite precision, before
///   any quantization work.
/// - `RangeOverflow` when a coordinate quantizes beyond the packer's
///   representable range at the given precision.
pub fn compress(coordinates: &[[f32; 3]], precision: f32) -> Result<CompressedBlock> {
    if !precision.is_finite() || precision <= 0.0 {
        return Err(XtcError::InvalidPrecision(precision));
    }
    debug_assert!(!coordinates.is_empty());
    let quantized = quantize(coordinates, precision)?;
    let (min, max) = bounding_box(&quantized);
    let layout = Layout::derive(&min, &max);
    let absolute_cost = 1 + layout.absolute_bits() as u64;
    let small_idx = choose_small_idx(&quantized, absolute_cost);
    let small = Small::new(small_idx);
    let use_deltas = 2 + small.bits as u64 <= absolute_cost;

    let mut writer = BitWriter::new();
    let mut prev = [0i32; 3];
    let mut i = 0;
    while i < quantized.len() {
        let cur = quantized[i];
        if i > 0 && cur == prev {
            // collapse the stationary stretch into run symbols
            let mut run = 1;
            while i + run < quantized.len() && quantized[i + run] == prev {
                run += 1;
            }
            let mut left = run;
            while left > 0 {
                let count = left.min(MAX_RUN);
                writer.write_bits(0b11, 2);
                writer.write_bits(count as u128, RUN_COUNT_BITS);
                left -= count;
            }
            i += run;
            continue;
        }
        if use_deltas && i > 0 && small.fits(&cur, &prev) {
            let mut vals = [0u128; 3];
            for k in 0..3 {
                vals[k] = (cur[k] as i64 - prev[k] as i64 + small.half) as u128;
            }
            writer.write_bits(0b10, 2);
            writer.write_bits(pack_triplet(vals, small.radices), small.bits);
        } else {
            let mut vals = [0u128; 3];
            for k in 0..3 {
                vals[k] = (cur[k] as i64 - min[k] as i64) as u128;
            }
            writer.write_bits(0b0, 1);
            if layout.separate {
                for k in 0..3 {
                    writer.write_bits(vals[k], layout.axis_bits[k]);
                }
            } else {
                writer.write_bits(pack_triplet(vals, layout.sizes), layout.combined_bits);
            }
        }
        prev = cur;
        i += 1;
    }

    let packed = writer.into_bytes();
    debug!(
        "Compressed {} particles: box {:?}..{:?}, {} absolute bits/triplet, small index {}, {} packed bytes",
        coordinates.len(),
        min,
        max,
        layout.absolute_bits(),
        small_idx,
        packed.len()
    );
    Ok(CompressedBlock {
        min,
        max,
        small_idx,
        packed,
    })
}

/// Reconstructs `natoms` coordinate triplets from a packed block.
///
/// Exact inverse of [`compress`]: the bit-width layout is re-derived from the
/// stored bounding box and the delta radix from the stored small index, so no
/// state outside the block is needed.
///
/// # Errors
/// `TruncatedFrame` whenever the block is inconsistent with the declared
/// particle count: exhausted bit run, out-of-range header fields, values
/// escaping their radix, or a delta/run symbol before the first particle.
pub fn decompress(block: &CompressedBlock, natoms: usize, precision: f32) -> Result<Vec<[f32; 3]>> {
    let idx = block.small_idx as usize;
    if !(FIRST_IDX..MAGICINTS.len()).contains(&idx) {
        return Err(XtcError::TruncatedFrame(format!(
            "small-delta index {} outside the valid range {}..{}",
            block.small_idx,
            FIRST_IDX,
            MAGICINTS.len()
        )));
    }
    for k in 0..3 {
        if block.min[k] > block.max[k] {
            return Err(XtcError::TruncatedFrame(format!(
                "inverted bounding box on the {} axis: min {} > max {}",
                AXIS_NAMES[k], block.min[k], block.max[k]
            )));
        }
    }

    let layout = Layout::derive(&block.min, &block.max);
    let small = Small::new(block.small_idx);
    let mut reader = BitReader::new(&block.packed);
    let mut coordinates = Vec::with_capacity(natoms);
    let mut prev = [0i32; 3];

    while coordinates.len() < natoms {
        if reader.read_bits(1)? == 0 {
            // absolute triplet
            let vals = if layout.separate {
                let mut vals = [0u128; 3];
                for k in 0..3 {
                    vals[k] = reader.read_bits(layout.axis_bits[k])?;
                }
                vals
            } else {
                let packed = reader.read_bits(layout.combined_bits)?;
                unpack_triplet(packed, layout.sizes).ok_or_else(|| {
                    XtcError::TruncatedFrame(
                        "absolute triplet escapes its bounding box".to_string(),
                    )
                })?
            };
            for k in 0..3 {
                if vals[k] >= layout.sizes[k] {
                    return Err(XtcError::TruncatedFrame(format!(
                        "{} offset {} outside bounding-box range {}",
                        AXIS_NAMES[k], vals[k], layout.sizes[k]
                    )));
                }
                prev[k] = (block.min[k] as i64 + vals[k] as i64) as i32;
            }
        } else if reader.read_bits(1)? == 0 {
            // delta triplet
            if coordinates.is_empty() {
                return Err(XtcError::TruncatedFrame(
                    "delta symbol before the first particle".to_string(),
                ));
            }
            let packed = reader.read_bits(small.bits)?;
            let vals = unpack_triplet(packed, small.radices).ok_or_else(|| {
                XtcError::TruncatedFrame("delta triplet escapes its radix".to_string())
            })?;
            for k in 0..3 {
                let q = prev[k] as i64 + vals[k] as i64 - small.half;
                prev[k] = i32::try_from(q).map_err(|_| {
                    XtcError::TruncatedFrame(format!(
                        "delta moves the {} coordinate outside the 32-bit range",
                        AXIS_NAMES[k]
                    ))
                })?;
            }
        } else {
            // run of repeats
            let count = reader.read_bits(RUN_COUNT_BITS)? as usize;
            if count == 0 {
                return Err(XtcError::TruncatedFrame("zero-length run symbol".to_string()));
            }
            if coordinates.is_empty() {
                return Err(XtcError::TruncatedFrame(
                    "run symbol before the first particle".to_string(),
                ));
            }
            if coordinates.len() + count > natoms {
                return Err(XtcError::TruncatedFrame(format!(
                    "run of {} overruns the declared particle count {}",
                    count, natoms
                )));
            }
            for _ in 0..count {
                coordinates.push(unquantize(prev, precision));
            }
            continue;
        }
        coordinates.push(unquantize(prev, precision));
    }

    trace!(
        "Decompressed {} particles from {} packed bytes",
        natoms,
        block.packed.len()
    );
    Ok(coordinates)
}
