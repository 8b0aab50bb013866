use std::io::Cursor;

use xtc_codec::xtc::cursor::ByteCursor;
use xtc_codec::xtc::format::{frame, index};
use xtc_codec::{Frame, XtcError, XtcReader, XtcWriter};

const BOX: [[f32; 3]; 3] = [
    [4.0, 0.0, 0.0],
    [0.0, 4.0, 0.0],
    [0.0, 0.0, 4.0],
];

struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn wobble_coords(n: usize, seed: u64) -> Vec<[f32; 3]> {
    let mut lcg = Lcg(seed);
    (0..n)
        .map(|_| {
            [
                4.0 * lcg.next_f32(),
                4.0 * lcg.next_f32(),
                4.0 * lcg.next_f32(),
            ]
        })
        .collect()
}

fn frame_with(step: i32, coordinates: Vec<[f32; 3]>) -> Frame {
    Frame::new(step, step as f32 * 0.002, BOX, coordinates)
}

/// Five frames whose compressed sizes differ, so offsets are not a fixed
/// stride.
fn varied_frames() -> Vec<Frame> {
    (0..5)
        .map(|step| {
            let mut coordinates = wobble_coords(24, 100 + step as u64);
            // growing stationary tail shrinks later frames
            coordinates.extend(std::iter::repeat([1.0, 1.0, 1.0]).take(step as usize * 8));
            frame_with(step, coordinates)
        })
        .collect()
}

fn encode(frames: &[Frame], precision: f32) -> Vec<u8> {
    let mut cursor = ByteCursor::new(Cursor::new(Vec::new()));
    for f in frames {
        frame::write_frame(&mut cursor, f, precision).expect("write frame");
    }
    cursor.into_inner().into_inner()
}

#[test]
fn index_records_every_frame_start_plus_sentinel() {
    let frames = varied_frames();
    let bytes = encode(&frames, 1000.0);

    let mut cursor = ByteCursor::new(Cursor::new(bytes.as_slice()));
    let built = index::build_index(&mut cursor).expect("build index");

    assert_eq!(built.num_frames(), 5);
    assert_eq!(built.offsets().len(), 6);
    assert_eq!(built.end_offset() as usize, bytes.len());
    assert!(
        built.offsets().windows(2).all(|w| w[0] < w[1]),
        "offsets must be strictly increasing: {:?}",
        built.offsets()
    );

    // every frame decodes at its recorded offset and ends at the next one
    for i in 0..built.num_frames() {
        let offset = built.frame_offset(i).expect("frame offset");
        cursor.seek(offset).expect("seek");
        let decoded = frame::read_frame(&mut cursor).expect("frame at offset");
        assert_eq!(decoded.step, frames[i].step);
        assert_eq!(
            cursor.position().expect("position"),
            built.offsets()[i + 1],
            "frame {} should end exactly at the next offset",
            i
        );
    }
}

#[test]
fn reindexing_an_unmodified_stream_is_idempotent() {
    let bytes = encode(&varied_frames(), 1000.0);
    let mut cursor = ByteCursor::new(Cursor::new(bytes.as_slice()));

    let first = index::build_index(&mut cursor).expect("first scan");
    cursor.seek(0).expect("rewind");
    let second = index::build_index(&mut cursor).expect("second scan");
    assert_eq!(first, second);
}

#[test]
fn an_empty_stream_indexes_as_zero_frames() {
    let mut cursor = ByteCursor::new(Cursor::new(Vec::<u8>::new()));
    let built = index::build_index(&mut cursor).expect("index empty stream");
    assert_eq!(built.num_frames(), 0);
    assert_eq!(built.offsets(), &[0]);
}

#[test]
fn indexing_stops_on_a_flipped_magic() {
    let bytes = encode(&varied_frames(), 1000.0);
    let mut cursor = ByteCursor::new(Cursor::new(bytes.as_slice()));
    let built = index::build_index(&mut cursor).expect("clean index");

    let mut corrupted = bytes.clone();
    let second_frame = built.frame_offset(1).expect("offset of frame 1") as usize;
    corrupted[second_frame] ^= 0xFF;

    let mut cursor = ByteCursor::new(Cursor::new(corrupted.as_slice()));
    let result = index::build_index(&mut cursor);
    assert!(
        matches!(result, Err(XtcError::BadMagic { .. })),
        "corrupt boundary must fail the scan, got {:?}",
        result
    );
}

#[test]
fn indexing_reports_a_truncated_final_frame() {
    let bytes = encode(&varied_frames(), 1000.0);
    let cut = &bytes[..bytes.len() - 7];

    let mut cursor = ByteCursor::new(Cursor::new(cut));
    let result = index::build_index(&mut cursor);
    assert!(
        matches!(result, Err(XtcError::TruncatedFrame(_))),
        "mid-frame EOF must not look like a short file, got {:?}",
        result
    );
}

#[test]
fn reader_and_writer_sessions_roundtrip_a_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("traj.xtc");

    let frames = varied_frames();
    {
        let mut writer = XtcWriter::create(&path).expect("create writer");
        for f in &frames {
            writer.write_frame(f, 1000.0).expect("write frame");
        }
        assert_eq!(writer.frames_written(), 5);
    }

    let mut reader = XtcReader::open(&path).expect("open reader");
    assert_eq!(reader.natoms(), 24);
    assert_eq!(reader.num_frames().expect("num frames"), 5);

    // random access through the index, out of order
    for i in [3usize, 0, 4, 2, 1] {
        let decoded = reader.read_frame_at(i).expect("read frame at");
        assert_eq!(decoded.step, frames[i].step);
        assert_eq!(decoded.num_particles(), frames[i].num_particles());
    }

    let result = reader.read_frame_at(5);
    assert!(matches!(
        result,
        Err(XtcError::FrameOutOfRange {
            frame: 5,
            num_frames: 5
        })
    ));

    // sequential iteration from the start
    reader.rewind().expect("rewind");
    let steps: Vec<i32> = reader
        .frames()
        .map(|r| r.expect("frame ok").step)
        .collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4]);
}

#[test]
fn appending_extends_an_existing_trajectory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("traj.xtc");

    {
        let mut writer = XtcWriter::create(&path).expect("create writer");
        writer
            .write_frame(&frame_with(0, wobble_coords(16, 1)), 1000.0)
            .expect("frame 0");
        writer
            .write_frame(&frame_with(1, wobble_coords(16, 2)), 1000.0)
            .expect("frame 1");
    }
    {
        let mut writer = XtcWriter::append(&path).expect("append writer");
        writer
            .write_frame(&frame_with(2, wobble_coords(16, 3)), 1000.0)
            .expect("frame 2");
        assert_eq!(writer.frames_written(), 1);
    }

    let mut reader = XtcReader::open(&path).expect("open reader");
    assert_eq!(reader.num_frames().expect("num frames"), 3);
    assert_eq!(reader.read_frame_at(2).expect("frame 2").step, 2);
}

#[test]
fn verbatim_and_compressed_frames_mix_in_one_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("traj.xtc");

    {
        let mut writer = XtcWriter::create(&path).expect("create writer");
        writer
            .write_frame(&frame_with(0, wobble_coords(3, 5)), 1000.0)
            .expect("tiny frame");
        writer
            .write_frame(&frame_with(1, wobble_coords(50, 6)), 1000.0)
            .expect("compressed frame");
    }

    let mut reader = XtcReader::open(&path).expect("open reader");
    assert_eq!(reader.natoms(), 3);
    assert_eq!(reader.num_frames().expect("num frames"), 2);

    let tiny = reader.read_frame_at(0).expect("frame 0");
    assert_eq!(tiny.precision, None);
    assert_eq!(tiny.num_particles(), 3);

    let packed = reader.read_frame_at(1).expect("frame 1");
    assert_eq!(packed.precision, Some(1000.0));
    assert_eq!(packed.num_particles(), 50);
}

#[test]
fn opening_an_empty_file_reports_empty_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.xtc");
    std::fs::File::create(&path).expect("create empty file");

    let result = XtcReader::open(&path);
    assert!(matches!(result, Err(XtcError::EmptyFile)));
}

#[test]
fn a_rejected_write_leaves_the_trajectory_readable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("traj.xtc");

    {
        let mut writer = XtcWriter::create(&path).expect("create writer");
        writer
            .write_frame(&frame_with(0, wobble_coords(16, 4)), 1000.0)
            .expect("frame 0");

        // a rejected frame must not leave stray bytes behind it
        let result = writer.write_frame(&frame_with(1, wobble_coords(16, 5)), -1.0);
        assert!(matches!(result, Err(XtcError::InvalidPrecision(_))));
        assert_eq!(writer.frames_written(), 1);

        writer
            .write_frame(&frame_with(1, wobble_coords(16, 5)), 1000.0)
            .expect("frame 1");
    }

    let mut reader = XtcReader::open(&path).expect("open reader");
    assert_eq!(reader.num_frames().expect("num frames"), 2);
    assert_eq!(reader.read_frame_at(0).expect("frame 0").step, 0);
    assert_eq!(reader.read_frame_at(1).expect("frame 1").step, 1);
}
