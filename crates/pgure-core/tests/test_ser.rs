#[allow(dead_code)]
mod common;

use ndarray::{array, Array3};

use pgure_core::error::PgureError;
use pgure_core::frame::{ColorMode, Sequence};
use pgure_core::io::image_io::export_frames;
use pgure_core::io::ser::{SerHeader, SerReader};
use pgure_core::io::ser_writer::{write_sequence, SerWriter};

use common::{build_ser_header, build_ser_header_full, build_ser_with_frames, write_test_ser};

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[test]
fn test_read_mono8_counts() {
    let frames = vec![vec![0, 10, 20, 30, 40, 255], vec![1, 2, 3, 4, 5, 6]];
    let file = write_test_ser(&build_ser_with_frames(3, 2, &frames));
    let reader = SerReader::open(file.path()).unwrap();

    assert_eq!(reader.frame_count(), 2);
    assert_eq!(reader.header.max_value(), 255.0);
    assert_eq!(reader.header.observer, "Test");
    assert_eq!(reader.header.telescope, "MyScope");
    assert_eq!(reader.header.color_mode(), ColorMode::Mono);

    let frame = reader.read_frame(0).unwrap();
    assert_eq!(frame, array![[0.0, 10.0, 20.0], [30.0, 40.0, 255.0]]);

    let seq = reader.read_sequence().unwrap();
    assert_eq!(seq.shape().to_string(), "3x2x2");
    assert_eq!(seq.data[[1, 1, 2]], 6.0);
    assert!(reader.timestamps().is_none());
}

#[test]
fn test_read_mono16_little_endian() {
    let mut data = build_ser_header_full(2, 2, 12, 1, 0);
    for v in [4095u16, 1, 300, 0] {
        data.extend_from_slice(&v.to_le_bytes());
    }
    let file = write_test_ser(&data);
    let reader = SerReader::open(file.path()).unwrap();
    assert_eq!(reader.header.max_value(), 4095.0);
    assert_eq!(
        reader.read_frame(0).unwrap(),
        array![[4095.0, 1.0], [300.0, 0.0]]
    );
}

#[test]
fn test_read_rgb_uses_green_plane() {
    let mut data = build_ser_header_full(2, 1, 8, 1, 100);
    data.extend_from_slice(&[10, 20, 30, 40, 50, 60]);
    let file = write_test_ser(&data);
    let reader = SerReader::open(file.path()).unwrap();
    assert_eq!(reader.header.color_mode(), ColorMode::RGB);
    assert_eq!(reader.read_frame(0).unwrap(), array![[20.0, 50.0]]);
}

#[test]
fn test_frame_index_out_of_range() {
    let file = write_test_ser(&build_ser_with_frames(2, 2, &[vec![0; 4]]));
    let reader = SerReader::open(file.path()).unwrap();
    assert!(reader.read_frame(1).is_err());
}

#[test]
fn test_rejects_bad_magic() {
    let mut data = build_ser_with_frames(2, 2, &[vec![0; 4]]);
    data[..6].copy_from_slice(b"NOTSER");
    let file = write_test_ser(&data);
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidSer(_))
    ));
}

#[test]
fn test_rejects_truncated_file() {
    let mut data = build_ser_header(4, 4, 2);
    data.extend_from_slice(&[0u8; 16]);
    let file = write_test_ser(&data);
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidSer(_))
    ));

    let file = write_test_ser(&data[..40]);
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidSer(_))
    ));
}

#[test]
fn test_rejects_bad_geometry() {
    let file = write_test_ser(&build_ser_header(0, 4, 0));
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidDimensions { width: 0, .. })
    ));

    let file = write_test_ser(&build_ser_header_full(2, 2, 0, 0, 0));
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidSer(_))
    ));
}

#[test]
fn test_rejects_overflowing_frame_size() {
    let max = i32::MAX as u32;
    let file = write_test_ser(&build_ser_header_full(max, max, 16, 1, 100));
    assert!(matches!(
        SerReader::open(file.path()),
        Err(PgureError::InvalidSer(_))
    ));

    let mut header = SerHeader::mono(max, max, 16, 1);
    header.color_id = 100;
    assert!(header.frame_byte_size().is_err());
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[test]
fn test_write_sequence_clamps_and_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ser");
    let data = Array3::from_shape_vec(
        (2, 2, 3),
        vec![
            -5.0, 0.4, 0.6, 254.6, 300.0, f64::NAN, //
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0,
        ],
    )
    .unwrap();
    let seq = Sequence::from_array(data).unwrap();
    let mut template = SerHeader::mono(99, 99, 8, 99);
    template.observer = "Night".into();
    template.color_id = 8;

    write_sequence(&path, &seq, &template, Some(&[10u64, 20][..])).unwrap();

    let reader = SerReader::open(&path).unwrap();
    assert_eq!((reader.header.width, reader.header.height), (3, 2));
    assert_eq!(reader.frame_count(), 2);
    assert_eq!(reader.header.color_mode(), ColorMode::Mono);
    assert_eq!(reader.header.observer, "Night");
    assert_eq!(
        reader.read_frame(0).unwrap(),
        array![[0.0, 0.0, 1.0], [255.0, 255.0, 0.0]]
    );
    assert_eq!(reader.timestamps(), Some(vec![10, 20]));
}

#[test]
fn test_write_sequence_sixteen_bit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deep.ser");
    let seq = Sequence::from_array(Array3::from_elem((1, 2, 2), 40000.4)).unwrap();
    write_sequence(&path, &seq, &SerHeader::mono(2, 2, 16, 1), None).unwrap();

    let reader = SerReader::open(&path).unwrap();
    assert!(reader.read_frame(0).unwrap().iter().all(|&v| v == 40000.0));
}

#[test]
fn test_write_sequence_skips_mismatched_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ser");
    let seq = Sequence::from_array(Array3::zeros((2, 2, 2))).unwrap();
    write_sequence(&path, &seq, &SerHeader::mono(2, 2, 8, 2), Some(&[1u64, 2, 3][..])).unwrap();
    assert!(SerReader::open(&path).unwrap().timestamps().is_none());
}

#[test]
fn test_writer_checks_frame_count_and_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.ser");
    let mut writer = SerWriter::create(&path, &SerHeader::mono(2, 2, 8, 2)).unwrap();
    assert!(matches!(
        writer.write_frame(ndarray::Array2::zeros((3, 2)).view()),
        Err(PgureError::ShapeMismatch(_))
    ));
    assert!(matches!(
        writer.write_raw_frame(&[0; 3]),
        Err(PgureError::BufferSizeMismatch {
            expected: 4,
            actual: 3
        })
    ));
    writer.write_raw_frame(&[1, 2, 3, 4]).unwrap();
    assert!(matches!(writer.finalize(), Err(PgureError::InvalidSer(_))));
}

// ---------------------------------------------------------------------------
// Image export
// ---------------------------------------------------------------------------

#[test]
fn test_export_frames_tiff_and_png() {
    let dir = tempfile::tempdir().unwrap();
    let data = Array3::from_shape_fn((2, 3, 4), |(f, r, c)| (f * 100 + r * 4 + c) as f64);
    let seq = Sequence::from_array(data).unwrap();

    let tiffs = export_frames(&seq, 255.0, dir.path(), "frame", "tiff").unwrap();
    assert_eq!(tiffs.len(), 2);
    assert!(tiffs[1].ends_with("frame_00001.tiff"));
    let img = image::open(&tiffs[0]).unwrap();
    assert_eq!((img.width(), img.height()), (4, 3));

    let pngs = export_frames(&seq, 111.0, &dir.path().join("png"), "out", "png").unwrap();
    assert!(pngs.iter().all(|p| p.exists()));
    let img = image::open(&pngs[1]).unwrap().to_luma8();
    // Frame 1 starts at 100 counts and saturates at 111.
    assert_eq!(img.get_pixel(0, 0).0[0], (100.0f64 / 111.0 * 255.0).round() as u8);
    assert_eq!(img.get_pixel(3, 2).0[0], 255);
}
