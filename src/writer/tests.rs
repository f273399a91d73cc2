use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::*;
use crate::metadata::{DimensionId, Experiment};
use crate::reader::{FormatVersion, BLOCK_MAGIC, BLOCK_MARKER};

fn new_writer(version: FormatVersion) -> ContainerWriter<Cursor<Vec<u8>>> {
    ContainerWriter::new(Cursor::new(Vec::new()), version)
}

#[test]
fn test_header_block_layout() {
    let mut writer = new_writer(FormatVersion::V1);
    writer.write_header("<A/>").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let mut cursor = Cursor::new(&bytes);
    assert_eq!(cursor.read_i32::<LittleEndian>().unwrap(), BLOCK_MAGIC);
    cursor.read_u32::<LittleEndian>().unwrap();
    assert_eq!(cursor.read_u8().unwrap(), BLOCK_MARKER);
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 4);
    assert_eq!(&bytes[13..], &[b'<', 0, b'A', 0, b'/', 0, b'>', 0]);
}

#[test]
fn test_payload_block_layout_v2() {
    let mut writer = new_writer(FormatVersion::V2);
    writer.write_header("<A/>").unwrap();
    let header_len = 13 + 8;
    writer.write_payload("M1", &[9, 8, 7]).unwrap();
    assert_eq!(writer.blocks_written(), 1);
    let bytes = writer.finish().unwrap().into_inner();

    let mut cursor = Cursor::new(&bytes[header_len..]);
    assert_eq!(cursor.read_i32::<LittleEndian>().unwrap(), BLOCK_MAGIC);
    cursor.read_u32::<LittleEndian>().unwrap();
    assert_eq!(cursor.read_u8().unwrap(), BLOCK_MARKER);
    assert_eq!(cursor.read_u64::<LittleEndian>().unwrap(), 3);
    assert_eq!(cursor.read_u8().unwrap(), BLOCK_MARKER);
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
    assert_eq!(&bytes[bytes.len() - 3..], &[9, 8, 7]);
}

#[test]
fn test_payload_before_header() {
    let mut writer = new_writer(FormatVersion::V1);
    assert!(matches!(
        writer.write_payload("M1", &[1]),
        Err(WriterError::NotInitialized)
    ));
    assert!(matches!(writer.finish(), Err(WriterError::NotInitialized)));
}

#[test]
fn test_header_written_twice() {
    let mut writer = new_writer(FormatVersion::V1);
    writer.write_header("<A/>").unwrap();
    assert!(matches!(
        writer.write_header("<A/>"),
        Err(WriterError::HeaderAlreadyWritten)
    ));
}

#[test]
fn test_generated_header_parses() {
    let header = HeaderBuilder::new("exp & co")
        .version(2)
        .series(
            SeriesLayout::new(
                "stack",
                &[
                    (DimensionId::X, 8),
                    (DimensionId::Y, 4),
                    (DimensionId::Z, 3),
                    (DimensionId::T, 2),
                ],
            )
            .with_voxel_size(DimensionId::X, 0.5)
            .with_voxel_size(DimensionId::Z, 2.0)
            .with_duration(3.0),
        )
        .series(SeriesLayout::metadata_only("folder"))
        .build();

    let exp = Experiment::parse(header.as_bytes(), false).unwrap();
    assert_eq!(exp.version(), 2);
    assert_eq!(exp.name(), "exp & co");
    assert_eq!(exp.series_count(), 2);

    let s = &exp.series()[0];
    assert_eq!(s.memory_size(), 8 * 4 * 3 * 2);
    assert_eq!(s.bytes_inc(DimensionId::Y), Some(8));
    assert_eq!(s.bytes_inc(DimensionId::Z), Some(32));
    assert_eq!(s.bytes_inc(DimensionId::T), Some(96));
    assert_eq!(s.zx_ratio(), 4.0);
    assert_eq!(s.time_lapse(), 3.0);
    s.validate_layout().unwrap();

    assert_eq!(exp.series()[1].memory_size(), 0);
}

#[test]
fn test_generated_timestamps_are_captured() {
    let ticks = [(7u64 << 32) + 11, (7u64 << 32) + 12];
    let header = HeaderBuilder::new("exp")
        .series(
            SeriesLayout::new("s", &[(DimensionId::X, 2), (DimensionId::T, 2)])
                .with_timestamps(&ticks)
                .with_relative_timestamps(&[0.0, 1.5]),
        )
        .build();

    let mut exp = Experiment::parse(header.as_bytes(), true).unwrap();
    let raw = exp.raw_timestamps().unwrap();
    assert_eq!(raw.absolute, ticks);
    assert_eq!(raw.relative, vec![0.0, 1.5]);

    let s = &mut exp.series_mut()[0];
    assert_eq!(s.timestamps().unwrap(), &ticks);
    assert_eq!(s.relative_timestamps().unwrap(), &[0.0, 1.5]);
    assert_eq!(s.acquisition_times().unwrap().len(), 2);
}
