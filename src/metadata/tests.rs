use super::*;

const HEADER: &str = r#"<LMSDataContainerHeader Version="2">
<Element Name="exp.lif">
  <Children>
    <Element Name="Series001">
      <Data><Image>
        <ImageDescription>
          <Channels>
            <ChannelDescription ChannelTag="0" Resolution="8" LUTName="Gray"/>
          </Channels>
          <Dimensions>
            <DimensionDescription DimID="1" NumberOfElements="16" BytesInc="1" Unit="m"/>
            <DimensionDescription DimID="2" NumberOfElements="8" BytesInc="16"/>
            <DimensionDescription DimID="3" NumberOfElements="5" BytesInc="128"/>
            <DimensionDescription DimID="4" NumberOfElements="3" BytesInc="640" Length="10.0"/>
          </Dimensions>
        </ImageDescription>
        <Attachment Name="HardwareSetting">
          <ScannerSettingRecord Identifier="dblVoxelX" Variant="0.25"/>
          <ScannerSettingRecord Identifier="dblVoxelY" Variant="0.25"/>
          <ScannerSettingRecord Identifier="dblVoxelZ" Variant="1.0"/>
        </Attachment>
        <TimeStampList>
          <TimeStamp HighInteger="30000000" LowInteger="100"/>
          <TimeStamp LowInteger="200" HighInteger="30000000"/>
          <TimeStamp LowInteger="300" HighInteger="30000000"/>
        </TimeStampList>
        <RelTimeStamp Time="0.0" Frame="0"/>
        <RelTimeStamp Frame="1" Time="5.0" />
      </Image></Data>
      <Memory Size="1920" MemoryBlockID="MemBlock_1"/>
    </Element>
    <Element Name="Preview">
      <Data><Image><ImageDescription>
        <Channels><ChannelDescription ChannelTag="1" Resolution="8"/></Channels>
        <Dimensions>
          <DimensionDescription DimID="1" NumberOfElements="4" BytesInc="1"/>
          <DimensionDescription DimID="2" NumberOfElements="4" BytesInc="4"/>
        </Dimensions>
      </ImageDescription>
      <Attachment Name="PreviewMarker" isPreviewImage="1"/>
      </Image></Data>
      <Memory Size="16"/>
    </Element>
    <Element Name="Folder">
      <Memory Size="0"/>
    </Element>
  </Children>
</Element>
</LMSDataContainerHeader>"#;

#[test]
fn test_parse_experiment() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    assert_eq!(exp.version(), 2);
    assert_eq!(exp.name(), "exp.lif");
    assert_eq!(exp.series_count(), 3);
    assert!(exp.raw_timestamps().is_none());

    let names: Vec<_> = exp.series().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Series001", "Preview", "Folder"]);
}

#[test]
fn test_parse_interleaved_header() {
    let raw: Vec<u8> = HEADER.bytes().flat_map(|b| [b, 0]).collect();
    let exp = Experiment::from_interleaved(&raw, false).unwrap();
    assert_eq!(exp.series_count(), 3);
}

#[test]
fn test_series_descriptors() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let s = &exp.series()[0];

    assert_eq!(s.memory_size(), 1920);
    assert!(!s.is_preview());
    assert!(s.has_z());
    assert_eq!(s.dimensions().len(), 4);
    assert_eq!(s.channels().len(), 1);
    assert_eq!(s.channels()[0].tag, ChannelTag::Gray);
    assert_eq!(s.resolution(0), Some(8));
    assert_eq!(s.bytes_inc(DimensionId::T), Some(640));
    assert_eq!(s.bytes_inc(DimensionId::Lambda), None);
    assert_eq!(s.dimensions()[0].unit.as_deref(), Some("m"));
    s.validate_layout().unwrap();
}

#[test]
fn test_derived_quantities() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let s = &exp.series()[0];

    assert_eq!(s.frame_shape(), &[16, 8, 5]);
    assert_eq!(s.plane_shape(), &[16, 8]);
    assert_eq!(s.pixels_per_frame(), 640);
    assert_eq!(s.pixels_per_slice(), 128);
    assert_eq!(s.slices_per_frame(), 5);
    assert_eq!(s.frame_count(), 3);
    assert_eq!(s.total_duration(), 10.0);
    assert_eq!(s.time_lapse(), 5.0);
    assert!(s.is_plane_axis(DimensionId::X));
    assert!(s.is_plane_axis(DimensionId::Y));
    assert!(!s.is_plane_axis(DimensionId::Z));
}

#[test]
fn test_voxel_sizes() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let s = &exp.series()[0];

    assert_eq!(s.voxel_size(DimensionId::X), Some(0.25));
    assert_eq!(s.scanner_setting("dblVoxelZ"), Some("1.0"));
    assert_eq!(s.zx_ratio(), 4.0);
    let sizes = s.voxel_sizes();
    assert_eq!(sizes.len(), 3);
    assert_eq!(sizes.get(&DimensionId::Z), Some(&1.0));

    let preview = &exp.series()[1];
    assert_eq!(preview.zx_ratio(), 1.0);
    assert!(preview.voxel_sizes().is_empty());
}

#[test]
fn test_preview_marker() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    assert!(exp.series()[1].is_preview());
    assert_eq!(exp.series()[1].frame_count(), 1);
    assert_eq!(exp.series()[1].time_lapse(), 0.0);
}

#[test]
fn test_metadata_only_series() {
    let exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let folder = &exp.series()[2];
    assert_eq!(folder.memory_size(), 0);
    assert!(folder.dimensions().is_empty());
    assert_eq!(folder.pixels_per_frame(), 1);
    assert_eq!(folder.slices_per_frame(), 1);
    folder.validate_layout().unwrap();
}

#[test]
fn test_nested_elements_are_separate_series() {
    let header = r#"<H Version="1"><Element Name="root"><Element Name="outer">
        <Memory Size="4"/>
        <DimensionDescription DimID="1" NumberOfElements="4" BytesInc="1"/>
        <Element Name="inner">
            <DimensionDescription DimID="1" NumberOfElements="2" BytesInc="1"/>
            <Memory Size="2"/>
        </Element>
    </Element></Element></H>"#;
    let exp = Experiment::parse(header.as_bytes(), false).unwrap();
    assert_eq!(exp.version(), 1);
    assert_eq!(exp.series_count(), 2);
    assert_eq!(exp.series()[0].name(), "outer");
    assert_eq!(exp.series()[0].dimensions().len(), 1);
    assert_eq!(exp.series()[0].memory_size(), 4);
    assert_eq!(exp.series()[1].name(), "inner");
    assert_eq!(exp.series()[1].memory_size(), 2);
}

#[test]
fn test_sanitized_timestamps_are_captured() {
    let exp = Experiment::parse(HEADER.as_bytes(), true).unwrap();
    let raw = exp.raw_timestamps().unwrap();
    assert_eq!(raw.absolute, vec![(30_000_000u64 << 32) + 100]);
    assert_eq!(raw.relative, vec![0.0]);
}

#[test]
fn test_captured_timestamps_reach_their_series() {
    let mut exp = Experiment::parse(HEADER.as_bytes(), true).unwrap();
    let s = &mut exp.series_mut()[0];

    let base = 30_000_000u64 << 32;
    assert_eq!(s.timestamps().unwrap(), &[base + 100, base + 200, base + 300]);
    assert_eq!(s.relative_timestamps().unwrap(), &[0.0, 5.0]);
    assert!(s.find_elements("TimeStamp").is_empty());
    assert_eq!(s.acquisition_times().unwrap().len(), 3);

    let preview = &mut exp.series_mut()[1];
    assert!(preview.timestamps().unwrap().is_empty());
}

#[test]
fn test_overflowing_tree_timestamp_is_rejected() {
    let header = r#"<H><Element Name="e"/><Element Name="s">
        <TimeStamp LowInteger="18446744073709551615" HighInteger="1"/>
    </Element></H>"#;
    let mut exp = Experiment::parse(header.as_bytes(), false).unwrap();
    assert!(matches!(
        exp.series_mut()[0].timestamps(),
        Err(MetadataError::InvalidAttributeValue(_))
    ));
}

#[test]
fn test_tree_timestamps_are_single_use() {
    let mut exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let s = &mut exp.series_mut()[0];

    // Only the tags that survived sanitization are in the tree.
    assert_eq!(s.find_elements("TimeStamp").len(), 2);
    assert_eq!(s.find_elements("RelTimeStamp").len(), 1);

    let expected = vec![(30_000_000u64 << 32) + 200, (30_000_000u64 << 32) + 300];
    assert_eq!(s.timestamps().unwrap(), expected.as_slice());
    assert!(s.find_elements("TimeStamp").is_empty());
    assert_eq!(s.timestamps().unwrap(), expected.as_slice());

    assert_eq!(s.relative_timestamps().unwrap(), &[5.0]);
    assert!(s.find_elements("RelTimeStamp").is_empty());
    assert_eq!(s.relative_timestamps().unwrap(), &[5.0]);
}

#[test]
fn test_acquisition_times() {
    let mut exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    let times = exp.series_mut()[0].acquisition_times().unwrap();
    assert_eq!(times.len(), 2);
    assert!(times[0] < times[1]);
}

#[test]
fn test_filetime_conversion() {
    // 2000-01-01T00:00:00Z
    let ticks = (946_684_800u64 + 11_644_473_600) * 10_000_000;
    let dt = filetime_to_datetime(ticks).unwrap();
    assert_eq!(dt.to_rfc3339(), "2000-01-01T00:00:00+00:00");
}

#[test]
fn test_extract_all_timestamps() {
    let mut exp = Experiment::parse(HEADER.as_bytes(), false).unwrap();
    exp.extract_all_timestamps().unwrap();
    for s in exp.series() {
        assert!(s.find_elements("TimeStamp").is_empty());
        assert!(s.find_elements("RelTimeStamp").is_empty());
    }
}

#[test]
fn test_inconsistent_layout() {
    let header = r#"<H><Element Name="e"/><Element Name="s">
        <DimensionDescription DimID="1" NumberOfElements="10" BytesInc="1"/>
        <DimensionDescription DimID="2" NumberOfElements="10" BytesInc="10"/>
        <Memory Size="50"/>
    </Element></H>"#;
    let exp = Experiment::parse(header.as_bytes(), false).unwrap();
    match exp.series()[0].validate_layout() {
        Err(MetadataError::InconsistentLayout {
            required,
            memory_size,
            ..
        }) => {
            assert_eq!(required, 100);
            assert_eq!(memory_size, 50);
        }
        other => panic!("expected layout error, got {:?}", other),
    }
}

#[test]
fn test_overflowing_pixel_count_is_inconsistent() {
    let header = r#"<H><Element Name="e"/><Element Name="huge">
        <DimensionDescription DimID="1" NumberOfElements="4294967296" BytesInc="0"/>
        <DimensionDescription DimID="2" NumberOfElements="4294967296" BytesInc="0"/>
        <Memory Size="1"/>
    </Element></H>"#;
    let exp = Experiment::parse(header.as_bytes(), false).unwrap();
    let s = &exp.series()[0];
    assert_eq!(s.pixels_per_slice(), u64::MAX);
    assert_eq!(s.pixels_per_frame(), u64::MAX);
    match s.validate_layout() {
        Err(MetadataError::InconsistentLayout { required, .. }) => assert_eq!(required, u64::MAX),
        other => panic!("expected layout error, got {:?}", other),
    }
}

#[test]
fn test_zero_stride_plane_larger_than_memory() {
    let header = r#"<H><Element Name="e"/><Element Name="flat">
        <DimensionDescription DimID="1" NumberOfElements="8" BytesInc="0"/>
        <DimensionDescription DimID="2" NumberOfElements="8" BytesInc="0"/>
        <Memory Size="16"/>
    </Element></H>"#;
    let exp = Experiment::parse(header.as_bytes(), false).unwrap();
    assert!(matches!(
        exp.series()[0].validate_layout(),
        Err(MetadataError::InconsistentLayout { required: 64, memory_size: 16, .. })
    ));
}

#[test]
fn test_malformed_header() {
    let result = Experiment::parse(b"<H><Element Name=\"e\"></H>", false);
    assert!(result.is_err());

    let result = Experiment::parse(b"<H Version=\"two\"><Element/></H>", false);
    assert!(matches!(result, Err(MetadataError::InvalidAttributeValue(_))));

    let result = Experiment::parse(b"<H Version=\"2\"/>", false);
    assert!(matches!(result, Err(MetadataError::InvalidStructure(_))));
}

#[test]
fn test_non_ascii_is_dropped_before_parsing() {
    let header = b"<H><Element Name=\"\xb5scope\"/></H>";
    let exp = Experiment::parse(header, false).unwrap();
    assert_eq!(exp.name(), "scope");
}
