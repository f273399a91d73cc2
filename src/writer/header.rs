use std::fmt::Write;

use quick_xml::escape::escape;

use crate::metadata::{ChannelTag, DimensionId};

/// Layout of one series in a generated header
///
/// Axes are stored packed: each axis stride is the product of the element
/// counts of the axes declared before it.
#[derive(Debug, Clone)]
pub struct SeriesLayout {
    name: String,
    dimensions: Vec<(DimensionId, u64)>,
    channels: Vec<ChannelTag>,
    resolution: u32,
    voxel_sizes: Vec<(DimensionId, f64)>,
    duration: Option<f64>,
    timestamps: Vec<u64>,
    relative_timestamps: Vec<f64>,
    preview: bool,
}

impl SeriesLayout {
    /// Single 8-bit gray channel over the given axes
    pub fn new(name: &str, dimensions: &[(DimensionId, u64)]) -> Self {
        Self {
            name: name.to_string(),
            dimensions: dimensions.to_vec(),
            channels: vec![ChannelTag::Gray],
            resolution: 8,
            voxel_sizes: Vec::new(),
            duration: None,
            timestamps: Vec::new(),
            relative_timestamps: Vec::new(),
            preview: false,
        }
    }

    /// Series without pixel data
    pub fn metadata_only(name: &str) -> Self {
        let mut layout = Self::new(name, &[]);
        layout.channels.clear();
        layout
    }

    /// Replace the channel list
    pub fn with_channels(mut self, channels: &[ChannelTag]) -> Self {
        self.channels = channels.to_vec();
        self
    }

    /// Sample resolution in bits for every channel
    pub fn with_resolution(mut self, bits: u32) -> Self {
        self.resolution = bits;
        self
    }

    /// Add a `dblVoxel<axis>` scanner setting
    pub fn with_voxel_size(mut self, axis: DimensionId, size: f64) -> Self {
        self.voxel_sizes.push((axis, size));
        self
    }

    /// Time axis `Length` in seconds
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Absolute timestamps in FILETIME ticks
    pub fn with_timestamps(mut self, ticks: &[u64]) -> Self {
        self.timestamps = ticks.to_vec();
        self
    }

    /// Relative timestamps in seconds
    pub fn with_relative_timestamps(mut self, seconds: &[f64]) -> Self {
        self.relative_timestamps = seconds.to_vec();
        self
    }

    /// Mark as a preview image
    pub fn preview(mut self) -> Self {
        self.preview = true;
        self
    }

    /// Payload size in bytes (0 without axes)
    pub fn memory_size(&self) -> u64 {
        if self.dimensions.is_empty() {
            return 0;
        }
        self.dimensions.iter().map(|&(_, count)| count).product()
    }

    fn write_xml(&self, out: &mut String, block_id: usize) -> std::fmt::Result {
        writeln!(out, r#"<Element Name="{}"><Data><Image>"#, escape(&self.name))?;
        writeln!(out, "<ImageDescription><Channels>")?;
        for channel in &self.channels {
            writeln!(
                out,
                r#"<ChannelDescription ChannelTag="{}" Resolution="{}"/>"#,
                channel.tag_id(),
                self.resolution
            )?;
        }
        writeln!(out, "</Channels><Dimensions>")?;
        let mut stride = 1u64;
        for &(axis, count) in &self.dimensions {
            write!(
                out,
                r#"<DimensionDescription DimID="{}" NumberOfElements="{}" BytesInc="{}""#,
                axis.dim_id(),
                count,
                stride
            )?;
            if let (DimensionId::T, Some(duration)) = (axis, self.duration) {
                write!(out, r#" Length="{}" Unit="s""#, duration)?;
            }
            writeln!(out, "/>")?;
            stride *= count;
        }
        writeln!(out, "</Dimensions></ImageDescription>")?;

        if !self.voxel_sizes.is_empty() {
            writeln!(out, r#"<Attachment Name="HardwareSetting">"#)?;
            for (axis, size) in &self.voxel_sizes {
                writeln!(
                    out,
                    r#"<ScannerSettingRecord Identifier="dblVoxel{}" Variant="{}"/>"#,
                    axis.label(),
                    size
                )?;
            }
            writeln!(out, "</Attachment>")?;
        }
        if self.preview {
            writeln!(out, r#"<Attachment Name="PreviewMarker" isPreviewImage="1"/>"#)?;
        }
        if !self.timestamps.is_empty() {
            writeln!(out, "<TimeStampList>")?;
            for ticks in &self.timestamps {
                writeln!(
                    out,
                    r#"<TimeStamp HighInteger="{}" LowInteger="{}"/>"#,
                    ticks >> 32,
                    ticks & 0xFFFF_FFFF
                )?;
            }
            writeln!(out, "</TimeStampList>")?;
        }
        for (frame, time) in self.relative_timestamps.iter().enumerate() {
            writeln!(out, r#"<RelTimeStamp Time="{:.4}" Frame="{}"/>"#, time, frame)?;
        }
        writeln!(out, "</Image></Data>")?;
        writeln!(
            out,
            r#"<Memory Size="{}" MemoryBlockID="MemBlock_{}"/>"#,
            self.memory_size(),
            block_id
        )?;
        writeln!(out, "</Element>")
    }
}

/// Builds the XML header of a container
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    name: String,
    version: u32,
    series: Vec<SeriesLayout>,
}

impl HeaderBuilder {
    /// Empty experiment with format version 1
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: 1,
            series: Vec::new(),
        }
    }

    /// Set the `Version` attribute
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Append a series
    pub fn series(mut self, layout: SeriesLayout) -> Self {
        self.series.push(layout);
        self
    }

    /// Series added so far
    pub fn layouts(&self) -> &[SeriesLayout] {
        &self.series
    }

    /// Render the header
    pub fn build(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, r#"<LMSDataContainerHeader Version="{}">"#, self.version)?;
        writeln!(out, r#"<Element Name="{}"><Children>"#, escape(&self.name))?;
        for (i, layout) in self.series.iter().enumerate() {
            layout.write_xml(out, i + 1)?;
        }
        writeln!(out, "</Children></Element>")?;
        writeln!(out, "</LMSDataContainerHeader>")
    }
}
