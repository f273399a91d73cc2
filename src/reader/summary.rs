use std::fmt;

use serde::Serialize;

use crate::metadata::SeriesMetadata;

use super::{FormatVersion, LifReader, PayloadLocation};

/// One declared axis, as shown in listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSummary {
    /// Axis label
    pub axis: String,
    /// Number of elements
    pub count: u64,
}

/// Overview of one series
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    /// Position in the series list
    pub index: usize,
    /// Series name
    pub name: String,
    /// Channel tags, in declaration order
    pub channels: Vec<String>,
    /// Axes, in declaration order
    pub dimensions: Vec<AxisSummary>,
    /// Declared payload size in bytes
    pub memory_size: u64,
    /// Payload location, if the series has pixel data
    pub payload: Option<PayloadLocation>,
    /// Marked as a preview image
    pub is_preview: bool,
}

impl SeriesSummary {
    pub(crate) fn new(
        index: usize,
        metadata: &SeriesMetadata,
        payload: Option<PayloadLocation>,
    ) -> Self {
        Self {
            index,
            name: metadata.name().to_string(),
            channels: metadata.channels().iter().map(|c| c.tag.to_string()).collect(),
            dimensions: metadata
                .dimensions()
                .iter()
                .map(|d| AxisSummary {
                    axis: d.id.label(),
                    count: d.count,
                })
                .collect(),
            memory_size: metadata.memory_size(),
            payload,
            is_preview: metadata.is_preview(),
        }
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "({}) {}: {} channels and {} dimensions",
            self.index,
            self.name,
            self.channels.len(),
            self.dimensions.len()
        )?;
        for channel in &self.channels {
            write!(f, " {}", channel)?;
        }
        for dimension in &self.dimensions {
            write!(f, " {}{}", dimension.axis, dimension.count)?;
        }
        Ok(())
    }
}

/// Overview of a whole container
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    /// Experiment name
    pub name: String,
    /// Header format version
    pub version: u32,
    /// Block size field width in bytes
    pub size_field_width: usize,
    /// Every series, in header order
    pub series: Vec<SeriesSummary>,
}

impl<R> LifReader<R> {
    /// Overview of one series
    pub fn describe_series(&self, index: usize) -> Option<SeriesSummary> {
        let metadata = self.series_metadata(index)?;
        Some(SeriesSummary::new(index, metadata, self.payload(index)))
    }

    /// Overview of every series in the container
    pub fn summary(&self) -> ContainerSummary {
        let experiment = self.experiment();
        ContainerSummary {
            name: experiment.name().to_string(),
            version: experiment.version(),
            size_field_width: self.format_version().size_field_width(),
            series: (0..self.series_count())
                .filter_map(|i| self.describe_series(i))
                .collect(),
        }
    }
}

impl ContainerSummary {
    /// Block size width the container uses
    pub fn format_version(&self) -> FormatVersion {
        FormatVersion::from_header_version(self.version)
    }
}

impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Experiment: {}", self.name)?;
        for series in &self.series {
            writeln!(f, "{}", series)?;
        }
        Ok(())
    }
}
