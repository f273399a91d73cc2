//! Per-series metadata view

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use super::dimension::{ChannelDescriptor, DimensionDescriptor, DimensionId};
use super::sanitize::join_ticks;
use super::xml::XmlElement;
use super::MetadataError;

const TIMESTAMP: &str = "TimeStamp";
const RELATIVE_TIMESTAMP: &str = "RelTimeStamp";

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Whether a timestamp kind has been pulled out of the element tree
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampState<T> {
    /// Still stored as elements in the tree
    Unextracted,
    /// Converted to a flat vector; the elements have been detached
    Extracted(Vec<T>),
}

impl<T> TimestampState<T> {
    /// Extracted values, or an empty slice if not extracted yet
    pub fn values(&self) -> &[T] {
        match self {
            TimestampState::Unextracted => &[],
            TimestampState::Extracted(values) => values,
        }
    }

    /// True once the values have been extracted
    pub fn is_extracted(&self) -> bool {
        matches!(self, TimestampState::Extracted(_))
    }
}

/// Metadata of one acquisition series
///
/// Descriptors are parsed eagerly when the header is read. Derived values
/// (shapes, pixel counts, scanner settings) are computed on first use and
/// cached for the lifetime of the series.
#[derive(Debug, Clone)]
pub struct SeriesMetadata {
    root: XmlElement,
    name: String,
    dimensions: Vec<DimensionDescriptor>,
    channels: Vec<ChannelDescriptor>,
    memory_size: u64,
    is_preview: bool,
    timestamps: TimestampState<u64>,
    relative_timestamps: TimestampState<f64>,
    frame_shape: OnceCell<Vec<u64>>,
    pixels_per_frame: OnceCell<u64>,
    pixels_per_slice: OnceCell<u64>,
    scanner_settings: OnceCell<HashMap<String, String>>,
}

impl SeriesMetadata {
    /// Build from an `Element` node whose nested `Element` nodes were already detached
    pub fn from_element(root: XmlElement) -> Result<Self, MetadataError> {
        let name = root.attribute("Name").unwrap_or_default().to_string();

        let dimensions = root
            .descendants("DimensionDescription")
            .map(DimensionDescriptor::from_element)
            .collect::<Result<Vec<_>, _>>()?;
        let channels = root
            .descendants("ChannelDescription")
            .map(ChannelDescriptor::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        let memory_size = match root.first_descendant("Memory") {
            Some(memory) => memory.parse_attribute("Size")?.unwrap_or(0),
            None => 0,
        };

        let is_preview = root
            .descendants("Attachment")
            .find(|a| a.attribute("Name") == Some("PreviewMarker"))
            .and_then(|a| a.attribute("isPreviewImage"))
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            root,
            name,
            dimensions,
            channels,
            memory_size,
            is_preview,
            timestamps: TimestampState::Unextracted,
            relative_timestamps: TimestampState::Unextracted,
            frame_shape: OnceCell::new(),
            pixels_per_frame: OnceCell::new(),
            pixels_per_slice: OnceCell::new(),
            scanner_settings: OnceCell::new(),
        })
    }

    /// Check that the declared strides and pixel counts stay inside the
    /// declared memory
    ///
    /// `required` in the error is the larger of the last addressed byte and
    /// the samples of one frame, saturated at `u64::MAX` on overflow.
    pub fn validate_layout(&self) -> Result<(), MetadataError> {
        if self.memory_size == 0 || self.dimensions.is_empty() {
            return Ok(());
        }
        let span = self.dimensions.iter().fold(1u64, |acc, d| {
            acc.saturating_add(d.count.saturating_sub(1).saturating_mul(d.bytes_inc))
        });
        let required = span
            .max(self.pixels_per_slice())
            .max(self.pixels_per_frame());
        if required > self.memory_size {
            return Err(MetadataError::InconsistentLayout {
                series: self.name.clone(),
                required,
                memory_size: self.memory_size,
            });
        }
        Ok(())
    }

    /// Series name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dimensions, in declaration order
    pub fn dimensions(&self) -> &[DimensionDescriptor] {
        &self.dimensions
    }

    /// Declared channels, in declaration order
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    /// Total payload byte length declared in the header
    pub fn memory_size(&self) -> u64 {
        self.memory_size
    }

    /// True if the series is marked as a preview image
    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    /// Descriptor of the given axis, if declared
    pub fn dimension(&self, axis: DimensionId) -> Option<&DimensionDescriptor> {
        self.dimensions.iter().find(|d| d.id == axis)
    }

    /// The two image-plane axes (the first two declared dimensions)
    pub fn plane_axes(&self) -> &[DimensionDescriptor] {
        &self.dimensions[..self.dimensions.len().min(2)]
    }

    /// True if `axis` is one of the plane axes
    pub fn is_plane_axis(&self, axis: DimensionId) -> bool {
        self.plane_axes().iter().any(|d| d.id == axis)
    }

    /// True if the series declares a Z axis
    pub fn has_z(&self) -> bool {
        self.dimension(DimensionId::Z).is_some()
    }

    /// Byte stride of an axis, if declared
    pub fn bytes_inc(&self, axis: DimensionId) -> Option<u64> {
        self.dimension(axis).map(|d| d.bytes_inc)
    }

    /// Element counts of every axis except time, in declaration order
    pub fn frame_shape(&self) -> &[u64] {
        self.frame_shape.get_or_init(|| {
            self.dimensions
                .iter()
                .filter(|d| d.id != DimensionId::T)
                .map(|d| d.count)
                .collect()
        })
    }

    /// Element counts of the two plane axes
    pub fn plane_shape(&self) -> &[u64] {
        let shape = self.frame_shape();
        &shape[..shape.len().min(2)]
    }

    /// Number of samples in one time frame
    ///
    /// Saturates at `u64::MAX` when the declared counts overflow; such a
    /// series fails [`validate_layout`](Self::validate_layout).
    pub fn pixels_per_frame(&self) -> u64 {
        *self
            .pixels_per_frame
            .get_or_init(|| checked_product(self.frame_shape()).unwrap_or(u64::MAX))
    }

    /// Number of samples in one plane, saturating like
    /// [`pixels_per_frame`](Self::pixels_per_frame)
    pub fn pixels_per_slice(&self) -> u64 {
        *self
            .pixels_per_slice
            .get_or_init(|| checked_product(self.plane_shape()).unwrap_or(u64::MAX))
    }

    /// Number of planes in one time frame
    pub fn slices_per_frame(&self) -> u64 {
        match self.pixels_per_slice() {
            0 => 0,
            per_slice => self.pixels_per_frame() / per_slice,
        }
    }

    /// Number of time frames (1 without a time axis)
    pub fn frame_count(&self) -> u64 {
        self.dimension(DimensionId::T).map(|d| d.count).unwrap_or(1)
    }

    /// Total duration of the acquisition, from the time axis `Length`
    pub fn total_duration(&self) -> f64 {
        self.dimension(DimensionId::T)
            .and_then(|d| d.length)
            .unwrap_or(0.0)
    }

    /// Average interval between two frames in seconds
    pub fn time_lapse(&self) -> f64 {
        match self.frame_count() {
            0 | 1 => 0.0,
            n => self.total_duration() / (n - 1) as f64,
        }
    }

    /// Sample resolution of a channel in bits
    pub fn resolution(&self, channel: usize) -> Option<u32> {
        self.channels.get(channel).map(|c| c.resolution)
    }

    /// Widest sample resolution over all channels (8 when none are declared)
    pub fn bits_per_sample(&self) -> u32 {
        self.channels
            .iter()
            .map(|c| c.resolution)
            .max()
            .unwrap_or(8)
    }

    /// Raw value of a scanner setting record
    pub fn scanner_setting(&self, identifier: &str) -> Option<&str> {
        self.scanner_settings
            .get_or_init(|| {
                let mut settings = HashMap::new();
                for record in self.root.descendants("ScannerSettingRecord") {
                    if let (Some(id), Some(variant)) =
                        (record.attribute("Identifier"), record.attribute("Variant"))
                    {
                        settings.entry(id.to_string()).or_insert_with(|| variant.to_string());
                    }
                }
                settings
            })
            .get(identifier)
            .map(String::as_str)
    }

    /// Voxel size along an axis, from the `dblVoxel<axis>` scanner setting
    pub fn voxel_size(&self, axis: DimensionId) -> Option<f64> {
        self.scanner_setting(&format!("dblVoxel{}", axis.label()))?
            .trim()
            .parse()
            .ok()
    }

    /// Voxel sizes of every declared axis that has one
    pub fn voxel_sizes(&self) -> BTreeMap<DimensionId, f64> {
        self.dimensions
            .iter()
            .filter_map(|d| Some((d.id, self.voxel_size(d.id)?)))
            .collect()
    }

    /// Ratio of Z to X voxel size (1.0 without a Z axis)
    pub fn zx_ratio(&self) -> f64 {
        if !self.has_z() {
            return 1.0;
        }
        match (self.voxel_size(DimensionId::Z), self.voxel_size(DimensionId::X)) {
            (Some(z), Some(x)) if x != 0.0 => z / x,
            _ => 1.0,
        }
    }

    /// Descendant elements of the series node with the given tag name
    ///
    /// Timestamp elements are reported as absent once they have been
    /// extracted.
    pub fn find_elements(&self, name: &str) -> Vec<&XmlElement> {
        let consumed = (name == TIMESTAMP && self.timestamps.is_extracted())
            || (name == RELATIVE_TIMESTAMP && self.relative_timestamps.is_extracted());
        if consumed {
            return Vec::new();
        }
        self.root.descendants(name).collect()
    }

    /// Absolute timestamps, `(high << 32) + low` in FILETIME ticks
    ///
    /// The first call detaches the `TimeStamp` elements from the tree;
    /// later calls return the cached values.
    pub fn timestamps(&mut self) -> Result<&[u64], MetadataError> {
        if !self.timestamps.is_extracted() {
            let values = self
                .root
                .descendants(TIMESTAMP)
                .map(|e| {
                    let high: u64 = e.require_attribute("HighInteger")?;
                    let low: u64 = e.require_attribute("LowInteger")?;
                    join_ticks(high, low).ok_or_else(|| {
                        MetadataError::InvalidAttributeValue(format!(
                            "{}/@HighInteger,LowInteger = {}, {}",
                            TIMESTAMP, high, low
                        ))
                    })
                })
                .collect::<Result<Vec<_>, MetadataError>>()?;
            self.root.remove_descendants(TIMESTAMP);
            self.timestamps = TimestampState::Extracted(values);
        }
        Ok(self.timestamps.values())
    }

    /// Relative timestamps in seconds
    ///
    /// Same single-use semantics as [`timestamps`](Self::timestamps).
    pub fn relative_timestamps(&mut self) -> Result<&[f64], MetadataError> {
        if !self.relative_timestamps.is_extracted() {
            let values = self
                .root
                .descendants(RELATIVE_TIMESTAMP)
                .map(|e| e.require_attribute::<f64>("Time"))
                .collect::<Result<Vec<_>, MetadataError>>()?;
            self.root.remove_descendants(RELATIVE_TIMESTAMP);
            self.relative_timestamps = TimestampState::Extracted(values);
        }
        Ok(self.relative_timestamps.values())
    }

    /// Take over timestamps captured from tags stripped out of this series
    ///
    /// Values of timestamp tags still in the tree follow the captured ones.
    pub(crate) fn absorb_timestamps(
        &mut self,
        mut absolute: Vec<u64>,
        mut relative: Vec<f64>,
    ) -> Result<(), MetadataError> {
        absolute.extend_from_slice(self.timestamps()?);
        relative.extend_from_slice(self.relative_timestamps()?);
        self.timestamps = TimestampState::Extracted(absolute);
        self.relative_timestamps = TimestampState::Extracted(relative);
        Ok(())
    }

    /// Absolute timestamps as UTC date-times
    pub fn acquisition_times(&mut self) -> Result<Vec<DateTime<Utc>>, MetadataError> {
        Ok(self
            .timestamps()?
            .iter()
            .filter_map(|&ticks| filetime_to_datetime(ticks))
            .collect())
    }
}

fn checked_product(counts: &[u64]) -> Option<u64> {
    counts.iter().try_fold(1u64, |acc, &n| acc.checked_mul(n))
}

/// Convert Windows FILETIME ticks (100 ns since 1601-01-01) to UTC
pub fn filetime_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    let secs = (ticks / FILETIME_TICKS_PER_SEC) as i64 - FILETIME_UNIX_OFFSET_SECS;
    let nanos = ((ticks % FILETIME_TICKS_PER_SEC) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}
