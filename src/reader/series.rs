//! Random access to the pixels of one series

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use ndarray::{Array2, ArrayD, IxDyn};

use crate::metadata::{DimensionId, SeriesMetadata};

use super::iterators::{FrameIterator, SliceIterator};
use super::{PayloadLocation, ReaderError};

/// Partial assignment of indices to iteration axes
///
/// Axes left out are taken at index 0. Plane axes must never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coordinates(BTreeMap<DimensionId, u64>);

impl Coordinates {
    /// Empty assignment (the first plane of the series)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, axis: DimensionId, index: u64) -> Self {
        self.set(axis, index);
        self
    }

    /// Assign an index to an axis, replacing any previous one
    pub fn set(&mut self, axis: DimensionId, index: u64) {
        self.0.insert(axis, index);
    }

    /// Index assigned to an axis
    pub fn get(&self, axis: DimensionId) -> Option<u64> {
        self.0.get(&axis).copied()
    }

    /// Assigned axes in axis order
    pub fn iter(&self) -> impl Iterator<Item = (DimensionId, u64)> + '_ {
        self.0.iter().map(|(&axis, &index)| (axis, index))
    }

    /// True if no axis is assigned
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(DimensionId, u64)> for Coordinates {
    fn from_iter<I: IntoIterator<Item = (DimensionId, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Pixel accessor bound to one series payload
///
/// Borrows the container source mutably; every random-access read seeks
/// first, so a failed read leaves the accessor usable.
pub struct SeriesReader<'a, R> {
    metadata: &'a SeriesMetadata,
    payload: PayloadLocation,
    source: &'a mut R,
}

impl<'a, R: Read + Seek> SeriesReader<'a, R> {
    pub(crate) fn new(
        metadata: &'a SeriesMetadata,
        payload: PayloadLocation,
        source: &'a mut R,
    ) -> Self {
        Self {
            metadata,
            payload,
            source,
        }
    }

    /// Metadata of the series
    pub fn metadata(&self) -> &'a SeriesMetadata {
        self.metadata
    }

    /// Location of the series payload
    pub fn payload(&self) -> PayloadLocation {
        self.payload
    }

    /// Absolute byte offset of the plane selected by `coords`
    pub fn offset_for(&self, coords: &Coordinates) -> Result<u64, ReaderError> {
        Ok(self.payload.offset + self.relative_offset(coords)?)
    }

    /// Byte offset of the plane selected by `coords`, relative to the payload start
    pub fn relative_offset(&self, coords: &Coordinates) -> Result<u64, ReaderError> {
        let metadata = self.metadata;
        let mut offset = 0u64;
        for (axis, index) in coords.iter() {
            let dimension = match metadata.dimension(axis) {
                Some(d) if !metadata.is_plane_axis(axis) => d,
                _ => {
                    return Err(ReaderError::InvalidAxis {
                        axis,
                        series: metadata.name().to_string(),
                    })
                }
            };
            offset = offset.saturating_add(index.saturating_mul(dimension.bytes_inc));
        }

        if offset >= metadata.memory_size() {
            return Err(ReaderError::OutOfBounds {
                offset,
                memory_size: metadata.memory_size(),
            });
        }

        for (axis, index) in coords.iter() {
            let count = metadata.dimension(axis).map(|d| d.count).unwrap_or(0);
            if index >= count {
                return Err(ReaderError::IndexOutOfRange { axis, index, count });
            }
        }

        Ok(offset)
    }

    /// Read one plane, shaped `(height, width)`
    pub fn read_plane(&mut self, coords: &Coordinates) -> Result<Array2<u8>, ReaderError> {
        let offset = self.relative_offset(coords)?;
        self.read_plane_at(offset, true)
    }

    /// Read every plane of time frame `t`, shaped by the reversed frame shape
    ///
    /// A series without a time axis has a single frame, `t = 0`.
    pub fn read_volume(&mut self, t: u64) -> Result<ArrayD<u8>, ReaderError> {
        self.read_frame(t, true)
    }

    /// Stream every time frame, in order
    pub fn frames(self) -> FrameIterator<'a, R> {
        FrameIterator::new(self)
    }

    /// Stream every plane, time-major
    pub fn slices(self) -> SliceIterator<'a, R> {
        SliceIterator::new(self)
    }

    /// Relative offset of frame `t`, checked against the time axis
    pub(crate) fn frame_offset(&self, t: u64) -> Result<u64, ReaderError> {
        if self.metadata.dimension(DimensionId::T).is_some() {
            return self.relative_offset(&Coordinates::new().with(DimensionId::T, t));
        }
        if t != 0 {
            return Err(ReaderError::IndexOutOfRange {
                axis: DimensionId::T,
                index: t,
                count: 1,
            });
        }
        Ok(0)
    }

    pub(crate) fn read_frame(&mut self, t: u64, seek: bool) -> Result<ArrayD<u8>, ReaderError> {
        let offset = self.frame_offset(t)?;
        let data = self.read_bytes(offset, self.metadata.pixels_per_frame(), seek)?;
        let shape: Vec<usize> = self
            .metadata
            .frame_shape()
            .iter()
            .rev()
            .map(|&n| n as usize)
            .collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
    }

    pub(crate) fn read_plane_at(&mut self, offset: u64, seek: bool) -> Result<Array2<u8>, ReaderError> {
        let data = self.read_bytes(offset, self.metadata.pixels_per_slice(), seek)?;
        let (height, width) = match *self.metadata.plane_shape() {
            [width, height] => (height as usize, width as usize),
            [width] => (1, width as usize),
            _ => (0, 0),
        };
        Ok(Array2::from_shape_vec((height, width), data)?)
    }

    /// Read `len` bytes at a relative offset; without `seek` the source
    /// must already be positioned there
    fn read_bytes(&mut self, offset: u64, len: u64, seek: bool) -> Result<Vec<u8>, ReaderError> {
        self.ensure_8bit()?;
        // A block shorter than the declared memory bounds reads too
        let memory_size = self.metadata.memory_size().min(self.payload.size);
        if offset.saturating_add(len) > memory_size {
            return Err(ReaderError::OutOfBounds {
                offset: offset.saturating_add(len),
                memory_size,
            });
        }
        if seek {
            self.source
                .seek(SeekFrom::Start(self.payload.offset + offset))?;
        }
        let mut buffer = vec![0u8; len as usize];
        self.source.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn ensure_8bit(&self) -> Result<(), ReaderError> {
        let bits = self.metadata.bits_per_sample();
        if bits > 8 {
            return Err(ReaderError::UnsupportedFeature(format!(
                "{}-bit samples in series '{}'",
                bits,
                self.metadata.name()
            )));
        }
        Ok(())
    }
}
