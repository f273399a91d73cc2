use std::io::{Read, Seek};
use std::iter::FusedIterator;

use ndarray::{Array2, ArrayD};

use crate::metadata::DimensionId;

use super::{ReaderError, SeriesReader};

/// Forward-only iterator over the time frames of a series
///
/// The first frame is located with an absolute seek. Later frames are read
/// straight after the previous one when frames are stored back to back,
/// and seeked to otherwise. Stops for good after the first error.
pub struct FrameIterator<'a, R> {
    reader: SeriesReader<'a, R>,
    next_frame: u64,
    frame_count: u64,
    /// Frames follow each other without gaps
    contiguous: bool,
    exhausted: bool,
}

impl<'a, R: Read + Seek> FrameIterator<'a, R> {
    pub(super) fn new(reader: SeriesReader<'a, R>) -> Self {
        let metadata = reader.metadata();
        let contiguous = match metadata.bytes_inc(DimensionId::T) {
            Some(stride) => stride == metadata.pixels_per_frame(),
            None => true,
        };
        Self {
            frame_count: metadata.frame_count(),
            reader,
            next_frame: 0,
            contiguous,
            exhausted: false,
        }
    }
}

impl<R: Read + Seek> Iterator for FrameIterator<'_, R> {
    type Item = Result<(u64, ArrayD<u8>), ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.next_frame >= self.frame_count {
            return None;
        }
        let t = self.next_frame;
        let seek = t == 0 || !self.contiguous;
        match self.reader.read_frame(t, seek) {
            Ok(volume) => {
                self.next_frame += 1;
                Some(Ok((t, volume)))
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        let remaining = (self.frame_count - self.next_frame) as usize;
        (0, Some(remaining))
    }
}

impl<R: Read + Seek> FusedIterator for FrameIterator<'_, R> {}

/// Forward-only iterator over every plane of a series, time-major
///
/// Yields `(t, slice, plane)`. Planes are read one after the other from the
/// start of the payload without re-seeking.
pub struct SliceIterator<'a, R> {
    reader: SeriesReader<'a, R>,
    position: u64,
    frame_count: u64,
    slices_per_frame: u64,
    slice_len: u64,
    exhausted: bool,
}

impl<'a, R: Read + Seek> SliceIterator<'a, R> {
    pub(super) fn new(reader: SeriesReader<'a, R>) -> Self {
        let metadata = reader.metadata();
        Self {
            frame_count: metadata.frame_count(),
            slices_per_frame: metadata.slices_per_frame(),
            slice_len: metadata.pixels_per_slice(),
            reader,
            position: 0,
            exhausted: false,
        }
    }
}

impl<R: Read + Seek> Iterator for SliceIterator<'_, R> {
    type Item = Result<(u64, u64, Array2<u8>), ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.frame_count.saturating_mul(self.slices_per_frame);
        if self.exhausted || self.position >= total {
            return None;
        }
        let t = self.position / self.slices_per_frame;
        let slice = self.position % self.slices_per_frame;
        let offset = self.position.saturating_mul(self.slice_len);
        match self.reader.read_plane_at(offset, self.position == 0) {
            Ok(plane) => {
                self.position += 1;
                Some(Ok((t, slice, plane)))
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read + Seek> FusedIterator for SliceIterator<'_, R> {}
