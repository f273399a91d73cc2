//! # Reader Module
//!
//! This module opens containers, indexes their memory blocks, and reads
//! pixel data from individual series on demand.
//!
//! ## Features
//!
//! - **Single Scan**: Block headers are walked once at open time; only the
//!   XML header is read into memory.
//! - **Random Access**: Byte offsets of any plane or frame are computed from
//!   the per-axis strides declared in the header.
//! - **Streaming Iteration**: Forward-only frame and slice iterators read
//!   contiguous data without re-seeking.
//! - **Registration**: Frame-to-frame drift estimates via phase correlation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lifscan::metadata::DimensionId;
//! use lifscan::reader::{Coordinates, LifReader};
//!
//! let mut reader = LifReader::open("stack.lif")?;
//! println!("{}", reader.summary());
//!
//! let mut series = reader.series(0)?;
//! let plane = series.read_plane(&Coordinates::new().with(DimensionId::Z, 3))?;
//! println!("plane of {:?} pixels", plane.dim());
//!
//! for frame in series.frames() {
//!     let (t, volume) = frame?;
//!     println!("frame {}: {} pixels", t, volume.len());
//! }
//! # Ok::<(), lifscan::reader::ReaderError>(())
//! ```
//!
//! The source is a single cursor shared by every accessor, so
//! [`LifReader::series`] borrows the reader mutably: only one
//! [`SeriesReader`] can be alive at a time.

mod block;
mod config;
mod error;
mod iterators;
mod open;
mod registration;
mod series;
mod summary;


pub use block::{FormatVersion, BLOCK_MAGIC, BLOCK_MARKER};
pub use config::{ReaderConfig, DEFAULT_INPUT_BUFFER_SIZE};
pub use error::ReaderError;
pub use iterators::{FrameIterator, SliceIterator};
pub use registration::{Displacement, PhaseCorrelator};
pub use series::{Coordinates, SeriesReader};
pub use summary::{AxisSummary, ContainerSummary, SeriesSummary};

use serde::Serialize;

use crate::metadata::{Experiment, SeriesMetadata};

/// Where a series' pixel payload lives in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayloadLocation {
    /// Absolute byte offset of the first pixel
    pub offset: u64,
    /// Payload size declared by the block header
    pub size: u64,
}

/// Reader for block containers
///
/// Holds the parsed header and one payload location per series with pixel
/// data. Pixel reads go through [`SeriesReader`].
#[derive(Debug)]
pub struct LifReader<R> {
    source: R,
    config: ReaderConfig,
    experiment: Experiment,
    format_version: FormatVersion,
    payloads: Vec<Option<PayloadLocation>>,
}

impl<R> LifReader<R> {
    /// Parsed header
    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// Mutable header access, needed for timestamp extraction
    pub fn experiment_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }

    /// Configuration the reader was opened with
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Block size width in use
    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }

    /// Number of series
    pub fn series_count(&self) -> usize {
        self.experiment.series_count()
    }

    /// Metadata of one series
    pub fn series_metadata(&self, index: usize) -> Option<&SeriesMetadata> {
        self.experiment.series().get(index)
    }

    /// Payload location of one series (`None` for metadata-only series)
    pub fn payload(&self, index: usize) -> Option<PayloadLocation> {
        self.payloads.get(index).copied().flatten()
    }

    /// Every recorded payload location, in block order
    pub fn payloads(&self) -> Vec<PayloadLocation> {
        self.payloads.iter().flatten().copied().collect()
    }

    /// Give back the underlying source
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: std::io::Read + std::io::Seek> LifReader<R> {
    /// Pixel accessor for one series
    pub fn series(&mut self, index: usize) -> Result<SeriesReader<'_, R>, ReaderError> {
        let count = self.experiment.series_count();
        let metadata = self
            .experiment
            .series()
            .get(index)
            .ok_or(ReaderError::SeriesNotFound { index, count })?;
        let payload = self
            .payloads
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| ReaderError::NoPayload(metadata.name().to_string()))?;
        Ok(SeriesReader::new(metadata, payload, &mut self.source))
    }
}
