use crate::metadata::{DimensionId, MetadataError};

/// Errors that can occur during reading
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Block framing is broken; the container cannot be opened
    #[error("Invalid container at byte {offset}: {message}")]
    InvalidContainer {
        /// Absolute offset where the problem was detected
        offset: u64,
        /// What was wrong
        message: String,
    },

    /// The embedded XML header could not be parsed
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),

    /// A computed position falls outside the series memory
    #[error("Offset {offset} is out of bounds for series memory of {memory_size} bytes")]
    OutOfBounds {
        /// Offset relative to the start of the series payload
        offset: u64,
        /// Declared memory size of the series
        memory_size: u64,
    },

    /// An index exceeds the element count of its axis
    #[error("Index {index} is out of range for axis {axis} with {count} elements")]
    IndexOutOfRange {
        /// Axis the index was given for
        axis: DimensionId,
        /// Requested index
        index: u64,
        /// Element count of the axis
        count: u64,
    },

    /// A plane axis, or an axis the series does not declare, was used as a coordinate
    #[error("Axis {axis} cannot be used as a coordinate in series '{series}'")]
    InvalidAxis {
        /// Offending axis
        axis: DimensionId,
        /// Series name
        series: String,
    },

    /// The request needs something this reader does not implement
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Series index past the end of the series list
    #[error("Series {index} not found (container has {count})")]
    SeriesNotFound {
        /// Requested index
        index: usize,
        /// Number of series in the container
        count: usize,
    },

    /// The series has no pixel payload (zero memory size)
    #[error("Series '{0}' has no pixel data")]
    NoPayload(String),

    /// Pixel buffer does not fit the declared shape
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}
