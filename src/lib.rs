//! # lifscan - Random Access to LIF Microscopy Containers
//!
//! `lifscan` reads the block container used by Leica confocal microscopes:
//! a UTF-16 XML header describing every acquisition, followed by raw 8-bit
//! pixel payloads.
//!
//! ## Key Features
//!
//! - **One Pass Indexing**: Opening a container walks its blocks once and
//!   records where each payload starts. Pixel data is never loaded up front.
//!
//! - **Stride-Based Addressing**: Any plane or time frame is located from the
//!   per-axis byte increments declared in the header, so reading frame 900 of
//!   a time series costs the same as reading frame 0.
//!
//! - **Forward Streams**: Frame and slice iterators read consecutive data
//!   without re-seeking.
//!
//! - **Drift Estimation**: Frame-to-frame displacement by phase correlation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lifscan::prelude::*;
//!
//! let mut reader = LifReader::open("experiment.lif")?;
//! for i in 0..reader.series_count() {
//!     if let Some(summary) = reader.describe_series(i) {
//!         println!("{}", summary);
//!     }
//! }
//!
//! let mut series = reader.series(0)?;
//! let plane = series.read_plane(&Coordinates::new().with(DimensionId::T, 2))?;
//! println!("{} x {} plane", plane.ncols(), plane.nrows());
//!
//! let drift = series.estimate_displacements_2d()?;
//! println!("{} displacement estimates", drift.len());
//! # Ok::<(), ReaderError>(())
//! ```
//!
//! ## Modules
//!
//! - [`metadata`]: XML header parsing, dimension and channel descriptors.
//! - [`reader`]: container indexing and pixel access.
//! - [`writer`]: minimal container writer for synthetic data.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod metadata;
pub mod reader;
pub mod writer;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::metadata::{
        ChannelDescriptor, ChannelTag, DimensionDescriptor, DimensionId, Experiment,
        MetadataError, SeriesMetadata,
    };
    pub use crate::reader::{
        ContainerSummary, Coordinates, Displacement, FormatVersion, LifReader, PayloadLocation,
        ReaderConfig, ReaderError, SeriesReader, SeriesSummary,
    };
    pub use crate::writer::{ContainerWriter, HeaderBuilder, SeriesLayout, WriterError};
}
