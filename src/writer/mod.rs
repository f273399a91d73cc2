//! # Container Writer Module
//!
//! Writes minimal, well-formed block containers: an XML header block
//! followed by one payload block per series with pixel data.
//!
//! The writer does not try to reproduce everything an acquisition system
//! stores. It exists to produce synthetic containers for tests,
//! benchmarks and fuzzing seeds.
//!
//! ## Example
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use lifscan::metadata::DimensionId;
//! use lifscan::reader::{FormatVersion, LifReader, ReaderConfig};
//! use lifscan::writer::{ContainerWriter, HeaderBuilder, SeriesLayout};
//!
//! let layout = SeriesLayout::new("stack", &[(DimensionId::X, 4), (DimensionId::Y, 4)]);
//! let header = HeaderBuilder::new("demo").series(layout).build();
//!
//! let mut writer = ContainerWriter::new(Cursor::new(Vec::new()), FormatVersion::V1);
//! writer.write_header(&header)?;
//! writer.write_payload("MemBlock_1", &[7u8; 16])?;
//! let bytes = writer.finish()?.into_inner();
//!
//! let reader = LifReader::from_reader(Cursor::new(bytes), ReaderConfig::default())?;
//! assert_eq!(reader.series_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod container;
mod error;
mod header;

#[cfg(test)]
mod tests;

pub use container::ContainerWriter;
pub use error::WriterError;
pub use header::{HeaderBuilder, SeriesLayout};
