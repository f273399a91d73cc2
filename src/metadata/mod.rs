//! # Metadata Module
//!
//! This module models the XML header embedded in the first block of a
//! container: one experiment, its series, and for each series the axis and
//! channel descriptors needed to address pixels.
//!
//! ## Header Structure
//!
//! ```text
//! LMSDataContainerHeader (@Version)
//! └── Element (experiment, @Name)
//!     └── Children
//!         └── Element* (series, @Name)
//!             ├── Data/Image/ImageDescription
//!             │   ├── Channels/ChannelDescription* (@ChannelTag, @Resolution)
//!             │   └── Dimensions/DimensionDescription* (@DimID, @NumberOfElements, @BytesInc)
//!             ├── ScannerSettingRecord* (@Identifier, @Variant)
//!             ├── TimeStamp* / RelTimeStamp*
//!             ├── Attachment (@Name="PreviewMarker", @isPreviewImage)
//!             └── Memory (@Size)
//! ```
//!
//! Only tag names matter: every `Element` node in document order after the
//! first is a series, wherever it sits in the tree.

mod dimension;
mod error;
mod experiment;
pub mod sanitize;
mod series;
pub mod xml;

#[cfg(test)]
mod tests;

pub use dimension::{ChannelDescriptor, ChannelTag, DimensionDescriptor, DimensionId};
pub use error::MetadataError;
pub use experiment::Experiment;
pub use sanitize::RawTimestamps;
pub use series::{filetime_to_datetime, SeriesMetadata, TimestampState};
