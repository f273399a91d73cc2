//! Dimension and channel descriptors
//!
//! Each series declares its axes as `DimensionDescription` elements and its
//! channels as `ChannelDescription` elements.

use std::fmt;

use serde::Serialize;

use super::xml::XmlElement;
use super::MetadataError;

/// Axis identity, from the `DimID` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DimensionId {
    /// Image width (DimID 1)
    X,
    /// Image height (DimID 2)
    Y,
    /// Depth (DimID 3)
    Z,
    /// Time (DimID 4)
    T,
    /// Emission wavelength (DimID 5)
    Lambda,
    /// Rotation (DimID 6)
    Rotation,
    /// XT slices (DimID 7)
    XtSlices,
    /// T slices (DimID 8)
    TSlices,
    /// Any other DimID
    Other(u32),
}

impl DimensionId {
    /// Map a raw `DimID` value
    pub fn from_dim_id(id: u32) -> Self {
        match id {
            1 => DimensionId::X,
            2 => DimensionId::Y,
            3 => DimensionId::Z,
            4 => DimensionId::T,
            5 => DimensionId::Lambda,
            6 => DimensionId::Rotation,
            7 => DimensionId::XtSlices,
            8 => DimensionId::TSlices,
            other => DimensionId::Other(other),
        }
    }

    /// Raw `DimID` value
    pub fn dim_id(&self) -> u32 {
        match self {
            DimensionId::X => 1,
            DimensionId::Y => 2,
            DimensionId::Z => 3,
            DimensionId::T => 4,
            DimensionId::Lambda => 5,
            DimensionId::Rotation => 6,
            DimensionId::XtSlices => 7,
            DimensionId::TSlices => 8,
            DimensionId::Other(id) => *id,
        }
    }

    /// Short axis label as used in scanner setting identifiers (`dblVoxelX`, ...)
    pub fn label(&self) -> String {
        match self {
            DimensionId::X => "X".to_string(),
            DimensionId::Y => "Y".to_string(),
            DimensionId::Z => "Z".to_string(),
            DimensionId::T => "T".to_string(),
            DimensionId::Lambda => "Lambda".to_string(),
            DimensionId::Rotation => "Rotation".to_string(),
            DimensionId::XtSlices => "XT Slices".to_string(),
            DimensionId::TSlices => "TSlices".to_string(),
            DimensionId::Other(id) => format!("Dim{}", id),
        }
    }
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One declared axis of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionDescriptor {
    /// Axis identity
    pub id: DimensionId,
    /// Number of elements along the axis
    pub count: u64,
    /// Bytes between consecutive elements along the axis
    pub bytes_inc: u64,
    /// Physical extent (seconds for the time axis), if declared
    pub length: Option<f64>,
    /// Unit of `length`, if declared
    pub unit: Option<String>,
}

impl DimensionDescriptor {
    pub(crate) fn from_element(e: &XmlElement) -> Result<Self, MetadataError> {
        Ok(Self {
            id: DimensionId::from_dim_id(e.require_attribute("DimID")?),
            count: e.require_attribute("NumberOfElements")?,
            bytes_inc: e.require_attribute("BytesInc")?,
            length: e.parse_attribute("Length")?,
            unit: e.attribute("Unit").filter(|u| !u.is_empty()).map(str::to_string),
        })
    }
}

/// Channel colour tag, from the `ChannelTag` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelTag {
    /// Tag 0
    Gray,
    /// Tag 1
    Red,
    /// Tag 2
    Green,
    /// Tag 3
    Blue,
    /// Any other tag
    Other(u32),
}

impl ChannelTag {
    /// Map a raw `ChannelTag` value
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            0 => ChannelTag::Gray,
            1 => ChannelTag::Red,
            2 => ChannelTag::Green,
            3 => ChannelTag::Blue,
            other => ChannelTag::Other(other),
        }
    }

    /// Raw `ChannelTag` value
    pub fn tag_id(&self) -> u32 {
        match self {
            ChannelTag::Gray => 0,
            ChannelTag::Red => 1,
            ChannelTag::Green => 2,
            ChannelTag::Blue => 3,
            ChannelTag::Other(tag) => *tag,
        }
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTag::Gray => f.write_str("Gray"),
            ChannelTag::Red => f.write_str("Red"),
            ChannelTag::Green => f.write_str("Green"),
            ChannelTag::Blue => f.write_str("Blue"),
            ChannelTag::Other(tag) => write!(f, "Tag{}", tag),
        }
    }
}

/// One declared channel of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDescriptor {
    /// Colour tag
    pub tag: ChannelTag,
    /// Sample resolution in bits
    pub resolution: u32,
    /// Lookup table name, if declared
    pub lut_name: Option<String>,
}

impl ChannelDescriptor {
    pub(crate) fn from_element(e: &XmlElement) -> Result<Self, MetadataError> {
        Ok(Self {
            tag: ChannelTag::from_tag(e.parse_attribute("ChannelTag")?.unwrap_or(0)),
            resolution: e.parse_attribute("Resolution")?.unwrap_or(8),
            lut_name: e.attribute("LUTName").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_id_roundtrip() {
        for id in 1..=9 {
            assert_eq!(DimensionId::from_dim_id(id).dim_id(), id);
        }
        assert_eq!(DimensionId::from_dim_id(4), DimensionId::T);
        assert_eq!(DimensionId::from_dim_id(9), DimensionId::Other(9));
        assert_eq!(DimensionId::XtSlices.to_string(), "XT Slices");
    }

    #[test]
    fn test_dimension_from_element() {
        let e = XmlElement::parse_document(
            r#"<DimensionDescription DimID="4" NumberOfElements="10" BytesInc="4096" Length="4.5" Unit="s"/>"#,
        )
        .unwrap();
        let dim = DimensionDescriptor::from_element(&e).unwrap();
        assert_eq!(dim.id, DimensionId::T);
        assert_eq!(dim.count, 10);
        assert_eq!(dim.bytes_inc, 4096);
        assert_eq!(dim.length, Some(4.5));
        assert_eq!(dim.unit.as_deref(), Some("s"));
    }

    #[test]
    fn test_dimension_requires_bytes_inc() {
        let e = XmlElement::parse_document(r#"<DimensionDescription DimID="1" NumberOfElements="10"/>"#)
            .unwrap();
        assert!(matches!(
            DimensionDescriptor::from_element(&e),
            Err(MetadataError::MissingAttribute(_))
        ));
    }

    #[test]
    fn test_channel_from_element() {
        let e = XmlElement::parse_document(r#"<ChannelDescription ChannelTag="2" Resolution="12"/>"#)
            .unwrap();
        let ch = ChannelDescriptor::from_element(&e).unwrap();
        assert_eq!(ch.tag, ChannelTag::Green);
        assert_eq!(ch.resolution, 12);
        assert_eq!(ch.tag.to_string(), "Green");
    }
}
