use log::debug;

use super::sanitize::{deinterleave, sanitize, RawTimestamps};
use super::series::SeriesMetadata;
use super::xml::XmlElement;
use super::MetadataError;

const ELEMENT: &str = "Element";

/// Parsed metadata header of one container
#[derive(Debug, Clone)]
pub struct Experiment {
    version: u32,
    name: String,
    series: Vec<SeriesMetadata>,
    raw_timestamps: Option<RawTimestamps>,
}

impl Experiment {
    /// Parse a header stored as interleaved double-byte code units
    pub fn from_interleaved(raw: &[u8], capture_timestamps: bool) -> Result<Self, MetadataError> {
        Self::parse(&deinterleave(raw), capture_timestamps)
    }

    /// Parse single-byte header text
    ///
    /// The text is sanitized first. With `capture_timestamps`, the values of
    /// the stripped timestamp tags are handed to the series that enclosed
    /// them, and the whole capture stays available through
    /// [`raw_timestamps`](Self::raw_timestamps). Without it, only timestamp
    /// tags that survive sanitization can be extracted per series.
    pub fn parse(text: &[u8], capture_timestamps: bool) -> Result<Self, MetadataError> {
        let sanitized = sanitize(text, capture_timestamps);
        debug!(
            "Sanitized header: {} -> {} bytes",
            text.len(),
            sanitized.text.len()
        );

        let mut root = XmlElement::parse_document(&sanitized.text)?;
        let version = root.parse_attribute("Version")?.unwrap_or(1);

        let mut elements = Vec::new();
        detach_elements(&mut root, &mut elements);

        let mut elements = elements.into_iter();
        let experiment = elements.next().ok_or_else(|| {
            MetadataError::InvalidStructure("header declares no Element".to_string())
        })?;
        let name = experiment.attribute("Name").unwrap_or_default().to_string();

        let mut series = elements
            .map(SeriesMetadata::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        // Element 0 is the experiment itself
        if let Some(raw) = sanitized.timestamps.as_ref() {
            for (i, s) in series.iter_mut().enumerate() {
                s.absorb_timestamps(raw.absolute_in(i + 1), raw.relative_in(i + 1))?;
            }
        }

        Ok(Self {
            version,
            name,
            series,
            raw_timestamps: sanitized.timestamps,
        })
    }

    /// Header format version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Experiment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All series, in header order
    pub fn series(&self) -> &[SeriesMetadata] {
        &self.series
    }

    /// Mutable access to the series, needed for timestamp extraction
    pub fn series_mut(&mut self) -> &mut [SeriesMetadata] {
        &mut self.series
    }

    /// Number of series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Timestamps captured while sanitizing, if capture was requested
    pub fn raw_timestamps(&self) -> Option<&RawTimestamps> {
        self.raw_timestamps.as_ref()
    }

    /// Pull every series' timestamps out of the tree
    pub fn extract_all_timestamps(&mut self) -> Result<(), MetadataError> {
        for series in &mut self.series {
            series.timestamps()?;
            series.relative_timestamps()?;
        }
        Ok(())
    }
}

/// Move every `Element` node out of the tree, in document pre-order
///
/// Each node keeps its own content but loses its nested `Element` nodes,
/// which follow it in `out`.
fn detach_elements(node: &mut XmlElement, out: &mut Vec<XmlElement>) {
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        if child.name == ELEMENT {
            let slot = out.len();
            out.push(XmlElement::default());
            detach_elements(&mut child, out);
            out[slot] = child;
        } else {
            detach_elements(&mut child, out);
            node.children.push(child);
        }
    }
}
