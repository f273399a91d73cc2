/// Errors that can occur while parsing the embedded XML header
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Sanitized header is not well-formed XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Header parsed but does not have the expected shape
    #[error("Invalid metadata structure: {0}")]
    InvalidStructure(String),

    /// Required XML attribute is missing
    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    /// Invalid value for an XML attribute
    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    /// Declared dimensions address more bytes than the series memory holds
    #[error("Series '{series}' needs at least {required} bytes but declares {memory_size}")]
    InconsistentLayout {
        /// Series name
        series: String,
        /// Smallest memory size the dimensions require
        required: u64,
        /// Memory size declared in the header
        memory_size: u64,
    },
}
