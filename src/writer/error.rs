/// Errors that can occur during writing
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Data does not fit the container layout
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A payload was written before the XML header
    #[error("Writer not initialized: the XML header must be written first")]
    NotInitialized,

    /// The XML header was written twice
    #[error("XML header already written")]
    HeaderAlreadyWritten,
}
