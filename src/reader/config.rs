use serde::Deserialize;

/// Default input buffer size for container reads (64KB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for opening containers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Skip timestamp capture and extraction at open time
    pub quick: bool,
    /// Size of the input buffer in bytes
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            quick: true,
            buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
        }
    }
}

impl ReaderConfig {
    /// Set quick mode; `false` extracts every series' timestamps at open
    pub fn with_quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Set the input buffer size in bytes
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}
