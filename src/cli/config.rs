//! TOML configuration file support.
//!
//! Reader settings can be kept in a config file instead of repeated flags:
//!
//! ```toml
//! # lifscan.toml
//! [reader]
//! quick = false
//! buffer_size = 1048576
//! ```
//!
//! Flags given on the command line win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use lifscan::reader::ReaderConfig;

/// Root configuration structure for lifscan.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Reader settings.
    #[serde(default)]
    pub reader: ReaderSection,
}

/// Configuration for opening containers.
#[derive(Debug, Default, Deserialize)]
pub struct ReaderSection {
    /// Skip timestamp capture at open time.
    pub quick: Option<bool>,

    /// Input buffer size in bytes.
    pub buffer_size: Option<usize>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the file if one was given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reader configuration from the file, then from explicit flags.
    pub fn reader_config(&self, buffer_size: Option<usize>) -> ReaderConfig {
        let mut config = ReaderConfig::default();
        if let Some(quick) = self.reader.quick {
            config = config.with_quick(quick);
        }
        if let Some(size) = buffer_size.or(self.reader.buffer_size) {
            config = config.with_buffer_size(size);
        }
        config
    }
}
