use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use crate::reader::{FormatVersion, BLOCK_MAGIC, BLOCK_MARKER};

use super::WriterError;

/// Writes block containers
///
/// The XML header block comes first, followed by one payload block per
/// series with pixel data, in header order.
pub struct ContainerWriter<W: Write> {
    sink: W,
    version: FormatVersion,
    header_written: bool,
    blocks_written: usize,
}

impl ContainerWriter<BufWriter<File>> {
    /// Create a container file
    pub fn create<P: AsRef<Path>>(path: P, version: FormatVersion) -> Result<Self, WriterError> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file), version))
    }
}

impl<W: Write> ContainerWriter<W> {
    /// Wrap a sink; `version` decides the width of payload size fields
    pub fn new(sink: W, version: FormatVersion) -> Self {
        Self {
            sink,
            version,
            header_written: false,
            blocks_written: 0,
        }
    }

    /// Write the XML header block
    pub fn write_header(&mut self, xml: &str) -> Result<(), WriterError> {
        if self.header_written {
            return Err(WriterError::HeaderAlreadyWritten);
        }
        let units: Vec<u16> = xml.encode_utf16().collect();
        let char_count = u32::try_from(units.len())
            .map_err(|_| WriterError::InvalidData("XML header too large".to_string()))?;

        // The header block size is always 32 bits wide
        let content_len = 1u64 + 4 + 2 * u64::from(char_count);
        self.write_block_header(content_len)?;
        self.sink.write_u32::<LittleEndian>(char_count)?;
        self.write_utf16(&units)?;

        self.header_written = true;
        debug!("Wrote XML header of {} characters", char_count);
        Ok(())
    }

    /// Write one payload block with a short description (memory block id)
    pub fn write_payload(&mut self, description: &str, data: &[u8]) -> Result<(), WriterError> {
        if !self.header_written {
            return Err(WriterError::NotInitialized);
        }
        let units: Vec<u16> = description.encode_utf16().collect();
        let description_len = u32::try_from(units.len())
            .map_err(|_| WriterError::InvalidData("block description too large".to_string()))?;
        let size = data.len() as u64;

        let size_width = self.version.size_field_width() as u64;
        let content_len = 1 + size_width + 1 + 4 + 2 * u64::from(description_len) + size;
        self.write_block_header(content_len)?;
        match self.version {
            FormatVersion::V1 => {
                let size = u32::try_from(size).map_err(|_| {
                    WriterError::InvalidData(format!(
                        "payload of {} bytes needs 64-bit block sizes",
                        size
                    ))
                })?;
                self.sink.write_u32::<LittleEndian>(size)?;
            }
            FormatVersion::V2 => self.sink.write_u64::<LittleEndian>(size)?,
        }
        self.sink.write_u8(BLOCK_MARKER)?;
        self.sink.write_u32::<LittleEndian>(description_len)?;
        self.write_utf16(&units)?;
        self.sink.write_all(data)?;

        self.blocks_written += 1;
        debug!("Wrote payload block '{}' of {} bytes", description, size);
        Ok(())
    }

    /// Number of payload blocks written so far
    pub fn blocks_written(&self) -> usize {
        self.blocks_written
    }

    /// Flush and give back the sink
    pub fn finish(mut self) -> Result<W, WriterError> {
        if !self.header_written {
            return Err(WriterError::NotInitialized);
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Magic, the length field (truncated to 32 bits) and the marker
    fn write_block_header(&mut self, content_len: u64) -> Result<(), WriterError> {
        self.sink.write_i32::<LittleEndian>(BLOCK_MAGIC)?;
        self.sink
            .write_u32::<LittleEndian>(content_len.min(u64::from(u32::MAX)) as u32)?;
        self.sink.write_u8(BLOCK_MARKER)?;
        Ok(())
    }

    fn write_utf16(&mut self, units: &[u16]) -> Result<(), WriterError> {
        for &unit in units {
            self.sink.write_u16::<LittleEndian>(unit)?;
        }
        Ok(())
    }
}
