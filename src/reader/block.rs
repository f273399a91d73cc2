//! Memory block framing
//!
//! Every block starts with the same header:
//!
//! ```text
//! i32  magic      (0x70)
//! u32  length     (not validated)
//! u8   marker     ('*')
//! u32 | u64 size  (width depends on the format version)
//! ```
//!
//! All integers are little-endian.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use super::ReaderError;

/// Magic value opening every block header
pub const BLOCK_MAGIC: i32 = 0x70;

/// Marker byte closing the fixed part of a block header
pub const BLOCK_MARKER: u8 = b'*';

/// Width of the block size field, decided by the header `Version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatVersion {
    /// Version 1 or unknown: 32-bit sizes
    #[default]
    V1,
    /// Version 2 and later: 64-bit sizes
    V2,
}

impl FormatVersion {
    /// Map the `Version` attribute of the XML header
    pub fn from_header_version(version: u32) -> Self {
        if version < 2 {
            FormatVersion::V1
        } else {
            FormatVersion::V2
        }
    }

    /// Byte width of the size field
    pub fn size_field_width(&self) -> usize {
        match self {
            FormatVersion::V1 => 4,
            FormatVersion::V2 => 8,
        }
    }
}

/// Read one block header at `offset` and return the declared block size
pub(crate) fn read_block_header<R: Read>(
    reader: &mut R,
    offset: u64,
    version: FormatVersion,
) -> Result<u64, ReaderError> {
    let magic = truncated(reader.read_i32::<LittleEndian>(), offset, "block header")?;
    if magic != BLOCK_MAGIC {
        return Err(ReaderError::InvalidContainer {
            offset,
            message: format!("bad block magic {:#x}, expected {:#x}", magic, BLOCK_MAGIC),
        });
    }

    truncated(reader.read_u32::<LittleEndian>(), offset, "block header")?;

    let marker = truncated(reader.read_u8(), offset, "block header")?;
    if marker != BLOCK_MARKER {
        return Err(ReaderError::InvalidContainer {
            offset: offset + 8,
            message: format!("bad block marker {:#04x}, expected '*'", marker),
        });
    }

    let size = match version {
        FormatVersion::V1 => u64::from(truncated(reader.read_u32::<LittleEndian>(), offset, "block size")?),
        FormatVersion::V2 => truncated(reader.read_u64::<LittleEndian>(), offset, "block size")?,
    };
    Ok(size)
}

/// Consume bytes up to and including the next `'*'` marker
pub(crate) fn skip_to_marker<R: Read>(reader: &mut R, offset: u64) -> Result<(), ReaderError> {
    loop {
        if truncated(reader.read_u8(), offset, "block description")? == BLOCK_MARKER {
            return Ok(());
        }
    }
}

/// Turn an unexpected end of stream into a framing error
pub(crate) fn truncated<T>(result: io::Result<T>, offset: u64, what: &str) -> Result<T, ReaderError> {
    result.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ReaderError::InvalidContainer {
                offset,
                message: format!("truncated {}", what),
            }
        } else {
            ReaderError::IoError(e)
        }
    })
}
