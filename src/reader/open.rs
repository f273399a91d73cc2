use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, warn};

use crate::metadata::Experiment;

use super::block::{read_block_header, skip_to_marker, truncated, FormatVersion};
use super::{LifReader, PayloadLocation, ReaderConfig, ReaderError};

impl LifReader<BufReader<File>> {
    /// Open a container file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    /// Open a container file with a custom configuration
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: ReaderConfig,
    ) -> Result<Self, ReaderError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(config.buffer_size, file);
        Self::from_reader(reader, config)
    }
}

impl<R: Read + Seek> LifReader<R> {
    /// Index a container from any seekable source
    ///
    /// Reads the XML header block, then walks every following block once,
    /// recording where each payload starts. Any framing error aborts the
    /// whole open.
    pub fn from_reader(mut source: R, config: ReaderConfig) -> Result<Self, ReaderError> {
        let end = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        // The version is unknown until the header is parsed, so the first
        // block always uses the 32-bit size field.
        let char_count = read_block_header(&mut source, 0, FormatVersion::V1)?;
        let header_start = source.stream_position()?;
        let byte_len = char_count.saturating_mul(2);
        if header_start.saturating_add(byte_len) > end {
            return Err(ReaderError::InvalidContainer {
                offset: header_start,
                message: format!("XML header of {} bytes runs past end of file", byte_len),
            });
        }
        let mut raw = vec![0u8; byte_len as usize];
        truncated(source.read_exact(&mut raw), header_start, "XML header")?;

        let mut experiment = Experiment::from_interleaved(&raw, !config.quick)?;
        let format_version = FormatVersion::from_header_version(experiment.version());
        debug!(
            "Header version {} ({:?}), {} series",
            experiment.version(),
            format_version,
            experiment.series_count()
        );

        let locations = scan_payloads(&mut source, end, format_version)?;
        let payloads = bind_payloads(&experiment, locations, end)?;

        for series in experiment.series() {
            series.validate_layout()?;
        }
        if !config.quick {
            experiment.extract_all_timestamps()?;
        }

        info!(
            "Indexed '{}': {} series, {} payload blocks",
            experiment.name(),
            experiment.series_count(),
            payloads.iter().flatten().count()
        );

        Ok(Self {
            source,
            config,
            experiment,
            format_version,
            payloads,
        })
    }
}

/// Walk the blocks after the XML header and record each non-empty payload
fn scan_payloads<R: Read + Seek>(
    source: &mut R,
    end: u64,
    version: FormatVersion,
) -> Result<Vec<PayloadLocation>, ReaderError> {
    let mut locations = Vec::new();
    let mut position = source.stream_position()?;

    while position < end {
        let size = read_block_header(source, position, version)?;
        skip_to_marker(source, position)?;
        let description_units = truncated(
            source.read_u32::<LittleEndian>(),
            position,
            "block description",
        )?;

        let description_end = source.stream_position()? + u64::from(description_units) * 2;
        let payload_end = description_end.saturating_add(size);
        if payload_end > end {
            return Err(ReaderError::InvalidContainer {
                offset: position,
                message: format!("block of {} bytes runs past end of file", size),
            });
        }

        debug!(
            "Block at {}: payload {} bytes at {}",
            position, size, description_end
        );
        if size > 0 {
            locations.push(PayloadLocation {
                offset: description_end,
                size,
            });
        }

        source.seek(SeekFrom::Start(payload_end))?;
        position = payload_end;
    }

    Ok(locations)
}

/// Assign payloads, in block order, to the series that declare pixel memory
fn bind_payloads(
    experiment: &Experiment,
    locations: Vec<PayloadLocation>,
    end: u64,
) -> Result<Vec<Option<PayloadLocation>>, ReaderError> {
    let series = experiment.series();
    let with_memory: Vec<usize> = series
        .iter()
        .enumerate()
        .filter(|(_, s)| s.memory_size() > 0)
        .map(|(i, _)| i)
        .collect();

    if with_memory.len() != locations.len() {
        return Err(ReaderError::InvalidContainer {
            offset: end,
            message: format!(
                "found {} payload blocks but the header declares {} series with pixel data",
                locations.len(),
                with_memory.len()
            ),
        });
    }

    let mut payloads = vec![None; series.len()];
    for (index, location) in with_memory.into_iter().zip(locations) {
        if location.size != series[index].memory_size() {
            warn!(
                "Series '{}': block holds {} bytes, header declares {}",
                series[index].name(),
                location.size,
                series[index].memory_size()
            );
        }
        payloads[index] = Some(location);
    }
    Ok(payloads)
}
