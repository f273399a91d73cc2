use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use lifscan::metadata::filetime_to_datetime;
use lifscan::reader::ReaderConfig;

#[derive(Serialize)]
struct TimestampReport {
    series: String,
    absolute: Vec<u64>,
    acquired: Vec<String>,
    relative: Vec<f64>,
}

/// Print the timestamps of one series
///
/// The container is always opened in full mode, which hands the timestamp
/// tags stripped from the header to the series that held them.
pub fn run(file: &Path, config: ReaderConfig, series: usize, json: bool) -> Result<()> {
    let mut reader = super::open(file, config.with_quick(false))?;

    let count = reader.series_count();
    let metadata = reader
        .experiment_mut()
        .series_mut()
        .get_mut(series)
        .with_context(|| format!("Series {} not found (container has {})", series, count))?;

    let absolute = metadata.timestamps()?.to_vec();
    let relative = metadata.relative_timestamps()?.to_vec();
    let acquired = absolute
        .iter()
        .filter_map(|&ticks| filetime_to_datetime(ticks))
        .map(|t| t.to_rfc3339())
        .collect();

    let report = TimestampReport {
        series: metadata.name().to_string(),
        absolute,
        acquired,
        relative,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize timestamps")?;
        println!("{}", out);
        return Ok(());
    }

    println!("Series: {}", report.series);
    println!("Absolute timestamps: {}", report.absolute.len());
    for (ticks, time) in report.absolute.iter().zip(&report.acquired) {
        println!("  {}  {}", ticks, time);
    }
    println!("Relative timestamps: {}", report.relative.len());
    for (frame, time) in report.relative.iter().enumerate() {
        println!("  {}  {:.4} s", frame, time);
    }
    Ok(())
}
