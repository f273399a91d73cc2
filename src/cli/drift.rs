use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use lifscan::reader::ReaderConfig;

/// Estimate per-frame displacements of one series
pub fn run(file: &Path, config: ReaderConfig, series: usize, json: bool) -> Result<()> {
    let mut reader = super::open(file, config)?;
    let mut accessor = reader
        .series(series)
        .with_context(|| format!("Cannot read series {}", series))?;

    info!(
        "Estimating drift over {} frames of '{}'",
        accessor.metadata().frame_count(),
        accessor.metadata().name()
    );
    let displacements = accessor
        .estimate_displacements_2d()
        .context("Phase correlation failed")?;

    if json {
        let out = serde_json::to_string_pretty(&displacements)
            .context("Failed to serialize displacements")?;
        println!("{}", out);
        return Ok(());
    }

    println!("t\tx\ty");
    for (t, d) in displacements.iter().enumerate() {
        println!("{}\t{}\t{}", t, d.x, d.y);
    }
    Ok(())
}
