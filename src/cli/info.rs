use anyhow::{Context, Result};
use std::path::Path;

use lifscan::reader::{ContainerSummary, ReaderConfig};

/// Display information about a container
pub fn run(file: &Path, config: ReaderConfig, json: bool) -> Result<()> {
    let reader = super::open(file, config)?;
    let summary = reader.summary();

    if json {
        let out = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", out);
        return Ok(());
    }

    print_heading(&format!("File: {}", file.display()));
    println!("Version: {} ({}-byte block sizes)", summary.version, summary.size_field_width);
    println!();
    print!("{}", summary);
    println!();

    for (i, metadata) in reader.experiment().series().iter().enumerate() {
        if metadata.memory_size() == 0 {
            continue;
        }
        print_heading(&format!("({}) {}", i, metadata.name()));
        if let Some(payload) = reader.payload(i) {
            println!("  Payload: {} bytes at offset {}", payload.size, payload.offset);
        }
        println!(
            "  Frames: {} ({} slices of {} pixels each)",
            metadata.frame_count(),
            metadata.slices_per_frame(),
            metadata.pixels_per_slice()
        );
        if metadata.frame_count() > 1 {
            println!("  Time lapse: {:.3} s", metadata.time_lapse());
        }
        for (axis, size) in metadata.voxel_sizes() {
            println!("  Voxel {}: {}", axis, size);
        }
        if metadata.is_preview() {
            println!("  Preview image");
        }
    }

    log_totals(&summary);
    Ok(())
}

fn log_totals(summary: &ContainerSummary) {
    let bytes: u64 = summary
        .series
        .iter()
        .filter_map(|s| s.payload.map(|p| p.size))
        .sum();
    log::info!(
        "{} series, {} bytes of pixel data",
        summary.series.len(),
        bytes
    );
}

#[cfg(feature = "colorized_output")]
fn print_heading(text: &str) {
    println!("{}", console::style(text).bold().cyan());
}

#[cfg(not(feature = "colorized_output"))]
fn print_heading(text: &str) {
    println!("{}", text);
}
