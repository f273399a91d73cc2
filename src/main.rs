//! # lifscan
//!
//! A command-line tool for inspecting Leica LIF microscopy containers.
//!
//! ## Usage
//!
//! ```bash
//! # List series
//! lifscan info experiment.lif
//!
//! # Frame-to-frame drift of series 2
//! lifscan drift experiment.lif --series 2
//!
//! # Acquisition timestamps as JSON
//! lifscan timestamps experiment.lif --series 2 --json
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
