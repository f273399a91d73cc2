use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use lifscan::reader::{LifReader, ReaderConfig};

mod config;
mod drift;
mod info;
mod timestamps;

use config::Config;

/// lifscan - Inspect Leica LIF microscopy containers
#[derive(Parser)]
#[command(name = "lifscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Load reader settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Input buffer size in bytes
    #[arg(long, value_name = "BYTES", global = true)]
    buffer_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the experiment and its series
    Info {
        /// Input container path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Estimate frame-to-frame drift of a series by phase correlation
    Drift {
        /// Input container path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Series index
        #[arg(short, long, default_value_t = 0)]
        series: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the acquisition timestamps of a series
    Timestamps {
        /// Input container path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Series index
        #[arg(short, long, default_value_t = 0)]
        series: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let reader_config = config.reader_config(cli.buffer_size);

    match cli.command {
        Commands::Info { file, json } => info::run(&file, reader_config, json),
        Commands::Drift { file, series, json } => drift::run(&file, reader_config, series, json),
        Commands::Timestamps { file, series, json } => {
            timestamps::run(&file, reader_config, series, json)
        }
    }
}

/// Open a container with a readable error chain
fn open(file: &Path, config: ReaderConfig) -> Result<LifReader<BufReader<File>>> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }
    LifReader::open_with_config(file, config)
        .with_context(|| format!("Failed to open container: {}", file.display()))
}
