//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

/// ytocr - Screenshot OCR tool
#[derive(Parser, Debug)]
#[command(name = "ytocr")]
#[command(about = "Screenshot OCR tool with bundled recognition models")]
#[command(version)]
pub struct Args {
    /// Use this config file instead of the default location
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (overrides RUST_LOG)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Started by a previous instance handing over after a resource update
    #[arg(long = "silent-restart", hide = true)]
    pub silent_restart: bool,
}
