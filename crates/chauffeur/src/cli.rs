//! Command-line arguments. Everything here overrides the configuration
//! file; the file carries the long tail of settings.

use clap::Parser;
use std::path::PathBuf;

/// An autonomous player for the limo transport game.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path. A default file is created if it does not
    /// exist.
    #[arg(short, long, default_value = "chauffeur.toml")]
    pub config: PathBuf,

    /// Server WebSocket URL (e.g. ws://127.0.0.1:8080)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Display name to join with
    #[arg(short, long)]
    pub name: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}
