use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML). Missing files fall back to defaults plus
    /// PAPER__ environment overrides.
    #[arg(long, default_value = "paper.toml")]
    pub config: PathBuf,

    /// File with one JSON command per line. Commands are read from stdin when absent.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Default log filter when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Seconds to keep the feed running after the last command, so resting
    /// orders can still fill.
    #[arg(long, default_value_t = 0)]
    pub linger_secs: u64,
}
