use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
pub struct DaemonArgs {
    /// Run in the foreground instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Overrides `tick_interval_ms` from the configuration file.
    #[arg(long = "tick-ms")]
    pub tick_ms: Option<u64>,
    /// Starts tracking right away. Sets `track_on_start`.
    #[arg(long)]
    pub track: bool,
}
