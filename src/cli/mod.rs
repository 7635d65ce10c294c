pub mod daemon_path;
pub mod process;
pub mod status;

use std::{io::IsTerminal, path::PathBuf};

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server, tracker_executables};
use status::render_status;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    accounting::AccumulatorState,
    config::TrackerConfig,
    daemon::start_daemon,
    storage::{file::FileSnapshotStore, snapshot::Snapshot, PersistenceGateway},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Worktracker", version, long_about = None)]
#[command(about = "Tracks how much of your screen time is productive", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(long, help = "Start tracking as soon as the daemon is up")]
        track: bool,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally, by the UI shell and for debugging"
    )]
    Serve {
        #[arg(long = "tick-ms", help = "Overrides tick_interval_ms from config.json")]
        tick_ms: Option<u64>,
        #[arg(long, help = "Start tracking without waiting for a toggle-tracking event")]
        track: bool,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Show the accumulated time of the last saved state")]
    Status {},
    #[command(about = "Stop the daemon and clear the accumulated time")]
    Reset {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(CLI_PREFIX, &dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Init { track } => restart_server(Some(&dir), track),
        Commands::Stop {} => {
            let stopped = kill_previous_servers(&tracker_executables()?)?;
            println!("Stopped {stopped} tracker process(es)");
            Ok(())
        }
        Commands::Serve { tick_ms, track } => {
            let mut config = TrackerConfig::load(&dir);
            if let Some(tick_ms) = tick_ms {
                config.tick_interval_ms = tick_ms;
            }
            config.track_on_start |= track;
            start_daemon(dir, config).await
        }
        Commands::Status {} => {
            let snapshot = FileSnapshotStore::new(dir)?.load().await?;
            print!(
                "{}",
                render_status(snapshot.as_ref(), std::io::stdout().is_terminal())
            );
            Ok(())
        }
        Commands::Reset {} => {
            // A running daemon would overwrite the reset with its own counters on shutdown.
            kill_previous_servers(&tracker_executables()?)?;
            let snapshot = Snapshot::capture(&AccumulatorState::default(), None, Utc::now());
            FileSnapshotStore::new(dir)?.save(&snapshot).await?;
            info!("Tracking data reset from the cli");
            println!("Tracking data reset");
            Ok(())
        }
    }
}
