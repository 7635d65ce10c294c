use std::time::Duration;

use anyhow::Result;
use tracing::error;
use worktracker::cli::run_cli;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run_cli());
    // `serve` leaves a blocking stdin read behind that would otherwise keep the runtime alive.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
