use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Executables that may be running a tracker: this one, when started with `serve`, and the
/// standalone daemon next to it.
pub fn tracker_executables() -> Result<Vec<PathBuf>> {
    let current = env::current_exe()?;
    let daemon = to_daemon_path(current.clone());
    Ok(vec![current, daemon])
}

/// Terminates every other process running one of `names`. Returns how many were stopped.
pub fn kill_previous_servers(names: &[PathBuf]) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't find own pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| names.iter().any(|name| name == v))
            .is_some()
        {
            info!("Stopping tracker process {pid}");
            // SIGTERM lets the daemon save its state. This will forcefully terminate the process on
            // Windows. Anything better will require a lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Shuts down previous servers and starts a new one. For simplicity sake it operates using a
/// detached `serve` process of the current executable. The detached process has no control input,
/// so `track` is the only way to have it tracking without editing config.json.
pub fn restart_server(dir: Option<&Path>, track: bool) -> Result<()> {
    let executables = tracker_executables()?;
    kill_previous_servers(&executables)?;
    let mut command = std::process::Command::new(&executables[0]);
    command.arg("serve");
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }
    if track {
        command.arg("--track");
    }

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Spawning");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    println!("Success");
    Ok(())
}
