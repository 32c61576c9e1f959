use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::config::ConfigArgs;

use super::daemon_path::to_server_path;

/// Stops every running aggregation service started from the binary next to this one. Returns
/// how many were stopped.
pub fn kill_previous_servers() -> Result<usize> {
    let server_path = to_server_path(env::current_exe()?);
    let stopped = kill_processes_of(&server_path)?;
    info!("Stopped {stopped} aggregation service(s)");
    println!("Stopped {stopped} aggregation service(s)");
    Ok(stopped)
}

fn kill_processes_of(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Failed to get current pid: {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Shuts down a previous service and starts a new one with the same application directory and
/// config. The service detaches itself, so the child is not waited on.
pub fn restart_server(config: &ConfigArgs) -> Result<()> {
    kill_previous_servers()?;
    let server_path = to_server_path(env::current_exe()?);
    let mut command = std::process::Command::new(&server_path);
    command.args(forwarded_args(config)?);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {server_path:?}");
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    println!("Started aggregation service");
    Ok(())
}

/// Flags passed on to the service. Paths are made absolute because the daemonized service
/// runs from `/`.
fn forwarded_args(config: &ConfigArgs) -> Result<Vec<String>> {
    let mut args = Vec::new();
    if let Some(dir) = &config.dir {
        args.push("--dir".to_string());
        args.push(std::path::absolute(dir)?.display().to_string());
    }
    if let Some(path) = &config.config {
        args.push("--config".to_string());
        args.push(std::path::absolute(path)?.display().to_string());
    }
    if let Some(level) = config.log {
        args.push("--log-filter".to_string());
        args.push(level.to_string());
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Result;
    use tracing::level_filters::LevelFilter;

    use crate::config::ConfigArgs;

    use super::forwarded_args;

    #[cfg(unix)]
    #[test]
    fn test_forwarded_args() -> Result<()> {
        let config = ConfigArgs {
            dir: Some(PathBuf::from("/state")),
            config: None,
            log: Some(LevelFilter::INFO),
            log_console: true,
        };
        assert_eq!(
            forwarded_args(&config)?,
            ["--dir", "/state", "--log-filter", "info"]
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_paths_are_made_absolute() -> Result<()> {
        let config = ConfigArgs {
            dir: Some(PathBuf::from("state")),
            config: Some(PathBuf::from("conf/sitetime.toml")),
            log: None,
            log_console: false,
        };
        let cwd = std::env::current_dir()?;
        assert_eq!(
            forwarded_args(&config)?,
            [
                "--dir".to_string(),
                cwd.join("state").display().to_string(),
                "--config".to_string(),
                cwd.join("conf/sitetime.toml").display().to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_nothing_to_forward() -> Result<()> {
        let config = ConfigArgs {
            dir: None,
            config: None,
            log: None,
            log_console: false,
        };
        assert!(forwarded_args(&config)?.is_empty());
        Ok(())
    }
}
