use anyhow::Result;
use clap::Parser;
use sitetime::{
    server::{args::ServerArgs, run_server},
    utils::{
        logging::{enable_logging, SERVER_PREFIX},
        runtime::multi_thread_runtime,
    },
};
use tracing::error;

fn main() -> Result<()> {
    let args = ServerArgs::parse();

    if !args.force {
        #[cfg(unix)]
        {
            use daemonize::Daemonize;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent
                        .inspect_err(|e| error!("Failed to create daemon on parent side {e:?}"))?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => (),
            }
        }
    }

    run(args)
}

fn run(args: ServerArgs) -> Result<()> {
    let (app_dir, settings) = args.config.resolve()?;
    enable_logging(
        SERVER_PREFIX,
        &app_dir.join("logs"),
        args.config.log,
        args.config.log_console,
    )?;
    multi_thread_runtime()?
        .block_on(run_server(&app_dir, &settings, &args.serve))
        .inspect_err(|e| error!("Aggregation service failed {e:?}"))
}
