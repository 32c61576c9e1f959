pub mod daemon_path;
pub mod process;
pub mod report;

use std::{path::Path, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use report::{
    render_or_error, render_today, render_weekly, Palette, RemoteSource, ReportArgs, ReportSource,
};
use tracing::info;
use url::Url;

use crate::{
    config::{ConfigArgs, Settings},
    daemon::{
        args::TrackArgs, collection::source::focus_events, start_tracker, TrackerOptions,
        LOCAL_STORE_DIR,
    },
    server::{args::ServeArgs, run_server},
    sync::{SyncClient, REQUEST_TIMEOUT},
    utils::{
        clock::{Clock, DefaultClock},
        logging::{enable_logging, CLI_PREFIX, SERVER_PREFIX, TRACKER_PREFIX},
        runtime::{multi_thread_runtime, single_thread_runtime},
        time::date_to_key,
    },
};

#[derive(Parser, Debug)]
#[command(name = "sitetime", version, long_about = None)]
#[command(about = "Tracks time spent on websites and summarizes it per day", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the tracker. The browser starts this as its native messaging host and feeds focus events over stdin"
    )]
    Track {
        #[command(flatten)]
        args: TrackArgs,
    },
    #[command(
        about = "Run the aggregation service directly in current console. Used for debugging"
    )]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },
    #[command(about = "Starts the aggregation service in the background, replacing a running one")]
    Init {},
    #[command(about = "Stop currently running aggregation service")]
    Stop {},
    #[command(about = "Today's totals per category and the domains that took the most time")]
    Today {
        #[command(flatten)]
        args: ReportArgs,
    },
    #[command(about = "Category totals for the last seven recorded days")]
    Report {
        #[command(flatten)]
        args: ReportArgs,
    },
}

impl Commands {
    fn log_prefix(&self) -> &'static str {
        match self {
            Commands::Track { .. } => TRACKER_PREFIX,
            Commands::Serve { .. } => SERVER_PREFIX,
            _ => CLI_PREFIX,
        }
    }
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();
    let (app_dir, settings) = args.config.resolve()?;
    enable_logging(
        args.commands.log_prefix(),
        &app_dir.join("logs"),
        args.config.log,
        args.config.log_console,
    )?;

    match args.commands {
        Commands::Track { args } => {
            let options = tracker_options(&app_dir, &settings, &args)?;
            single_thread_runtime()?.block_on(async move {
                start_tracker(options, focus_events(tokio::io::stdin(), args.format)).await
            })
        }
        Commands::Serve { args } => {
            multi_thread_runtime()?.block_on(run_server(&app_dir, &settings, &args))
        }
        Commands::Init {} => restart_server(&args.config),
        Commands::Stop {} => {
            kill_previous_servers()?;
            Ok(())
        }
        Commands::Today { args } => {
            let source = report_source(&app_dir, &settings, &args)?;
            let palette = Palette { enabled: !args.no_color };
            let today = date_to_key(DefaultClock.today());
            let loaded = single_thread_runtime()?.block_on(source.time_data());
            render_or_error(loaded, palette, |time_data| {
                render_today(time_data, &today, palette)
            });
            Ok(())
        }
        Commands::Report { args } => {
            let source = report_source(&app_dir, &settings, &args)?;
            let palette = Palette { enabled: !args.no_color };
            let loaded = single_thread_runtime()?.block_on(source.weekly_report());
            render_or_error(loaded, palette, |report| render_weekly(report, palette));
            Ok(())
        }
    }
}

fn server_url(settings: &Settings, overridden: Option<&str>) -> Result<Url> {
    match overridden {
        Some(url) => Ok(Url::parse(url)?),
        None => settings.server_url(),
    }
}

fn tracker_options(app_dir: &Path, settings: &Settings, args: &TrackArgs) -> Result<TrackerOptions> {
    let sync = if args.no_sync {
        None
    } else {
        let url = server_url(settings, args.server_url.as_deref())?;
        info!("Mirroring increments to {url}");
        Some(SyncClient::http(&url)?)
    };

    Ok(TrackerOptions {
        store_dir: app_dir.join(LOCAL_STORE_DIR),
        classifier: settings.classifier(),
        flush_interval: args
            .flush_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.flush_interval()),
        sync,
    })
}

fn report_source(app_dir: &Path, settings: &Settings, args: &ReportArgs) -> Result<ReportSource> {
    if args.remote {
        Ok(ReportSource::Remote(RemoteSource::new(
            server_url(settings, args.server_url.as_deref())?,
            REQUEST_TIMEOUT,
        )?))
    } else {
        Ok(ReportSource::Local(app_dir.to_owned()))
    }
}
