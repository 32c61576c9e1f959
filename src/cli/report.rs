//! Read-only views over either store: today's summary and the weekly report.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ansi_term::Colour;
use anyhow::{Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    daemon::{
        storage::{
            aggregate::weekly_report,
            document_store::JsonFileStore,
            entities::{Category, DailyAggregate, DaySummary, TimeData},
            local_store::read_snapshot,
        },
        LOCAL_STORE_DIR,
    },
    sync::api_url,
    utils::{percentage::seconds_percentage, time::format_seconds},
};

/// Number of domains listed in today's table.
const TOP_DOMAINS: usize = 10;

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, help = "Read from the aggregation service instead of the local store")]
    pub remote: bool,
    #[arg(long = "server-url", help = "Aggregation service to read from with --remote")]
    pub server_url: Option<String>,
    #[arg(long = "no-color", help = "Print without colors")]
    pub no_color: bool,
}

pub enum ReportSource {
    Local(PathBuf),
    Remote(RemoteSource),
}

impl ReportSource {
    pub async fn time_data(&self) -> Result<TimeData> {
        match self {
            ReportSource::Local(app_dir) => read_local(app_dir).await,
            ReportSource::Remote(remote) => remote.fetch("api/time-data").await,
        }
    }

    pub async fn weekly_report(&self) -> Result<Vec<DaySummary>> {
        match self {
            ReportSource::Local(app_dir) => Ok(weekly_report(&read_local(app_dir).await?)),
            ReportSource::Remote(remote) => remote.fetch("api/weekly-report").await,
        }
    }
}

/// The aggregation service's read endpoints. Every request gives up after `timeout`.
pub struct RemoteSource {
    client: reqwest::Client,
    server_url: Url,
}

impl RemoteSource {
    pub fn new(server_url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, server_url })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = api_url(&self.server_url, path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

async fn read_local(app_dir: &Path) -> Result<TimeData> {
    let store = JsonFileStore::new(app_dir.join(LOCAL_STORE_DIR))?;
    read_snapshot(&store).await
}

/// Colors category labels unless disabled.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub enabled: bool,
}

impl Palette {
    fn paint(&self, category: Category, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let colour = match category {
            Category::Productive => Colour::Green,
            Category::Unproductive => Colour::Red,
            Category::Neutral => Colour::Fixed(250),
        };
        colour.paint(text).to_string()
    }

    pub fn error(&self, message: &str) -> String {
        if self.enabled {
            Colour::Red.bold().paint(message).to_string()
        } else {
            message.to_string()
        }
    }
}

/// Today's totals with their share of the day, followed by the domains that took the most
/// time. A day without data renders as zeros.
pub fn render_today(time_data: &TimeData, today: &str, palette: Palette) -> String {
    let empty = DailyAggregate::default();
    let day = time_data.get(today).unwrap_or(&empty);
    let total = day.category_sum();

    let mut lines = vec![format!("Today ({today})")];
    for category in [
        Category::Productive,
        Category::Unproductive,
        Category::Neutral,
    ] {
        let seconds = day.total(category);
        lines.push(format!(
            "{}\t{}\t{}",
            palette.paint(category, &category.to_string()),
            format_seconds(seconds),
            seconds_percentage(seconds, total)
        ));
    }

    lines.push(String::new());
    let domains = day.top_domains(TOP_DOMAINS);
    if domains.is_empty() {
        lines.push("No browsing data yet".into());
    }
    for (domain, usage) in domains {
        lines.push(format!(
            "{domain}\t{}\t{}",
            format_seconds(usage.time),
            palette.paint(usage.classification, &usage.classification.to_string())
        ));
    }
    lines.join("\n")
}

/// One row per reported date, oldest first.
pub fn render_weekly(report: &[DaySummary], palette: Palette) -> String {
    if report.is_empty() {
        return "No browsing data yet".into();
    }

    let mut lines = vec![format!(
        "Date\t\t{}\t{}\t{}",
        palette.paint(Category::Productive, "Productive"),
        palette.paint(Category::Unproductive, "Unproductive"),
        palette.paint(Category::Neutral, "Neutral"),
    )];
    for day in report {
        lines.push(format!(
            "{}\t{}\t\t{}\t\t{}",
            day.date,
            format_seconds(day.productive),
            format_seconds(day.unproductive),
            format_seconds(day.neutral)
        ));
    }
    lines.join("\n")
}

/// Renders a view, or an inline error when the store could not be read. Reading failures never
/// fail the command.
pub fn render_or_error<T>(loaded: Result<T>, palette: Palette, render: impl FnOnce(&T) -> String) {
    match loaded {
        Ok(value) => println!("{}", render(&value)),
        Err(e) => eprintln!("{}", palette.error(&format!("Failed to load data: {e:#}"))),
    }
}
